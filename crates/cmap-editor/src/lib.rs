pub mod connect;
pub mod gesture;
pub mod input;
pub mod remote;
pub mod selection;
pub mod session;
pub mod thumbnail;
pub mod viewport;

pub use connect::{ConnectionDraw, PendingConnection};
pub use gesture::{Gesture, GestureKind, Gestures};
pub use input::{PinchEvent, PointerEvent, PointerId, WheelEvent};
pub use remote::{MemoryProjects, ProjectApi, ProjectSaved, ProjectSummary, RemoteError};
pub use selection::{ColorEdit, SelectionState};
pub use session::{
    EditorSession, FileHandle, FileOutcome, MenuAnchor, Notice, PreparedFile, PreparedUpload, SaveMethod, SavePlan,
    SaveTarget,
};
pub use thumbnail::{CaptureStep, ThumbnailCapture, Thumbnails};
pub use viewport::{Viewport, ViewportController};
