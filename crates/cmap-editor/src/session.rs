//! Editor session: the store, viewport, gestures, selection, and save
//! destination of one open project.
//!
//! Input arrives as screen-space events and leaves as store mutations.
//! File and network I/O stay with the host: the session prepares what to
//! write, and the host reports back with `complete_*` or `fail_save`. Every
//! user-initiated I/O action yields exactly one [`Notice`].

use crate::connect::ConnectionDraw;
use crate::gesture::{GestureKind, Gestures, Step};
use crate::input::{PinchEvent, PointerEvent, PointerId, WheelEvent};
use crate::remote::{ProjectApi, ProjectSaved};
use crate::selection::SelectionState;
use crate::thumbnail::{Thumbnails, capture_thumbnails};
use crate::viewport::ViewportController;
use cmap_core::config::CanvasConfig;
use cmap_core::document::safe_filename;
use cmap_core::geometry::Chrome;
use cmap_core::{
    Applied, ColorTarget, ConceptId, ConceptMap, ConceptMapStore, ConnectionId, Endpoint, KeyValueStore,
    MapMutation, Point, ProjectDocument, Rect, SceneLayout, Size,
};
use cmap_render::{
    ApproxMeasurer, ExportArtifact, ExportError, ExportFormat, Hit, HitOptions, TextMeasurer, Theme, concept_at,
    concept_footprint, connection_label_width, hit_test,
};
use serde::Serialize;

/// Labels longer than this cannot be committed.
pub const MAX_LABEL_CHARS: usize = 200;

pub fn label_is_valid(label: &str) -> bool {
    !label.trim().is_empty() && label.chars().count() <= MAX_LABEL_CHARS
}

// ─── Save destinations ───────────────────────────────────────────────────

/// Opaque token for a file the host may write again without asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveTarget {
    #[default]
    Unset,
    /// Saved as a file. `None` when the platform gave no reusable handle;
    /// saves then fall back to a download.
    File(Option<FileHandle>),
    /// Linked to a remote project id.
    Cloud(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMethod {
    File,
    Online,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn is_success(&self) -> bool {
        matches!(self, Notice::Success(_))
    }
}

/// Document text about to be written, with the exact graph snapshot it
/// holds so completion can mark that snapshot saved.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFile {
    pub file_name: String,
    pub contents: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpload {
    pub request: ProjectDocument,
    pub snapshot: String,
}

impl PreparedUpload {
    pub fn with_thumbnails(mut self, thumbnails: Thumbnails) -> Self {
        self.request.thumbnail_light = thumbnails.light;
        self.request.thumbnail_dark = thumbnails.dark;
        self
    }
}

/// What the host must do to carry out a save.
#[derive(Debug, Clone, PartialEq)]
pub enum SavePlan {
    /// Rewrite the linked file.
    WriteFile(FileHandle, PreparedFile),
    /// Ask for a destination (or download when the platform cannot).
    PickFile(PreparedFile),
    /// Download without linking.
    Download(PreparedFile),
    Upload(PreparedUpload),
    /// Nothing is linked yet: ask the user for a method.
    ChooseMethod,
}

/// How a file picker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Opened { contents: String, handle: Option<FileHandle> },
    Cancelled,
    Failed(String),
}

/// Screen-space positions for the floating menus and editors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuAnchor {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for MenuAnchor {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

// ─── Session ─────────────────────────────────────────────────────────────

pub struct EditorSession {
    store: ConceptMapStore,
    config: CanvasConfig,
    viewport: ViewportController,
    selection: SelectionState,
    draw: ConnectionDraw,
    gestures: Gestures,
    measurer: Box<dyn TextMeasurer>,
    handles_hidden: bool,
    layout: SceneLayout,
    target: SaveTarget,
    method: Option<SaveMethod>,
    /// Snapshot last written or opened. `None` means unsaved work carried
    /// over from a previous visit.
    baseline: Option<String>,
}

impl EditorSession {
    /// Resume from `storage`: the in-progress map, its dirty flag, and a
    /// cloud link all survive a reload.
    pub fn load(storage: Box<dyn KeyValueStore>, config: CanvasConfig) -> Self {
        let store = ConceptMapStore::load(storage, config.store.clone());
        let dirty = store.storage().get(&config.store.dirty_key).as_deref() == Some("true");
        let target = match store.storage().get(&config.store.cloud_project_key) {
            Some(id) if !id.is_empty() => SaveTarget::Cloud(id),
            _ => SaveTarget::Unset,
        };
        let method = matches!(target, SaveTarget::Cloud(_)).then_some(SaveMethod::Online);
        let mut session = Self::from_store(store, config);
        session.target = target;
        session.method = method;
        let baseline = (!dirty).then(|| session.snapshot());
        session.baseline = baseline;
        session.sync_dirty();
        session
    }

    /// A session over `map` in memory storage, treated as saved.
    pub fn with_map(map: ConceptMap, config: CanvasConfig) -> Self {
        let store = ConceptMapStore::in_memory(map, config.store.clone());
        let mut session = Self::from_store(store, config);
        session.baseline = Some(session.snapshot());
        session.sync_dirty();
        session
    }

    fn from_store(store: ConceptMapStore, config: CanvasConfig) -> Self {
        let layout = SceneLayout::compute(store.map(), Chrome::SCREEN);
        Self {
            store,
            viewport: ViewportController::new(config.viewport.clone()),
            selection: SelectionState::new(),
            draw: ConnectionDraw::new(),
            gestures: Gestures::new(config.viewport.click_threshold),
            measurer: Box::new(ApproxMeasurer::default()),
            handles_hidden: false,
            layout,
            target: SaveTarget::Unset,
            method: None,
            baseline: None,
            config,
        }
    }

    pub fn set_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn map(&self) -> &ConceptMap {
        self.store.map()
    }

    pub fn store(&self) -> &ConceptMapStore {
        &self.store
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn connection_draw(&self) -> &ConnectionDraw {
        &self.draw
    }

    pub fn save_target(&self) -> &SaveTarget {
        &self.target
    }

    pub fn save_method(&self) -> Option<SaveMethod> {
        self.method
    }

    pub fn handles_hidden(&self) -> bool {
        self.handles_hidden
    }

    pub fn chrome(&self) -> Chrome {
        if self.handles_hidden {
            Chrome::SCREEN_HANDLES_HIDDEN
        } else {
            Chrome::SCREEN
        }
    }

    pub fn set_handles_hidden(&mut self, hidden: bool) {
        self.handles_hidden = hidden;
        self.refresh_layout();
    }

    /// Concepts currently dragged or resized.
    pub fn interacting(&self) -> Vec<ConceptId> {
        self.gestures.interacting()
    }

    // ─── Dirty tracking ──────────────────────────────────────────────────

    fn snapshot(&self) -> String {
        serde_json::to_string(self.store.map()).unwrap_or_default()
    }

    pub fn has_changes(&self) -> bool {
        self.baseline.as_deref() != Some(self.snapshot().as_str())
    }

    fn sync_dirty(&mut self) {
        let dirty = if self.has_changes() { "true" } else { "false" };
        let key = self.config.store.dirty_key.clone();
        self.store.storage_mut().set(&key, dirty);
    }

    fn sync_cloud_key(&mut self) {
        let key = self.config.store.cloud_project_key.clone();
        match &self.target {
            SaveTarget::Cloud(id) => {
                let id = id.clone();
                self.store.storage_mut().set(&key, &id);
            }
            _ => self.store.storage_mut().remove(&key),
        }
    }

    fn refresh_layout(&mut self) {
        self.layout = SceneLayout::compute(self.store.map(), self.chrome());
    }

    fn after_change(&mut self) {
        let map = self.store.map();
        self.selection.retain_live(
            |id| map.concept(id).is_some(),
            |id| map.connection(id).is_some(),
        );
        self.refresh_layout();
        self.sync_dirty();
        self.sync_lock();
    }

    fn sync_lock(&mut self) {
        self.viewport.set_locked(self.selection.is_editing());
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    pub fn apply(&mut self, mutation: MapMutation) -> Applied {
        let applied = self.store.apply(mutation);
        if applied.changed() {
            self.after_change();
        }
        applied
    }

    pub fn delete_concept(&mut self, id: ConceptId) -> bool {
        self.apply(MapMutation::DeleteConcept { id }).changed()
    }

    pub fn delete_connection(&mut self, id: ConnectionId) -> bool {
        self.apply(MapMutation::DeleteConnection { id }).changed()
    }

    pub fn set_color(&mut self, id: ConceptId, color: &str, target: ColorTarget) -> bool {
        self.apply(MapMutation::SetColor {
            id,
            color: color.to_string(),
            target,
        })
        .changed()
    }

    pub fn set_project_info(&mut self, title: &str, description: &str) -> bool {
        let changed = self.store.set_title(title) | self.store.set_description(description);
        if changed {
            self.after_change();
        }
        changed
    }

    /// Run `f` against the selection, then re-lock the viewport if a label
    /// editor opened or closed.
    pub fn update_selection<R>(&mut self, f: impl FnOnce(&mut SelectionState) -> R) -> R {
        let out = f(&mut self.selection);
        self.sync_lock();
        out
    }

    /// Commit an edited label, then resize the shape to fit it. Invalid
    /// labels are refused and the editor stays open.
    pub fn commit_label(&mut self, target: Endpoint, label: &str) -> bool {
        if !label_is_valid(label) {
            log::debug!("refusing label for {target}: empty or too long");
            return false;
        }
        let mut changed = self.store.set_label(target, label);
        let resized = match target {
            Endpoint::Concept(_) => {
                let size = concept_footprint(self.measurer.as_ref(), label, self.handles_hidden);
                self.store.adjust_size_for_label(target, size.width, Some(size.height))
            }
            Endpoint::Connection(_) => {
                let width = connection_label_width(self.measurer.as_ref(), label);
                self.store.adjust_size_for_label(target, width, None)
            }
        };
        changed |= resized;
        self.update_selection(|sel| match target {
            Endpoint::Concept(id) => sel.stop_editing_concept(id),
            Endpoint::Connection(id) => sel.stop_editing_connection(id),
        });
        if changed {
            self.after_change();
        }
        changed
    }

    // ─── Pointer input ───────────────────────────────────────────────────

    fn hit_options(&self) -> (bool, Vec<ConceptId>, f64) {
        (
            self.handles_hidden,
            self.selection.selected_concepts().to_vec(),
            self.config.viewport.resize_edge_tolerance / self.viewport.viewport().scale,
        )
    }

    pub fn hit_at(&self, local: Point) -> Option<Hit> {
        let (handles_hidden, selected, edge_tolerance) = self.hit_options();
        let opts = HitOptions {
            handles_hidden,
            selected: &selected,
            edge_tolerance,
        };
        hit_test(&self.layout, self.viewport.to_canvas(local), &opts)
    }

    /// Start a gesture. Returns what was pressed, if anything.
    pub fn pointer_down(&mut self, event: &PointerEvent) -> Option<Hit> {
        let local = event.local();
        let canvas = self.viewport.to_canvas(local);
        let hit = self.hit_at(local);
        match hit {
            Some(Hit::ConceptHandle(id)) => self.draw.begin(event.pointer, Endpoint::Concept(id), canvas),
            Some(Hit::ConnectionHandle(id)) => self.draw.begin(event.pointer, Endpoint::Connection(id), canvas),
            Some(Hit::ConceptEdge(id, edges)) => {
                if let Some(concept) = self.store.map().concept(id) {
                    let origin = cmap_core::geometry::concept_bounds(concept);
                    let footprint = concept_footprint(self.measurer.as_ref(), &concept.label, self.handles_hidden);
                    let min = Size::new(
                        footprint.width.max(self.config.store.min_concept_width),
                        footprint.height.max(self.config.store.min_concept_height),
                    );
                    self.gestures.begin(
                        event.pointer,
                        GestureKind::Resize { id, edges, origin, min },
                        local,
                    );
                }
            }
            Some(Hit::Concept(id)) => self.gestures.begin(event.pointer, GestureKind::Drag(id), local),
            Some(Hit::Connection(id)) => self.gestures.begin(event.pointer, GestureKind::Connection(id), local),
            None => self.gestures.begin(event.pointer, GestureKind::Pan, local),
        }
        hit
    }

    /// True when something visible moved.
    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        let local = event.local();
        if self.draw.update(event.pointer, self.viewport.to_canvas(local)) {
            return true;
        }
        let scale = self.viewport.viewport().scale;
        match self.gestures.motion(event.pointer, local, scale, self.store.map()) {
            Step::Idle => false,
            Step::Mutate(mutation) => self.apply(mutation).changed(),
            Step::Pan(delta) => self.viewport.pan(delta),
        }
    }

    /// Finish the pointer's gesture. True when the graph or selection
    /// changed.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        let canvas = self.viewport.to_canvas(event.local());
        if self.draw.is_active(event.pointer) {
            let target = concept_at(&self.layout, canvas);
            return match self.draw.release(event.pointer, target, self.store.map()) {
                Some(mutation) => self.apply(mutation).changed(),
                None => false,
            };
        }
        let Some(release) = self.gestures.end(event.pointer) else {
            return false;
        };
        if !release.click || self.draw.is_drawing() {
            return false;
        }
        match release.kind {
            GestureKind::Drag(id) | GestureKind::Resize { id, .. } => {
                self.update_selection(|sel| sel.toggle_concept(id));
                true
            }
            GestureKind::Connection(id) => {
                self.update_selection(|sel| sel.toggle_connection(id));
                true
            }
            GestureKind::Pan => false,
        }
    }

    /// Capture was revoked: drop the gesture without applying anything.
    pub fn pointer_cancel(&mut self, pointer: PointerId) -> bool {
        self.draw.cancel(pointer) | self.gestures.cancel(pointer)
    }

    /// Deferred tick after pointer releases.
    pub fn settle(&mut self) {
        self.draw.settle();
    }

    /// On empty canvas: clear the selection, add a concept centered under
    /// the pointer, and open its label editor.
    pub fn double_click(&mut self, local: Point) -> Option<ConceptId> {
        if self.hit_at(local).is_some() {
            return None;
        }
        let at = self.viewport.to_canvas(local);
        let id = match self.apply(MapMutation::AddConcept { x: at.x, y: at.y }) {
            Applied::AddedConcept(id) => id,
            _ => return None,
        };
        self.update_selection(|sel| {
            sel.clear();
            sel.start_editing_concept(id);
        });
        Some(id)
    }

    pub fn wheel(&mut self, event: &WheelEvent) -> bool {
        self.viewport.wheel(event)
    }

    pub fn pinch(&mut self, event: &PinchEvent) -> bool {
        self.viewport.pinch(event)
    }

    pub fn reset_zoom(&mut self, view_size: Size) -> bool {
        self.viewport
            .reset_zoom(Point::new(view_size.width / 2.0, view_size.height / 2.0))
    }

    // ─── Menu anchors ────────────────────────────────────────────────────

    fn screen(&self, canvas: Point) -> MenuAnchor {
        self.viewport.to_screen(canvas).into()
    }

    /// Below the concept, 10 px clear of its bottom edge.
    pub fn concept_editor_anchor(&self, id: ConceptId) -> Option<MenuAnchor> {
        let concept = self.store.map().concept(id)?;
        let bounds = cmap_core::geometry::concept_bounds(concept);
        let mut anchor = self.screen(Point::new(bounds.center().x, bounds.y1));
        anchor.y += 10.0;
        Some(anchor)
    }

    fn label_box(&self, id: ConnectionId) -> Option<Rect> {
        self.layout.connection(id).map(|g| g.label_box)
    }

    /// Right of the label box, aligned with its top.
    pub fn connection_menu_anchor(&self, id: ConnectionId) -> Option<MenuAnchor> {
        let label_box = self.label_box(id)?;
        let mut anchor = self.screen(Point::new(label_box.x1, label_box.y0));
        anchor.x += 6.0;
        Some(anchor)
    }

    /// Under the label box, aligned with its left edge.
    pub fn connection_editor_anchor(&self, id: ConnectionId) -> Option<MenuAnchor> {
        let label_box = self.label_box(id)?;
        let mut anchor = self.screen(Point::new(label_box.x0, label_box.y1));
        anchor.y += 5.0;
        Some(anchor)
    }

    // ─── Projects ────────────────────────────────────────────────────────

    fn reset_to(&mut self, map: ConceptMap, target: SaveTarget, method: Option<SaveMethod>) {
        self.store.replace(map);
        self.target = target;
        self.method = method;
        self.selection.clear();
        self.baseline = Some(self.snapshot());
        self.sync_cloud_key();
        self.after_change();
    }

    pub fn new_project(&mut self) -> Notice {
        let map = ConceptMap {
            title: self.config.store.default_title.clone(),
            description: self.config.store.default_description.clone(),
            ..ConceptMap::new()
        };
        self.reset_to(map, SaveTarget::Unset, None);
        Notice::Success("New project created".into())
    }

    /// Load a picked file. A cancelled picker is silent; unreadable
    /// contents leave the current graph untouched.
    pub fn open_file(&mut self, outcome: FileOutcome) -> Option<Notice> {
        let (contents, handle) = match outcome {
            FileOutcome::Cancelled => return None,
            FileOutcome::Failed(err) => {
                log::warn!("open failed: {err}");
                return Some(Notice::Failure("Could not open the file".into()));
            }
            FileOutcome::Opened { contents, handle } => (contents, handle),
        };
        match ProjectDocument::from_json(&contents) {
            Ok(doc) => {
                self.reset_to(doc.into_map(), SaveTarget::File(handle), Some(SaveMethod::File));
                Some(Notice::Success("Project opened".into()))
            }
            Err(err) => {
                log::warn!("rejecting opened file: {err}");
                Some(Notice::Failure("Could not open the file".into()))
            }
        }
    }

    /// Adopt a document fetched from the remote service.
    pub fn open_cloud(&mut self, doc: ProjectDocument) -> Notice {
        let Some(id) = doc.id.clone() else {
            return Notice::Failure("Project has no id".into());
        };
        if let Err(err) = cmap_core::document::validate(&doc.map) {
            log::warn!("rejecting remote project {id}: {err}");
            return Notice::Failure("Could not open the project".into());
        }
        let mut map = doc.into_map();
        cmap_core::document::normalize(&mut map);
        self.reset_to(map, SaveTarget::Cloud(id), Some(SaveMethod::Online));
        Notice::Success("Project opened".into())
    }

    // ─── Saving ──────────────────────────────────────────────────────────

    pub fn prepare_file(&self) -> PreparedFile {
        let doc = ProjectDocument::from_map(self.store.map().clone());
        PreparedFile {
            file_name: safe_filename(&self.store.map().title, "json"),
            contents: doc.to_json_pretty().unwrap_or_default(),
            snapshot: self.snapshot(),
        }
    }

    /// Upload request for the current graph, updating the linked project
    /// when there is one. Thumbnails are attached by the caller.
    pub fn prepare_upload(&self) -> PreparedUpload {
        let mut request = ProjectDocument::from_map(self.store.map().clone());
        if let SaveTarget::Cloud(id) = &self.target {
            request.id = Some(id.clone());
        }
        PreparedUpload {
            request,
            snapshot: self.snapshot(),
        }
    }

    /// Save to wherever the project is linked.
    pub fn save(&self) -> SavePlan {
        match (&self.target, self.method) {
            (SaveTarget::Cloud(_), _) => SavePlan::Upload(self.prepare_upload()),
            (SaveTarget::File(Some(handle)), _) => SavePlan::WriteFile(handle.clone(), self.prepare_file()),
            (SaveTarget::File(None), _) => SavePlan::Download(self.prepare_file()),
            (SaveTarget::Unset, Some(method)) => self.save_with(method),
            (SaveTarget::Unset, None) => SavePlan::ChooseMethod,
        }
    }

    /// The user picked a method in the save dialog.
    pub fn save_with(&self, method: SaveMethod) -> SavePlan {
        match method {
            SaveMethod::Online => SavePlan::Upload(self.prepare_upload()),
            SaveMethod::File => SavePlan::PickFile(self.prepare_file()),
        }
    }

    pub fn save_as(&self) -> SavePlan {
        SavePlan::PickFile(self.prepare_file())
    }

    pub fn download(&self) -> SavePlan {
        SavePlan::Download(self.prepare_file())
    }

    /// The prepared file reached `handle`.
    pub fn complete_file_save(&mut self, snapshot: &str, handle: FileHandle) -> Notice {
        self.target = SaveTarget::File(Some(handle));
        self.method = Some(SaveMethod::File);
        self.mark_saved(snapshot);
        Notice::Success("File saved".into())
    }

    /// The prepared file was downloaded. The link is unchanged.
    pub fn complete_download(&mut self, snapshot: &str) -> Notice {
        self.mark_saved(snapshot);
        Notice::Success("File downloaded".into())
    }

    pub fn complete_upload(&mut self, snapshot: &str, saved: &ProjectSaved) -> Notice {
        self.target = SaveTarget::Cloud(saved.id.clone());
        self.method = Some(SaveMethod::Online);
        self.mark_saved(snapshot);
        Notice::Success("Saved online".into())
    }

    /// A save failed or was refused. Nothing about the session changes.
    pub fn fail_save(&self, reason: &str) -> Notice {
        log::warn!("save failed: {reason}");
        Notice::Failure("Saving failed".into())
    }

    fn mark_saved(&mut self, snapshot: &str) {
        self.baseline = Some(snapshot.to_string());
        self.sync_cloud_key();
        self.sync_dirty();
    }

    /// Upload through `api` in one step, with freshly rendered thumbnails.
    pub fn save_online(&mut self, api: &mut dyn ProjectApi, theme: Theme) -> Notice {
        let upload = self.prepare_upload().with_thumbnails(self.thumbnails(theme));
        match api.save(&upload.request) {
            Ok(saved) => self.complete_upload(&upload.snapshot, &saved),
            Err(err) => self.fail_save(&err.to_string()),
        }
    }

    pub fn open_online(&mut self, api: &dyn ProjectApi, id: &str) -> Notice {
        match api.fetch(id) {
            Ok(doc) => self.open_cloud(doc),
            Err(err) => {
                log::warn!("fetching {id} failed: {err}");
                Notice::Failure("Could not open the project".into())
            }
        }
    }

    // ─── Export ──────────────────────────────────────────────────────────

    pub fn export(&self, format: ExportFormat, theme: Theme) -> Result<ExportArtifact, ExportError> {
        cmap_render::export(self.store.map(), format, &self.config.export, theme)
    }

    pub fn thumbnails(&self, user_theme: Theme) -> Thumbnails {
        capture_thumbnails(self.store.map(), &self.config.export, user_theme)
    }
}
