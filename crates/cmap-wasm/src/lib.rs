//! WASM bridge for the concept map canvas.
//!
//! Compiled via `wasm-pack build --target web`. The page forwards DOM
//! pointer, wheel, and gesture events here and paints from
//! [`ConceptCanvas::scene_json`]. File pickers and `fetch` stay in
//! JavaScript: save operations hand back a plan with a token, and the page
//! reports the outcome against that token.

mod storage;

use cmap_core::config::CanvasConfig;
use cmap_core::{ColorTarget, ConceptId, ConnectionId, Endpoint, EndpointKind, Line, Point, Rect, Size};
use cmap_editor::remote::ProjectSaved;
use cmap_editor::{
    CaptureStep, EditorSession, FileHandle, FileOutcome, MenuAnchor, Notice, PinchEvent, PointerEvent, PreparedFile,
    PreparedUpload, SaveMethod, SavePlan, ThumbnailCapture, Thumbnails, WheelEvent,
};
use cmap_render::{ExportFormat, Hit, Theme};
use serde_json::{Value, json};
use std::collections::HashMap;
use storage::BrowserStorage;
use wasm_bindgen::prelude::*;

enum Pending {
    File(PreparedFile),
    Upload(PreparedUpload),
}

impl Pending {
    fn snapshot(&self) -> &str {
        match self {
            Pending::File(file) => &file.snapshot,
            Pending::Upload(upload) => &upload.snapshot,
        }
    }
}

/// The page-facing editor. One per canvas element.
#[wasm_bindgen]
pub struct ConceptCanvas {
    session: EditorSession,
    theme: Theme,
    pending: HashMap<u32, Pending>,
    next_token: u32,
    capture: Option<ThumbnailCapture>,
    thumbnails: Thumbnails,
}

#[wasm_bindgen]
impl ConceptCanvas {
    /// `config_json` may override any tunable; empty means defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        init_logging();

        let config = if config_json.trim().is_empty() {
            CanvasConfig::default()
        } else {
            CanvasConfig::from_json(config_json).unwrap_or_else(|err| {
                log::warn!("ignoring canvas config: {err}");
                CanvasConfig::default()
            })
        };
        Self {
            session: EditorSession::load(Box::new(BrowserStorage::local()), config),
            theme: Theme::Light,
            pending: HashMap::new(),
            next_token: 0,
            capture: None,
            thumbnails: Thumbnails::default(),
        }
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.theme = if is_dark { Theme::Dark } else { Theme::Light };
    }

    pub fn set_handles_hidden(&mut self, hidden: bool) {
        self.session.set_handles_hidden(hidden);
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    /// The document as saved: `{title, description, concepts, connections}`.
    pub fn map_json(&self) -> String {
        serde_json::to_string(self.session.map()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Everything needed to paint one frame.
    pub fn scene_json(&self) -> String {
        let session = &self.session;
        let selection = session.selection();
        let interacting = session.interacting();
        let concepts: Vec<Value> = session
            .map()
            .concepts
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "label": c.label,
                    "rect": rect_json(cmap_core::geometry::concept_bounds(c)),
                    "backgroundColor": c.background_color,
                    "textColor": c.text_color,
                    "selected": selection.is_concept_selected(c.id),
                    "editing": selection.is_editing_concept(c.id),
                    "interacting": interacting.contains(&c.id),
                })
            })
            .collect();
        let connections: Vec<Value> = session
            .layout()
            .connections
            .iter()
            .map(|g| {
                let label = session.map().connection(g.id).map(|c| c.label.as_str()).unwrap_or_default();
                json!({
                    "id": g.id,
                    "label": label,
                    "center": point_json(g.center),
                    "labelBox": rect_json(g.label_box),
                    "line": line_json(g.line),
                    "extraLines": g.extra_lines.iter().map(|(id, l)| json!({"target": id, "line": line_json(*l)})).collect::<Vec<_>>(),
                    "selected": selection.is_connection_selected(g.id),
                    "editing": selection.is_editing_connection(g.id),
                })
            })
            .collect();
        let previews: Vec<Value> = session
            .connection_draw()
            .previews()
            .into_iter()
            .map(|(pointer, p)| json!({"pointerId": pointer.0, "line": line_json(p.preview())}))
            .collect();
        json!({
            "viewport": session.viewport().viewport(),
            "concepts": concepts,
            "connections": connections,
            "previews": previews,
            "colorEdits": selection.color_edits(),
            "handlesHidden": session.handles_hidden(),
            "hasChanges": session.has_changes(),
        })
        .to_string()
    }

    pub fn has_changes(&self) -> bool {
        self.session.has_changes()
    }

    pub fn is_drawing(&self) -> bool {
        self.session.connection_draw().is_drawing()
    }

    /// `{x, y}` canvas coordinates for a canvas-local screen point.
    pub fn to_canvas(&self, x: f64, y: f64) -> String {
        point_json(self.session.viewport().to_canvas(Point::new(x, y))).to_string()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Returns the pressed element as JSON, `null` for empty canvas.
    pub fn handle_pointer_down(&mut self, pointer_id: i32, x: f64, y: f64) -> String {
        let hit = self.session.pointer_down(&PointerEvent::new(pointer_id, x, y));
        hit.map(hit_json).unwrap_or(Value::Null).to_string()
    }

    pub fn handle_pointer_move(&mut self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.session.pointer_move(&PointerEvent::new(pointer_id, x, y))
    }

    pub fn handle_pointer_up(&mut self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.session.pointer_up(&PointerEvent::new(pointer_id, x, y))
    }

    pub fn handle_pointer_cancel(&mut self, pointer_id: i32) -> bool {
        self.session.pointer_cancel(cmap_editor::PointerId(pointer_id))
    }

    /// Call from a `setTimeout(0)` after pointer releases.
    pub fn settle(&mut self) {
        self.session.settle();
    }

    /// New concept id, or -1 when the double click hit something.
    pub fn handle_double_click(&mut self, x: f64, y: f64) -> i64 {
        self.session
            .double_click(Point::new(x, y))
            .map_or(-1, |id| i64::from(id.0))
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.session.wheel(&WheelEvent { x, y, delta_y })
    }

    pub fn handle_pinch(&mut self, x: f64, y: f64, ds: f64) -> bool {
        self.session.pinch(&PinchEvent { x, y, ds })
    }

    pub fn reset_zoom(&mut self, width: f64, height: f64) -> bool {
        self.session.reset_zoom(Size::new(width, height))
    }

    // ─── Selection and edit modes ────────────────────────────────────────

    pub fn toggle_concept(&mut self, id: u32) {
        self.session.update_selection(|s| s.toggle_concept(ConceptId(id)));
    }

    pub fn toggle_connection(&mut self, id: u32) {
        self.session.update_selection(|s| s.toggle_connection(ConnectionId(id)));
    }

    pub fn start_editing(&mut self, kind: &str, id: u32) -> bool {
        let Some(endpoint) = parse_endpoint(kind, id) else {
            return false;
        };
        self.session.update_selection(|s| match endpoint {
            Endpoint::Concept(id) => s.start_editing_concept(id),
            Endpoint::Connection(id) => s.start_editing_connection(id),
        });
        true
    }

    pub fn stop_editing(&mut self, kind: &str, id: u32) -> bool {
        let Some(endpoint) = parse_endpoint(kind, id) else {
            return false;
        };
        self.session.update_selection(|s| match endpoint {
            Endpoint::Concept(id) => s.stop_editing_concept(id),
            Endpoint::Connection(id) => s.stop_editing_connection(id),
        });
        true
    }

    /// `target` is `"background"` or `"text"`.
    pub fn start_coloring(&mut self, id: u32, target: &str) -> bool {
        let Some(target) = parse_color_target(target) else {
            return false;
        };
        self.session.update_selection(|s| s.start_coloring(ConceptId(id), target));
        true
    }

    pub fn stop_coloring(&mut self, id: u32) {
        self.session.update_selection(|s| s.stop_coloring(ConceptId(id), None));
    }

    pub fn clear_selection(&mut self) {
        self.session.update_selection(|s| s.clear());
    }

    pub fn selection_json(&self) -> String {
        serde_json::to_string(self.session.selection()).unwrap_or_else(|_| "{}".to_string())
    }

    // ─── Graph edits ─────────────────────────────────────────────────────

    pub fn commit_label(&mut self, kind: &str, id: u32, label: &str) -> bool {
        match parse_endpoint(kind, id) {
            Some(endpoint) => self.session.commit_label(endpoint, label),
            None => false,
        }
    }

    pub fn set_color(&mut self, id: u32, color: &str, target: &str) -> bool {
        match parse_color_target(target) {
            Some(target) => self.session.set_color(ConceptId(id), color, target),
            None => false,
        }
    }

    pub fn delete_concept(&mut self, id: u32) -> bool {
        self.session.delete_concept(ConceptId(id))
    }

    pub fn delete_connection(&mut self, id: u32) -> bool {
        self.session.delete_connection(ConnectionId(id))
    }

    pub fn set_project_info(&mut self, title: &str, description: &str) -> bool {
        self.session.set_project_info(title, description)
    }

    // ─── Menu anchors ────────────────────────────────────────────────────

    pub fn concept_editor_anchor(&self, id: u32) -> String {
        anchor_json(self.session.concept_editor_anchor(ConceptId(id)))
    }

    pub fn connection_menu_anchor(&self, id: u32) -> String {
        anchor_json(self.session.connection_menu_anchor(ConnectionId(id)))
    }

    pub fn connection_editor_anchor(&self, id: u32) -> String {
        anchor_json(self.session.connection_editor_anchor(ConnectionId(id)))
    }

    // ─── Projects ────────────────────────────────────────────────────────

    pub fn new_project(&mut self) -> String {
        notice_json(&self.session.new_project())
    }

    /// `handle` is the page's id for a reusable file handle, empty if none.
    pub fn open_file(&mut self, contents: String, handle: &str) -> String {
        let handle = (!handle.is_empty()).then(|| FileHandle(handle.to_string()));
        let notice = self.session.open_file(FileOutcome::Opened { contents, handle });
        notice.as_ref().map(notice_json).unwrap_or_else(|| "null".to_string())
    }

    /// The picker failed for a reason other than the user cancelling.
    pub fn open_failed(&mut self, reason: &str) -> String {
        let notice = self.session.open_file(FileOutcome::Failed(reason.to_string()));
        notice.as_ref().map(notice_json).unwrap_or_else(|| "null".to_string())
    }

    /// Adopt a document fetched from `GET /projects?id=…`.
    pub fn open_cloud(&mut self, json: &str) -> String {
        match cmap_core::ProjectDocument::from_json(json) {
            Ok(doc) => notice_json(&self.session.open_cloud(doc)),
            Err(err) => {
                log::warn!("remote project rejected: {err}");
                notice_json(&Notice::Failure("Could not open the project".into()))
            }
        }
    }

    // ─── Saving ──────────────────────────────────────────────────────────

    pub fn save(&mut self) -> String {
        let plan = self.session.save();
        self.plan_json(plan)
    }

    /// `method` is `"file"` or `"online"`.
    pub fn save_with(&mut self, method: &str) -> String {
        let method = match method {
            "file" => SaveMethod::File,
            "online" => SaveMethod::Online,
            other => {
                log::warn!("unknown save method {other}");
                return Value::Null.to_string();
            }
        };
        let plan = self.session.save_with(method);
        self.plan_json(plan)
    }

    pub fn save_as(&mut self) -> String {
        let plan = self.session.save_as();
        self.plan_json(plan)
    }

    pub fn download(&mut self) -> String {
        let plan = self.session.download();
        self.plan_json(plan)
    }

    /// Request body for an upload plan, with the last captured thumbnails.
    pub fn upload_body(&self, token: u32) -> String {
        let Some(Pending::Upload(upload)) = self.pending.get(&token) else {
            return Value::Null.to_string();
        };
        let upload = upload.clone().with_thumbnails(self.thumbnails.clone());
        serde_json::to_string(&upload.request).unwrap_or_else(|_| "null".to_string())
    }

    pub fn complete_file_save(&mut self, token: u32, handle: &str) -> String {
        let Some(pending) = self.pending.remove(&token) else {
            return Value::Null.to_string();
        };
        notice_json(
            &self
                .session
                .complete_file_save(pending.snapshot(), FileHandle(handle.to_string())),
        )
    }

    pub fn complete_download(&mut self, token: u32) -> String {
        let Some(pending) = self.pending.remove(&token) else {
            return Value::Null.to_string();
        };
        notice_json(&self.session.complete_download(pending.snapshot()))
    }

    /// `response` is the body of a successful `POST /projects`.
    pub fn complete_upload(&mut self, token: u32, response: &str) -> String {
        let Some(pending) = self.pending.remove(&token) else {
            return Value::Null.to_string();
        };
        match serde_json::from_str::<ProjectSaved>(response) {
            Ok(saved) => notice_json(&self.session.complete_upload(pending.snapshot(), &saved)),
            Err(err) => notice_json(&self.session.fail_save(&err.to_string())),
        }
    }

    /// The user cancelled the picker: forget the plan quietly.
    pub fn cancel_save(&mut self, token: u32) {
        self.pending.remove(&token);
    }

    pub fn fail_save(&mut self, token: u32, reason: &str) -> String {
        self.pending.remove(&token);
        notice_json(&self.session.fail_save(reason))
    }

    // ─── Thumbnails ──────────────────────────────────────────────────────

    /// Start a light+dark capture. Returns the first step.
    pub fn thumbnail_begin(&mut self) -> String {
        let mut capture = ThumbnailCapture::new(self.theme);
        let step = capture.start();
        self.capture = Some(capture);
        self.thumbnails = Thumbnails::default();
        step_json(&step)
    }

    /// Call once per animation frame while the last step was
    /// `applyTheme` or `waitFrame`.
    pub fn thumbnail_frame(&mut self) -> String {
        let Some(capture) = self.capture.as_mut() else {
            return Value::Null.to_string();
        };
        let step = capture.frame();
        let step = match step {
            CaptureStep::Capture(theme) => {
                let uri = cmap_render::thumbnail_data_uri(self.session.map(), &self.session.config().export, theme).ok();
                capture.captured(uri)
            }
            other => other,
        };
        if let CaptureStep::Finished { thumbnails, .. } = &step {
            self.thumbnails = thumbnails.clone();
            self.capture = None;
        }
        step_json(&step)
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// Encoded bytes for `format` (`png`, `jpg`, `pdf`) in the current theme.
    pub fn export(&self, format: &str) -> Result<js_sys::Uint8Array, JsValue> {
        let format = ExportFormat::parse(format).ok_or_else(|| JsValue::from_str("unknown export format"))?;
        let artifact = self
            .session
            .export(format, self.theme)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(js_sys::Uint8Array::from(artifact.bytes.as_slice()))
    }

    pub fn export_file_name(&self, format: &str) -> String {
        let extension = ExportFormat::parse(format).map_or("png", ExportFormat::extension);
        cmap_core::safe_filename(&self.session.map().title, extension)
    }
}

impl ConceptCanvas {
    fn plan_json(&mut self, plan: SavePlan) -> String {
        let (action, pending, handle) = match plan {
            SavePlan::ChooseMethod => return json!({"action": "chooseMethod"}).to_string(),
            SavePlan::WriteFile(handle, file) => ("writeFile", Pending::File(file), Some(handle)),
            SavePlan::PickFile(file) => ("pickFile", Pending::File(file), None),
            SavePlan::Download(file) => ("download", Pending::File(file), None),
            SavePlan::Upload(upload) => ("upload", Pending::Upload(upload), None),
        };
        self.next_token = self.next_token.wrapping_add(1);
        let token = self.next_token;
        let mut out = json!({"action": action, "token": token, "handle": handle});
        if let Pending::File(file) = &pending {
            out["fileName"] = json!(file.file_name);
            out["contents"] = json!(file.contents);
        }
        self.pending.insert(token, pending);
        out.to_string()
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn point_json(p: Point) -> Value {
    json!({"x": p.x, "y": p.y})
}

fn rect_json(r: Rect) -> Value {
    json!({"x": r.x0, "y": r.y0, "width": r.width(), "height": r.height()})
}

fn line_json(l: Line) -> Value {
    json!({"x1": l.p0.x, "y1": l.p0.y, "x2": l.p1.x, "y2": l.p1.y})
}

fn anchor_json(anchor: Option<MenuAnchor>) -> String {
    anchor
        .map(|a| json!({"x": a.x, "y": a.y}))
        .unwrap_or(Value::Null)
        .to_string()
}

fn notice_json(notice: &Notice) -> String {
    serde_json::to_string(notice).unwrap_or_else(|_| "null".to_string())
}

fn hit_json(hit: Hit) -> Value {
    match hit {
        Hit::ConceptHandle(id) => json!({"kind": "conceptHandle", "id": id}),
        Hit::ConceptEdge(id, e) => json!({
            "kind": "conceptEdge",
            "id": id,
            "edges": {"left": e.left, "right": e.right, "top": e.top, "bottom": e.bottom},
        }),
        Hit::Concept(id) => json!({"kind": "concept", "id": id}),
        Hit::ConnectionHandle(id) => json!({"kind": "connectionHandle", "id": id}),
        Hit::Connection(id) => json!({"kind": "connection", "id": id}),
    }
}

fn step_json(step: &CaptureStep) -> String {
    match step {
        CaptureStep::ApplyTheme(theme) => json!({"step": "applyTheme", "theme": theme.as_str()}),
        CaptureStep::WaitFrame => json!({"step": "waitFrame"}),
        CaptureStep::Capture(theme) => json!({"step": "capture", "theme": theme.as_str()}),
        CaptureStep::Finished { restore, thumbnails } => json!({
            "step": "finished",
            "restore": restore.as_str(),
            "thumbnailLight": thumbnails.light,
            "thumbnailDark": thumbnails.dark,
        }),
    }
    .to_string()
}

fn parse_endpoint(kind: &str, id: u32) -> Option<Endpoint> {
    match kind {
        "concept" => Some(Endpoint::new(EndpointKind::Concept, id)),
        "connection" => Some(Endpoint::new(EndpointKind::Connection, id)),
        other => {
            log::warn!("unknown element kind {other}");
            None
        }
    }
}

fn parse_color_target(target: &str) -> Option<ColorTarget> {
    match target {
        "background" => Some(ColorTarget::Background),
        "text" => Some(ColorTarget::Text),
        _ => None,
    }
}

/// Route `log` to the browser console and panics to `console.error`.
fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = console_log::init_with_level(log::Level::Debug);
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("concept map panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoint_kinds() {
        assert_eq!(
            parse_endpoint("connection", 3),
            Some(Endpoint::Connection(ConnectionId(3)))
        );
        assert_eq!(parse_endpoint("edge", 3), None);
        assert_eq!(parse_color_target("text"), Some(ColorTarget::Text));
    }

    #[test]
    fn hit_payloads() {
        assert_eq!(
            hit_json(Hit::Concept(ConceptId(4))),
            json!({"kind": "concept", "id": 4})
        );
        assert_eq!(
            step_json(&CaptureStep::WaitFrame),
            r#"{"step":"waitFrame"}"#
        );
    }

    #[test]
    fn rect_payload() {
        assert_eq!(
            rect_json(Rect::new(10.0, 20.0, 110.0, 70.0)),
            json!({"x": 10.0, "y": 20.0, "width": 100.0, "height": 50.0})
        );
    }
}
