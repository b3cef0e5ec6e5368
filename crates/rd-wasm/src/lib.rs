//! WASM bridge for Redline: exposes the report editor to the browser.
//!
//! Compiled via `wasm-pack build --target web`. The host owns the content
//! value: it passes every change it receives from `on_change` back through
//! `set_content`, and the engine's sync rule sorts echoes from real
//! external changes.

use rd_assets::{
    AssetConfig, AssetUploader, AssistKind, GenerationClient, LocalFile, ReqwestTransport,
    TextGenerator, UploadClient,
};
use rd_core::{ImageAlign, ImageWidth, NodeId};
use rd_editor::engine::{Engine, FocusTarget};
use rd_editor::input::{
    ClipboardItem, DragOverEvent, DropEvent, DropTarget, KeyOrigin, Modifiers, PasteEvent,
};
use rd_editor::intercept::{InputInterceptor, InsertTask, PositionResolver};
use rd_editor::notify::{Notice, Notifier};
use rd_editor::shortcuts::{ShortcutAction, ShortcutMap};
use rd_editor::{AssistTask, EditorCommand, EditorSession, EditorVariant, ImageNodeView, SyncOutcome, Toolbar};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

// ─── JS callbacks ────────────────────────────────────────────────────────

/// `(level, message) => void`, or the console when unset.
#[derive(Default)]
struct JsNotifier {
    callback: RefCell<Option<js_sys::Function>>,
}

impl Notifier for JsNotifier {
    fn notify(&self, notice: Notice) {
        let level = JsValue::from_str(notice.level.as_str());
        let message = JsValue::from_str(&notice.message);
        match self.callback.borrow().as_ref() {
            Some(f) => {
                let _ = f.call2(&JsValue::NULL, &level, &message);
            }
            None => web_sys::console::warn_2(&level, &message),
        }
    }
}

/// `(x, y) => number | null`, typically `view.posAtCoords`.
#[derive(Default)]
struct JsResolver {
    callback: RefCell<Option<js_sys::Function>>,
}

impl PositionResolver for JsResolver {
    fn resolve_position(&self, x: f64, y: f64) -> Option<usize> {
        let callback = self.callback.borrow();
        let pos = callback
            .as_ref()?
            .call2(&JsValue::NULL, &x.into(), &y.into())
            .ok()?
            .as_f64()?;
        (pos.is_finite() && pos >= 0.0).then_some(pos as usize)
    }
}

/// Queues emitted content and hands it to JS once no engine borrow is
/// held, so `on_change` handlers may call straight back into the editor.
#[derive(Clone, Default)]
struct Dispatcher {
    pending: Rc<RefCell<Vec<String>>>,
    on_change: Rc<RefCell<Option<js_sys::Function>>>,
    views: Rc<RefCell<HashMap<String, ImageNodeView>>>,
}

impl Dispatcher {
    fn flush(&self) {
        let pending: Vec<String> = self.pending.borrow_mut().drain(..).collect();
        if pending.is_empty() {
            return;
        }
        self.views.borrow_mut().retain(|_, view| {
            view.on_attrs_changed();
            view.attrs().is_some()
        });
        let callback = self.on_change.borrow().clone();
        if let Some(f) = callback {
            for content in pending {
                let _ = f.call1(&JsValue::NULL, &JsValue::from_str(&content));
            }
        }
    }
}

fn parse_variant(name: &str) -> EditorVariant {
    match name {
        "evidence" => EditorVariant::Evidence,
        _ => EditorVariant::Standard,
    }
}

fn parse_config(json: &str) -> Result<AssetConfig, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(AssetConfig::default());
    }
    serde_json::from_str(json)
}

fn parse_focus(target: &str) -> FocusTarget {
    match target {
        "start" => FocusTarget::Start,
        "end" => FocusTarget::End,
        _ => FocusTarget::Current,
    }
}

fn parse_assist(kind: &str, target_language: Option<String>) -> Option<AssistKind> {
    Some(match kind {
        "fix_grammar" | "" => AssistKind::FixGrammar,
        "rewrite" => AssistKind::Rewrite,
        "expand" => AssistKind::Expand,
        "translate" => AssistKind::Translate {
            target_language: target_language?,
        },
        _ => return None,
    })
}

fn outcome_name(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Unchanged => "unchanged",
        SyncOutcome::Echo => "echo",
        SyncOutcome::Reset => "reset",
    }
}

fn action_name(action: &ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Command(command) => command.name(),
        ShortcutAction::SelectAll => "select_all",
        ShortcutAction::Link => "link",
    }
}

fn to_json<T: Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

fn error_value(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ─── Editor ──────────────────────────────────────────────────────────────

/// The browser-facing editor controller.
///
/// Holds one editing session plus the upload and generation clients. All
/// interaction from the page goes through this struct.
#[wasm_bindgen]
pub struct RdEditor {
    session: EditorSession,
    interceptor: InputInterceptor,
    generator: Rc<dyn TextGenerator>,
    notifier: Rc<JsNotifier>,
    resolver: Rc<JsResolver>,
    shortcuts: ShortcutMap,
    dispatcher: Dispatcher,
}

#[wasm_bindgen]
impl RdEditor {
    /// Open `content` for editing. `variant` is `"standard"` or
    /// `"evidence"`; `config_json` is an `AssetConfig` object, empty for
    /// defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(content: &str, editable: bool, variant: &str, config_json: &str) -> Self {
        console_error_panic_hook_setup();

        let config = parse_config(config_json).unwrap_or_else(|err| {
            let msg = format!("Redline: invalid asset config, using defaults: {err}");
            web_sys::console::error_1(&msg.into());
            AssetConfig::default()
        });
        if !content.trim().is_empty() && rd_core::parse_document(content).is_err() {
            web_sys::console::warn_1(&"Redline: unreadable content, starting empty".into());
        }

        let session = EditorSession::open(content, editable, parse_variant(variant));
        let dispatcher = Dispatcher::default();
        let pending = dispatcher.pending.clone();
        session.on_update(move |c| pending.borrow_mut().push(c.to_string()));

        let transport = ReqwestTransport::new();
        let uploader: Rc<dyn AssetUploader> =
            Rc::new(UploadClient::new(config.clone(), transport.clone()));
        let generator: Rc<dyn TextGenerator> = Rc::new(GenerationClient::new(config, transport));
        let notifier = Rc::new(JsNotifier::default());
        let resolver = Rc::new(JsResolver::default());
        let interceptor = session.interceptor(uploader, resolver.clone(), notifier.clone());

        Self {
            session,
            interceptor,
            generator,
            notifier,
            resolver,
            shortcuts: ShortcutMap::new(),
            dispatcher,
        }
    }

    // ─── Content & sync ──────────────────────────────────────────────────

    pub fn get_content(&self) -> String {
        self.session.get_content()
    }

    /// Feed the host's current value back. Returns `"unchanged"`, `"echo"`
    /// or `"reset"`.
    pub fn set_content(&self, value: &str) -> String {
        let outcome = self.session.receive_external(value);
        if outcome == SyncOutcome::Reset {
            self.dispatcher.views.borrow_mut().clear();
        }
        outcome_name(outcome).to_string()
    }

    /// Register `(content) => void`, called once per edit.
    pub fn on_change(&self, callback: js_sys::Function) {
        *self.dispatcher.on_change.borrow_mut() = Some(callback);
    }

    /// Register `(level, message) => void` for toasts.
    pub fn on_notice(&self, callback: js_sys::Function) {
        *self.notifier.callback.borrow_mut() = Some(callback);
    }

    /// Register `(x, y) => position | null` for drops.
    pub fn set_position_resolver(&self, callback: js_sys::Function) {
        *self.resolver.callback.borrow_mut() = Some(callback);
    }

    pub fn set_editable(&self, editable: bool) {
        self.session.handle().with_mut(|e| e.set_editable(editable));
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    pub fn mark_saved(&self) {
        self.session.mark_saved();
    }

    pub fn close(&self) {
        self.session.close();
        self.dispatcher.views.borrow_mut().clear();
    }

    // ─── Selection & typing ──────────────────────────────────────────────

    pub fn set_selection(&self, from: usize, to: usize) {
        self.session.handle().with_mut(|e| e.set_selection(from, to));
    }

    /// JSON `{"from":n,"to":n}`.
    pub fn get_selection(&self) -> String {
        to_json(&self.read(Engine::selection), r#"{"from":0,"to":0}"#)
    }

    pub fn get_selection_text(&self) -> String {
        self.read(Engine::get_selection_text)
    }

    pub fn focus(&self, target: &str) {
        self.session.focus(parse_focus(target));
    }

    pub fn blur(&self) {
        self.session.handle().with_mut(Engine::blur);
    }

    pub fn insert_text(&self, text: &str) -> bool {
        self.edit(|e| e.insert_text(text))
    }

    pub fn delete_backward(&self) -> bool {
        self.edit(Engine::delete_backward)
    }

    pub fn split_block(&self) -> bool {
        self.edit(Engine::split_block)
    }

    // ─── Commands & toolbar ──────────────────────────────────────────────

    /// Apply a command by name (`bold`, `heading` with `"2"`, `set_link`
    /// with the href, ...). Returns false for unknown names.
    pub fn apply_command(&self, name: &str, arg: Option<String>) -> bool {
        match EditorCommand::parse(name, arg.as_deref()) {
            Some(command) => self.edit(|e| e.apply_command(&command)),
            None => false,
        }
    }

    pub fn is_active(&self, name: &str, arg: Option<String>) -> bool {
        EditorCommand::parse(name, arg.as_deref())
            .is_some_and(|command| self.read(|e| e.is_active(&command)))
    }

    /// JSON array of `{command, label, active, enabled}`.
    pub fn toolbar_state(&self) -> String {
        to_json(&self.read(Toolbar::buttons), "[]")
    }

    /// Handle a key event. Returns JSON
    /// `{"handled":bool,"action":"<name>","changed":bool}`. A `link`
    /// action asks the host for a target and then calls `set_link`.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_key(
        &self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_node_view: bool,
    ) -> String {
        let mods = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        let origin = if in_node_view {
            KeyOrigin::NodeViewInput
        } else {
            KeyOrigin::Content
        };
        let Some(action) = self.shortcuts.resolve(key, mods, origin) else {
            return r#"{"handled":false,"action":"none","changed":false}"#.to_string();
        };
        let changed = match &action {
            ShortcutAction::Command(command) => self.edit(|e| e.apply_command(command)),
            ShortcutAction::SelectAll => {
                self.session.handle().with_mut(Engine::select_all);
                false
            }
            ShortcutAction::Link => false,
        };
        serde_json::json!({
            "handled": true,
            "action": action_name(&action),
            "changed": changed,
        })
        .to_string()
    }

    /// Start an AI-assist request over the selection. Resolves to whether
    /// the document changed; rejects with the error message.
    pub fn assist(&self, kind: &str, target_language: Option<String>) -> Result<js_sys::Promise, JsValue> {
        let kind = parse_assist(kind, target_language)
            .ok_or_else(|| error_value(format!("unknown assist kind `{kind}`")))?;
        let task = AssistTask::capture(
            self.session.handle(),
            self.generator.clone(),
            self.notifier.clone(),
            kind,
        )
        .map_err(error_value)?;
        let dispatcher = self.dispatcher.clone();
        Ok(future_to_promise(async move {
            let result = task.run().await;
            dispatcher.flush();
            result.map(JsValue::from_bool).map_err(error_value)
        }))
    }

    // ─── Files ───────────────────────────────────────────────────────────

    /// Whether a dragged or dropped file of this type will be taken over.
    /// Call synchronously from `dragover`/`drop` to decide on
    /// `preventDefault`.
    pub fn accepts_file(&self, mime: &str, has_files: bool) -> bool {
        let event = DragOverEvent { has_files };
        self.interceptor.drag_over(&event).prevent_default
            && LocalFile::new("", mime, Vec::new()).is_image()
    }

    /// A file dropped at `(x, y)`, or on the drop zone. Resolves to the new
    /// image id, or null when the result was discarded.
    pub fn drop_file(
        &self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
        x: f64,
        y: f64,
        on_drop_zone: bool,
    ) -> Option<js_sys::Promise> {
        let event = DropEvent {
            files: vec![LocalFile::new(name, mime, bytes)],
            x,
            y,
            target: if on_drop_zone {
                DropTarget::DropZone
            } else {
                DropTarget::Content
            },
        };
        let task = self.interceptor.drop(event).task?;
        Some(self.spawn(task))
    }

    /// A pasted image; replaces the selection.
    pub fn paste_file(&self, name: &str, mime: &str, bytes: Vec<u8>) -> Option<js_sys::Promise> {
        let event = PasteEvent {
            items: vec![ClipboardItem::File(LocalFile::new(name, mime, bytes))],
        };
        let task = self.interceptor.paste(&event).task?;
        Some(self.spawn(task))
    }

    /// A file from the picker.
    pub fn pick_file(&self, name: &str, mime: &str, bytes: Vec<u8>) -> Option<js_sys::Promise> {
        let task = self.interceptor.pick_file(LocalFile::new(name, mime, bytes))?;
        Some(self.spawn(task))
    }

    // ─── Image node views ────────────────────────────────────────────────

    /// JSON array of image ids in document order.
    pub fn image_ids(&self) -> String {
        let ids: Vec<String> = self.read(|e| {
            let doc = e.document();
            doc.leaves()
                .into_iter()
                .filter(|leaf| !leaf.is_text)
                .map(|leaf| leaf.id.as_str().to_string())
                .collect()
        });
        to_json(&ids, "[]")
    }

    /// Markup for the image's node view; empty when the id is unknown.
    pub fn image_view_html(&self, id: &str) -> String {
        self.with_view(id, |view| view.render()).unwrap_or_default()
    }

    pub fn image_hover(&self, id: &str, hovered: bool) {
        self.with_view(id, |view| view.set_hovered(hovered));
    }

    pub fn image_select(&self, id: &str, selected: bool) {
        self.with_view(id, |view| view.set_selected(selected));
    }

    pub fn image_set_align(&self, id: &str, align: &str) -> bool {
        self.with_view(id, |view| view.set_align(ImageAlign::parse(align)))
            .unwrap_or(false)
    }

    pub fn image_set_width(&self, id: &str, width: &str) -> bool {
        self.with_view(id, |view| view.set_width(ImageWidth::parse(width)))
            .unwrap_or(false)
    }

    pub fn image_delete(&self, id: &str) -> bool {
        self.with_view(id, |view| view.delete()).unwrap_or(false)
    }

    pub fn caption_focus(&self, id: &str) {
        self.with_view(id, ImageNodeView::caption_focus);
    }

    pub fn caption_input(&self, id: &str, value: &str) -> bool {
        self.with_view(id, |view| view.caption_input(value))
            .unwrap_or(false)
    }

    pub fn caption_blur(&self, id: &str) {
        self.with_view(id, ImageNodeView::caption_blur);
    }
}

impl RdEditor {
    fn edit<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let result = self.session.handle().with_mut(f);
        self.dispatcher.flush();
        result
    }

    fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        self.session.handle().with(f)
    }

    fn spawn(&self, task: InsertTask) -> js_sys::Promise {
        let dispatcher = self.dispatcher.clone();
        future_to_promise(async move {
            let result = task.run().await;
            dispatcher.flush();
            match result {
                Ok(Some(id)) => Ok(JsValue::from_str(id.as_str())),
                Ok(None) => Ok(JsValue::NULL),
                Err(err) => Err(error_value(err)),
            }
        })
    }

    fn with_view<R>(&self, id: &str, f: impl FnOnce(&mut ImageNodeView) -> R) -> Option<R> {
        let mut views = self.dispatcher.views.borrow_mut();
        if !views.contains_key(id) {
            let node = NodeId::lookup(id)?;
            let view = ImageNodeView::new(self.session.handle().clone(), node)?;
            views.insert(id.to_string(), view);
        }
        let result = views.get_mut(id).map(f);
        drop(views);
        self.dispatcher.flush();
        result
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Redline WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no editor needed) ─────────────────────────────

/// Validate content markup. Returns JSON: `{"ok":true}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(content: &str) -> String {
    match rd_core::parse_document(content) {
        Ok(_) => r#"{"ok":true}"#.to_string(),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}

/// Canonical form of content markup, as the editor would emit it.
#[wasm_bindgen]
pub fn normalize(content: &str) -> String {
    match rd_core::parse_document(content) {
        Ok(doc) => rd_core::emit_document(&doc),
        Err(_) => rd_core::EMPTY_DOCUMENT.to_string(),
    }
}

/// Plain-text summary for list views, cut at a word boundary.
#[wasm_bindgen]
pub fn summary(content: &str, max_chars: usize) -> String {
    match rd_core::parse_document(content) {
        Ok(doc) => rd_core::truncate_plain(&rd_core::emit_plain_text(&doc), max_chars),
        Err(_) => String::new(),
    }
}
