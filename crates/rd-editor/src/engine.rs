//! The document engine: the editable document, its selection, and the
//! emit discipline that keeps an external owner in sync.
//!
//! Every discrete edit that changes the serialization emits exactly once.
//! Selection moves, focus, and stored-mark toggles never emit.

use crate::commands::{self, EditorCommand};
use crate::sync::{EchoGuard, SyncOutcome};
use rd_core::transform;
use rd_core::{
    Block, Document, ImageAttrs, ImageAttrsPatch, MarkSet, NodeId, Selection, emit_document,
    parse_document,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives the serialized content after each edit.
pub type Listener = Box<dyn FnMut(&str)>;

/// Identifies one lifetime of the engine's content. Results of async work
/// started under an older token are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SessionToken(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// What `replace_selection` puts in place of the selected range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Text(String),
    Block(Block),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    #[default]
    Current,
    Start,
    End,
}

pub struct Engine {
    doc: Document,
    content: String,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    editable: bool,
    focused: bool,
    closed: bool,
    session: SessionToken,
    guard: EchoGuard,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("content", &self.content)
            .field("selection", &self.selection)
            .field("editable", &self.editable)
            .field("closed", &self.closed)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn parse_or_empty(content: &str) -> Document {
    match parse_document(content) {
        Ok(doc) => doc,
        Err(err) => {
            log::warn!("unreadable content, starting empty: {err}");
            Document::new()
        }
    }
}

impl Engine {
    /// Build an engine from serialized content. Unreadable content yields
    /// the empty document.
    pub fn initialize(content: &str, editable: bool) -> Self {
        let doc = parse_or_empty(content);
        let content = emit_document(&doc);
        Self {
            doc,
            content,
            selection: Selection::caret(0),
            stored_marks: None,
            editable,
            focused: false,
            closed: false,
            session: SessionToken::next(),
            guard: EchoGuard::new(),
            listeners: Vec::new(),
        }
    }

    // ─── State ───────────────────────────────────────────────────────────

    pub fn get_content(&self) -> String {
        self.content.clone()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    /// True while async work started under `token` may still apply.
    pub fn is_current(&self, token: SessionToken) -> bool {
        !self.closed && self.session == token
    }

    /// Largest valid position; inserting here appends to the document.
    pub fn end_position(&self) -> usize {
        self.doc.size()
    }

    pub fn text_between(&self, from: usize, to: usize) -> String {
        self.doc.text_between(from, to)
    }

    pub fn on_update(&mut self, listener: impl FnMut(&str) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ─── Sync ────────────────────────────────────────────────────────────

    /// Replace the document without notifying listeners.
    pub fn set_content(&mut self, content: &str) {
        if self.closed {
            return;
        }
        self.doc = parse_or_empty(content);
        self.content = emit_document(&self.doc);
        self.selection = self.selection.clamp(self.doc.size());
        self.stored_marks = None;
    }

    /// Apply a value coming from the external owner.
    ///
    /// A value equal to the current content, or to one of our own pending
    /// emissions, leaves the document and selection alone. Anything else
    /// replaces the document and starts a new session.
    pub fn receive_external(&mut self, value: &str) -> SyncOutcome {
        if self.closed {
            return SyncOutcome::Unchanged;
        }
        if value == self.content {
            self.guard.acknowledge(value);
            return SyncOutcome::Unchanged;
        }
        if self.guard.acknowledge(value) {
            log::trace!("ignoring echo of an earlier emission");
            return SyncOutcome::Echo;
        }
        log::debug!("external content change, resetting document");
        self.set_content(value);
        self.guard.clear();
        self.session = SessionToken::next();
        SyncOutcome::Reset
    }

    fn can_edit(&self) -> bool {
        self.editable && !self.closed
    }

    /// Serialize after an edit and notify listeners if the content moved.
    fn commit(&mut self) -> bool {
        self.selection = self.selection.clamp(self.doc.size());
        let content = emit_document(&self.doc);
        if content == self.content {
            return false;
        }
        self.content = content;
        self.guard.record(&self.content);
        for listener in &mut self.listeners {
            listener(&self.content);
        }
        true
    }

    // ─── Selection & focus ───────────────────────────────────────────────

    pub fn set_selection(&mut self, from: usize, to: usize) {
        self.selection = Selection::range(from, to).clamp(self.doc.size());
        self.stored_marks = None;
    }

    pub fn select_all(&mut self) {
        self.set_selection(0, self.doc.size());
    }

    pub fn focus(&mut self, target: FocusTarget) {
        self.focused = true;
        match target {
            FocusTarget::Current => {}
            FocusTarget::Start => self.set_selection(0, 0),
            FocusTarget::End => {
                let end = self.doc.size();
                self.set_selection(end, end);
            }
        }
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn get_selection_text(&self) -> String {
        self.doc.text_between(self.selection.from, self.selection.to)
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Run a formatting command against the selection. Returns whether the
    /// command did anything, including caret-only stored-mark changes.
    pub fn apply_command(&mut self, command: &EditorCommand) -> bool {
        if !self.can_edit() {
            return false;
        }
        let applied = commands::apply(
            command,
            &mut self.doc,
            self.selection,
            &mut self.stored_marks,
        );
        if applied {
            self.commit();
        }
        applied
    }

    pub fn is_active(&self, command: &EditorCommand) -> bool {
        commands::is_active(command, &self.doc, self.selection, self.stored_marks.as_ref())
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Insert a block at a position; the caret lands after it.
    pub fn insert_at_position(&mut self, pos: usize, block: Block) -> Option<NodeId> {
        if !self.can_edit() {
            return None;
        }
        let id = transform::insert_block(&mut self.doc, pos, block)?;
        self.place_caret_after(id);
        self.commit();
        Some(id)
    }

    /// Replace the selection with a block, or insert it at the caret.
    pub fn insert_at_selection(&mut self, block: Block) -> Option<NodeId> {
        if !self.can_edit() {
            return None;
        }
        let Selection { from, to } = self.selection;
        transform::delete_range(&mut self.doc, from, to);
        let Some(id) = transform::insert_block(&mut self.doc, from, block) else {
            self.selection = Selection::caret(from);
            self.commit();
            return None;
        };
        self.place_caret_after(id);
        self.commit();
        Some(id)
    }

    fn place_caret_after(&mut self, id: NodeId) {
        let size = self.doc.size();
        let caret = self.doc.end_of(id).map_or(size, |end| (end + 1).min(size));
        self.selection = Selection::caret(caret);
        self.stored_marks = None;
    }

    pub fn replace_selection(&mut self, replacement: Replacement) -> bool {
        let Selection { from, to } = self.selection;
        self.replace_range(from, to, replacement)
    }

    /// Replace `[from, to)` in one edit.
    pub fn replace_range(&mut self, from: usize, to: usize, replacement: Replacement) -> bool {
        if !self.can_edit() {
            return false;
        }
        match replacement {
            Replacement::Block(block) => {
                self.selection = Selection::range(from, to).clamp(self.doc.size());
                self.insert_at_selection(block).is_some()
            }
            Replacement::Text(text) => {
                let marks = self
                    .stored_marks
                    .take()
                    .unwrap_or_else(|| transform::marks_at(&self.doc, from));
                let deleted = transform::delete_range(&mut self.doc, from, to);
                if text.is_empty() {
                    self.selection = Selection::caret(from);
                    return deleted && self.commit();
                }
                match transform::insert_text(&mut self.doc, from, &text, marks) {
                    Some(caret) => {
                        self.selection = Selection::caret(caret);
                        self.commit()
                    }
                    None => deleted && self.commit(),
                }
            }
        }
    }

    /// Type text at the selection, carrying stored marks if any.
    pub fn insert_text(&mut self, text: &str) -> bool {
        self.replace_selection(Replacement::Text(text.to_string()))
    }

    pub fn delete_selection(&mut self) -> bool {
        if !self.can_edit() || self.selection.is_caret() {
            return false;
        }
        let Selection { from, to } = self.selection;
        transform::delete_range(&mut self.doc, from, to);
        self.selection = Selection::caret(from);
        self.commit()
    }

    /// Backspace: delete the selection, or the character, image, or block
    /// boundary before the caret.
    pub fn delete_backward(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        if !self.selection.is_caret() {
            return self.delete_selection();
        }
        let pos = self.selection.from;
        let Some(at) = self.doc.resolve(pos) else {
            return false;
        };
        if at.offset > 0 {
            transform::delete_range(&mut self.doc, pos - 1, pos);
            self.selection = Selection::caret(pos - 1);
            return self.commit();
        }
        if self.lift_at_start(pos) {
            return self.commit();
        }
        if at.index == 0 {
            return false;
        }
        let leaves = self.doc.leaves();
        let Some(prev) = leaves.get(at.index - 1) else {
            return false;
        };
        if !prev.is_text {
            let prev_start = prev.start;
            transform::remove_block(&mut self.doc, prev.id);
            self.selection = Selection::caret(prev_start);
            return self.commit();
        }
        if !at.leaf.is_text {
            self.selection = Selection::caret(prev.end());
            return false;
        }
        transform::delete_range(&mut self.doc, pos - 1, pos);
        self.selection = Selection::caret(pos - 1);
        self.commit()
    }

    /// At the very start of a list item or quote, backspace lifts it out.
    fn lift_at_start(&mut self, pos: usize) -> bool {
        let Some(at) = self.doc.resolve(pos) else {
            return false;
        };
        let leaves = self.doc.leaves();
        let first_leaf_of = |path: &[usize]| {
            leaves
                .iter()
                .find(|leaf| leaf.path.starts_with(path))
                .is_some_and(|leaf| leaf.path == at.leaf.path)
        };
        let list = transform::enclosing(&self.doc, pos, pos, |b| b.list_kind().is_some());
        if let Some(list) = list {
            let mut item = list.clone();
            if let Some(&idx) = at.leaf.path.get(list.len()) {
                item.push(idx);
                if first_leaf_of(&item) {
                    return transform::lift_list_items(&mut self.doc, &list, pos, pos);
                }
            }
        }
        let quote = transform::enclosing(&self.doc, pos, pos, |b| {
            matches!(b.kind, rd_core::BlockKind::Blockquote { .. })
        });
        match quote {
            Some(path) if first_leaf_of(&path) => transform::lift_quote(&mut self.doc, &path),
            _ => false,
        }
    }

    /// Enter: split the block at the caret, replacing any selection.
    pub fn split_block(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        let Selection { from, to } = self.selection;
        transform::delete_range(&mut self.doc, from, to);
        match transform::split_block(&mut self.doc, from) {
            Some(caret) => {
                self.selection = Selection::caret(caret);
                self.commit()
            }
            None => false,
        }
    }

    // ─── Images ──────────────────────────────────────────────────────────

    pub fn image_attrs(&self, id: NodeId) -> Option<ImageAttrs> {
        self.doc.image_attrs(id).cloned()
    }

    pub fn update_image(&mut self, id: NodeId, patch: &ImageAttrsPatch) -> bool {
        if !self.can_edit() {
            return false;
        }
        transform::update_image(&mut self.doc, id, patch) && self.commit()
    }

    pub fn delete_node(&mut self, id: NodeId) -> bool {
        if !self.can_edit() {
            return false;
        }
        transform::remove_block(&mut self.doc, id) && self.commit()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Stop the engine: listeners are dropped and in-flight work is
    /// invalidated.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.focused = false;
        self.listeners.clear();
        self.guard.clear();
        self.session = SessionToken::next();
        log::debug!("engine closed");
    }
}

/// Shared handle on an engine for node views, interceptors, and async
/// tasks on the same thread.
///
/// Listeners run while the engine is borrowed and must not call back into
/// the handle.
#[derive(Clone)]
pub struct EngineHandle(Rc<RefCell<Engine>>);

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(engine) => std::fmt::Debug::fmt(&*engine, f),
            Err(_) => f.write_str("EngineHandle(<borrowed>)"),
        }
    }
}

impl EngineHandle {
    pub fn new(engine: Engine) -> Self {
        Self(Rc::new(RefCell::new(engine)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn session(&self) -> SessionToken {
        self.with(Engine::session)
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        self.with(|engine| engine.is_current(token))
    }
}
