//! Interactive view of one image node: alignment and width controls, a
//! delete button, and an inline caption input.
//!
//! The view owns only transient UI state. Attributes live in the document
//! and every change goes through the engine as an attribute update, so the
//! node keeps its identity and position.

use crate::engine::EngineHandle;
use crate::input::{EventResponse, KeyEvent, KeyOrigin};
use rd_core::emitter::{escape_attr, escape_text};
use rd_core::{ImageAlign, ImageAttrs, ImageAttrsPatch, ImageWidth, NodeId};

pub const CAPTION_PLACEHOLDER: &str = "Add a caption...";

#[derive(Debug)]
pub struct ImageNodeView {
    engine: EngineHandle,
    id: NodeId,
    hovered: bool,
    selected: bool,
    caption_draft: String,
    caption_focused: bool,
}

impl ImageNodeView {
    /// `None` when `id` is not an image in the document.
    pub fn new(engine: EngineHandle, id: NodeId) -> Option<Self> {
        let caption = engine.with(|e| e.image_attrs(id))?.caption;
        Some(Self {
            engine,
            id,
            hovered: false,
            selected: false,
            caption_draft: caption,
            caption_focused: false,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn attrs(&self) -> Option<ImageAttrs> {
        self.engine.with(|e| e.image_attrs(self.id))
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn controls_visible(&self) -> bool {
        self.hovered || self.selected
    }

    pub fn caption_draft(&self) -> &str {
        &self.caption_draft
    }

    pub fn is_caption_focused(&self) -> bool {
        self.caption_focused
    }

    fn update(&self, patch: ImageAttrsPatch) -> bool {
        self.engine.with_mut(|e| e.update_image(self.id, &patch))
    }

    pub fn set_align(&self, align: ImageAlign) -> bool {
        self.update(ImageAttrsPatch::align(align))
    }

    pub fn set_width(&self, width: ImageWidth) -> bool {
        self.update(ImageAttrsPatch::width(width))
    }

    pub fn delete(&self) -> bool {
        self.engine.with_mut(|e| e.delete_node(self.id))
    }

    // ─── Caption ─────────────────────────────────────────────────────────

    pub fn caption_focus(&mut self) {
        self.caption_focused = true;
    }

    /// Every keystroke in the caption input is pushed as an attribute
    /// update.
    pub fn caption_input(&mut self, value: &str) -> bool {
        self.caption_draft = value.to_string();
        self.update(ImageAttrsPatch::caption(value))
    }

    pub fn caption_blur(&mut self) {
        self.caption_focused = false;
        self.on_attrs_changed();
    }

    /// The node's attributes changed underneath the view. While the caption
    /// input has focus the draft wins.
    pub fn on_attrs_changed(&mut self) {
        if self.caption_focused {
            return;
        }
        if let Some(attrs) = self.attrs() {
            self.caption_draft = attrs.caption;
        }
    }

    /// Keys typed in the view's inputs stay there.
    pub fn handle_key(&self, event: &KeyEvent) -> EventResponse {
        match event.origin {
            KeyOrigin::NodeViewInput => EventResponse::STOP,
            KeyOrigin::Content => EventResponse::IGNORED,
        }
    }

    // ─── Render ──────────────────────────────────────────────────────────

    /// Markup for the host to mount in place of the figure.
    pub fn render(&self) -> String {
        let Some(attrs) = self.attrs() else {
            return String::new();
        };
        let mut out = String::with_capacity(512);
        out.push_str(r#"<div class="image-node"#);
        if self.selected {
            out.push_str(" is-selected");
        }
        out.push_str(r#"" data-align=""#);
        out.push_str(attrs.align.as_str());
        out.push_str(r#"">"#);

        if self.controls_visible() {
            out.push_str(r#"<div class="image-controls">"#);
            for align in ImageAlign::ALL {
                control(&mut out, "align", align.as_str(), align == attrs.align);
            }
            for width in ImageWidth::PRESETS {
                control(&mut out, "width", width.as_str(), width == attrs.width);
            }
            out.push_str(r#"<button type="button" data-action="delete">Delete</button></div>"#);
        }

        out.push_str(r#"<img src=""#);
        escape_attr(&attrs.src, &mut out);
        out.push_str(r#"" alt=""#);
        escape_attr(&attrs.alt, &mut out);
        out.push_str(r#"" style="width: "#);
        escape_attr(attrs.width.as_str(), &mut out);
        out.push_str(r#"">"#);

        out.push_str(r#"<input class="image-caption" type="text" placeholder=""#);
        out.push_str(CAPTION_PLACEHOLDER);
        out.push_str(r#"" value=""#);
        escape_attr(&self.caption_draft, &mut out);
        out.push_str(r#""></div>"#);
        out
    }
}

fn control(out: &mut String, action: &str, value: &str, active: bool) {
    out.push_str(r#"<button type="button" data-action=""#);
    out.push_str(action);
    out.push_str(r#"" data-value=""#);
    escape_attr(value, out);
    out.push('"');
    if active {
        out.push_str(r#" class="active""#);
    }
    out.push('>');
    escape_text(value, out);
    out.push_str("</button>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::input::Modifiers;
    use pretty_assertions::assert_eq;
    use rd_core::Block;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (EngineHandle, NodeId, Rc<RefCell<Vec<String>>>) {
        let mut engine = Engine::initialize("<p>before</p>", true);
        let id = engine
            .insert_at_position(engine.end_position(), Block::image(ImageAttrs::new("/uploads/a.png")))
            .unwrap();
        let emitted = Rc::new(RefCell::new(Vec::new()));
        let sink = emitted.clone();
        engine.on_update(move |c| sink.borrow_mut().push(c.to_string()));
        (EngineHandle::new(engine), id, emitted)
    }

    #[test]
    fn align_and_width_update_in_place() {
        let (engine, id, emitted) = setup();
        let view = ImageNodeView::new(engine.clone(), id).unwrap();
        assert!(view.set_align(ImageAlign::Right));
        assert!(view.set_width(ImageWidth::Half));
        assert!(!view.set_width(ImageWidth::Half));
        assert_eq!(emitted.borrow().len(), 2);
        let attrs = view.attrs().unwrap();
        assert_eq!(attrs.align, ImageAlign::Right);
        assert_eq!(attrs.width, ImageWidth::Half);
        assert_eq!(engine.with(|e| e.document().start_of(id)), Some(7));
    }

    #[test]
    fn caption_keystrokes_each_emit() {
        let (engine, id, emitted) = setup();
        let mut view = ImageNodeView::new(engine, id).unwrap();
        view.caption_focus();
        view.caption_input("F");
        view.caption_input("Fi");
        view.caption_input("Fig");
        assert_eq!(emitted.borrow().len(), 3);
        assert!(emitted.borrow()[2].contains("<figcaption>Fig</figcaption>"));
    }

    #[test]
    fn focused_caption_ignores_external_updates() {
        let (engine, id, _) = setup();
        let mut view = ImageNodeView::new(engine.clone(), id).unwrap();
        view.caption_focus();
        view.caption_input("draft");
        engine.with_mut(|e| e.update_image(id, &ImageAttrsPatch::caption("from elsewhere")));
        view.on_attrs_changed();
        assert_eq!(view.caption_draft(), "draft");
        view.caption_blur();
        assert_eq!(view.caption_draft(), "from elsewhere");
    }

    #[test]
    fn delete_removes_the_node() {
        let (engine, id, _) = setup();
        let view = ImageNodeView::new(engine.clone(), id).unwrap();
        assert!(view.delete());
        assert_eq!(engine.with(Engine::get_content), "<p>before</p>");
        assert!(view.attrs().is_none());
        assert_eq!(view.render(), "");
    }

    #[test]
    fn caption_keys_do_not_propagate() {
        let (engine, id, _) = setup();
        let view = ImageNodeView::new(engine, id).unwrap();
        let key = KeyEvent::new("b", Modifiers::cmd()).from_node_view();
        assert_eq!(view.handle_key(&key), EventResponse::STOP);
    }

    #[test]
    fn render_shows_controls_on_hover() {
        let (engine, id, _) = setup();
        let mut view = ImageNodeView::new(engine, id).unwrap();
        assert!(!view.render().contains("image-controls"));
        view.set_hovered(true);
        let html = view.render();
        assert!(html.contains(r#"data-action="align" data-value="center" class="active""#));
        assert!(html.contains(r#"placeholder="Add a caption...""#));
    }
}
