//! Formatting commands over the selection.
//!
//! Mark toggles on a caret only change the stored marks for the next typed
//! text. Block commands convert or wrap every block the selection touches
//! and toggle back when already active.

use rd_core::inline::{add_mark, has_mark, remove_mark};
use rd_core::transform;
use rd_core::{BlockKind, Document, ListKind, Mark, MarkKind, MarkSet, Selection, TextblockType};
use serde::{Deserialize, Serialize};

/// Upper bound on nested containers unwrapped by `ClearFormatting`.
const MAX_LIFT_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    Bold,
    Italic,
    Code,
    Heading { level: u8 },
    BulletList,
    OrderedList,
    Blockquote,
    CodeBlock,
    ClearFormatting,
    SetLink { href: String },
    UnsetLink,
}

impl EditorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::Bold => "bold",
            EditorCommand::Italic => "italic",
            EditorCommand::Code => "code",
            EditorCommand::Heading { .. } => "heading",
            EditorCommand::BulletList => "bullet_list",
            EditorCommand::OrderedList => "ordered_list",
            EditorCommand::Blockquote => "blockquote",
            EditorCommand::CodeBlock => "code_block",
            EditorCommand::ClearFormatting => "clear_formatting",
            EditorCommand::SetLink { .. } => "set_link",
            EditorCommand::UnsetLink => "unset_link",
        }
    }

    /// Look a command up by name. `heading` takes its level and `set_link`
    /// its href as the argument.
    pub fn parse(name: &str, arg: Option<&str>) -> Option<Self> {
        Some(match name {
            "bold" => EditorCommand::Bold,
            "italic" => EditorCommand::Italic,
            "code" => EditorCommand::Code,
            "heading" => EditorCommand::Heading {
                level: arg?.trim().parse().ok()?,
            },
            "bullet_list" => EditorCommand::BulletList,
            "ordered_list" => EditorCommand::OrderedList,
            "blockquote" => EditorCommand::Blockquote,
            "code_block" => EditorCommand::CodeBlock,
            "clear_formatting" => EditorCommand::ClearFormatting,
            "set_link" => EditorCommand::SetLink {
                href: arg?.to_string(),
            },
            "unset_link" => EditorCommand::UnsetLink,
            _ => return None,
        })
    }

    pub fn label(&self) -> String {
        match self {
            EditorCommand::Bold => "Bold".into(),
            EditorCommand::Italic => "Italic".into(),
            EditorCommand::Code => "Inline code".into(),
            EditorCommand::Heading { level } => format!("Heading {level}"),
            EditorCommand::BulletList => "Bullet list".into(),
            EditorCommand::OrderedList => "Numbered list".into(),
            EditorCommand::Blockquote => "Quote".into(),
            EditorCommand::CodeBlock => "Code block".into(),
            EditorCommand::ClearFormatting => "Clear formatting".into(),
            EditorCommand::SetLink { .. } => "Link".into(),
            EditorCommand::UnsetLink => "Remove link".into(),
        }
    }

    fn mark(&self) -> Option<Mark> {
        match self {
            EditorCommand::Bold => Some(Mark::Bold),
            EditorCommand::Italic => Some(Mark::Italic),
            EditorCommand::Code => Some(Mark::Code),
            _ => None,
        }
    }
}

// ─── Apply ───────────────────────────────────────────────────────────────

/// Apply a command. Returns whether the document or the stored marks
/// changed.
pub(crate) fn apply(
    command: &EditorCommand,
    doc: &mut Document,
    sel: Selection,
    stored: &mut Option<MarkSet>,
) -> bool {
    let Selection { from, to } = sel;
    if let Some(mark) = command.mark() {
        return toggle_mark(doc, sel, stored, mark);
    }
    match command {
        EditorCommand::Heading { level } => {
            if !(1..=rd_core::MAX_HEADING_LEVEL).contains(level) {
                return false;
            }
            toggle_textblock(doc, sel, TextblockType::Heading(*level))
        }
        EditorCommand::CodeBlock => toggle_textblock(doc, sel, TextblockType::CodeBlock),
        EditorCommand::BulletList => toggle_list(doc, sel, ListKind::Bullet),
        EditorCommand::OrderedList => toggle_list(doc, sel, ListKind::Ordered),
        EditorCommand::Blockquote => match enclosing_quote(doc, sel) {
            Some(path) => transform::lift_quote(doc, &path),
            None => transform::wrap_in_quote(doc, from, to),
        },
        EditorCommand::ClearFormatting => clear_formatting(doc, sel, stored),
        EditorCommand::SetLink { href } => set_link(doc, sel, href),
        EditorCommand::UnsetLink => {
            let (from, to) = if sel.is_caret() {
                match transform::link_range(doc, from) {
                    Some(range) => range,
                    None => return false,
                }
            } else {
                (from, to)
            };
            transform::map_marks(doc, from, to, |marks| remove_mark(marks, MarkKind::Link))
        }
        EditorCommand::Bold | EditorCommand::Italic | EditorCommand::Code => false,
    }
}

fn toggle_mark(doc: &mut Document, sel: Selection, stored: &mut Option<MarkSet>, mark: Mark) -> bool {
    let kind = mark.kind();
    if sel.is_caret() {
        let mut marks = stored
            .take()
            .unwrap_or_else(|| transform::marks_at(doc, sel.from));
        if has_mark(&marks, kind) {
            remove_mark(&mut marks, kind);
        } else {
            add_mark(&mut marks, mark);
        }
        *stored = Some(marks);
        return true;
    }
    if transform::range_has_mark(doc, sel.from, sel.to, kind) {
        transform::map_marks(doc, sel.from, sel.to, |marks| remove_mark(marks, kind))
    } else {
        transform::map_marks(doc, sel.from, sel.to, |marks| add_mark(marks, mark.clone()))
    }
}

fn toggle_textblock(doc: &mut Document, sel: Selection, ty: TextblockType) -> bool {
    let target = if all_textblocks_are(doc, sel, ty) {
        TextblockType::Paragraph
    } else {
        ty
    };
    transform::set_textblock_type(doc, sel.from, sel.to, target)
}

fn toggle_list(doc: &mut Document, sel: Selection, kind: ListKind) -> bool {
    match enclosing_list(doc, sel) {
        Some((path, current)) if current == kind => {
            transform::lift_list_items(doc, &path, sel.from, sel.to)
        }
        Some((path, _)) => transform::set_list_kind(doc, &path, kind),
        None => transform::wrap_in_list(doc, sel.from, sel.to, kind),
    }
}

fn clear_formatting(doc: &mut Document, sel: Selection, stored: &mut Option<MarkSet>) -> bool {
    let Selection { from, to } = sel;
    let mut changed = false;
    if sel.is_caret() {
        changed |= stored.as_ref().is_none_or(|marks| !marks.is_empty());
        *stored = Some(MarkSet::new());
    } else {
        changed |= transform::map_marks(doc, from, to, MarkSet::clear);
    }
    changed |= transform::set_textblock_type(doc, from, to, TextblockType::Paragraph);
    for _ in 0..MAX_LIFT_DEPTH {
        let lifted = if let Some((path, _)) = enclosing_list(doc, sel) {
            transform::lift_list_items(doc, &path, from, to)
        } else if let Some(path) = enclosing_quote(doc, sel) {
            transform::lift_quote(doc, &path)
        } else {
            false
        };
        if !lifted {
            break;
        }
        changed = true;
    }
    changed
}

fn set_link(doc: &mut Document, sel: Selection, href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || !rd_core::sanitize::is_safe_href(href) {
        log::debug!("refusing link target {href:?}");
        return false;
    }
    let (from, to) = if sel.is_caret() {
        match transform::link_range(doc, sel.from) {
            Some(range) => range,
            None => return false,
        }
    } else {
        (sel.from, sel.to)
    };
    let link = Mark::Link {
        href: href.to_string(),
    };
    transform::map_marks(doc, from, to, |marks| {
        remove_mark(marks, MarkKind::Link);
        add_mark(marks, link.clone());
    })
}

// ─── Active state ────────────────────────────────────────────────────────

pub(crate) fn is_active(
    command: &EditorCommand,
    doc: &Document,
    sel: Selection,
    stored: Option<&MarkSet>,
) -> bool {
    if let Some(mark) = command.mark() {
        return mark_active(doc, sel, stored, mark.kind());
    }
    match command {
        EditorCommand::Heading { level } => {
            all_textblocks_are(doc, sel, TextblockType::Heading(*level))
        }
        EditorCommand::CodeBlock => all_textblocks_are(doc, sel, TextblockType::CodeBlock),
        EditorCommand::BulletList => {
            enclosing_list(doc, sel).is_some_and(|(_, kind)| kind == ListKind::Bullet)
        }
        EditorCommand::OrderedList => {
            enclosing_list(doc, sel).is_some_and(|(_, kind)| kind == ListKind::Ordered)
        }
        EditorCommand::Blockquote => enclosing_quote(doc, sel).is_some(),
        EditorCommand::SetLink { .. } | EditorCommand::UnsetLink => {
            mark_active(doc, sel, stored, MarkKind::Link)
        }
        _ => false,
    }
}

fn mark_active(doc: &Document, sel: Selection, stored: Option<&MarkSet>, kind: MarkKind) -> bool {
    if sel.is_caret() {
        return match stored {
            Some(marks) => has_mark(marks, kind),
            None => has_mark(&transform::marks_at(doc, sel.from), kind),
        };
    }
    transform::range_has_mark(doc, sel.from, sel.to, kind)
}

fn all_textblocks_are(doc: &Document, sel: Selection, ty: TextblockType) -> bool {
    let types = transform::textblock_types(doc, sel.from, sel.to);
    !types.is_empty() && types.iter().all(|t| *t == ty)
}

fn enclosing_list(doc: &Document, sel: Selection) -> Option<(Vec<usize>, ListKind)> {
    let path = transform::enclosing(doc, sel.from, sel.to, |b| b.list_kind().is_some())?;
    let kind = doc.block_at(&path)?.list_kind()?;
    Some((path, kind))
}

fn enclosing_quote(doc: &Document, sel: Selection) -> Option<Vec<usize>> {
    transform::enclosing(doc, sel.from, sel.to, |b| {
        matches!(b.kind, BlockKind::Blockquote { .. })
    })
}
