//! Structural edits over a `Document`.
//!
//! Every edit takes flattened positions, mutates the tree in place and
//! leaves it normalized. Edits that cannot apply return `false` or `None`
//! and leave the document untouched.

use crate::id::NodeId;
use crate::inline::{Inline, MarkKind, MarkSet};
use crate::model::*;

// ─── Ranges ──────────────────────────────────────────────────────────────

/// A run of sibling blocks `start..=end` under the block at `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRange {
    pub parent: Vec<usize>,
    pub start: usize,
    pub end: usize,
}

/// Leaves whose closed span touches `[from, to]`.
pub fn leaves_touching(doc: &Document, from: usize, to: usize) -> Vec<Leaf> {
    doc.leaves()
        .into_iter()
        .filter(|leaf| leaf.touches(from, to))
        .collect()
}

fn common_prefix(a: &[usize], b: &[usize]) -> Vec<usize> {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// Leaf index and local offset of a position. Positions are gap free, so
/// the first leaf whose end is at or after `pos` holds it.
fn locate(leaves: &[Leaf], pos: usize) -> Option<(usize, usize)> {
    leaves
        .iter()
        .position(|leaf| pos <= leaf.end())
        .map(|i| (i, pos.saturating_sub(leaves[i].start)))
}

/// The sibling range covering a selection, lifted out of list nodes so it
/// never addresses list items directly.
pub fn block_range(doc: &Document, from: usize, to: usize) -> Option<BlockRange> {
    let leaves = leaves_touching(doc, from, to);
    let first = &leaves.first()?.path;
    let last = &leaves.last()?.path;
    let common = common_prefix(first, last);
    let mut depth = common.len().min(first.len() - 1).min(last.len() - 1);
    while depth > 0
        && doc
            .block_at(&first[..depth])
            .is_some_and(|b| b.list_kind().is_some())
    {
        depth -= 1;
    }
    Some(BlockRange {
        parent: first[..depth].to_vec(),
        start: first[depth],
        end: last[depth],
    })
}

/// Deepest block enclosing the whole selection that satisfies `pred`.
pub fn enclosing(
    doc: &Document,
    from: usize,
    to: usize,
    pred: impl Fn(&Block) -> bool,
) -> Option<Vec<usize>> {
    let leaves = leaves_touching(doc, from, to);
    let common = common_prefix(&leaves.first()?.path, &leaves.last()?.path);
    (1..=common.len())
        .rev()
        .map(|n| &common[..n])
        .find(|path| doc.block_at(path).is_some_and(&pred))
        .map(<[usize]>::to_vec)
}

fn remove_at(doc: &mut Document, path: &[usize]) -> Option<Block> {
    let (&idx, parent) = path.split_last()?;
    let siblings = doc.siblings_mut(parent)?;
    (idx < siblings.len()).then(|| siblings.remove(idx))
}

fn content_at<'a>(doc: &'a mut Document, path: &[usize]) -> Option<&'a mut Inline> {
    doc.block_at_mut(path)?.content_mut()
}

// ─── Text & block edits ──────────────────────────────────────────────────

/// Delete `[from, to)`. Partially covered textblocks at both ends are
/// joined; whole leaves in between are removed.
pub fn delete_range(doc: &mut Document, from: usize, to: usize) -> bool {
    let size = doc.size();
    let (from, to) = (from.min(size), to.min(size));
    if from >= to {
        return false;
    }
    let leaves = doc.leaves();
    let (Some(a), Some(b)) = (locate(&leaves, from), locate(&leaves, to)) else {
        return false;
    };

    if a.0 == b.0 {
        let leaf = &leaves[a.0];
        if leaf.is_text {
            if let Some(content) = content_at(doc, &leaf.path) {
                content.delete(a.1, b.1);
            }
        } else {
            remove_at(doc, &leaf.path);
        }
        doc.normalize();
        return true;
    }

    let first = &leaves[a.0];
    let last = &leaves[b.0];
    let mut doomed: Vec<&[usize]> = Vec::new();

    if first.is_text {
        if let Some(content) = content_at(doc, &first.path) {
            content.split_off(a.1);
        }
    } else if a.1 == 0 {
        doomed.push(&first.path);
    }

    doomed.extend(leaves[a.0 + 1..b.0].iter().map(|l| l.path.as_slice()));

    if last.is_text {
        let tail = content_at(doc, &last.path)
            .map(|c| c.split_off(b.1))
            .unwrap_or_default();
        if first.is_text {
            if let Some(content) = content_at(doc, &first.path) {
                content.append(tail);
            }
            doomed.push(&last.path);
        } else if let Some(content) = content_at(doc, &last.path) {
            *content = tail;
        }
    } else if b.1 > 0 {
        doomed.push(&last.path);
    }

    // Reverse document order keeps the remaining paths valid.
    for path in doomed.into_iter().rev() {
        remove_at(doc, path);
    }
    doc.normalize();
    true
}

/// Insert a block at a position. Inside a textblock the block is split;
/// at either edge of a leaf the new block goes before or after it.
pub fn insert_block(doc: &mut Document, pos: usize, block: Block) -> Option<NodeId> {
    let id = block.id;
    let at = doc.resolve(pos)?;
    let (&idx, parent) = at.leaf.path.split_last()?;
    let siblings = doc.siblings_mut(parent)?;

    let insert_idx = if at.offset == 0 {
        idx
    } else if at.offset >= at.leaf.size {
        idx + 1
    } else {
        let tail = siblings.get_mut(idx)?.split_textblock(at.offset)?;
        siblings.insert(idx + 1, tail);
        idx + 1
    };
    siblings.insert(insert_idx, block);
    doc.normalize();
    log::trace!("inserted {id:?} at {pos}");
    Some(id)
}

/// Insert text at a position and return the caret after it. Typing on an
/// image opens a new paragraph next to it.
pub fn insert_text(doc: &mut Document, pos: usize, text: &str, marks: MarkSet) -> Option<usize> {
    let at = doc.resolve(pos)?;
    let len = text.chars().count();
    if at.leaf.is_text {
        let block = doc.block_at_mut(&at.leaf.path)?;
        let marks = match block.kind {
            BlockKind::CodeBlock { .. } => MarkSet::new(),
            _ => marks,
        };
        block.content_mut()?.insert_text(at.offset, text, marks);
        return Some(at.leaf.start + at.offset + len);
    }
    let mut content = Inline::new();
    content.insert_text(0, text, marks);
    let id = insert_block(doc, pos, Block::paragraph(content))?;
    doc.end_of(id)
}

/// Split the block at a position (the Enter key) and return the new caret.
///
/// Code blocks take a literal newline. A split inside a list item splits
/// the item. A heading split at its very end continues as a paragraph.
pub fn split_block(doc: &mut Document, pos: usize) -> Option<usize> {
    let at = doc.resolve(pos)?;
    if !at.leaf.is_text {
        let target = if at.offset == 0 {
            at.leaf.start
        } else {
            at.leaf.end()
        };
        let id = insert_block(doc, target, Block::empty_paragraph())?;
        return doc.start_of(id);
    }

    let caret = at.leaf.start + at.offset + 1;
    let (&idx, parent) = at.leaf.path.split_last()?;
    let block = doc.block_at_mut(&at.leaf.path)?;
    if let BlockKind::CodeBlock { content } = &mut block.kind {
        content.insert_text(at.offset, "\n", MarkSet::new());
        return Some(caret);
    }
    let mut tail = block.split_textblock(at.offset)?;
    if at.offset >= at.leaf.size && matches!(tail.kind, BlockKind::Heading { .. }) {
        tail.set_textblock_type(TextblockType::Paragraph);
    }

    let in_item = !parent.is_empty()
        && doc
            .block_at(parent)
            .is_some_and(|b| matches!(b.kind, BlockKind::ListItem { .. }));
    if in_item {
        let (&item_idx, list_path) = parent.split_last()?;
        let items = doc.siblings_mut(list_path)?;
        let children = items.get_mut(item_idx)?.children_mut()?;
        let mut moved = children.split_off(idx + 1);
        moved.insert(0, tail);
        items.insert(item_idx + 1, Block::list_item(moved));
    } else {
        doc.siblings_mut(parent)?.insert(idx + 1, tail);
    }
    Some(caret)
}

pub fn remove_block(doc: &mut Document, id: NodeId) -> bool {
    let Some(path) = doc.find(id) else {
        return false;
    };
    let removed = remove_at(doc, &path).is_some();
    doc.normalize();
    removed
}

/// Merge a patch into an image's attributes. Identity is unchanged.
pub fn update_image(doc: &mut Document, id: NodeId, patch: &ImageAttrsPatch) -> bool {
    match doc.block_mut(id).map(|b| &mut b.kind) {
        Some(BlockKind::Image(attrs)) => attrs.merge(patch),
        _ => false,
    }
}

// ─── Marks ───────────────────────────────────────────────────────────────

/// Apply `f` to the marks of every char in `[from, to)`. Code blocks are
/// skipped. Returns true if any run changed.
pub fn map_marks(doc: &mut Document, from: usize, to: usize, mut f: impl FnMut(&mut MarkSet)) -> bool {
    let mut changed = false;
    for leaf in doc.leaves().iter().filter(|l| l.is_text) {
        let Some((lf, lt)) = leaf.local_range(from, to) else {
            continue;
        };
        let Some(block) = doc.block_at_mut(&leaf.path) else {
            continue;
        };
        if matches!(block.kind, BlockKind::CodeBlock { .. }) {
            continue;
        }
        if let Some(content) = block.content_mut() {
            let before = content.clone();
            content.map_marks(lf, lt, &mut f);
            changed |= *content != before;
        }
    }
    changed
}

/// True when every markable char in `[from, to)` carries `kind`.
pub fn range_has_mark(doc: &Document, from: usize, to: usize, kind: MarkKind) -> bool {
    let mut seen = false;
    for leaf in doc.leaves().iter().filter(|l| l.is_text) {
        let Some((lf, lt)) = leaf.local_range(from, to) else {
            continue;
        };
        let Some(block) = doc.block_at(&leaf.path) else {
            continue;
        };
        if matches!(block.kind, BlockKind::CodeBlock { .. }) {
            continue;
        }
        let Some(content) = block.content() else {
            continue;
        };
        if !content.covers_mark(lf, lt, kind) {
            return false;
        }
        seen = true;
    }
    seen
}

/// Marks inherited by text typed at `pos`.
pub fn marks_at(doc: &Document, pos: usize) -> MarkSet {
    doc.resolve(pos)
        .filter(|at| at.leaf.is_text)
        .and_then(|at| {
            let block = doc.block_at(&at.leaf.path)?;
            Some(block.content()?.marks_at(at.offset))
        })
        .unwrap_or_default()
}

/// Document range of the link touching a caret.
pub fn link_range(doc: &Document, pos: usize) -> Option<(usize, usize)> {
    let at = doc.resolve(pos)?;
    let content = doc.block_at(&at.leaf.path)?.content()?;
    let (a, b) = content.link_range_at(at.offset)?;
    Some((at.leaf.start + a, at.leaf.start + b))
}

// ─── Block types ─────────────────────────────────────────────────────────

pub fn textblock_types(doc: &Document, from: usize, to: usize) -> Vec<TextblockType> {
    leaves_touching(doc, from, to)
        .iter()
        .filter_map(|leaf| doc.block_at(&leaf.path)?.textblock_type())
        .collect()
}

/// Convert every textblock touching the selection.
pub fn set_textblock_type(doc: &mut Document, from: usize, to: usize, ty: TextblockType) -> bool {
    let mut changed = false;
    for leaf in leaves_touching(doc, from, to) {
        if let Some(block) = doc.block_at_mut(&leaf.path) {
            changed |= block.set_textblock_type(ty);
        }
    }
    changed
}

// ─── Lists & quotes ──────────────────────────────────────────────────────

pub fn wrap_in_list(doc: &mut Document, from: usize, to: usize, kind: ListKind) -> bool {
    wrap_range(doc, from, to, |blocks| {
        let items = blocks.into_iter().map(|b| Block::list_item(vec![b])).collect();
        Block::list(kind, items)
    })
}

pub fn wrap_in_quote(doc: &mut Document, from: usize, to: usize) -> bool {
    wrap_range(doc, from, to, Block::blockquote)
}

fn wrap_range(doc: &mut Document, from: usize, to: usize, wrap: impl FnOnce(Vec<Block>) -> Block) -> bool {
    let Some(range) = block_range(doc, from, to) else {
        return false;
    };
    let Some(siblings) = doc.siblings_mut(&range.parent) else {
        return false;
    };
    if range.end >= siblings.len() {
        return false;
    }
    let taken: Vec<Block> = siblings.drain(range.start..=range.end).collect();
    siblings.insert(range.start, wrap(taken));
    doc.normalize();
    true
}

/// Lift the items of the list at `list_path` touched by the selection out
/// of the list. Untouched items before and after stay in their own lists.
pub fn lift_list_items(doc: &mut Document, list_path: &[usize], from: usize, to: usize) -> bool {
    lift_items(doc, list_path, from, to).is_some()
}

fn lift_items(doc: &mut Document, list_path: &[usize], from: usize, to: usize) -> Option<()> {
    let depth = list_path.len();
    let touched: Vec<usize> = leaves_touching(doc, from, to)
        .iter()
        .filter(|leaf| leaf.path.starts_with(list_path))
        .filter_map(|leaf| leaf.path.get(depth).copied())
        .collect();
    let first_item = *touched.first()?;
    let last_item = *touched.last()?;

    let (&list_idx, parent) = list_path.split_last()?;
    let kind = doc.block_at(list_path)?.list_kind()?;
    let siblings = doc.siblings_mut(parent)?;
    let list = siblings.remove(list_idx);
    let list_id = list.id;
    let mut items = match list.kind {
        BlockKind::BulletList { items } | BlockKind::OrderedList { items } => items,
        _ => return None,
    };
    let after = items.split_off(last_item + 1);
    let lifted = items.split_off(first_item);
    let before = items;

    let mut replacement = Vec::new();
    if !before.is_empty() {
        let mut head = Block::list(kind, before);
        head.id = list_id;
        replacement.push(head);
    }
    for item in lifted {
        match item.kind {
            BlockKind::ListItem { children } => replacement.extend(children),
            _ => replacement.push(item),
        }
    }
    if !after.is_empty() {
        replacement.push(Block::list(kind, after));
    }
    siblings.splice(list_idx..list_idx, replacement);
    doc.normalize();
    Some(())
}

/// Switch a list between bullet and ordered, keeping its items and id.
pub fn set_list_kind(doc: &mut Document, list_path: &[usize], kind: ListKind) -> bool {
    let Some(block) = doc.block_at_mut(list_path) else {
        return false;
    };
    if block.list_kind().is_none_or(|k| k == kind) {
        return false;
    }
    let items = block.children_mut().map(std::mem::take).unwrap_or_default();
    block.kind = match kind {
        ListKind::Bullet => BlockKind::BulletList { items },
        ListKind::Ordered => BlockKind::OrderedList { items },
    };
    true
}

/// Replace the blockquote at `path` with its children.
pub fn lift_quote(doc: &mut Document, path: &[usize]) -> bool {
    let Some(Block {
        kind: BlockKind::Blockquote { children },
        ..
    }) = doc.block_at(path).cloned()
    else {
        return false;
    };
    let Some((&idx, parent)) = path.split_last() else {
        return false;
    };
    let Some(siblings) = doc.siblings_mut(parent) else {
        return false;
    };
    siblings.splice(idx..=idx, children);
    doc.normalize();
    true
}
