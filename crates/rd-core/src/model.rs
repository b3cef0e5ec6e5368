//! Core document model for report content.
//!
//! A document is an ordered tree of blocks. Textblocks (paragraphs,
//! headings, code blocks) hold inline runs; lists, list items and
//! blockquotes hold child blocks; images are atomic leaves.
//!
//! Positions are flattened over leaves: a textblock spans its char count,
//! an image spans 1, and consecutive leaves are one position apart.

use crate::id::NodeId;
use crate::inline::Inline;
use serde::{Deserialize, Serialize};

/// Serialization of a document holding a single empty paragraph.
pub const EMPTY_DOCUMENT: &str = "<p></p>";

/// Highest heading level the schema allows; deeper levels are clamped.
pub const MAX_HEADING_LEVEL: u8 = 3;

// ─── Image attributes ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl ImageAlign {
    pub const ALL: [ImageAlign; 3] = [ImageAlign::Left, ImageAlign::Center, ImageAlign::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageAlign::Left => "left",
            ImageAlign::Center => "center",
            ImageAlign::Right => "right",
        }
    }

    /// Unknown values fall back to the default alignment.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "left" => ImageAlign::Left,
            "right" => ImageAlign::Right,
            _ => ImageAlign::Center,
        }
    }
}

/// Display width of an image: a preset percentage or any CSS length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageWidth {
    Quarter,
    Half,
    #[default]
    ThreeQuarters,
    Full,
    Custom(String),
}

impl ImageWidth {
    pub const PRESETS: [ImageWidth; 4] = [
        ImageWidth::Quarter,
        ImageWidth::Half,
        ImageWidth::ThreeQuarters,
        ImageWidth::Full,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ImageWidth::Quarter => "25%",
            ImageWidth::Half => "50%",
            ImageWidth::ThreeQuarters => "75%",
            ImageWidth::Full => "100%",
            ImageWidth::Custom(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "75%" => ImageWidth::ThreeQuarters,
            "25%" => ImageWidth::Quarter,
            "50%" => ImageWidth::Half,
            "100%" => ImageWidth::Full,
            other => ImageWidth::Custom(other.to_string()),
        }
    }
}

/// Attributes of an image node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: String,
    pub alt: String,
    pub width: ImageWidth,
    pub align: ImageAlign,
    pub caption: String,
}

impl ImageAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    /// Merge a patch; returns true if any field changed.
    pub fn merge(&mut self, patch: &ImageAttrsPatch) -> bool {
        let before = self.clone();
        if let Some(src) = &patch.src {
            self.src.clone_from(src);
        }
        if let Some(alt) = &patch.alt {
            self.alt.clone_from(alt);
        }
        if let Some(width) = &patch.width {
            self.width = width.clone();
        }
        if let Some(align) = patch.align {
            self.align = align;
        }
        if let Some(caption) = &patch.caption {
            self.caption.clone_from(caption);
        }
        *self != before
    }
}

/// Partial update of [`ImageAttrs`]; every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrsPatch {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub width: Option<ImageWidth>,
    pub align: Option<ImageAlign>,
    pub caption: Option<String>,
}

impl ImageAttrsPatch {
    pub fn align(align: ImageAlign) -> Self {
        Self {
            align: Some(align),
            ..Self::default()
        }
    }

    pub fn width(width: ImageWidth) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    pub fn caption(caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            ..Self::default()
        }
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Bullet,
    Ordered,
}

/// The kind a textblock can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextblockType {
    Paragraph,
    Heading(u8),
    CodeBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph { content: Inline },
    Heading { level: u8, content: Inline },
    CodeBlock { content: Inline },
    BulletList { items: Vec<Block> },
    OrderedList { items: Vec<Block> },
    ListItem { children: Vec<Block> },
    Blockquote { children: Vec<Block> },
    Image(ImageAttrs),
}

/// A block with a stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub kind: BlockKind,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        let id = NodeId::mint(kind_name(&kind));
        Self { id, kind }
    }

    pub fn paragraph(content: Inline) -> Self {
        Self::new(BlockKind::Paragraph { content })
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph(Inline::new())
    }

    pub fn heading(level: u8, content: Inline) -> Self {
        Self::new(BlockKind::Heading {
            level: level.clamp(1, MAX_HEADING_LEVEL),
            content,
        })
    }

    pub fn code_block(text: &str) -> Self {
        Self::new(BlockKind::CodeBlock {
            content: Inline::from_text(text),
        })
    }

    pub fn image(attrs: ImageAttrs) -> Self {
        Self::new(BlockKind::Image(attrs))
    }

    pub fn list(kind: ListKind, items: Vec<Block>) -> Self {
        match kind {
            ListKind::Bullet => Self::new(BlockKind::BulletList { items }),
            ListKind::Ordered => Self::new(BlockKind::OrderedList { items }),
        }
    }

    pub fn list_item(children: Vec<Block>) -> Self {
        Self::new(BlockKind::ListItem { children })
    }

    pub fn blockquote(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Blockquote { children })
    }

    pub fn name(&self) -> &'static str {
        kind_name(&self.kind)
    }

    pub fn is_textblock(&self) -> bool {
        self.content().is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.is_textblock() || matches!(self.kind, BlockKind::Image(_))
    }

    pub fn content(&self) -> Option<&Inline> {
        match &self.kind {
            BlockKind::Paragraph { content }
            | BlockKind::Heading { content, .. }
            | BlockKind::CodeBlock { content } => Some(content),
            _ => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Inline> {
        match &mut self.kind {
            BlockKind::Paragraph { content }
            | BlockKind::Heading { content, .. }
            | BlockKind::CodeBlock { content } => Some(content),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&Vec<Block>> {
        match &self.kind {
            BlockKind::BulletList { items } | BlockKind::OrderedList { items } => Some(items),
            BlockKind::ListItem { children } | BlockKind::Blockquote { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match &mut self.kind {
            BlockKind::BulletList { items } | BlockKind::OrderedList { items } => Some(items),
            BlockKind::ListItem { children } | BlockKind::Blockquote { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn image_attrs(&self) -> Option<&ImageAttrs> {
        match &self.kind {
            BlockKind::Image(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self.kind {
            BlockKind::BulletList { .. } => Some(ListKind::Bullet),
            BlockKind::OrderedList { .. } => Some(ListKind::Ordered),
            _ => None,
        }
    }

    pub fn textblock_type(&self) -> Option<TextblockType> {
        match self.kind {
            BlockKind::Paragraph { .. } => Some(TextblockType::Paragraph),
            BlockKind::Heading { level, .. } => Some(TextblockType::Heading(level)),
            BlockKind::CodeBlock { .. } => Some(TextblockType::CodeBlock),
            _ => None,
        }
    }

    /// Convert a textblock in place, keeping its id and text.
    /// Returns false for non-textblocks or when the type is unchanged.
    pub fn set_textblock_type(&mut self, ty: TextblockType) -> bool {
        if self.textblock_type() == Some(ty) {
            return false;
        }
        let Some(content) = self.content_mut().map(std::mem::take) else {
            return false;
        };
        self.kind = textblock_kind(ty, content);
        true
    }

    /// Split a textblock at a char offset. The tail moves into a new block
    /// of the same type, which is returned.
    pub fn split_textblock(&mut self, at: usize) -> Option<Block> {
        let ty = self.textblock_type()?;
        let tail = self.content_mut()?.split_off(at);
        Some(Block::new(textblock_kind(ty, tail)))
    }
}

pub fn textblock_kind(ty: TextblockType, mut content: Inline) -> BlockKind {
    match ty {
        TextblockType::Paragraph => BlockKind::Paragraph { content },
        TextblockType::Heading(level) => BlockKind::Heading {
            level: level.clamp(1, MAX_HEADING_LEVEL),
            content,
        },
        TextblockType::CodeBlock => {
            content.strip_marks();
            BlockKind::CodeBlock { content }
        }
    }
}

fn kind_name(kind: &BlockKind) -> &'static str {
    match kind {
        BlockKind::Paragraph { .. } => "paragraph",
        BlockKind::Heading { .. } => "heading",
        BlockKind::CodeBlock { .. } => "code_block",
        BlockKind::BulletList { .. } => "bullet_list",
        BlockKind::OrderedList { .. } => "ordered_list",
        BlockKind::ListItem { .. } => "list_item",
        BlockKind::Blockquote { .. } => "blockquote",
        BlockKind::Image(_) => "image",
    }
}

// ─── Positions & selection ───────────────────────────────────────────────

/// A textblock or image in flattened document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Child indices from the document root down to the leaf.
    pub path: Vec<usize>,
    pub id: NodeId,
    pub start: usize,
    pub size: usize,
    pub is_text: bool,
}

impl Leaf {
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    /// Local `[from, to)` intersection with a document range, if non-empty.
    pub fn local_range(&self, from: usize, to: usize) -> Option<(usize, usize)> {
        let lf = from.max(self.start);
        let lt = to.min(self.end());
        (lf < lt).then(|| (lf - self.start, lt - self.start))
    }

    /// True when the closed document range touches this leaf.
    pub fn touches(&self, from: usize, to: usize) -> bool {
        self.start <= to && self.end() >= from
    }
}

/// A position resolved to the leaf it falls in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub leaf: Leaf,
    /// Index of the leaf in flattened order.
    pub index: usize,
    pub offset: usize,
}

/// A selection over flattened positions. `from <= to` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self { from: pos, to: pos }
    }

    pub fn range(a: usize, b: usize) -> Self {
        Self {
            from: a.min(b),
            to: a.max(b),
        }
    }

    pub fn is_caret(&self) -> bool {
        self.from == self.to
    }

    pub fn clamp(self, size: usize) -> Self {
        Self::range(self.from.min(size), self.to.min(size))
    }
}

// ─── Document ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// The empty document: one empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::empty_paragraph()],
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self { blocks };
        doc.normalize();
        doc
    }

    pub fn is_empty(&self) -> bool {
        match self.blocks.as_slice() {
            [only] => matches!(&only.kind, BlockKind::Paragraph { content } if content.is_empty()),
            _ => false,
        }
    }

    pub fn leaves(&self) -> Vec<Leaf> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        let mut pos = 0;
        collect_leaves(&self.blocks, &mut prefix, &mut out, &mut pos);
        out
    }

    /// Largest valid position.
    pub fn size(&self) -> usize {
        self.leaves().last().map(Leaf::end).unwrap_or(0)
    }

    /// Resolve a position, clamped to the document size.
    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        let leaves = self.leaves();
        let pos = pos.min(leaves.last().map(Leaf::end).unwrap_or(0));
        let (index, leaf) = leaves
            .into_iter()
            .enumerate()
            .find(|(_, leaf)| pos <= leaf.end())?;
        let offset = pos.saturating_sub(leaf.start);
        Some(ResolvedPos {
            leaf,
            index,
            offset,
        })
    }

    pub fn block_at(&self, path: &[usize]) -> Option<&Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get(*first)?;
        for idx in rest {
            block = block.children()?.get(*idx)?;
        }
        Some(block)
    }

    pub fn block_at_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get_mut(*first)?;
        for idx in rest {
            block = block.children_mut()?.get_mut(*idx)?;
        }
        Some(block)
    }

    /// The child list addressed by a parent path; the empty path is the root.
    pub fn siblings_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Block>> {
        if parent.is_empty() {
            return Some(&mut self.blocks);
        }
        self.block_at_mut(parent)?.children_mut()
    }

    pub fn find(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        find_path(&self.blocks, id, &mut path).then_some(path)
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.block_at(&self.find(id)?)
    }

    pub fn block_mut(&mut self, id: NodeId) -> Option<&mut Block> {
        let path = self.find(id)?;
        self.block_at_mut(&path)
    }

    pub fn image_attrs(&self, id: NodeId) -> Option<&ImageAttrs> {
        self.block(id)?.image_attrs()
    }

    /// First position inside the block, or `None` if it is not in the tree.
    pub fn start_of(&self, id: NodeId) -> Option<usize> {
        let path = self.find(id)?;
        self.leaves()
            .into_iter()
            .find(|leaf| leaf.path.starts_with(&path))
            .map(|leaf| leaf.start)
    }

    /// Position right after the block's last leaf.
    pub fn end_of(&self, id: NodeId) -> Option<usize> {
        let path = self.find(id)?;
        self.leaves()
            .into_iter()
            .filter(|leaf| leaf.path.starts_with(&path))
            .last()
            .map(|leaf| leaf.end())
    }

    /// Plain text of `[from, to)`: leaves joined by `\n`, images as nothing.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        if from >= to {
            return String::new();
        }
        let mut parts = Vec::new();
        for leaf in self.leaves().iter().filter(|l| l.touches(from, to)) {
            let lf = from.max(leaf.start) - leaf.start;
            let lt = to.min(leaf.end()) - leaf.start;
            let text = self
                .block_at(&leaf.path)
                .and_then(Block::content)
                .map(|content| content.text_between(lf, lt))
                .unwrap_or_default();
            parts.push(text);
        }
        parts.join("\n")
    }

    /// Enforce schema invariants: lists hold only items, containers are
    /// never empty, code blocks carry no marks, runs are merged, and the
    /// document holds at least one block.
    pub fn normalize(&mut self) {
        let blocks = std::mem::take(&mut self.blocks);
        self.blocks = normalize_blocks(blocks);
        if self.blocks.is_empty() {
            self.blocks.push(Block::empty_paragraph());
        }
    }
}

fn collect_leaves(blocks: &[Block], prefix: &mut Vec<usize>, out: &mut Vec<Leaf>, pos: &mut usize) {
    for (i, block) in blocks.iter().enumerate() {
        prefix.push(i);
        if block.is_leaf() {
            if !out.is_empty() {
                *pos += 1;
            }
            let size = block.content().map(Inline::len).unwrap_or(1);
            out.push(Leaf {
                path: prefix.clone(),
                id: block.id,
                start: *pos,
                size,
                is_text: block.is_textblock(),
            });
            *pos += size;
        } else if let Some(children) = block.children() {
            collect_leaves(children, prefix, out, pos);
        }
        prefix.pop();
    }
}

fn find_path(blocks: &[Block], id: NodeId, path: &mut Vec<usize>) -> bool {
    for (i, block) in blocks.iter().enumerate() {
        path.push(i);
        if block.id == id {
            return true;
        }
        if let Some(children) = block.children()
            && find_path(children, id, path)
        {
            return true;
        }
        path.pop();
    }
    false
}

fn normalize_blocks(blocks: Vec<Block>) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len());
    for mut block in blocks {
        match &mut block.kind {
            BlockKind::Paragraph { content } => content.normalize(),
            BlockKind::Heading { level, content } => {
                *level = (*level).clamp(1, MAX_HEADING_LEVEL);
                content.normalize();
            }
            BlockKind::CodeBlock { content } => content.strip_marks(),
            BlockKind::Image(_) => {}
            BlockKind::BulletList { items } | BlockKind::OrderedList { items } => {
                let wrapped = std::mem::take(items)
                    .into_iter()
                    .map(|b| match b.kind {
                        BlockKind::ListItem { .. } => b,
                        _ => Block::list_item(vec![b]),
                    })
                    .collect();
                *items = normalize_blocks(wrapped);
                if items.is_empty() {
                    continue;
                }
            }
            BlockKind::ListItem { children } | BlockKind::Blockquote { children } => {
                *children = normalize_blocks(std::mem::take(children));
                if children.is_empty() {
                    continue;
                }
            }
        }
        out.push(block);
    }
    out
}
