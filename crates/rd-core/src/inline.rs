//! Inline content: ordered text runs, each carrying a canonical mark set.
//!
//! All offsets in this module are counted in `char`s, matching the
//! flattened document positions used by the editor.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Marks ───────────────────────────────────────────────────────────────

/// An inline formatting mark.
///
/// Variant order is the canonical nesting order used by the emitter:
/// links wrap bold, bold wraps italic, italic wraps code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    Link { href: String },
    Bold,
    Italic,
    Code,
}

/// Mark discriminant, used for queries that ignore attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkKind {
    Link,
    Bold,
    Italic,
    Code,
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Link { .. } => MarkKind::Link,
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Code => MarkKind::Code,
        }
    }
}

/// Canonically ordered set of marks; at most one mark per kind.
pub type MarkSet = SmallVec<[Mark; 4]>;

/// Insert or replace a mark, keeping the set in canonical order.
pub fn add_mark(set: &mut MarkSet, mark: Mark) {
    let kind = mark.kind();
    set.retain(|m| m.kind() != kind);
    let at = set.iter().position(|m| m.kind() > kind).unwrap_or(set.len());
    set.insert(at, mark);
}

pub fn remove_mark(set: &mut MarkSet, kind: MarkKind) {
    set.retain(|m| m.kind() != kind);
}

pub fn has_mark(set: &MarkSet, kind: MarkKind) -> bool {
    set.iter().any(|m| m.kind() == kind)
}

// ─── Text runs ───────────────────────────────────────────────────────────

/// A maximal stretch of text sharing one mark set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub marks: MarkSet,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Self {
        let mut set = MarkSet::new();
        for mark in marks {
            add_mark(&mut set, mark);
        }
        Self {
            text: text.into(),
            marks: set,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Byte index of the `n`th char, or the string length when out of range.
fn byte_index(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(b, _)| b).unwrap_or(s.len())
}

// ─── Inline content ──────────────────────────────────────────────────────

/// The content of a textblock. Kept normalized: no empty runs, and no two
/// adjacent runs with equal marks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inline {
    runs: Vec<TextRun>,
}

impl Inline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        let mut inline = Self::new();
        inline.push(TextRun::plain(text));
        inline
    }

    pub fn from_runs(runs: impl IntoIterator<Item = TextRun>) -> Self {
        let mut inline = Self::new();
        for run in runs {
            inline.push(run);
        }
        inline
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.runs.iter().map(TextRun::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Append a run, merging it into the last run when marks match.
    pub fn push(&mut self, run: TextRun) {
        if run.text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut()
            && last.marks == run.marks
        {
            last.text.push_str(&run.text);
            return;
        }
        self.runs.push(run);
    }

    pub fn append(&mut self, other: Inline) {
        for run in other.runs {
            self.push(run);
        }
    }

    /// Re-establish the run invariants after direct manipulation.
    pub fn normalize(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        for run in runs {
            self.push(run);
        }
    }

    /// Drop spaces at either edge, as left behind by source formatting.
    pub fn trim_spaces(&mut self, start: bool, end: bool) {
        if start && let Some(first) = self.runs.first_mut() {
            first.text = first.text.trim_start_matches(' ').to_string();
        }
        if end && let Some(last) = self.runs.last_mut() {
            last.text = last.text.trim_end_matches(' ').to_string();
        }
        self.normalize();
    }

    /// Split at a char offset, returning everything after it.
    pub fn split_off(&mut self, at: usize) -> Inline {
        let mut pos = 0;
        let mut head_tail = None;
        let mut split_idx = self.runs.len();
        for (i, run) in self.runs.iter_mut().enumerate() {
            let len = run.char_len();
            if at <= pos {
                split_idx = i;
                break;
            }
            if at < pos + len {
                let b = byte_index(&run.text, at - pos);
                let tail = run.text.split_off(b);
                head_tail = Some(TextRun {
                    text: tail,
                    marks: run.marks.clone(),
                });
                split_idx = i + 1;
                break;
            }
            pos += len;
        }
        let rest: Vec<TextRun> = self.runs.drain(split_idx..).collect();
        let mut right = Inline::new();
        if let Some(run) = head_tail {
            right.push(run);
        }
        for run in rest {
            right.push(run);
        }
        right
    }

    /// Copy of the content between two char offsets.
    pub fn slice(&self, from: usize, to: usize) -> Inline {
        let mut copy = self.clone();
        copy.split_off(to);
        copy.split_off(from)
    }

    pub fn text_between(&self, from: usize, to: usize) -> String {
        self.slice(from, to).plain_text()
    }

    pub fn delete(&mut self, from: usize, to: usize) {
        if from >= to {
            return;
        }
        let right = self.split_off(to);
        self.split_off(from);
        self.append(right);
    }

    pub fn insert_text(&mut self, at: usize, text: &str, marks: MarkSet) {
        let right = self.split_off(at);
        self.push(TextRun {
            text: text.to_string(),
            marks,
        });
        self.append(right);
    }

    /// Marks that text typed at `offset` would inherit: those of the char
    /// before it, or of the first char when at the start.
    pub fn marks_at(&self, offset: usize) -> MarkSet {
        let source = offset.saturating_sub(1);
        let mut pos = 0;
        for run in &self.runs {
            let len = run.char_len();
            if source < pos + len {
                return run.marks.clone();
            }
            pos += len;
        }
        MarkSet::new()
    }

    /// Apply `f` to the mark set of every char in `[from, to)`.
    pub fn map_marks(&mut self, from: usize, to: usize, mut f: impl FnMut(&mut MarkSet)) {
        if from >= to {
            return;
        }
        let right = self.split_off(to);
        let middle = self.split_off(from);
        for mut run in middle.runs {
            f(&mut run.marks);
            self.push(run);
        }
        self.append(right);
    }

    /// True when every char in `[from, to)` carries a mark of `kind`.
    /// An empty range never counts as covered.
    pub fn covers_mark(&self, from: usize, to: usize, kind: MarkKind) -> bool {
        let middle = self.slice(from, to);
        !middle.is_empty() && middle.runs.iter().all(|r| has_mark(&r.marks, kind))
    }

    /// Remove every mark, as code blocks require.
    pub fn strip_marks(&mut self) {
        for run in &mut self.runs {
            run.marks.clear();
        }
        self.normalize();
    }

    /// The char range of the link touching `offset`, extended across runs
    /// that share the same href.
    pub fn link_range_at(&self, offset: usize) -> Option<(usize, usize)> {
        let mut bounds = Vec::with_capacity(self.runs.len());
        let mut pos = 0;
        for run in &self.runs {
            let len = run.char_len();
            bounds.push((pos, pos + len));
            pos += len;
        }

        let link_of = |run: &TextRun| {
            run.marks.iter().find_map(|m| match m {
                Mark::Link { href } => Some(href.clone()),
                _ => None,
            })
        };

        let hit = bounds
            .iter()
            .enumerate()
            .filter(|(_, (start, end))| *start <= offset && offset <= *end)
            .find(|(i, _)| link_of(&self.runs[*i]).is_some())
            .map(|(i, _)| i)?;
        let href = link_of(&self.runs[hit]);

        let mut first = hit;
        while first > 0 && link_of(&self.runs[first - 1]) == href {
            first -= 1;
        }
        let mut last = hit;
        while last + 1 < self.runs.len() && link_of(&self.runs[last + 1]) == href {
            last += 1;
        }
        Some((bounds[first].0, bounds[last].1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bold(text: &str) -> TextRun {
        TextRun::marked(text, [Mark::Bold])
    }

    #[test]
    fn push_merges_equal_marks() {
        let inline = Inline::from_runs([TextRun::plain("ab"), TextRun::plain("cd"), bold("ef")]);
        assert_eq!(inline.runs().len(), 2);
        assert_eq!(inline.plain_text(), "abcdef");
    }

    #[test]
    fn split_off_inside_run() {
        let mut inline = Inline::from_runs([TextRun::plain("hello"), bold("world")]);
        let right = inline.split_off(3);
        assert_eq!(inline.plain_text(), "hel");
        assert_eq!(right.plain_text(), "loworld");
        assert_eq!(right.runs().len(), 2);
    }

    #[test]
    fn split_off_counts_chars_not_bytes() {
        let mut inline = Inline::from_text("héllo");
        let right = inline.split_off(2);
        assert_eq!(inline.plain_text(), "hé");
        assert_eq!(right.plain_text(), "llo");
    }

    #[test]
    fn delete_rejoins_neighbours() {
        let mut inline = Inline::from_text("abcdef");
        inline.delete(1, 4);
        assert_eq!(inline.plain_text(), "aef");
        assert_eq!(inline.runs().len(), 1);
    }

    #[test]
    fn toggling_a_mark_twice_restores_runs() {
        let original = Inline::from_text("make this bold");
        let mut inline = original.clone();
        inline.map_marks(5, 9, |m| add_mark(m, Mark::Bold));
        assert!(inline.covers_mark(5, 9, MarkKind::Bold));
        assert_eq!(inline.runs().len(), 3);
        inline.map_marks(5, 9, |m| remove_mark(m, MarkKind::Bold));
        assert_eq!(inline, original);
    }

    #[test]
    fn marks_are_kept_in_canonical_order() {
        let mut set = MarkSet::new();
        add_mark(&mut set, Mark::Code);
        add_mark(&mut set, Mark::Bold);
        add_mark(
            &mut set,
            Mark::Link {
                href: "https://example.com".into(),
            },
        );
        let kinds: Vec<MarkKind> = set.iter().map(Mark::kind).collect();
        assert_eq!(kinds, vec![MarkKind::Link, MarkKind::Bold, MarkKind::Code]);
    }

    #[test]
    fn marks_at_prefers_preceding_char() {
        let inline = Inline::from_runs([bold("ab"), TextRun::plain("cd")]);
        assert!(has_mark(&inline.marks_at(2), MarkKind::Bold));
        assert!(!has_mark(&inline.marks_at(3), MarkKind::Bold));
        assert!(has_mark(&inline.marks_at(0), MarkKind::Bold));
    }

    #[test]
    fn link_range_extends_over_nested_marks() {
        let link = Mark::Link {
            href: "https://cve.org".into(),
        };
        let inline = Inline::from_runs([
            TextRun::plain("see "),
            TextRun::marked("CVE", [link.clone()]),
            TextRun::marked("-2024", [link, Mark::Bold]),
            TextRun::plain(" now"),
        ]);
        assert_eq!(inline.link_range_at(5), Some((4, 12)));
        assert_eq!(inline.link_range_at(1), None);
    }
}
