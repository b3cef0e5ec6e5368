//! Emitter: `Document` → canonical HTML subset.
//!
//! Output is deterministic for a given tree and round-trips through the
//! parser. Every block kind renders through its own `Markup` impl.

use crate::inline::{Inline, Mark};
use crate::model::*;

/// Render a value as markup into `out`.
pub trait Markup {
    fn write_markup(&self, out: &mut String);

    fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }
}

/// Emit a `Document` in its canonical serialization.
///
/// The empty document emits [`EMPTY_DOCUMENT`].
#[must_use]
pub fn emit_document(doc: &Document) -> String {
    let mut out = String::with_capacity(256);
    doc.write_markup(&mut out);
    out
}

impl Markup for Document {
    fn write_markup(&self, out: &mut String) {
        for block in &self.blocks {
            block.write_markup(out);
        }
    }
}

impl Markup for Block {
    fn write_markup(&self, out: &mut String) {
        match &self.kind {
            BlockKind::Paragraph { content } => wrap(out, "p", content),
            BlockKind::Heading { level, content } => {
                let tag = format!("h{level}");
                wrap(out, &tag, content);
            }
            BlockKind::CodeBlock { content } => {
                out.push_str("<pre><code>");
                escape_text(&content.plain_text(), out);
                out.push_str("</code></pre>");
            }
            BlockKind::BulletList { items } => wrap_all(out, "ul", items),
            BlockKind::OrderedList { items } => wrap_all(out, "ol", items),
            BlockKind::ListItem { children } => wrap_all(out, "li", children),
            BlockKind::Blockquote { children } => wrap_all(out, "blockquote", children),
            BlockKind::Image(attrs) => attrs.write_markup(out),
        }
    }
}

fn wrap(out: &mut String, tag: &str, inner: &impl Markup) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    inner.write_markup(out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn wrap_all(out: &mut String, tag: &str, blocks: &[Block]) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    for block in blocks {
        block.write_markup(out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

impl Markup for ImageAttrs {
    fn write_markup(&self, out: &mut String) {
        out.push_str(r#"<figure data-type="image" data-align=""#);
        escape_attr(self.align.as_str(), out);
        out.push_str(r#"" data-width=""#);
        escape_attr(self.width.as_str(), out);
        out.push_str(r#""><img src=""#);
        escape_attr(&self.src, out);
        out.push('"');
        if !self.alt.is_empty() {
            out.push_str(r#" alt=""#);
            escape_attr(&self.alt, out);
            out.push('"');
        }
        out.push_str(r#" width=""#);
        escape_attr(self.width.as_str(), out);
        out.push_str(r#"">"#);
        if !self.caption.is_empty() {
            out.push_str("<figcaption>");
            escape_inline_text(&self.caption, out);
            out.push_str("</figcaption>");
        }
        out.push_str("</figure>");
    }
}

// ─── Inline content ──────────────────────────────────────────────────────

impl Markup for Inline {
    /// Adjacent runs share the open tags of their common mark prefix, so
    /// `<strong>a<em>b</em></strong>` is emitted instead of reopening.
    fn write_markup(&self, out: &mut String) {
        let mut open: Vec<&Mark> = Vec::new();
        for run in self.runs() {
            let keep = open
                .iter()
                .zip(run.marks.iter())
                .take_while(|(a, b)| **a == *b)
                .count();
            while open.len() > keep {
                if let Some(mark) = open.pop() {
                    close_mark(mark, out);
                }
            }
            for mark in &run.marks[keep..] {
                open_mark(mark, out);
                open.push(mark);
            }
            escape_inline_text(&run.text, out);
        }
        while let Some(mark) = open.pop() {
            close_mark(mark, out);
        }
    }
}

fn open_mark(mark: &Mark, out: &mut String) {
    match mark {
        Mark::Link { href } => {
            out.push_str(r#"<a href=""#);
            escape_attr(href, out);
            out.push_str(r#"" rel="noopener noreferrer">"#);
        }
        Mark::Bold => out.push_str("<strong>"),
        Mark::Italic => out.push_str("<em>"),
        Mark::Code => out.push_str("<code>"),
    }
}

fn close_mark(mark: &Mark, out: &mut String) {
    out.push_str(match mark {
        Mark::Link { .. } => "</a>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Code => "</code>",
    });
}

// ─── Escaping ────────────────────────────────────────────────────────────

pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Text inside a textblock or caption: hard breaks become `<br>`, and tabs
/// and carriage returns are written as character references so the parser
/// does not read them as source formatting.
fn escape_inline_text(text: &str, out: &mut String) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<br>");
        }
        for c in line.chars() {
            match c {
                '\t' => out.push_str("&#9;"),
                '\r' => out.push_str("&#13;"),
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(c),
            }
        }
    }
}

pub fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

// ─── Plain text ──────────────────────────────────────────────────────────

/// Plain text of every textblock, one per line. Images contribute nothing.
#[must_use]
pub fn emit_plain_text(doc: &Document) -> String {
    doc.leaves()
        .iter()
        .filter_map(|leaf| doc.block_at(&leaf.path)?.content())
        .map(Inline::plain_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shorten text to at most `max` chars plus `...`, cutting at the last
/// word boundary when there is one.
#[must_use]
pub fn truncate_plain(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(at) if at > 0 => &head[..at],
        _ => head.as_str(),
    };
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::TextRun;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_marker() {
        assert_eq!(emit_document(&Document::new()), EMPTY_DOCUMENT);
    }

    #[test]
    fn shared_mark_prefix_is_not_reopened() {
        let content = Inline::from_runs([
            TextRun::marked("a", [Mark::Bold]),
            TextRun::marked("b", [Mark::Bold, Mark::Italic]),
            TextRun::plain("c"),
        ]);
        let doc = Document::from_blocks(vec![Block::paragraph(content)]);
        assert_eq!(
            emit_document(&doc),
            "<p><strong>a<em>b</em></strong>c</p>"
        );
    }

    #[test]
    fn image_omits_empty_alt_and_caption() {
        let doc = Document::from_blocks(vec![Block::image(ImageAttrs::new("/uploads/a.png"))]);
        assert_eq!(
            emit_document(&doc),
            r#"<figure data-type="image" data-align="center" data-width="75%"><img src="/uploads/a.png" width="75%"></figure>"#
        );
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let link = Mark::Link {
            href: "https://x.io/?a=1&b=\"2\"".into(),
        };
        let content = Inline::from_runs([TextRun::marked("<tag> & co", [link])]);
        let doc = Document::from_blocks(vec![Block::paragraph(content)]);
        assert_eq!(
            emit_document(&doc),
            r#"<p><a href="https://x.io/?a=1&amp;b=&quot;2&quot;" rel="noopener noreferrer">&lt;tag&gt; &amp; co</a></p>"#
        );
    }

    #[test]
    fn hard_breaks_and_code_blocks() {
        let doc = Document::from_blocks(vec![
            Block::paragraph(Inline::from_text("one\ntwo")),
            Block::code_block("if a < b {\n}"),
        ]);
        assert_eq!(
            emit_document(&doc),
            "<p>one<br>two</p><pre><code>if a &lt; b {\n}</code></pre>"
        );
    }

    #[test]
    fn tabs_and_carriage_returns_are_references() {
        let mut attrs = ImageAttrs::new("/uploads/a.png");
        attrs.caption = "step\t1 ".into();
        let doc = Document::from_blocks(vec![
            Block::paragraph(Inline::from_text("a\tb\r\nc")),
            Block::image(attrs),
        ]);
        assert_eq!(
            emit_document(&doc),
            concat!(
                "<p>a&#9;b&#13;<br>c</p>",
                r#"<figure data-type="image" data-align="center" data-width="75%">"#,
                r#"<img src="/uploads/a.png" width="75%"><figcaption>step&#9;1 </figcaption></figure>"#,
            )
        );
    }

    #[test]
    fn truncate_respects_words() {
        assert_eq!(truncate_plain("short", 10), "short");
        assert_eq!(
            truncate_plain("SQL injection in login form", 16),
            "SQL injection..."
        );
        assert_eq!(truncate_plain("Supercalifragilistic", 5), "Super...");
    }
}
