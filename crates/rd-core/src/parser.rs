//! Parser for the HTML content subset → `Document`.
//!
//! Built on `winnow` 0.7. Runs in two stages: a tokenizer that turns markup
//! into open/close/text tokens, then a tolerant tree builder whose element
//! tree is mapped onto the document schema. Unknown elements are unwrapped,
//! script-capable elements are discarded with their content, and unsafe
//! URLs are dropped.

use crate::error::ParseError;
use crate::inline::{Inline, Mark, MarkSet, TextRun, add_mark};
use crate::model::*;
use crate::sanitize::{is_safe_href, is_safe_image_src};
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{take_till, take_until, take_while};

/// Parse content markup into a normalized `Document`.
///
/// Empty input yields the empty document. Only malformed markup that
/// cannot be tokenized (an unterminated tag or comment) is an error.
#[must_use = "parsing result should be used"]
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
    let tokens = tokenize(input)?;
    let tree = build_tree(tokens);
    Ok(Document::from_blocks(convert_blocks(&tree)))
}

// ─── Tokens ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(String),
}

/// Elements whose content is raw text, never markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut rest = input;
    let mut tokens = Vec::new();

    while !rest.is_empty() {
        let offset = input.len() - rest.len();
        if rest.starts_with("<!--") {
            skip_comment
                .parse_next(&mut rest)
                .map_err(|_| ParseError::new(offset, "unterminated comment"))?;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            skip_declaration
                .parse_next(&mut rest)
                .map_err(|_| ParseError::new(offset, "unterminated declaration"))?;
        } else if starts_tag(rest, "</") {
            let name = parse_close_tag
                .parse_next(&mut rest)
                .map_err(|_| ParseError::new(offset, "unterminated closing tag"))?;
            tokens.push(Token::Close { name });
        } else if starts_tag(rest, "<") {
            let token = parse_open_tag
                .parse_next(&mut rest)
                .map_err(|_| ParseError::new(offset, "unterminated tag"))?;
            if let Token::Open {
                name,
                self_closing: false,
                ..
            } = &token
                && RAW_TEXT_TAGS.contains(&name.as_str())
            {
                skip_raw_text(&mut rest, name);
            }
            tokens.push(token);
        } else {
            let text = parse_text
                .parse_next(&mut rest)
                .map_err(|_| ParseError::new(offset, "unreadable text"))?;
            tokens.push(Token::Text(text.to_string()));
        }
    }

    Ok(tokens)
}

/// `<` (or `</`) directly followed by a tag name.
fn starts_tag(s: &str, prefix: &str) -> bool {
    s.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

// ─── Low-level parsers ───────────────────────────────────────────────────

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    let _: Result<&str, ErrMode<ContextError>> = multispace0.parse_next(input);
}

fn backtrack<T>() -> ModalResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn skip_comment(input: &mut &str) -> ModalResult<()> {
    ("<!--", take_until(0.., "-->"), "-->")
        .void()
        .parse_next(input)
}

fn skip_declaration(input: &mut &str) -> ModalResult<()> {
    ('<', take_till(0.., '>'), '>').void().parse_next(input)
}

/// Advance to the closing tag of a raw-text element (or the end of input).
fn skip_raw_text(input: &mut &str, name: &str) {
    let needle = format!("</{name}");
    // ASCII lowercasing keeps byte offsets intact.
    match input.to_ascii_lowercase().find(&needle) {
        Some(at) => *input = &input[at..],
        None => *input = "",
    }
}

fn parse_text<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    if input.starts_with('<') {
        // A lone `<` that does not start a tag is literal text.
        return "<".parse_next(input);
    }
    take_till(1.., '<').parse_next(input)
}

fn parse_tag_name(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':')
        .map(|s: &str| s.to_ascii_lowercase())
        .parse_next(input)
}

fn parse_close_tag(input: &mut &str) -> ModalResult<String> {
    ("</", parse_tag_name, take_till(0.., '>'), '>')
        .map(|(_, name, _, _)| name)
        .parse_next(input)
}

fn parse_open_tag(input: &mut &str) -> ModalResult<Token> {
    let _ = '<'.parse_next(input)?;
    let name = parse_tag_name(input)?;
    let mut attrs = Vec::new();
    loop {
        skip_space(input);
        if let Some(rest) = input.strip_prefix("/>") {
            *input = rest;
            return Ok(Token::Open {
                name,
                attrs,
                self_closing: true,
            });
        }
        if let Some(rest) = input.strip_prefix('>') {
            *input = rest;
            return Ok(Token::Open {
                name,
                attrs,
                self_closing: false,
            });
        }
        if let Some(rest) = input.strip_prefix('/') {
            *input = rest;
            continue;
        }
        if input.is_empty() {
            return backtrack();
        }
        attrs.push(parse_attribute(input)?);
    }
}

fn parse_attribute(input: &mut &str) -> ModalResult<(String, String)> {
    let name: &str = take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'')
    })
    .parse_next(input)?;
    let name = name.to_ascii_lowercase();
    skip_space(input);
    let Some(rest) = input.strip_prefix('=') else {
        return Ok((name, String::new()));
    };
    *input = rest;
    skip_space(input);
    let value = alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_while(1.., |c: char| !c.is_whitespace() && c != '>'),
    ))
    .parse_next(input)?;
    Ok((name, decode_entities(value)))
}

// ─── Entities ────────────────────────────────────────────────────────────

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let checkpoint = rest;
        match parse_entity.parse_next(&mut rest) {
            Ok(c) => out.push(c),
            Err(_) => {
                rest = &checkpoint[1..];
                out.push('&');
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_entity(input: &mut &str) -> ModalResult<char> {
    let _ = '&'.parse_next(input)?;
    let body: &str =
        take_while(1..=10, |c: char| c.is_ascii_alphanumeric() || c == '#').parse_next(input)?;
    let _ = ';'.parse_next(input)?;
    match entity_char(body) {
        Some(c) => Ok(c),
        None => backtrack(),
    }
}

fn entity_char(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}

// ─── Element tree ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn find_descendant(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            Node::Element(el) if el.name == name => Some(el),
            Node::Element(el) => el.find_descendant(name),
            Node::Text(_) => None,
        })
    }

    fn plain_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&decode_entities(t)),
                Node::Element(el) if el.name == "br" => out.push('\n'),
                Node::Element(el) => el.plain_text(out),
            }
        }
    }
}

const VOID_TAGS: &[&str] = &[
    "img", "br", "hr", "input", "meta", "link", "source", "wbr", "col", "area",
];

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

/// Build an element tree. Stray closing tags are ignored; unclosed
/// elements are closed at the end of input or by an enclosing close tag.
fn build_tree(tokens: Vec<Token>) -> Vec<Node> {
    let mut stack = vec![Element::default()];
    for token in tokens {
        match token {
            Token::Text(text) => push_node(&mut stack, Node::Text(text)),
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                let void = self_closing || VOID_TAGS.contains(&name.as_str());
                let el = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if void {
                    push_node(&mut stack, Node::Element(el));
                } else {
                    stack.push(el);
                }
            }
            Token::Close { name } => {
                let Some(depth) = stack.iter().skip(1).rposition(|e| e.name == name) else {
                    log::trace!("ignoring stray </{name}>");
                    continue;
                };
                close_to(&mut stack, depth + 1);
            }
        }
    }
    close_to(&mut stack, 1);
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn close_to(stack: &mut Vec<Element>, depth: usize) {
    while stack.len() > depth {
        if let Some(el) = stack.pop() {
            push_node(stack, Node::Element(el));
        }
    }
}

// ─── Schema mapping ──────────────────────────────────────────────────────

/// Discarded together with everything inside them.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "head", "title", "noscript",
    "textarea",
];

/// Elements that continue the current line of text at block level.
const INLINE_TAGS: &[&str] = &[
    "strong", "b", "em", "i", "code", "a", "span", "u", "s", "sub", "sup", "mark", "small",
    "br", "img", "abbr", "kbd", "del", "ins", "label",
];

enum Piece {
    Text(Inline),
    Image(ImageAttrs),
}

/// Accumulates inline content. Images cut the current text into a new
/// piece so they can be hoisted to block level.
#[derive(Default)]
struct InlineSink {
    current: Inline,
    pieces: Vec<Piece>,
    soft_start: bool,
    soft_end: bool,
}

impl InlineSink {
    fn is_blank(&self) -> bool {
        self.current.is_empty() && self.pieces.is_empty()
    }

    fn push_text(&mut self, raw: &str, marks: &MarkSet) {
        let (collapsed, soft_start, soft_end) = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return;
        }
        let text = decode_entities(&collapsed);
        if self.current.is_empty() {
            self.soft_start = soft_start;
        }
        self.soft_end = soft_end;
        self.current.push(TextRun {
            text,
            marks: marks.clone(),
        });
    }

    fn push_break(&mut self, marks: &MarkSet) {
        if self.current.is_empty() {
            self.soft_start = false;
        }
        self.soft_end = false;
        self.current.push(TextRun {
            text: "\n".to_string(),
            marks: marks.clone(),
        });
    }

    fn push_image(&mut self, attrs: ImageAttrs) {
        self.cut();
        self.pieces.push(Piece::Image(attrs));
    }

    fn cut(&mut self) {
        let mut inline = std::mem::take(&mut self.current);
        inline.trim_spaces(self.soft_start, self.soft_end);
        self.soft_start = false;
        self.soft_end = false;
        if !inline.is_empty() {
            self.pieces.push(Piece::Text(inline));
        }
    }

    fn finish(mut self) -> Vec<Piece> {
        self.cut();
        self.pieces
    }
}

/// Whitespace runs containing a line break or tab are source formatting:
/// each becomes one space. Runs only on undecoded source, so whitespace
/// written as a character reference is content. Returns the text plus whether it starts or ends
/// with such a run.
fn collapse_whitespace(raw: &str) -> (String, bool, bool) {
    let mut out = String::with_capacity(raw.len());
    let mut run = String::new();
    let mut soft_start = false;
    let mut soft_end = false;

    let mut flush = |run: &mut String, out: &mut String, at_start: bool, at_end: bool| {
        if run.is_empty() {
            return;
        }
        let soft = run.contains(['\n', '\r', '\t']);
        if soft {
            out.push(' ');
            soft_start |= at_start;
            soft_end = at_end;
        } else {
            out.push_str(run);
            if at_end {
                soft_end = false;
            }
        }
        run.clear();
    };

    for c in raw.chars() {
        if c.is_ascii_whitespace() {
            run.push(c);
        } else {
            let at_start = out.is_empty();
            flush(&mut run, &mut out, at_start, false);
            out.push(c);
        }
    }
    let at_start = out.is_empty();
    flush(&mut run, &mut out, at_start, true);
    (out, soft_start, soft_end)
}

/// Text between blocks that holds nothing but whitespace, including
/// whitespace written as references.
fn is_blank_text(raw: &str) -> bool {
    decode_entities(raw).trim().is_empty()
}

fn pieces_into(pieces: Vec<Piece>, make: impl Fn(Inline) -> Block, out: &mut Vec<Block>) {
    for piece in pieces {
        match piece {
            Piece::Text(inline) => out.push(make(inline)),
            Piece::Image(attrs) => out.push(Block::image(attrs)),
        }
    }
}

fn flush_pending(pending: &mut InlineSink, out: &mut Vec<Block>) {
    let pieces = std::mem::take(pending).finish();
    pieces_into(pieces, Block::paragraph, out);
}

fn convert_blocks(nodes: &[Node]) -> Vec<Block> {
    let mut out = Vec::new();
    let mut pending = InlineSink::default();
    for node in nodes {
        convert_block_node(node, &mut pending, &mut out);
    }
    flush_pending(&mut pending, &mut out);
    out
}

fn heading_level(name: &str) -> Option<u8> {
    let level: u8 = name.strip_prefix('h')?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn convert_block_node(node: &Node, pending: &mut InlineSink, out: &mut Vec<Block>) {
    let el = match node {
        Node::Text(text) => {
            if !(is_blank_text(text) && pending.is_blank()) {
                pending.push_text(text, &MarkSet::new());
            }
            return;
        }
        Node::Element(el) => el,
    };
    let name = el.name.as_str();
    if DROPPED_TAGS.contains(&name) {
        log::debug!("discarding <{name}> subtree");
        return;
    }
    if INLINE_TAGS.contains(&name) {
        collect_inline(node, &MarkSet::new(), pending);
        return;
    }

    flush_pending(pending, out);
    match name {
        "p" => convert_textblock(el, Block::paragraph, out),
        "pre" => out.push(Block::code_block(&code_text(el))),
        "ul" | "ol" => {
            let kind = if name == "ol" {
                ListKind::Ordered
            } else {
                ListKind::Bullet
            };
            out.push(Block::list(kind, convert_list_items(el)));
        }
        "blockquote" => out.push(Block::blockquote(convert_blocks(&el.children))),
        "figure" => convert_figure(el, out),
        "hr" => {}
        _ => match heading_level(name) {
            Some(level) => convert_textblock(el, |c| Block::heading(level, c), out),
            // Unknown containers (div, section, li outside a list) unwrap.
            None => out.extend(convert_blocks(&el.children)),
        },
    }
}

fn convert_textblock(el: &Element, make: impl Fn(Inline) -> Block, out: &mut Vec<Block>) {
    let mut sink = InlineSink::default();
    for child in &el.children {
        collect_inline(child, &MarkSet::new(), &mut sink);
    }
    let pieces = sink.finish();
    if pieces.is_empty() {
        out.push(make(Inline::new()));
        return;
    }
    pieces_into(pieces, make, out);
}

fn convert_list_items(list: &Element) -> Vec<Block> {
    let mut items = Vec::new();
    for child in &list.children {
        match child {
            Node::Element(li) if li.name == "li" => {
                items.push(Block::list_item(convert_blocks(&li.children)));
            }
            Node::Text(text) if is_blank_text(text) => {}
            other => items.extend(
                convert_blocks(std::slice::from_ref(other))
                    .into_iter()
                    .map(|b| Block::list_item(vec![b])),
            ),
        }
    }
    items
}

/// Code block text keeps whitespace verbatim. A newline directly after
/// `<pre>` is not content.
fn code_text(pre: &Element) -> String {
    let mut text = String::new();
    pre.plain_text(&mut text);
    if matches!(pre.children.first(), Some(Node::Text(t)) if t.starts_with('\n')) {
        text.remove(0);
    }
    text
}

fn image_attrs(img: &Element) -> Option<ImageAttrs> {
    let src = img.attr("src")?.trim();
    if !is_safe_image_src(src) {
        log::debug!("dropping image with disallowed src");
        return None;
    }
    let mut attrs = ImageAttrs::new(src).with_alt(img.attr("alt").unwrap_or_default());
    if let Some(width) = img.attr("data-width").or_else(|| img.attr("width")) {
        attrs.width = ImageWidth::parse(width);
    }
    if let Some(align) = img.attr("data-align") {
        attrs.align = ImageAlign::parse(align);
    }
    Some(attrs)
}

fn figure_attrs(figure: &Element) -> Option<ImageAttrs> {
    let mut attrs = image_attrs(figure.find_descendant("img")?)?;
    if let Some(align) = figure.attr("data-align") {
        attrs.align = ImageAlign::parse(align);
    }
    if let Some(width) = figure.attr("data-width") {
        attrs.width = ImageWidth::parse(width);
    }
    if let Some(caption) = figure.find_descendant("figcaption") {
        attrs.caption = caption_text(caption);
    }
    Some(attrs)
}

/// Caption text follows inline whitespace rules: formatting around the
/// text is dropped, typed spaces are kept.
fn caption_text(caption: &Element) -> String {
    let mut sink = InlineSink::default();
    for child in &caption.children {
        collect_inline(child, &MarkSet::new(), &mut sink);
    }
    sink.finish()
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Text(inline) => Some(inline.plain_text()),
            Piece::Image(_) => None,
        })
        .collect()
}

fn convert_figure(figure: &Element, out: &mut Vec<Block>) {
    if figure.find_descendant("img").is_none() {
        out.extend(convert_blocks(&figure.children));
        return;
    }
    if let Some(attrs) = figure_attrs(figure) {
        out.push(Block::image(attrs));
    }
}

fn collect_inline(node: &Node, marks: &MarkSet, sink: &mut InlineSink) {
    let el = match node {
        Node::Text(text) => {
            sink.push_text(text, marks);
            return;
        }
        Node::Element(el) => el,
    };
    let name = el.name.as_str();
    if DROPPED_TAGS.contains(&name) {
        return;
    }

    let mut marks = marks.clone();
    match name {
        "strong" | "b" => add_mark(&mut marks, Mark::Bold),
        "em" | "i" => add_mark(&mut marks, Mark::Italic),
        "code" => add_mark(&mut marks, Mark::Code),
        "a" => match el.attr("href").map(str::trim) {
            Some(href) if is_safe_href(href) => add_mark(
                &mut marks,
                Mark::Link {
                    href: href.to_string(),
                },
            ),
            Some(_) => log::debug!("dropping link with disallowed href"),
            None => {}
        },
        "br" => {
            sink.push_break(&marks);
            return;
        }
        "img" => {
            if let Some(attrs) = image_attrs(el) {
                sink.push_image(attrs);
            }
            return;
        }
        "figure" => {
            if let Some(attrs) = figure_attrs(el) {
                sink.push_image(attrs);
                return;
            }
        }
        _ => {}
    }
    for child in &el.children {
        collect_inline(child, &marks, sink);
    }
}
