//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Verifies that canonical output is stable and that stored report content
//! keeps its structure, marks and image attributes.

use pretty_assertions::assert_eq;
use rd_core::emitter::{emit_document, emit_plain_text, truncate_plain};
use rd_core::model::*;
use rd_core::parser::parse_document;

const FINDING: &str = include_str!("fixtures/finding.html");
const EVIDENCE: &str = include_str!("fixtures/evidence.html");
const PASTED_WORD: &str = include_str!("fixtures/pasted_word.html");

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Parse and emit twice; the second emission must equal the first.
fn canonical(input: &str) -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc1 = parse_document(input).expect("first parse failed");
    let emitted = emit_document(&doc1);
    let doc2 = parse_document(&emitted).expect("re-parse failed");
    let again = emit_document(&doc2);
    assert_eq!(emitted, again, "emission not stable for input:\n{input}");
    emitted
}

fn block_names(doc: &Document) -> Vec<&'static str> {
    doc.blocks.iter().map(Block::name).collect()
}

// ─── Fixtures ────────────────────────────────────────────────────────────

#[test]
fn roundtrip_finding() {
    let expected = concat!(
        "<h2>SQL injection in login form</h2>",
        "<p>The <code>username</code> parameter of ",
        r#"<a href="https://app.example.com/login" rel="noopener noreferrer">the login endpoint</a>"#,
        " is concatenated into a query.</p>",
        "<ul><li><p>Affects <strong>all</strong> tenants</p></li>",
        "<li><p>Exploitable <em>without</em> authentication</p></li></ul>",
        "<h3>Remediation</h3>",
        "<ol><li><p>Use parameterized queries.</p></li>",
        "<li><p>Apply least privilege to the database role.</p></li></ol>",
        "<blockquote><p>Severity: <strong>Critical</strong></p></blockquote>",
        "<pre><code>SELECT * FROM users WHERE name = '$input';</code></pre>",
    );
    assert_eq!(canonical(FINDING), expected);
}

#[test]
fn finding_structure() {
    let doc = parse_document(FINDING).unwrap();
    assert_eq!(
        block_names(&doc),
        vec![
            "heading",
            "paragraph",
            "bullet_list",
            "heading",
            "ordered_list",
            "blockquote",
            "code_block",
        ]
    );
}

#[test]
fn roundtrip_evidence_images() {
    let out = canonical(EVIDENCE);
    let doc = parse_document(&out).unwrap();
    let images: Vec<&ImageAttrs> = doc.blocks.iter().filter_map(Block::image_attrs).collect();
    assert_eq!(images.len(), 2);

    assert_eq!(images[0].src, "/uploads/screenshots/burp-request.png");
    assert_eq!(images[0].alt, "Burp request");
    assert_eq!(images[0].caption, "Figure 1: injected payload");
    assert_eq!(images[0].width, ImageWidth::ThreeQuarters);

    assert_eq!(images[1].align, ImageAlign::Left);
    assert_eq!(images[1].width, ImageWidth::Half);
    assert_eq!(images[1].alt, "");
    assert_eq!(images[1].caption, "");
    assert!(!out.contains("alt=\"\""));
}

#[test]
fn pasted_markup_is_sanitized() {
    let expected = concat!(
        "<p><strong>Impact</strong>: an attacker can read <em>any</em> record.</p>",
        r#"<p>See this link and <a href="https://owasp.org/Top10/" rel="noopener noreferrer">OWASP</a>.</p>"#,
        "<h3>Details</h3>",
    );
    assert_eq!(canonical(PASTED_WORD), expected);
}

// ─── Edge cases ──────────────────────────────────────────────────────────

#[test]
fn empty_content_roundtrips_to_marker() {
    assert_eq!(canonical(""), EMPTY_DOCUMENT);
    assert_eq!(canonical(EMPTY_DOCUMENT), EMPTY_DOCUMENT);
    assert_eq!(canonical("  \n  "), EMPTY_DOCUMENT);
}

#[test]
fn custom_width_survives() {
    let html = r#"<figure data-type="image" data-align="right" data-width="320px"><img src="https://x.io/a.png" width="320px"></figure>"#;
    assert_eq!(canonical(html), html);
}

#[test]
fn nested_list_survives() {
    let html = "<ul><li><p>parent</p><ol><li><p>child</p></li></ol></li></ul>";
    assert_eq!(canonical(html), html);
}

#[test]
fn hard_break_survives() {
    let html = "<p>line<br>next</p>";
    assert_eq!(canonical(html), html);
}

#[test]
fn plain_text_summary() {
    let doc = parse_document(FINDING).unwrap();
    let text = emit_plain_text(&doc);
    assert_eq!(text.lines().next(), Some("SQL injection in login form"));
    assert_eq!(truncate_plain(&text, 20), "SQL injection in...");
}
