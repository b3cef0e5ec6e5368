use rd_core::emitter::emit_document;
use rd_core::parser::parse_document;
use rd_core::transform::insert_text;
use std::time::Instant;

fn large_report(sections: usize) -> String {
    let mut doc = String::new();
    for i in 0..sections {
        doc.push_str(&format!(
            "<h2>Finding {i}</h2><p>Issue <strong>{i}</strong> affects <a href=\"https://app.example.com/{i}\">endpoint</a>.</p>\
             <figure data-type=\"image\" data-align=\"center\" data-width=\"75%\"><img src=\"/uploads/{i}.png\" width=\"75%\"></figure>\
             <ul><li><p>step one</p></li><li><p>step two</p></li></ul>"
        ));
    }
    doc
}

#[test]
#[ignore] // Run manually with `cargo test --test perf_benchmark -- --nocapture --ignored`
fn benchmark_parse_and_emit() {
    let html = large_report(5_000);

    let start = Instant::now();
    let doc = parse_document(&html).expect("parse failed");
    println!("Parsed {} blocks in {:?}", doc.blocks.len(), start.elapsed());

    let start = Instant::now();
    let out = emit_document(&doc);
    println!("Emitted {} bytes in {:?}", out.len(), start.elapsed());
}

#[test]
#[ignore]
fn benchmark_typing_at_end() {
    let mut doc = parse_document(&large_report(1_000)).expect("parse failed");
    let start = Instant::now();
    for _ in 0..200 {
        let end = doc.size();
        insert_text(&mut doc, end, "x", Default::default());
        let _ = emit_document(&doc);
    }
    println!("200 keystrokes + emits in {:?}", start.elapsed());
}
