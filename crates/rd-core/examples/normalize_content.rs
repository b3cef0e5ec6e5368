//! Rewrite stored report content into canonical form.
//!
//! Usage: `normalize_content [--check] [FILE.html ...]`. Without paths it
//! walks the test fixtures. `--check` reports files that would change.

use rd_core::{emit_document, parse_document};
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let mut check = false;
    let mut paths: Vec<PathBuf> = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--check" {
            check = true;
        } else {
            paths.push(PathBuf::from(arg));
        }
    }
    if paths.is_empty()
        && let Ok(entries) = fs::read_dir("crates/rd-core/tests/fixtures")
    {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "html") {
                paths.push(path);
            }
        }
    }

    let mut rewritten = 0;
    let mut unchanged = 0;
    let mut failed = 0;

    for path in &paths {
        let input = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("SKIP {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let doc = match parse_document(&input) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("PARSE ERROR {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let output = emit_document(&doc);
        if output == input {
            unchanged += 1;
            continue;
        }
        if check {
            println!("would rewrite {}", path.display());
            rewritten += 1;
        } else if let Err(e) = fs::write(path, &output) {
            eprintln!("ERROR writing {}: {}", path.display(), e);
            failed += 1;
        } else {
            println!("✓ {}", path.display());
            rewritten += 1;
        }
    }

    println!("\nRewritten: {rewritten}, Unchanged: {unchanged}, Failed: {failed}");
    if check && rewritten > 0 {
        std::process::exit(1);
    }
}
