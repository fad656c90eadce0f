//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `subconscious_core` linkage.
//! - Summarize a Subtext file given as the first argument.
//!
//! Set `SUBCONSCIOUS_LOG_DIR` (absolute) to capture core logs.

use std::path::Path;
use std::process::ExitCode;
use subconscious_core::{default_log_level, init_logging, parse_document};

fn main() -> ExitCode {
    println!("subconscious_core ping={}", subconscious_core::ping());
    println!("subconscious_core version={}", subconscious_core::core_version());

    if let Some(log_dir) = std::env::var_os("SUBCONSCIOUS_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), Path::new(&log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let document = parse_document(&text);
    let body = document.body();
    println!("headers={}", document.headers().len());
    println!("blocks={}", body.blocks().len());
    println!("slashlinks={}", body.slashlinks().len());
    println!("wikilinks={}", body.wikilinks().len());
    for link in body.slashlinks() {
        println!("link {link}");
    }
    ExitCode::SUCCESS
}
