//! Diagnostic output.
//!
//! All progress and error reporting goes to stderr so generated-content
//! tooling can pipe stdout freely. Page failures are printed as a delimited
//! block showing the full error-source chain; format functions are pure
//! (return `Vec<String>`) with thin print wrappers, so tests can assert on
//! the exact block layout without capturing streams.

use std::error::Error;

const BLOCK_WIDTH: usize = 80;

/// Log a single progress line to stderr.
pub fn log(message: &str) {
    eprintln!("{message}");
}

/// Format a delimited error block: a header rail, the context line, each
/// error in the source chain on its own indented line, and a closing rail.
pub fn format_error_block(context: &str, err: &(dyn Error + 'static)) -> Vec<String> {
    let width = BLOCK_WIDTH;
    let mut lines = Vec::new();
    lines.push(format!("{:=<width$}", "error trace:"));
    lines.push(format!("  {context}"));
    lines.push(format!("  {err}"));
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("  caused by: {cause}"));
        source = cause.source();
    }
    lines.push("=".repeat(BLOCK_WIDTH));
    lines
}

/// Print an error block to stderr.
pub fn error_block(context: &str, err: &(dyn Error + 'static)) {
    for line in format_error_block(context, err) {
        eprintln!("{line}");
    }
}
