//! Front-matter extraction.
//!
//! A source document may begin with a metadata block delimited by two lines
//! consisting of three or more dashes:
//!
//! ```text
//! ---
//! title: My page
//! bibliography: refs.bib
//! ---
//! body content
//! ```
//!
//! The block is YAML; values keep their scalar types (`123` stays an
//! integer). Metadata is surfaced as a `serde_json` map because that is the
//! common currency between the config overlay, the template context, and the
//! search index. A document without a block is all body with empty metadata.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("metadata conversion error: {0}")]
    Convert(#[from] serde_json::Error),
    #[error("front matter is not a key-value mapping")]
    NotAMapping,
}

/// A source document split into metadata and body.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub metadata: Map<String, Value>,
    pub body: String,
}

/// A line of three or more dashes (trailing whitespace allowed).
fn is_delimiter(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 3 && line.bytes().all(|b| b == b'-')
}

/// Split a document into its raw front-matter block (if any) and body.
///
/// Blank lines before the opening delimiter are tolerated. If no closing
/// delimiter exists the document has no front matter at all.
pub fn split(source: &str) -> (Option<&str>, &str) {
    let mut offset = 0;
    let mut lines = source.split_inclusive('\n');

    // skip leading blank lines
    let opening = loop {
        match lines.next() {
            Some(line) if line.trim().is_empty() => offset += line.len(),
            other => break other,
        }
    };

    let Some(opening) = opening else {
        return (None, source);
    };
    if !is_delimiter(opening) {
        return (None, source);
    }

    let block_start = offset + opening.len();
    let mut cursor = block_start;
    for line in lines {
        if is_delimiter(line) {
            let block = &source[block_start..cursor];
            let body = &source[cursor + line.len()..];
            return (Some(block), body);
        }
        cursor += line.len();
    }

    (None, source)
}

/// Parse a document: YAML front matter into a metadata map, body trimmed.
pub fn parse(source: &str) -> Result<Document, FrontMatterError> {
    let (block, body) = split(source);

    let metadata = match block {
        None => Map::new(),
        Some(block) => {
            let value: serde_yaml::Value = serde_yaml::from_str(block)?;
            match serde_json::to_value(value)? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                _ => return Err(FrontMatterError::NotAMapping),
            }
        }
    };

    Ok(Document {
        metadata,
        body: body.trim().to_string(),
    })
}
