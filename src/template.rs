//! Template rendering service.
//!
//! A thin wrapper over a Jinja2-compatible engine (minijinja). Templates are
//! looked up first in the user's template directory (the `-t` flag), then in
//! the defaults embedded at compile time, so a site needs no template files
//! at all to build. Autoescaping is on for the `.html` template names;
//! pre-rendered fragments (`body`, `toc`) pass through the `safe` filter
//! inside the templates themselves.
//!
//! The engine is also the source of the build clock: the most recent
//! modification among all template resources. Any page older than that clock
//! is rebuilt — there is no per-page tracking of *which* template a page
//! used, so a template edit invalidates the whole site. When only the
//! embedded templates are in play, the clock is the running binary's own
//! mtime (the embedded templates change exactly when the binary does).

use crate::scan::Scanner;
use minijinja::Environment;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "default.j2.html";
pub const MARKDOWN_TEMPLATE: &str = "markdown.j2.html";
pub const INDEX_TEMPLATE: &str = "index.j2.html";

/// Compiled-in fallbacks, used when the template directory has no file of
/// the requested name.
const EMBEDDED: &[(&str, &str)] = &[
    (DEFAULT_TEMPLATE, include_str!("../templates/default.j2.html")),
    (MARKDOWN_TEMPLATE, include_str!("../templates/markdown.j2.html")),
    (INDEX_TEMPLATE, include_str!("../templates/index.j2.html")),
];

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),
}

/// Injected template-rendering collaborator.
pub struct TemplateEngine {
    env: Environment<'static>,
    template_dir: Option<PathBuf>,
}

impl TemplateEngine {
    pub fn new(template_dir: Option<&Path>) -> Self {
        let template_dir = template_dir.filter(|d| d.is_dir()).map(Path::to_path_buf);

        let mut env = Environment::new();
        let loader_dir = template_dir.clone();
        env.set_loader(move |name| {
            if let Some(dir) = &loader_dir {
                let path = dir.join(name);
                if path.is_file() {
                    return fs::read_to_string(&path).map(Some).map_err(|e| {
                        minijinja::Error::new(
                            minijinja::ErrorKind::InvalidOperation,
                            format!("failed to read template {}: {e}", path.display()),
                        )
                    });
                }
            }
            Ok(EMBEDDED
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, text)| text.to_string()))
        });

        Self { env, template_dir }
    }

    /// Render `name` with a mapping of named values.
    pub fn render(&self, name: &str, context: &Map<String, Value>) -> Result<String, TemplateError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }

    /// The build clock: newest mtime among every template resource.
    pub fn last_modified(&self, scanner: &Scanner) -> SystemTime {
        let mut latest = std::env::current_exe()
            .and_then(fs::metadata)
            .and_then(|m| m.modified())
            .unwrap_or(UNIX_EPOCH);

        if let Some(dir) = &self.template_dir {
            for rel in scanner.files(dir) {
                if let Ok(meta) = fs::metadata(dir.join(&rel))
                    && let Ok(mtime) = meta.modified()
                {
                    latest = latest.max(mtime);
                }
            }
        }
        latest
    }

    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }
}
