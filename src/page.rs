//! Page model: classification, destinations, breadcrumbs, generation.
//!
//! Every discovered source file becomes exactly one [`Page`] variant, chosen
//! by suffix:
//!
//! | Suffix | Variant | Destination |
//! |--------|---------|-------------|
//! | `md`, `markdown` | `Markdown` | suffix replaced with `.html` |
//! | `adoc`, `asciidoc`, `asc` | `Asciidoc` | suffix replaced with `.html` |
//! | anything else | `Copy` | identical to the source path |
//!
//! A fourth variant, `Index`, is synthesized by the site loader for every
//! source directory without its own index document, so every directory is
//! browsable. The variant set is a closed enum on purpose: the classifier
//! is exhaustive and adding a variant is a compile-visible change.
//!
//! Generation never fails the build. A converter that produces an empty
//! output or writes to its error stream yields an error page carrying the
//! diagnostics (title `ERROR <src>`); template and filesystem errors
//! propagate out of [`Page::generate`] and are caught at the task boundary.
//! Every destination write goes through a temp file in the destination
//! directory followed by an atomic rename, so an interrupted run never
//! leaves a truncated file at a real path.

use crate::config::ScopedConfig;
use crate::convert::{Conversion, ConvertError, DocumentConverter};
use crate::frontmatter::{self, FrontMatterError};
use crate::html;
use crate::site::Site;
use crate::template::{INDEX_TEMPLATE, MARKDOWN_TEMPLATE, TemplateEngine, TemplateError};
use serde_json::{Map, Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const MARKDOWN_SUFFIXES: &[&str] = &["md", "markdown"];
const ASCIIDOC_SUFFIXES: &[&str] = &["adoc", "asciidoc", "asc"];

/// Output suffix for templated pages.
pub const OUTPUT_SUFFIX: &str = "html";

#[derive(Error, Debug)]
pub enum PageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("atomic write failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Collaborators pages render through, constructed once in `main` and
/// injected everywhere — nothing here is process-global.
pub struct Services {
    pub markdown: Box<dyn DocumentConverter>,
    pub asciidoc: Box<dyn DocumentConverter>,
    pub templates: TemplateEngine,
}

/// A source file (or synthetic directory index) with a fixed destination.
#[derive(Debug)]
pub enum Page {
    Copy(CopyPage),
    Markdown(DocumentPage),
    Asciidoc(DocumentPage),
    Index(IndexPage),
}

/// Verbatim copy: destination equals source.
#[derive(Debug)]
pub struct CopyPage {
    pub src: PathBuf,
    last_modified: SystemTime,
}

/// A templated document page (markdown or asciidoc).
#[derive(Debug)]
pub struct DocumentPage {
    pub src: PathBuf,
    pub dst: PathBuf,
    last_modified: SystemTime,
    parts: Vec<(String, String)>,
}

/// Synthetic directory listing for a directory with no index document.
#[derive(Debug)]
pub struct IndexPage {
    pub dst: PathBuf,
    parts: Vec<(String, String)>,
}

/// Map a relative source path to its page variant. Classification itself
/// never fails; the construction stats the source file and an IO error here
/// drops just this page at the call site.
pub fn classify(source_root: &Path, rel: &Path) -> std::io::Result<Page> {
    let suffix = rel
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let last_modified = fs::metadata(source_root.join(rel))?.modified()?;

    if MARKDOWN_SUFFIXES.contains(&suffix.as_str()) {
        Ok(Page::Markdown(DocumentPage::new(rel, last_modified)))
    } else if ASCIIDOC_SUFFIXES.contains(&suffix.as_str()) {
        Ok(Page::Asciidoc(DocumentPage::new(rel, last_modified)))
    } else {
        Ok(Page::Copy(CopyPage {
            src: rel.to_path_buf(),
            last_modified,
        }))
    }
}

impl DocumentPage {
    fn new(rel: &Path, last_modified: SystemTime) -> Self {
        let dst = rel.with_extension(OUTPUT_SUFFIX);
        let parts = breadcrumbs(&dst);
        Self {
            src: rel.to_path_buf(),
            dst,
            last_modified,
            parts,
        }
    }
}

impl IndexPage {
    pub fn new(dir: &Path) -> Self {
        let dst = dir.join("index.html");
        let parts = breadcrumbs(&dst);
        Self { dst, parts }
    }
}

impl Page {
    /// Every page has at least one destination; all current variants have
    /// exactly one.
    pub fn destinations(&self) -> Vec<PathBuf> {
        match self {
            Page::Copy(p) => vec![p.src.clone()],
            Page::Markdown(p) | Page::Asciidoc(p) => vec![p.dst.clone()],
            Page::Index(p) => vec![p.dst.clone()],
        }
    }

    /// Source mtime captured at construction. Index pages report the epoch
    /// sentinel: they never force a rebuild on their own, but regenerate
    /// whenever the clock or a missing destination demands it.
    pub fn last_modified(&self) -> SystemTime {
        match self {
            Page::Copy(p) => p.last_modified,
            Page::Markdown(p) | Page::Asciidoc(p) => p.last_modified,
            Page::Index(_) => UNIX_EPOCH,
        }
    }

    /// Destination path as a display string, used for logs and the search
    /// index.
    pub fn url(&self) -> String {
        match self {
            Page::Copy(p) => p.src.display().to_string(),
            Page::Markdown(p) | Page::Asciidoc(p) => p.dst.display().to_string(),
            Page::Index(p) => p.dst.display().to_string(),
        }
    }

    /// Render this page into `output_root`. Idempotent; safe to re-run.
    pub fn generate(
        &self,
        site: &Site,
        services: &Services,
        output_root: &Path,
    ) -> Result<(), PageError> {
        match self {
            Page::Copy(p) => {
                let data = fs::read(site.source_root.join(&p.src))?;
                write_atomic(&output_root.join(&p.src), &data)
            }
            Page::Markdown(p) => p.generate(DocumentFormat::Markdown, site, services, output_root),
            Page::Asciidoc(p) => p.generate(DocumentFormat::Asciidoc, site, services, output_root),
            Page::Index(p) => p.generate(site, services, output_root),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DocumentFormat {
    Markdown,
    Asciidoc,
}

impl DocumentPage {
    fn generate(
        &self,
        format: DocumentFormat,
        site: &Site,
        services: &Services,
        output_root: &Path,
    ) -> Result<(), PageError> {
        let srcfile = site.source_root.join(&self.src);
        let raw = fs::read_to_string(&srcfile)?;
        let doc = frontmatter::parse(&raw)?;

        let src_dir = srcfile.parent().unwrap_or(&site.source_root);
        let scoped = ScopedConfig::new(&doc.metadata, src_dir, &site.config);

        let (converter, from, to, extra_args) = match format {
            DocumentFormat::Markdown => (
                &*services.markdown,
                "markdown",
                "html5",
                markdown_args(&scoped),
            ),
            DocumentFormat::Asciidoc => (&*services.asciidoc, "asciidoc", "html5", Vec::new()),
        };
        converter.check_formats(from, to)?;
        let conversion = converter.convert(&doc.body, from, to, &extra_args, Some(src_dir))?;

        // soft failure: the page is still generated, carrying the
        // diagnostics instead of content
        let document = if conversion.failed() {
            error_page(&self.src, &conversion)
        } else {
            conversion.output
        };

        let parsed = html::index(&document);
        let body = html::extract_body(&document).replace("[TOC]", &parsed.toc);
        let links = html::extract_links(&body);

        let template = doc
            .metadata
            .get("template")
            .and_then(Value::as_str)
            .unwrap_or(MARKDOWN_TEMPLATE)
            .to_string();

        let mut metadata = doc.metadata;
        metadata.insert("title".to_string(), json!(parsed.title));
        metadata.insert("toc".to_string(), json!(parsed.toc));
        metadata.insert("body".to_string(), json!(body));
        metadata.insert("source".to_string(), json!(doc.body));
        metadata.insert("siblings".to_string(), json!(site.siblings(&self.dst)));
        metadata.insert(
            "not_linked".to_string(),
            json!(site.siblings_not_linked(&self.dst, &links)),
        );
        extend_context(&mut metadata, &self.dst, &self.parts, self.last_modified, site);

        let rendered = services.templates.render(&template, &metadata)?;
        write_atomic(&output_root.join(&self.dst), rendered.as_bytes())
    }
}

impl IndexPage {
    fn generate(
        &self,
        site: &Site,
        services: &Services,
        output_root: &Path,
    ) -> Result<(), PageError> {
        let dir = self
            .dst
            .parent()
            .map(|p| p.display().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ".".to_string());

        let mut metadata = Map::new();
        metadata.insert("title".to_string(), json!(format!("Index of {dir}")));
        metadata.insert("toc".to_string(), json!(""));
        metadata.insert("body".to_string(), json!(""));
        metadata.insert("source".to_string(), json!(""));
        metadata.insert("siblings".to_string(), json!(site.siblings(&self.dst)));
        extend_context(&mut metadata, &self.dst, &self.parts, UNIX_EPOCH, site);

        let rendered = services.templates.render(INDEX_TEMPLATE, &metadata)?;
        write_atomic(&output_root.join(&self.dst), rendered.as_bytes())
    }
}

/// Context keys every templated page carries, inserted last so they cannot
/// be shadowed by front matter.
fn extend_context(
    metadata: &mut Map<String, Value>,
    dst: &Path,
    parts: &[(String, String)],
    last_modified: SystemTime,
    site: &Site,
) {
    let mtime = last_modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    metadata.insert("url".to_string(), json!(dst.display().to_string()));
    metadata.insert("root".to_string(), json!(root_prefix(dst)));
    metadata.insert("path".to_string(), json!(dst.display().to_string()));
    metadata.insert("parts".to_string(), json!(parts));
    metadata.insert("mtime".to_string(), json!(mtime));
    metadata.insert(
        "sitename".to_string(),
        site.config.get("sitename").cloned().unwrap_or(Value::Null),
    );
}

/// Relative prefix from a destination back to the output root: `.` at the
/// top level, `..`, `../..`, … below it.
pub fn root_prefix(dst: &Path) -> String {
    let depth = dst.components().count().saturating_sub(1);
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

/// Breadcrumb parts for a destination path: `(link, label)` pairs from the
/// site root down to the page itself.
///
/// ```text
/// a/b/c.html      → (../../index.html, Home) (../index.html, a) (./index.html, b) (c.html, c)
/// a/b/index.html  → (../../index.html, Home) (../index.html, a) (./index.html, b)
/// a.html          → (./index.html, Home) (a.html, a)
/// index.html      → (./index.html, Home)
/// ```
pub fn breadcrumbs(dst: &Path) -> Vec<(String, String)> {
    let stem = dst.with_extension("");
    let mut names: Vec<String> = vec!["Home".to_string()];
    names.extend(
        stem.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    let depth = names.len() - 1;
    // an index page is its own directory entry; drop the duplicate label
    if names.last().is_some_and(|n| n == "index") {
        names.pop();
    }
    let file_name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let link = match depth - i {
                0 => file_name.clone(),
                1 => "./index.html".to_string(),
                n => format!("{}index.html", "../".repeat(n - 1)),
            };
            (link, name)
        })
        .collect()
}

fn error_page(src: &Path, conversion: &Conversion) -> String {
    format!(
        "<html><head><title>ERROR {}</title></head>\
         <body><pre>{}</pre><div>{}</div></body></html>",
        src.display(),
        conversion.errors,
        conversion.output
    )
}

/// Write `data` to `dst` through a temp file in the same directory and an
/// atomic rename, creating parent directories as needed. A crash or
/// cancellation mid-write never leaves a partial file at `dst`.
pub fn write_atomic(dst: &Path, data: &[u8]) -> Result<(), PageError> {
    let parent = dst.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = tempfile::NamedTempFile::new_in(parent.unwrap_or(Path::new(".")))?;
    tmp.write_all(data)?;
    tmp.persist(dst)?;
    Ok(())
}

/// Extra pandoc arguments for markdown pages: standalone document, mathjax
/// markup, and citation processing when a bibliography is configured.
fn markdown_args(scoped: &ScopedConfig) -> Vec<String> {
    let mut args = vec!["-s".to_string(), "--mathjax".to_string()];
    if let Some(bibliography) = scoped.fullpath("bibliography") {
        args.push("--citeproc".to_string());
        args.push(format!("--bibliography={}", bibliography.display()));
        if let Some(csl) = scoped.fullpath("csl") {
            args.push(format!("--csl={}", csl.display()));
        }
    }
    args
}
