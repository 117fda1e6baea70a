//! Build orchestration: orphan reconciliation, concurrent generation,
//! search-index refresh.
//!
//! One run does three things in order:
//!
//! 1. **Reconcile** — list the output tree, delete every file no current
//!    page wants (`current − desired`), count the deletions.
//! 2. **Generate** — fan the stale pages out over a dedicated worker pool of
//!    bounded size. Each task is one page's `generate`; tasks share nothing
//!    but their outcome, which the pool's own reduction aggregates into an
//!    attempt count. A task failure is caught at the task boundary, printed
//!    as a delimited error block, and never cancels its siblings.
//! 3. **Index** — when indexing is enabled and anything changed (a page was
//!    attempted or an orphan deleted), rewrite `searchindex.js`.
//!
//! Cancellation: the interrupt flag is checked at task entry, so no new page
//! starts after Ctrl-C while in-flight pages drain; the partially built run
//! skips the search index. Generation order across pages is deliberately
//! unspecified.

use crate::freshness;
use crate::page::{self, PageError, Services};
use crate::report;
use crate::scan::Scanner;
use crate::search;
use crate::site::Site;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Default worker pool size.
pub const DEFAULT_JOBS: usize = 7;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("page error: {0}")]
    Page(#[from] PageError),
}

/// Knobs for one build run.
pub struct BuildOptions {
    pub output_root: PathBuf,
    pub search_index: bool,
    pub jobs: usize,
}

impl BuildOptions {
    pub fn new(output_root: &Path) -> Self {
        Self {
            output_root: output_root.to_path_buf(),
            search_index: false,
            jobs: DEFAULT_JOBS,
        }
    }
}

/// What one run did.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildSummary {
    /// Pages whose generation was attempted (successes and failures both —
    /// an attempted page means the output may have changed).
    pub generated: usize,
    /// Orphan files removed from the output root.
    pub deleted: usize,
    /// Whether the run was interrupted before completing.
    pub interrupted: bool,
    /// Whether the search index artifact was rewritten.
    pub index_written: bool,
}

impl BuildSummary {
    pub fn changed(&self) -> bool {
        self.generated > 0 || self.deleted > 0
    }
}

/// Delete every file under `output_root` that no current page produces.
/// Returns the number of deletions.
pub fn reconcile(
    site: &Site,
    scanner: &Scanner,
    output_root: &Path,
    search_index: bool,
) -> Result<usize, BuildError> {
    std::fs::create_dir_all(output_root)?;

    let desired = site.desired_outputs(search_index);
    let orphans: Vec<PathBuf> = scanner
        .files(output_root)
        .filter(|p| !desired.contains(p))
        .collect();

    if !orphans.is_empty() {
        report::log(&format!(
            "delete {} abandoned files from destination directory",
            orphans.len()
        ));
    }

    let mut deleted = 0;
    for orphan in orphans {
        report::log(&format!("delete {}", orphan.display()));
        match std::fs::remove_file(output_root.join(&orphan)) {
            Ok(()) => deleted += 1,
            Err(err) => report::log(&format!("failed to delete {}: {err}", orphan.display())),
        }
    }
    Ok(deleted)
}

/// Run a full build: reconcile, generate stale pages concurrently, refresh
/// the search index when warranted.
pub fn run(
    site: &Site,
    services: &Services,
    scanner: &Scanner,
    options: &BuildOptions,
    cancel: &AtomicBool,
) -> Result<BuildSummary, BuildError> {
    let deleted = reconcile(site, scanner, &options.output_root, options.search_index)?;
    let clock = services.templates.last_modified(scanner);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()?;

    let generated = pool.install(|| {
        site.pages
            .par_iter()
            .map(|page| {
                if cancel.load(Ordering::SeqCst) {
                    return 0usize;
                }
                if !freshness::needs_update(page, &options.output_root, clock) {
                    return 0;
                }
                report::log(&format!("generating {}...", page.url()));
                if let Err(err) = page.generate(site, services, &options.output_root) {
                    report::error_block(&format!("error while generating {}", page.url()), &err);
                }
                1
            })
            .sum::<usize>()
    });

    let mut summary = BuildSummary {
        generated,
        deleted,
        interrupted: cancel.load(Ordering::SeqCst),
        index_written: false,
    };

    if options.search_index && summary.changed() && !summary.interrupted {
        report::log(&format!("making search index: {}", search::SEARCH_INDEX_FILE));
        let artifact = search::render_index(site)?;
        page::write_atomic(
            &options.output_root.join(search::SEARCH_INDEX_FILE),
            artifact.as_bytes(),
        )?;
        summary.index_written = true;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::convert::DocumentConverter;
    use crate::convert::tests::MockConverter;
    use crate::template::TemplateEngine;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn load(root: &Path) -> Site {
        Site::load(root, &Scanner::new(), SiteConfig::empty(root))
    }

    fn mock_services() -> (Arc<MockConverter>, Services) {
        let markdown = Arc::new(MockConverter::new());
        let services = Services {
            markdown: Box::new(Arc::clone(&markdown)),
            asciidoc: Box::new(MockConverter::new()),
            templates: TemplateEngine::new(None),
        };
        (markdown, services)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    #[test]
    fn orphan_deletion_removes_exactly_the_orphan() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");
        write(out.path(), "a.html", "old");
        write(out.path(), "stale.html", "orphan");

        let site = load(src.path());
        let deleted = reconcile(&site, &Scanner::new(), out.path(), false).unwrap();

        assert_eq!(deleted, 1);
        assert!(out.path().join("a.html").exists());
        assert!(!out.path().join("stale.html").exists());
    }

    #[test]
    fn reconcile_keeps_search_index_when_enabled() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");
        write(out.path(), search::SEARCH_INDEX_FILE, "var data=[]");

        let site = load(src.path());

        let deleted = reconcile(&site, &Scanner::new(), out.path(), true).unwrap();
        assert_eq!(deleted, 0);
        assert!(out.path().join(search::SEARCH_INDEX_FILE).exists());

        // with indexing off the artifact is an orphan like any other
        let deleted = reconcile(&site, &Scanner::new(), out.path(), false).unwrap();
        assert_eq!(deleted, 1);
    }

    // =========================================================================
    // Executor
    // =========================================================================

    #[test]
    fn all_pages_attempted_despite_one_failure() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for i in 0..8 {
            write(src.path(), &format!("page{i}.md"), &format!("# Page {i}"));
        }
        // this one names a template that does not exist, so its task fails
        write(
            src.path(),
            "failing.md",
            "---\ntemplate: missing.j2.html\n---\n# Broken",
        );

        let site = load(src.path());
        let (markdown, services) = mock_services();
        let mut options = BuildOptions::new(out.path());
        options.jobs = 3;

        let summary = run(
            &site,
            &services,
            &Scanner::new(),
            &options,
            &AtomicBool::new(false),
        )
        .unwrap();

        // 9 markdown pages all attempted, regardless of pool size or the
        // one failure
        assert_eq!(markdown.call_count(), 9);
        assert_eq!(summary.generated, 10); // 9 documents + root index page
        for i in 0..8 {
            assert!(out.path().join(format!("page{i}.html")).exists());
        }
        assert!(!out.path().join("failing.html").exists());
    }

    #[test]
    fn second_run_regenerates_nothing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");
        write(src.path(), "assets/logo.svg", "<svg/>");

        // let destination mtimes land strictly after source mtimes
        std::thread::sleep(std::time::Duration::from_millis(30));

        let site = load(src.path());
        let (_markdown, services) = mock_services();
        let options = BuildOptions::new(out.path());
        let cancel = AtomicBool::new(false);

        let first = run(&site, &services, &Scanner::new(), &options, &cancel).unwrap();
        assert!(first.generated > 0);

        std::thread::sleep(std::time::Duration::from_millis(30));
        let second = run(&site, &services, &Scanner::new(), &options, &cancel).unwrap();
        assert_eq!(second.generated, 0);
        assert!(!second.changed());
    }

    #[test]
    fn cancelled_run_attempts_nothing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");

        let site = load(src.path());
        let (markdown, services) = mock_services();
        let options = BuildOptions::new(out.path());

        let summary = run(
            &site,
            &services,
            &Scanner::new(),
            &options,
            &AtomicBool::new(true),
        )
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.generated, 0);
        assert_eq!(markdown.call_count(), 0);
        assert!(!out.path().join("a.html").exists());
    }

    // =========================================================================
    // Search index gating
    // =========================================================================

    #[test]
    fn index_written_only_when_something_changed() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");
        std::thread::sleep(std::time::Duration::from_millis(30));

        let site = load(src.path());
        let (_markdown, services) = mock_services();
        let mut options = BuildOptions::new(out.path());
        options.search_index = true;
        let cancel = AtomicBool::new(false);

        let first = run(&site, &services, &Scanner::new(), &options, &cancel).unwrap();
        assert!(first.index_written);
        let artifact = fs::read_to_string(out.path().join(search::SEARCH_INDEX_FILE)).unwrap();
        assert!(artifact.starts_with("var data=["));

        std::thread::sleep(std::time::Duration::from_millis(30));
        let second = run(&site, &services, &Scanner::new(), &options, &cancel).unwrap();
        assert!(!second.index_written);
    }

    #[test]
    fn orphan_deletion_alone_triggers_index_rewrite() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");
        std::thread::sleep(std::time::Duration::from_millis(30));

        let site = load(src.path());
        let (_markdown, services) = mock_services();
        let mut options = BuildOptions::new(out.path());
        options.search_index = true;
        let cancel = AtomicBool::new(false);

        run(&site, &services, &Scanner::new(), &options, &cancel).unwrap();

        // drop an orphan into the fresh output tree
        std::thread::sleep(std::time::Duration::from_millis(30));
        write(out.path(), "leftover.html", "orphan");
        let summary = run(&site, &services, &Scanner::new(), &options, &cancel).unwrap();

        assert_eq!(summary.deleted, 1);
        assert!(summary.index_written);
    }

    #[test]
    fn format_validation_happens_before_conversion() {
        // a converter that does not advertise markdown input: the check
        // fails the page but never reaches convert()
        struct NoMarkdown;
        impl DocumentConverter for NoMarkdown {
            fn input_formats(&self) -> &[String] {
                &[]
            }
            fn output_formats(&self) -> &[String] {
                &[]
            }
            fn convert(
                &self,
                _: &str,
                _: &str,
                _: &str,
                _: &[String],
                _: Option<&Path>,
            ) -> Result<crate::convert::Conversion, crate::convert::ConvertError> {
                panic!("convert called without format validation");
            }
        }

        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.md", "# A");

        let site = load(src.path());
        let services = Services {
            markdown: Box::new(NoMarkdown),
            asciidoc: Box::new(MockConverter::new()),
            templates: TemplateEngine::new(None),
        };
        let options = BuildOptions::new(out.path());

        let summary = run(
            &site,
            &services,
            &Scanner::new(),
            &options,
            &AtomicBool::new(false),
        )
        .unwrap();

        // attempted (and failed at validation); no output written
        assert!(summary.generated >= 1);
        assert!(!out.path().join("a.html").exists());
    }
}
