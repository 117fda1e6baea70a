//! Site assembly.
//!
//! One build, one [`Site`]: every source file classified into a page, plus a
//! synthetic index page for each directory without its own index document.
//! The site owns its pages and dies with the process — nothing here persists
//! across runs.
//!
//! Destination collisions (two sources mapping to one output path, e.g.
//! `a.md` next to `a.markdown`) are warned about and resolved
//! first-discovered-wins: source files are classified in sorted path order
//! and the later page is dropped. That keeps the winner deterministic and
//! guarantees no two concurrent generation tasks ever write the same
//! destination.

use crate::config::SiteConfig;
use crate::page::{self, IndexPage, Page};
use crate::report;
use crate::scan::Scanner;
use crate::search;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// All pages of one build.
pub struct Site {
    pub source_root: PathBuf,
    pub config: SiteConfig,
    pub pages: Vec<Page>,
}

impl Site {
    /// Discover and classify every source file under `source_root`.
    ///
    /// A file that fails to load is logged and skipped — a single bad file
    /// never aborts the build.
    pub fn load(source_root: &Path, scanner: &Scanner, config: SiteConfig) -> Self {
        let mut files: Vec<PathBuf> = scanner.files(source_root).collect();
        files.sort();

        let mut pages: Vec<Page> = Vec::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for rel in files {
            match page::classify(source_root, &rel) {
                Ok(page) => {
                    let destinations = page.destinations();
                    if let Some(taken) = destinations.iter().find(|d| claimed.contains(*d)) {
                        report::log(&format!(
                            "WARNING: destination file overlapped: dst={}, src={} (dropped)",
                            taken.display(),
                            rel.display()
                        ));
                        continue;
                    }
                    claimed.extend(destinations);
                    pages.push(page);
                }
                Err(err) => {
                    report::log(&format!("error loading {}: {err}", rel.display()));
                }
            }
        }

        // every directory gets an index page unless a source already
        // produces one there
        let mut dirs: Vec<PathBuf> = scanner.dirs(source_root).collect();
        dirs.sort();
        for dir in dirs {
            let index = IndexPage::new(&dir);
            if claimed.insert(index.dst.clone()) {
                pages.push(Page::Index(index));
            }
        }

        report::log(&format!("Loaded {} pages", pages.len()));

        Self {
            source_root: source_root.to_path_buf(),
            config,
            pages,
        }
    }

    /// The full set of output paths this build wants to exist: every page's
    /// destinations, plus the search-index artifact when indexing is on.
    pub fn desired_outputs(&self, search_index: bool) -> BTreeSet<PathBuf> {
        let mut desired: BTreeSet<PathBuf> = self
            .pages
            .iter()
            .flat_map(|p| p.destinations())
            .collect();
        if search_index {
            desired.insert(PathBuf::from(search::SEARCH_INDEX_FILE));
        }
        desired
    }

    /// Destinations sharing `dst`'s directory, as links relative to that
    /// directory. A child directory's index page counts as a sibling (it is
    /// the way down the tree).
    pub fn siblings(&self, dst: &Path) -> Vec<String> {
        let parent = dst.parent().unwrap_or(Path::new(""));
        let mut siblings = BTreeSet::new();

        for page in &self.pages {
            for other in page.destinations() {
                if other == dst {
                    continue;
                }
                let same_dir = other.parent() == Some(parent);
                let child_index = other.file_name().is_some_and(|n| n == "index.html")
                    && other.parent().and_then(Path::parent) == Some(parent);
                if (same_dir || child_index)
                    && let Ok(rel) = other.strip_prefix(parent)
                {
                    siblings.insert(rel.display().to_string());
                }
            }
        }
        siblings.into_iter().collect()
    }

    /// Siblings the given hrefs do not reach — the material an author
    /// probably forgot to link.
    pub fn siblings_not_linked(&self, dst: &Path, hrefs: &[String]) -> Vec<String> {
        let linked: HashSet<String> = hrefs.iter().filter_map(|h| href_to_path(h)).collect();
        self.siblings(dst)
            .into_iter()
            .filter(|s| !linked.contains(s))
            .collect()
    }
}

/// Reduce an href to a local relative path: external and absolute targets
/// drop out, queries and fragments are stripped.
fn href_to_path(href: &str) -> Option<String> {
    if href.contains("://") || href.starts_with("//") || href.starts_with('#') {
        return None;
    }
    let path = href.split(['#', '?']).next().unwrap_or(href);
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn load(root: &Path) -> Site {
        Site::load(root, &Scanner::new(), SiteConfig::empty(root))
    }

    #[test]
    fn loads_pages_and_injects_indexes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "# A");
        write(tmp.path(), "docs/b.md", "# B");
        write(tmp.path(), "docs/style.css", "body {}");

        let site = load(tmp.path());
        let desired = site.desired_outputs(false);

        // three source pages plus the root and docs/ index pages
        assert!(desired.contains(Path::new("a.html")));
        assert!(desired.contains(Path::new("docs/b.html")));
        assert!(desired.contains(Path::new("docs/style.css")));
        assert!(desired.contains(Path::new("index.html")));
        assert!(desired.contains(Path::new("docs/index.html")));
        assert_eq!(desired.len(), 5);
    }

    #[test]
    fn explicit_index_suppresses_synthetic_one() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "index.md", "# Home");

        let site = load(tmp.path());

        let index_pages = site
            .pages
            .iter()
            .filter(|p| p.destinations() == vec![PathBuf::from("index.html")])
            .count();
        assert_eq!(index_pages, 1);
        assert!(matches!(site.pages[0], Page::Markdown(_)));
    }

    #[test]
    fn desired_outputs_match_page_destinations_and_are_idempotent() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "# A");
        write(tmp.path(), "assets/logo.svg", "<svg/>");

        let site = load(tmp.path());

        let by_hand: BTreeSet<PathBuf> =
            site.pages.iter().flat_map(|p| p.destinations()).collect();
        assert_eq!(site.desired_outputs(false), by_hand);
        assert_eq!(site.desired_outputs(false), site.desired_outputs(false));

        let mut with_index = by_hand.clone();
        with_index.insert(PathBuf::from(search::SEARCH_INDEX_FILE));
        assert_eq!(site.desired_outputs(true), with_index);
    }

    #[test]
    fn destination_collision_keeps_first_discovered() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "# from md");
        write(tmp.path(), "a.markdown", "# from markdown");

        let site = load(tmp.path());

        let a_pages: Vec<&Page> = site
            .pages
            .iter()
            .filter(|p| p.destinations() == vec![PathBuf::from("a.html")])
            .collect();
        assert_eq!(a_pages.len(), 1);
        // sorted order: "a.markdown" < "a.md"
        match a_pages[0] {
            Page::Markdown(doc) => assert_eq!(doc.src, PathBuf::from("a.markdown")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unreadable_file_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ok.md", "# fine");
        // a dangling symlink stats to nothing but is still walked
        #[cfg(unix)]
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("broken.md"))
            .unwrap();

        let site = load(tmp.path());
        assert!(
            site.desired_outputs(false)
                .contains(Path::new("ok.html"))
        );
        assert!(
            !site
                .desired_outputs(false)
                .contains(Path::new("broken.html"))
        );
    }

    #[test]
    fn siblings_see_same_directory_and_child_indexes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "docs/a.md", "# A");
        write(tmp.path(), "docs/b.md", "# B");
        write(tmp.path(), "docs/deep/c.md", "# C");
        write(tmp.path(), "other/d.md", "# D");

        let site = load(tmp.path());
        let siblings = site.siblings(Path::new("docs/a.html"));

        assert_eq!(
            siblings,
            vec![
                "b.html".to_string(),
                "deep/index.html".to_string(),
                "index.html".to_string(),
            ]
        );
    }

    #[test]
    fn not_linked_excludes_reached_siblings_and_external_urls() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "docs/a.md", "# A");
        write(tmp.path(), "docs/b.md", "# B");
        write(tmp.path(), "docs/c.md", "# C");

        let site = load(tmp.path());
        let hrefs = vec![
            "b.html".to_string(),
            "https://example.com/c.html".to_string(),
            "#section".to_string(),
        ];
        let not_linked = site.siblings_not_linked(Path::new("docs/a.html"), &hrefs);

        assert!(not_linked.contains(&"c.html".to_string()));
        assert!(!not_linked.contains(&"b.html".to_string()));
    }

    #[test]
    fn href_normalization() {
        assert_eq!(href_to_path("b.html?x=1"), Some("b.html".to_string()));
        assert_eq!(href_to_path("b.html#top"), Some("b.html".to_string()));
        assert_eq!(href_to_path("https://example.com/x"), None);
        assert_eq!(href_to_path("//cdn.example.com/x"), None);
        assert_eq!(href_to_path("#local"), None);
    }
}
