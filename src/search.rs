//! Search index artifact.
//!
//! One record per page, aggregated into a single script-evaluable file at
//! the output root: `var data=[{url, title, content}, ...]`. Document pages
//! contribute their whitespace-collapsed source as content; copies and
//! index pages are findable by name only.

use crate::frontmatter;
use crate::page::Page;
use crate::site::Site;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Fixed artifact path under the output root.
pub const SEARCH_INDEX_FILE: &str = "searchindex.js";

/// One searchable page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRecord {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// The search record for a single page.
pub fn record(page: &Page, source_root: &Path) -> SearchRecord {
    let url = page.url();
    match page {
        Page::Copy(p) => SearchRecord {
            url,
            title: stem(&p.src),
            content: String::new(),
        },
        Page::Index(p) => SearchRecord {
            url,
            title: stem(&p.dst),
            content: String::new(),
        },
        Page::Markdown(p) | Page::Asciidoc(p) => {
            let title = stem(&p.src);
            // an unreadable source just contributes no content; the page
            // load already reported the real problem
            let content = fs::read_to_string(source_root.join(&p.src))
                .map(|raw| {
                    let (_, body) = frontmatter::split(&raw);
                    collapse(&format!("{title} {body}"))
                })
                .unwrap_or_default();
            SearchRecord {
                url,
                title,
                content,
            }
        }
    }
}

/// Serialize the whole site's records as the artifact body.
pub fn render_index(site: &Site) -> serde_json::Result<String> {
    let records: Vec<SearchRecord> = site
        .pages
        .iter()
        .map(|p| record(p, &site.source_root))
        .collect();
    Ok(format!("var data={}", serde_json::to_string(&records)?))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::scan::Scanner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn document_record_collapses_source() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("notes.md"),
            "---\ntitle: x\n---\nline one\n\n  line   two\n",
        )
        .unwrap();

        let site = Site::load(
            tmp.path(),
            &Scanner::new(),
            SiteConfig::empty(tmp.path()),
        );
        let page = site
            .pages
            .iter()
            .find(|p| p.url() == "notes.html")
            .unwrap();

        let record = record(page, tmp.path());
        assert_eq!(record.url, "notes.html");
        assert_eq!(record.title, "notes");
        assert_eq!(record.content, "notes line one line two");
    }

    #[test]
    fn copy_record_has_empty_content() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("logo.svg"), "<svg/>").unwrap();

        let site = Site::load(
            tmp.path(),
            &Scanner::new(),
            SiteConfig::empty(tmp.path()),
        );
        let page = site.pages.iter().find(|p| p.url() == "logo.svg").unwrap();

        let record = record(page, tmp.path());
        assert_eq!(record.title, "logo");
        assert_eq!(record.content, "");
    }

    #[test]
    fn artifact_is_a_script_assignment() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "# A\n").unwrap();

        let site = Site::load(
            tmp.path(),
            &Scanner::new(),
            SiteConfig::empty(tmp.path()),
        );
        let js = render_index(&site).unwrap();

        assert!(js.starts_with("var data=["));
        assert!(js.contains("\"url\":\"a.html\""));
        assert!(js.contains("\"title\":\"a\""));
    }
}
