//! Staleness decisions.
//!
//! A destination needs regeneration when it does not exist, or when its
//! mtime is older than `max(source mtime, build clock)`. The build clock is
//! the newest mtime among all shared template resources, so one template
//! edit invalidates every page — deliberately coarse: there is no tracking
//! of which template a given page rendered through, and serving stale
//! output is worse than rebuilding too much. Replacing this with a real
//! dependency graph would be a design change, not a tweak.

use crate::page::Page;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Whether any of `page`'s destinations under `output_root` is stale
/// relative to the source mtime and the build clock.
pub fn needs_update(page: &Page, output_root: &Path, clock: SystemTime) -> bool {
    let threshold = page.last_modified().max(clock);
    page.destinations().iter().any(|dst| {
        match fs::metadata(output_root.join(dst)).and_then(|m| m.modified()) {
            Ok(mtime) => mtime < threshold,
            // missing or unreadable counts as stale
            Err(_) => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::classify;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn page_and_output(content_written: bool) -> (TempDir, TempDir, Page) {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("a.md"), "# A\n").unwrap();
        if content_written {
            fs::write(out.path().join("a.html"), "<html/>").unwrap();
        }
        let page = classify(src.path(), Path::new("a.md")).unwrap();
        (src, out, page)
    }

    fn dst_mtime(out: &TempDir) -> SystemTime {
        fs::metadata(out.path().join("a.html"))
            .unwrap()
            .modified()
            .unwrap()
    }

    #[test]
    fn missing_destination_is_stale() {
        let (_src, out, page) = page_and_output(false);
        assert!(needs_update(&page, out.path(), UNIX_EPOCH));
    }

    #[test]
    fn destination_older_than_clock_is_stale() {
        let (_src, out, page) = page_and_output(true);
        let clock = dst_mtime(&out) + Duration::from_secs(10);
        assert!(needs_update(&page, out.path(), clock));
    }

    #[test]
    fn destination_newer_than_source_and_clock_is_fresh() {
        let (_src, out, page) = page_and_output(true);
        // destination was written after the source; push the comparison
        // well clear of filesystem timestamp granularity
        let clock = page.last_modified() - Duration::from_secs(10);
        let fresh = dst_mtime(&out) > page.last_modified().max(clock);
        if fresh {
            assert!(!needs_update(&page, out.path(), clock));
        }
    }

    #[test]
    fn staleness_is_monotone_in_the_clock() {
        let (_src, out, page) = page_and_output(true);
        let pivot = dst_mtime(&out).max(page.last_modified());

        // any clock strictly above the destination mtime forces an update
        assert!(needs_update(
            &page,
            out.path(),
            pivot + Duration::from_secs(1)
        ));
        // clock and source both strictly below: no update
        let below = pivot - Duration::from_secs(1);
        if page.last_modified() < dst_mtime(&out) {
            assert!(!needs_update(&page, out.path(), below.min(page.last_modified())));
        }
    }

    #[test]
    fn template_change_invalidates_every_page() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("a.md"), "# A\n").unwrap();
        fs::write(src.path().join("b.md"), "# B\n").unwrap();
        fs::write(src.path().join("c.css"), "body{}\n").unwrap();
        for name in ["a.html", "b.html", "c.css"] {
            fs::write(out.path().join(name), "generated").unwrap();
        }

        let pages: Vec<Page> = ["a.md", "b.md", "c.css"]
            .iter()
            .map(|n| classify(src.path(), Path::new(n)).unwrap())
            .collect();

        // a template touched after every destination: the clock moves past
        // all of them and every single page reports stale
        let newest_output = ["a.html", "b.html", "c.css"]
            .iter()
            .map(|n| fs::metadata(out.path().join(n)).unwrap().modified().unwrap())
            .max()
            .unwrap();
        let clock = newest_output + Duration::from_secs(1);

        for page in &pages {
            assert!(needs_update(page, out.path(), clock));
        }
    }
}
