//! # sitegen
//!
//! An incremental static site generator. A directory of heterogeneous
//! source documents becomes a directory of HTML (plus verbatim-copied
//! assets), and only what changed since the last run is rebuilt.
//!
//! # Architecture: One Run, One Site
//!
//! There is no daemon and no persistent state beyond the output files
//! themselves. Each invocation scans the source tree, assembles a [`site::Site`]
//! of typed pages, reconciles the output directory against the desired
//! output set, regenerates the stale subset on a bounded worker pool, and
//! exits:
//!
//! ```text
//! scan ──▶ classify ──▶ Site ──▶ reconcile orphans
//!                          │
//!                          ├──▶ staleness filter (source mtime vs build clock)
//!                          ├──▶ parallel generate (pandoc/asciidoctor + templates)
//!                          └──▶ search index (only if anything changed)
//! ```
//!
//! Heavy lifting is delegated to external collaborators behind narrow
//! seams: `pandoc`/`asciidoctor` convert markup to HTML, a Jinja2-compatible
//! engine renders templates. Both are constructed in `main` and injected —
//! the library has no global service state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Recursive source walker with per-component ignore globs |
//! | [`page`] | Page variants, suffix classifier, breadcrumbs, generation |
//! | [`frontmatter`] | Dash-delimited YAML metadata block parsing |
//! | [`config`] | `config.yaml` site config and per-page overlay |
//! | [`convert`] | External document-conversion collaborators |
//! | [`template`] | Template engine wrapper and embedded defaults |
//! | [`html`] | Title/TOC extraction, body and link harvesting |
//! | [`site`] | Page collection, collision policy, index injection |
//! | [`freshness`] | Staleness rule and global template invalidation |
//! | [`build`] | Orphan reconciliation and the concurrent executor |
//! | [`search`] | Search index records and artifact |
//! | [`report`] | Stderr diagnostics with delimited error blocks |
//!
//! # Design Decisions
//!
//! ## Coarse invalidation over dependency tracking
//!
//! The build clock is the newest mtime across all template resources; a
//! page is stale when any destination is older than its source or that
//! clock. A single template edit therefore rebuilds the whole site. This is
//! deliberate: correctness (never serve stale output) is preferred over
//! build-time economy, and the code carries no per-page template dependency
//! graph to get out of sync.
//!
//! ## Failure isolation at the page boundary
//!
//! A page that cannot be loaded is dropped; a conversion that misbehaves
//! produces a visible error page; a template error skips that page for the
//! run. No single document ever takes the build down with it.
//!
//! ## Atomic destination writes
//!
//! Every output file is written to a temp file beside its destination and
//! renamed into place, so an interrupt or crash cannot leave truncated
//! output behind.

pub mod build;
pub mod config;
pub mod convert;
pub mod freshness;
pub mod frontmatter;
pub mod html;
pub mod page;
pub mod report;
pub mod scan;
pub mod search;
pub mod site;
pub mod template;
