use clap::Parser;
use sitegen::build::{self, BuildOptions};
use sitegen::config::SiteConfig;
use sitegen::convert::{AsciidoctorConverter, PandocConverter};
use sitegen::page::Services;
use sitegen::scan::Scanner;
use sitegen::site::Site;
use sitegen::template::TemplateEngine;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser)]
#[command(name = "sitegen")]
#[command(about = "Generate an HTML static site from markdown and asciidoc documents")]
#[command(long_about = "\
Generate an HTML static site from markdown and asciidoc documents.

Markdown is converted through pandoc, asciidoc through asciidoctor; all
other files are copied verbatim. Output mirrors the input tree with
document suffixes replaced by .html, every directory gets an index page,
and only pages whose output is older than their source (or any template)
are regenerated. Files the current sources no longer produce are removed
from the output directory.

Documents may start with a YAML front-matter block between lines of three
or more dashes; a config.yaml in the input directory provides site-wide
defaults (sitename, bibliography, csl).")]
struct Cli {
    /// Input directory containing the source documents
    inputdir: PathBuf,

    /// Output directory
    #[arg(short = 'o', long = "output", default_value = "_output")]
    outputdir: PathBuf,

    /// Template directory (falls back to the built-in templates)
    #[arg(short = 't', long = "template")]
    templatedir: Option<PathBuf>,

    /// Regenerate the search index when anything changed
    #[arg(short = 'i')]
    index_update: bool,

    /// Worker pool size for page generation
    #[arg(short = 'j', long = "jobs", default_value_t = build::DEFAULT_JOBS)]
    jobs: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))?;
    }

    let scanner = Scanner::new();
    let config = SiteConfig::load(&cli.inputdir)?;
    let services = Services {
        markdown: Box::new(PandocConverter::new()?),
        asciidoc: Box::new(AsciidoctorConverter::new()),
        templates: TemplateEngine::new(cli.templatedir.as_deref()),
    };

    let site = Site::load(&cli.inputdir, &scanner, config);

    let options = BuildOptions {
        output_root: cli.outputdir,
        search_index: cli.index_update,
        jobs: cli.jobs,
    };
    let summary = build::run(&site, &services, &scanner, &options, &cancel)?;

    if summary.interrupted {
        eprintln!("interrupted; partial build left in {}", options.output_root.display());
    } else {
        eprintln!(
            "generated {} pages, removed {} orphans ({} total pages)",
            summary.generated,
            summary.deleted,
            site.pages.len()
        );
    }

    Ok(())
}
