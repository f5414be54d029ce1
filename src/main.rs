//! pagefold - turn web pages and documents into EPUB books

mod manifest;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use manifest::{ChapterEntry, Manifest, Source};
use pagefold::{Epub, EpubOptions, HttpClient, Metadata, Result};

#[derive(Parser)]
#[command(name = "pagefold")]
#[command(version, about = "Turn web pages and documents into EPUB books", long_about = None)]
#[command(after_help = "EXAMPLES:
    pagefold -t 'My Book' https://example.com/a https://example.com/b
    pagefold -t Notes --content-selector article notes.html more.docx
    pagefold -m book.json                 Build from a JSON manifest")]
struct Cli {
    /// Chapter sources in reading order: URLs or .html/.txt/.docx files
    #[arg(value_name = "SOURCE", required_unless_present = "manifest")]
    sources: Vec<String>,

    /// JSON manifest describing the book
    #[arg(short, long, conflicts_with = "sources")]
    manifest: Option<PathBuf>,

    /// Book title
    #[arg(short, long, required_unless_present = "manifest")]
    title: Option<String>,

    /// Book author
    #[arg(short = 'a', long)]
    creator: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    publisher: Option<String>,

    #[arg(long)]
    rights: Option<String>,

    /// Cover image (generated when omitted)
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Extra stylesheet, may be repeated
    #[arg(long = "css", value_name = "FILE")]
    css: Vec<PathBuf>,

    /// CSS selector locating each chapter's title
    #[arg(long)]
    title_selector: Option<String>,

    /// CSS selector locating each chapter's content
    #[arg(long)]
    content_selector: Option<String>,

    /// Output path (defaults to ./<title>.epub)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Build in this directory instead of a temporary one
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// User agent for page and image requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print per-chapter and per-image details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pagefold={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<PathBuf> {
    let mut builder = HttpClient::builder().timeout(Duration::from_secs(cli.timeout));
    if let Some(user_agent) = &cli.user_agent {
        builder = builder.user_agent(user_agent);
    }
    let client = builder.build()?;

    let plan = match &cli.manifest {
        Some(path) => Manifest::load(path)?,
        None => manifest_from_args(&cli),
    };

    let mut options = EpubOptions::new().with_fetcher(client.clone());
    options.cover = cli.cover.clone().or(plan.cover.clone());
    options.css_paths = plan.css.iter().chain(&cli.css).cloned().collect();
    options.build_dir = cli.build_dir.clone();

    let mut book = Epub::with_options(metadata_for(&plan, &cli), options)?;
    for entry in &plan.chapters {
        let chapter = entry.load(&client)?;
        book.add_chapter(chapter);
    }
    info!(chapters = book.chapters().len(), "chapters loaded");

    let output = cli.output.as_deref().or(plan.output.as_deref());
    book.create(output)
}

/// Command-line flags override the manifest's metadata.
fn metadata_for(plan: &Manifest, cli: &Cli) -> Metadata {
    let mut meta = plan.metadata();
    if let Some(title) = &cli.title {
        meta.title = title.clone();
    }
    if let Some(creator) = &cli.creator {
        meta = meta.with_creator(creator);
    }
    if let Some(language) = &cli.language {
        meta = meta.with_language(language);
    }
    if let Some(publisher) = &cli.publisher {
        meta = meta.with_publisher(publisher);
    }
    if let Some(rights) = &cli.rights {
        meta = meta.with_rights(rights);
    }
    meta
}

fn manifest_from_args(cli: &Cli) -> Manifest {
    let chapters = cli
        .sources
        .iter()
        .map(|arg| ChapterEntry {
            source: Source::from_arg(arg),
            title: None,
            title_selector: cli.title_selector.clone(),
            content_selector: cli.content_selector.clone(),
        })
        .collect();
    Manifest {
        title: cli.title.clone().unwrap_or_default(),
        creator: None,
        language: None,
        rights: None,
        publisher: None,
        cover: None,
        css: Vec::new(),
        output: None,
        chapters,
    }
}
