use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use linescout::harvest::{extract_archive, Crawler, Downloader};
use linescout::{search, SearchOptions};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Streaming recursive text search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a query string under a directory tree
    Search(Box<SearchArgs>),

    /// Crawl an HTTP listing and download archives for later searching
    Harvest(HarvestArgs),
}

#[derive(Parser)]
struct SearchArgs {
    /// Text to look for
    query: String,

    /// Directory to search
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Regexes a file's name or path must match to be scanned
    #[arg(short = 'i', long = "include")]
    include: Vec<String>,

    /// Descend into hidden directories too
    #[arg(long)]
    hidden: bool,

    /// Number of scanner threads (default: CPU cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Give up after this long (e.g. "30s", "2m")
    #[arg(short = 't', long, default_value = "120s")]
    timeout: String,

    /// Emit results as JSON lines
    #[arg(long)]
    json: bool,

    /// Plain output, no highlighting
    #[arg(long)]
    plain: bool,

    /// Highlight at most this many occurrences per line (0 = all)
    #[arg(long, default_value = "0")]
    max_highlight: usize,

    /// Print summary statistics after the results
    #[arg(short, long)]
    stats: bool,
}

#[derive(Parser)]
struct HarvestArgs {
    /// Listing page to start crawling from
    start_url: String,

    /// Directory downloaded archives land in
    #[arg(short = 'd', long, default_value = "harvest")]
    target_dir: PathBuf,

    /// Only download archives at least this large
    #[arg(long, default_value = "0")]
    min_size_mb: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search(args) => run_search(*args),
        Commands::Harvest(args) => run_harvest(args),
    }
}

fn run_search(args: SearchArgs) -> Result<()> {
    let timeout =
        humantime::parse_duration(&args.timeout).context("invalid --timeout duration")?;

    let mut options = SearchOptions::new(args.root, &args.query);
    options.include_patterns = args.include;
    options.skip_hidden = !args.hidden;
    options.timeout = Some(timeout);
    if let Some(threads) = args.threads {
        options.concurrency = threads;
    }

    let started = Instant::now();
    let mut stream = search(options)?;

    for result in stream.by_ref() {
        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            let line = render_line(&result.line, &args.query, args.max_highlight, args.plain);
            println!(" {} --> {}", line, result.path.display());
        }
    }

    let summary = stream.finish()?;
    if args.stats {
        println!(
            "{} matching line(s) in {} file(s) ({} walked, {} skipped)",
            summary.lines_matched,
            summary.files_scanned,
            summary.files_walked,
            summary.files_skipped
        );
    }
    if !args.json {
        println!("{:.2?}", started.elapsed());
    }
    Ok(())
}

/// Colorizes up to `max_highlight` occurrences of the query in a matched
/// line; zero means no limit. Color never leaks into `--plain` or `--json`
/// output, and no process-wide color state is touched.
fn render_line(line: &str, query: &str, max_highlight: usize, plain: bool) -> String {
    if plain || query.is_empty() {
        return line.to_string();
    }
    let limit = if max_highlight == 0 {
        usize::MAX
    } else {
        max_highlight
    };

    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for (count, (idx, hit)) in line.match_indices(query).enumerate() {
        if count >= limit {
            break;
        }
        out.push_str(&line[cursor..idx]);
        out.push_str(&hit.red().bold().to_string());
        cursor = idx + hit.len();
    }
    out.push_str(&line[cursor..]);
    out
}

fn run_harvest(args: HarvestArgs) -> Result<()> {
    tracing::info!("crawling {}", args.start_url);
    let min_size_mb = args.min_size_mb;
    let crawler = Crawler::new(
        &args.start_url,
        Box::new(move |_url, size_mb| size_mb >= min_size_mb),
    );
    let downloader = Downloader::new(&args.target_dir);

    let mut count = 0u64;
    for file in downloader.run(crawler.run()) {
        let path = extract_archive(&file.local_path);
        println!("downloaded {} -> {}", file.url, path.display());
        count += 1;
    }
    println!(
        "{} archive(s) saved under {}",
        count,
        args.target_dir.display()
    );
    Ok(())
}
