mod cache;
mod error;
mod fetcher;
mod listing;
mod model;
mod parser;
mod prompt;
mod settings;
mod transport;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use cache::CacheStore;
use fetcher::Fetcher;
use model::ArticleCollection;
use settings::Settings;
use transport::HttpTransport;

#[derive(Parser)]
#[command(name = "note_scraper", about = "Fetch a note.com author's posts and build an LLM prompt from them")]
struct Cli {
    /// Cache directory (default: $NOTE_CACHE_DIR or cached_posts)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Author id or profile URL (default: $NOTE_AUTHOR)
    #[arg(short, long)]
    author: Option<String>,
    /// Drop every cached page and fetch all articles again
    #[arg(long)]
    refresh: bool,
    /// Keep only the most recent N articles
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all articles and print them as a posts block
    Posts {
        #[command(flatten)]
        run: RunArgs,
        /// Print records as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Fetch all articles and print the assembled prompt
    Prompt {
        #[command(flatten)]
        run: RunArgs,
        /// Directory holding prefix.txt, body.txt and thema.txt
        #[arg(long)]
        prompts: Option<PathBuf>,
    },
    /// List article titles and URLs without fetching bodies
    List {
        /// Author id or profile URL (default: $NOTE_AUTHOR)
        #[arg(short, long)]
        author: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete all cached article pages
    ClearCache,
    /// Show cache statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(dir) = cli.cache_dir {
        settings.cache_dir = dir;
    }

    let result = match cli.command {
        Commands::Posts { run, json } => {
            let collection = fetch_all(&settings, &run).await?;
            let records = select(&collection, run.limit);
            if json {
                println!("{}", serde_json::to_string_pretty(records)?);
            } else {
                println!("{}", prompt::format_posts(records));
            }
            Ok(())
        }
        Commands::Prompt { run, prompts } => {
            let collection = fetch_all(&settings, &run).await?;
            let posts = prompt::format_posts(select(&collection, run.limit));
            let dir = prompts.unwrap_or_else(|| settings.prompts_dir.clone());
            let text = prompt::PromptBuilder::new(&dir)
                .build(&posts)
                .with_context(|| format!("Failed to build prompt from {}", dir.display()))?;
            println!("{}", text);
            Ok(())
        }
        Commands::List { author, json } => {
            let author = settings.author_id(author.as_deref())?;
            let fetcher = build_fetcher(&settings)?;
            let summaries = fetcher.list(&author).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }
            if summaries.is_empty() {
                println!("No articles found for {}.", author);
                return Ok(());
            }
            println!("{:>4} | {:<25} | {:<40} | URL", "#", "Published", "Title");
            println!("{}", "-".repeat(110));
            for (i, s) in summaries.iter().enumerate() {
                let published = s
                    .published_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S%:z").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>4} | {:<25} | {:<40} | {}",
                    i + 1,
                    published,
                    truncate(&s.title, 40),
                    s.url
                );
            }
            println!("\n{} articles", summaries.len());
            Ok(())
        }
        Commands::ClearCache => {
            let cache = CacheStore::open(&settings.cache_dir)?;
            let removed = cache.clear_all();
            println!("Removed {} cached pages from {}", removed, cache.dir().display());
            Ok(())
        }
        Commands::Stats => {
            let cache = CacheStore::open(&settings.cache_dir)?;
            let s = cache.stats();
            println!("Cache dir: {}", cache.dir().display());
            println!("Entries:   {}", s.entries);
            println!("Size:      {:.1} KiB", s.bytes as f64 / 1024.0);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_fetcher(settings: &Settings) -> anyhow::Result<Fetcher<HttpTransport>> {
    let cache = CacheStore::open(&settings.cache_dir)?;
    let transport = HttpTransport::new(settings.timeout())?;
    Ok(Fetcher::new(
        transport,
        cache,
        settings.base_url.as_str(),
        settings.page_delay(),
    ))
}

async fn fetch_all(settings: &Settings, run: &RunArgs) -> anyhow::Result<ArticleCollection> {
    let author = settings.author_id(run.author.as_deref())?;
    let fetcher = build_fetcher(settings)?;

    let t_fetch = Instant::now();
    let collection = fetcher.run(&author, run.refresh).await;
    if collection.is_empty() {
        warn!("No articles found for {}", author);
    }
    eprintln!(
        "Fetched {} articles ({} from cache, {} without content) in {}",
        collection.len(),
        collection.cache_hits,
        collection.failures.len(),
        format_duration(t_fetch.elapsed())
    );
    for failure in &collection.failures {
        eprintln!("  {}: {}", failure.url, failure.error);
    }
    Ok(collection)
}

fn select(collection: &ArticleCollection, limit: Option<usize>) -> &[model::ArticleRecord] {
    match limit {
        Some(n) => collection.latest(n),
        None => collection.records(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
