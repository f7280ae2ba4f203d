use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use feed_scraper_cli::{
    ai::QuestionAnswerer,
    analysis::{FeedStats, FilterCriteria},
    browser::ChromiumSession,
    config::AppConfig,
    scraper::{Extraction, FeedScraper},
    snapshot::SnapshotPage,
    utils::{self, FeedExport},
    ProgressEvent,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "feed_scraper_cli", about = "Scrape a social feed and ask questions about it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll the feed for a while and save every post seen
    Scrape {
        /// How long to scroll, in seconds
        #[arg(short, long)]
        duration: Option<u64>,
        /// Feed page to open
        #[arg(long)]
        url: Option<String>,
        /// CSS selector for post text nodes
        #[arg(long)]
        selector: Option<String>,
        /// Posts this short or shorter are ignored
        #[arg(long)]
        min_length: Option<usize>,
        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
        /// Browser profile holding the logged-in session
        #[arg(long)]
        profile_dir: Option<PathBuf>,
        /// Replay saved HTML pages from this directory instead of a browser
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Pause after opening the feed until Enter is pressed
        #[arg(long)]
        wait_for_login: bool,
        #[arg(short, long, default_value = "feed.json")]
        output: PathBuf,
    },
    /// Print the posts that match the filter
    Filter {
        #[arg(short, long, default_value = "feed.json")]
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Word, mention and hashtag statistics
    Stats {
        #[arg(short, long, default_value = "feed.json")]
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Rows per table
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,
    },
    /// Ask the language model a question about the collected posts
    Ask {
        question: String,
        #[arg(short, long, default_value = "feed.json")]
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Also write the answer to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, default_value_t = 0)]
    min_chars: usize,
    #[arg(long, default_value_t = 10_000)]
    max_chars: usize,
    /// Case-insensitive substring
    #[arg(short, long)]
    keyword: Option<String>,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.min_chars, self.max_chars, self.keyword.as_deref())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Commands::Scrape {
            duration,
            url,
            selector,
            min_length,
            headless,
            profile_dir,
            replay,
            wait_for_login,
            output,
        } => {
            if let Some(secs) = duration {
                config.scrape.duration = Duration::from_secs(secs);
            }
            if let Some(url) = url {
                config.feed_url = url;
            }
            if let Some(selector) = selector {
                config.scrape.selector = selector;
            }
            if let Some(min_length) = min_length {
                config.scrape.min_length = min_length;
            }
            if headless {
                config.browser.headless = true;
            }
            if profile_dir.is_some() {
                config.browser.profile_dir = profile_dir;
            }

            let extraction = match replay {
                Some(dir) => scrape_replay(&config, &dir).await?,
                None => scrape_live(&config, wait_for_login).await?,
            };

            println!(
                "Collected {} posts ({} skipped)",
                extraction.collected.len(),
                extraction.skipped.total()
            );
            let export = FeedExport::new(extraction.collected.into_texts());
            utils::save_json(&export, &output)
                .with_context(|| format!("saving {:?}", output))?;
        }
        Commands::Filter { input, filter } => {
            let export = load(&input)?;
            let view = filter.criteria().apply(&export.blocks);
            for block in &view {
                println!("{}\n", block);
            }
            println!("{} of {} posts match", view.len(), export.blocks.len());
        }
        Commands::Stats { input, filter, top } => {
            let export = load(&input)?;
            let view = filter.criteria().apply(&export.blocks);
            print_stats(&FeedStats::compute(&view), top);
        }
        Commands::Ask {
            question,
            input,
            filter,
            output,
        } => {
            let export = load(&input)?;
            let view = filter.criteria().apply(&export.blocks);
            let answerer = QuestionAnswerer::new(config.api_key())
                .with_model(config.model.clone())
                .with_base_url(config.base_url.clone());
            let answer = answerer.answer(&view, &question).await;
            println!("{}", answer);
            if let Some(path) = output {
                utils::save_text(&answer, &path).with_context(|| format!("saving {:?}", path))?;
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<FeedExport> {
    utils::load_json(path).with_context(|| format!("reading {:?} (run `scrape` first)", path))
}

fn progress_bar(total: Duration) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total.as_secs());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len}s {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn report(pb: &ProgressBar) -> impl Fn(ProgressEvent) + Send + Sync + '_ {
    move |event: ProgressEvent| {
        pb.set_position(event.elapsed.as_secs());
        pb.set_message(format!("{} posts", event.count));
    }
}

async fn scrape_replay(config: &AppConfig, dir: &Path) -> Result<Extraction> {
    let page = SnapshotPage::from_dir(dir)?;
    let scraper = FeedScraper::new(config.scrape.clone())?;
    let pb = progress_bar(config.scrape.duration)?;
    let sink = report(&pb);
    let extraction = scraper.scrape(&page, Some(&sink)).await?;
    pb.finish();
    Ok(extraction)
}

async fn scrape_live(config: &AppConfig, wait_for_login: bool) -> Result<Extraction> {
    let scraper = FeedScraper::new(config.scrape.clone())?;
    let session = ChromiumSession::open(&config.browser, &config.feed_url).await?;

    if wait_for_login {
        println!("Log in to the feed in the browser window, then press Enter to start.");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    }

    info!("scrolling {} for {}s", config.feed_url, config.scrape.duration.as_secs());
    let pb = progress_bar(config.scrape.duration)?;
    let sink = report(&pb);
    let extraction = scraper.scrape_and_close(session, Some(&sink)).await;
    pb.finish();
    Ok(extraction?)
}

fn print_stats(stats: &FeedStats, top: usize) {
    println!("Posts: {}", stats.block_count);
    println!("Words: {}", stats.total_words);
    if let Some(length) = &stats.length {
        println!(
            "Length: min {} / max {} / mean {:.1}",
            length.min, length.max, length.mean
        );
    }
    for (title, rows) in [
        ("Top words", stats.top_words(top)),
        ("Top mentions", stats.top_mentions(top)),
        ("Top hashtags", stats.top_hashtags(top)),
    ] {
        if rows.is_empty() {
            continue;
        }
        println!("\n{}:", title);
        for (term, count) in rows {
            println!("  {:>5}  {}", count, term);
        }
    }
}
