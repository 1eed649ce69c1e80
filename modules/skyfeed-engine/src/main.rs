use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engagement_client::EngagementClient;
use media_search_client::MediaSearchClient;
use skyfeed_common::{Config, SkyfeedError, SortOrder};
use skyfeed_engine::traits::EngagementService;
use skyfeed_engine::{AggregateSession, PageRequest, SessionDeps};

#[derive(Parser)]
#[command(name = "skyfeed", about = "Aggregate and page through image search results")]
struct Cli {
    /// Extra query to fold into the first load
    #[arg(long)]
    query: Option<String>,

    /// Category filter applied to the view ("all" disables it)
    #[arg(long, default_value = "all")]
    category: String,

    /// Sort order: newest or oldest
    #[arg(long, default_value = "newest")]
    order: SortOrder,

    /// Incremental pages to load after the first one
    #[arg(long, default_value_t = 2)]
    pages: usize,

    /// Seed for partition sampling (overrides SKYFEED_RNG_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final view as JSON instead of one line per item
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skyfeed=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }
    config.log_redacted();

    let search = MediaSearchClient::new(&config.search_api_url, config.http_timeout)
        .context("Failed to build search client")?;
    let engagement: Option<Arc<dyn EngagementService>> = match config.engagement_api_url {
        Some(ref url) => Some(Arc::new(
            EngagementClient::new(url, config.engagement_api_token.as_deref(), config.http_timeout)
                .context("Failed to build engagement client")?,
        )),
        None => None,
    };

    let session = AggregateSession::new(SessionDeps::from_config(&config, Arc::new(search), engagement));
    session.set_filter(&cli.category);
    session.set_sort_order(cli.order);

    let first = match cli.query.as_deref() {
        Some(q) => {
            session.resolve_viewer().await?;
            session.reset_session(Some(q)).await
        }
        None => session.initialize_session().await,
    };
    match first {
        Ok(report) => info!(inserted = report.inserted, "Initial load complete"),
        Err(SkyfeedError::TotalFetchFailure(n)) => warn!(partitions = n, "Initial load failed"),
        Err(e) => return Err(e.into()),
    }

    for page in 1..=cli.pages {
        match session.request_next_page().await {
            Ok(PageRequest::Completed(report)) => {
                info!(page, inserted = report.inserted, "Page loaded")
            }
            Ok(PageRequest::Ignored) => info!(page, "Page request ignored"),
            Err(SkyfeedError::TotalFetchFailure(n)) => warn!(page, partitions = n, "Page failed"),
            Err(e) => return Err(e.into()),
        }
    }

    for notice in session.take_notices() {
        eprintln!("notice: {notice}");
    }

    let view = session.current_view();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for item in &view {
            println!(
                "{}  {:<40}  [{}]  {}",
                item.created_at.format("%Y-%m-%d"),
                item.title.chars().take(40).collect::<String>(),
                item.source_partition,
                item.media_url
            );
        }
    }
    info!("{}", session.session_stats());

    Ok(())
}
