use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use refract::application::LoadCatalogUseCase;
use refract::infrastructure::{
    AppConfig, CatalogClient, CliArgs, ConfigStore, HttpFetcher, MemoryImageCache, Pipeline,
    TracingEventSink,
};
use refract::presentation::{DeliveryOutcome, ListView};

const SLOT_COUNT: usize = 8;
const CELL_SIZE: (u32, u32) = (60, 60);
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(20);

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let args = CliArgs::parse();
    let mut config = ConfigStore::locate(args.config.as_deref())?.load()?;
    config.merge_with_args(args);
    Ok(config)
}

#[derive(Debug, Default)]
struct Tally {
    applied: usize,
    stale: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Applied => self.applied += 1,
            DeliveryOutcome::Stale => self.stale += 1,
            DeliveryOutcome::Failed => self.failed += 1,
        }
    }
}

async fn settle(view: &mut ListView, tally: &mut Tally) {
    let deadline = Instant::now() + DELIVERY_TIMEOUT;
    for outcome in view.drain_deliveries() {
        tally.record(outcome);
    }
    while view.loading_count() > 0 {
        let next = timeout_at(deadline, view.next_delivery()).await;
        match next {
            Ok(Some(outcome)) => tally.record(outcome),
            Ok(None) => break,
            Err(_) => {
                warn!(
                    loading = view.loading_count(),
                    "Timed out waiting for artwork"
                );
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = load_config()?;
    init_logging(&config)?;

    info!(version = refract::VERSION, "Starting {}", refract::NAME);

    let sink = Arc::new(TracingEventSink);
    let cache = Arc::new(
        MemoryImageCache::new(
            config.pipeline.memory_cache_bytes,
            config.pipeline.memory_cache_entries,
        )
        .with_sink(sink.clone()),
    );
    let fetcher = HttpFetcher::new(
        Duration::from_secs(config.pipeline.timeout_secs),
        config.pipeline.user_agent.as_deref(),
    )?;
    let pipeline = Pipeline::builder(Arc::new(fetcher))
        .cache(cache.clone())
        .sink(sink)
        .config(config.pipeline.clone())
        .build();

    let catalog = CatalogClient::with_search_url(&config.catalog.search_url)?;
    let entities = LoadCatalogUseCase::new(Arc::new(catalog))
        .execute(&config.catalog.term, config.catalog.limit)
        .await?;

    let mut view = ListView::new(pipeline.clone(), SLOT_COUNT, CELL_SIZE);
    view.set_items(entities);
    let rows = view.items().len();

    let mut tally = Tally::default();
    let pages: Vec<usize> = [0, SLOT_COUNT / 2, SLOT_COUNT, 0]
        .into_iter()
        .filter(|first_row| *first_row < rows.max(1))
        .collect();

    for first_row in pages {
        view.scroll_to(first_row);
        settle(&mut view, &mut tally).await;

        for (slot, cell) in view.cells().iter().enumerate() {
            let Some(row) = cell.row else { continue };
            let state = match &cell.image {
                Some(image) => format!("{}x{}", image.width(), image.height()),
                None => format!("{:?}", cell.status),
            };
            println!(
                "[slot {slot}] row {row:>3}  {:<40} {:<24} {state}",
                cell.title, cell.subtitle
            );
        }
        println!();
    }

    println!(
        "rows: {rows}  applied: {}  stale: {}  failed: {}  pending: {}",
        tally.applied,
        tally.stale,
        tally.failed,
        pipeline.pending_count()
    );
    println!("cache: {}", cache.stats());

    Ok(())
}
