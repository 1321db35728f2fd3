use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use harvest::config::{HarvestConfig, Source, load_filters, parse_header};
use harvest::pipeline::HarvestPipeline;
use harvest::sources::build_api;
use harvest::writer::JsonFileWriter;

/// Harvest candidate resumes into a JSON file.
#[derive(Parser, Debug)]
#[command(name = "harvest", version)]
struct Cli {
    /// robota (JSON API) or workua (HTML listing)
    #[arg(long)]
    source: Option<Source>,

    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long)]
    page_size: Option<u32>,

    #[arg(long)]
    max_pages: Option<u32>,

    /// Detail fetches in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// JSON file with search filters
    #[arg(long)]
    filters: Option<PathBuf>,

    #[arg(long)]
    keywords: Option<String>,

    /// Extra request header, `Name: value`
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<HarvestConfig> {
        let mut config =
            HarvestConfig::from_env(self.source).context("failed to load configuration")?;
        if let Some(out) = self.out {
            config.output_path = out;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if self.max_pages.is_some() {
            config.max_pages = self.max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(path) = self.filters {
            config.filters = load_filters(&path)?;
        }
        if let Some(keywords) = self.keywords {
            config.filters.key_words = keywords;
        }
        for raw in &self.headers {
            config.headers.push(parse_header(raw)?);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The subscriber also picks up records from the log facade.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(true)
        .init();

    let config = cli.into_config()?;
    let api = build_api(&config)?;
    let pipeline = HarvestPipeline::new(api, &config)?;
    let writer = JsonFileWriter::new(config.output_path.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, finishing with partial results");
            on_signal.cancel();
        }
    });

    log::info!("starting {} harvest", config.source);
    let result = pipeline
        .run_and_persist(&config.search_spec(), &cancel, &writer)
        .await
        .with_context(|| format!("harvest of {} failed", config.source))?;

    log::info!(
        "done: {} candidates from {} summaries over {} pages ({:?}), written to {}",
        result.stats.enriched,
        result.stats.summaries,
        result.stats.pages_fetched,
        result.stats.enumeration,
        writer.path().display()
    );
    Ok(())
}
