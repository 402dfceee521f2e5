use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use protocap_core::{
    AggregationPipeline, EntityResolver, MappingCache, MappingCacheConfig, PipelineConfig,
    PipelineEvent, PipelinePhase, PipelineReport,
};
use protocap_market_data::{CoinGeckoClient, DefiLlamaClient};

use crate::config::{Config, OutputFormat};
use crate::render::render_table;

pub struct Services {
    pub cache: Arc<MappingCache>,
    pub pipeline: AggregationPipeline,
}

pub fn init_tracing() {
    let log_format = std::env::var("PROTOCAP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub fn build_services(config: &Config) -> anyhow::Result<Services> {
    let coingecko = Arc::new(CoinGeckoClient::new(config.coingecko())?);
    let defillama = Arc::new(DefiLlamaClient::new(config.defillama())?);
    tracing::info!(
        "CoinGecko plan in use: {} ({:?})",
        coingecko.plan(),
        coingecko.endpoint_state()
    );

    let resolver = Arc::new(EntityResolver::new(coingecko.clone()));
    let cache = Arc::new(MappingCache::new(
        resolver,
        MappingCacheConfig {
            batch_delay: config.batch_delay,
        },
    ));

    let pipeline = AggregationPipeline::new(
        defillama,
        cache.clone(),
        coingecko,
        PipelineConfig {
            metric: config.metric,
            limit: Some(config.limit),
        },
    );

    Ok(Services { cache, pipeline })
}

/// Seed the cache from disk, run the pipeline once, print the report and
/// write the cache back.
pub async fn run(config: &Config, services: &Services) -> anyhow::Result<()> {
    if config.cache_path.exists() {
        if let Err(e) = services.cache.load(&config.cache_path) {
            tracing::warn!(
                "Ignoring unreadable mapping cache {}: {}",
                config.cache_path.display(),
                e
            );
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let logger = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
    });

    let result = services.pipeline.run(Some(tx)).await;
    // The sender is dropped with the run, which ends the logger.
    if let Err(e) = logger.await {
        tracing::warn!("Event logger stopped abnormally: {}", e);
    }
    let report = result?;

    print_report(&report, config.output)?;

    services.cache.save(&config.cache_path)?;
    Ok(())
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::PhaseStarted {
            phase: PipelinePhase::Complete | PipelinePhase::Error,
        } => {}
        PipelineEvent::PhaseStarted { phase } => tracing::info!("Started {}", phase),
        PipelineEvent::PhaseCompleted { phase } => tracing::debug!("Finished {}", phase),
        PipelineEvent::ProtocolMapped(progress) => tracing::debug!(
            "[{}/{}] {} -> {}{}",
            progress.completed,
            progress.total,
            progress.name,
            progress.match_method,
            if progress.from_cache { " (cached)" } else { "" }
        ),
        PipelineEvent::Failed { phase, message } => {
            tracing::error!("Failed while {}: {}", phase, message)
        }
        PipelineEvent::Finished { rows } => tracing::info!("Pipeline produced {} rows", rows),
    }
}

fn print_report(report: &PipelineReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            print!("{}", render_table(&report.rows));
            let stats = &report.statistics;
            println!(
                "\n{} lookups, {} cache hits ({:.1}%), {} resolver calls, {} unresolved",
                stats.total_lookups,
                stats.cache_hits,
                stats.cache_hit_rate() * 100.0,
                stats.api_calls,
                report.failures.len()
            );
        }
    }
    Ok(())
}
