use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use protocap_market_data::RankedProtocol;

use super::model::{
    CombinedProtocolRow, MappingStatus, PipelineConfig, PipelineError, PipelineEvent,
    PipelinePhase, PipelineReport, TokenRef,
};
use super::sources::{MarketCapSource, RevenueSource};
use crate::constants::{ACCEPTANCE_THRESHOLD, SUCCESS_THRESHOLD};
use crate::errors::Error;
use crate::mapping::{BatchProgress, MappingCache, ProviderRef};
use crate::resolver::ResolutionResult;

/// Joins the revenue ranking with token market caps.
pub struct AggregationPipeline {
    revenue: Arc<dyn RevenueSource>,
    cache: Arc<MappingCache>,
    market_caps: Arc<dyn MarketCapSource>,
    config: PipelineConfig,
}

/// Event sink that ignores a dropped receiver.
struct Events(Option<UnboundedSender<PipelineEvent>>);

impl Events {
    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = self.0.as_ref() {
            let _ = tx.send(event);
        }
    }

    fn fail(&self, phase: PipelinePhase, source: Error) -> PipelineError {
        warn!("Pipeline failed while {}: {}", phase, source);
        self.emit(PipelineEvent::Failed {
            phase,
            message: source.to_string(),
        });
        self.emit(PipelineEvent::PhaseStarted {
            phase: PipelinePhase::Error,
        });
        PipelineError { phase, source }
    }
}

impl AggregationPipeline {
    pub fn new(
        revenue: Arc<dyn RevenueSource>,
        cache: Arc<MappingCache>,
        market_caps: Arc<dyn MarketCapSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            revenue,
            cache,
            market_caps,
            config,
        }
    }

    /// Run all phases once.
    ///
    /// Every revenue row is kept in the output; only confidently mapped
    /// tokens are sent to the market cap source.
    pub async fn run(
        &self,
        events: Option<UnboundedSender<PipelineEvent>>,
    ) -> Result<PipelineReport, PipelineError> {
        let events = Events(events);

        // Phase 1: revenue ranking
        let phase = PipelinePhase::LoadingRevenue;
        events.emit(PipelineEvent::PhaseStarted { phase });
        if self.config.limit == Some(0) {
            return Err(events.fail(
                phase,
                Error::Validation("protocol limit must be at least 1".to_string()),
            ));
        }
        let protocols = self
            .revenue
            .rankings(self.config.metric, self.config.limit)
            .await
            .map_err(|e| events.fail(phase, e))?;
        info!(
            "Loaded {} protocols ranked by {}",
            protocols.len(),
            self.config.metric
        );
        events.emit(PipelineEvent::PhaseCompleted { phase });

        // Phase 2: name -> token mapping
        let phase = PipelinePhase::MappingProtocols;
        events.emit(PipelineEvent::PhaseStarted { phase });
        let names: Vec<String> = protocols.iter().map(|p| p.name.clone()).collect();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (batch, ()) = tokio::join!(
            self.cache.resolve_many(&names, Some(progress_tx)),
            forward_progress(progress_rx, &events),
        );
        self.annotate(&protocols);
        events.emit(PipelineEvent::PhaseCompleted { phase });

        // Phase 3: market caps for accepted tokens
        let phase = PipelinePhase::FetchingMarketCaps;
        events.emit(PipelineEvent::PhaseStarted { phase });
        let ids = accepted_ids(&protocols, &batch.results);
        let caps = if ids.is_empty() {
            debug!("No mapped tokens, skipping market cap fetch");
            HashMap::new()
        } else {
            self.market_caps
                .market_caps(&ids)
                .await
                .map_err(|e| events.fail(phase, e))?
        };
        events.emit(PipelineEvent::PhaseCompleted { phase });

        let rows = combine(&protocols, &batch.results, &caps);
        events.emit(PipelineEvent::PhaseStarted {
            phase: PipelinePhase::Complete,
        });
        events.emit(PipelineEvent::Finished { rows: rows.len() });

        let mapped = rows
            .iter()
            .filter(|r| r.mapping_status != MappingStatus::Failed)
            .count();
        info!(
            "Pipeline complete: {} rows, {} mapped, {} market caps",
            rows.len(),
            mapped,
            caps.len()
        );

        Ok(PipelineReport {
            rows,
            failures: batch.failures,
            statistics: self.cache.statistics(),
        })
    }

    /// Record each ranked protocol's provider identity on its cached mapping.
    fn annotate(&self, protocols: &[RankedProtocol]) {
        let annotated = protocols
            .iter()
            .filter_map(|p| {
                let slug = p.slug.as_ref()?;
                Some(self.cache.annotate(
                    &p.name,
                    ProviderRef {
                        slug: slug.clone(),
                        name: p.name.clone(),
                    },
                ))
            })
            .filter(|stored| *stored)
            .count();
        debug!("Annotated {} cached mappings with provider slugs", annotated);
    }
}

async fn forward_progress(mut rx: UnboundedReceiver<BatchProgress>, events: &Events) {
    while let Some(progress) = rx.recv().await {
        events.emit(PipelineEvent::ProtocolMapped(progress));
    }
}

/// Distinct ids of tokens mapped at or above the acceptance threshold, in
/// ranking order.
fn accepted_ids(
    protocols: &[RankedProtocol],
    results: &HashMap<String, ResolutionResult>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    protocols
        .iter()
        .filter_map(|p| results.get(&p.name))
        .filter(|r| r.is_accepted())
        .filter_map(|r| r.coin_id())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

fn combine(
    protocols: &[RankedProtocol],
    results: &HashMap<String, ResolutionResult>,
    caps: &HashMap<String, f64>,
) -> Vec<CombinedProtocolRow> {
    let mut rows: Vec<CombinedProtocolRow> = protocols
        .iter()
        .map(|protocol| {
            let result = results
                .get(&protocol.name)
                .filter(|r| r.confidence >= ACCEPTANCE_THRESHOLD);
            let coin = result.and_then(|r| r.coin.as_ref());
            let market_cap = coin
                .and_then(|c| caps.get(&c.id))
                .copied()
                .filter(|cap| cap.is_finite() && *cap >= 0.0);
            let confidence = results
                .get(&protocol.name)
                .map(|r| r.confidence)
                .unwrap_or(0.0);

            let mapping_status = match coin {
                None => MappingStatus::Failed,
                Some(_) if confidence >= SUCCESS_THRESHOLD && market_cap.is_some() => {
                    MappingStatus::Success
                }
                Some(_) => MappingStatus::Partial,
            };

            CombinedProtocolRow {
                rank: protocol.rank,
                protocol_name: protocol.name.clone(),
                token: coin.map(|c| TokenRef {
                    id: c.id.clone(),
                    symbol: c.symbol.clone(),
                    name: c.name.clone(),
                }),
                revenue: protocol.value.max(0.0),
                market_cap,
                market_cap_percentage: None,
                mapping_status,
                confidence,
                match_method: result.map(|r| r.match_method),
            }
        })
        .collect();

    let total: f64 = rows.iter().filter_map(|r| r.market_cap).sum();
    if total > 0.0 {
        for row in &mut rows {
            row.market_cap_percentage = row.market_cap.map(|cap| cap / total * 100.0);
        }
    }
    rows
}
