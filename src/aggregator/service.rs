use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::thread_rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::aggregator::currency::resolve_rate;
use crate::aggregator::fetcher::{FetchError, PageSource};
use crate::aggregator::models::{ExchangeRate, Listing};
use crate::aggregator::parser::extract_listings;
use crate::config::Config;

type UnitOutcome = (String, Result<Vec<Listing>, FetchError>);

/// Where the current aggregation pass is. Observational only: overlapping
/// passes each write here and the last writer wins, mirroring the
/// uncoordinated-refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Fetching,
    Collecting,
    Streaming,
    Completed,
}

/// Aggregation engine, constructed once at the composition root and
/// shared by reference. Holds the page source and config; every pass
/// resolves its own exchange rate and builds a fresh catalog.
pub struct AggregatorService {
    fetcher: Arc<dyn PageSource>,
    config: Config,
    state_tx: watch::Sender<PassState>,
}

impl AggregatorService {
    pub fn with_source(fetcher: Arc<dyn PageSource>, config: Config) -> Self {
        let (state_tx, _) = watch::channel(PassState::Idle);
        Self {
            fetcher,
            config,
            state_tx,
        }
    }

    pub fn state(&self) -> watch::Receiver<PassState> {
        self.state_tx.subscribe()
    }

    /// Batch pass: fan out over every source, join on all units, publish
    /// the whole catalog once. Failing sources contribute nothing; the
    /// result is never an error, only possibly empty.
    pub async fn aggregate(&self, sources: &[String], cap: usize) -> Vec<Listing> {
        self.state_tx.send_replace(PassState::Fetching);

        let rate = self.resolve_pass_rate().await;
        let mut units = self.fan_out(sources, cap, rate);

        self.state_tx.send_replace(PassState::Collecting);

        let mut catalog = Vec::new();
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((url, Ok(listings))) => {
                    info!(url = %url, count = listings.len(), "Source contributed");
                    catalog.extend(listings);
                }
                Ok((url, Err(e))) => {
                    warn!(url = %url, error = %e, "Source failed, skipping");
                }
                Err(e) => {
                    warn!(error = %e, "Aggregation unit panicked, skipping");
                }
            }
        }

        self.publish(&mut catalog);
        self.state_tx.send_replace(PassState::Completed);
        info!(total = catalog.len(), "Aggregation pass complete");
        catalog
    }

    /// Streaming pass: each unit's capped records are delivered on the
    /// returned channel as the unit completes. The channel consumer is
    /// the single writer of whatever aggregated collection it builds.
    /// Dropping the receiver does not stop in-flight fetches; their
    /// results are discarded.
    pub fn aggregate_streaming(
        &self,
        sources: &[String],
        cap: usize,
    ) -> mpsc::Receiver<Vec<Listing>> {
        let (tx, rx) = mpsc::channel(16);

        let fetcher = Arc::clone(&self.fetcher);
        let config = self.config.clone();
        let state_tx = self.state_tx.clone();
        let sources = sources.to_vec();

        tokio::spawn(async move {
            state_tx.send_replace(PassState::Fetching);
            let rate = resolve_rate(
                fetcher.as_ref(),
                &config.rate_feed_url,
                config.fallback_rate,
            )
            .await;

            let mut units = fan_out_units(&fetcher, &config, &sources, cap, rate);
            state_tx.send_replace(PassState::Streaming);

            while let Some(joined) = units.join_next().await {
                match joined {
                    Ok((url, Ok(listings))) => {
                        info!(url = %url, count = listings.len(), "Source contributed");
                        // a dropped receiver does not stop the pass; the
                        // remaining units run to completion unobserved
                        let _ = tx.send(listings).await;
                    }
                    Ok((url, Err(e))) => {
                        warn!(url = %url, error = %e, "Source failed, skipping");
                    }
                    Err(e) => {
                        warn!(error = %e, "Aggregation unit panicked, skipping");
                    }
                }
            }

            state_tx.send_replace(PassState::Completed);
        });

        rx
    }

    async fn resolve_pass_rate(&self) -> ExchangeRate {
        resolve_rate(
            self.fetcher.as_ref(),
            &self.config.rate_feed_url,
            self.config.fallback_rate,
        )
        .await
    }

    fn fan_out(&self, sources: &[String], cap: usize, rate: ExchangeRate) -> JoinSet<UnitOutcome> {
        fan_out_units(&self.fetcher, &self.config, sources, cap, rate)
    }

    /// Final reshuffle plus optional truncation before the catalog is
    /// handed to consumers.
    fn publish(&self, catalog: &mut Vec<Listing>) {
        catalog.shuffle(&mut thread_rng());
        if self.config.catalog_limit > 0 {
            catalog.truncate(self.config.catalog_limit);
        }
    }
}

/// Launches one unit per source URL: fetch, extract inline, keep the
/// first `cap` records. The source list is shuffled first so capped
/// passes don't always favor the same sources.
fn fan_out_units(
    fetcher: &Arc<dyn PageSource>,
    config: &Config,
    sources: &[String],
    cap: usize,
    rate: ExchangeRate,
) -> JoinSet<UnitOutcome> {
    let mut shuffled = sources.to_vec();
    shuffled.shuffle(&mut thread_rng());

    info!(
        sources = shuffled.len(),
        cap,
        multiplier = rate.multiplier,
        "Starting aggregation pass"
    );

    let mut units = JoinSet::new();
    for url in shuffled {
        let fetcher = Arc::clone(fetcher);
        let base_url = config.base_url.clone();
        let multiplier = rate.multiplier;

        units.spawn(async move {
            let result = match fetcher.fetch_html(&url).await {
                Ok(html) => {
                    let mut listings = extract_listings(&html, multiplier, &base_url);
                    listings.truncate(cap);
                    Ok(listings)
                }
                Err(e) => Err(e),
            };
            (url, result)
        });
    }

    units
}
