//! Repeated lookups that show cache and single-flight behaviour.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratecache_fx::RateLookupService;
use tracing::{info, warn};

use crate::output::{Observation, Printer};

const MAX_SAMPLES: usize = 10_000;

/// What `watch` looks up and how often.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    pub interval: Duration,
    /// Stop after this many lookups; `None` runs until interrupted.
    pub count: Option<u64>,
    /// Single code to look up instead of the whole table.
    pub code: Option<String>,
}

/// Outcome counters for a watch run.
#[derive(Debug, Clone, Default)]
pub struct WatchSummary {
    pub lookups: u64,
    pub failures: u64,
    pub cache_hits: u64,
    latency_samples: VecDeque<u64>,
}

impl WatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, latency_us: u64, cache_hit: bool) {
        self.lookups += 1;
        if cache_hit {
            self.cache_hits += 1;
        }

        if self.latency_samples.len() >= MAX_SAMPLES {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_us);
    }

    pub fn record_failure(&mut self) {
        self.lookups += 1;
        self.failures += 1;
    }

    /// Average latency of successful lookups in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }
}

/// Run lookups on `plan.interval` until the count is reached or Ctrl+C.
pub async fn run(
    service: &RateLookupService,
    plan: &WatchPlan,
    printer: &Printer,
) -> anyhow::Result<WatchSummary> {
    let mut summary = WatchSummary::new();
    let mut ticker = tokio::time::interval(plan.interval.max(Duration::from_millis(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(interval = ?plan.interval, count = ?plan.count, "Watching rates");

    while plan.count.map_or(true, |count| summary.lookups < count) {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        let hits_before = service.stats().cache_hits;
        let started = Instant::now();
        let outcome = service.latest().await;
        let latency_us = started.elapsed().as_micros() as u64;
        let cache_hit = service.stats().cache_hits > hits_before;

        let table = match outcome {
            Ok(table) => table,
            Err(e) => {
                summary.record_failure();
                warn!(error = %e, code = e.error_code(), "Lookup failed");
                continue;
            }
        };

        let (code, rate) = match &plan.code {
            Some(code) => match table.rate(code) {
                Some(rate) => (Some(code.trim().to_uppercase()), Some(rate)),
                None => {
                    summary.record_failure();
                    warn!(base = %table.base, code = %code, "Rate not found");
                    continue;
                }
            },
            None => (None, None),
        };

        summary.record_success(latency_us, cache_hit);
        printer.observation(&Observation {
            seq: summary.lookups,
            cache_hit,
            latency_us,
            base: table.base.clone(),
            rates: table.len(),
            code,
            rate,
        })?;
    }

    Ok(summary)
}
