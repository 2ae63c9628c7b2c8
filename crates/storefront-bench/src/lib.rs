//! Storefront load-testing framework
//!
//! This crate drives the demo API at a constant arrival rate and summarizes
//! what it saw:
//! - fixed-rate request scheduling with a cap on in-flight requests
//! - status checks and cache-hit accounting per request
//! - latency summaries, JSON results and Markdown reports

use serde::{Deserialize, Serialize};
use std::time::Duration;
use storefront_core::{Mode, WorkloadParams};

pub mod runner;

/// Constant-arrival-rate schedule
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    /// Iterations started per `time_unit`
    pub rate: u32,
    pub time_unit: Duration,
    /// Total run time
    pub duration: Duration,
    /// Requests allowed in flight before iterations are dropped
    pub max_in_flight: usize,
    pub request_timeout: Duration,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            rate: 10,
            time_unit: Duration::from_secs(1),
            duration: Duration::from_secs(120),
            max_in_flight: 60,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl LoadProfile {
    /// Gap between two iteration starts
    pub fn interval(&self) -> Duration {
        self.time_unit / self.rate.max(1)
    }

    /// Number of iterations the schedule starts in total
    pub fn planned_iterations(&self) -> u64 {
        let per_unit = self.rate as f64 / self.time_unit.as_secs_f64();
        (per_unit * self.duration.as_secs_f64()).floor() as u64
    }
}

/// Endpoint and workload parameters to hit
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub base_url: String,
    pub params: WorkloadParams,
}

impl Target {
    pub fn new(base_url: impl Into<String>, params: WorkloadParams) -> Self {
        Self {
            base_url: base_url.into(),
            params,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}/api/public-heavy?mode={}&size={}&rounds={}",
            self.base_url.trim_end_matches('/'),
            self.params.mode,
            self.params.size,
            self.params.rounds
        )
    }

    pub fn label(&self) -> String {
        format!(
            "{} (size={}, rounds={})",
            self.params.mode, self.params.size, self.params.rounds
        )
    }
}

/// One completed request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub latency: Duration,
    /// `None` when the request never produced a response
    pub status: Option<u16>,
    /// Response body reported `cached: true`
    pub cached: bool,
}

impl Sample {
    /// The check every iteration asserts: status is 200
    pub fn passed(&self) -> bool {
        self.status == Some(200)
    }
}

/// Aggregated result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestSummary {
    pub name: String,
    pub mode: Mode,
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dropped: u64,
    pub cached: usize,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    /// Fraction of completed requests whose check passed
    pub check_rate: f64,
}

impl LoadTestSummary {
    pub fn from_samples(name: impl Into<String>, mode: Mode, samples: &[Sample], dropped: u64) -> Self {
        let mut latencies: Vec<f64> = samples
            .iter()
            .map(|s| s.latency.as_nanos() as f64 / 1_000_000.0)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let requests = samples.len();
        let succeeded = samples.iter().filter(|s| s.passed()).count();
        let mean_ms = if requests == 0 {
            0.0
        } else {
            latencies.iter().sum::<f64>() / requests as f64
        };

        Self {
            name: name.into(),
            mode,
            requests,
            succeeded,
            failed: requests - succeeded,
            dropped,
            cached: samples.iter().filter(|s| s.cached).count(),
            min_ms: latencies.first().copied().unwrap_or(0.0),
            mean_ms,
            p95_ms: percentile(&latencies, 95.0),
            max_ms: latencies.last().copied().unwrap_or(0.0),
            check_rate: if requests == 0 {
                0.0
            } else {
                succeeded as f64 / requests as f64
            },
        }
    }
}

/// Nearest-rank percentile of an ascending slice
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
