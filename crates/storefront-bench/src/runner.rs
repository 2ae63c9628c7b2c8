//! Load runner and result persistence

use crate::{LoadProfile, LoadTestSummary, Sample, Target};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use storefront_core::Mode;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

/// Drives one target at the profile's arrival rate
pub struct LoadRunner {
    client: reqwest::Client,
    profile: LoadProfile,
}

impl LoadRunner {
    pub fn new(profile: LoadProfile) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(profile.request_timeout)
            .build()?;
        Ok(Self { client, profile })
    }

    pub fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    /// Run the full schedule against `target` and summarize it.
    ///
    /// Iterations are started on a fixed interval whether or not earlier
    /// ones finished. When `max_in_flight` requests are outstanding the
    /// iteration is dropped and counted instead of queued.
    pub async fn run(&self, target: &Target) -> anyhow::Result<LoadTestSummary> {
        let planned = self.profile.planned_iterations();
        let url = target.url();
        info!(
            "Starting load test: {} at {}/{:?} for {:?} ({} iterations)",
            target.label(),
            self.profile.rate,
            self.profile.time_unit,
            self.profile.duration,
            planned
        );

        let in_flight = Arc::new(Semaphore::new(self.profile.max_in_flight.max(1)));
        let mut ticker = tokio::time::interval(self.profile.interval());
        let mut tasks = JoinSet::new();
        let mut dropped = 0u64;

        for iteration in 0..planned {
            ticker.tick().await;

            let permit = match in_flight.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    debug!("Iteration {} dropped: {} requests in flight", iteration, self.profile.max_in_flight);
                    dropped += 1;
                    continue;
                }
            };

            let client = self.client.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let sample = send_request(&client, &url).await;
                drop(permit);
                sample
            });
        }

        let mut samples = Vec::with_capacity(planned as usize);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!("Load test task failed: {}", e),
            }
        }

        if dropped > 0 {
            warn!("{} iterations dropped at the in-flight ceiling", dropped);
        }

        let summary = LoadTestSummary::from_samples(target.label(), target.params.mode, &samples, dropped);
        info!(
            "Load test {} completed: {} requests, p95 = {:.1}ms, checks passed = {:.1}%",
            summary.name,
            summary.requests,
            summary.p95_ms,
            summary.check_rate * 100.0
        );
        Ok(summary)
    }
}

/// One GET against the endpoint, timed from send to full body
async fn send_request(client: &reqwest::Client, url: &str) -> Sample {
    let start = Instant::now();
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let cached = match response.json::<serde_json::Value>().await {
                Ok(body) => body["cached"].as_bool().unwrap_or(false),
                Err(e) => {
                    debug!("Unreadable response body from {}: {}", url, e);
                    false
                }
            };
            Sample {
                latency: start.elapsed(),
                status: Some(status),
                cached,
            }
        }
        Err(e) => {
            debug!("Request to {} failed: {}", url, e);
            Sample {
                latency: start.elapsed(),
                status: None,
                cached: false,
            }
        }
    }
}

/// Write `results_<ts>.json` and `report_<ts>.md` into `output_dir`
pub fn save_results(
    output_dir: impl AsRef<Path>,
    summaries: &[LoadTestSummary],
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    let json_path = output_dir.join(format!("results_{}.json", timestamp));
    std::fs::write(&json_path, serde_json::to_string_pretty(summaries)?)?;
    info!("Results saved to {:?}", json_path);

    let md_path = output_dir.join(format!("report_{}.md", timestamp));
    std::fs::write(&md_path, generate_markdown_report(summaries))?;
    info!("Report saved to {:?}", md_path);

    Ok((json_path, md_path))
}

/// Markdown table of the summaries, with a before/after comparison when both are present
pub fn generate_markdown_report(summaries: &[LoadTestSummary]) -> String {
    let mut report = String::new();

    report.push_str(&format!(
        "# Storefront Load Test Report\n\nGenerated: {}\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    report.push_str("## Results\n\n");
    report.push_str("| Run | Requests | Passed | Failed | Dropped | Cached | Min | Mean | p95 | Max |\n");
    report.push_str("|-----|----------|--------|--------|---------|--------|-----|------|-----|-----|\n");

    for summary in summaries {
        report.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {:.2}ms | {:.2}ms | {:.2}ms | {:.2}ms |\n",
            summary.name,
            summary.requests,
            summary.succeeded,
            summary.failed,
            summary.dropped,
            summary.cached,
            summary.min_ms,
            summary.mean_ms,
            summary.p95_ms,
            summary.max_ms,
        ));
    }

    if let Some(speedup) = p95_speedup(summaries) {
        report.push_str(&format!("\n## Comparison\n\np95 before / after: {:.2}x\n", speedup));
    }

    report
}

/// Ratio of the first `before` run's p95 to the first `after` run's p95
pub fn p95_speedup(summaries: &[LoadTestSummary]) -> Option<f64> {
    let before = summaries.iter().find(|s| s.mode == Mode::Before)?;
    let after = summaries.iter().find(|s| s.mode == Mode::After)?;
    (after.p95_ms > 0.0).then(|| before.p95_ms / after.p95_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(mode: Mode, p95_ms: f64) -> LoadTestSummary {
        LoadTestSummary {
            name: mode.to_string(),
            mode,
            requests: 10,
            succeeded: 10,
            failed: 0,
            dropped: 0,
            cached: 0,
            min_ms: 1.0,
            mean_ms: p95_ms / 2.0,
            p95_ms,
            max_ms: p95_ms,
            check_rate: 1.0,
        }
    }

    #[test]
    fn test_p95_speedup() {
        let summaries = vec![summary(Mode::Before, 120.0), summary(Mode::After, 4.0)];
        assert_eq!(p95_speedup(&summaries), Some(30.0));
        assert_eq!(p95_speedup(&summaries[..1]), None);
        assert_eq!(p95_speedup(&[summary(Mode::Before, 1.0), summary(Mode::After, 0.0)]), None);
    }

    #[test]
    fn test_report_lists_every_run() {
        let report = generate_markdown_report(&[summary(Mode::Before, 120.0), summary(Mode::After, 4.0)]);
        assert!(report.starts_with("# Storefront Load Test Report"));
        assert!(report.contains("| before | 10 |"));
        assert!(report.contains("| after | 10 |"));
        assert!(report.contains("30.00x"));
    }

    #[test]
    fn test_runner_builds_client() {
        let runner = LoadRunner::new(LoadProfile::default()).unwrap();
        assert_eq!(runner.profile().rate, 10);
    }
}
