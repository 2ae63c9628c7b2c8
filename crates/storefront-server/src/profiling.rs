//! Continuous profiling hook
//!
//! The agent is started lazily by the first request that needs it and at most
//! once per hook. Concurrent callers all await the same attempt. A failed or
//! skipped start is logged and recorded, never returned to the caller.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ProfilingConfig;

/// Resolved agent settings. Only built when address and credentials exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilingSettings {
    pub server_address: String,
    pub basic_auth_user: String,
    pub basic_auth_password: String,
    pub application_name: String,
    pub service_tag: String,
    pub sample_rate: u32,
}

/// Profiling agent errors
#[derive(Error, Debug)]
pub enum ProfilingError {
    #[error("failed to build profiling agent: {0}")]
    Build(String),

    #[error("failed to start profiling agent: {0}")]
    Start(String),

    #[error("failed to stop profiling agent: {0}")]
    Stop(String),

    #[error("profiling agent task failed: {0}")]
    Join(String),
}

/// Outcome of the one-time start attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfilingStatus {
    /// Settings were incomplete; no agent was started
    Disabled,
    Running,
    Failed,
}

/// Something that can start a profiling agent
#[async_trait]
pub trait ProfilerAgent: Send + Sync {
    async fn start(
        &self,
        settings: &ProfilingSettings,
    ) -> Result<Box<dyn RunningProfiler>, ProfilingError>;
}

/// Handle to a started agent
pub trait RunningProfiler: Send {
    fn stop(self: Box<Self>) -> Result<(), ProfilingError>;
}

type RunningSlot = Arc<Mutex<Option<Box<dyn RunningProfiler>>>>;

/// One-time profiling initialization shared by all request handlers
pub struct ProfilingHook {
    settings: Option<ProfilingSettings>,
    agent: Arc<dyn ProfilerAgent>,
    /// The single start attempt, spawned on first use and awaited by every caller
    attempt: OnceLock<Shared<BoxFuture<'static, ProfilingStatus>>>,
    status: Arc<OnceLock<ProfilingStatus>>,
    running: RunningSlot,
}

impl ProfilingHook {
    pub fn new(config: &ProfilingConfig, agent: Arc<dyn ProfilerAgent>) -> Self {
        Self {
            settings: config.settings(),
            agent,
            attempt: OnceLock::new(),
            status: Arc::new(OnceLock::new()),
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Hook using the agent compiled into this build
    pub fn from_config(config: &ProfilingConfig) -> Self {
        Self::new(config, default_agent())
    }

    /// Hook that never starts anything
    pub fn disabled() -> Self {
        Self::new(&ProfilingConfig::default(), Arc::new(NoopProfiler))
    }

    /// Start the agent if this is the first call; otherwise return the recorded outcome.
    ///
    /// The attempt runs on its own task, so a caller dropped mid-start neither
    /// cancels it nor lets a later caller start a second agent.
    pub async fn ensure_started(&self) -> ProfilingStatus {
        self.attempt.get_or_init(|| self.launch()).clone().await
    }

    /// Recorded outcome, `None` until the first attempt completes
    pub fn status(&self) -> Option<ProfilingStatus> {
        self.status.get().copied()
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    /// Stop a running agent. Safe to call more than once.
    pub fn shutdown(&self) {
        if let Some(running) = self.running.lock().take() {
            match running.stop() {
                Ok(()) => info!("Profiling agent stopped"),
                Err(e) => warn!(error = %e, "Failed to stop profiling agent"),
            }
        }
    }

    fn launch(&self) -> Shared<BoxFuture<'static, ProfilingStatus>> {
        let settings = self.settings.clone();
        let agent = Arc::clone(&self.agent);
        let running = Arc::clone(&self.running);
        let status = Arc::clone(&self.status);

        let task = tokio::spawn({
            let status = Arc::clone(&status);
            async move {
                let outcome = initialize(settings, agent, running).await;
                let _ = status.set(outcome);
                outcome
            }
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Profiling agent start task failed");
                    let _ = status.set(ProfilingStatus::Failed);
                    ProfilingStatus::Failed
                }
            }
        }
        .boxed()
        .shared()
    }
}

async fn initialize(
    settings: Option<ProfilingSettings>,
    agent: Arc<dyn ProfilerAgent>,
    running: RunningSlot,
) -> ProfilingStatus {
    let Some(settings) = settings else {
        debug!("Profiling not configured, skipping agent start");
        return ProfilingStatus::Disabled;
    };

    match agent.start(&settings).await {
        Ok(handle) => {
            *running.lock() = Some(handle);
            info!(
                application = %settings.application_name,
                server = %settings.server_address,
                "Profiling agent started"
            );
            ProfilingStatus::Running
        }
        Err(e) => {
            error!(error = %e, "Profiling agent failed to start");
            ProfilingStatus::Failed
        }
    }
}

/// Agent used when no profiler backend is compiled in
pub struct NoopProfiler;

#[async_trait]
impl ProfilerAgent for NoopProfiler {
    async fn start(
        &self,
        _settings: &ProfilingSettings,
    ) -> Result<Box<dyn RunningProfiler>, ProfilingError> {
        Err(ProfilingError::Start(
            "this build has no profiler backend (enable the `pyroscope` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "pyroscope")]
pub fn default_agent() -> Arc<dyn ProfilerAgent> {
    Arc::new(pyroscope_agent::PyroscopeProfiler)
}

#[cfg(not(feature = "pyroscope"))]
pub fn default_agent() -> Arc<dyn ProfilerAgent> {
    Arc::new(NoopProfiler)
}

#[cfg(feature = "pyroscope")]
mod pyroscope_agent {
    use super::*;
    use pyroscope::pyroscope::{PyroscopeAgent, PyroscopeAgentRunning};
    use pyroscope_pprofrs::{pprof_backend, PprofConfig};

    /// Pyroscope agent sampling with pprof-rs
    pub struct PyroscopeProfiler;

    struct RunningPyroscope(PyroscopeAgent<PyroscopeAgentRunning>);

    impl RunningProfiler for RunningPyroscope {
        fn stop(self: Box<Self>) -> Result<(), ProfilingError> {
            let ready = self
                .0
                .stop()
                .map_err(|e| ProfilingError::Stop(e.to_string()))?;
            ready.shutdown();
            Ok(())
        }
    }

    #[async_trait]
    impl ProfilerAgent for PyroscopeProfiler {
        async fn start(
            &self,
            settings: &ProfilingSettings,
        ) -> Result<Box<dyn RunningProfiler>, ProfilingError> {
            let settings = settings.clone();

            // building the agent spawns threads and touches signal handlers
            tokio::task::spawn_blocking(move || {
                let backend = pprof_backend(PprofConfig::new().sample_rate(settings.sample_rate));

                let agent = PyroscopeAgent::builder(
                    settings.server_address.as_str(),
                    settings.application_name.as_str(),
                )
                .basic_auth(
                    settings.basic_auth_user.as_str(),
                    settings.basic_auth_password.as_str(),
                )
                .backend(backend)
                .tags(vec![("service", settings.service_tag.as_str())])
                .build()
                .map_err(|e| ProfilingError::Build(e.to_string()))?;

                let running = agent
                    .start()
                    .map_err(|e| ProfilingError::Start(e.to_string()))?;

                Ok(Box::new(RunningPyroscope(running)) as Box<dyn RunningProfiler>)
            })
            .await
            .map_err(|e| ProfilingError::Join(e.to_string()))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts start attempts and optionally fails them
    #[derive(Default)]
    struct CountingAgent {
        starts: AtomicUsize,
        stops: Arc<AtomicUsize>,
        fail: bool,
    }

    struct CountingHandle(Arc<AtomicUsize>);

    impl RunningProfiler for CountingHandle {
        fn stop(self: Box<Self>) -> Result<(), ProfilingError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl ProfilerAgent for CountingAgent {
        async fn start(
            &self,
            _settings: &ProfilingSettings,
        ) -> Result<Box<dyn RunningProfiler>, ProfilingError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                Err(ProfilingError::Start("connection refused".to_string()))
            } else {
                Ok(Box::new(CountingHandle(Arc::clone(&self.stops))))
            }
        }
    }

    fn configured() -> ProfilingConfig {
        ProfilingConfig {
            server_address: Some("https://profiles.example.com".to_string()),
            basic_auth_user: Some("user".to_string()),
            basic_auth_password: Some("secret".to_string()),
            ..ProfilingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_without_credentials() {
        let agent = Arc::new(CountingAgent::default());
        let hook = ProfilingHook::new(&ProfilingConfig::default(), agent.clone());

        assert_eq!(hook.status(), None);
        assert_eq!(hook.ensure_started().await, ProfilingStatus::Disabled);
        assert_eq!(hook.status(), Some(ProfilingStatus::Disabled));
        assert_eq!(agent.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_starts_once() {
        let agent = Arc::new(CountingAgent::default());
        let hook = ProfilingHook::new(&configured(), agent.clone());

        assert_eq!(hook.ensure_started().await, ProfilingStatus::Running);
        assert_eq!(hook.ensure_started().await, ProfilingStatus::Running);
        assert_eq!(agent.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_attempt() {
        let agent = Arc::new(CountingAgent::default());
        let hook = Arc::new(ProfilingHook::new(&configured(), agent.clone()));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let hook = Arc::clone(&hook);
            tasks.push(tokio::spawn(async move { hook.ensure_started().await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), ProfilingStatus::Running);
        }

        assert_eq!(agent.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_not_retried() {
        let agent = Arc::new(CountingAgent {
            fail: true,
            ..CountingAgent::default()
        });
        let hook = ProfilingHook::new(&configured(), agent.clone());

        assert_eq!(hook.ensure_started().await, ProfilingStatus::Failed);
        assert_eq!(hook.ensure_started().await, ProfilingStatus::Failed);
        assert_eq!(agent.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_running_agent_once() {
        let agent = Arc::new(CountingAgent::default());
        let hook = ProfilingHook::new(&configured(), agent.clone());
        hook.ensure_started().await;

        hook.shutdown();
        hook.shutdown();
        assert_eq!(agent.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_first_caller_does_not_restart_agent() {
        let agent = Arc::new(CountingAgent::default());
        let hook = ProfilingHook::new(&configured(), agent.clone());

        // the agent takes 20ms to start; give up on the first caller after 5ms
        let first = tokio::time::timeout(Duration::from_millis(5), hook.ensure_started()).await;
        assert!(first.is_err());
        assert_eq!(hook.status(), None);

        assert_eq!(hook.ensure_started().await, ProfilingStatus::Running);
        assert_eq!(agent.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_start_still_completes() {
        let agent = Arc::new(CountingAgent::default());
        let hook = ProfilingHook::new(&configured(), agent.clone());

        let _ = tokio::time::timeout(Duration::from_millis(5), hook.ensure_started()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(hook.status(), Some(ProfilingStatus::Running));
        hook.shutdown();
        assert_eq!(agent.stops.load(Ordering::SeqCst), 1);
        assert_eq!(agent.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_noop_agent_fails_softly() {
        let hook = ProfilingHook::new(&configured(), Arc::new(NoopProfiler));
        assert_eq!(hook.ensure_started().await, ProfilingStatus::Failed);
    }

    #[tokio::test]
    async fn test_disabled_hook() {
        let hook = ProfilingHook::disabled();
        assert!(!hook.is_configured());
        assert_eq!(hook.ensure_started().await, ProfilingStatus::Disabled);
    }
}
