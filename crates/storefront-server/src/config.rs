//! Server configuration

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use storefront_core::{cache::DEFAULT_TTL, WorkloadLimits};

use crate::profiling::ProfilingSettings;

/// Application name reported to the profiler when none is configured
pub const DEFAULT_APPLICATION_NAME: &str = "ecommerce-vercel-api";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server binding address
    pub bind: SocketAddr,

    /// Workload parameter defaults and ceilings
    pub workload: WorkloadConfig,

    /// Result cache and HTTP caching headers
    pub cache: CacheConfig,

    /// Continuous profiling agent
    pub profiling: ProfilingConfig,
}

/// Workload parameter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub default_size: usize,
    pub default_rounds: usize,
    pub max_size: usize,
    pub max_rounds: usize,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of an in-process cached result
    pub ttl_secs: u64,

    /// `s-maxage` advertised to shared caches
    pub shared_max_age_secs: u64,

    /// `stale-while-revalidate` window advertised to shared caches
    pub stale_while_revalidate_secs: u64,
}

/// Profiling agent configuration, normally supplied through `PYROSCOPE_*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingConfig {
    pub server_address: Option<String>,
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: Option<String>,
    pub application_name: String,
    pub service_tag: String,
    pub sample_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            workload: WorkloadConfig::default(),
            cache: CacheConfig::default(),
            profiling: ProfilingConfig::default(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        let limits = WorkloadLimits::default();
        Self {
            default_size: limits.default_size,
            default_rounds: limits.default_rounds,
            max_size: limits.max_size,
            max_rounds: limits.max_rounds,
        }
    }
}

impl WorkloadConfig {
    pub fn limits(&self) -> WorkloadLimits {
        WorkloadLimits {
            default_size: self.default_size,
            default_rounds: self.default_rounds,
            max_size: self.max_size,
            max_rounds: self.max_rounds,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            shared_max_age_secs: 60,
            stale_while_revalidate_secs: 120,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// `Cache-Control` value for responses that shared caches may keep
    pub fn shared_cache_control(&self) -> String {
        format!(
            "public, s-maxage={}, stale-while-revalidate={}",
            self.shared_max_age_secs, self.stale_while_revalidate_secs
        )
    }
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            server_address: None,
            basic_auth_user: None,
            basic_auth_password: None,
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            service_tag: "public-heavy-api".to_string(),
            sample_rate: 100,
        }
    }
}

impl ProfilingConfig {
    /// Overlay `PYROSCOPE_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay `PYROSCOPE_*` variables from an arbitrary lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(address) = get("PYROSCOPE_SERVER_ADDRESS") {
            self.server_address = Some(address);
        }
        if let Some(user) = get("PYROSCOPE_BASIC_AUTH_USER") {
            self.basic_auth_user = Some(user);
        }
        if let Some(password) = get("PYROSCOPE_BASIC_AUTH_PASSWORD") {
            self.basic_auth_password = Some(password);
        }
        if let Some(name) = get("PYROSCOPE_APPLICATION_NAME") {
            self.application_name = name;
        }
    }

    /// Agent settings, present only when the address and both credentials are set
    pub fn settings(&self) -> Option<ProfilingSettings> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Some(ProfilingSettings {
            server_address: present(&self.server_address)?,
            basic_auth_user: present(&self.basic_auth_user)?,
            basic_auth_password: present(&self.basic_auth_password)?,
            application_name: self.application_name.clone(),
            service_tag: self.service_tag.clone(),
            sample_rate: self.sample_rate,
        })
    }
}

impl ServerConfig {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("STOREFRONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to file
    pub fn to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}
