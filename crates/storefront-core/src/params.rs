//! Workload request parameters and their validation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, Result};

/// Default element count when `size` is not supplied
pub const DEFAULT_SIZE: usize = 30_000;

/// Default pass count when `rounds` is not supplied
pub const DEFAULT_ROUNDS: usize = 80;

/// Which computation path to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Deliberately unoptimized baseline, never cached
    Before,
    /// Reduced computation whose results are cached
    After,
}

impl Mode {
    /// Only the literal `before` selects the baseline; anything else is `after`.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("before") => Mode::Before,
            _ => Mode::After,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Before => "before",
            Mode::After => "after",
        }
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self, Mode::After)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defaults and upper bounds applied while parsing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadLimits {
    pub default_size: usize,
    pub default_rounds: usize,
    pub max_size: usize,
    pub max_rounds: usize,
}

impl Default for WorkloadLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_SIZE,
            default_rounds: DEFAULT_ROUNDS,
            max_size: 1_000_000,
            max_rounds: 1_000,
        }
    }
}

/// A validated `(mode, size, rounds)` tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadParams {
    pub mode: Mode,
    pub size: usize,
    pub rounds: usize,
}

impl WorkloadParams {
    pub fn new(mode: Mode, size: usize, rounds: usize) -> Self {
        Self { mode, size, rounds }
    }

    /// Parse raw query values.
    ///
    /// Missing or blank `size`/`rounds` fall back to the configured defaults.
    /// Anything that is not a positive integer within the limits is rejected.
    pub fn from_query(
        mode: Option<&str>,
        size: Option<&str>,
        rounds: Option<&str>,
        limits: &WorkloadLimits,
    ) -> Result<Self> {
        let mode = Mode::from_query(mode);
        let size = parse_positive(
            "size",
            "INVALID_SIZE",
            size,
            limits.default_size,
            limits.max_size,
        )?;
        let rounds = parse_positive(
            "rounds",
            "INVALID_ROUNDS",
            rounds,
            limits.default_rounds,
            limits.max_rounds,
        )?;

        Ok(Self { mode, size, rounds })
    }

    /// Order-sensitive key, unique per tuple: `mode:size:rounds`
    pub fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.mode, self.size, self.rounds)
    }
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self::new(Mode::After, DEFAULT_SIZE, DEFAULT_ROUNDS)
    }
}

fn parse_positive(
    name: &str,
    code: &'static str,
    raw: Option<&str>,
    default: usize,
    max: usize,
) -> Result<usize> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };

    let valid_range = format!("1..={}", max);
    let value = raw.parse::<usize>().map_err(|_| {
        CoreError::invalid_parameter(
            code,
            format!("'{}' must be a positive integer, got '{}'", name, raw),
            format!("Pass {} as a whole number such as {}", name, default),
            name,
            raw,
            valid_range.clone(),
        )
    })?;

    if value == 0 || value > max {
        return Err(CoreError::invalid_parameter(
            code,
            format!("'{}' is out of range: {}", name, value),
            format!("Keep {} between 1 and {}", name, max),
            name,
            raw,
            valid_range,
        ));
    }

    Ok(value)
}
