//! Storefront Core - workload simulation and result caching
//!
//! This crate holds the logic behind the storefront's load-testing endpoint:
//! a deterministic CPU-bound workload with an unoptimized and an optimized
//! path, the request parameters that drive it, and the TTL cache used to
//! memoize optimized results.

pub mod cache;
pub mod params;
pub mod workload;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Request parameter validation errors
    #[error("Invalid input [{code}]: {message}\nSuggestion: {suggestion}")]
    InvalidInput {
        code: &'static str,
        message: String,
        suggestion: String,
        parameter_name: Option<String>,
        value: Option<String>,
        valid_range: Option<String>,
    },

    /// Text round-trip failures inside the workload
    #[error("Serialization error [{code}]: {message}")]
    Serialization {
        code: &'static str,
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid input error with parameter validation details
    pub fn invalid_parameter<S1, S2, S3, S4, S5>(
        code: &'static str,
        message: S1,
        suggestion: S2,
        param_name: S3,
        value: S4,
        valid_range: S5,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
        S5: Into<String>,
    {
        Self::InvalidInput {
            code,
            message: message.into(),
            suggestion: suggestion.into(),
            parameter_name: Some(param_name.into()),
            value: Some(value.into()),
            valid_range: Some(valid_range.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S, source: serde_json::Error) -> Self {
        Self::Serialization {
            code: "SERIALIZATION_FAILED",
            message: message.into(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { code, .. } => code,
            Self::Serialization { code, .. } => code,
        }
    }

    /// Name of the offending parameter, if any
    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { parameter_name, .. } => parameter_name.as_deref(),
            _ => None,
        }
    }
}

pub use cache::ResultCache;
pub use params::{Mode, WorkloadLimits, WorkloadParams};
pub use workload::{heavy_compute, optimized_compute, simulate};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        cache::ResultCache,
        params::{Mode, WorkloadLimits, WorkloadParams},
        workload::simulate,
        CoreError, Result,
    };
}
