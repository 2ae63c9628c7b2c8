//! Storefront Server - load-testing and profiling demo API
//!
//! This crate serves the storefront's demonstration endpoints over HTTP: a
//! compute-and-cache endpoint that contrasts an unoptimized and an optimized
//! workload, a bearer-token probe, and health checks. A continuous-profiling
//! agent can be attached once per process from `PYROSCOPE_*` settings.

/// Version of the storefront-server crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod error;
pub mod handlers;
pub mod profiling;
pub mod server;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{create_router, ServerState, StorefrontServer};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{config::*, error::*, handlers::*, profiling::*, server::*};
}
