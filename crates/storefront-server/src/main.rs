//! Storefront Server - load-testing and profiling demo API
//!
//! This binary serves the compute-and-cache demonstration endpoint, the
//! bearer-token probe and health checks.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_server::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    server::{run_server, StorefrontServer},
};

/// Command line arguments
#[derive(Parser)]
#[command(
    name = "storefront-server",
    version,
    about = "Storefront demo API with result caching and continuous profiling",
    long_about = "Serves /api/public-heavy, a CPU-bound endpoint with an unoptimized ('before') and a cached, optimized ('after') mode, plus /api/private-user and health checks. Set PYROSCOPE_SERVER_ADDRESS, PYROSCOPE_BASIC_AUTH_USER and PYROSCOPE_BASIC_AUTH_PASSWORD to attach a profiling agent."
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address (overrides the configuration file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Start,
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "storefront-server.toml")]
        output: PathBuf,
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show server information
    Info,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    let args = Args::parse();

    init_logging(&args)?;

    match args.command {
        Some(Commands::Start) | None => start_server(args.config, args.bind).await,
        Some(Commands::Config { ref output, force }) => generate_config(output, force),
        Some(Commands::Validate { ref config }) => validate_config(config),
        Some(Commands::Info) => {
            show_info();
            Ok(())
        }
    }
}

/// Initialize logging based on command line arguments
fn init_logging(args: &Args) -> ServerResult<()> {
    let log_level = args
        .log_level
        .parse::<Level>()
        .map_err(|_| ServerError::Config(format!("Invalid log level: {}", args.log_level)))?;

    let mut env_filter = EnvFilter::from_default_env();
    for target in ["storefront_server", "storefront_core", "tower_http"] {
        let directive = format!("{}={}", target, log_level)
            .parse()
            .map_err(|e| ServerError::Config(format!("Invalid log directive: {}", e)))?;
        env_filter = env_filter.add_directive(directive);
    }

    if args.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().pretty())
            .with(env_filter)
            .init();
    }

    Ok(())
}

/// Load the configuration file (or defaults), then apply overrides
fn load_config(config_path: Option<PathBuf>, bind: Option<String>) -> ServerResult<ServerConfig> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            ServerConfig::from_file(&path)
                .map_err(|e| ServerError::Config(format!("Failed to load config: {}", e)))?
        }
        None => {
            info!("Using default configuration");
            ServerConfig::default()
        }
    };

    if let Some(bind) = bind {
        config.bind = bind
            .parse()
            .map_err(|e| ServerError::Config(format!("Invalid bind address: {}", e)))?;
    }

    config.profiling.apply_env();
    Ok(config)
}

/// Start the server
async fn start_server(config_path: Option<PathBuf>, bind: Option<String>) -> ServerResult<()> {
    info!("Starting Storefront Server v{}", storefront_server::VERSION);

    let config = load_config(config_path, bind)?;
    let server = StorefrontServer::new(config);

    info!("Server configuration:");
    info!("  Bind address: {}", server.config().bind);
    info!("  Cache TTL: {}s", server.config().cache.ttl_secs);
    info!(
        "  Workload defaults: size={} rounds={}",
        server.config().workload.default_size,
        server.config().workload.default_rounds
    );
    info!(
        "  Profiling configured: {}",
        server.state().profiling.is_configured()
    );

    run_server(server).await
}

/// Generate a default configuration file
fn generate_config(output: &Path, force: bool) -> ServerResult<()> {
    if output.exists() && !force {
        error!("Configuration file already exists: {:?}", output);
        error!("Use --force to overwrite");
        return Err(ServerError::Config(
            "Configuration file already exists".to_string(),
        ));
    }

    ServerConfig::default()
        .to_file(output)
        .map_err(|e| ServerError::Config(format!("Failed to write config: {}", e)))?;

    info!("Generated default configuration file: {:?}", output);
    Ok(())
}

/// Validate a configuration file
fn validate_config(config_path: &Path) -> ServerResult<()> {
    info!("Validating configuration file: {:?}", config_path);

    match ServerConfig::from_file(config_path) {
        Ok(config) => {
            info!("Configuration is valid");
            info!("  Bind address: {}", config.bind);
            info!("  Cache TTL: {}s", config.cache.ttl_secs);
            info!(
                "  Workload ceilings: size<={} rounds<={}",
                config.workload.max_size, config.workload.max_rounds
            );
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            Err(ServerError::Config(format!("Invalid configuration: {}", e)))
        }
    }
}

/// Show server information
fn show_info() {
    println!("Storefront Server v{}", storefront_server::VERSION);
    println!("Demo API for load-testing and continuous profiling");
    println!();
    println!("Endpoints:");
    println!("  GET /api/public-heavy?mode=before|after&size=N&rounds=N");
    println!("  GET /api/private-user     (requires 'Authorization: Bearer <token>')");
    println!("  GET /health, /health/ready, /health/live");
    println!();
    println!("Profiling environment:");
    println!("  PYROSCOPE_SERVER_ADDRESS, PYROSCOPE_BASIC_AUTH_USER,");
    println!("  PYROSCOPE_BASIC_AUTH_PASSWORD, PYROSCOPE_APPLICATION_NAME");
    println!();
    println!("Usage:");
    println!("  storefront-server                         # Start with default config");
    println!("  storefront-server -c config.toml          # Start with custom config");
    println!("  storefront-server config                  # Generate default config");
    println!("  storefront-server validate config.toml    # Validate config file");
}
