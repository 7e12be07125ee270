//! Configuration management for the Flight storage server.
//!
//! Configuration is loaded from, in increasing order of precedence:
//! 1. Default configuration (embedded in binary)
//! 2. User-specified configuration file (`--config`)
//! 3. Environment variables (prefixed with `COOKBOOK_`, nested keys joined
//!    with `__`, e.g. `COOKBOOK_SERVER__PORT`)
//! 4. Command-line arguments

use clap::Parser;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Command-line arguments parser.
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server host address
    #[arg(long, env = "COOKBOOK_SERVER_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(long, env = "COOKBOOK_SERVER_PORT")]
    port: Option<u16>,

    /// Directory holding the stored Parquet datasets
    #[arg(long, env = "COOKBOOK_STORAGE_ROOT")]
    root: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long)]
    log_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Network interface and port for the Flight service.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory with one Parquet file per dataset
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives
    pub filter: String,
}

impl Settings {
    /// Loads configuration from all available sources.
    pub fn new(cli: CliArgs) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));

        if let Some(ref config_path) = cli.config {
            builder = builder.add_source(config::File::from(config_path.clone()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("COOKBOOK")
                .prefix_separator("_")
                .separator("__"),
        );

        if let Some(ref host) = cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(ref root) = cli.root {
            builder = builder.set_override("storage.root", root.to_string_lossy().as_ref())?;
        }
        if let Some(ref filter) = cli.log_filter {
            builder = builder.set_override("logging.filter", filter.as_str())?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A subscriber may already be installed by an embedding program.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
