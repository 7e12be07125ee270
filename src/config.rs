use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings for a full cookbook run.
#[derive(Debug, Deserialize)]
pub struct CookbookSettings {
    pub output: OutputSettings,
    pub flight: FlightSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize)]
pub struct OutputSettings {
    /// Arrow IPC stream file the recipe outputs are merged into
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct FlightSettings {
    /// Interface the Flight recipes bind their server to
    pub host: String,
    /// Scratch directory for datasets uploaded by the Flight recipes
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    pub filter: String,
}

impl CookbookSettings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_dir(Path::new("config"))
    }

    /// Loads `default.toml` and `local.toml` from `config_dir` (both optional),
    /// then `RECIPES_` environment variables, e.g. `RECIPES_OUTPUT__PATH`.
    pub fn from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let builder = Config::builder()
            .set_default("output.path", defaults.output.path.to_string_lossy().as_ref())?
            .set_default("flight.host", defaults.flight.host)?
            .set_default("flight.root", defaults.flight.root.to_string_lossy().as_ref())?
            .set_default("logging.filter", defaults.logging.filter)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("RECIPES")
                    .prefix_separator("_")
                    .separator("__"),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for CookbookSettings {
    fn default() -> Self {
        Self {
            output: OutputSettings {
                path: PathBuf::from("recipes_out.arrow"),
            },
            flight: FlightSettings {
                host: "127.0.0.1".to_string(),
                root: PathBuf::from("./flight_datasets"),
            },
            logging: LoggingSettings {
                filter: "info".to_string(),
            },
        }
    }
}
