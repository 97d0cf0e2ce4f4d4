pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::Cli;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Name of the config file in the global config dir and the working dir.
const CONFIG_FILE_NAME: &str = "delve.toml";

/// Load configuration by merging global, local, environment, and CLI sources.
/// Precedence: CLI > environment > local config > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply).
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let args = cli.command.args();

    // Layer 1: Global config (~/.config/delve/delve.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Local config (--config path or ./delve.toml)
    let local_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let local = match load_toml_file(&local_path) {
        Ok(partial) => partial.unwrap_or_default(),
        // An explicitly requested file must exist and parse.
        Err(e) if args.config.is_some() => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Ignoring config: {e}");
            PartialConfig::default()
        }
    };

    // Layer 3: Environment (.env already loaded by main)
    let env = env_to_partial(|key| std::env::var(key).ok());

    // Layer 4: CLI args
    let cli_partial = cli_to_partial(cli);

    let config = cli_partial
        .with_fallback(env)
        .with_fallback(local)
        .with_fallback(global)
        .finalize();

    Ok(config)
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found or unreadable.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => match load_toml_file(&p) {
            Ok(partial) => partial.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Ignoring global config: {e}");
                PartialConfig::default()
            }
        },
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns `Ok(None)` when the file does not exist.
pub fn load_toml_file(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let config_file =
                toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            tracing::info!("Loaded config from {}", path.display());
            Ok(Some(config_file.to_partial()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(None)
        }
        Err(e) => Err(ConfigError::IoError(e)),
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/delve/delve.toml
/// macOS: ~/Library/Application Support/delve/delve.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "delve")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Read the FIRECRAWL_* and DELVE_* variables through `lookup`.
///
/// Unparseable numeric or enum values are logged and skipped.
pub fn env_to_partial(lookup: impl Fn(&str) -> Option<String>) -> PartialConfig {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    PartialConfig {
        model: get("DELVE_MODEL"),
        search_provider: get("DELVE_SEARCH_PROVIDER").and_then(|v| {
            parse_env("DELVE_SEARCH_PROVIDER", &v, |s| {
                <SearchProviderKind as clap::ValueEnum>::from_str(s, true)
            })
        }),
        firecrawl_api_key: get("FIRECRAWL_KEY"),
        firecrawl_base_url: get("FIRECRAWL_BASE_URL"),
        concurrency_limit: get("FIRECRAWL_CONCURRENCY").and_then(|v| {
            parse_env("FIRECRAWL_CONCURRENCY", &v, |s| {
                s.parse::<usize>().map_err(|e| e.to_string())
            })
        }),
        ..Default::default()
    }
}

fn parse_env<T>(
    key: &str,
    value: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Option<T> {
    match parse(value.trim()) {
        Ok(v) => Some(v),
        Err(message) => {
            let e = ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            };
            tracing::warn!("Ignoring environment variable: {e}");
            None
        }
    }
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    let args = cli.command.args();
    PartialConfig {
        model: args.model.clone(),
        search_provider: args.provider,
        search_timeout_secs: args.timeout,
        content_format: args.format,
        concurrency_limit: args.concurrency,
        ..Default::default()
    }
}
