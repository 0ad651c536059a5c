use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the monitoring REST API.
pub const DEFAULT_BASE_URL: &str = "https://webapi.teamviewer.com/api/v1";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Query web monitoring telemetry and print it as result frames
#[derive(Parser, Debug, Clone)]
#[command(
    name = "webmon",
    about = "Query web monitoring telemetry and print it as result frames",
    version
)]
pub struct Settings {
    /// API token forwarded as bearer token
    #[arg(long, env = "WEBMON_API_TOKEN", hide_env_values = true, global = true)]
    pub api_token: Option<String>,

    /// Base URL of the monitoring API
    #[arg(long, default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Request timeout in seconds (1-300)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=300), global = true)]
    pub timeout_secs: u64,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"], global = true)]
    pub log_level: String,

    /// Log file path (stderr when absent)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Persist token, base URL and timeout for later runs
    #[arg(long, global = true)]
    pub save: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do once the settings are resolved.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one query, or a batch of queries read from a JSON file
    Query(QueryArgs),
    /// Check that the API token is accepted
    Health,
    /// Call a resource path, e.g. `rm/webmonitoring/monitors`
    Resource {
        /// Resource path
        path: String,
    },
}

/// Arguments of the `query` subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Product the query targets
    #[arg(long, default_value = "webmonitoring")]
    pub product: String,

    /// Query type: monitorresults, alarms or monitors
    #[arg(long = "type", default_value = "monitors")]
    pub query_type: String,

    /// Monitor id (required for monitorresults)
    #[arg(long, default_value = "")]
    pub monitor_id: String,

    /// Start of the time range (RFC 3339); defaults to 24 hours before `--to`
    #[arg(long)]
    pub from: Option<String>,

    /// End of the time range (RFC 3339); defaults to now
    #[arg(long)]
    pub to: Option<String>,

    /// Reference id keying the output
    #[arg(long, default_value = "A")]
    pub ref_id: String,

    /// Maximum data points hint
    #[arg(long, default_value_t = 0)]
    pub max_data_points: i64,

    /// JSON file holding a batch of queries (overrides the single-query flags)
    #[arg(long)]
    pub batch: Option<PathBuf>,
}

/// HTTP client configuration shared read-only by all queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// ── StoredConfig ───────────────────────────────────────────────────────────────

/// Persisted configuration saved to `~/.webmon/config.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct StoredConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl StoredConfig {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".webmon").join("config.json")
    }

    /// Load the config from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            Self::default()
        })
    }

    /// Atomically write the config to an explicit path.
    ///
    /// The file holds the API token, so on unix it is readable by the owner
    /// only (`0600`).
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        use std::io::Write;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        // A leftover temp file would keep its old mode.
        if tmp.exists() {
            std::fs::remove_file(&tmp)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and fill unset values from the stored config.
    pub fn load() -> Self {
        Self::load_impl(std::env::args_os().collect(), &StoredConfig::config_path())
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_impl(args: Vec<std::ffi::OsString>, config_path: &std::path::Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = StoredConfig::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear stored config");
            }
            return settings.resolve_debug();
        }

        let stored = StoredConfig::load_from(config_path);

        // Command line and environment always win over the stored file.
        if settings.api_token.is_none() {
            settings.api_token = stored.api_token;
        }
        if !is_arg_given(&matches, "base_url") {
            if let Some(v) = stored.base_url {
                settings.base_url = v;
            }
        }
        if !is_arg_given(&matches, "timeout_secs") {
            if let Some(v) = stored.timeout_secs {
                settings.timeout_secs = v;
            }
        }

        if settings.save {
            let params = StoredConfig::from(&settings);
            if let Err(e) = params.save_to(config_path) {
                tracing::warn!(error = %e, "could not save config");
            }
        }

        settings.resolve_debug()
    }

    /// Bearer token, or an empty string when none is configured.
    pub fn token(&self) -> &str {
        self.api_token.as_deref().unwrap_or_default()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// `--debug` overrides the log level.
    fn resolve_debug(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for StoredConfig {
    fn from(s: &Settings) -> Self {
        StoredConfig {
            api_token: s.api_token.clone().filter(|t| !t.is_empty()),
            base_url: Some(s.base_url.clone()),
            timeout_secs: Some(s.timeout_secs),
        }
    }
}

/// Returns `true` when `name` was supplied on the command line or through
/// its environment variable (not via default value).
fn is_arg_given(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
