//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Cutoff used when none is configured (2024-10-20 19:11:36 UTC).
pub const DEFAULT_SEARCH_DATE: i64 = 1_729_451_496_000;

/// Environment variable holding the API access token.
pub const API_KEY_ENV: &str = "LAUNCHDARKLY_API_KEY";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// API access token.
    pub api_key: Option<String>,
    /// Origin of the API and web UI.
    pub base_url: String,
    /// Project key to search, or `*` for all projects.
    pub project: String,
    /// Environment whose flag changes are reported.
    pub environment: String,
    /// Only audit entries after this epoch-millisecond timestamp are read.
    pub search_date: i64,
    /// Entries requested per page.
    pub page_limit: u32,
    /// Directory CSV reports are written into.
    pub output_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("environment", &self.environment)
            .field("search_date", &self.search_date)
            .field("page_limit", &self.page_limit)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ff_client::DEFAULT_BASE_URL.to_string(),
            project: "*".to_string(),
            environment: "production".to_string(),
            search_date: DEFAULT_SEARCH_DATE,
            page_limit: ff_client::DEFAULT_PAGE_LIMIT,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FFAUDIT_*)
        figment = figment.merge(Env::prefixed("FFAUDIT_"));
        figment = figment.merge(Env::raw().only(&[API_KEY_ENV]).map(|_| "api_key".into()));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ffaudit.
///
/// On Linux: `~/.config/ffaudit`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ffaudit"))
}
