//! Desired state configuration
//!
//! `sync` applies `status`, `groups` and `users`. `label` and `settings` are
//! never written to the directory; `show` compares them against the remote
//! application and reports any drift.
//!
//! ```toml
//! org_url = "https://example.okta.com"
//! api_token_env = "APPSYNC_API_TOKEN"
//! parallelism = 4
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//!
//! [[apps]]
//! id = "0oa1"
//! label = "Team Wiki"
//! status = "ACTIVE"
//! groups = ["00g1"]
//!
//! [[apps.users]]
//! id = "00u1"
//! username = "alice"
//!
//! [apps.settings]
//! url = "https://wiki.example.com"
//! ```

use crate::paths;
use anyhow::{Context, Result, bail};
use membership::{
    AppSettings, AppStatus, DEFAULT_PARALLELISM, DesiredApp, DesiredMembership, RetryConfig,
    UserSpec,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TOKEN_ENV: &str = "APPSYNC_API_TOKEN";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub org_url: String,
    #[serde(default = "default_token_env")]
    pub api_token_env: String,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub retry: Option<RetrySettings>,
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub id: String,
    /// Compared by `show`, never written
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub status: AppStatus,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub users: Vec<UserSpec>,
    /// Compared by `show`, never written
    #[serde(default)]
    pub settings: AppSettings,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Config {
    /// Load from `--config` or the default location
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let path = paths::config_file(explicit)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;
        config.validate()?;
        log::debug!(
            "Loaded {} application(s) from {}",
            config.apps.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.org_url.trim().is_empty() {
            bail!("org_url must not be empty");
        }
        if self.parallelism < 1 {
            bail!("parallelism must be at least 1");
        }

        let mut seen = HashSet::new();
        for app in &self.apps {
            app.validate()?;
            if !seen.insert(app.id.as_str()) {
                bail!("Application {} is declared more than once", app.id);
            }
        }
        Ok(())
    }

    /// Find an app by id or label
    pub fn find_app(&self, key: &str) -> Option<&AppConfig> {
        self.apps
            .iter()
            .find(|a| a.id == key || a.label.as_deref() == Some(key))
    }

    /// Apps selected by an optional id or label filter
    pub fn select_apps(&self, filter: Option<&str>) -> Result<Vec<&AppConfig>> {
        match filter {
            Some(key) => {
                let app = self
                    .find_app(key)
                    .with_context(|| format!("Application '{key}' not found in config"))?;
                Ok(vec![app])
            }
            None => Ok(self.apps.iter().collect()),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        match &self.retry {
            Some(r) => RetryConfig::new(r.max_attempts, Duration::from_millis(r.base_delay_ms)),
            None => RetryConfig::default(),
        }
    }

    /// Read the API token from the configured environment variable
    pub fn api_token(&self) -> Result<String> {
        std::env::var(&self.api_token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .with_context(|| format!("Set {} to your API token", self.api_token_env))
    }
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("Every application needs a non-empty id");
        }
        for group in &self.groups {
            if group.trim().is_empty() {
                bail!("Application {} has an empty group id", self.id);
            }
        }
        for user in &self.users {
            if user.id.trim().is_empty() {
                bail!("Application {} has a user with an empty id", self.id);
            }
        }
        Ok(())
    }

    /// Label when set, id otherwise
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn to_desired(&self) -> DesiredApp {
        DesiredApp {
            membership: DesiredMembership {
                users: self.users.clone(),
                groups: self.groups.clone(),
            },
            status: self.status,
        }
    }
}
