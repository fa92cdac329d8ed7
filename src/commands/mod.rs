pub mod delete;
pub mod plan;
pub mod show;
pub mod sync;

use crate::config::Config;
use anyhow::{Context as _, Result};
use membership::Directory;
use membership::directory::rest::RestDirectory;
use std::sync::Arc;

/// Connect to the directory configured in `config`
pub fn connect(config: &Config) -> Result<Arc<dyn Directory>> {
    let token = config.api_token()?;
    let dir = RestDirectory::new(config.org_url.as_str(), token)
        .context("Could not create directory client")?
        .with_retry(config.retry_config());
    log::debug!("Connected to {}", dir.base_url());
    Ok(Arc::new(dir))
}

/// Resolve an app argument to an id, accepting configured labels
pub fn resolve_app_id(config: &Config, key: &str) -> String {
    config
        .find_app(key)
        .map_or_else(|| key.to_string(), |a| a.id.clone())
}

/// Confirm with user
pub fn confirm_proceed(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?;

    Ok(confirmed)
}
