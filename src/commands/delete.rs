//! `appsync delete` - deactivate, then delete an application

use crate::Context;
use crate::config::Config;
use crate::ui;
use anyhow::{Context as _, Result};
use colored::Colorize;
use membership::{Directory, deactivate_then_delete};

/// Delete `app_id`, treating an application that is already gone as done
///
/// Returns `false` when there was nothing to delete.
pub fn delete_app(dir: &dyn Directory, app_id: &str) -> Result<bool> {
    let current = match dir.fetch_app(app_id) {
        Ok(app) => app.status,
        Err(e) if e.is_not_found() => {
            log::warn!("Application {app_id} no longer exists");
            return Ok(false);
        }
        Err(e) => return Err(e).with_context(|| format!("Could not fetch {app_id}")),
    };

    deactivate_then_delete(dir, app_id, current)
        .with_context(|| format!("Could not delete {app_id}"))?;
    Ok(true)
}

pub fn run(ctx: &Context, key: &str, yes: bool) -> Result<()> {
    let config = Config::load(ctx.config.as_deref())?;
    let app_id = super::resolve_app_id(&config, key);
    let dir = super::connect(&config)?;

    if !yes && !super::confirm_proceed(&format!("Delete application {app_id}?"))? {
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    if delete_app(dir.as_ref(), &app_id)? {
        ui::success(&format!("Deleted {app_id}"));
    } else {
        ui::warn(&format!("{app_id} was already deleted"));
    }
    Ok(())
}
