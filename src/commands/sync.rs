//! `appsync sync` - reconcile assignments and status

use super::plan::{plan_app, print_plan};
use crate::Context;
use crate::cli::SyncArgs;
use crate::config::{AppConfig, Config};
use crate::progress;
use crate::ui;
use anyhow::{Result, bail};
use colored::Colorize;
use membership::{
    Directory, ProgressCallback, StatusChange, Summary, SyncOptions, SyncReport,
    reconcile_memberships_and_status,
};
use std::sync::Arc;

/// Reconcile one application, logging the outcome
pub fn sync_app(
    dir: &Arc<dyn Directory>,
    app: &AppConfig,
    options: &SyncOptions,
    progress: &dyn ProgressCallback,
) -> membership::Result<SyncReport> {
    log::info!("Syncing {} ({})", app.display_name(), app.id);
    let report =
        reconcile_memberships_and_status(dir, &app.id, &app.to_desired(), options, progress)?;
    if report.status != StatusChange::Unchanged {
        log::info!("{} {}", app.id, report.status);
    }
    Ok(report)
}

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let config = Config::load(ctx.config.as_deref())?;
    let apps = config.select_apps(args.app.as_deref())?;
    if apps.is_empty() {
        ui::info("No applications configured");
        return Ok(());
    }

    let dir = super::connect(&config)?;
    let options = SyncOptions {
        parallelism: args.jobs.unwrap_or(config.parallelism).max(1),
    };

    // 1. Plan every app up front
    ui::header("Sync");
    let mut pending = Vec::new();
    for app in apps {
        let plan = plan_app(&dir, app)?;
        print_plan(app, &plan);
        if plan.has_changes() {
            pending.push(app);
        }
    }

    println!();
    if pending.is_empty() {
        ui::success("Everything is up to date");
        return Ok(());
    }
    if args.dry_run {
        ui::info(&format!(
            "Dry run: {} application(s) would change",
            pending.len()
        ));
        return Ok(());
    }

    // 2. Confirm (unless --yes)
    if !args.yes && !super::confirm_proceed("Apply changes?")? {
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    // 3. Apply
    let progress = progress::reporter(ctx.quiet);
    let mut total = Summary::default();
    let mut failed = 0;
    for app in &pending {
        match sync_app(&dir, app, &options, progress.as_ref()) {
            Ok(report) => {
                total.merge(report.summary);
                ui::success(&format!("{} synced", app.display_name()));
            }
            Err(e) => {
                failed += 1;
                if let membership::Error::Aggregate { failures, .. } = &e {
                    total.failed += failures.len();
                }
                ui::error(&format!("{}: {e}", app.display_name()));
                ui::dim(e.category().advice());
            }
        }
    }

    println!();
    if failed == 0 {
        println!("  {} Applications synced successfully!", "✓".green().bold());
    } else {
        println!("  {} Sync finished with errors", "⚠".yellow().bold());
    }
    ui::summary(&total);

    if failed > 0 {
        bail!("{failed} of {} application(s) failed to sync", pending.len());
    }
    Ok(())
}
