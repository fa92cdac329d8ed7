//! `appsync plan` - preview the operations a sync would run

use crate::Context;
use crate::config::{AppConfig, Config};
use crate::ui;
use anyhow::{Context as _, Result};
use colored::Colorize;
use membership::{AppStatus, Directory, plan_memberships};
use std::sync::Arc;

/// Changes planned for one application
pub struct AppPlan {
    pub operations: Vec<(membership::OperationKind, String)>,
    pub status: Option<(AppStatus, AppStatus)>,
}

impl AppPlan {
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty() || self.status.is_some()
    }

    pub fn change_count(&self) -> usize {
        self.operations.len() + usize::from(self.status.is_some())
    }
}

/// Diff one application without changing anything
pub fn plan_app(dir: &Arc<dyn Directory>, app: &AppConfig) -> Result<AppPlan> {
    let desired = app.to_desired();
    let plan = plan_memberships(dir, &app.id, &desired.membership)
        .with_context(|| format!("Could not plan {}", app.display_name()))?;
    let current = dir
        .fetch_app(&app.id)
        .with_context(|| format!("Could not fetch {}", app.display_name()))?
        .status;

    Ok(AppPlan {
        operations: plan
            .operations
            .iter()
            .map(|op| (op.kind, op.member_id.clone()))
            .collect(),
        status: (current != desired.status).then_some((current, desired.status)),
    })
}

/// Print the plan of one application
pub fn print_plan(app: &AppConfig, plan: &AppPlan) {
    ui::section(&format!("{} ({})", app.display_name(), app.id));
    if !plan.has_changes() {
        ui::dim("No changes");
        return;
    }
    for (kind, member_id) in &plan.operations {
        ui::operation(*kind, member_id);
    }
    if let Some((current, desired)) = plan.status {
        println!("  {} status {current} -> {desired}", "~".yellow());
    }
}

pub fn run(ctx: &Context, app: Option<&str>) -> Result<()> {
    let config = Config::load(ctx.config.as_deref())?;
    let apps = config.select_apps(app)?;
    if apps.is_empty() {
        ui::info("No applications configured");
        return Ok(());
    }

    let dir = super::connect(&config)?;
    ui::header("Plan");

    let mut total = 0;
    for app in apps {
        let plan = plan_app(&dir, app)?;
        total += plan.change_count();
        print_plan(app, &plan);
    }

    println!();
    if total == 0 {
        ui::success("Everything is up to date");
    } else {
        ui::info(&format!("{total} change(s) pending, run `appsync sync` to apply"));
    }
    Ok(())
}
