//! `appsync show` - display an application as the directory holds it

use crate::Context;
use crate::config::{AppConfig, Config};
use crate::ui;
use anyhow::{Context as _, Result};
use colored::Colorize;
use membership::{AppProfile, AppSettings, SettingValue, current_membership};

/// Settings keys whose remote value differs from the configured one
pub fn settings_drift(desired: &AppSettings, remote: &AppSettings) -> Vec<String> {
    desired
        .retained()
        .filter(|(key, value)| remote.get(key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Profile fields whose remote value differs from the configured one
///
/// The configured label and status are written onto a copy of the remote
/// profile, then both are flattened and compared field by field.
pub fn profile_drift(
    configured: &AppConfig,
    app: &AppProfile,
) -> membership::Result<Vec<String>> {
    let mut fields = AppSettings::new();
    if let Some(label) = &configured.label {
        fields.insert("label", label.as_str());
    }
    fields.insert("status", configured.status.as_str());

    let mut expected = app.clone();
    expected.write_fields(&fields)?;

    let remote = app.read_fields();
    Ok(expected
        .read_fields()
        .iter()
        .filter(|(key, value)| remote.get(key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect())
}

fn setting_display(value: &SettingValue) -> String {
    match value {
        SettingValue::Null => "null".to_string(),
        SettingValue::Bool(b) => b.to_string(),
        SettingValue::Number(n) => n.to_string(),
        SettingValue::String(s) => s.clone(),
    }
}

fn print_profile(app: &AppProfile) {
    for (key, value) in app.read_fields().iter() {
        if value.is_empty_string() {
            continue;
        }
        ui::kv(key, &setting_display(value));
    }
}

pub fn run(ctx: &Context, key: &str) -> Result<()> {
    let config = Config::load(ctx.config.as_deref())?;
    let app_id = super::resolve_app_id(&config, key);
    let dir = super::connect(&config)?;

    let app = dir.fetch_app(&app_id).map_err(|e| {
        if e.is_not_found() {
            anyhow::anyhow!("Application {app_id} does not exist")
        } else {
            anyhow::Error::new(e).context(format!("Could not fetch {app_id}"))
        }
    })?;

    ui::header(&format!("{} ({})", app.label, app.id));
    print_profile(&app);

    ui::section("Settings");
    let settings = app.settings.to_json()?;
    ui::dim(&settings);

    let members = current_membership(dir.as_ref(), &app_id)
        .with_context(|| format!("Could not list members of {app_id}"))?;
    ui::section(&format!("Users ({})", members.users.len()));
    for user in &members.users {
        println!("  {} {}", user.id, user.username.dimmed());
    }
    ui::section(&format!("Groups ({})", members.groups.len()));
    for group in &members.groups {
        println!("  {group}");
    }

    if let Some(configured) = config.find_app(&app_id) {
        print_drift(configured, &app)?;
    }
    Ok(())
}

fn print_drift(configured: &AppConfig, app: &AppProfile) -> Result<()> {
    let fields = profile_drift(configured, app)
        .with_context(|| format!("Could not compare {} with config", app.id))?;
    if !fields.is_empty() {
        ui::warn(&format!("Fields differ from config: {}", fields.join(", ")));
    }
    let settings = settings_drift(&configured.settings, &app.settings);
    if !settings.is_empty() {
        ui::warn(&format!("Settings differ from config: {}", settings.join(", ")));
    }
    Ok(())
}
