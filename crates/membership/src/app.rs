//! Application profile and field mapping
//!
//! Every application kind (SAML, SWA, OpenID Connect, bookmarks, ...) shares
//! one [`AppProfile`]. The kind is a tag on the profile, and the flat field
//! view is produced by a single `read_fields`/`write_fields` pair that
//! consults the tag, instead of one mapping function per kind.

use crate::error::{Error, Result};
use crate::settings::{AppSettings, SettingValue};
use crate::types::AppStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign-on mode of an application, which determines its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignOnMode {
    Saml2,
    /// Secure web authentication (password vaulting)
    AutoLogin,
    OpenIdConnect,
    Bookmark,
    Other(String),
}

impl SignOnMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Saml2 => "SAML_2_0",
            Self::AutoLogin => "AUTO_LOGIN",
            Self::OpenIdConnect => "OPENID_CONNECT",
            Self::Bookmark => "BOOKMARK",
            Self::Other(s) => s,
        }
    }

    /// Whether the kind carries self-service accessibility settings
    pub fn has_accessibility(&self) -> bool {
        matches!(self, Self::Saml2 | Self::AutoLogin)
    }
}

impl From<String> for SignOnMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "SAML_2_0" => Self::Saml2,
            "AUTO_LOGIN" => Self::AutoLogin,
            "OPENID_CONNECT" => Self::OpenIdConnect,
            "BOOKMARK" => Self::Bookmark,
            _ => Self::Other(s),
        }
    }
}

impl From<SignOnMode> for String {
    fn from(mode: SignOnMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for SignOnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the application icon is shown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub auto_submit_toolbar: bool,
    pub hide_ios: bool,
    pub hide_web: bool,
}

/// Self-service access settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessibility {
    pub self_service: bool,
    pub error_redirect_url: Option<String>,
}

/// An application as held by the remote directory
#[derive(Debug, Clone, PartialEq)]
pub struct AppProfile {
    pub id: String,
    /// Platform-assigned name, read-only
    pub name: String,
    pub label: String,
    pub sign_on_mode: SignOnMode,
    pub status: AppStatus,
    pub visibility: Visibility,
    pub accessibility: Accessibility,
    pub settings: AppSettings,
}

/// Field names that `write_fields` refuses to change
const READ_ONLY_FIELDS: &[&str] = &["id", "name", "sign_on_mode"];

impl AppProfile {
    pub fn new(id: impl Into<String>, label: impl Into<String>, mode: SignOnMode) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            label: label.into(),
            sign_on_mode: mode,
            status: AppStatus::Active,
            visibility: Visibility::default(),
            accessibility: Accessibility::default(),
            settings: AppSettings::new(),
        }
    }

    /// Flatten the profile into a field map
    pub fn read_fields(&self) -> AppSettings {
        let mut fields = AppSettings::new();
        fields.insert("id", self.id.as_str());
        fields.insert("name", self.name.as_str());
        fields.insert("label", self.label.as_str());
        fields.insert("sign_on_mode", self.sign_on_mode.as_str());
        fields.insert("status", self.status.as_str());
        fields.insert("auto_submit_toolbar", self.visibility.auto_submit_toolbar);
        fields.insert("hide_ios", self.visibility.hide_ios);
        fields.insert("hide_web", self.visibility.hide_web);

        if self.sign_on_mode.has_accessibility() {
            fields.insert("accessibility_self_service", self.accessibility.self_service);
            fields.insert(
                "accessibility_error_redirect_url",
                self.accessibility
                    .error_redirect_url
                    .clone()
                    .unwrap_or_default(),
            );
        }

        fields
    }

    /// Apply a field map to the profile
    ///
    /// Read-only fields are rejected, unknown fields and fields the kind does
    /// not support are errors.
    pub fn write_fields(&mut self, fields: &AppSettings) -> Result<()> {
        for (key, value) in fields.iter() {
            if READ_ONLY_FIELDS.contains(&key.as_str()) {
                return Err(Error::Config(format!("field {key} is read-only")));
            }
            match key.as_str() {
                "label" => self.label = expect_str(key, value)?.to_string(),
                "status" => {
                    self.status = match expect_str(key, value)? {
                        "ACTIVE" => AppStatus::Active,
                        "INACTIVE" => AppStatus::Inactive,
                        other => {
                            return Err(Error::Config(format!("invalid status {other}")));
                        }
                    }
                }
                "auto_submit_toolbar" => {
                    self.visibility.auto_submit_toolbar = expect_bool(key, value)?;
                }
                "hide_ios" => self.visibility.hide_ios = expect_bool(key, value)?,
                "hide_web" => self.visibility.hide_web = expect_bool(key, value)?,
                "accessibility_self_service" | "accessibility_error_redirect_url"
                    if !self.sign_on_mode.has_accessibility() =>
                {
                    return Err(Error::Config(format!(
                        "field {key} is not supported by {} applications",
                        self.sign_on_mode
                    )));
                }
                "accessibility_self_service" => {
                    self.accessibility.self_service = expect_bool(key, value)?;
                }
                "accessibility_error_redirect_url" => {
                    let url = expect_str(key, value)?;
                    self.accessibility.error_redirect_url =
                        (!url.is_empty()).then(|| url.to_string());
                }
                _ => return Err(Error::Config(format!("unknown field {key}"))),
            }
        }
        Ok(())
    }
}

fn expect_str<'a>(key: &str, value: &'a SettingValue) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::Config(format!("field {key} must be a string")))
}

fn expect_bool(key: &str, value: &SettingValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::Config(format!("field {key} must be a boolean")))
}
