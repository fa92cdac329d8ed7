//! REST directory backend.
//!
//! This module provides [`RestDirectory`], a [`Directory`] that talks to an
//! Okta-style management API:
//!
//! - `GET/POST /api/v1/apps/{app}/users`, `POST/DELETE .../users/{user}`
//! - `GET /api/v1/apps/{app}/groups`, `PUT/DELETE .../groups/{group}`
//! - `POST /api/v1/apps/{app}/lifecycle/activate|deactivate`
//! - `GET/DELETE /api/v1/apps/{app}`
//!
//! Listings are paginated through the `Link: <url>; rel="next"` header; the
//! cursor handed back in [`Page::next`] is that URL.

use crate::app::{Accessibility, AppProfile, SignOnMode, Visibility};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry, with_retry_if};
use crate::settings::AppSettings;
use crate::types::{
    AppStatus, Credentials, GroupAssignment, MemberKind, MembershipRecord, Page, Scope,
    UserAssignment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Records requested per listing page.
const PAGE_LIMIT: usize = 200;

/// Overall timeout for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("appsync/", env!("CARGO_PKG_VERSION"));

/// Directory backed by the platform's REST API.
///
/// # Example
///
/// ```no_run
/// use membership::directory::Directory;
/// use membership::directory::rest::RestDirectory;
/// use membership::MemberKind;
///
/// let dir = RestDirectory::new("https://example.okta.com", "token").unwrap();
/// let groups = dir.list_all("0oa1", MemberKind::Group).unwrap();
/// println!("{} groups assigned", groups.len());
/// ```
pub struct RestDirectory {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    retry: RetryConfig,
    link_next: Regex,
}

impl RestDirectory {
    /// Create a client for the organization at `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("organization URL is empty".into()));
        }
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Config("API token is empty".into()));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        let link_next = Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            agent,
            base_url,
            token,
            retry: RetryConfig::default(),
            link_next,
        })
    }

    /// Replace the retry policy for transient failures.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the organization base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn app_url(&self, app_id: &str) -> String {
        format!("{}/api/v1/apps/{app_id}", self.base_url)
    }

    fn members_url(&self, app_id: &str, kind: MemberKind) -> String {
        format!("{}/{}", self.app_url(app_id), kind.plural())
    }

    fn member_url(&self, app_id: &str, kind: MemberKind, member_id: &str) -> String {
        format!("{}/{member_id}", self.members_url(app_id, kind))
    }

    fn first_page_url(&self, app_id: &str, kind: MemberKind) -> String {
        format!("{}?limit={PAGE_LIMIT}", self.members_url(app_id, kind))
    }

    fn authorization(&self) -> String {
        format!("SSWS {}", self.token)
    }

    /// Extract the `rel="next"` URL from one or more `Link` header values.
    fn next_link<'a>(&self, links: impl IntoIterator<Item = &'a str>) -> Option<String> {
        links
            .into_iter()
            .flat_map(|value| value.split(','))
            .find_map(|part| {
                self.link_next
                    .captures(part)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            })
    }

    fn get_page(&self, url: &str, kind: MemberKind) -> Result<Page<MembershipRecord>> {
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call()?;

        let next = self.next_link(
            response
                .headers()
                .get_all("link")
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );

        let items = match kind {
            MemberKind::User => response
                .body_mut()
                .read_json::<Vec<AppUserWire>>()?
                .into_iter()
                .map(|u| MembershipRecord::User(u.into()))
                .collect(),
            MemberKind::Group => response
                .body_mut()
                .read_json::<Vec<AppGroupWire>>()?
                .into_iter()
                .map(|g| MembershipRecord::Group(GroupAssignment { id: g.id }))
                .collect(),
        };

        Ok(Page { items, next })
    }

    fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<()> {
        self.agent
            .post(url)
            .header("Authorization", &self.authorization())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(body)?;
        Ok(())
    }

    fn post_empty(&self, url: &str) -> Result<()> {
        self.agent
            .post(url)
            .header("Authorization", &self.authorization())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_empty()?;
        Ok(())
    }

    fn put_json<B: Serialize>(&self, url: &str, body: &B) -> Result<()> {
        self.agent
            .put(url)
            .header("Authorization", &self.authorization())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(body)?;
        Ok(())
    }

    fn delete(&self, url: &str) -> Result<()> {
        self.agent
            .delete(url)
            .header("Authorization", &self.authorization())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call()?;
        Ok(())
    }
}

/// Listings also retry a 404, which the platform returns for a short while
/// after an application or assignment was created.
fn listing_should_retry(error: &Error) -> bool {
    error.is_retryable() || error.is_not_found()
}

impl Directory for RestDirectory {
    fn list_page(
        &self,
        app_id: &str,
        kind: MemberKind,
        cursor: Option<&str>,
    ) -> Result<Page<MembershipRecord>> {
        let url = cursor.map_or_else(|| self.first_page_url(app_id, kind), str::to_string);
        log::debug!("GET {url}");
        with_retry_if(
            &self.retry,
            &format!("list {}", kind.plural()),
            listing_should_retry,
            || self.get_page(&url, kind),
        )
    }

    fn create_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        let what = format!("create {kind} {member_id}");
        match kind {
            MemberKind::User => {
                let body = AppUserRequest {
                    id: Some(member_id),
                    scope: Some("USER"),
                    credentials: credentials.map(CredentialsWire::from),
                };
                let url = self.members_url(app_id, kind);
                with_retry(&self.retry, &what, || self.post_json(&url, &body))
            }
            MemberKind::Group => {
                let url = self.member_url(app_id, kind, member_id);
                with_retry(&self.retry, &what, || {
                    self.put_json(&url, &serde_json::json!({}))
                })
            }
        }
    }

    fn update_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: &Credentials,
    ) -> Result<()> {
        if kind == MemberKind::Group {
            return Err(Error::Config("group assignments carry no credentials".into()));
        }
        let body = AppUserRequest {
            id: None,
            scope: None,
            credentials: Some(CredentialsWire::from(credentials)),
        };
        let url = self.member_url(app_id, kind, member_id);
        with_retry(&self.retry, &format!("update user {member_id}"), || {
            self.post_json(&url, &body)
        })
    }

    fn delete_assignment(&self, app_id: &str, member_id: &str, kind: MemberKind) -> Result<()> {
        let url = self.member_url(app_id, kind, member_id);
        with_retry(&self.retry, &format!("delete {kind} {member_id}"), || {
            self.delete(&url)
        })
        .map_err(|e| match e {
            Error::NotFound { .. } => Error::not_found(format!("{kind} {member_id}")),
            other => other,
        })
    }

    fn set_status(&self, app_id: &str, status: AppStatus) -> Result<()> {
        let action = match status {
            AppStatus::Active => "activate",
            AppStatus::Inactive => "deactivate",
        };
        let url = format!("{}/lifecycle/{action}", self.app_url(app_id));
        with_retry(&self.retry, &format!("{action} {app_id}"), || {
            self.post_empty(&url)
        })
    }

    fn fetch_app(&self, app_id: &str) -> Result<AppProfile> {
        let url = self.app_url(app_id);
        let wire: AppWire = with_retry(&self.retry, &format!("fetch {app_id}"), || {
            Ok(self
                .agent
                .get(&url)
                .header("Authorization", &self.authorization())
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .call()?
                .body_mut()
                .read_json()?)
        })
        .map_err(|e| match e {
            Error::NotFound { .. } => Error::not_found(format!("application {app_id}")),
            other => other,
        })?;
        Ok(wire.into())
    }

    fn delete_app(&self, app_id: &str) -> Result<()> {
        let url = self.app_url(app_id);
        with_retry(&self.retry, &format!("delete {app_id}"), || self.delete(&url))
    }
}

// =============================================================================
// API wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct AppUserWire {
    id: String,
    scope: Scope,
    #[serde(default)]
    credentials: Option<CredentialsWire>,
}

#[derive(Debug, Deserialize)]
struct AppGroupWire {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialsWire {
    #[serde(rename = "userName", default)]
    user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<PasswordWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PasswordWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Debug, Serialize)]
struct AppUserRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<CredentialsWire>,
}

impl From<&Credentials> for CredentialsWire {
    fn from(c: &Credentials) -> Self {
        Self {
            user_name: Some(c.username.clone()),
            password: c.password.as_ref().map(|p| PasswordWire {
                value: Some(p.clone()),
            }),
        }
    }
}

impl From<AppUserWire> for UserAssignment {
    fn from(u: AppUserWire) -> Self {
        // The platform never echoes passwords back
        let credentials = u
            .credentials
            .and_then(|c| c.user_name)
            .map(Credentials::new);
        Self {
            id: u.id,
            scope: u.scope,
            credentials,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppWire {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    label: String,
    sign_on_mode: SignOnMode,
    status: AppStatus,
    #[serde(default)]
    visibility: VisibilityWire,
    #[serde(default)]
    accessibility: AccessibilityWire,
    #[serde(default)]
    settings: SettingsWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityWire {
    #[serde(default)]
    auto_submit_toolbar: bool,
    #[serde(default)]
    hide: HideWire,
}

#[derive(Debug, Default, Deserialize)]
struct HideWire {
    #[serde(rename = "iOS", default)]
    ios: bool,
    #[serde(default)]
    web: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessibilityWire {
    #[serde(default)]
    self_service: bool,
    #[serde(default)]
    error_redirect_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsWire {
    #[serde(default)]
    app: serde_json::Map<String, serde_json::Value>,
}

impl From<AppWire> for AppProfile {
    fn from(w: AppWire) -> Self {
        Self {
            id: w.id,
            name: w.name,
            label: w.label,
            sign_on_mode: w.sign_on_mode,
            status: w.status,
            visibility: Visibility {
                auto_submit_toolbar: w.visibility.auto_submit_toolbar,
                hide_ios: w.visibility.hide.ios,
                hide_web: w.visibility.hide.web,
            },
            accessibility: Accessibility {
                self_service: w.accessibility.self_service,
                error_redirect_url: w.accessibility.error_redirect_url.filter(|u| !u.is_empty()),
            },
            settings: AppSettings::from_json_object(&w.settings.app),
        }
    }
}
