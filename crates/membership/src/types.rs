//! Core types for membership reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of member that can be assigned to an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    User,
    Group,
}

impl MemberKind {
    /// Plural noun used in messages and URLs
    pub fn plural(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// How a user came to be assigned to an application
///
/// Only `User` scoped assignments are managed. Anything else was inherited
/// through a group assignment and is read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scope {
    /// Explicit, direct assignment
    User,
    /// Inherited through group membership
    #[serde(other)]
    Group,
}

/// Credentials attached to a user assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// A user assignment as held by the remote directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignment {
    pub id: String,
    pub scope: Scope,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl UserAssignment {
    /// Explicitly assigned user
    pub fn direct(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: Scope::User,
            credentials: Some(Credentials::new(username)),
        }
    }

    /// User whose access comes from a group
    pub fn inherited(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: Scope::Group,
            credentials: None,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.scope == Scope::User
    }

    /// Username recorded on the assignment, if any
    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }
}

/// A group assignment as held by the remote directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub id: String,
}

/// One record from a membership listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipRecord {
    User(UserAssignment),
    Group(GroupAssignment),
}

impl MembershipRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::User(u) => &u.id,
            Self::Group(g) => &g.id,
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Self::User(_) => MemberKind::User,
            Self::Group(_) => MemberKind::Group,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page, `None` on the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Desired user assignment, from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserSpec {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Credentials to send with a create or update
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Desired membership of one application
///
/// Ids are assumed unique. Duplicates are not rejected and produce
/// duplicate operations, which the directory treats idempotently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredMembership {
    #[serde(default)]
    pub users: Vec<UserSpec>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl DesiredMembership {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}

/// Activation status of an application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppStatus {
    #[default]
    Active,
    Inactive,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of one application: membership plus status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredApp {
    pub membership: DesiredMembership,
    pub status: AppStatus,
}

/// Options for a reconciliation pass
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of operations in flight at once
    pub parallelism: usize,
}

/// Default parallelism ceiling
pub const DEFAULT_PARALLELISM: usize = 4;

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}
