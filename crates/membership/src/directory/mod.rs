//! Remote directory abstraction.
//!
//! The [`Directory`] trait is the narrow contract the reconciliation core
//! needs from an identity platform. [`rest::RestDirectory`] talks to a real
//! platform over HTTP; [`MockDirectory`] keeps everything in memory for tests.
//!
//! # Testing
//!
//! ```
//! use membership::directory::{Directory, MockDirectory};
//! use membership::{AppStatus, MemberKind, UserAssignment};
//!
//! let mock = MockDirectory::new()
//!     .with_app("0oa1", AppStatus::Active)
//!     .with_user("0oa1", UserAssignment::direct("u1", "alice"))
//!     .with_group("0oa1", "g1");
//!
//! let users = mock.list_all("0oa1", MemberKind::User).unwrap();
//! assert_eq!(users.len(), 1);
//! ```

pub mod rest;

use crate::app::{AppProfile, SignOnMode};
use crate::error::{Error, Result};
use crate::types::{
    AppStatus, Credentials, GroupAssignment, MemberKind, MembershipRecord, Page, Scope,
    UserAssignment,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Narrow contract of a remote identity directory.
///
/// Implementations must be safe to call from several worker threads at once.
pub trait Directory: Send + Sync {
    /// Fetch one page of assignments of the given kind.
    ///
    /// `cursor` is `None` for the first page and the previous page's `next`
    /// afterwards.
    fn list_page(
        &self,
        app_id: &str,
        kind: MemberKind,
        cursor: Option<&str>,
    ) -> Result<Page<MembershipRecord>>;

    /// Assign a user or group to the application.
    fn create_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: Option<&Credentials>,
    ) -> Result<()>;

    /// Replace the credentials of an existing assignment.
    fn update_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: &Credentials,
    ) -> Result<()>;

    /// Remove an assignment.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the assignment does not exist.
    fn delete_assignment(&self, app_id: &str, member_id: &str, kind: MemberKind) -> Result<()>;

    /// Activate or deactivate the application.
    fn set_status(&self, app_id: &str, status: AppStatus) -> Result<()>;

    /// Fetch the application.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the application does not exist.
    fn fetch_app(&self, app_id: &str) -> Result<AppProfile>;

    /// Delete the application. Most platforms require it to be inactive.
    fn delete_app(&self, app_id: &str) -> Result<()>;

    /// Fetch every page of assignments of the given kind.
    fn list_all(&self, app_id: &str, kind: MemberKind) -> Result<Vec<MembershipRecord>> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.list_page(app_id, kind, cursor.as_deref())?;
            records.extend(page.items);
            match page.next {
                Some(next) => {
                    if !seen.insert(next.clone()) {
                        return Err(Error::InvalidResponse(format!(
                            "pagination cursor repeated while listing {}",
                            kind.plural()
                        )));
                    }
                    cursor = Some(next);
                }
                None => break,
            }
        }

        log::debug!("Listed {} {} for {}", records.len(), kind.plural(), app_id);
        Ok(records)
    }
}

impl<D: Directory + ?Sized> Directory for Arc<D> {
    fn list_page(
        &self,
        app_id: &str,
        kind: MemberKind,
        cursor: Option<&str>,
    ) -> Result<Page<MembershipRecord>> {
        (**self).list_page(app_id, kind, cursor)
    }

    fn create_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        (**self).create_assignment(app_id, member_id, kind, credentials)
    }

    fn update_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: &Credentials,
    ) -> Result<()> {
        (**self).update_assignment(app_id, member_id, kind, credentials)
    }

    fn delete_assignment(&self, app_id: &str, member_id: &str, kind: MemberKind) -> Result<()> {
        (**self).delete_assignment(app_id, member_id, kind)
    }

    fn set_status(&self, app_id: &str, status: AppStatus) -> Result<()> {
        (**self).set_status(app_id, status)
    }

    fn fetch_app(&self, app_id: &str) -> Result<AppProfile> {
        (**self).fetch_app(app_id)
    }

    fn delete_app(&self, app_id: &str) -> Result<()> {
        (**self).delete_app(app_id)
    }
}

// =============================================================================
// Mock directory
// =============================================================================

/// A call made against the [`MockDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { kind: MemberKind },
    Create { kind: MemberKind, member_id: String },
    Update { member_id: String },
    Delete { kind: MemberKind, member_id: String },
    SetStatus(AppStatus),
    FetchApp,
    DeleteApp,
}

/// A scripted failure for the [`MockDirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Status(u16),
    Network,
}

impl Failure {
    fn to_error(self, what: &str) -> Error {
        match self {
            Self::NotFound => Error::not_found(what),
            Self::Status(code) => Error::http(format!("HTTP {code}"), Some(code)),
            Self::Network => Error::http("connection reset", None),
        }
    }
}

#[derive(Debug, Clone)]
struct MockApp {
    profile: AppProfile,
    users: Vec<UserAssignment>,
    groups: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    apps: HashMap<String, MockApp>,
    calls: Vec<Call>,
    failures: Vec<(Call, Failure)>,
}

/// In-memory directory for tests.
///
/// Records every call, can be scripted to fail specific calls, paginates
/// listings, and can add latency to mutating calls while tracking how many
/// are in flight at once. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
    page_size: Option<usize>,
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockDirectory {
    /// Create a new empty mock directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an application with the given status.
    #[must_use]
    pub fn with_app(self, app_id: &str, status: AppStatus) -> Self {
        let mut profile = AppProfile::new(app_id, app_id, SignOnMode::AutoLogin);
        profile.status = status;
        lock(&self.state).apps.insert(
            app_id.to_string(),
            MockApp {
                profile,
                users: Vec::new(),
                groups: Vec::new(),
            },
        );
        self
    }

    /// Add an existing user assignment.
    #[must_use]
    pub fn with_user(self, app_id: &str, user: UserAssignment) -> Self {
        if let Some(app) = lock(&self.state).apps.get_mut(app_id) {
            app.users.push(user);
        }
        self
    }

    /// Add an existing group assignment.
    #[must_use]
    pub fn with_group(self, app_id: &str, group_id: &str) -> Self {
        if let Some(app) = lock(&self.state).apps.get_mut(app_id) {
            app.groups.push(group_id.to_string());
        }
        self
    }

    /// Split listings into pages of `size` records.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Sleep this long inside every mutating assignment call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every future `call` fail with `failure`.
    #[must_use]
    pub fn fail_on(self, call: Call, failure: Failure) -> Self {
        lock(&self.state).failures.push((call, failure));
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state).calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|c| predicate(c)).count()
    }

    /// Number of recorded calls that change assignments.
    pub fn mutation_count(&self) -> usize {
        self.count_calls(|c| {
            matches!(
                c,
                Call::Create { .. } | Call::Update { .. } | Call::Delete { .. }
            )
        })
    }

    /// Current user assignments of an application.
    pub fn users(&self, app_id: &str) -> Vec<UserAssignment> {
        lock(&self.state)
            .apps
            .get(app_id)
            .map(|a| a.users.clone())
            .unwrap_or_default()
    }

    /// Current group ids of an application.
    pub fn group_ids(&self, app_id: &str) -> Vec<String> {
        lock(&self.state)
            .apps
            .get(app_id)
            .map(|a| a.groups.clone())
            .unwrap_or_default()
    }

    /// Current status of an application, `None` once deleted.
    pub fn status(&self, app_id: &str) -> Option<AppStatus> {
        lock(&self.state).apps.get(app_id).map(|a| a.profile.status)
    }

    /// Highest number of assignment calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Record the call and return the scripted failure, if any.
    fn record(&self, call: Call, what: &str) -> Result<()> {
        let mut state = lock(&self.state);
        let failure = state
            .failures
            .iter()
            .find(|(c, _)| *c == call)
            .map(|(_, f)| *f);
        state.calls.push(call);
        match failure {
            Some(f) => Err(f.to_error(what)),
            None => Ok(()),
        }
    }

    fn simulate_latency(&self) {
        let Some(latency) = self.latency else {
            return;
        };
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        thread::sleep(latency);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn with_app_mut<T>(
        &self,
        app_id: &str,
        f: impl FnOnce(&mut MockApp) -> Result<T>,
    ) -> Result<T> {
        let mut state = lock(&self.state);
        let app = state
            .apps
            .get_mut(app_id)
            .ok_or_else(|| Error::not_found(format!("application {app_id}")))?;
        f(app)
    }
}

impl Directory for MockDirectory {
    fn list_page(
        &self,
        app_id: &str,
        kind: MemberKind,
        cursor: Option<&str>,
    ) -> Result<Page<MembershipRecord>> {
        self.record(Call::List { kind }, &format!("application {app_id}"))?;

        let records: Vec<MembershipRecord> = self.with_app_mut(app_id, |app| {
            Ok(match kind {
                MemberKind::User => app
                    .users
                    .iter()
                    .cloned()
                    .map(MembershipRecord::User)
                    .collect(),
                MemberKind::Group => app
                    .groups
                    .iter()
                    .map(|id| MembershipRecord::Group(GroupAssignment { id: id.clone() }))
                    .collect(),
            })
        })?;

        let Some(size) = self.page_size else {
            return Ok(Page::last(records));
        };

        let start: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| Error::InvalidResponse(format!("bad cursor {c}")))?,
            None => 0,
        };
        let end = (start + size).min(records.len());
        let items = records
            .get(start..end)
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        let next = (end < records.len()).then(|| end.to_string());
        Ok(Page { items, next })
    }

    fn create_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        self.simulate_latency();
        self.record(
            Call::Create {
                kind,
                member_id: member_id.to_string(),
            },
            &format!("{kind} {member_id}"),
        )?;

        self.with_app_mut(app_id, |app| {
            match kind {
                MemberKind::User => {
                    // A direct assignment takes over any inherited one
                    app.users.retain(|u| u.id != member_id);
                    app.users.push(UserAssignment {
                        id: member_id.to_string(),
                        scope: Scope::User,
                        credentials: credentials.cloned(),
                    });
                }
                MemberKind::Group => {
                    if !app.groups.iter().any(|g| g == member_id) {
                        app.groups.push(member_id.to_string());
                    }
                }
            }
            Ok(())
        })
    }

    fn update_assignment(
        &self,
        app_id: &str,
        member_id: &str,
        kind: MemberKind,
        credentials: &Credentials,
    ) -> Result<()> {
        self.simulate_latency();
        self.record(
            Call::Update {
                member_id: member_id.to_string(),
            },
            &format!("{kind} {member_id}"),
        )?;

        if kind == MemberKind::Group {
            return Err(Error::http("groups have no credentials", Some(400)));
        }

        self.with_app_mut(app_id, |app| {
            let user = app
                .users
                .iter_mut()
                .find(|u| u.id == member_id)
                .ok_or_else(|| Error::not_found(format!("user {member_id}")))?;
            user.credentials = Some(credentials.clone());
            Ok(())
        })
    }

    fn delete_assignment(&self, app_id: &str, member_id: &str, kind: MemberKind) -> Result<()> {
        self.simulate_latency();
        self.record(
            Call::Delete {
                kind,
                member_id: member_id.to_string(),
            },
            &format!("{kind} {member_id}"),
        )?;

        self.with_app_mut(app_id, |app| {
            let removed = match kind {
                MemberKind::User => {
                    let before = app.users.len();
                    app.users.retain(|u| u.id != member_id);
                    before - app.users.len()
                }
                MemberKind::Group => {
                    let before = app.groups.len();
                    app.groups.retain(|g| g != member_id);
                    before - app.groups.len()
                }
            };
            if removed == 0 {
                return Err(Error::not_found(format!("{kind} {member_id}")));
            }
            Ok(())
        })
    }

    fn set_status(&self, app_id: &str, status: AppStatus) -> Result<()> {
        self.record(Call::SetStatus(status), &format!("application {app_id}"))?;
        self.with_app_mut(app_id, |app| {
            app.profile.status = status;
            Ok(())
        })
    }

    fn fetch_app(&self, app_id: &str) -> Result<AppProfile> {
        self.record(Call::FetchApp, &format!("application {app_id}"))?;
        self.with_app_mut(app_id, |app| Ok(app.profile.clone()))
    }

    fn delete_app(&self, app_id: &str) -> Result<()> {
        self.record(Call::DeleteApp, &format!("application {app_id}"))?;
        let mut state = lock(&self.state);
        match state.apps.get(app_id).map(|a| a.profile.status) {
            None => Err(Error::not_found(format!("application {app_id}"))),
            Some(AppStatus::Active) => Err(Error::http(
                "application must be deactivated before deletion",
                Some(403),
            )),
            Some(AppStatus::Inactive) => {
                state.apps.remove(app_id);
                Ok(())
            }
        }
    }
}
