//! Reconciliation passes
//!
//! A membership pass lists the current users and groups, diffs them against
//! the desired state, and runs the resulting operations. Listing failures
//! abort the pass before anything changes; operation failures are collected
//! and returned together once every operation has run.

use crate::context::ProgressCallback;
use crate::diff::{MembershipDiff, split_records};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::executor::execute;
use crate::outcome::Summary;
use crate::plan::{Operation, build_operations};
use crate::status::{StatusChange, reconcile_status};
use crate::types::{
    DesiredApp, DesiredMembership, MemberKind, SyncOptions, UserAssignment, UserSpec,
};
use std::sync::Arc;

/// Context attached to a failed membership pass
pub const ASSOCIATE_CONTEXT: &str = "failed to associate users or groups with application";

/// Current assignments of one application
#[derive(Debug, Clone, Default)]
pub struct CurrentMembership {
    /// Every user assignment, inherited ones included
    pub users: Vec<UserAssignment>,
    pub groups: Vec<String>,
}

impl CurrentMembership {
    /// Directly assigned users and all groups, in desired-state form
    pub fn to_desired(&self) -> DesiredMembership {
        DesiredMembership {
            users: self
                .users
                .iter()
                .filter(|u| u.is_direct())
                .map(|u| UserSpec::new(&u.id, u.username().unwrap_or_default()))
                .collect(),
            groups: self.groups.clone(),
        }
    }
}

/// A computed but not yet executed pass
#[derive(Debug)]
pub struct MembershipPlan {
    pub diff: MembershipDiff,
    pub operations: Vec<Operation>,
}

/// Outcome of a full reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub summary: Summary,
    pub status: StatusChange,
}

fn list_kind(dir: &dyn Directory, app_id: &str, kind: MemberKind) -> Result<CurrentMembership> {
    let records = dir
        .list_all(app_id, kind)
        .map_err(|source| Error::Listing {
            kind,
            source: Box::new(source),
        })?;
    let (users, groups) = split_records(records);
    Ok(CurrentMembership { users, groups })
}

/// List every user and group assignment of the application
pub fn list_current(dir: &dyn Directory, app_id: &str) -> Result<CurrentMembership> {
    let users = list_kind(dir, app_id, MemberKind::User)?.users;
    let groups = list_kind(dir, app_id, MemberKind::Group)?.groups;
    Ok(CurrentMembership { users, groups })
}

/// Read back the managed membership of an application
pub fn current_membership(dir: &dyn Directory, app_id: &str) -> Result<DesiredMembership> {
    Ok(list_current(dir, app_id)?.to_desired())
}

/// Diff and build operations without running them
pub fn plan_memberships(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    desired: &DesiredMembership,
) -> Result<MembershipPlan> {
    let current = list_current(dir.as_ref(), app_id)?;
    let diff = MembershipDiff::compute(desired, &current.users, &current.groups);
    let summary = diff.summary();
    log::debug!(
        "{app_id}: {} to add, {} to update, {} to remove",
        summary.additions,
        summary.updates,
        summary.removals
    );

    let operations = build_operations(dir, app_id, &diff);
    Ok(MembershipPlan { diff, operations })
}

/// Make the application's assignments match `desired`
///
/// Returns the pass summary, or one [`Error::Aggregate`] listing every
/// failed operation.
pub fn sync_memberships(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    desired: &DesiredMembership,
    parallelism: usize,
    progress: &dyn ProgressCallback,
) -> Result<Summary> {
    let plan = plan_memberships(dir, app_id, desired)?;
    if plan.operations.is_empty() {
        log::info!("{app_id}: memberships already up to date");
        return Ok(Summary::default());
    }

    let result = execute(plan.operations, parallelism, progress)?;
    let summary = result.summary();
    result.into_result(ASSOCIATE_CONTEXT)?;
    Ok(summary)
}

/// Reconcile memberships, then status
///
/// When the membership pass fails the status is left alone and the pass
/// error is returned.
pub fn reconcile_memberships_and_status(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    desired: &DesiredApp,
    options: &SyncOptions,
    progress: &dyn ProgressCallback,
) -> Result<SyncReport> {
    let summary = sync_memberships(
        dir,
        app_id,
        &desired.membership,
        options.parallelism,
        progress,
    )?;

    let current = dir.fetch_app(app_id)?.status;
    let status = reconcile_status(dir.as_ref(), app_id, desired.status, current)?;

    Ok(SyncReport { summary, status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::directory::{Call, Failure, MockDirectory};
    use crate::types::AppStatus;
    use std::collections::HashSet;
    use std::time::Duration;

    fn scenario() -> (Arc<MockDirectory>, Arc<dyn Directory>) {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_user("app", UserAssignment::direct("u2", "bob"))
                .with_group("app", "g2"),
        );
        let dir: Arc<dyn Directory> = mock.clone();
        (mock, dir)
    }

    fn desired() -> DesiredMembership {
        DesiredMembership {
            users: vec![UserSpec::new("u1", "alice")],
            groups: vec!["g1".into()],
        }
    }

    #[test]
    fn test_scenario_issues_four_operations() {
        let (mock, dir) = scenario();

        let plan = plan_memberships(&dir, "app", &desired()).unwrap();
        let names: HashSet<String> = plan.operations.iter().map(ToString::to_string).collect();
        let expected: HashSet<String> = [
            "create user u1",
            "delete user u2",
            "create group g1",
            "delete group g2",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(names, expected);
        drop(plan);
        assert_eq!(mock.mutation_count(), 0, "planning must not mutate");

        let summary = sync_memberships(&dir, "app", &desired(), 4, &NoProgress).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.removed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(mock.group_ids("app"), vec!["g1"]);
        let users = mock.users("app");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u1");
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let (mock, dir) = scenario();
        sync_memberships(&dir, "app", &desired(), 2, &NoProgress).unwrap();
        let mutations = mock.mutation_count();

        let plan = plan_memberships(&dir, "app", &desired()).unwrap();
        assert!(plan.operations.is_empty());
        let summary = sync_memberships(&dir, "app", &desired(), 2, &NoProgress).unwrap();
        assert_eq!(summary, Summary::default());
        assert_eq!(mock.mutation_count(), mutations);
    }

    #[test]
    fn test_inherited_user_gets_direct_assignment() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_user("app", UserAssignment::inherited("u1")),
        );
        let dir: Arc<dyn Directory> = mock.clone();
        let desired = DesiredMembership {
            users: vec![UserSpec::new("u1", "alice")],
            groups: Vec::new(),
        };

        let summary = sync_memberships(&dir, "app", &desired, 4, &NoProgress).unwrap();
        assert_eq!(summary.created, 1);
        assert!(mock.users("app")[0].is_direct());
    }

    #[test]
    fn test_listing_failure_aborts_before_mutation() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_user("app", UserAssignment::direct("u2", "bob"))
                .fail_on(
                    Call::List {
                        kind: MemberKind::Group,
                    },
                    Failure::Status(500),
                ),
        );
        let dir: Arc<dyn Directory> = mock.clone();

        let err = sync_memberships(&dir, "app", &desired(), 4, &NoProgress).unwrap_err();
        assert!(matches!(
            err,
            Error::Listing {
                kind: MemberKind::Group,
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to list application groups"));
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_user_listing_failure_names_users() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_group("app", "g2")
                .fail_on(
                    Call::List {
                        kind: MemberKind::User,
                    },
                    Failure::Network,
                ),
        );
        let dir: Arc<dyn Directory> = mock.clone();

        let err = sync_memberships(&dir, "app", &desired(), 4, &NoProgress).unwrap_err();
        assert!(matches!(
            err,
            Error::Listing {
                kind: MemberKind::User,
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to list application users"));
        assert_eq!(mock.mutation_count(), 0);
        assert_eq!(
            mock.count_calls(|c| matches!(
                c,
                Call::List {
                    kind: MemberKind::Group
                }
            )),
            0
        );
    }

    #[test]
    fn test_pass_respects_parallelism_against_directory() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_latency(Duration::from_millis(50)),
        );
        let dir: Arc<dyn Directory> = mock.clone();
        let desired = DesiredMembership {
            users: (1..=3)
                .map(|i| UserSpec::new(format!("u{i}"), format!("user{i}")))
                .collect(),
            groups: vec!["g1".into(), "g2".into()],
        };

        let summary = sync_memberships(&dir, "app", &desired, 2, &NoProgress).unwrap();
        assert_eq!(summary.created, 5);
        assert_eq!(mock.max_in_flight(), 2);
        assert_eq!(mock.users("app").len(), 3);
        assert_eq!(mock.group_ids("app").len(), 2);
    }

    #[test]
    fn test_tolerated_not_found_on_delete() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_user("app", UserAssignment::direct("u2", "bob"))
                .with_group("app", "g2")
                .fail_on(
                    Call::Delete {
                        kind: MemberKind::User,
                        member_id: "u2".into(),
                    },
                    Failure::NotFound,
                ),
        );
        let dir: Arc<dyn Directory> = mock.clone();

        let summary = sync_memberships(&dir, "app", &desired(), 4, &NoProgress).unwrap();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.removed, 2);
    }

    #[test]
    fn test_partial_failure_is_aggregated() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .with_group("app", "g2")
                .fail_on(
                    Call::Create {
                        kind: MemberKind::User,
                        member_id: "u1".into(),
                    },
                    Failure::Status(400),
                ),
        );
        let dir: Arc<dyn Directory> = mock.clone();

        let err = sync_memberships(&dir, "app", &desired(), 4, &NoProgress).unwrap_err();
        match &err {
            Error::Aggregate {
                failures, total, ..
            } => {
                assert_eq!(*total, 3);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].member_id, "u1");
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
        assert!(err.to_string().starts_with(ASSOCIATE_CONTEXT));
        // Siblings still ran
        assert_eq!(mock.group_ids("app"), vec!["g1"]);
    }

    #[test]
    fn test_reconcile_deactivates_after_memberships() {
        let (mock, dir) = scenario();
        let desired = DesiredApp {
            membership: desired(),
            status: AppStatus::Inactive,
        };

        let report = reconcile_memberships_and_status(
            &dir,
            "app",
            &desired,
            &SyncOptions::default(),
            &NoProgress,
        )
        .unwrap();
        assert_eq!(report.status, StatusChange::Deactivated);
        assert_eq!(report.summary.total(), 4);
        assert_eq!(
            mock.count_calls(|c| *c == Call::SetStatus(AppStatus::Inactive)),
            1
        );
        assert_eq!(
            mock.count_calls(|c| *c == Call::SetStatus(AppStatus::Active)),
            0
        );
        assert_eq!(
            mock.calls().last(),
            Some(&Call::SetStatus(AppStatus::Inactive))
        );
    }

    #[test]
    fn test_reconcile_leaves_status_on_membership_failure() {
        let mock = Arc::new(
            MockDirectory::new()
                .with_app("app", AppStatus::Active)
                .fail_on(
                    Call::Create {
                        kind: MemberKind::Group,
                        member_id: "g1".into(),
                    },
                    Failure::Network,
                ),
        );
        let dir: Arc<dyn Directory> = mock.clone();
        let desired = DesiredApp {
            membership: desired(),
            status: AppStatus::Inactive,
        };

        let err = reconcile_memberships_and_status(
            &dir,
            "app",
            &desired,
            &SyncOptions::default(),
            &NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Aggregate { .. }));
        assert_eq!(mock.status("app"), Some(AppStatus::Active));
        assert_eq!(mock.count_calls(|c| matches!(c, Call::SetStatus(_))), 0);
    }

    #[test]
    fn test_current_membership_skips_inherited_users() {
        let mock = MockDirectory::new()
            .with_app("app", AppStatus::Active)
            .with_user("app", UserAssignment::direct("u1", "alice"))
            .with_user("app", UserAssignment::inherited("u2"))
            .with_group("app", "g1");

        let current = current_membership(&mock, "app").unwrap();
        assert_eq!(current.users, vec![UserSpec::new("u1", "alice")]);
        assert_eq!(current.groups, vec!["g1"]);
    }
}
