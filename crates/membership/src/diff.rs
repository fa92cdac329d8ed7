//! Diff computation between desired and existing memberships
//!
//! Users and groups are diffed independently by id. Inherited user
//! assignments are dropped before comparing, so a user that only has access
//! through a group shows up as an addition and is never removed.

use crate::types::{DesiredMembership, MembershipRecord, UserAssignment, UserSpec};
use std::collections::{HashMap, HashSet};

/// Changes to the user assignments of one application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDiff {
    /// Desired users with no direct assignment, in desired order
    pub to_add: Vec<UserSpec>,
    /// Desired users whose username differs from the assignment, in desired order
    pub to_update: Vec<UserSpec>,
    /// Direct assignments no longer desired, in listing order
    pub to_remove: Vec<UserAssignment>,
}

/// Changes to the group assignments of one application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

/// Combined user and group changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub users: UserDiff,
    pub groups: GroupDiff,
}

impl MembershipDiff {
    /// Diff desired state against the full existing listings
    pub fn compute(
        desired: &DesiredMembership,
        existing_users: &[UserAssignment],
        existing_groups: &[String],
    ) -> Self {
        Self {
            users: diff_users(&desired.users, existing_users),
            groups: diff_groups(&desired.groups, existing_groups),
        }
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            additions: self.users.to_add.len() + self.groups.to_add.len(),
            updates: self.users.to_update.len(),
            removals: self.users.to_remove.len() + self.groups.to_remove.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.summary().has_changes()
    }
}

/// Diff users by id
///
/// Only directly assigned users take part. An assignment without credentials
/// never needs an update, and neither does a password-only change since the
/// directory never reports passwords back.
pub fn diff_users(desired: &[UserSpec], existing: &[UserAssignment]) -> UserDiff {
    let direct: HashMap<&str, &UserAssignment> = existing
        .iter()
        .filter(|u| u.is_direct())
        .map(|u| (u.id.as_str(), u))
        .collect();
    let wanted: HashSet<&str> = desired.iter().map(|u| u.id.as_str()).collect();

    let mut diff = UserDiff::default();
    for spec in desired {
        match direct.get(spec.id.as_str()) {
            None => diff.to_add.push(spec.clone()),
            Some(current) => {
                if let Some(username) = current.username()
                    && username != spec.username
                {
                    diff.to_update.push(spec.clone());
                }
            }
        }
    }

    diff.to_remove = existing
        .iter()
        .filter(|u| u.is_direct() && !wanted.contains(u.id.as_str()))
        .cloned()
        .collect();

    diff
}

/// Diff group ids
pub fn diff_groups(desired: &[String], existing: &[String]) -> GroupDiff {
    let current: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let wanted: HashSet<&str> = desired.iter().map(String::as_str).collect();

    GroupDiff {
        to_add: desired
            .iter()
            .filter(|id| !current.contains(id.as_str()))
            .cloned()
            .collect(),
        to_remove: existing
            .iter()
            .filter(|id| !wanted.contains(id.as_str()))
            .cloned()
            .collect(),
    }
}

/// Split a mixed listing into user assignments and group ids
pub fn split_records(records: Vec<MembershipRecord>) -> (Vec<UserAssignment>, Vec<String>) {
    let mut users = Vec::new();
    let mut groups = Vec::new();
    for record in records {
        match record {
            MembershipRecord::User(u) => users.push(u),
            MembershipRecord::Group(g) => groups.push(g.id),
        }
    }
    (users, groups)
}

/// Diff summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of assignments to create
    pub additions: usize,
    /// Number of user credentials to update
    pub updates: usize,
    /// Number of assignments to delete
    pub removals: usize,
}

impl DiffSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.updates + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<&str> {
        items.iter().map(id).collect()
    }

    #[test]
    fn test_diff_users_add_update_remove() {
        let desired = vec![
            UserSpec::new("u1", "alice"),
            UserSpec::new("u2", "bobby"),
            UserSpec::new("u3", "carol"),
        ];
        let existing = vec![
            UserAssignment::direct("u4", "dave"),
            UserAssignment::direct("u2", "bob"),
            UserAssignment::direct("u3", "carol"),
            UserAssignment::direct("u5", "erin"),
        ];

        let diff = diff_users(&desired, &existing);
        assert_eq!(ids(&diff.to_add, |u| &u.id), vec!["u1"]);
        assert_eq!(ids(&diff.to_update, |u| &u.id), vec!["u2"]);
        assert_eq!(ids(&diff.to_remove, |u| &u.id), vec!["u4", "u5"]);
    }

    #[test]
    fn test_inherited_user_is_added_not_removed() {
        let desired = vec![UserSpec::new("u1", "alice")];
        let existing = vec![
            UserAssignment::inherited("u1"),
            UserAssignment::inherited("u9"),
        ];

        let diff = diff_users(&desired, &existing);
        assert_eq!(ids(&diff.to_add, |u| &u.id), vec!["u1"]);
        assert!(diff.to_update.is_empty());
        assert!(diff.to_remove.is_empty(), "inherited users are never removed");
    }

    #[test]
    fn test_no_update_without_existing_credentials() {
        let desired = vec![UserSpec::new("u1", "alice")];
        let mut existing = UserAssignment::direct("u1", "ignored");
        existing.credentials = None;

        let diff = diff_users(&desired, &[existing]);
        assert_eq!(diff, UserDiff::default());
    }

    #[test]
    fn test_password_only_change_is_not_an_update() {
        let desired = vec![UserSpec::new("u1", "alice").with_password("new")];
        let existing = vec![UserAssignment::direct("u1", "alice")];
        assert!(diff_users(&desired, &existing).to_update.is_empty());
    }

    #[test]
    fn test_diff_groups_preserves_order() {
        let desired = vec!["g3".to_string(), "g1".to_string(), "g4".to_string()];
        let existing = vec!["g2".to_string(), "g1".to_string(), "g0".to_string()];

        let diff = diff_groups(&desired, &existing);
        assert_eq!(diff.to_add, vec!["g3", "g4"]);
        assert_eq!(diff.to_remove, vec!["g2", "g0"]);
    }

    #[test]
    fn test_applying_diff_reaches_desired() {
        let desired = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let existing = vec!["b".to_string(), "d".to_string()];
        let diff = diff_groups(&desired, &existing);

        let mut result: HashSet<String> = existing.into_iter().collect();
        for id in &diff.to_remove {
            result.remove(id);
        }
        result.extend(diff.to_add);
        assert_eq!(result, desired.into_iter().collect());
    }

    #[test]
    fn test_identical_sets_produce_empty_diff() {
        let desired = DesiredMembership {
            users: vec![UserSpec::new("u1", "alice")],
            groups: vec!["g1".into()],
        };
        let diff = MembershipDiff::compute(
            &desired,
            &[UserAssignment::direct("u1", "alice")],
            &["g1".to_string()],
        );
        assert!(diff.is_empty());
        assert_eq!(diff.summary().total(), 0);
    }

    #[test]
    fn test_split_records() {
        use crate::types::GroupAssignment;

        let records = vec![
            MembershipRecord::User(UserAssignment::direct("u1", "alice")),
            MembershipRecord::Group(GroupAssignment { id: "g1".into() }),
        ];
        let (users, groups) = split_records(records);
        assert_eq!(users.len(), 1);
        assert_eq!(groups, vec!["g1"]);
    }
}
