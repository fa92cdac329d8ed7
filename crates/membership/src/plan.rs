//! Operation builder
//!
//! Turns a [`MembershipDiff`] into a flat list of deferred operations. No
//! directory call happens until an operation is run. Every operation owns
//! copies of the ids and credentials it needs plus its own handle to the
//! directory, so operations share nothing and can run in any order.

use crate::diff::MembershipDiff;
use crate::directory::Directory;
use crate::error::Result;
use crate::types::{Credentials, MemberKind};
use std::fmt;
use std::sync::Arc;

/// What an operation does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateGroup,
    DeleteGroup,
}

impl OperationKind {
    pub fn member_kind(&self) -> MemberKind {
        match self {
            Self::CreateUser | Self::UpdateUser | Self::DeleteUser => MemberKind::User,
            Self::CreateGroup | Self::DeleteGroup => MemberKind::Group,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::CreateUser | Self::CreateGroup => "create",
            Self::UpdateUser => "update",
            Self::DeleteUser | Self::DeleteGroup => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.member_kind())
    }
}

/// Deferred, parameterless directory call
pub type Thunk = Box<dyn FnOnce() -> Result<()> + Send>;

/// A named deferred operation
pub struct Operation {
    pub kind: OperationKind,
    pub member_id: String,
    run: Thunk,
}

impl Operation {
    pub fn new(kind: OperationKind, member_id: impl Into<String>, run: Thunk) -> Self {
        Self {
            kind,
            member_id: member_id.into(),
            run,
        }
    }

    /// Run the operation, consuming it
    pub fn run(self) -> Result<()> {
        (self.run)()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("member_id", &self.member_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.member_id)
    }
}

/// Build one operation per change, groups first
pub fn build_operations(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    diff: &MembershipDiff,
) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(diff.summary().total());

    for group_id in &diff.groups.to_add {
        ops.push(create_op(dir, app_id, group_id, MemberKind::Group, None));
    }
    for group_id in &diff.groups.to_remove {
        ops.push(delete_op(dir, app_id, group_id, MemberKind::Group));
    }
    for user in &diff.users.to_add {
        ops.push(create_op(
            dir,
            app_id,
            &user.id,
            MemberKind::User,
            Some(user.credentials()),
        ));
    }
    for user in &diff.users.to_update {
        ops.push(update_op(dir, app_id, &user.id, user.credentials()));
    }
    for user in &diff.users.to_remove {
        ops.push(delete_op(dir, app_id, &user.id, MemberKind::User));
    }

    ops
}

fn create_op(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    member_id: &str,
    kind: MemberKind,
    credentials: Option<Credentials>,
) -> Operation {
    let op_kind = match kind {
        MemberKind::User => OperationKind::CreateUser,
        MemberKind::Group => OperationKind::CreateGroup,
    };
    let dir = Arc::clone(dir);
    let app_id = app_id.to_string();
    let id = member_id.to_string();
    Operation::new(
        op_kind,
        member_id,
        Box::new(move || dir.create_assignment(&app_id, &id, kind, credentials.as_ref())),
    )
}

fn update_op(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    member_id: &str,
    credentials: Credentials,
) -> Operation {
    let dir = Arc::clone(dir);
    let app_id = app_id.to_string();
    let id = member_id.to_string();
    Operation::new(
        OperationKind::UpdateUser,
        member_id,
        Box::new(move || dir.update_assignment(&app_id, &id, MemberKind::User, &credentials)),
    )
}

/// Deletes treat a missing assignment as already gone
fn delete_op(
    dir: &Arc<dyn Directory>,
    app_id: &str,
    member_id: &str,
    kind: MemberKind,
) -> Operation {
    let op_kind = match kind {
        MemberKind::User => OperationKind::DeleteUser,
        MemberKind::Group => OperationKind::DeleteGroup,
    };
    let dir = Arc::clone(dir);
    let app_id = app_id.to_string();
    let id = member_id.to_string();
    Operation::new(
        op_kind,
        member_id,
        Box::new(move || match dir.delete_assignment(&app_id, &id, kind) {
            Err(e) if e.is_not_found() => {
                log::warn!("{kind} {id} was already unassigned from {app_id}");
                Ok(())
            }
            other => other,
        }),
    )
}
