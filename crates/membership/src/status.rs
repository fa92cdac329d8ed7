//! Status reconciliation and the deactivate-before-delete sequence

use crate::directory::Directory;
use crate::error::Result;
use crate::types::AppStatus;
use std::fmt;

/// What `reconcile_status` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Activated,
    Deactivated,
}

impl fmt::Display for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Activated => write!(f, "activated"),
            Self::Deactivated => write!(f, "deactivated"),
        }
    }
}

/// Bring the application status to `desired` with at most one call
pub fn reconcile_status(
    dir: &dyn Directory,
    app_id: &str,
    desired: AppStatus,
    current: AppStatus,
) -> Result<StatusChange> {
    if desired == current {
        log::debug!("{app_id} is already {current}");
        return Ok(StatusChange::Unchanged);
    }

    dir.set_status(app_id, desired)?;
    log::info!("{app_id}: {current} -> {desired}");
    Ok(match desired {
        AppStatus::Active => StatusChange::Activated,
        AppStatus::Inactive => StatusChange::Deactivated,
    })
}

/// Delete an application, deactivating it first when it is active
///
/// If deactivation fails its error is returned as is and no delete is
/// attempted.
pub fn deactivate_then_delete(dir: &dyn Directory, app_id: &str, current: AppStatus) -> Result<()> {
    if current == AppStatus::Active {
        dir.set_status(app_id, AppStatus::Inactive)?;
        log::info!("Deactivated {app_id}");
    }
    dir.delete_app(app_id)?;
    log::info!("Deleted {app_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Call, Failure, MockDirectory};
    use crate::error::Error;

    #[test]
    fn test_equal_status_is_a_no_op() {
        let mock = MockDirectory::new().with_app("app", AppStatus::Active);
        let change = reconcile_status(&mock, "app", AppStatus::Active, AppStatus::Active).unwrap();
        assert_eq!(change, StatusChange::Unchanged);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_deactivate_issues_exactly_one_call() {
        let mock = MockDirectory::new().with_app("app", AppStatus::Active);
        let change =
            reconcile_status(&mock, "app", AppStatus::Inactive, AppStatus::Active).unwrap();
        assert_eq!(change, StatusChange::Deactivated);
        assert_eq!(mock.calls(), vec![Call::SetStatus(AppStatus::Inactive)]);
        assert_eq!(mock.status("app"), Some(AppStatus::Inactive));
    }

    #[test]
    fn test_activate() {
        let mock = MockDirectory::new().with_app("app", AppStatus::Inactive);
        let change =
            reconcile_status(&mock, "app", AppStatus::Active, AppStatus::Inactive).unwrap();
        assert_eq!(change, StatusChange::Activated);
        assert_eq!(mock.status("app"), Some(AppStatus::Active));
    }

    #[test]
    fn test_deactivate_then_delete_sequence() {
        let mock = MockDirectory::new().with_app("app", AppStatus::Active);
        deactivate_then_delete(&mock, "app", AppStatus::Active).unwrap();
        assert_eq!(
            mock.calls(),
            vec![Call::SetStatus(AppStatus::Inactive), Call::DeleteApp]
        );
        assert_eq!(mock.status("app"), None);
    }

    #[test]
    fn test_inactive_app_is_deleted_directly() {
        let mock = MockDirectory::new().with_app("app", AppStatus::Inactive);
        deactivate_then_delete(&mock, "app", AppStatus::Inactive).unwrap();
        assert_eq!(mock.calls(), vec![Call::DeleteApp]);
    }

    #[test]
    fn test_failed_deactivate_skips_delete() {
        let mock = MockDirectory::new()
            .with_app("app", AppStatus::Active)
            .fail_on(Call::SetStatus(AppStatus::Inactive), Failure::Status(500));

        let err = deactivate_then_delete(&mock, "app", AppStatus::Active).unwrap_err();
        assert!(matches!(
            err,
            Error::Http {
                status: Some(500),
                ..
            }
        ));
        assert_eq!(mock.count_calls(|c| *c == Call::DeleteApp), 0);
        assert_eq!(mock.status("app"), Some(AppStatus::Active));
    }
}
