//! # Membership
//!
//! Reconciles the user and group assignments of an identity-provider
//! application against a remote directory.
//!
//! ## Core Concepts
//!
//! - **Directory**: the remote platform, behind the [`Directory`] trait
//! - **MembershipDiff**: additions, updates and removals computed by id
//! - **Operation**: a deferred create/update/delete call built from the diff
//! - **Executor**: runs operations with bounded parallelism, never stopping early
//! - **AggregatedResult**: every outcome, collapsed into one error on failure
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use membership::directory::{Directory, MockDirectory};
//! use membership::{
//!     AppStatus, DesiredMembership, NoProgress, UserAssignment, UserSpec, sync_memberships,
//! };
//!
//! let mock = MockDirectory::new()
//!     .with_app("0oa1", AppStatus::Active)
//!     .with_user("0oa1", UserAssignment::direct("u2", "bob"));
//! let dir: Arc<dyn Directory> = Arc::new(mock);
//!
//! let desired = DesiredMembership {
//!     users: vec![UserSpec::new("u1", "alice")],
//!     groups: vec!["g1".into()],
//! };
//! let summary = sync_memberships(&dir, "0oa1", &desired, 4, &NoProgress).unwrap();
//! assert_eq!(summary.created, 2);
//! assert_eq!(summary.removed, 1);
//! ```
//!
//! ## Provider Traits
//!
//! - [`Directory`]: the remote platform ([`directory::rest::RestDirectory`]
//!   or [`directory::MockDirectory`])
//! - [`ProgressCallback`]: receives progress updates from worker threads

pub mod app;
pub mod context;
pub mod diff;
pub mod directory;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod plan;
pub mod retry;
pub mod settings;
pub mod status;
pub mod sync;
pub mod types;

// Re-export main types at crate root
pub use app::{AppProfile, SignOnMode};
pub use context::{LogProgress, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, GroupDiff, MembershipDiff, UserDiff, diff_groups, diff_users};
pub use directory::Directory;
pub use error::{Error, ErrorCategory, Result};
pub use executor::{execute, execute_simple};
pub use outcome::{AggregatedResult, OperationFailure, OperationOutcome, Summary};
pub use plan::{Operation, OperationKind, build_operations};
pub use retry::RetryConfig;
pub use settings::{AppSettings, SettingValue};
pub use status::{StatusChange, deactivate_then_delete, reconcile_status};
pub use sync::{
    MembershipPlan, SyncReport, current_membership, plan_memberships,
    reconcile_memberships_and_status, sync_memberships,
};
pub use types::{
    AppStatus, Credentials, DEFAULT_PARALLELISM, DesiredApp, DesiredMembership, GroupAssignment,
    MemberKind, MembershipRecord, Page, Scope, SyncOptions, UserAssignment, UserSpec,
};
