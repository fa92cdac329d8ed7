//! Provider traits for execution feedback
//!
//! These traits allow the membership crate to be used without
//! depending on a specific progress bar or terminal UI.

use crate::outcome::OperationOutcome;
use crate::plan::OperationKind;

/// Progress callback for execution passes
///
/// Methods take `&self` and may be called concurrently from worker
/// threads, so implementations must be thread-safe.
pub trait ProgressCallback: Send + Sync {
    /// Called once before any operation of a pass runs
    fn on_batch_start(&self, count: usize);

    /// Called when a worker picks up an operation
    fn on_operation_start(&self, kind: OperationKind, member_id: &str);

    /// Called when an operation finishes, successfully or not
    fn on_operation_complete(&self, outcome: &OperationOutcome);

    /// Called once after every operation of a pass finished
    fn on_batch_complete(&self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&self, _count: usize) {}
    fn on_operation_start(&self, _kind: OperationKind, _member_id: &str) {}
    fn on_operation_complete(&self, _outcome: &OperationOutcome) {}
    fn on_batch_complete(&self) {}
}

/// Progress callback that writes each outcome to the log
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_batch_start(&self, count: usize) {
        log::info!("Applying {count} membership operations");
    }

    fn on_operation_start(&self, kind: OperationKind, member_id: &str) {
        log::debug!("Starting {kind} {member_id}");
    }

    fn on_operation_complete(&self, outcome: &OperationOutcome) {
        match &outcome.error {
            None => log::debug!("Finished {} {}", outcome.kind, outcome.member_id),
            Some(e) => log::warn!("{} {} failed: {}", outcome.kind, outcome.member_id, e),
        }
    }

    fn on_batch_complete(&self) {
        log::info!("Membership operations complete");
    }
}
