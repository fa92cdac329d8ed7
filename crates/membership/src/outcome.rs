//! Per-operation outcomes and their aggregation

use crate::error::{Error, Result};
use crate::plan::OperationKind;
use std::fmt;

/// Result of running one operation
#[derive(Debug)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    pub member_id: String,
    /// `None` on success
    pub error: Option<Error>,
}

impl OperationOutcome {
    pub fn success(kind: OperationKind, member_id: impl Into<String>) -> Self {
        Self {
            kind,
            member_id: member_id.into(),
            error: None,
        }
    }

    pub fn failure(kind: OperationKind, member_id: impl Into<String>, error: Error) -> Self {
        Self {
            kind,
            member_id: member_id.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A failed operation with its original error
#[derive(Debug)]
pub struct OperationFailure {
    pub kind: OperationKind,
    pub member_id: String,
    pub error: Error,
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.member_id, self.error)
    }
}

/// Counts of a finished pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.removed + self.failed
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.removed
    }

    pub fn merge(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Every outcome of a pass, in planned order
#[derive(Debug, Default)]
pub struct AggregatedResult {
    outcomes: Vec<OperationOutcome>,
}

impl AggregatedResult {
    pub fn new(outcomes: Vec<OperationOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[OperationOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(OperationOutcome::is_success)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in &self.outcomes {
            if !outcome.is_success() {
                summary.failed += 1;
                continue;
            }
            match outcome.kind {
                OperationKind::CreateUser | OperationKind::CreateGroup => summary.created += 1,
                OperationKind::UpdateUser => summary.updated += 1,
                OperationKind::DeleteUser | OperationKind::DeleteGroup => summary.removed += 1,
            }
        }
        summary
    }

    /// Collapse into one result
    ///
    /// `Ok(())` when every operation succeeded, otherwise an
    /// [`Error::Aggregate`] holding `context` and every failure.
    pub fn into_result(self, context: &str) -> Result<()> {
        let total = self.outcomes.len();
        let failures: Vec<OperationFailure> = self
            .outcomes
            .into_iter()
            .filter_map(|o| {
                o.error.map(|error| OperationFailure {
                    kind: o.kind,
                    member_id: o.member_id,
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        Err(Error::Aggregate {
            context: context.to_string(),
            failures,
            total,
        })
    }
}
