//! Workflow policy seam.
//!
//! The fetched workflow file is handed to a [`WorkflowPolicy`] before a
//! report is produced. Content checks are not implemented yet; the default
//! policy records that nothing was evaluated.

use serde::Serialize;
use tracing::info;

use crate::provenance::Provenance;
use crate::types::WorkflowFile;

/// Outcome of a workflow policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PolicyOutcome {
    NotEvaluated,
    Passed,
    Rejected { reason: String },
}

/// Decides whether a workflow file is acceptable for the given provenance.
pub trait WorkflowPolicy: Send + Sync {
    fn evaluate(&self, provenance: &Provenance, workflow: &WorkflowFile) -> PolicyOutcome;
}

/// Accepts every workflow without inspecting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedWorkflow;

impl WorkflowPolicy for UnverifiedWorkflow {
    fn evaluate(&self, provenance: &Provenance, workflow: &WorkflowFile) -> PolicyOutcome {
        info!(
            repository = %provenance.path,
            workflow = %workflow.path,
            reference = %workflow.reference,
            bytes = workflow.content.len(),
            "workflow contents not evaluated"
        );
        PolicyOutcome::NotEvaluated
    }
}

impl<F> WorkflowPolicy for F
where
    F: Fn(&Provenance, &WorkflowFile) -> PolicyOutcome + Send + Sync,
{
    fn evaluate(&self, provenance: &Provenance, workflow: &WorkflowFile) -> PolicyOutcome {
        self(provenance, workflow)
    }
}
