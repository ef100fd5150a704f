use serde::{Deserialize, Serialize};

use super::domain::{Proposition, PropositionId, PropositionStatus};
use super::supervision::SupervisionGroup;

/// Repository record: the proposition and its supervisory group, persisted
/// together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub proposition: Proposition,
    pub supervision: SupervisionGroup,
}

impl AdmissionRecord {
    pub fn status_view(&self) -> AdmissionStatusView {
        AdmissionStatusView {
            proposition_id: self.proposition.id.clone(),
            reference: self.proposition.reference.clone(),
            status: self.proposition.status.label(),
            candidate: self.proposition.candidate.display_name(),
            training: self.proposition.training.acronym.clone(),
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait AdmissionRepository: Send + Sync {
    fn insert(&self, record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError>;
    fn update(&self, record: AdmissionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &PropositionId) -> Result<Option<AdmissionRecord>, RepositoryError>;
    fn list(&self) -> Result<Vec<AdmissionRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Background work handed off to an async worker outside the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    GenerateRecapPdf,
    MergeDocuments,
}

impl TaskKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::GenerateRecapPdf => "Generate the admission recap PDF",
            Self::MergeDocuments => "Merge the admission documents",
        }
    }
}

/// Task payload queued for a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub kind: TaskKind,
    pub proposition_id: PropositionId,
}

/// Trait describing the async-task hand-off boundary.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskError>;
}

/// Task dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task queue unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of a proposition's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionStatusView {
    pub proposition_id: PropositionId,
    pub reference: String,
    pub status: &'static str,
    pub candidate: String,
    pub training: String,
}

impl From<&Proposition> for AdmissionStatusView {
    fn from(proposition: &Proposition) -> Self {
        Self {
            proposition_id: proposition.id.clone(),
            reference: proposition.reference.clone(),
            status: proposition.status.label(),
            candidate: proposition.candidate.display_name(),
            training: proposition.training.acronym.clone(),
        }
    }
}

/// Convenience used by listing and tests to keep status comparisons readable.
pub fn is_terminal(status: PropositionStatus) -> bool {
    matches!(
        status,
        PropositionStatus::EnrollmentAuthorized
            | PropositionStatus::EnrollmentRefused
            | PropositionStatus::Closed
            | PropositionStatus::Cancelled
    )
}
