//! Doctorate admission workflow: the proposition lifecycle from the
//! candidate's draft through supervisory-group signatures to the CDD and SIC
//! decisions, with the staff checklist, audit trail, and notifications.

pub mod checklist;
pub mod domain;
pub mod export;
pub mod history;
pub mod listing;
pub mod notification;
pub mod repository;
pub mod router;
pub mod service;
pub mod supervision;

#[cfg(test)]
mod tests;

pub use checklist::{
    Checklist, ChecklistFilterMode, ChecklistFilters, ChecklistMatcher, ChecklistStatus,
    ChecklistTab, StatusCatalog, StatusConfig, TabCatalog, TabState,
};
pub use domain::{
    AdmissionType, CandidateSnapshot, Proposition, PropositionId, PropositionStatus,
    TrainingSnapshot,
};
pub use export::{listing_to_csv, ExportError};
pub use history::{HistoryEntry, HistoryError, HistoryRecorder, HistoryStore};
pub use listing::{run_query, ListingPage, ListingQuery, ListingRow, SortField};
pub use notification::{NotificationError, NotificationPublisher, Notifier, OutboundMessage};
pub use repository::{
    AdmissionRecord, AdmissionRepository, AdmissionStatusView, QueuedTask, RepositoryError,
    TaskError, TaskKind, TaskQueue,
};
pub use router::admission_router;
pub use service::{AdmissionError, AdmissionService, InitiateCommand, SignatoryOpinion};
pub use supervision::{
    SignatoryId, SignatoryRole, Signature, SignatureState, SupervisionError, SupervisionGroup,
};
