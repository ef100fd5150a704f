use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Proposition, PropositionId};
use super::supervision::{SignatoryRole, Signature};

/// One audit-trail line attached to a proposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub proposition_id: PropositionId,
    pub message: String,
    pub author: String,
    pub tags: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only audit-trail storage.
pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;
    fn entries(&self, id: &PropositionId) -> Result<Vec<HistoryEntry>, HistoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

impl<T: HistoryStore + ?Sized> HistoryStore for std::sync::Arc<T> {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        (**self).append(entry)
    }

    fn entries(&self, id: &PropositionId) -> Result<Vec<HistoryEntry>, HistoryError> {
        (**self).entries(id)
    }
}

pub const TAG_PROPOSITION: &str = "proposition";
pub const TAG_STATUS_CHANGED: &str = "status-changed";
pub const TAG_SIGNATURE: &str = "signature";
pub const TAG_MESSAGE: &str = "message";

/// Formats and appends the human-readable audit entries written alongside
/// each workflow operation.
pub struct HistoryRecorder<H> {
    store: H,
}

impl<H: HistoryStore> HistoryRecorder<H> {
    pub fn new(store: H) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &H {
        &self.store
    }

    fn record(
        &self,
        proposition: &Proposition,
        message: String,
        author: &str,
        tags: &[&str],
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.store.append(HistoryEntry {
            proposition_id: proposition.id.clone(),
            message,
            author: author.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            recorded_at: now,
        })
    }

    pub fn initiated(
        &self,
        proposition: &Proposition,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.record(
            proposition,
            format!(
                "The proposition {} has been initiated for {}.",
                proposition.reference,
                proposition.candidate.display_name(),
            ),
            author,
            &[TAG_PROPOSITION, TAG_STATUS_CHANGED],
            now,
        )
    }

    pub fn signatures_requested(
        &self,
        proposition: &Proposition,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.record(
            proposition,
            "Signature requests have been sent to the supervisory group.".to_string(),
            author,
            &[TAG_PROPOSITION, TAG_SIGNATURE, TAG_STATUS_CHANGED],
            now,
        )
    }

    pub fn opinion_recorded(
        &self,
        proposition: &Proposition,
        signature: &Signature,
        role: SignatoryRole,
        approved: bool,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        let verdict = if approved { "approved" } else { "declined" };
        self.record(
            proposition,
            format!(
                "{} ({}) has {} the proposition.",
                signature.display_name,
                role.label(),
                verdict,
            ),
            &signature.display_name,
            &[TAG_PROPOSITION, TAG_SIGNATURE],
            now,
        )
    }

    pub fn submitted(
        &self,
        proposition: &Proposition,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.record(
            proposition,
            format!(
                "The proposition {} has been submitted to the CDD.",
                proposition.reference,
            ),
            author,
            &[TAG_PROPOSITION, TAG_STATUS_CHANGED],
            now,
        )
    }

    pub fn status_changed(
        &self,
        proposition: &Proposition,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.record(
            proposition,
            format!(
                "The proposition moved to the status \"{}\".",
                proposition.status.label(),
            ),
            author,
            &[TAG_PROPOSITION, TAG_STATUS_CHANGED],
            now,
        )
    }

    pub fn checklist_updated(
        &self,
        proposition: &Proposition,
        tab_label: &str,
        status_label: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.record(
            proposition,
            format!("The tab \"{tab_label}\" moved to \"{status_label}\"."),
            author,
            &[TAG_PROPOSITION, TAG_STATUS_CHANGED],
            now,
        )
    }

    pub fn message_sent(
        &self,
        proposition: &Proposition,
        summary: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.record(
            proposition,
            format!("A message has been sent to the candidate: {summary}"),
            author,
            &[TAG_PROPOSITION, TAG_MESSAGE],
            now,
        )
    }
}
