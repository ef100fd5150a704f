use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checklist::Checklist;

/// Identifier wrapper for admission propositions (UUID string on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropositionId(pub String);

impl PropositionId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Admission track requested by the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionType {
    Admission,
    PreAdmission,
}

impl AdmissionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admission => "Admission",
            Self::PreAdmission => "Pre-admission",
        }
    }
}

/// Lifecycle status of a proposition, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropositionStatus {
    Draft,
    AwaitingSignatures,
    Confirmed,
    CddProcessing,
    ToCompleteForCdd,
    ReturnedFromCdd,
    SicProcessing,
    ToCompleteForSic,
    AwaitingManagementValidation,
    EnrollmentAuthorized,
    EnrollmentRefused,
    Closed,
    Cancelled,
}

impl PropositionStatus {
    pub const fn ordered() -> [Self; 13] {
        [
            Self::Draft,
            Self::AwaitingSignatures,
            Self::Confirmed,
            Self::CddProcessing,
            Self::ToCompleteForCdd,
            Self::ReturnedFromCdd,
            Self::SicProcessing,
            Self::ToCompleteForSic,
            Self::AwaitingManagementValidation,
            Self::EnrollmentAuthorized,
            Self::EnrollmentRefused,
            Self::Closed,
            Self::Cancelled,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::AwaitingSignatures => "Awaiting signatures",
            Self::Confirmed => "Confirmed",
            Self::CddProcessing => "Processing by CDD",
            Self::ToCompleteForCdd => "To be completed for CDD",
            Self::ReturnedFromCdd => "Returned from CDD",
            Self::SicProcessing => "Processing by SIC",
            Self::ToCompleteForSic => "To be completed for SIC",
            Self::AwaitingManagementValidation => "Awaiting management validation",
            Self::EnrollmentAuthorized => "Enrollment authorized",
            Self::EnrollmentRefused => "Enrollment refused",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Position used when the listing sorts on status (workflow order, not
    /// alphabetical).
    pub fn workflow_order(self) -> usize {
        Self::ordered()
            .iter()
            .position(|status| *status == self)
            .unwrap_or(usize::MAX)
    }
}

/// Candidate identity captured on the proposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub registration_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl CandidateSnapshot {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Training (program) the candidate applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub acronym: String,
    pub title: String,
    pub academic_year: i32,
}

/// The admission application entity tracked through the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposition {
    pub id: PropositionId,
    pub reference: String,
    pub admission_type: AdmissionType,
    pub candidate: CandidateSnapshot,
    pub training: TrainingSnapshot,
    pub status: PropositionStatus,
    pub checklist: Checklist,
    /// Access condition selected by the manager, required before the past
    /// experience tab can be marked sufficient.
    pub access_condition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub modified_by: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Proposition {
    pub fn is_in_progress(&self) -> bool {
        self.status != PropositionStatus::Cancelled
    }

    pub fn is_locked_for_signature(&self) -> bool {
        self.status == PropositionStatus::AwaitingSignatures
    }

    pub(crate) fn touch(&mut self, author: &str, now: DateTime<Utc>) {
        self.modified_at = now;
        self.modified_by = author.to_string();
    }
}
