use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};

use super::checklist::{Checklist, ChecklistTab, StatusCatalog, StatusConfig, EXPERIENCE_ID_KEY};
use super::domain::{
    AdmissionType, CandidateSnapshot, Proposition, PropositionId, PropositionStatus,
    TrainingSnapshot,
};
use super::history::{HistoryEntry, HistoryError, HistoryRecorder, HistoryStore};
use super::notification::{NotificationError, NotificationPublisher, Notifier};
use super::repository::{
    AdmissionRecord, AdmissionRepository, QueuedTask, RepositoryError, TaskError, TaskKind,
    TaskQueue,
};
use super::supervision::{SignatoryId, SignatoryRole, SupervisionError, SupervisionGroup};

/// Payload creating a new draft proposition.
#[derive(Debug, Clone)]
pub struct InitiateCommand {
    pub admission_type: AdmissionType,
    pub candidate: CandidateSnapshot,
    pub training: TrainingSnapshot,
    pub author: String,
}

/// Opinion given by one signatory of the supervisory group.
#[derive(Debug, Clone)]
pub enum SignatoryOpinion {
    Approve {
        internal_comment: Option<String>,
        external_comment: Option<String>,
    },
    ApproveByPdf {
        pdf: Vec<String>,
    },
    Decline {
        internal_comment: Option<String>,
        external_comment: Option<String>,
        refusal_reason: Option<String>,
    },
}

/// Error raised by the admission service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("proposition not found")]
    PropositionNotFound,
    #[error("operation not allowed while the proposition is \"{}\"", .0.label())]
    InvalidStatus(PropositionStatus),
    #[error("the supervisory group needs at least one promoter and two committee members")]
    IncompleteSupervisionGroup,
    #[error("unknown checklist status \"{identifier}\" for tab \"{tab}\"")]
    UnknownChecklistStatus { tab: &'static str, identifier: String },
    #[error("the tab \"{}\" cannot be set directly", ChecklistTab::PastExperienceItems.label())]
    VirtualTab,
    #[error("curriculum experience not found")]
    ExperienceNotFound,
    #[error("every curriculum experience must be validated first")]
    ExperienceStatusesNotValid,
    #[error("an access condition must be selected first")]
    AccessConditionNotSelected,
    #[error(transparent)]
    Supervision(#[from] SupervisionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl AdmissionError {
    /// HTTP status this error maps to at the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PropositionNotFound | Self::ExperienceNotFound => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Supervision(
                SupervisionError::SignatoryNotFound
                | SupervisionError::PromoterNotFound
                | SupervisionError::MemberNotFound,
            ) => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::Conflict) | Self::InvalidStatus(_) => {
                StatusCode::CONFLICT
            }
            Self::Supervision(_) => StatusCode::CONFLICT,
            Self::IncompleteSupervisionGroup
            | Self::UnknownChecklistStatus { .. }
            | Self::VirtualTab
            | Self::ExperienceStatusesNotValid
            | Self::AccessConditionNotSelected => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Repository(RepositoryError::Unavailable(_))
            | Self::History(_)
            | Self::Notification(_)
            | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

static REFERENCE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_reference(year: i32) -> String {
    let seq = REFERENCE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("DOC-{year}-{seq:06}")
}

/// Service composing the repository, audit trail, notifier, and task queue
/// behind the admission workflow operations.
pub struct AdmissionService<R, H, N, Q> {
    repository: Arc<R>,
    history: HistoryRecorder<Arc<H>>,
    notifier: Notifier<Arc<N>>,
    tasks: Arc<Q>,
    catalog: StatusCatalog,
}

impl<R, H, N, Q> AdmissionService<R, H, N, Q>
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    pub fn new(
        repository: Arc<R>,
        history: Arc<H>,
        publisher: Arc<N>,
        tasks: Arc<Q>,
        sender_email: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            history: HistoryRecorder::new(history),
            notifier: Notifier::new(publisher, sender_email),
            tasks,
            catalog: StatusCatalog::standard(),
        }
    }

    pub fn catalog(&self) -> &StatusCatalog {
        &self.catalog
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Create a draft proposition. The checklist stays empty until the
    /// candidate submits.
    pub fn initiate(&self, command: InitiateCommand) -> Result<AdmissionRecord, AdmissionError> {
        let now = Utc::now();
        let id = PropositionId::random();
        let proposition = Proposition {
            id: id.clone(),
            reference: next_reference(now.year()),
            admission_type: command.admission_type,
            candidate: command.candidate,
            training: command.training,
            status: PropositionStatus::Draft,
            checklist: Checklist::default(),
            access_condition: None,
            created_at: now,
            modified_at: now,
            modified_by: command.author.clone(),
            submitted_at: None,
        };

        tracing::info!(reference = %proposition.reference, "initiating admission proposition");
        self.history.initiated(&proposition, &command.author, now)?;

        let record = self.repository.insert(AdmissionRecord {
            proposition,
            supervision: SupervisionGroup::for_proposition(id),
        })?;
        Ok(record)
    }

    pub fn get(&self, id: &PropositionId) -> Result<AdmissionRecord, AdmissionError> {
        self.repository
            .fetch(id)?
            .ok_or(AdmissionError::PropositionNotFound)
    }

    pub fn history(&self, id: &PropositionId) -> Result<Vec<HistoryEntry>, AdmissionError> {
        self.get(id)?;
        Ok(self.history.store().entries(id)?)
    }

    pub fn add_promoter(
        &self,
        id: &PropositionId,
        signatory: SignatoryId,
        display_name: &str,
        email: &str,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.editable(id)?;
        record.supervision.add_promoter(signatory, display_name, email)?;
        record.proposition.touch(author, Utc::now());
        self.repository.update(record)?;
        Ok(())
    }

    pub fn add_committee_member(
        &self,
        id: &PropositionId,
        signatory: SignatoryId,
        display_name: &str,
        email: &str,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.editable(id)?;
        record.supervision.add_member(signatory, display_name, email)?;
        record.proposition.touch(author, Utc::now());
        self.repository.update(record)?;
        Ok(())
    }

    pub fn designate_lead_promoter(
        &self,
        id: &PropositionId,
        signatory: SignatoryId,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.editable(id)?;
        record.supervision.designate_lead_promoter(signatory)?;
        record.proposition.touch(author, Utc::now());
        self.repository.update(record)?;
        Ok(())
    }

    pub fn remove_promoter(
        &self,
        id: &PropositionId,
        signatory: &SignatoryId,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.editable(id)?;
        record.supervision.remove_promoter(signatory)?;
        record.proposition.touch(author, Utc::now());
        self.repository.update(record)?;
        Ok(())
    }

    pub fn remove_committee_member(
        &self,
        id: &PropositionId,
        signatory: &SignatoryId,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.editable(id)?;
        record.supervision.remove_member(signatory)?;
        record.proposition.touch(author, Utc::now());
        self.repository.update(record)?;
        Ok(())
    }

    /// Send the signature requests: every pending signatory is invited, the
    /// proposition is locked, and the candidate gets a recap.
    pub fn request_signatures(
        &self,
        id: &PropositionId,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.editable(id)?;
        if record.supervision.promoters.is_empty() || record.supervision.members.len() < 2 {
            return Err(AdmissionError::IncompleteSupervisionGroup);
        }

        let now = Utc::now();
        let invited = record.supervision.invite_all();
        record.proposition.status = PropositionStatus::AwaitingSignatures;
        record.proposition.touch(author, now);

        let invited_signatures: Vec<_> = invited
            .iter()
            .filter_map(|signatory| record.supervision.signature(signatory))
            .collect();
        self.notifier
            .signature_requests(&record.proposition, &invited_signatures)?;
        self.history
            .signatures_requested(&record.proposition, author, now)?;

        tracing::info!(
            reference = %record.proposition.reference,
            invited = invited.len(),
            "signature requests sent",
        );
        self.repository.update(record)?;
        Ok(())
    }

    /// Record one signatory's opinion. A promoter decline reopens the draft
    /// and resets the other promoter signatures.
    pub fn record_opinion(
        &self,
        id: &PropositionId,
        signatory: &SignatoryId,
        opinion: SignatoryOpinion,
    ) -> Result<(), AdmissionError> {
        let mut record = self.get(id)?;
        if record.proposition.status != PropositionStatus::AwaitingSignatures {
            return Err(AdmissionError::InvalidStatus(record.proposition.status));
        }

        let now = Utc::now();
        match opinion {
            SignatoryOpinion::Approve {
                internal_comment,
                external_comment,
            } => {
                let role = record.supervision.approve(
                    signatory,
                    internal_comment.as_deref(),
                    external_comment.as_deref(),
                )?;
                let signature = record
                    .supervision
                    .signature(signatory)
                    .ok_or(SupervisionError::SignatoryNotFound)?
                    .clone();
                self.history
                    .opinion_recorded(&record.proposition, &signature, role, true, now)?;
            }
            SignatoryOpinion::ApproveByPdf { pdf } => {
                let role = record.supervision.approve_by_pdf(signatory, pdf)?;
                let signature = record
                    .supervision
                    .signature(signatory)
                    .ok_or(SupervisionError::SignatoryNotFound)?
                    .clone();
                self.history
                    .opinion_recorded(&record.proposition, &signature, role, true, now)?;
            }
            SignatoryOpinion::Decline {
                internal_comment,
                external_comment,
                refusal_reason,
            } => {
                // The member signature disappears on decline, so snapshot the
                // details before applying.
                let mut signature = record
                    .supervision
                    .signature(signatory)
                    .ok_or(SupervisionError::SignatoryNotFound)?
                    .clone();
                signature.external_comment = external_comment.clone().unwrap_or_default();

                let role = record.supervision.decline(
                    signatory,
                    internal_comment.as_deref(),
                    external_comment.as_deref(),
                    refusal_reason.as_deref(),
                )?;
                self.history
                    .opinion_recorded(&record.proposition, &signature, role, false, now)?;
                self.notifier
                    .signature_declined(&record.proposition, &signature)?;

                if role == SignatoryRole::Promoter {
                    record.proposition.status = PropositionStatus::Draft;
                    self.history
                        .status_changed(&record.proposition, &signature.display_name, now)?;
                }
            }
        }

        record.proposition.touch(&signatory.0, now);
        self.repository.update(record)?;
        Ok(())
    }

    /// Candidate submission: requires every signature, stamps the submission
    /// date, and seeds the staff checklist from the curriculum.
    pub fn submit(
        &self,
        id: &PropositionId,
        experience_ids: &[String],
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.get(id)?;
        if record.proposition.status != PropositionStatus::AwaitingSignatures {
            return Err(AdmissionError::InvalidStatus(record.proposition.status));
        }
        record.supervision.verify_all_approved()?;

        let now = Utc::now();
        record.proposition.status = PropositionStatus::Confirmed;
        record.proposition.checklist = Checklist::initial(experience_ids);
        record.proposition.submitted_at = Some(now);
        record.proposition.touch(author, now);

        self.notifier.submitted(&record.proposition)?;
        self.history.submitted(&record.proposition, author, now)?;

        tracing::info!(reference = %record.proposition.reference, "proposition submitted");
        self.repository.update(record)?;
        Ok(())
    }

    /// A CDD manager takes the file in charge.
    pub fn cdd_take_charge(&self, id: &PropositionId, author: &str) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(
            id,
            &[PropositionStatus::Confirmed, PropositionStatus::ToCompleteForCdd],
        )?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::CddProcessing;
        self.apply_tab_config(&mut record, ChecklistTab::CddDecision, "TAKEN_IN_CHARGE")?;
        record.proposition.touch(author, now);
        self.history.status_changed(&record.proposition, author, now)?;
        self.repository.update(record)?;
        Ok(())
    }

    /// Favourable CDD decision: the file moves on to management validation.
    pub fn cdd_approve(&self, id: &PropositionId, author: &str) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(id, &[PropositionStatus::CddProcessing])?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::AwaitingManagementValidation;
        self.apply_tab_config(&mut record, ChecklistTab::CddDecision, "APPROVAL")?;
        record.proposition.touch(author, now);
        self.notifier.cdd_approval(&record.proposition)?;
        self.history.status_changed(&record.proposition, author, now)?;
        self.repository.update(record)?;
        Ok(())
    }

    /// Negative CDD decision, with the motives sent to the candidate. The
    /// file returns to the SIC which holds the final say.
    pub fn cdd_refuse(
        &self,
        id: &PropositionId,
        reasons: &[String],
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(id, &[PropositionStatus::CddProcessing])?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::ReturnedFromCdd;
        self.apply_tab_config(&mut record, ChecklistTab::CddDecision, "REFUSAL")?;
        record.proposition.touch(author, now);
        self.notifier.cdd_refusal(&record.proposition, reasons)?;
        self.history.status_changed(&record.proposition, author, now)?;
        self.repository.update(record)?;
        Ok(())
    }

    pub fn cdd_close(&self, id: &PropositionId, author: &str) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(id, &[PropositionStatus::CddProcessing])?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::Closed;
        self.apply_tab_config(&mut record, ChecklistTab::CddDecision, "CLOSED")?;
        record.proposition.touch(author, now);
        self.history.status_changed(&record.proposition, author, now)?;
        self.repository.update(record)?;
        Ok(())
    }

    /// The file is out of the CDD's scope and goes back to the SIC for
    /// completion.
    pub fn cdd_send_back_to_sic(
        &self,
        id: &PropositionId,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(id, &[PropositionStatus::CddProcessing])?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::ToCompleteForSic;
        self.apply_tab_config(&mut record, ChecklistTab::CddDecision, "TO_COMPLETE_BY_SIC")?;
        record.proposition.touch(author, now);
        self.history.status_changed(&record.proposition, author, now)?;
        self.repository.update(record)?;
        Ok(())
    }

    /// Final central-administration approval: enrollment is authorized and
    /// the recap PDF generation is queued for a worker.
    pub fn sic_approve(&self, id: &PropositionId, author: &str) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(
            id,
            &[
                PropositionStatus::AwaitingManagementValidation,
                PropositionStatus::ReturnedFromCdd,
            ],
        )?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::EnrollmentAuthorized;
        self.apply_tab_config(&mut record, ChecklistTab::SicDecision, "APPROVED")?;
        record.proposition.touch(author, now);
        self.notifier.sic_approval(&record.proposition)?;
        self.history.status_changed(&record.proposition, author, now)?;
        self.tasks.enqueue(QueuedTask {
            kind: TaskKind::GenerateRecapPdf,
            proposition_id: record.proposition.id.clone(),
        })?;
        self.repository.update(record)?;
        Ok(())
    }

    pub fn sic_refuse(&self, id: &PropositionId, author: &str) -> Result<(), AdmissionError> {
        let mut record = self.expect_status(
            id,
            &[
                PropositionStatus::AwaitingManagementValidation,
                PropositionStatus::ReturnedFromCdd,
            ],
        )?;
        let now = Utc::now();
        record.proposition.status = PropositionStatus::EnrollmentRefused;
        self.apply_tab_config(&mut record, ChecklistTab::SicDecision, "REFUSED")?;
        record.proposition.touch(author, now);
        self.notifier.sic_refusal(&record.proposition)?;
        self.history.status_changed(&record.proposition, author, now)?;
        self.repository.update(record)?;
        Ok(())
    }

    /// Ask the management board for a dispensation, recording the requested
    /// sub-state on the SIC decision tab.
    pub fn sic_request_dispensation(
        &self,
        id: &PropositionId,
        dispensation_state: &str,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let identifier = format!("DISPENSATION_NEEDED.{dispensation_state}");
        self.set_tab_status(id, ChecklistTab::SicDecision, &identifier, author)
    }

    /// Move one checklist tab to a catalog status. Unknown identifiers are
    /// rejected rather than written through.
    pub fn set_tab_status(
        &self,
        id: &PropositionId,
        tab: ChecklistTab,
        identifier: &str,
        author: &str,
    ) -> Result<(), AdmissionError> {
        if !tab.is_stored() {
            return Err(AdmissionError::VirtualTab);
        }
        let mut record = self.get(id)?;

        let config = self.resolve_config(tab, identifier)?;
        if tab == ChecklistTab::PastExperience
            && config.status.is_some_and(|status| status.is_success())
        {
            // The past-experience tab only turns green once every experience
            // fragment is validated and an access condition was picked.
            if !record.proposition.checklist.all_experiences_validated() {
                return Err(AdmissionError::ExperienceStatusesNotValid);
            }
            if record.proposition.access_condition.is_none() {
                return Err(AdmissionError::AccessConditionNotSelected);
            }
        }

        let now = Utc::now();
        let state = record.proposition.checklist.tab_mut(tab);
        state.status = config.status;
        state.label = config.label.clone();
        state.extra = config.extra.clone();

        record.proposition.touch(author, now);
        self.history.checklist_updated(
            &record.proposition,
            tab.label(),
            &config.label,
            author,
            now,
        )?;
        self.repository.update(record)?;
        Ok(())
    }

    /// Move one curriculum-experience fragment to a catalog status of the
    /// past-experience items tab.
    pub fn set_experience_status(
        &self,
        id: &PropositionId,
        experience_id: &str,
        identifier: &str,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.get(id)?;
        let config = self.resolve_config(ChecklistTab::PastExperienceItems, identifier)?;

        let now = Utc::now();
        let fragment = record
            .proposition
            .checklist
            .experience_mut(experience_id)
            .ok_or(AdmissionError::ExperienceNotFound)?;

        if let Some(status) = config.status {
            fragment.status = Some(status);
        }
        fragment.label = config.label.clone();
        let mut extra: BTreeMap<String, String> = config.extra.clone();
        extra.insert(EXPERIENCE_ID_KEY.to_string(), experience_id.to_string());
        fragment.extra = extra;

        record.proposition.touch(author, now);
        self.history.checklist_updated(
            &record.proposition,
            ChecklistTab::PastExperienceItems.label(),
            &config.label,
            author,
            now,
        )?;
        self.repository.update(record)?;
        Ok(())
    }

    pub fn set_access_condition(
        &self,
        id: &PropositionId,
        condition: &str,
        author: &str,
    ) -> Result<(), AdmissionError> {
        let mut record = self.get(id)?;
        record.proposition.access_condition = Some(condition.to_string());
        record.proposition.touch(author, Utc::now());
        self.repository.update(record)?;
        Ok(())
    }

    fn editable(&self, id: &PropositionId) -> Result<AdmissionRecord, AdmissionError> {
        let record = self.get(id)?;
        if record.proposition.status != PropositionStatus::Draft {
            return Err(AdmissionError::InvalidStatus(record.proposition.status));
        }
        Ok(record)
    }

    fn expect_status(
        &self,
        id: &PropositionId,
        allowed: &[PropositionStatus],
    ) -> Result<AdmissionRecord, AdmissionError> {
        let record = self.get(id)?;
        if !allowed.contains(&record.proposition.status) {
            return Err(AdmissionError::InvalidStatus(record.proposition.status));
        }
        Ok(record)
    }

    fn resolve_config(
        &self,
        tab: ChecklistTab,
        identifier: &str,
    ) -> Result<StatusConfig, AdmissionError> {
        let tab_catalog =
            self.catalog
                .tab(tab)
                .ok_or_else(|| AdmissionError::UnknownChecklistStatus {
                    tab: tab.label(),
                    identifier: identifier.to_string(),
                })?;
        let config = tab_catalog
            .get(identifier)
            .ok_or_else(|| AdmissionError::UnknownChecklistStatus {
                tab: tab.label(),
                identifier: identifier.to_string(),
            })?;

        // Sub-states carry no status of their own: store them merged with
        // their parent so the fragment stays self-describing.
        let config = match config.parent.as_deref().and_then(|id| tab_catalog.get(id)) {
            Some(parent) => config.merged_with(parent),
            None => config.clone(),
        };
        Ok(config)
    }

    fn apply_tab_config(
        &self,
        record: &mut AdmissionRecord,
        tab: ChecklistTab,
        identifier: &str,
    ) -> Result<(), AdmissionError> {
        let config = self.resolve_config(tab, identifier)?;
        let state = record.proposition.checklist.tab_mut(tab);
        state.status = config.status;
        state.label = config.label;
        state.extra = config.extra;
        Ok(())
    }
}
