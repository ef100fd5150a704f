use super::common::*;
use crate::workflows::admission::checklist::{ChecklistStatus, ChecklistTab};
use crate::workflows::admission::history::TAG_SIGNATURE;
use crate::workflows::admission::notification::{
    TPL_SIGNATURE_REFUSAL_CANDIDATE, TPL_SIGNATURE_REQUEST_ACTOR, TPL_SUBMISSION_CANDIDATE,
};
use crate::workflows::admission::repository::{AdmissionRepository, TaskKind};
use crate::workflows::admission::service::{AdmissionError, SignatoryOpinion};
use crate::workflows::admission::supervision::{SignatoryId, SignatureState, SupervisionError};
use crate::workflows::admission::PropositionStatus;

#[test]
fn initiate_creates_a_draft_with_a_reference() {
    let (service, repository, history, _, _) = build_service();
    let record = service.initiate(initiate_command()).expect("initiated");

    assert_eq!(record.proposition.status, PropositionStatus::Draft);
    assert!(record.proposition.reference.starts_with("DOC-"));
    assert!(record.proposition.submitted_at.is_none());
    assert!(record.proposition.checklist.experiences().is_empty());

    let stored = repository
        .fetch(&record.proposition.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.proposition.reference, record.proposition.reference);
    assert_eq!(history.all().len(), 1);
}

#[test]
fn request_signatures_requires_a_complete_group() {
    let (service, _, _, _, _) = build_service();
    let record = service.initiate(initiate_command()).expect("initiated");
    let id = record.proposition.id;
    service
        .add_promoter(&id, SignatoryId("p1".into()), "Alice Martin", "alice@uni.example", "manager")
        .expect("promoter added");

    match service.request_signatures(&id, "candidate") {
        Err(AdmissionError::IncompleteSupervisionGroup) => {}
        other => panic!("expected incomplete group, got {other:?}"),
    }
}

#[test]
fn request_signatures_locks_and_notifies() {
    let (service, repository, _, notifications, _) = build_service();
    let id = draft_with_group(&service);

    service.request_signatures(&id, "candidate").expect("requested");
    assert_eq!(status_of(&repository, &id), PropositionStatus::AwaitingSignatures);

    let messages = notifications.messages();
    let actor_invites = messages
        .iter()
        .filter(|message| message.template == TPL_SIGNATURE_REQUEST_ACTOR)
        .count();
    assert_eq!(actor_invites, 3);
    assert!(messages
        .iter()
        .any(|message| message.recipient == "marie.dupont@mail.example"));

    // The group can no longer be edited while signing is underway.
    match service.add_promoter(
        &id,
        SignatoryId("p9".into()),
        "Late Promoter",
        "late@uni.example",
        "manager",
    ) {
        Err(AdmissionError::InvalidStatus(PropositionStatus::AwaitingSignatures)) => {}
        other => panic!("expected locked proposition, got {other:?}"),
    }
}

#[test]
fn promoter_decline_reopens_the_draft() {
    let (service, repository, history, notifications, _) = build_service();
    let id = draft_with_group(&service);
    service.request_signatures(&id, "candidate").expect("requested");

    service
        .record_opinion(
            &id,
            &SignatoryId("p1".into()),
            SignatoryOpinion::Decline {
                internal_comment: None,
                external_comment: Some("the project is out of my field".to_string()),
                refusal_reason: Some("subject mismatch".to_string()),
            },
        )
        .expect("declined");

    assert_eq!(status_of(&repository, &id), PropositionStatus::Draft);
    assert!(notifications
        .messages()
        .iter()
        .any(|message| message.template == TPL_SIGNATURE_REFUSAL_CANDIDATE));
    assert!(history
        .all()
        .iter()
        .any(|entry| entry.tags.contains(&TAG_SIGNATURE.to_string())));
}

#[test]
fn member_decline_removes_the_member_and_keeps_signing() {
    let (service, repository, _, _, _) = build_service();
    let id = draft_with_group(&service);
    service.request_signatures(&id, "candidate").expect("requested");

    service
        .record_opinion(
            &id,
            &SignatoryId("m2".into()),
            SignatoryOpinion::Decline {
                internal_comment: None,
                external_comment: None,
                refusal_reason: None,
            },
        )
        .expect("declined");

    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(record.proposition.status, PropositionStatus::AwaitingSignatures);
    assert_eq!(record.supervision.members.len(), 1);
}

#[test]
fn submit_requires_every_approval() {
    let (service, _, _, _, _) = build_service();
    let id = draft_with_group(&service);
    service.request_signatures(&id, "candidate").expect("requested");
    service
        .record_opinion(
            &id,
            &SignatoryId("p1".into()),
            SignatoryOpinion::Approve {
                internal_comment: None,
                external_comment: None,
            },
        )
        .expect("approved");

    match service.submit(&id, &[], "candidate") {
        Err(AdmissionError::Supervision(SupervisionError::MissingApprovals)) => {}
        other => panic!("expected missing approvals, got {other:?}"),
    }
}

#[test]
fn submit_seeds_the_checklist_and_notifies() {
    let (service, repository, _, notifications, _) = build_service();
    let id = confirmed_proposition(&service, &["exp-1", "exp-2"]);

    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(record.proposition.status, PropositionStatus::Confirmed);
    assert!(record.proposition.submitted_at.is_some());
    assert_eq!(record.proposition.checklist.experiences().len(), 2);
    assert_eq!(
        record
            .proposition
            .checklist
            .tab(ChecklistTab::Financeability)
            .and_then(|state| state.status),
        Some(ChecklistStatus::NotConcerned),
    );
    assert!(notifications
        .messages()
        .iter()
        .any(|message| message.template == TPL_SUBMISSION_CANDIDATE));
}

#[test]
fn approval_by_pdf_counts_toward_submission() {
    let (service, repository, _, _, _) = build_service();
    let id = draft_with_group(&service);
    service.request_signatures(&id, "candidate").expect("requested");

    service
        .record_opinion(
            &id,
            &SignatoryId("p1".into()),
            SignatoryOpinion::ApproveByPdf {
                pdf: vec!["scans/p1-approval.pdf".to_string()],
            },
        )
        .expect("approved by pdf");
    for signatory in ["m1", "m2"] {
        service
            .record_opinion(
                &id,
                &SignatoryId(signatory.into()),
                SignatoryOpinion::Approve {
                    internal_comment: None,
                    external_comment: None,
                },
            )
            .expect("approved");
    }
    service.submit(&id, &[], "candidate").expect("submitted");

    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    let p1 = record
        .supervision
        .signature(&SignatoryId("p1".into()))
        .expect("kept");
    assert_eq!(p1.state, SignatureState::Approved);
    assert_eq!(p1.pdf, vec!["scans/p1-approval.pdf".to_string()]);
}

#[test]
fn cdd_cycle_updates_status_and_checklist() {
    let (service, repository, _, notifications, _) = build_service();
    let id = confirmed_proposition(&service, &[]);

    service.cdd_take_charge(&id, "cdd-manager").expect("taken in charge");
    assert_eq!(status_of(&repository, &id), PropositionStatus::CddProcessing);

    service.cdd_approve(&id, "cdd-manager").expect("approved");
    assert_eq!(
        status_of(&repository, &id),
        PropositionStatus::AwaitingManagementValidation,
    );

    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(
        record
            .proposition
            .checklist
            .tab(ChecklistTab::CddDecision)
            .and_then(|state| state.status),
        Some(ChecklistStatus::Validated),
    );
    assert!(notifications
        .messages()
        .iter()
        .any(|message| message.template.contains("cdd-approval")));
}

#[test]
fn cdd_refusal_returns_the_file_to_the_sic() {
    let (service, repository, _, notifications, _) = build_service();
    let id = confirmed_proposition(&service, &[]);
    service.cdd_take_charge(&id, "cdd-manager").expect("taken in charge");

    let reasons = vec!["The research plan lacks a timeline.".to_string()];
    service.cdd_refuse(&id, &reasons, "cdd-manager").expect("refused");

    assert_eq!(status_of(&repository, &id), PropositionStatus::ReturnedFromCdd);
    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    let tab = record
        .proposition
        .checklist
        .tab(ChecklistTab::CddDecision)
        .expect("tab present");
    assert_eq!(tab.status, Some(ChecklistStatus::Blocked));
    assert_eq!(tab.extra.get("decision").map(String::as_str), Some("IN_DECISION"));
    assert!(notifications
        .messages()
        .iter()
        .any(|message| message
            .tokens
            .get("refusal_reasons")
            .is_some_and(|reasons| reasons.contains("timeline"))));
}

#[test]
fn cdd_decisions_require_a_file_in_charge() {
    let (service, _, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &[]);

    match service.cdd_approve(&id, "cdd-manager") {
        Err(AdmissionError::InvalidStatus(PropositionStatus::Confirmed)) => {}
        other => panic!("expected invalid status, got {other:?}"),
    }
}

#[test]
fn sic_approval_authorizes_enrollment_and_queues_the_recap() {
    let (service, repository, _, _, tasks) = build_service();
    let id = confirmed_proposition(&service, &[]);
    service.cdd_take_charge(&id, "cdd-manager").expect("taken in charge");
    service.cdd_approve(&id, "cdd-manager").expect("approved");

    service.sic_approve(&id, "sic-manager").expect("approved");
    assert_eq!(
        status_of(&repository, &id),
        PropositionStatus::EnrollmentAuthorized,
    );

    let queued = tasks.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].kind, TaskKind::GenerateRecapPdf);
    assert_eq!(queued[0].proposition_id, id);
}

#[test]
fn sic_refusal_ends_the_workflow() {
    let (service, repository, _, notifications, tasks) = build_service();
    let id = confirmed_proposition(&service, &[]);
    service.cdd_take_charge(&id, "cdd-manager").expect("taken in charge");
    service.cdd_approve(&id, "cdd-manager").expect("approved");

    service.sic_refuse(&id, "sic-manager").expect("refused");
    assert_eq!(status_of(&repository, &id), PropositionStatus::EnrollmentRefused);
    assert!(notifications
        .messages()
        .iter()
        .any(|message| message.template.contains("sic-refusal")));
    assert!(tasks.queued().is_empty());
}

#[test]
fn sic_dispensation_records_the_sub_state_merged_with_its_parent() {
    let (service, repository, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &[]);

    service
        .sic_request_dispensation(&id, "MANAGEMENT_OPINION_REQUESTED", "sic-manager")
        .expect("dispensation requested");

    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    let tab = record
        .proposition
        .checklist
        .tab(ChecklistTab::SicDecision)
        .expect("tab present");
    assert_eq!(tab.status, Some(ChecklistStatus::InProgress));
    assert_eq!(tab.extra.get("in_progress").map(String::as_str), Some("dispensation"));
    assert_eq!(
        tab.extra.get("dispensation_state").map(String::as_str),
        Some("MANAGEMENT_OPINION_REQUESTED"),
    );
}

#[test]
fn unknown_checklist_identifiers_are_rejected() {
    let (service, _, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &[]);

    match service.set_tab_status(&id, ChecklistTab::CddDecision, "NO_SUCH_STATUS", "manager") {
        Err(AdmissionError::UnknownChecklistStatus { identifier, .. }) => {
            assert_eq!(identifier, "NO_SUCH_STATUS");
        }
        other => panic!("expected unknown status, got {other:?}"),
    }

    match service.set_tab_status(&id, ChecklistTab::PastExperienceItems, "VALIDATED", "manager") {
        Err(AdmissionError::VirtualTab) => {}
        other => panic!("expected virtual tab rejection, got {other:?}"),
    }
}

#[test]
fn past_experience_sufficiency_is_guarded() {
    let (service, _, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &["exp-1"]);

    match service.set_tab_status(&id, ChecklistTab::PastExperience, "SUFFICIENT", "manager") {
        Err(AdmissionError::ExperienceStatusesNotValid) => {}
        other => panic!("expected invalid experiences, got {other:?}"),
    }

    service
        .set_experience_status(&id, "exp-1", "VALIDATED", "manager")
        .expect("experience validated");

    match service.set_tab_status(&id, ChecklistTab::PastExperience, "SUFFICIENT", "manager") {
        Err(AdmissionError::AccessConditionNotSelected) => {}
        other => panic!("expected missing access condition, got {other:?}"),
    }

    service
        .set_access_condition(&id, "Master's degree in a related field", "manager")
        .expect("condition set");
    service
        .set_tab_status(&id, ChecklistTab::PastExperience, "SUFFICIENT", "manager")
        .expect("tab validated");
}

#[test]
fn experience_status_keeps_the_fragment_identifier() {
    let (service, repository, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &["exp-1"]);

    service
        .set_experience_status(&id, "exp-1", "AUTHENTICATION.INSTITUTION_CONTACTED", "manager")
        .expect("sub-state applied");

    let record = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    let fragment = record
        .proposition
        .checklist
        .experience("exp-1")
        .expect("fragment present");
    assert_eq!(fragment.experience_id(), Some("exp-1"));
    assert_eq!(fragment.status, Some(ChecklistStatus::InProgress));
    assert_eq!(fragment.extra.get("authentification").map(String::as_str), Some("1"));
    assert_eq!(
        fragment.extra.get("etat_authentification").map(String::as_str),
        Some("INSTITUTION_CONTACTED"),
    );

    match service.set_experience_status(&id, "exp-9", "VALIDATED", "manager") {
        Err(AdmissionError::ExperienceNotFound) => {}
        other => panic!("expected missing experience, got {other:?}"),
    }
}

#[test]
fn history_endpoint_scopes_entries_to_the_proposition() {
    let (service, _, _, _, _) = build_service();
    let first = confirmed_proposition(&service, &[]);
    let second = draft_with_group(&service);

    let entries = service.history(&first).expect("history read");
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|entry| entry.proposition_id == first));

    let other = service.history(&second).expect("history read");
    assert!(other.iter().all(|entry| entry.proposition_id == second));
}
