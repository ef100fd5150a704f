use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::workflows::admission::domain::{
    AdmissionType, CandidateSnapshot, PropositionId, TrainingSnapshot,
};
use crate::workflows::admission::history::{HistoryEntry, HistoryError, HistoryStore};
use crate::workflows::admission::notification::{
    NotificationError, NotificationPublisher, OutboundMessage,
};
use crate::workflows::admission::repository::{
    AdmissionRecord, AdmissionRepository, QueuedTask, RepositoryError, TaskError, TaskQueue,
};
use crate::workflows::admission::service::{AdmissionService, InitiateCommand, SignatoryOpinion};
use crate::workflows::admission::supervision::SignatoryId;
use crate::workflows::admission::{admission_router, PropositionStatus};

pub(super) const SENDER: &str = "enrollment@university.example";

pub(super) type TestService =
    AdmissionService<MemoryRepository, MemoryHistory, MemoryNotifications, MemoryTasks>;

pub(super) fn candidate() -> CandidateSnapshot {
    CandidateSnapshot {
        registration_id: "00412345".to_string(),
        first_name: "Marie".to_string(),
        last_name: "Dupont".to_string(),
        email: "marie.dupont@mail.example".to_string(),
    }
}

pub(super) fn training() -> TrainingSnapshot {
    TrainingSnapshot {
        acronym: "SC3DP".to_string(),
        title: "Doctorate in Sciences".to_string(),
        academic_year: 2025,
    }
}

pub(super) fn initiate_command() -> InitiateCommand {
    InitiateCommand {
        admission_type: AdmissionType::Admission,
        candidate: candidate(),
        training: training(),
        author: "candidate".to_string(),
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryHistory>,
    Arc<MemoryNotifications>,
    Arc<MemoryTasks>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let history = Arc::new(MemoryHistory::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let tasks = Arc::new(MemoryTasks::default());
    let service = AdmissionService::new(
        repository.clone(),
        history.clone(),
        notifications.clone(),
        tasks.clone(),
        SENDER,
    );
    (service, repository, history, notifications, tasks)
}

/// Initiate a draft and attach a complete supervisory group (one lead
/// promoter, two committee members).
pub(super) fn draft_with_group(service: &TestService) -> PropositionId {
    let record = service.initiate(initiate_command()).expect("initiated");
    let id = record.proposition.id;
    service
        .add_promoter(&id, SignatoryId("p1".into()), "Alice Martin", "alice@uni.example", "manager")
        .expect("promoter added");
    service
        .add_committee_member(&id, SignatoryId("m1".into()), "Badr Haddad", "badr@uni.example", "manager")
        .expect("member added");
    service
        .add_committee_member(&id, SignatoryId("m2".into()), "Chris Leroy", "chris@uni.example", "manager")
        .expect("member added");
    service
        .designate_lead_promoter(&id, SignatoryId("p1".into()), "manager")
        .expect("lead designated");
    id
}

/// Walk the draft through signatures and submission, leaving it `Confirmed`
/// with the given curriculum experiences.
pub(super) fn confirmed_proposition(service: &TestService, experience_ids: &[&str]) -> PropositionId {
    let id = draft_with_group(service);
    service.request_signatures(&id, "candidate").expect("signatures requested");
    for signatory in ["p1", "m1", "m2"] {
        service
            .record_opinion(
                &id,
                &SignatoryId(signatory.into()),
                SignatoryOpinion::Approve {
                    internal_comment: None,
                    external_comment: None,
                },
            )
            .expect("opinion recorded");
    }
    let experience_ids: Vec<String> = experience_ids.iter().map(ToString::to_string).collect();
    service
        .submit(&id, &experience_ids, "candidate")
        .expect("submitted");
    id
}

pub(super) fn status_of(repository: &MemoryRepository, id: &PropositionId) -> PropositionStatus {
    repository
        .fetch(id)
        .expect("fetch succeeds")
        .expect("record present")
        .proposition
        .status
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<PropositionId, AdmissionRecord>>>,
}

impl AdmissionRepository for MemoryRepository {
    fn insert(&self, record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.proposition.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.proposition.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: AdmissionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.proposition.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &PropositionId) -> Result<Option<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryHistory {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl MemoryHistory {
    pub(super) fn all(&self) -> Vec<HistoryEntry> {
        self.entries.lock().expect("history mutex poisoned").clone()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.entries
            .lock()
            .expect("history mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn entries(&self, id: &PropositionId) -> Result<Vec<HistoryEntry>, HistoryError> {
        let guard = self.entries.lock().expect("history mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| &entry.proposition_id == id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl MemoryNotifications {
    pub(super) fn messages(&self) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, message: OutboundMessage) -> Result<(), NotificationError> {
        self.messages
            .lock()
            .expect("notification mutex poisoned")
            .push(message);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryTasks {
    tasks: Arc<Mutex<Vec<QueuedTask>>>,
}

impl MemoryTasks {
    pub(super) fn queued(&self) -> Vec<QueuedTask> {
        self.tasks.lock().expect("task mutex poisoned").clone()
    }
}

impl TaskQueue for MemoryTasks {
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskError> {
        self.tasks.lock().expect("task mutex poisoned").push(task);
        Ok(())
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    admission_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
