use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use admission_desk::workflows::admission::history::{HistoryEntry, HistoryError, HistoryStore};
use admission_desk::workflows::admission::notification::{
    NotificationError, NotificationPublisher, OutboundMessage,
};
use admission_desk::workflows::admission::repository::{
    AdmissionRecord, AdmissionRepository, QueuedTask, RepositoryError, TaskError, TaskQueue,
};
use admission_desk::workflows::admission::{AdmissionService, PropositionId};
use metrics_exporter_prometheus::PrometheusHandle;

pub(crate) type ApiAdmissionService = AdmissionService<
    InMemoryAdmissionRepository,
    InMemoryHistoryStore,
    LoggingNotificationPublisher,
    InMemoryTaskQueue,
>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAdmissionRepository {
    records: Arc<Mutex<HashMap<PropositionId, AdmissionRecord>>>,
}

impl AdmissionRepository for InMemoryAdmissionRepository {
    fn insert(&self, record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        if guard.contains_key(&record.proposition.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.proposition.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: AdmissionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        if guard.contains_key(&record.proposition.id) {
            guard.insert(record.proposition.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &PropositionId) -> Result<Option<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("repository mutex poisoned".to_string())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHistoryStore {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| HistoryError::Unavailable("history mutex poisoned".to_string()))?;
        guard.push(entry);
        Ok(())
    }

    fn entries(&self, id: &PropositionId) -> Result<Vec<HistoryEntry>, HistoryError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| HistoryError::Unavailable("history mutex poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|entry| &entry.proposition_id == id)
            .cloned()
            .collect())
    }
}

/// Stands in for the mail pipeline: logs each templated message instead of
/// delivering it.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationPublisher {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl NotificationPublisher for LoggingNotificationPublisher {
    fn publish(&self, message: OutboundMessage) -> Result<(), NotificationError> {
        tracing::info!(
            template = %message.template,
            recipient = %message.recipient,
            "notification queued",
        );
        let mut guard = self
            .messages
            .lock()
            .map_err(|_| NotificationError::Transport("notification mutex poisoned".to_string()))?;
        guard.push(message);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTaskQueue {
    tasks: Arc<Mutex<Vec<QueuedTask>>>,
}

impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskError> {
        tracing::info!(kind = task.kind.label(), "background task queued");
        let mut guard = self
            .tasks
            .lock()
            .map_err(|_| TaskError::Unavailable("task mutex poisoned".to_string()))?;
        guard.push(task);
        Ok(())
    }
}

pub(crate) fn build_service(sender_email: &str) -> Arc<ApiAdmissionService> {
    Arc::new(AdmissionService::new(
        Arc::new(InMemoryAdmissionRepository::default()),
        Arc::new(InMemoryHistoryStore::default()),
        Arc::new(LoggingNotificationPublisher::default()),
        Arc::new(InMemoryTaskQueue::default()),
        sender_email,
    ))
}
