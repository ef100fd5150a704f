use std::collections::BTreeMap;

use serde::Serialize;

use super::state::{ChecklistStatus, ChecklistTab, TabState};

/// Sub-states of the experience authentication process, exposed as children
/// of the `AUTHENTICATION` entry.
pub const AUTHENTICATION_STATES: [(&str, &str); 5] = [
    ("NOT_CONCERNED", "Not concerned"),
    ("AUTHENTICATION_REQUESTED", "Authentication requested"),
    ("INSTITUTION_CONTACTED", "Institution contacted"),
    ("CONFIRMED", "Confirmed"),
    ("DISPROVED", "Disproved"),
];

/// Sub-states of a dispensation request, exposed as children of the
/// `DISPENSATION_NEEDED` entry on the financeability and SIC decision tabs.
pub const DISPENSATION_STATES: [(&str, &str); 5] = [
    ("NOT_CONCERNED", "Not concerned"),
    ("MANAGEMENT_OPINION_REQUESTED", "Management opinion requested"),
    ("FURTHER_INFORMATION_NEEDED", "Further information needed"),
    ("MANAGEMENT_REFUSAL", "Management refusal"),
    ("MANAGEMENT_APPROVAL", "Management approval"),
];

/// One selectable status configuration for a checklist tab.
///
/// A configuration with a parent identifier is a sub-state refining its
/// parent; it carries no status of its own and discriminates purely on the
/// extra payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusConfig {
    pub id: String,
    pub label: String,
    pub status: Option<ChecklistStatus>,
    pub extra: BTreeMap<String, String>,
    pub parent: Option<String>,
}

impl StatusConfig {
    fn new(id: &str, label: &str, status: ChecklistStatus) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            status: Some(status),
            extra: BTreeMap::new(),
            parent: None,
        }
    }

    fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    fn child_of(parent: &str, state: &str, label: &str, extra_key: &str) -> Self {
        Self {
            id: format!("{parent}.{state}"),
            label: label.to_string(),
            status: None,
            extra: BTreeMap::from([(extra_key.to_string(), state.to_string())]),
            parent: Some(parent.to_string()),
        }
    }

    /// Dict-subset matching against a stored tab fragment: the configured
    /// status must equal the stored one when set, and every configured extra
    /// entry must appear in the stored extra payload.
    pub fn matches_state(&self, state: &TabState) -> bool {
        if let Some(status) = self.status {
            if state.status != Some(status) {
                return false;
            }
        }
        self.extra
            .iter()
            .all(|(key, value)| state.extra.get(key) == Some(value))
    }

    /// Combine a sub-state with its parent configuration: the child keeps its
    /// identifier, takes the first defined status, and the extra payloads are
    /// unioned.
    pub fn merged_with(&self, parent: &StatusConfig) -> StatusConfig {
        let mut extra = self.extra.clone();
        for (key, value) in &parent.extra {
            extra.insert(key.clone(), value.clone());
        }
        StatusConfig {
            id: self.id.clone(),
            label: self.label.clone(),
            status: self.status.or(parent.status),
            extra,
            parent: self.parent.clone(),
        }
    }
}

/// The catalog of selectable statuses for one tab.
#[derive(Debug, Clone, Serialize)]
pub struct TabCatalog {
    pub tab: ChecklistTab,
    pub statuses: Vec<StatusConfig>,
}

impl TabCatalog {
    pub fn get(&self, id: &str) -> Option<&StatusConfig> {
        self.statuses.iter().find(|status| status.id == id)
    }

    /// First configuration carrying a status that matches the stored
    /// fragment. Sub-states without a status of their own are skipped.
    pub fn find_matching(&self, state: &TabState) -> Option<&StatusConfig> {
        self.statuses
            .iter()
            .filter(|config| config.status.is_some())
            .find(|config| config.matches_state(state))
    }
}

/// The full per-tab status catalog driving the checklist UI and the listing
/// filters.
#[derive(Debug, Clone)]
pub struct StatusCatalog {
    tabs: Vec<TabCatalog>,
}

impl StatusCatalog {
    pub fn standard() -> Self {
        Self {
            tabs: vec![
                personal_data(),
                assimilation(),
                past_experience(),
                past_experience_items(),
                financeability(),
                training_choice(),
                research_project(),
                cdd_decision(),
                sic_decision(),
            ],
        }
    }

    pub fn tab(&self, tab: ChecklistTab) -> Option<&TabCatalog> {
        self.tabs.iter().find(|catalog| catalog.tab == tab)
    }

    pub fn tabs(&self) -> &[TabCatalog] {
        &self.tabs
    }

    pub fn get(&self, tab: ChecklistTab, id: &str) -> Option<&StatusConfig> {
        self.tab(tab).and_then(|catalog| catalog.get(id))
    }
}

fn personal_data() -> TabCatalog {
    TabCatalog {
        tab: ChecklistTab::PersonalData,
        statuses: vec![
            StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
            StatusConfig::new("TO_COMPLETE", "To be completed", ChecklistStatus::Blocked)
                .with_extra("fraud", "0"),
            StatusConfig::new("FRAUDSTER", "Fraudster", ChecklistStatus::Blocked)
                .with_extra("fraud", "1"),
            StatusConfig::new("VALIDATED", "Validated", ChecklistStatus::Validated),
        ],
    }
}

fn assimilation() -> TabCatalog {
    TabCatalog {
        tab: ChecklistTab::Assimilation,
        statuses: vec![
            StatusConfig::new("NOT_CONCERNED", "Not concerned", ChecklistStatus::NotConcerned),
            StatusConfig::new(
                "DECLARED",
                "Declared assimilated or not",
                ChecklistStatus::CandidateToProcess,
            ),
            StatusConfig::new("TO_COMPLETE", "To be completed", ChecklistStatus::Blocked),
            StatusConfig::new("EXPERT_OPINION", "Expert opinion", ChecklistStatus::InProgress),
            StatusConfig::new(
                "TO_COMPLETE_AFTER_ENROLMENT",
                "To be completed after enrolment",
                ChecklistStatus::BlockedForLater,
            ),
            StatusConfig::new("VALIDATED", "Validated", ChecklistStatus::Validated),
        ],
    }
}

fn past_experience() -> TabCatalog {
    TabCatalog {
        tab: ChecklistTab::PastExperience,
        statuses: vec![
            StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
            StatusConfig::new("CLEANED", "Cleaned", ChecklistStatus::InProgress),
            StatusConfig::new("INSUFFICIENT", "Insufficient", ChecklistStatus::Blocked),
            StatusConfig::new("SUFFICIENT", "Sufficient", ChecklistStatus::Validated),
        ],
    }
}

fn past_experience_items() -> TabCatalog {
    let mut statuses = vec![
        StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
        StatusConfig::new("TO_COMPLETE", "To be completed", ChecklistStatus::Blocked),
        StatusConfig::new("AUTHENTICATION", "Authentication", ChecklistStatus::InProgress)
            .with_extra("authentification", "1"),
    ];
    statuses.extend(AUTHENTICATION_STATES.iter().map(|(state, label)| {
        StatusConfig::child_of("AUTHENTICATION", state, label, "etat_authentification")
    }));
    statuses.extend([
        StatusConfig::new("EXPERT_OPINION", "Expert advice", ChecklistStatus::InProgress)
            .with_extra("authentification", "0"),
        StatusConfig::new(
            "TO_COMPLETE_AFTER_ENROLMENT",
            "To complete after enrolment",
            ChecklistStatus::BlockedForLater,
        ),
        StatusConfig::new("VALIDATED", "Validated", ChecklistStatus::Validated),
    ]);
    TabCatalog {
        tab: ChecklistTab::PastExperienceItems,
        statuses,
    }
}

fn financeability() -> TabCatalog {
    let mut statuses = vec![
        StatusConfig::new("NOT_CONCERNED", "Not concerned", ChecklistStatus::NotConcerned),
        StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
        StatusConfig::new("EXPERT_OPINION", "Expert opinion", ChecklistStatus::InProgress)
            .with_extra("in_progress", "expert"),
        StatusConfig::new("DISPENSATION_NEEDED", "Dispensation needed", ChecklistStatus::InProgress)
            .with_extra("in_progress", "dispensation"),
    ];
    statuses.extend(DISPENSATION_STATES.iter().map(|(state, label)| {
        StatusConfig::child_of("DISPENSATION_NEEDED", state, label, "dispensation_state")
    }));
    statuses.extend([
        StatusConfig::new("TO_COMPLETE", "To be completed", ChecklistStatus::Blocked)
            .with_extra("to_be_completed", "1"),
        StatusConfig::new("NOT_FINANCEABLE", "Not financeable", ChecklistStatus::Blocked)
            .with_extra("to_be_completed", "0"),
        StatusConfig::new("DISPENSATION_GRANTED", "Dispensation granted", ChecklistStatus::Validated)
            .with_extra("success", "dispensation"),
        StatusConfig::new("FINANCEABLE", "Financeable", ChecklistStatus::Validated)
            .with_extra("success", "financeable"),
    ]);
    TabCatalog {
        tab: ChecklistTab::Financeability,
        statuses,
    }
}

fn training_choice() -> TabCatalog {
    TabCatalog {
        tab: ChecklistTab::TrainingChoice,
        statuses: vec![
            StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
            StatusConfig::new("VALIDATED", "Validated", ChecklistStatus::Validated),
        ],
    }
}

fn research_project() -> TabCatalog {
    TabCatalog {
        tab: ChecklistTab::ResearchProject,
        statuses: vec![
            StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
            StatusConfig::new("TO_COMPLETE", "To be completed", ChecklistStatus::Blocked),
            StatusConfig::new("VALIDATED", "Validated", ChecklistStatus::Validated),
        ],
    }
}

fn cdd_decision() -> TabCatalog {
    TabCatalog {
        tab: ChecklistTab::CddDecision,
        statuses: vec![
            StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
            StatusConfig::new("TAKEN_IN_CHARGE", "Taken in charge", ChecklistStatus::InProgress),
            StatusConfig::new("TO_COMPLETE_BY_SIC", "To be completed by SIC", ChecklistStatus::Blocked)
                .with_extra("decision", "OUT_OF_SCOPE"),
            StatusConfig::new("CLOSED", "Closed", ChecklistStatus::Blocked)
                .with_extra("decision", "CLOSED"),
            StatusConfig::new("REFUSAL", "Refusal", ChecklistStatus::Blocked)
                .with_extra("decision", "IN_DECISION"),
            StatusConfig::new("APPROVAL", "Approval", ChecklistStatus::Validated),
        ],
    }
}

fn sic_decision() -> TabCatalog {
    let mut statuses = vec![
        StatusConfig::new("TO_PROCESS", "To be processed", ChecklistStatus::CandidateToProcess),
        StatusConfig::new("TO_COMPLETE", "Manager follow-up", ChecklistStatus::Blocked)
            .with_extra("blocked", "to_be_completed"),
        StatusConfig::new("DISPENSATION_NEEDED", "Dispensation needed", ChecklistStatus::InProgress)
            .with_extra("in_progress", "dispensation"),
    ];
    statuses.extend(DISPENSATION_STATES.iter().map(|(state, label)| {
        StatusConfig::child_of("DISPENSATION_NEEDED", state, label, "dispensation_state")
    }));
    statuses.extend([
        StatusConfig::new("REFUSAL_TO_VALIDATE", "Refusal to validate", ChecklistStatus::InProgress)
            .with_extra("in_progress", "refusal"),
        StatusConfig::new("APPROVAL_TO_VALIDATE", "Approval to validate", ChecklistStatus::InProgress)
            .with_extra("in_progress", "approval"),
        StatusConfig::new("CLOSED", "Closed", ChecklistStatus::Blocked)
            .with_extra("blocked", "closed"),
        StatusConfig::new("REFUSED", "Refused", ChecklistStatus::Blocked)
            .with_extra("blocked", "refusal"),
        StatusConfig::new("APPROVED", "Approved", ChecklistStatus::Validated),
    ]);
    TabCatalog {
        tab: ChecklistTab::SicDecision,
        statuses,
    }
}
