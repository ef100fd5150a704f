use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key stored in a child fragment's extra payload to tie it to a curriculum
/// experience (a UUID string).
pub const EXPERIENCE_ID_KEY: &str = "identifiant";

/// Workflow status of a checklist tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    NotConcerned,
    CandidateToProcess,
    InProgress,
    Blocked,
    BlockedForLater,
    Validated,
    SystemValidated,
}

impl ChecklistStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotConcerned => "Not concerned",
            Self::CandidateToProcess => "To be processed",
            Self::InProgress => "In progress",
            Self::Blocked => "Blocked",
            Self::BlockedForLater => "Blocked until enrolment",
            Self::Validated => "Validated",
            Self::SystemValidated => "Validated by the system",
        }
    }

    /// Statuses counting as a successful outcome for a tab.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Validated | Self::SystemValidated)
    }
}

/// The checklist tabs shown to administrative staff, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistTab {
    PersonalData,
    Assimilation,
    PastExperience,
    PastExperienceItems,
    Financeability,
    TrainingChoice,
    ResearchProject,
    CddDecision,
    SicDecision,
}

impl ChecklistTab {
    pub const fn ordered() -> [Self; 9] {
        [
            Self::PersonalData,
            Self::Assimilation,
            Self::PastExperience,
            Self::PastExperienceItems,
            Self::Financeability,
            Self::TrainingChoice,
            Self::ResearchProject,
            Self::CddDecision,
            Self::SicDecision,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PersonalData => "Personal data",
            Self::Assimilation => "Assimilation",
            Self::PastExperience => "Previous experience",
            Self::PastExperienceItems => "Previous experience items",
            Self::Financeability => "Financeability",
            Self::TrainingChoice => "Course choice",
            Self::ResearchProject => "Research project",
            Self::CddDecision => "Decision of the CDD",
            Self::SicDecision => "Decision of the SIC",
        }
    }

    /// Tabs persisted on the admission blob. The past-experience items tab is
    /// virtual: its fragments live as children of the past-experience tab.
    pub const fn is_stored(self) -> bool {
        !matches!(self, Self::PastExperienceItems)
    }
}

/// One tab's stored state: optional status, free-form extra discriminant and,
/// for the past-experience tab, one child fragment per curriculum experience.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabState {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChecklistStatus>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TabState>,
}

impl TabState {
    pub fn new(status: ChecklistStatus, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: Some(status),
            extra: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    /// Identifier of the curriculum experience this fragment belongs to, when
    /// the fragment is a past-experience child.
    pub fn experience_id(&self) -> Option<&str> {
        self.extra.get(EXPERIENCE_ID_KEY).map(String::as_str)
    }

    pub fn child(&self, experience_id: &str) -> Option<&TabState> {
        self.children
            .iter()
            .find(|child| child.experience_id() == Some(experience_id))
    }

    pub fn child_mut(&mut self, experience_id: &str) -> Option<&mut TabState> {
        self.children
            .iter_mut()
            .find(|child| child.experience_id() == Some(experience_id))
    }
}

/// The full checklist attached to an admission, keyed by tab.
///
/// Stored as a single JSON blob on the admission record; tabs absent from an
/// old blob deserialize to their default empty state and unknown keys are
/// dropped on the floor rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    tabs: BTreeMap<ChecklistTab, TabState>,
}

impl Checklist {
    /// Checklist written when the candidate confirms the proposition.
    pub fn initial(experience_ids: &[String]) -> Self {
        let mut tabs = BTreeMap::new();
        for tab in ChecklistTab::ordered() {
            if !tab.is_stored() {
                continue;
            }
            let status = match tab {
                ChecklistTab::Assimilation | ChecklistTab::Financeability => {
                    ChecklistStatus::NotConcerned
                }
                _ => ChecklistStatus::CandidateToProcess,
            };
            let mut state = TabState::new(status, tab.label());
            if tab == ChecklistTab::PastExperience {
                state.children = experience_ids
                    .iter()
                    .map(|id| {
                        TabState::new(ChecklistStatus::CandidateToProcess, "Experience")
                            .with_extra(EXPERIENCE_ID_KEY, id)
                    })
                    .collect();
            }
            tabs.insert(tab, state);
        }
        Self { tabs }
    }

    pub fn tab(&self, tab: ChecklistTab) -> Option<&TabState> {
        self.tabs.get(&tab)
    }

    pub fn tab_mut(&mut self, tab: ChecklistTab) -> &mut TabState {
        self.tabs.entry(tab).or_default()
    }

    pub fn experience(&self, experience_id: &str) -> Option<&TabState> {
        self.tab(ChecklistTab::PastExperience)
            .and_then(|state| state.child(experience_id))
    }

    pub fn experience_mut(&mut self, experience_id: &str) -> Option<&mut TabState> {
        self.tab_mut(ChecklistTab::PastExperience)
            .child_mut(experience_id)
    }

    pub fn add_experience(&mut self, experience_id: &str, label: &str) {
        let parent = self.tab_mut(ChecklistTab::PastExperience);
        if parent.child(experience_id).is_none() {
            parent.children.push(
                TabState::new(ChecklistStatus::CandidateToProcess, label)
                    .with_extra(EXPERIENCE_ID_KEY, experience_id),
            );
        }
    }

    /// All experience fragments under the past-experience tab.
    pub fn experiences(&self) -> &[TabState] {
        self.tab(ChecklistTab::PastExperience)
            .map(|state| state.children.as_slice())
            .unwrap_or_default()
    }

    /// True when every experience fragment reached a success status. An
    /// admission without any experience fragment passes vacuously.
    pub fn all_experiences_validated(&self) -> bool {
        self.experiences()
            .iter()
            .all(|child| child.status.is_some_and(ChecklistStatus::is_success))
    }
}
