use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::catalog::{StatusCatalog, StatusConfig};
use super::state::{Checklist, ChecklistTab};

/// Whether the selected checklist criteria keep or exclude matching
/// admissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistFilterMode {
    #[default]
    Inclusion,
    Exclusion,
}

/// Checklist criteria requested by the staff listing: per tab, the selected
/// catalog identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecklistFilters {
    #[serde(default)]
    pub mode: ChecklistFilterMode,
    #[serde(default)]
    pub selections: BTreeMap<ChecklistTab, Vec<String>>,
}

/// Tabs whose catalog nests sub-states under a parent entry. Selecting a
/// child narrows the parent (AND); selecting the parent alone means "any
/// sub-state".
const HIERARCHICAL_PREFIXES: [(ChecklistTab, &str); 3] = [
    (ChecklistTab::PastExperienceItems, "AUTHENTICATION"),
    (ChecklistTab::Financeability, "DISPENSATION_NEEDED"),
    (ChecklistTab::SicDecision, "DISPENSATION_NEEDED"),
];

#[derive(Debug, Clone)]
struct Criterion {
    tab: ChecklistTab,
    config: StatusConfig,
}

/// Compiled checklist filter, matching admissions with OR across criteria and
/// dict-subset semantics within one criterion.
#[derive(Debug, Clone)]
pub struct ChecklistMatcher {
    mode: ChecklistFilterMode,
    criteria: Vec<Criterion>,
}

impl ChecklistMatcher {
    pub fn compile(catalog: &StatusCatalog, filters: &ChecklistFilters) -> Self {
        let mut selections = filters.selections.clone();

        // When a sub-state of a hierarchical entry is selected, drop the bare
        // parent from the selection: each selected child is merged with the
        // parent configuration instead, so the parent's "any sub-state"
        // semantics do not swallow the narrower criteria.
        let mut merged_parents: BTreeSet<(ChecklistTab, &str)> = BTreeSet::new();
        for (tab, prefix) in HIERARCHICAL_PREFIXES {
            let Some(selected) = selections.get_mut(&tab) else {
                continue;
            };
            let child_prefix = format!("{prefix}.");
            if selected.iter().any(|id| id.starts_with(&child_prefix)) {
                selected.retain(|id| id != prefix);
                merged_parents.insert((tab, prefix));
            }
        }

        let mut criteria = Vec::new();
        for (tab, ids) in &selections {
            let Some(tab_catalog) = catalog.tab(*tab) else {
                continue;
            };
            for id in ids {
                let Some(config) = tab_catalog.get(id) else {
                    continue;
                };
                let config = match config.parent.as_deref() {
                    Some(parent_id) if merged_parents.contains(&(*tab, parent_id)) => {
                        match tab_catalog.get(parent_id) {
                            Some(parent) => config.merged_with(parent),
                            None => config.clone(),
                        }
                    }
                    _ => config.clone(),
                };
                criteria.push(Criterion { tab: *tab, config });
            }
        }

        Self {
            mode: filters.mode,
            criteria,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Whether the admission passes the filter. An empty filter passes
    /// everything; in exclusion mode an admission missing the checklist
    /// structure passes, since it cannot match any criterion.
    pub fn matches(&self, checklist: &Checklist) -> bool {
        if self.criteria.is_empty() {
            return true;
        }

        let hit = self.criteria.iter().any(|criterion| {
            if criterion.tab == ChecklistTab::PastExperienceItems {
                // Past-experience criteria match when any experience
                // fragment under the parent tab satisfies them.
                checklist
                    .experiences()
                    .iter()
                    .any(|child| criterion.config.matches_state(child))
            } else {
                checklist
                    .tab(criterion.tab)
                    .is_some_and(|state| criterion.config.matches_state(state))
            }
        });

        match self.mode {
            ChecklistFilterMode::Inclusion => hit,
            ChecklistFilterMode::Exclusion => !hit,
        }
    }
}
