use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checklist::{ChecklistFilters, ChecklistMatcher, StatusCatalog};
use super::domain::PropositionStatus;
use super::repository::AdmissionRecord;

/// Column the staff listing sorts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Reference,
    CandidateName,
    Training,
    Status,
    #[default]
    ModifiedAt,
    SubmittedAt,
}

fn default_page_size() -> usize {
    25
}

/// Filterable, sortable, paginated query backing the staff listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub status: Option<PropositionStatus>,
    /// Case-insensitive substring match on the candidate name or
    /// registration id.
    #[serde(default)]
    pub candidate: Option<String>,
    /// Case-insensitive substring match on the training acronym or title.
    #[serde(default)]
    pub training: Option<String>,
    #[serde(default)]
    pub checklist: Option<ChecklistFilters>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub descending: bool,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            status: None,
            candidate: None,
            training: None,
            checklist: None,
            sort: SortField::default(),
            descending: false,
            page: 0,
            page_size: default_page_size(),
        }
    }
}

/// One row of the staff listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListingRow {
    pub proposition_id: String,
    pub reference: String,
    pub candidate: String,
    pub training: String,
    pub status: PropositionStatus,
    pub status_label: &'static str,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<&AdmissionRecord> for ListingRow {
    fn from(record: &AdmissionRecord) -> Self {
        let proposition = &record.proposition;
        Self {
            proposition_id: proposition.id.0.clone(),
            reference: proposition.reference.clone(),
            candidate: proposition.candidate.display_name(),
            training: proposition.training.acronym.clone(),
            status: proposition.status,
            status_label: proposition.status.label(),
            modified_at: proposition.modified_at,
            submitted_at: proposition.submitted_at,
        }
    }
}

/// One page of the listing plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub rows: Vec<ListingRow>,
}

/// Run a listing query against a snapshot of the admission records.
pub fn run_query(
    catalog: &StatusCatalog,
    records: &[AdmissionRecord],
    query: &ListingQuery,
) -> ListingPage {
    let matcher = query
        .checklist
        .as_ref()
        .map(|filters| ChecklistMatcher::compile(catalog, filters));

    let mut rows: Vec<ListingRow> = records
        .iter()
        .filter(|record| keeps(record, query, matcher.as_ref()))
        .map(ListingRow::from)
        .collect();

    sort_rows(&mut rows, query.sort, query.descending);

    let total = rows.len();
    let page_size = query.page_size.max(1);
    // page and page_size come straight from the request body.
    let rows = rows
        .into_iter()
        .skip(query.page.saturating_mul(page_size))
        .take(page_size)
        .collect();

    ListingPage {
        total,
        page: query.page,
        page_size,
        rows,
    }
}

fn keeps(record: &AdmissionRecord, query: &ListingQuery, matcher: Option<&ChecklistMatcher>) -> bool {
    let proposition = &record.proposition;

    if let Some(status) = query.status {
        if proposition.status != status {
            return false;
        }
    }
    if let Some(needle) = &query.candidate {
        let needle = needle.to_lowercase();
        let name = proposition.candidate.display_name().to_lowercase();
        let registration = proposition.candidate.registration_id.to_lowercase();
        if !name.contains(&needle) && !registration.contains(&needle) {
            return false;
        }
    }
    if let Some(needle) = &query.training {
        let needle = needle.to_lowercase();
        let acronym = proposition.training.acronym.to_lowercase();
        let title = proposition.training.title.to_lowercase();
        if !acronym.contains(&needle) && !title.contains(&needle) {
            return false;
        }
    }
    if let Some(matcher) = matcher {
        if !matcher.matches(&proposition.checklist) {
            return false;
        }
    }
    true
}

fn sort_rows(rows: &mut [ListingRow], sort: SortField, descending: bool) {
    rows.sort_by(|a, b| {
        let ordering = match sort {
            SortField::Reference => a.reference.cmp(&b.reference),
            SortField::CandidateName => a.candidate.cmp(&b.candidate),
            SortField::Training => a.training.cmp(&b.training),
            // Status sorts by workflow position, not alphabetically.
            SortField::Status => a.status.workflow_order().cmp(&b.status.workflow_order()),
            SortField::ModifiedAt => a.modified_at.cmp(&b.modified_at),
            SortField::SubmittedAt => match (a.submitted_at, b.submitted_at) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            },
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
