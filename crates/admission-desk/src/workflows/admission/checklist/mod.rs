//! Per-admission checklist state: one typed status plus a free-form extra
//! payload per tab, with child fragments for the curriculum experiences.

mod catalog;
mod filter;
mod state;

pub use catalog::{StatusCatalog, StatusConfig, TabCatalog};
pub use filter::{ChecklistFilterMode, ChecklistFilters, ChecklistMatcher};
pub use state::{Checklist, ChecklistStatus, ChecklistTab, TabState, EXPERIENCE_ID_KEY};
