//! Admissions-management core.
//!
//! Tracks an admission proposition through its multi-actor workflow
//! (candidate submission, supervisory-group signatures, CDD decision,
//! SIC decision), maintains the per-tab checklist state attached to each
//! proposition, records an audit history, queues templated notifications
//! and serves the filterable staff listing.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
