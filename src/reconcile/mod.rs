//! Snapshot-to-store reconciliation.
//!
//! # Submodules
//!
//! - [`engine`] - The [`Reconciler`] and its four synchronizer steps
//! - [`types`] - Match policy, per-record outcomes, and run reports

pub mod engine;
pub mod types;

pub use engine::Reconciler;
pub use types::{
    EntityStats, MatchPolicy, ReconcileReport, RecordError, RecordOutcome, RecordReport,
    StepReport, StoreSnapshot,
};
