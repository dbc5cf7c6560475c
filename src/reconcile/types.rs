//! Outcome and policy types for reconciliation.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{CategoryItemRow, CategoryRow, ItemRow};
use crate::storage::{Filter, Relation, StoreAccessor};

/// How snapshot names are compared with stored names.
///
/// The same policy applies to novelty checks, id resolution, and stale
/// association detection, so the three can never disagree. Names are always
/// stored exactly as they appear in the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Byte-for-byte equality.
    #[default]
    Exact,
    /// Equality after trimming leading/trailing whitespace.
    Trimmed,
    /// Trimmed, then compared case-insensitively.
    CaseInsensitive,
}

impl MatchPolicy {
    /// Comparison key for `name` under this policy.
    #[must_use]
    pub fn key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            Self::Exact => Cow::Borrowed(name),
            Self::Trimmed => Cow::Borrowed(name.trim()),
            Self::CaseInsensitive => Cow::Owned(name.trim().to_lowercase()),
        }
    }

    /// Whether `a` and `b` name the same entity.
    #[must_use]
    pub fn same(&self, a: &str, b: &str) -> bool {
        match self {
            Self::Exact => a == b,
            Self::Trimmed => a.trim() == b.trim(),
            Self::CaseInsensitive => self.key(a) == self.key(b),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Trimmed => write!(f, "trimmed"),
            Self::CaseInsensitive => write!(f, "case-insensitive"),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "trimmed" | "trim" => Ok(Self::Trimmed),
            "case-insensitive" | "case_insensitive" | "ci" => Ok(Self::CaseInsensitive),
            other => Err(Error::InvalidArgument(format!(
                "unknown match policy: {other}"
            ))),
        }
    }
}

/// Why a single record could not be applied.
///
/// These never abort a run; they are logged and reported per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    /// An insert, re-read, or delete against the store failed.
    #[error("write to '{relation}' failed for '{entity}': {message}")]
    RecordWrite {
        relation: Relation,
        entity: String,
        message: String,
    },

    /// A snapshot item names a category or item the store does not have.
    #[error("'{entity}' references unknown {missing}")]
    Reference { entity: String, missing: String },
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// A new row was inserted with this id.
    Created { id: i64 },
    /// Already present (or, for pruning, still in the snapshot).
    Skipped,
    /// The row with this id was removed.
    Deleted { id: i64 },
    /// The record could not be applied.
    Failed { error: RecordError },
}

/// A record's label together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub entity: String,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

/// Per-step counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityStats {
    pub created: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl EntityStats {
    /// Total records processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.deleted + self.failed
    }

    /// Inserts plus deletes.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.created + self.deleted
    }
}

/// Outcome of one synchronizer step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub relation: Relation,
    pub stats: EntityStats,
    pub records: Vec<RecordReport>,
}

impl StepReport {
    #[must_use]
    pub fn new(relation: Relation) -> Self {
        Self {
            relation,
            stats: EntityStats::default(),
            records: Vec::new(),
        }
    }

    /// Record one outcome and bump the matching counter.
    pub fn push(&mut self, entity: impl Into<String>, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Created { .. } => self.stats.created += 1,
            RecordOutcome::Skipped => self.stats.skipped += 1,
            RecordOutcome::Deleted { .. } => self.stats.deleted += 1,
            RecordOutcome::Failed { .. } => self.stats.failed += 1,
        }
        self.records.push(RecordReport {
            entity: entity.into(),
            outcome,
        });
    }

    /// Failed records of this step.
    pub fn failures(&self) -> impl Iterator<Item = &RecordError> + '_ {
        self.records.iter().filter_map(|r| match &r.outcome {
            RecordOutcome::Failed { error } => Some(error),
            _ => None,
        })
    }
}

/// Outcome of a full reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub categories: StepReport,
    pub items: StepReport,
    pub category_items: StepReport,
    pub pruned: StepReport,
}

impl ReconcileReport {
    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> [&StepReport; 4] {
        [
            &self.categories,
            &self.items,
            &self.category_items,
            &self.pruned,
        ]
    }

    #[must_use]
    pub fn total_created(&self) -> usize {
        self.steps().iter().map(|s| s.stats.created).sum()
    }

    #[must_use]
    pub fn total_deleted(&self) -> usize {
        self.steps().iter().map(|s| s.stats.deleted).sum()
    }

    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.steps().iter().map(|s| s.stats.failed).sum()
    }

    /// Whether any record failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.total_failed() > 0
    }

    /// Whether the run changed nothing in the store.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.total_created() == 0 && self.total_deleted() == 0
    }
}

/// In-memory copy of the store, loaded once per run.
///
/// Synchronizer steps append rows they create so later steps see them
/// without re-querying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub categories: Vec<CategoryRow>,
    pub items: Vec<ItemRow>,
    pub category_items: Vec<CategoryItemRow>,
}

impl StoreSnapshot {
    /// Load all three relations from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if any relation cannot be read. This is fatal to
    /// the run.
    pub fn load<S: StoreAccessor + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            categories: load_rows(store, Relation::Categories)?,
            items: load_rows(store, Relation::Items)?,
            category_items: load_rows(store, Relation::CategoryItems)?,
        })
    }
}

fn load_rows<S, T>(store: &S, relation: Relation) -> Result<Vec<T>>
where
    S: StoreAccessor + ?Sized,
    T: for<'r> TryFrom<&'r crate::storage::Row, Error = Error>,
{
    store
        .get(relation, &Filter::all())?
        .iter()
        .map(T::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_policy_exact() {
        let p = MatchPolicy::Exact;
        assert!(p.same("Cola", "Cola"));
        assert!(!p.same("Cola", "cola"));
        assert!(!p.same("Cola ", "Cola"));
    }

    #[test]
    fn test_match_policy_trimmed() {
        let p = MatchPolicy::Trimmed;
        assert!(p.same(" Cola ", "Cola"));
        assert!(!p.same("Cola", "COLA"));
    }

    #[test]
    fn test_match_policy_case_insensitive() {
        let p = MatchPolicy::CaseInsensitive;
        assert!(p.same(" Cola", "COLA "));
        assert_eq!(p.key(" Iced Tea "), "iced tea");
    }

    #[test]
    fn test_match_policy_parse() {
        assert_eq!("exact".parse::<MatchPolicy>().unwrap(), MatchPolicy::Exact);
        assert_eq!(
            "Case-Insensitive".parse::<MatchPolicy>().unwrap(),
            MatchPolicy::CaseInsensitive
        );
        assert!("fuzzy".parse::<MatchPolicy>().is_err());
        assert_eq!(MatchPolicy::CaseInsensitive.to_string(), "case-insensitive");
    }

    #[test]
    fn test_step_report_counts() {
        let mut step = StepReport::new(Relation::Items);
        step.push("Cola", RecordOutcome::Created { id: 1 });
        step.push("Cola", RecordOutcome::Skipped);
        step.push(
            "Chips",
            RecordOutcome::Failed {
                error: RecordError::RecordWrite {
                    relation: Relation::Items,
                    entity: "Chips".into(),
                    message: "locked".into(),
                },
            },
        );
        assert_eq!(step.stats.created, 1);
        assert_eq!(step.stats.skipped, 1);
        assert_eq!(step.stats.failed, 1);
        assert_eq!(step.stats.total(), 3);
        assert_eq!(step.failures().count(), 1);
    }
}
