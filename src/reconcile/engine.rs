//! The reconciliation engine.
//!
//! A run converges the store to a snapshot in four strictly ordered steps:
//!
//! 1. [`Reconciler::sync_categories`] inserts categories the store lacks.
//! 2. [`Reconciler::sync_items`] inserts items the store lacks (by name only).
//! 3. [`Reconciler::sync_category_items`] inserts missing placements. It
//!    resolves ids from the rows steps 1 and 2 appended to the snapshot.
//! 4. [`Reconciler::prune_stale_category_items`] deletes placements the
//!    snapshot no longer lists, and any placement whose ids do not resolve.
//!
//! Categories and items are never deleted. Every insert and delete commits
//! on its own; a failed record is reported and the step moves on.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::model::{CategoryItemRow, CategoryRecord, CategoryRow, ItemRecord, ItemRow};
use crate::storage::{Column, Filter, Relation, Row, StoreAccessor};

use super::types::{
    MatchPolicy, ReconcileReport, RecordError, RecordOutcome, StepReport, StoreSnapshot,
};

/// Applies snapshots to a store.
pub struct Reconciler<'a, S: StoreAccessor + ?Sized> {
    store: &'a mut S,
    policy: MatchPolicy,
}

impl<'a, S: StoreAccessor + ?Sized> Reconciler<'a, S> {
    /// Create a reconciler over `store` comparing names with `policy`.
    #[must_use]
    pub fn new(store: &'a mut S, policy: MatchPolicy) -> Self {
        Self { store, policy }
    }

    /// Run a full pass against freshly loaded store state.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read at the start of the
    /// run. Per-record failures are in the returned report.
    pub fn reconcile(
        &mut self,
        file_categories: &[CategoryRecord],
        file_items: &[ItemRecord],
    ) -> Result<ReconcileReport> {
        let mut snapshot = StoreSnapshot::load(&*self.store)?;
        debug!(
            categories = snapshot.categories.len(),
            items = snapshot.items.len(),
            category_items = snapshot.category_items.len(),
            "Loaded store snapshot"
        );
        Ok(self.reconcile_with(file_categories, file_items, &mut snapshot))
    }

    /// Run a full pass against an already loaded `snapshot`, which is
    /// updated in place to mirror the store afterwards.
    pub fn reconcile_with(
        &mut self,
        file_categories: &[CategoryRecord],
        file_items: &[ItemRecord],
        snapshot: &mut StoreSnapshot,
    ) -> ReconcileReport {
        let categories = self.sync_categories(file_categories, &mut snapshot.categories);
        let items = self.sync_items(file_items, &mut snapshot.items);
        let category_items = self.sync_category_items(
            file_items,
            &snapshot.items,
            &snapshot.categories,
            &mut snapshot.category_items,
        );
        let pruned = self.prune_stale_category_items(
            file_items,
            &snapshot.items,
            &snapshot.categories,
            &mut snapshot.category_items,
        );

        ReconcileReport {
            categories,
            items,
            category_items,
            pruned,
        }
    }

    /// Insert every snapshot category not already in `db_categories`.
    ///
    /// Created rows are appended to `db_categories`, so a category listed
    /// twice in the file is only inserted once.
    pub fn sync_categories(
        &mut self,
        file_categories: &[CategoryRecord],
        db_categories: &mut Vec<CategoryRow>,
    ) -> StepReport {
        let mut report = StepReport::new(Relation::Categories);

        for record in file_categories {
            if db_categories
                .iter()
                .any(|c| self.policy.same(&c.name, &record.name))
            {
                debug!(name = %record.name, "Category exists");
                report.push(&record.name, RecordOutcome::Skipped);
                continue;
            }

            let created: Result<CategoryRow> = self.insert_and_read_back(
                Relation::Categories,
                &record.insert_row(),
                &Filter::eq(Column::Name, record.name.as_str()),
            );
            let outcome = match created {
                Ok(row) => {
                    info!(id = row.id, name = %row.name, "Created category");
                    let id = row.id;
                    db_categories.push(row);
                    RecordOutcome::Created { id }
                }
                Err(e) => write_failed(Relation::Categories, &record.name, &e),
            };
            report.push(&record.name, outcome);
        }

        report
    }

    /// Insert every snapshot item not already in `db_items`.
    ///
    /// Identity is the item name alone; the category an item is listed under
    /// plays no part here.
    pub fn sync_items(&mut self, file_items: &[ItemRecord], db_items: &mut Vec<ItemRow>) -> StepReport {
        let mut report = StepReport::new(Relation::Items);

        for record in file_items {
            if db_items.iter().any(|i| self.policy.same(&i.name, &record.name)) {
                debug!(name = %record.name, "Item exists");
                report.push(&record.name, RecordOutcome::Skipped);
                continue;
            }

            let created: Result<ItemRow> = self.insert_and_read_back(
                Relation::Items,
                &record.insert_row(),
                &Filter::eq(Column::Name, record.name.as_str()),
            );
            let outcome = match created {
                Ok(row) => {
                    info!(id = row.id, name = %row.name, "Created item");
                    let id = row.id;
                    db_items.push(row);
                    RecordOutcome::Created { id }
                }
                Err(e) => write_failed(Relation::Items, &record.name, &e),
            };
            report.push(&record.name, outcome);
        }

        report
    }

    /// Insert a placement for every snapshot item whose
    /// `(category, item)` pair is not in `db_category_items`.
    ///
    /// Must run after [`Self::sync_categories`] and [`Self::sync_items`] so
    /// that every name in a well-formed snapshot resolves to an id.
    pub fn sync_category_items(
        &mut self,
        file_items: &[ItemRecord],
        db_items: &[ItemRow],
        db_categories: &[CategoryRow],
        db_category_items: &mut Vec<CategoryItemRow>,
    ) -> StepReport {
        let mut report = StepReport::new(Relation::CategoryItems);

        for record in file_items {
            let label = pair_label(&record.category_name, &record.name);

            let Some(category_id) = db_categories
                .iter()
                .find(|c| self.policy.same(&c.name, &record.category_name))
                .map(|c| c.id)
            else {
                report.push(
                    &label,
                    unresolved(&label, format!("category '{}'", record.category_name)),
                );
                continue;
            };
            let Some(item_id) = db_items
                .iter()
                .find(|i| self.policy.same(&i.name, &record.name))
                .map(|i| i.id)
            else {
                report.push(&label, unresolved(&label, format!("item '{}'", record.name)));
                continue;
            };

            if db_category_items
                .iter()
                .any(|ci| ci.category_id == category_id && ci.item_id == item_id)
            {
                debug!(pair = %label, "Category item exists");
                report.push(&label, RecordOutcome::Skipped);
                continue;
            }

            let created: Result<CategoryItemRow> = self.insert_and_read_back(
                Relation::CategoryItems,
                &CategoryItemRow::insert_row(category_id, item_id),
                &Filter::eq(Column::CategoryId, category_id).and(Column::ItemId, item_id),
            );
            let outcome = match created {
                Ok(row) => {
                    info!(id = row.id, category_id, item_id, pair = %label, "Created category item");
                    let id = row.id;
                    db_category_items.push(row);
                    RecordOutcome::Created { id }
                }
                Err(e) => write_failed(Relation::CategoryItems, &label, &e),
            };
            report.push(&label, outcome);
        }

        report
    }

    /// Delete placements the snapshot no longer lists.
    ///
    /// A placement is stale when its ids do not resolve against
    /// `db_categories`/`db_items` (an orphan), or when its resolved
    /// `(item, category)` names appear in no snapshot item. Deleted rows are
    /// removed from `db_category_items`; rows whose delete failed stay.
    pub fn prune_stale_category_items(
        &mut self,
        file_items: &[ItemRecord],
        db_items: &[ItemRow],
        db_categories: &[CategoryRow],
        db_category_items: &mut Vec<CategoryItemRow>,
    ) -> StepReport {
        let mut report = StepReport::new(Relation::CategoryItems);
        let policy = self.policy;
        let wanted: HashSet<(_, _)> = file_items
            .iter()
            .map(|r| (policy.key(&r.category_name), policy.key(&r.name)))
            .collect();
        let mut removed = HashSet::new();

        for ci in db_category_items.iter() {
            let category = db_categories.iter().find(|c| c.id == ci.category_id);
            let item = db_items.iter().find(|i| i.id == ci.item_id);

            let label = match (category, item) {
                (Some(c), Some(i)) => {
                    let label = pair_label(&c.name, &i.name);
                    if wanted.contains(&(policy.key(&c.name), policy.key(&i.name))) {
                        report.push(label, RecordOutcome::Skipped);
                        continue;
                    }
                    label
                }
                _ => format!(
                    "orphan #{} (category_id {}, item_id {})",
                    ci.id, ci.category_id, ci.item_id
                ),
            };

            let outcome = match self
                .store
                .delete(Relation::CategoryItems, &Filter::eq(Column::Id, ci.id))
            {
                Ok(n) => {
                    info!(id = ci.id, pair = %label, rows = n, "Deleted stale category item");
                    removed.insert(ci.id);
                    RecordOutcome::Deleted { id: ci.id }
                }
                Err(e) => write_failed(Relation::CategoryItems, &label, &e),
            };
            report.push(label, outcome);
        }

        db_category_items.retain(|ci| !removed.contains(&ci.id));
        report
    }

    /// Insert one row, then read it back by `lookup` to learn its id.
    fn insert_and_read_back<T>(&mut self, relation: Relation, row: &Row, lookup: &Filter) -> Result<T>
    where
        T: for<'r> TryFrom<&'r Row, Error = Error>,
    {
        self.store.write(relation, std::slice::from_ref(row))?;
        let rows = self.store.get(relation, lookup)?;
        let stored = rows.first().ok_or_else(|| {
            Error::Other(format!("row not found in '{relation}' after insert"))
        })?;
        T::try_from(stored)
    }
}

fn pair_label(category: &str, item: &str) -> String {
    format!("{category} / {item}")
}

fn write_failed(relation: Relation, entity: &str, e: &Error) -> RecordOutcome {
    error!(relation = %relation, entity, error = %e, "Record write failed, skipping");
    RecordOutcome::Failed {
        error: RecordError::RecordWrite {
            relation,
            entity: entity.to_string(),
            message: e.to_string(),
        },
    }
}

fn unresolved(entity: &str, missing: String) -> RecordOutcome {
    error!(entity, missing = %missing, "Unresolved reference, skipping");
    RecordOutcome::Failed {
        error: RecordError::Reference {
            entity: entity.to_string(),
            missing,
        },
    }
}
