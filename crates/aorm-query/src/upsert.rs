//! Insert-or-update policy.
//!
//! Deciding between INSERT and UPDATE is a small state machine:
//! `Unknown -> Insert | Update -> Resolved(kind)`. The decision is made in
//! one of two modes, chosen by `Settings::exact_insert_or_update`:
//!
//! - **Fast**: an unset key (NULL, zero, empty) means insert, anything else
//!   means update. An update that matches no row is not an error.
//! - **Exact**: the row is looked up by key first; insert if absent.

use aorm_core::{Entity, Executor, LOG_TAG, Result, Settings, TableDescriptor, Value};

use crate::dml::{self, Statement};

/// Which statement an insert-or-update ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Insert,
    Update,
}

/// Progress of one insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertState {
    Unknown,
    Insert,
    Update,
    Resolved(UpsertKind),
}

impl UpsertState {
    /// Move from `Unknown` to the decided statement kind.
    fn decide(self, kind: UpsertKind) -> Self {
        debug_assert_eq!(self, UpsertState::Unknown);
        match kind {
            UpsertKind::Insert => UpsertState::Insert,
            UpsertKind::Update => UpsertState::Update,
        }
    }

    /// Mark the decided statement as executed.
    fn resolve(self) -> Self {
        match self {
            UpsertState::Insert => UpsertState::Resolved(UpsertKind::Insert),
            UpsertState::Update => UpsertState::Resolved(UpsertKind::Update),
            other => other,
        }
    }

    /// The decided kind, if a decision has been made.
    pub fn kind(self) -> Option<UpsertKind> {
        match self {
            UpsertState::Unknown => None,
            UpsertState::Insert => Some(UpsertKind::Insert),
            UpsertState::Update => Some(UpsertKind::Update),
            UpsertState::Resolved(kind) => Some(kind),
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, UpsertState::Resolved(_))
    }
}

/// Result of a completed insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub kind: UpsertKind,
    /// Rows changed by the statement; 0 for a fast-mode update of a missing row
    pub rows_affected: u64,
    /// Row id assigned by an insert
    pub row_id: Option<i64>,
}

/// Decides and runs insert-or-update statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertPolicy {
    exact: bool,
}

impl UpsertPolicy {
    pub const fn fast() -> Self {
        Self { exact: false }
    }

    pub const fn exact() -> Self {
        Self { exact: true }
    }

    /// The policy currently selected by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            exact: settings.exact_insert_or_update(),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Decide between insert and update for a row with primary key `key`.
    ///
    /// Exact mode queries `executor`; fast mode never touches it.
    pub fn decide<X: Executor + ?Sized>(
        &self,
        table: &TableDescriptor,
        key: &Value,
        executor: &X,
        settings: &Settings,
    ) -> Result<UpsertKind> {
        if !self.exact {
            return Ok(if key.is_unset_key() {
                UpsertKind::Insert
            } else {
                UpsertKind::Update
            });
        }

        let stmt = dml::select_by_key(table, key.clone())?;
        stmt.log(settings);
        let existing = executor.query_one(&stmt.sql, &stmt.params)?;
        Ok(if existing.is_some() {
            UpsertKind::Update
        } else {
            UpsertKind::Insert
        })
    }

    /// Insert or update `entity` and return what happened.
    ///
    /// A key generated by an insert is stored back on the entity.
    pub fn run<E: Entity, X: Executor + ?Sized>(
        &self,
        table: &TableDescriptor,
        entity: &mut E,
        executor: &X,
        settings: &Settings,
    ) -> Result<UpsertOutcome> {
        let key = dml::key_value(table, entity)?;
        let mut state = UpsertState::Unknown;
        state = state.decide(self.decide(table, &key, executor, settings)?);
        tracing::trace!(table = %table.name(), exact = self.exact, state = ?state, "upsert decided");

        let outcome = match state {
            UpsertState::Insert => {
                let row_id = insert_entity(table, entity, executor, settings)?;
                UpsertOutcome {
                    kind: UpsertKind::Insert,
                    rows_affected: 1,
                    row_id: Some(row_id),
                }
            }
            _ => {
                let stmt = dml::update(table, entity)?;
                stmt.log(settings);
                let rows_affected = executor.execute(&stmt.sql, &stmt.params)?;
                if rows_affected == 0 && settings.debug() {
                    tracing::debug!(tag = LOG_TAG, table = %table.name(), "update matched no row");
                }
                UpsertOutcome {
                    kind: UpsertKind::Update,
                    rows_affected,
                    row_id: None,
                }
            }
        };

        state = state.resolve();
        debug_assert!(state.is_resolved());
        Ok(outcome)
    }
}

/// Insert `entity` and store a database-assigned key back on it.
///
/// Returns the row id of the new row.
pub fn insert_entity<E: Entity, X: Executor + ?Sized>(
    table: &TableDescriptor,
    entity: &mut E,
    executor: &X,
    settings: &Settings,
) -> Result<i64> {
    let stmt: Statement = dml::insert(table, entity)?;
    stmt.log(settings);
    let row_id = executor.insert(&stmt.sql, &stmt.params)?;

    if let Some(pk) = table.primary_key() {
        if pk.is_generated_key() && dml::key_value(table, entity)?.is_unset_key() {
            entity.set_primary_key(Value::BigInt(row_id))?;
        }
    }
    Ok(row_id)
}
