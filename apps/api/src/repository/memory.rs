use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::errors::AppError;
use crate::models::Entity;
use crate::repository::Repository;

/// In-memory repository for tests and `STORE=memory` local runs.
///
/// Ids are assigned from a per-table counter, like an identity column.
#[derive(Debug)]
pub struct MemoryRepository<E: Entity> {
    table: Mutex<Table<E>>,
}

#[derive(Debug)]
struct Table<E> {
    rows: BTreeMap<i64, E>,
    next_id: i64,
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        MemoryRepository {
            table: Mutex::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut Table<E>) -> Result<T, AppError>) -> Result<T, AppError> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("{} table lock poisoned", E::NAME)))?;
        f(&mut table)
    }
}

/// Rows with `id` that sit inside `scope`; anything else is not found.
fn scoped_mut<E: Entity>(table: &mut Table<E>, scope: E::Scope, id: i64) -> Result<&mut E, AppError> {
    table
        .rows
        .get_mut(&id)
        .filter(|row| row.scope() == scope)
        .ok_or_else(|| AppError::not_found(E::NAME))
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn list(&self, scope: E::Scope) -> Result<Vec<E>, AppError> {
        self.with_table(|table| {
            let mut rows: Vec<E> = table
                .rows
                .values()
                .filter(|row| row.scope() == scope)
                .cloned()
                .collect();
            E::sort_for_listing(&mut rows);
            debug!("Listed {} {} rows for scope {scope}", rows.len(), E::NAME);
            Ok(rows)
        })
    }

    async fn get(&self, scope: E::Scope, id: i64) -> Result<E, AppError> {
        self.with_table(|table| scoped_mut(table, scope, id).map(|row| row.clone()))
    }

    async fn create(&self, scope: E::Scope, fields: E::Fields) -> Result<E, AppError> {
        self.with_table(|table| {
            if E::UNIQUE_PER_SCOPE && table.rows.values().any(|row| row.scope() == scope) {
                return Err(AppError::Conflict(format!(
                    "A {} already exists for {scope}",
                    E::NAME
                )));
            }
            let id = table.next_id;
            table.next_id += 1;
            let row = E::build(id, scope, fields, Utc::now());
            table.rows.insert(id, row.clone());
            debug!("Inserted {} {id} for scope {scope}", E::NAME);
            Ok(row)
        })
    }

    async fn update(&self, scope: E::Scope, id: i64, patch: E::Patch) -> Result<E, AppError> {
        self.with_table(|table| {
            let row = scoped_mut(table, scope, id)?;
            row.apply(patch, Utc::now());
            debug!("Updated {} {id} for scope {scope}", E::NAME);
            Ok(row.clone())
        })
    }

    async fn delete(&self, scope: E::Scope, id: i64) -> Result<(), AppError> {
        self.with_table(|table| {
            scoped_mut(table, scope, id)?;
            table.rows.remove(&id);
            debug!("Deleted {} {id} for scope {scope}", E::NAME);
            Ok(())
        })
    }
}
