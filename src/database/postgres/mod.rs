// database/postgres - PostgreSQL backend
//
// Runtime-checked queries with manual row mapping. Enum columns are TEXT and
// tenant ids are VARCHAR; both are parsed back on read so a corrupt row
// surfaces as `DatabaseError::CorruptRow` instead of a panic.

mod audit;
mod projects;
mod tasks;
mod tenants;
mod users;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use super::manager::DatabaseError;
use crate::tenancy::TenantId;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Parse a TEXT column into one of the closed enums.
fn enum_column<T>(row: &PgRow, column: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| DatabaseError::CorruptRow(format!("{column}: {e}")))
}

fn tenant_column(row: &PgRow, column: &str) -> Result<TenantId, DatabaseError> {
    let raw: String = row.try_get(column)?;
    TenantId::new(raw).map_err(|e| DatabaseError::CorruptRow(format!("{column}: {e}")))
}

fn optional_tenant_column(row: &PgRow, column: &str) -> Result<Option<TenantId>, DatabaseError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(TenantId::new)
        .transpose()
        .map_err(|e| DatabaseError::CorruptRow(format!("{column}: {e}")))
}

/// Unique violations become `Conflict`; everything else passes through.
fn map_insert_error(err: sqlx::Error, what: &str) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return DatabaseError::Conflict(format!("{what} already exists"));
        }
    }
    DatabaseError::Sqlx(err)
}
