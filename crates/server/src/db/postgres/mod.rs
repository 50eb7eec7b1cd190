//! `PostgreSQL` repositories.
//!
//! Queries are checked at runtime (`query_as::<_, Row>`); rows are decoded
//! into internal `*Row` structs and converted to domain models through
//! `TryFrom`, so malformed stored values surface as
//! [`RepositoryError::DataCorruption`] instead of panics.

mod activity;
mod catalog;
mod content;
mod orders;
mod settings;
mod users;

use std::fmt::Display;
use std::str::FromStr;

use sqlx::PgPool;

use super::RepositoryError;

/// Repositories sharing one connection pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Decode a `TEXT` column into one of the string-backed enums.
fn parse_column<T>(column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Map unique and foreign-key violations to `Conflict`.
fn conflict_or_database(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Row count to `NotFound` when nothing was touched.
const fn require_affected(rows: u64) -> Result<(), RepositoryError> {
    if rows == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

/// SQL `LIMIT` from a caller-supplied size.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
