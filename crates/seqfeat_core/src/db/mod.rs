//! SQLite connection bootstrap for the feature store.
//!
//! # Invariants
//! - A usable connection carries the `features` schema at
//!   [`SCHEMA_VERSION`], recorded in `PRAGMA user_version`.
//! - Databases stamped with any other non-zero version are refused, never
//!   rewritten.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod schema;

pub use open::{open_db, open_db_in_memory};
pub use schema::{ensure_schema, schema_version, SCHEMA_VERSION};

pub type DbResult<T> = Result<T, DbError>;

/// Longest SQLite error text carried into messages.
const MAX_SQLITE_MESSAGE_CHARS: usize = 240;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// File belongs to another schema revision or another application.
    SchemaMismatch { found: u32, expected: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            // Input errors echo the full statement; keep messages bounded.
            Self::Sqlite(err) => f.write_str(&bounded_message(&err.to_string())),
            Self::SchemaMismatch { found, expected } => write!(
                f,
                "feature database has schema version {found}, expected {expected}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

fn bounded_message(message: &str) -> String {
    let single_line = message.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= MAX_SQLITE_MESSAGE_CHARS {
        return single_line;
    }
    let mut truncated: String = single_line.chars().take(MAX_SQLITE_MESSAGE_CHARS).collect();
    truncated.push_str("...");
    truncated
}
