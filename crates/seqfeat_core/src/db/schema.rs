//! The `features` schema and its version stamp.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Revision of `schema.sql`; stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Creates the `features` table and indexes on a blank database.
///
/// A connection already at [`SCHEMA_VERSION`] is left untouched.
///
/// # Errors
/// - `SchemaMismatch` when the database is stamped with another version.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    match schema_version(conn)? {
        SCHEMA_VERSION => Ok(()),
        0 => {
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA_SQL)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
            info!("event=schema_create module=db status=ok version={SCHEMA_VERSION}");
            Ok(())
        }
        found => Err(DbError::SchemaMismatch {
            found,
            expected: SCHEMA_VERSION,
        }),
    }
}

/// Reads the version stamp; `0` for a blank database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
