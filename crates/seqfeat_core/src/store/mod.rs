//! Backing store contract and persistence implementations.
//!
//! # Responsibility
//! - Define the batch-oriented contract the hierarchy layer needs from a
//!   key-value feature store.
//! - Keep SQL details out of the normalization and resolution logic.
//!
//! # Invariants
//! - Batch writes are all-or-nothing and return one id per input, in order.
//! - `fetch_many` returns one node per requested id, in request order.

pub mod sqlite_store;

use crate::db::DbError;
use crate::node::FeatureNode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier assigned by a store when a feature is persisted.
pub type FeatureId = i64;

/// Identity of one store instance, used to tell stores apart.
pub type StoreUid = Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Requested id is not present in the store.
    NotFound(FeatureId),
    /// Persisted data cannot be converted into a valid node.
    InvalidData(String),
    /// Node body could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "feature not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted feature data: {message}"),
            Self::Serialization(err) => write!(f, "feature body serialization failed: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "feature store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::Serialization(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Whether normalized subfeatures are stored searchable (`store`) or
    /// reachable only through their parent (`store_noindex`).
    pub index_subfeatures: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            index_subfeatures: true,
        }
    }
}

/// Batch key-value contract backing hierarchical features.
///
/// A node with a primary id overwrites its previous record (last write
/// wins); a node without one receives a fresh id.
pub trait FeatureStore {
    /// Stable identity of this store instance.
    fn store_uid(&self) -> StoreUid;

    /// Persists `nodes` as independently searchable records.
    fn store(&self, nodes: &[&FeatureNode]) -> StoreResult<Vec<FeatureId>>;

    /// Persists `nodes` without making them independently searchable.
    fn store_noindex(&self, nodes: &[&FeatureNode]) -> StoreResult<Vec<FeatureId>>;

    /// Dereferences a batch of ids in one round-trip.
    fn fetch_many(&self, ids: &[FeatureId]) -> StoreResult<Vec<FeatureNode>>;

    /// Global policy consulted when subfeatures are normalized.
    fn index_subfeatures(&self) -> bool;
}
