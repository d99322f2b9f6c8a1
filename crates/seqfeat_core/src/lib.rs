//! Hierarchical genomic features backed by a key-value feature store.
//!
//! Children of a feature are either embedded in the parent or persisted on
//! their own and referenced by id; referenced children are re-materialized
//! lazily with one batch fetch per lookup.

pub mod db;
pub mod logging;
pub mod model;
pub mod node;
pub mod store;

pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
};
pub use model::feature::{FeatureRecord, SeqFeature};
pub use model::label::LabelStyle;
pub use model::strand::Strand;
pub use model::target::TargetSegment;
pub use model::type_filter::TypeFilter;
pub use node::{ChildInput, ChildRef, FeatureNode, FeatureOptions, NodeError, NodeResult};
pub use store::sqlite_store::SqliteFeatureStore;
pub use store::{FeatureId, FeatureStore, StoreError, StoreOptions, StoreResult, StoreUid};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
