//! Hierarchical, store-backed feature nodes.
//!
//! # Responsibility
//! - Extend the flat [`FeatureRecord`] with ordered children that are either
//!   embedded or referenced by store id.
//! - Persist nodes through a non-owning store reference and write them back
//!   after every child addition once they have an identity.
//!
//! # Invariants
//! - `primary_id` is set only by a store; `None` means transient.
//! - Normalized children are only accepted while a live store is attached.
//! - The node never owns its store; the store owns the persisted form.

mod bounds;
pub mod child;
mod normalize;
pub mod options;
mod resolve;

use crate::model::feature::{FeatureRecord, SeqFeature};
use crate::model::label::{format_label, LabelParts, LabelStyle};
use crate::model::strand::Strand;
use crate::model::target::TargetSegment;
use crate::node::bounds::orient;
use crate::store::{FeatureId, FeatureStore, StoreError};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};

pub use child::{ChildInput, ChildRef};
pub use options::FeatureOptions;

pub type NodeResult<T> = Result<T, NodeError>;

/// Errors raised by construction, child addition and child resolution.
#[derive(Debug)]
pub enum NodeError {
    /// Operation needs a backing store that is absent or already dropped.
    Configuration(&'static str),
    /// A child input matches none of the accepted shapes.
    InvalidChild(String),
    /// Constructor options document is malformed.
    InvalidOptions(String),
    /// A store insert/update call failed.
    StoreWrite(StoreError),
    /// A store batch fetch failed.
    StoreRead(StoreError),
    /// A normalized child has no identifier after a successful store write.
    NoIdentity { position: usize },
    /// Lowercase-initial names are not type shortcuts.
    MethodNotFound(String),
}

impl Display for NodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(details) => write!(f, "feature configuration error: {details}"),
            Self::InvalidChild(details) => write!(f, "invalid subfeature: {details}"),
            Self::InvalidOptions(details) => write!(f, "invalid feature options: {details}"),
            Self::StoreWrite(err) => write!(f, "feature store write failed: {err}"),
            Self::StoreRead(err) => write!(f, "feature store fetch failed: {err}"),
            Self::NoIdentity { position } => write!(
                f,
                "normalized subfeature at position {position} has no identifier after store write"
            ),
            Self::MethodNotFound(name) => write!(f, "no such feature method: {name}"),
        }
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreWrite(err) => Some(err),
            Self::StoreRead(err) => Some(err),
            _ => None,
        }
    }
}

/// A feature record plus its ordered children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureNode {
    #[serde(skip)]
    primary_id: Option<FeatureId>,
    record: FeatureRecord,
    /// Type given to children materialized from coordinate pairs.
    subtype: Option<String>,
    #[serde(default)]
    children: Vec<ChildRef>,
    #[serde(skip)]
    store: Option<Weak<dyn FeatureStore>>,
}

impl FeatureNode {
    /// Builds a node from `options`, persisting it when `store` is given.
    ///
    /// Initial `segments` are embedded. With a store the node is written via
    /// `store` or `store_noindex` (per `options.index`) and keeps a
    /// non-owning reference to it.
    pub fn new(options: FeatureOptions, store: Option<&Rc<dyn FeatureStore>>) -> NodeResult<Self> {
        let FeatureOptions {
            mut record,
            subtype,
            segments,
            index,
        } = options;

        orient(&mut record);

        let mut node = Self {
            record,
            subtype,
            ..Self::default()
        };
        if !segments.is_empty() {
            node.add_segment(segments)?;
        }

        if let Some(store) = store {
            let written = if index {
                store.store(&[&node])
            } else {
                store.store_noindex(&[&node])
            };
            let ids = written.map_err(NodeError::StoreWrite)?;
            let id = ids
                .first()
                .copied()
                .ok_or(NodeError::NoIdentity { position: 0 })?;
            node.primary_id = Some(id);
            node.store = Some(Rc::downgrade(store));
            info!(
                "event=feature_create module=node status=ok primary_id={} indexed={} children={}",
                id,
                index,
                node.children.len()
            );
        }

        Ok(node)
    }

    /// Wraps a record as a transient node without children.
    pub fn from_record(record: FeatureRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    pub fn primary_id(&self) -> Option<FeatureId> {
        self.primary_id
    }

    pub fn record(&self) -> &FeatureRecord {
        &self.record
    }

    /// Mutable access to tags and descriptive fields.
    ///
    /// Callers must keep `start <= end`; call [`FeatureNode::update`] to
    /// persist the change.
    pub fn record_mut(&mut self) -> &mut FeatureRecord {
        &mut self.record
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    /// Backing child list, in insertion order.
    pub fn children(&self) -> &[ChildRef] {
        &self.children
    }

    /// Live backing store, if one is attached and still alive.
    pub fn object_store(&self) -> Option<Rc<dyn FeatureStore>> {
        self.store.as_ref().and_then(Weak::upgrade)
    }

    /// Writes the node back to its store; no-op for transient nodes.
    pub fn update(&self) -> NodeResult<()> {
        let Some(id) = self.primary_id else {
            return Ok(());
        };
        let store = self.live_store()?;
        store.store(&[self]).map_err(NodeError::StoreWrite)?;
        info!(
            "event=feature_update module=node status=ok primary_id={} children={}",
            id,
            self.children.len()
        );
        Ok(())
    }

    /// `method(name)` / `method:source(name)` label.
    pub fn label(&self) -> String {
        self.to_display_string(LabelStyle::Named)
    }

    pub fn to_display_string(&self, style: LabelStyle) -> String {
        let parts = LabelParts {
            display_name: self.record.display_name.as_deref(),
            load_id: self.record.load_id(),
            primary_id: self.primary_id,
            method: self.record.primary_tag.as_deref(),
            source: self.record.source_tag.as_deref(),
        };
        format_label(&parts, style)
    }

    pub fn load_id(&self) -> Option<&str> {
        self.record.load_id()
    }

    pub fn notes(&self) -> &[String] {
        self.record.notes()
    }

    pub fn target(&self) -> Vec<TargetSegment> {
        self.record.targets()
    }

    pub fn type_string(&self) -> Option<String> {
        self.record.type_string()
    }

    pub(crate) fn with_primary_id(mut self, id: FeatureId) -> Self {
        self.primary_id = Some(id);
        self
    }

    fn live_store(&self) -> NodeResult<Rc<dyn FeatureStore>> {
        match &self.store {
            None => Err(NodeError::Configuration("feature has no backing store")),
            Some(store) => store
                .upgrade()
                .ok_or(NodeError::Configuration("backing store has been dropped")),
        }
    }

    fn belongs_to(&self, store: &Rc<dyn FeatureStore>) -> bool {
        self.primary_id.is_some()
            && self
                .object_store()
                .is_some_and(|own| own.store_uid() == store.store_uid())
    }
}

impl SeqFeature for FeatureNode {
    fn seq_id(&self) -> Option<&str> {
        self.record.seq_id()
    }

    fn start(&self) -> Option<i64> {
        self.record.start
    }

    fn end(&self) -> Option<i64> {
        self.record.end
    }

    fn strand(&self) -> Strand {
        self.record.strand
    }

    fn primary_tag(&self) -> Option<&str> {
        self.record.primary_tag()
    }

    fn source_tag(&self) -> Option<&str> {
        self.record.source_tag()
    }

    fn display_name(&self) -> Option<&str> {
        self.record.display_name()
    }

    fn score(&self) -> Option<f64> {
        self.record.score
    }

    fn phase(&self) -> Option<u8> {
        self.record.phase
    }

    fn all_tags(&self) -> Vec<String> {
        self.record.all_tags()
    }

    fn tag_values(&self, tag: &str) -> Vec<String> {
        self.record.tag_values(tag)
    }
}
