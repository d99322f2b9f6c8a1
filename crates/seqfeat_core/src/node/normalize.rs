//! Subfeature normalization: turning child inputs into child references.
//!
//! # Invariants
//! - Normalized additions require a live store and write all new children
//!   in one batch call.
//! - Children already persisted in this node's store are referenced as-is.
//! - Every child is stored with `start <= end`; inverted inputs are swapped
//!   onto the reverse strand.
//! - A failed addition leaves the node's bounds and children as they were.
//!   Records already written by the batch call stay in the store.

use crate::model::feature::FeatureRecord;
use crate::node::bounds::{fix_boundaries, orient};
use crate::node::child::{ChildInput, ChildRef};
use crate::node::{FeatureNode, NodeError, NodeResult};
use crate::store::FeatureStore;
use log::{debug, error, info};
use std::rc::Rc;
use std::time::Instant;

impl FeatureNode {
    /// Adds children as independent store records referenced by id.
    ///
    /// # Errors
    /// - `Configuration` when no live store is attached; children are left
    ///   unchanged.
    /// - `StoreWrite` when the batch insert or the write-back fails.
    /// - `NoIdentity` when the store returns fewer ids than it was given.
    pub fn add_seq_feature<I>(&mut self, children: I) -> NodeResult<()>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        self.add_children(children.into_iter().map(Into::into).collect(), true)
    }

    /// Adds children embedded in this node, stripping any store identity.
    pub fn add_segment<I>(&mut self, children: I) -> NodeResult<()>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        self.add_children(children.into_iter().map(Into::into).collect(), false)
    }

    fn add_children(&mut self, inputs: Vec<ChildInput>, normalized: bool) -> NodeResult<()> {
        let started_at = Instant::now();
        let store = if normalized {
            Some(self.live_store().inspect_err(|err| {
                error!(
                    "event=subfeature_add module=node status=error normalized=true error_code=no_store error={err}"
                );
            })?)
        } else {
            None
        };

        let input_count = inputs.len();
        let mut candidates = Vec::with_capacity(input_count);
        for input in inputs {
            if let Some(candidate) = self.materialize(input, normalized) {
                candidates.push(candidate);
            }
        }

        let store_ids = match &store {
            Some(store) => {
                persist_candidates(store, &mut candidates)?;
                let ids = candidates
                    .iter()
                    .enumerate()
                    .map(|(position, candidate)| {
                        candidate
                            .primary_id
                            .ok_or(NodeError::NoIdentity { position })
                    })
                    .collect::<NodeResult<Vec<_>>>()?;
                Some(ids)
            }
            None => None,
        };

        let previous_record = self.record.clone();
        let previous_len = self.children.len();

        fix_boundaries(&mut self.record, candidates.iter().map(|child| &child.record));
        let added = candidates.len();
        match store_ids {
            Some(ids) => self.children.extend(ids.into_iter().map(ChildRef::StoreId)),
            None => self.children.extend(
                candidates
                    .into_iter()
                    .map(|candidate| ChildRef::Embedded(Box::new(candidate))),
            ),
        }

        if let Err(err) = self.update() {
            self.record = previous_record;
            self.children.truncate(previous_len);
            error!(
                "event=subfeature_add module=node status=error normalized={} added={} error_code=write_back_failed error={}",
                normalized,
                added,
                err
            );
            return Err(err);
        }

        debug!(
            "event=subfeature_add module=node status=ok normalized={} inputs={} added={} duration_ms={}",
            normalized,
            input_count,
            added,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Builds the oriented candidate for one input, or `None` for a skipped pair.
    fn materialize(&self, input: ChildInput, normalized: bool) -> Option<FeatureNode> {
        let mut candidate = match input {
            ChildInput::Node(mut node) => {
                if !normalized {
                    node.primary_id = None;
                    node.store = None;
                }
                Some(node)
            }
            ChildInput::Range {
                start: Some(start),
                end: Some(end),
            } => Some(self.child_from_range(start, end)),
            ChildInput::Range { start, end } => {
                debug!(
                    "event=subfeature_skip module=node status=ok reason=missing_coordinate start={:?} end={:?}",
                    start, end
                );
                None
            }
            ChildInput::Feature(feature) => Some(FeatureNode::from_record(
                FeatureRecord::from_feature(feature.as_ref()),
            )),
        }?;
        orient(&mut candidate.record);
        Some(candidate)
    }

    /// New child inheriting this node's reference, child type and naming.
    fn child_from_range(&self, start: i64, end: i64) -> FeatureNode {
        FeatureNode::from_record(FeatureRecord {
            seq_id: self.record.seq_id.clone(),
            start: Some(start),
            end: Some(end),
            strand: self.record.strand,
            primary_tag: self
                .subtype
                .clone()
                .or_else(|| self.record.primary_tag.clone()),
            source_tag: self.record.source_tag.clone(),
            display_name: self.record.display_name.clone(),
            ..FeatureRecord::default()
        })
    }
}

/// Writes every candidate without an identity in `store` as one batch.
///
/// Candidates persisted in another store lose their foreign id and are
/// inserted fresh.
fn persist_candidates(
    store: &Rc<dyn FeatureStore>,
    candidates: &mut [FeatureNode],
) -> NodeResult<()> {
    let pending: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, candidate)| !candidate.belongs_to(store))
        .map(|(position, _)| position)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    for &position in &pending {
        candidates[position].primary_id = None;
    }

    let indexed = store.index_subfeatures();
    let batch: Vec<&FeatureNode> = pending.iter().map(|&position| &candidates[position]).collect();
    let written = if indexed {
        store.store(&batch)
    } else {
        store.store_noindex(&batch)
    };
    let ids = written.map_err(|err| {
        error!(
            "event=subfeature_store module=node status=error count={} indexed={} error_code=store_write_failed error={}",
            pending.len(),
            indexed,
            err
        );
        NodeError::StoreWrite(err)
    })?;

    info!(
        "event=subfeature_store module=node status=ok count={} indexed={}",
        ids.len(),
        indexed
    );

    let weak = Rc::downgrade(store);
    for (&position, id) in pending.iter().zip(ids) {
        let candidate = &mut candidates[position];
        candidate.primary_id = Some(id);
        candidate.store = Some(weak.clone());
    }
    Ok(())
}
