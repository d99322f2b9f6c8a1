//! Lazy child resolution through batch store fetches.
//!
//! # Invariants
//! - One `fetch_many` call per resolution, never one per id; none at all when
//!   every child is embedded.
//! - Results keep the insertion order of the backing child list.
//! - Fetched nodes are not cached back into the parent.

use crate::model::type_filter::{matches_any, parse_filters, TypeFilter};
use crate::node::child::ChildRef;
use crate::node::{FeatureNode, NodeError, NodeResult};
use crate::store::{FeatureId, FeatureStore, StoreError};
use log::debug;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

impl FeatureNode {
    /// Loads one persisted node and attaches `store` to it.
    pub fn load(store: &Rc<dyn FeatureStore>, id: FeatureId) -> NodeResult<Self> {
        let mut nodes = store.fetch_many(&[id]).map_err(NodeError::StoreRead)?;
        let mut node = nodes
            .pop()
            .ok_or(NodeError::StoreRead(StoreError::NotFound(id)))?;
        node.primary_id = Some(id);
        node.store = Some(Rc::downgrade(store));
        Ok(node)
    }

    /// Direct children matching any of `types` (`method` or `method:source`,
    /// case-insensitive); all children when `types` is empty.
    pub fn get_seq_features(&self, types: &[&str]) -> NodeResult<Vec<FeatureNode>> {
        self.get_seq_features_matching(&parse_filters(types))
    }

    pub fn get_seq_features_matching(
        &self,
        filters: &[TypeFilter],
    ) -> NodeResult<Vec<FeatureNode>> {
        let children = self.resolve_batch(&[self])?.pop().unwrap_or_default();
        Ok(children
            .into_iter()
            .filter(|child| matches_any(filters, child))
            .collect())
    }

    /// All descendants in pre-order, filtered by `types`.
    ///
    /// Issues at most one batch fetch per tree level.
    pub fn all_seq_features(&self, types: &[&str]) -> NodeResult<Vec<FeatureNode>> {
        let filters = parse_filters(types);
        let mut arena: Vec<Option<FeatureNode>> = Vec::new();
        let mut descendants: Vec<Vec<usize>> = Vec::new();
        let mut expanded: HashSet<FeatureId> = self.primary_id.into_iter().collect();

        let mut roots = Vec::new();
        for child in self.resolve_batch(&[self])?.pop().unwrap_or_default() {
            roots.push(arena.len());
            arena.push(Some(child));
            descendants.push(Vec::new());
        }

        let mut frontier = roots.clone();
        while !frontier.is_empty() {
            // Store references may form cycles; expand each persisted node once.
            frontier.retain(|&index| {
                match arena[index].as_ref().and_then(|node| node.primary_id) {
                    Some(id) => expanded.insert(id),
                    None => true,
                }
            });
            let parents: Vec<&FeatureNode> = frontier
                .iter()
                .filter_map(|&index| arena[index].as_ref())
                .collect();
            let resolved = self.resolve_batch(&parents)?;

            let mut next = Vec::new();
            for (&parent, children) in frontier.iter().zip(resolved) {
                for child in children {
                    let index = arena.len();
                    arena.push(Some(child));
                    descendants.push(Vec::new());
                    descendants[parent].push(index);
                    next.push(index);
                }
            }
            frontier = next;
        }

        let mut ordered = Vec::with_capacity(arena.len());
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        while let Some(index) = stack.pop() {
            if let Some(node) = arena[index].take() {
                if matches_any(&filters, &node) {
                    ordered.push(node);
                }
            }
            stack.extend(descendants[index].iter().rev().copied());
        }
        Ok(ordered)
    }

    /// Children whose type equals `name`, for capitalized type names.
    ///
    /// `node.children_named("Exon")` is shorthand for
    /// `node.get_seq_features(&["Exon"])`; lowercase-initial names are not
    /// type shortcuts and fail with `MethodNotFound`.
    pub fn children_named(&self, name: &str) -> NodeResult<Vec<FeatureNode>> {
        match name.chars().next() {
            Some(first) if first.is_uppercase() => self.get_seq_features(&[name]),
            _ => Err(NodeError::MethodNotFound(name.to_string())),
        }
    }

    /// Resolves the children of every parent with one fetch for all ids.
    ///
    /// Fetched nodes receive their primary id and this node's store.
    fn resolve_batch(&self, parents: &[&FeatureNode]) -> NodeResult<Vec<Vec<FeatureNode>>> {
        let started_at = Instant::now();
        let ids: Vec<FeatureId> = parents
            .iter()
            .flat_map(|parent| parent.children.iter().filter_map(ChildRef::store_id))
            .collect();

        let mut fetched = if ids.is_empty() {
            Vec::new().into_iter()
        } else {
            let store = self.live_store()?;
            let nodes = store.fetch_many(&ids).map_err(NodeError::StoreRead)?;
            if nodes.len() != ids.len() {
                return Err(NodeError::StoreRead(StoreError::InvalidData(format!(
                    "requested {} features, store returned {}",
                    ids.len(),
                    nodes.len()
                ))));
            }
            nodes.into_iter()
        };

        let mut resolved = Vec::with_capacity(parents.len());
        let mut embedded = 0usize;
        for parent in parents {
            let mut children = Vec::with_capacity(parent.children.len());
            for child in &parent.children {
                match child {
                    ChildRef::Embedded(node) => {
                        embedded += 1;
                        children.push(node.as_ref().clone());
                    }
                    ChildRef::StoreId(id) => {
                        if let Some(mut node) = fetched.next() {
                            node.primary_id = Some(*id);
                            node.store = self.store.clone();
                            children.push(node);
                        }
                    }
                }
            }
            resolved.push(children);
        }

        debug!(
            "event=subfeature_resolve module=node status=ok parents={} embedded={} fetched={} duration_ms={}",
            parents.len(),
            embedded,
            ids.len(),
            started_at.elapsed().as_millis()
        );
        Ok(resolved)
    }
}
