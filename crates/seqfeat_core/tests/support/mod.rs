#![allow(dead_code)]

use seqfeat_core::{
    FeatureId, FeatureNode, FeatureStore, SqliteFeatureStore, StoreError, StoreOptions,
    StoreResult, StoreUid,
};
use std::cell::Cell;
use std::rc::Rc;

/// SQLite store wrapper that counts calls and can inject failures.
pub struct CountingStore {
    inner: SqliteFeatureStore,
    pub store_calls: Cell<usize>,
    pub noindex_calls: Cell<usize>,
    pub fetch_calls: Cell<usize>,
    pub stored_nodes: Cell<usize>,
    pub fail_writes: Cell<bool>,
    /// Fails every write call from this 1-based call number on.
    pub fail_writes_from: Cell<Option<usize>>,
    pub fail_fetches: Cell<bool>,
    pub withhold_ids: Cell<bool>,
}

impl CountingStore {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            inner: SqliteFeatureStore::open_in_memory(options).unwrap(),
            store_calls: Cell::new(0),
            noindex_calls: Cell::new(0),
            fetch_calls: Cell::new(0),
            stored_nodes: Cell::new(0),
            fail_writes: Cell::new(false),
            fail_writes_from: Cell::new(None),
            fail_fetches: Cell::new(false),
            withhold_ids: Cell::new(false),
        }
    }

    pub fn inner(&self) -> &SqliteFeatureStore {
        &self.inner
    }

    pub fn write_calls(&self) -> usize {
        self.store_calls.get() + self.noindex_calls.get()
    }

    fn write(&self, nodes: &[&FeatureNode], indexed: bool) -> StoreResult<Vec<FeatureId>> {
        let failing_call = self
            .fail_writes_from
            .get()
            .is_some_and(|from| self.write_calls() >= from);
        if self.fail_writes.get() || failing_call {
            return Err(StoreError::InvalidData("injected write failure".to_string()));
        }
        self.stored_nodes.set(self.stored_nodes.get() + nodes.len());
        let ids = if indexed {
            self.inner.store(nodes)?
        } else {
            self.inner.store_noindex(nodes)?
        };
        if self.withhold_ids.get() {
            return Ok(Vec::new());
        }
        Ok(ids)
    }
}

impl FeatureStore for CountingStore {
    fn store_uid(&self) -> StoreUid {
        self.inner.store_uid()
    }

    fn store(&self, nodes: &[&FeatureNode]) -> StoreResult<Vec<FeatureId>> {
        self.store_calls.set(self.store_calls.get() + 1);
        self.write(nodes, true)
    }

    fn store_noindex(&self, nodes: &[&FeatureNode]) -> StoreResult<Vec<FeatureId>> {
        self.noindex_calls.set(self.noindex_calls.get() + 1);
        self.write(nodes, false)
    }

    fn fetch_many(&self, ids: &[FeatureId]) -> StoreResult<Vec<FeatureNode>> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        if self.fail_fetches.get() {
            return Err(StoreError::InvalidData("injected fetch failure".to_string()));
        }
        self.inner.fetch_many(ids)
    }

    fn index_subfeatures(&self) -> bool {
        self.inner.index_subfeatures()
    }
}

/// Returns the concrete store (for counters) and its trait-object handle.
pub fn counting_store(options: StoreOptions) -> (Rc<CountingStore>, Rc<dyn FeatureStore>) {
    let store = Rc::new(CountingStore::new(options));
    let handle: Rc<dyn FeatureStore> = store.clone();
    (store, handle)
}

pub fn sqlite_store() -> Rc<dyn FeatureStore> {
    Rc::new(SqliteFeatureStore::open_in_memory(StoreOptions::default()).unwrap())
}
