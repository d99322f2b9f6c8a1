//! SQLite-backed feature store.
//!
//! # Responsibility
//! - Persist feature nodes as one row each: searchable scalar columns plus a
//!   JSON body carrying attributes and children.
//! - Serve batch dereference in one call, querying ids in bounded chunks.
//!
//! # Invariants
//! - Batch writes run in one transaction.
//! - Overwriting an existing row keeps its index flag.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{open_db, open_db_in_memory, SCHEMA_VERSION};
use crate::model::feature::SeqFeature;
use crate::model::strand::Strand;
use crate::model::type_filter::{matches_any, TypeFilter};
use crate::node::FeatureNode;
use crate::store::{FeatureId, FeatureStore, StoreError, StoreOptions, StoreResult, StoreUid};
use log::{debug, error};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

const FEATURE_SELECT_SQL: &str = "SELECT id, strand, body FROM features";

/// Ids bound per `IN (...)` query; well below SQLite's variable limit.
const FETCH_CHUNK_SIZE: usize = 500;

const INSERT_SQL: &str = "INSERT INTO features (
        seq_id,
        start_pos,
        end_pos,
        strand,
        primary_tag,
        source_tag,
        display_name,
        is_indexed,
        body
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);";

const UPSERT_SQL: &str = "INSERT INTO features (
        id,
        seq_id,
        start_pos,
        end_pos,
        strand,
        primary_tag,
        source_tag,
        display_name,
        is_indexed,
        body
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(id) DO UPDATE SET
        seq_id = excluded.seq_id,
        start_pos = excluded.start_pos,
        end_pos = excluded.end_pos,
        strand = excluded.strand,
        primary_tag = excluded.primary_tag,
        source_tag = excluded.source_tag,
        display_name = excluded.display_name,
        body = excluded.body,
        updated_at = (strftime('%s', 'now') * 1000);";

/// Feature store over one SQLite connection.
pub struct SqliteFeatureStore {
    conn: Connection,
    uid: StoreUid,
    options: StoreOptions,
}

impl SqliteFeatureStore {
    /// Wraps a migrated connection.
    pub fn try_new(conn: Connection, options: StoreOptions) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self {
            conn,
            uid: Uuid::new_v4(),
            options,
        })
    }

    /// Opens (and migrates) a store file.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        Self::try_new(open_db(path)?, options)
    }

    pub fn open_in_memory(options: StoreOptions) -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?, options)
    }

    /// Underlying connection, for ad hoc queries over the `features` table.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Returns whether `id` is independently searchable, or `None` when absent.
    pub fn is_indexed(&self, id: FeatureId) -> StoreResult<Option<bool>> {
        let flag = self
            .conn
            .query_row(
                "SELECT is_indexed FROM features WHERE id = ?1;",
                [id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(flag.map(|value| value == 1))
    }

    /// Searches indexed features by type; an empty filter set returns all.
    ///
    /// Features written through `store_noindex` are never returned here.
    pub fn features_of_type(&self, filters: &[TypeFilter]) -> StoreResult<Vec<FeatureNode>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FEATURE_SELECT_SQL} WHERE is_indexed = 1 ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut nodes = Vec::new();

        while let Some(row) = rows.next()? {
            let node = parse_feature_row(row)?;
            if matches_any(filters, &node) {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    fn write_batch(&self, nodes: &[&FeatureNode], indexed: bool) -> StoreResult<Vec<FeatureId>> {
        let started_at = Instant::now();
        let result = self.write_batch_inner(nodes, indexed);
        match &result {
            Ok(ids) => debug!(
                "event=store_write module=store status=ok count={} indexed={} duration_ms={}",
                ids.len(),
                indexed,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_write module=store status=error count={} indexed={} duration_ms={} error_code=store_write_failed error={}",
                nodes.len(),
                indexed,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn write_batch_inner(
        &self,
        nodes: &[&FeatureNode],
        indexed: bool,
    ) -> StoreResult<Vec<FeatureId>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(nodes.len());

        for node in nodes {
            let record = node.record();
            if let (Some(start), Some(end)) = (record.start, record.end) {
                if start > end {
                    return Err(StoreError::InvalidData(format!(
                        "refusing to store feature with start {start} > end {end}"
                    )));
                }
            }
            let body = serde_json::to_string(node)?;
            let indexed_flag = bool_to_int(indexed);

            let id = match node.primary_id() {
                Some(id) => {
                    tx.execute(
                        UPSERT_SQL,
                        params![
                            id,
                            record.seq_id.as_deref(),
                            record.start,
                            record.end,
                            record.strand.as_i64(),
                            record.primary_tag.as_deref(),
                            record.source_tag.as_deref(),
                            record.display_name.as_deref(),
                            indexed_flag,
                            body,
                        ],
                    )?;
                    id
                }
                None => {
                    tx.execute(
                        INSERT_SQL,
                        params![
                            record.seq_id.as_deref(),
                            record.start,
                            record.end,
                            record.strand.as_i64(),
                            record.primary_tag.as_deref(),
                            record.source_tag.as_deref(),
                            record.display_name.as_deref(),
                            indexed_flag,
                            body,
                        ],
                    )?;
                    tx.last_insert_rowid()
                }
            };
            ids.push(id);
        }

        tx.commit()?;
        Ok(ids)
    }
}

impl FeatureStore for SqliteFeatureStore {
    fn store_uid(&self) -> StoreUid {
        self.uid
    }

    fn store(&self, nodes: &[&FeatureNode]) -> StoreResult<Vec<FeatureId>> {
        self.write_batch(nodes, true)
    }

    fn store_noindex(&self, nodes: &[&FeatureNode]) -> StoreResult<Vec<FeatureId>> {
        self.write_batch(nodes, false)
    }

    fn fetch_many(&self, ids: &[FeatureId]) -> StoreResult<Vec<FeatureNode>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let started_at = Instant::now();
        let mut distinct: Vec<FeatureId> = ids.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let mut by_id: HashMap<FeatureId, FeatureNode> = HashMap::with_capacity(distinct.len());
        for chunk in distinct.chunks(FETCH_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = self
                .conn
                .prepare_cached(&format!("{FEATURE_SELECT_SQL} WHERE id IN ({placeholders});"))?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let node = parse_feature_row(row)?;
                if let Some(id) = node.primary_id() {
                    by_id.insert(id, node);
                }
            }
        }

        let nodes = ids
            .iter()
            .map(|id| by_id.get(id).cloned().ok_or(StoreError::NotFound(*id)))
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(
            "event=store_fetch module=store status=ok requested={} distinct={} chunks={} duration_ms={}",
            ids.len(),
            distinct.len(),
            distinct.len().div_ceil(FETCH_CHUNK_SIZE),
            started_at.elapsed().as_millis()
        );
        Ok(nodes)
    }

    fn index_subfeatures(&self) -> bool {
        self.options.index_subfeatures
    }
}

fn parse_feature_row(row: &Row<'_>) -> StoreResult<FeatureNode> {
    let id: FeatureId = row.get("id")?;
    let strand_value: i64 = row.get("strand")?;
    let strand = Strand::from_i64(strand_value).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid strand value `{strand_value}` in features.strand for id {id}"
        ))
    })?;

    let body: String = row.get("body")?;
    let node: FeatureNode = serde_json::from_str(&body)?;

    if node.strand() != strand {
        return Err(StoreError::InvalidData(format!(
            "strand column and body disagree for feature {id}"
        )));
    }
    if let (Some(start), Some(end)) = (node.start(), node.end()) {
        if start > end {
            return Err(StoreError::InvalidData(format!(
                "feature {id} has start {start} > end {end}"
            )));
        }
    }

    Ok(node.with_primary_id(id))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let actual_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let expected_version = SCHEMA_VERSION;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
