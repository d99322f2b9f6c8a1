//! Constructor options for feature nodes.
//!
//! Options can be assembled in code or read from a JSON document whose keys
//! follow the annotation conventions, including their aliases:
//!
//! | key            | aliases                                  |
//! |----------------|------------------------------------------|
//! | `seqId`        | `seq_id`, `ref`                          |
//! | `end`          | `stop`                                   |
//! | `displayName`  | `id`, `seqname`, `displayId`, `name`     |
//! | `primaryTag`   | `type`                                   |
//! | `sourceTag`    | `source`                                 |

use crate::model::feature::FeatureRecord;
use crate::model::strand::Strand;
use crate::node::child::ChildInput;
use crate::node::{NodeError, NodeResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Typed constructor options.
#[derive(Debug)]
pub struct FeatureOptions {
    pub record: FeatureRecord,
    /// Type used for children materialized from coordinate pairs.
    pub subtype: Option<String>,
    /// Initial children, embedded at construction.
    pub segments: Vec<ChildInput>,
    /// Selects `store` (true) or `store_noindex` (false) when persisting.
    pub index: bool,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            record: FeatureRecord::default(),
            subtype: None,
            segments: Vec::new(),
            index: true,
        }
    }
}

impl FeatureOptions {
    /// Options for a plain record.
    pub fn with_record(record: FeatureRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    /// Parses an options document.
    ///
    /// # Errors
    /// - `InvalidOptions` when the document is not an object, a key has the
    ///   wrong type, or the same field is given under two aliases.
    /// - `InvalidChild` when a `segments` element has an unsupported shape.
    pub fn from_json(value: &Value) -> NodeResult<Self> {
        let raw = RawOptions::deserialize(value)
            .map_err(|err| NodeError::InvalidOptions(err.to_string()))?;

        let strand = match &raw.strand {
            None | Some(Value::Null) => Strand::Unknown,
            Some(value) => parse_strand(value)?,
        };

        let attributes = raw
            .attributes
            .into_iter()
            .map(|(tag, values)| (tag, values.into_vec()))
            .collect();

        let segments = raw
            .segments
            .iter()
            .map(ChildInput::try_from)
            .collect::<NodeResult<Vec<_>>>()?;

        Ok(Self {
            record: FeatureRecord {
                seq_id: raw.seq_id,
                start: raw.start,
                end: raw.end,
                strand,
                primary_tag: raw.primary_tag,
                source_tag: raw.source_tag,
                display_name: raw.display_name,
                score: raw.score,
                phase: raw.phase,
                description: raw.description,
                attributes,
            },
            subtype: raw.subtype,
            segments,
            index: raw.index.unwrap_or(true),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    #[serde(default, alias = "seq_id", alias = "ref")]
    seq_id: Option<String>,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default, alias = "stop")]
    end: Option<i64>,
    #[serde(
        default,
        alias = "id",
        alias = "seqname",
        alias = "displayId",
        alias = "name"
    )]
    display_name: Option<String>,
    #[serde(default, alias = "type")]
    primary_tag: Option<String>,
    #[serde(default, alias = "source")]
    source_tag: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    segments: Vec<Value>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    strand: Option<Value>,
    #[serde(default)]
    phase: Option<u8>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValues>,
    #[serde(default)]
    index: Option<bool>,
}

/// A tag may carry one value or an ordered list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AttributeValues {
    One(String),
    Many(Vec<String>),
}

impl AttributeValues {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

fn parse_strand(value: &Value) -> NodeResult<Strand> {
    let parsed = match value {
        Value::Number(number) => number.as_i64().and_then(Strand::from_i64),
        Value::String(text) => Strand::parse(text),
        _ => None,
    };
    parsed.ok_or_else(|| NodeError::InvalidOptions(format!("unsupported strand `{value}`")))
}
