//! Child references and the accepted child input shapes.

use crate::model::feature::{FeatureRecord, SeqFeature};
use crate::node::options::FeatureOptions;
use crate::node::{FeatureNode, NodeError, NodeResult};
use crate::store::FeatureId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Debug, Formatter};

/// One entry of a node's child list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildRef {
    /// Child owned by the parent, with no independent store identity.
    Embedded(Box<FeatureNode>),
    /// Child persisted on its own, referenced by id.
    StoreId(FeatureId),
}

impl ChildRef {
    pub fn store_id(&self) -> Option<FeatureId> {
        match self {
            Self::StoreId(id) => Some(*id),
            Self::Embedded(_) => None,
        }
    }

    pub fn embedded(&self) -> Option<&FeatureNode> {
        match self {
            Self::Embedded(node) => Some(node),
            Self::StoreId(_) => None,
        }
    }
}

/// Shapes accepted by `add_seq_feature` / `add_segment`.
pub enum ChildInput {
    /// A node of the hierarchical kind, used directly.
    Node(FeatureNode),
    /// Raw coordinates; materialized from the parent's child defaults.
    /// Pairs with a missing coordinate are skipped.
    Range {
        start: Option<i64>,
        end: Option<i64>,
    },
    /// Any other feature value; copied field by field.
    Feature(Box<dyn SeqFeature>),
}

impl ChildInput {
    pub fn range(start: i64, end: i64) -> Self {
        Self::Range {
            start: Some(start),
            end: Some(end),
        }
    }
}

impl Debug for ChildInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(node) => f.debug_tuple("Node").field(&node.label()).finish(),
            Self::Range { start, end } => f
                .debug_struct("Range")
                .field("start", start)
                .field("end", end)
                .finish(),
            Self::Feature(feature) => f
                .debug_tuple("Feature")
                .field(&feature.primary_tag())
                .field(&feature.start())
                .field(&feature.end())
                .finish(),
        }
    }
}

impl From<FeatureNode> for ChildInput {
    fn from(value: FeatureNode) -> Self {
        Self::Node(value)
    }
}

impl From<FeatureRecord> for ChildInput {
    fn from(value: FeatureRecord) -> Self {
        Self::Feature(Box::new(value))
    }
}

impl From<(i64, i64)> for ChildInput {
    fn from((start, end): (i64, i64)) -> Self {
        Self::range(start, end)
    }
}

/// Maps one JSON segment description to a child input.
///
/// `[start, stop]` (either may be `null`) is a coordinate pair, an object is
/// a nested feature described with constructor options; anything else is
/// rejected.
impl TryFrom<&Value> for ChildInput {
    type Error = NodeError;

    fn try_from(value: &Value) -> NodeResult<Self> {
        match value {
            Value::Array(items) if items.len() == 2 => Ok(Self::Range {
                start: coordinate(&items[0])?,
                end: coordinate(&items[1])?,
            }),
            Value::Object(_) => {
                let options = FeatureOptions::from_json(value).map_err(|err| match err {
                    NodeError::InvalidOptions(details) => NodeError::InvalidChild(details),
                    other => other,
                })?;
                Ok(Self::Node(FeatureNode::new(options, None)?))
            }
            other => Err(NodeError::InvalidChild(format!(
                "expected [start, stop] or a feature object, got `{}`",
                summarize(other)
            ))),
        }
    }
}

fn coordinate(value: &Value) -> NodeResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number.as_i64().map(Some).ok_or_else(|| {
            NodeError::InvalidChild(format!("coordinate `{number}` is not an integer"))
        }),
        other => Err(NodeError::InvalidChild(format!(
            "coordinate `{}` is not an integer",
            summarize(other)
        ))),
    }
}

fn summarize(value: &Value) -> String {
    const MAX_CHARS: usize = 40;
    let text = value.to_string();
    if text.chars().count() <= MAX_CHARS {
        return text;
    }
    let mut truncated = text.chars().take(MAX_CHARS).collect::<String>();
    truncated.push_str("...");
    truncated
}
