//! Base feature record and the generic feature capability set.
//!
//! # Responsibility
//! - Hold the primitive attributes of one annotation feature.
//! - Expose them through [`SeqFeature`], the contract any foreign feature
//!   value must satisfy to be adopted as a child.
//!
//! # Invariants
//! - `attributes` keys are unique; values keep insertion order.
//! - The record has no knowledge of children or persistence.

use crate::model::strand::Strand;
use crate::model::target::TargetSegment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute tag holding the identifier a feature had in its load file.
pub const LOAD_ID_TAG: &str = "load_id";
/// Attribute tag holding free-text notes.
pub const NOTE_TAG: &str = "Note";
/// Attribute tag holding alignment targets.
pub const TARGET_TAG: &str = "Target";

/// Generic feature capability set.
///
/// Implemented by [`FeatureRecord`], by the hierarchical node type, and by
/// any caller-defined feature value that should be copied into a hierarchy.
pub trait SeqFeature {
    fn seq_id(&self) -> Option<&str>;
    fn start(&self) -> Option<i64>;
    fn end(&self) -> Option<i64>;
    fn strand(&self) -> Strand;
    fn primary_tag(&self) -> Option<&str>;
    fn source_tag(&self) -> Option<&str>;
    fn display_name(&self) -> Option<&str>;
    fn score(&self) -> Option<f64>;

    fn phase(&self) -> Option<u8> {
        None
    }

    /// Tag names carried by this feature.
    fn all_tags(&self) -> Vec<String>;

    /// Ordered values of one tag; empty when the tag is absent.
    fn tag_values(&self, tag: &str) -> Vec<String>;

    /// Inclusive length, when both coordinates are known.
    fn length(&self) -> Option<i64> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => Some(end - start + 1),
            _ => None,
        }
    }
}

/// Flat attribute bag of one feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Reference sequence the coordinates are relative to.
    pub seq_id: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    #[serde(default)]
    pub strand: Strand,
    /// Feature type ("method"), e.g. `mRNA`.
    pub primary_tag: Option<String>,
    pub source_tag: Option<String>,
    pub display_name: Option<String>,
    pub score: Option<f64>,
    pub phase: Option<u8>,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl FeatureRecord {
    /// Creates a typed record spanning `start..=end` on `seq_id`.
    pub fn new(
        seq_id: impl Into<String>,
        primary_tag: impl Into<String>,
        start: i64,
        end: i64,
    ) -> Self {
        Self {
            seq_id: Some(seq_id.into()),
            primary_tag: Some(primary_tag.into()),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Copies every capability-level attribute of `feature`.
    pub fn from_feature(feature: &dyn SeqFeature) -> Self {
        let attributes = feature
            .all_tags()
            .into_iter()
            .map(|tag| {
                let values = feature.tag_values(&tag);
                (tag, values)
            })
            .collect();

        Self {
            seq_id: feature.seq_id().map(str::to_string),
            start: feature.start(),
            end: feature.end(),
            strand: feature.strand(),
            primary_tag: feature.primary_tag().map(str::to_string),
            source_tag: feature.source_tag().map(str::to_string),
            display_name: feature.display_name().map(str::to_string),
            score: feature.score(),
            phase: feature.phase(),
            description: None,
            attributes,
        }
    }

    /// Appends one value to `tag`, creating the tag when missing.
    pub fn add_tag_value(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .entry(tag.into())
            .or_default()
            .push(value.into());
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.attributes.contains_key(tag)
    }

    /// Removes `tag` and returns its values.
    pub fn remove_tag(&mut self, tag: &str) -> Option<Vec<String>> {
        self.attributes.remove(tag)
    }

    /// First value of the `load_id` attribute.
    pub fn load_id(&self) -> Option<&str> {
        self.first_value(LOAD_ID_TAG)
    }

    /// Values of the `Note` attribute.
    pub fn notes(&self) -> &[String] {
        self.attributes
            .get(NOTE_TAG)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parsed `Target` attribute values; malformed entries are skipped.
    pub fn targets(&self) -> Vec<TargetSegment> {
        self.attributes
            .get(TARGET_TAG)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| TargetSegment::parse(value))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `method:source`, or the bare method when no source is set.
    pub fn type_string(&self) -> Option<String> {
        let method = self.primary_tag.as_deref()?;
        Some(match non_empty(self.source_tag.as_deref()) {
            Some(source) => format!("{method}:{source}"),
            None => method.to_string(),
        })
    }

    fn first_value(&self, tag: &str) -> Option<&str> {
        self.attributes
            .get(tag)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

impl SeqFeature for FeatureRecord {
    fn seq_id(&self) -> Option<&str> {
        self.seq_id.as_deref()
    }

    fn start(&self) -> Option<i64> {
        self.start
    }

    fn end(&self) -> Option<i64> {
        self.end
    }

    fn strand(&self) -> Strand {
        self.strand
    }

    fn primary_tag(&self) -> Option<&str> {
        self.primary_tag.as_deref()
    }

    fn source_tag(&self) -> Option<&str> {
        self.source_tag.as_deref()
    }

    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    fn score(&self) -> Option<f64> {
        self.score
    }

    fn phase(&self) -> Option<u8> {
        self.phase
    }

    fn all_tags(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn tag_values(&self, tag: &str) -> Vec<String> {
        self.attributes.get(tag).cloned().unwrap_or_default()
    }
}

/// Treats empty strings like missing values.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
