//! Coordinate segments named by `Target` attributes.
//!
//! A `Target` value has the form `name start end [strand]`, as used by
//! alignment features to point into another sequence.

use crate::model::strand::Strand;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+)\s+(-?\d+)\s+(-?\d+)(?:\s+([+\-.]))?\s*$").expect("valid target regex")
});

/// One segment of a target sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSegment {
    pub target_id: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl TargetSegment {
    /// Parses one `Target` attribute value; returns `None` when malformed.
    ///
    /// Reversed coordinates are normalized to `start <= end` on the reverse
    /// strand.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = TARGET_RE.captures(value)?;
        let mut start: i64 = captures.get(2)?.as_str().parse().ok()?;
        let mut end: i64 = captures.get(3)?.as_str().parse().ok()?;
        let mut strand = captures
            .get(4)
            .and_then(|symbol| Strand::parse(symbol.as_str()))
            .unwrap_or_default();

        if start > end {
            std::mem::swap(&mut start, &mut end);
            strand = Strand::Reverse;
        }

        Some(Self {
            target_id: captures.get(1)?.as_str().to_string(),
            start,
            end,
            strand,
        })
    }
}
