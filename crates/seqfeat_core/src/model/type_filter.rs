//! Case-insensitive `method` / `method:source` type predicates.
//!
//! # Invariants
//! - A bare method matches any source.
//! - An empty filter set matches everything.
//! - Matching is exact equality after lower-casing; never prefix/substring.

use crate::model::feature::SeqFeature;
use std::fmt::{Display, Formatter};

/// One parsed type filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeFilter {
    method: String,
    source: Option<String>,
}

impl TypeFilter {
    /// Parses `method` or `method:source`.
    ///
    /// Only the first `:` separates method from source; an empty source is
    /// treated as a bare method.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let (method, source) = match value.split_once(':') {
            Some((method, source)) if !source.is_empty() => (method, Some(source)),
            Some((method, _)) => (method, None),
            None => (value, None),
        };

        Self {
            method: method.to_lowercase(),
            source: source.map(str::to_lowercase),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Tests one `(primary_tag, source_tag)` pair.
    pub fn matches(&self, primary_tag: Option<&str>, source_tag: Option<&str>) -> bool {
        let Some(method) = primary_tag else {
            return false;
        };
        if method.to_lowercase() != self.method {
            return false;
        }

        match &self.source {
            None => true,
            Some(wanted) => source_tag.is_some_and(|source| source.to_lowercase() == *wanted),
        }
    }

    pub fn matches_feature(&self, feature: &dyn SeqFeature) -> bool {
        self.matches(feature.primary_tag(), feature.source_tag())
    }
}

impl Display for TypeFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{source}", self.method),
            None => write!(f, "{}", self.method),
        }
    }
}

impl From<&str> for TypeFilter {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Parses a list of filter strings.
pub fn parse_filters<S: AsRef<str>>(values: &[S]) -> Vec<TypeFilter> {
    values
        .iter()
        .map(|value| TypeFilter::parse(value.as_ref()))
        .collect()
}

/// Returns whether `feature` passes any of `filters`; empty passes all.
pub fn matches_any(filters: &[TypeFilter], feature: &dyn SeqFeature) -> bool {
    filters.is_empty() || filters.iter().any(|filter| filter.matches_feature(feature))
}
