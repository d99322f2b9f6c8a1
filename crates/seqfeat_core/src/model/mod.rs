//! Feature domain model.
//!
//! # Responsibility
//! - Define the flat base record every feature carries (coordinates, strand,
//!   tags) and the capability trait shared by all feature-like values.
//! - Provide pure helpers used by the hierarchy layer: type filters, labels,
//!   `Target` segments.
//!
//! # Invariants
//! - `start <= end` whenever both coordinates are set on a stored record.
//! - Tag names are unique; value order inside one tag is preserved.

pub mod feature;
pub mod label;
pub mod strand;
pub mod target;
pub mod type_filter;
