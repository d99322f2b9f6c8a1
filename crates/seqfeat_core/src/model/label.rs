//! Human-readable feature labels.

use crate::model::feature::non_empty;

/// Label rendering style, chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// `method(name)` or `method:source(name)`.
    #[default]
    Named,
    /// Identity-only form: `FeatureNode#<id>` or `FeatureNode#unsaved`.
    Opaque,
}

/// Inputs needed to label one feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelParts<'a> {
    pub display_name: Option<&'a str>,
    pub load_id: Option<&'a str>,
    pub primary_id: Option<i64>,
    pub method: Option<&'a str>,
    pub source: Option<&'a str>,
}

/// Renders a label for `parts` in `style`.
///
/// The name falls back from display name to `load_id` to `id=<primary id>`,
/// and finally to `<unnamed>`.
pub fn format_label(parts: &LabelParts<'_>, style: LabelStyle) -> String {
    if style == LabelStyle::Opaque {
        return match parts.primary_id {
            Some(id) => format!("FeatureNode#{id}"),
            None => "FeatureNode#unsaved".to_string(),
        };
    }

    let name = non_empty(parts.display_name)
        .or(non_empty(parts.load_id))
        .map(str::to_string)
        .or_else(|| parts.primary_id.map(|id| format!("id={id}")))
        .unwrap_or_else(|| "<unnamed>".to_string());
    let method = parts.method.unwrap_or_default();

    match non_empty(parts.source) {
        Some(source) => format!("{method}:{source}({name})"),
        None => format!("{method}({name})"),
    }
}
