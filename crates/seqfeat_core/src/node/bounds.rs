//! Bounding box and default maintenance after child additions.

use crate::model::feature::{non_empty, FeatureRecord};
use crate::model::strand::Strand;

/// Puts `start <= end`; an inverted pair is swapped onto the reverse strand.
pub(crate) fn orient(record: &mut FeatureRecord) {
    if let (Some(start), Some(end)) = (record.start, record.end) {
        if start > end {
            record.start = Some(end);
            record.end = Some(start);
            record.strand = Strand::Reverse;
        }
    }
}

/// Widens `parent` to cover `added` and fills unset reference/strand.
///
/// `seq_id` and `strand` are only taken from the first added child, and only
/// when the parent has no value yet. Children without coordinates do not
/// affect the bounds.
pub(crate) fn fix_boundaries<'a>(
    parent: &mut FeatureRecord,
    added: impl IntoIterator<Item = &'a FeatureRecord>,
) {
    let mut added = added.into_iter().peekable();

    if let Some(first) = added.peek() {
        if non_empty(parent.seq_id.as_deref()).is_none() {
            parent.seq_id = first.seq_id.clone();
        }
        if !parent.strand.is_known() {
            parent.strand = first.strand;
        }
    }

    for child in added {
        if let Some(start) = child.start {
            parent.start = Some(parent.start.map_or(start, |current| current.min(start)));
        }
        if let Some(end) = child.end {
            parent.end = Some(parent.end.map_or(end, |current| current.max(end)));
        }
    }
}
