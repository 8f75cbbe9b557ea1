//! Pre-write checks on the shape of a host value
//!
//! Only frames with the default row index (`0..N`, unnamed) and unique text
//! column labels can be written. The index is never stored, so any other
//! index would be silently lost.

use indexmap::IndexMap;
use log::debug;

use tabfile_core::{IndexProperty, ValidationError};

use crate::frame::{Frame, Index, Input, Label};

/// Check that `input` can be written, failing on the first violation
pub fn validate_for_write(input: &Input) -> Result<(), ValidationError> {
    validated_frame(input).map(|_| ())
}

/// Like [`validate_for_write`], returning the frame on success
pub fn validated_frame(input: &Input) -> Result<&Frame, ValidationError> {
    let frame = match input {
        Input::Frame(frame) => frame,
        other => {
            return Err(ValidationError::NotATable {
                found: other.kind().to_string(),
            })
        }
    };

    validate_index(frame.index())?;
    validate_labels(frame)?;

    debug!(
        "Validated frame with {} columns and {} rows",
        frame.num_columns(),
        frame.num_rows()
    );
    Ok(frame)
}

fn validate_index(index: &Index) -> Result<(), ValidationError> {
    let is_default = match index {
        // a single-row range holds only its start, whatever the step
        Index::Range { start, step, .. } => {
            index.is_empty() || (*start == 0 && (*step == 1 || index.len() == 1))
        }
        Index::Int64 { values, .. } => values.iter().enumerate().all(|(i, v)| *v == i as i64),
        other => {
            return Err(ValidationError::UnsupportedIndex {
                property: IndexProperty::Type,
                detail: format!("{} is not an integer index", other.kind()),
            })
        }
    };

    if !is_default {
        return Err(ValidationError::UnsupportedIndex {
            property: IndexProperty::Ordering,
            detail: format!("{} is not the default 0..{}", index.kind(), index.len()),
        });
    }

    if let Some(name) = index.name() {
        return Err(ValidationError::UnsupportedIndex {
            property: IndexProperty::Name,
            detail: format!("index is named '{}'", name),
        });
    }
    Ok(())
}

/// Inferred type of a sequence of labels, in the host's vocabulary
fn inferred_label_type<'a>(labels: impl Iterator<Item = &'a Label>) -> &'static str {
    let mut inferred = None;
    for label in labels {
        let kind = match label {
            Label::Str(_) => "string",
            Label::Int(_) => "integer",
            Label::Tuple(_) => "tuple",
        };
        match inferred {
            None => inferred = Some(kind),
            Some(seen) if seen != kind => return "mixed",
            _ => {}
        }
    }
    inferred.unwrap_or("empty")
}

fn validate_labels(frame: &Frame) -> Result<(), ValidationError> {
    let inferred = inferred_label_type(frame.labels());
    if inferred != "string" && inferred != "empty" {
        return Err(ValidationError::InvalidColumnNames {
            inferred: inferred.to_string(),
        });
    }

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for name in frame.labels().filter_map(Label::as_str) {
        *counts.entry(name).or_default() += 1;
    }
    let duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect();
    if !duplicates.is_empty() {
        return Err(ValidationError::DuplicateColumnNames { names: duplicates });
    }
    Ok(())
}
