//! Canonical text form used by every comparison in the matcher.

use crate::sheet::Cell;
use serde::{Deserialize, Serialize};

/// Options controlling how raw cell text is canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    pub case_sensitive: bool,
    pub strip_whitespace: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            strip_whitespace: true,
        }
    }
}

/// Canonicalize a string for comparison.
///
/// With `strip_whitespace`, runs of whitespace collapse to one space. Without
/// `case_sensitive`, the text is lowercased. The result is always trimmed.
pub fn normalize(value: &str, options: NormalizeOptions) -> String {
    let mut text = if options.strip_whitespace {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        value.to_string()
    };
    if !options.case_sensitive {
        text = text.to_lowercase();
    }
    text.trim().to_string()
}

/// Canonicalize a cell. Empty cells become the empty string.
pub fn normalize_cell(cell: &Cell, options: NormalizeOptions) -> String {
    match cell {
        Cell::Empty => String::new(),
        other => normalize(&other.to_string(), options),
    }
}
