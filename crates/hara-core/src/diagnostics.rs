//! Severity / controllability column health check for a Risk Assessment sheet.

use crate::asil::validate_rating;
use crate::column::{LogicalColumn, resolve_logical};
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Findings for one rating column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingColumnReport {
    pub found: bool,
    /// Non-blank cells holding an integer in 0..=3.
    pub valid_count: usize,
    /// Distinct raw values that were present but unusable, in sheet order.
    pub invalid_values: Vec<String>,
}

impl RatingColumnReport {
    fn scan(sheet: &Sheet, column: Option<usize>) -> Self {
        let Some(col) = column else {
            return Self::default();
        };
        let mut report = Self {
            found: true,
            ..Self::default()
        };
        for row in 0..sheet.row_count() {
            let cell = sheet.cell(row, col);
            if cell.is_blank() {
                continue;
            }
            if validate_rating(cell).is_some() {
                report.valid_count += 1;
            } else {
                let raw = cell.to_string();
                if !report.invalid_values.contains(&raw) {
                    report.invalid_values.push(raw);
                }
            }
        }
        report
    }
}

/// Diagnostic report on the S and C columns of a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDiagnostics {
    pub sheet: String,
    pub total_rows: usize,
    pub severity: RatingColumnReport,
    pub controllability: RatingColumnReport,
}

impl RatingDiagnostics {
    pub fn inspect(sheet: &Sheet) -> Self {
        let headers = &sheet.headers;
        Self {
            sheet: sheet.name.clone(),
            total_rows: sheet.row_count(),
            severity: RatingColumnReport::scan(sheet, resolve_logical(headers, LogicalColumn::Severity)),
            controllability: RatingColumnReport::scan(
                sheet,
                resolve_logical(headers, LogicalColumn::Controllability),
            ),
        }
    }

    /// Both columns present with no unusable values.
    pub fn is_clean(&self) -> bool {
        self.severity.found
            && self.controllability.found
            && self.severity.invalid_values.is_empty()
            && self.controllability.invalid_values.is_empty()
    }
}

impl fmt::Display for RatingDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sheet '{}': {} rows", self.sheet, self.total_rows)?;
        for (label, report) in [("S", &self.severity), ("C", &self.controllability)] {
            if !report.found {
                writeln!(f, "  {label}: column not found")?;
                continue;
            }
            write!(f, "  {label}: {} valid", report.valid_count)?;
            if report.invalid_values.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, ", invalid: {}", report.invalid_values.join(", "))?;
            }
        }
        Ok(())
    }
}
