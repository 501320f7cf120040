//! Operating Scenario sheet → [`ScenarioRecord`]s.

use crate::column::{LogicalColumn, hazard_candidates, resolve_logical};
use crate::error::HaraError;
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};

/// Exposure assumed when the E cell is absent, empty or not an integer.
pub const DEFAULT_EXPOSURE: i64 = 4;

/// One usable row of the Operating Scenario sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub scenario_text: String,
    /// Raw exposure as read. Not range-checked here; the ASIL lookup clamps.
    pub exposure: i64,
    pub hazard_text: Option<String>,
    pub source_row_index: usize,
}

/// Lazy iterator over the scenario rows of a sheet, in sheet order.
///
/// Rows with a blank scenario cell are skipped; every other row yields
/// exactly one record.
#[derive(Debug)]
pub struct ScenarioExtractor<'a> {
    sheet: &'a Sheet,
    scenario_col: usize,
    exposure_col: Option<usize>,
    hazard_cols: Vec<usize>,
    next_row: usize,
}

impl<'a> ScenarioExtractor<'a> {
    pub fn new(sheet: &'a Sheet) -> Result<Self, HaraError> {
        let scenario_col = resolve_logical(&sheet.headers, LogicalColumn::OperatingScenario)
            .ok_or_else(|| HaraError::MissingColumn {
                sheet: sheet.name.clone(),
                column: LogicalColumn::OperatingScenario.output_header().to_string(),
            })?;
        let exposure_col = resolve_logical(&sheet.headers, LogicalColumn::Exposure);
        let hazard_cols = hazard_candidates(&sheet.headers, Some(scenario_col));

        Ok(Self {
            sheet,
            scenario_col,
            exposure_col,
            hazard_cols,
            next_row: 0,
        })
    }

    pub fn has_exposure_column(&self) -> bool {
        self.exposure_col.is_some()
    }

    pub fn hazard_column_count(&self) -> usize {
        self.hazard_cols.len()
    }

    fn record_at(&self, row: usize) -> Option<ScenarioRecord> {
        let scenario_text = self.sheet.cell(row, self.scenario_col).trimmed()?;

        let exposure = self
            .exposure_col
            .and_then(|col| self.sheet.cell(row, col).parse_int())
            .unwrap_or(DEFAULT_EXPOSURE);

        let hazard_text = self
            .hazard_cols
            .iter()
            .find_map(|&col| self.sheet.cell(row, col).trimmed());

        Some(ScenarioRecord {
            scenario_text,
            exposure,
            hazard_text,
            source_row_index: row,
        })
    }
}

impl Iterator for ScenarioExtractor<'_> {
    type Item = ScenarioRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_row < self.sheet.row_count() {
            let row = self.next_row;
            self.next_row += 1;
            if let Some(record) = self.record_at(row) {
                return Some(record);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.sheet.row_count() - self.next_row))
    }
}

/// Extract scenario records from an Operating Scenario sheet.
///
/// Fails only when the scenario column cannot be resolved.
pub fn extract(sheet: &Sheet) -> Result<ScenarioExtractor<'_>, HaraError> {
    ScenarioExtractor::new(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn os_sheet(rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet::from_rows(
            "Operating Scenarios",
            ["Operating Scenario", "E", "Hazard", "Secondary Hazard"],
            rows,
        )
    }

    #[test]
    fn missing_scenario_column_is_fatal() {
        let sheet = Sheet::from_rows("OS", ["Scenario", "E"], Vec::new());
        let err = extract(&sheet).unwrap_err();
        assert!(matches!(err, HaraError::MissingColumn { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn blank_scenarios_are_dropped() {
        let sheet = os_sheet(vec![
            vec![Cell::text("Highway driving"), Cell::from(3), Cell::Empty],
            vec![Cell::Empty, Cell::from(2), Cell::text("Fire")],
            vec![Cell::text("   "), Cell::from(2), Cell::Empty],
            vec![Cell::text("  City traffic  "), Cell::from(2), Cell::Empty],
        ]);
        let records: Vec<_> = extract(&sheet).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scenario_text, "Highway driving");
        assert_eq!(records[0].source_row_index, 0);
        assert_eq!(records[1].scenario_text, "City traffic");
        assert_eq!(records[1].source_row_index, 3);
    }

    #[test]
    fn exposure_defaults_to_four_without_validation() {
        let sheet = os_sheet(vec![
            vec![Cell::text("a"), Cell::Empty],
            vec![Cell::text("b"), Cell::text("frequent")],
            vec![Cell::text("c"), Cell::from(9)],
            vec![Cell::text("d"), Cell::text(" 2 ")],
            vec![Cell::text("e")],
        ]);
        let exposures: Vec<i64> = extract(&sheet).unwrap().map(|r| r.exposure).collect();
        assert_eq!(exposures, vec![4, 4, 9, 2, 4]);
    }

    #[test]
    fn exposure_column_absent_defaults_every_row() {
        let sheet = Sheet::from_rows("OS", ["Operating Scenario"], vec![vec![Cell::text("a")]]);
        let extractor = extract(&sheet).unwrap();
        assert!(!extractor.has_exposure_column());
        let records: Vec<_> = extractor.collect();
        assert_eq!(records[0].exposure, DEFAULT_EXPOSURE);
    }

    #[test]
    fn first_non_empty_hazard_wins() {
        let sheet = os_sheet(vec![
            vec![
                Cell::text("a"),
                Cell::from(1),
                Cell::text("  "),
                Cell::text(" Rollaway "),
            ],
            vec![
                Cell::text("b"),
                Cell::from(1),
                Cell::text("Fire"),
                Cell::text("Rollaway"),
            ],
        ]);
        let extractor = extract(&sheet).unwrap();
        assert_eq!(extractor.hazard_column_count(), 2);
        let records: Vec<_> = extractor.collect();
        assert_eq!(records[0].hazard_text.as_deref(), Some("Rollaway"));
        assert_eq!(records[1].hazard_text.as_deref(), Some("Fire"));
    }

    #[test]
    fn no_hazard_is_fabricated() {
        let sheet = os_sheet(vec![vec![
            Cell::text("a"),
            Cell::from(1),
            Cell::Empty,
            Cell::text(""),
        ]]);
        let records: Vec<_> = extract(&sheet).unwrap().collect();
        assert_eq!(records[0].hazard_text, None);
    }
}
