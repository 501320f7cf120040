//! Result table produced by a run.

use crate::asil::{AsilDistribution, AsilLevel, determine};
use crate::matcher::{MatchKind, MatchSummary};
use crate::sheet::{Cell, Sheet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result table headers, in output order.
pub const RESULT_COLUMNS: [&str; 14] = [
    "Operating Scenario",
    "E",
    "Hazard",
    "Match_Type",
    "Match_Score",
    "Hazardous Event",
    "Details of Hazardous event",
    "people at risk",
    "Δv",
    "S",
    "Severity Rational",
    "C",
    "Controllability Rational",
    "ASIL",
];

/// One enriched output row per extracted scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub scenario: String,
    pub exposure: i64,
    pub hazard: String,
    pub match_kind: MatchKind,
    pub match_score: f64,
    pub hazardous_event: String,
    pub details: String,
    pub people_at_risk: String,
    pub delta_v: String,
    pub severity: Option<u8>,
    pub severity_rationale: String,
    pub controllability: Option<u8>,
    pub controllability_rationale: String,
    pub asil: Option<AsilLevel>,
    /// Row of the Operating Scenario sheet this came from.
    pub source_row_index: usize,
}

impl Default for ResultRow {
    fn default() -> Self {
        Self {
            scenario: String::new(),
            exposure: crate::extract::DEFAULT_EXPOSURE,
            hazard: String::new(),
            match_kind: MatchKind::NoMatch,
            match_score: 0.0,
            hazardous_event: String::new(),
            details: String::new(),
            people_at_risk: String::new(),
            delta_v: String::new(),
            severity: None,
            severity_rationale: String::new(),
            controllability: None,
            controllability_rationale: String::new(),
            asil: None,
            source_row_index: 0,
        }
    }
}

impl ResultRow {
    /// Fill in the ASIL column from E/S/C. Returns the grade, if any.
    pub fn determine_asil(&mut self) -> Option<AsilLevel> {
        self.asil = determine(self.exposure, self.severity, self.controllability);
        self.asil
    }

    /// `"85%"`; `"0%"` when unmatched.
    pub fn match_score_label(&self) -> String {
        format!("{}%", self.match_score.round_ties_even() as i64)
    }

    /// Cells in [`RESULT_COLUMNS`] order. Missing values become empty cells;
    /// E, S and C stay numeric.
    pub fn to_cells(&self) -> Vec<Cell> {
        let text = |s: &str| {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::text(s)
            }
        };
        vec![
            Cell::text(self.scenario.as_str()),
            Cell::from(self.exposure),
            text(&self.hazard),
            Cell::text(self.match_kind.to_string()),
            Cell::text(self.match_score_label()),
            text(&self.hazardous_event),
            text(&self.details),
            text(&self.people_at_risk),
            text(&self.delta_v),
            Cell::from(self.severity),
            text(&self.severity_rationale),
            Cell::from(self.controllability),
            text(&self.controllability_rationale),
            self.asil.map(|a| Cell::text(a.grade())).unwrap_or_default(),
        ]
    }
}

// ─── Run summary ───────────────────────────────────────────────────────

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub matches: MatchSummary,
    pub with_severity: usize,
    pub with_controllability: usize,
    pub with_asil: usize,
    pub distribution: AsilDistribution,
}

impl RunSummary {
    pub fn from_rows(rows: &[ResultRow], matches: MatchSummary) -> Self {
        Self {
            total: rows.len(),
            matches,
            with_severity: rows.iter().filter(|r| r.severity.is_some()).count(),
            with_controllability: rows.iter().filter(|r| r.controllability.is_some()).count(),
            with_asil: rows.iter().filter(|r| r.asil.is_some()).count(),
            distribution: AsilDistribution::from_grades(rows.iter().map(|r| r.asil)),
        }
    }

    /// Troubleshooting hint when rows were produced but none got a grade,
    /// chosen by which ratings the matched rows carried.
    pub fn hint(&self) -> Option<&'static str> {
        if self.total == 0 || self.with_asil > 0 {
            return None;
        }
        Some(match (self.with_severity, self.with_controllability) {
            (0, 0) => {
                "S and C columns not found or empty in the Risk Assessment sheet. Name them \
                 'S'/'Severity' and 'C'/'Controllability' with values 0-3, and check that \
                 matched scenarios have both populated."
            }
            (0, _) => "S (Severity) values not found. Check that the S column has valid values (0-3).",
            (_, 0) => {
                "C (Controllability) values not found. Check that the C column has valid values (0-3)."
            }
            _ => {
                "Some S/C values found but not for matched scenarios. Check the fuzzy matching \
                 threshold and verify Operating Scenario names match between sheets."
            }
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows ({} exact, {} fuzzy, {} unmatched); ASIL determined for {}",
            self.total,
            self.matches.exact,
            self.matches.fuzzy,
            self.matches.unmatched,
            self.with_asil
        )?;
        if !self.distribution.is_empty() {
            write!(f, " [{}]", self.distribution)?;
        }
        Ok(())
    }
}

// ─── Table ─────────────────────────────────────────────────────────────

/// Output of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
    pub summary: RunSummary,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>, matches: MatchSummary) -> Self {
        let summary = RunSummary::from_rows(&rows, matches);
        Self { rows, summary }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a worksheet with the fixed result headers.
    pub fn to_sheet(&self, name: &str) -> Sheet {
        Sheet::from_rows(
            name,
            RESULT_COLUMNS,
            self.rows.iter().map(ResultRow::to_cells),
        )
    }
}
