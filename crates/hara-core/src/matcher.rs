//! Scenario → Risk Assessment matching.
//!
//! Two phases per scenario:
//! 1. Exact: normalized scenario text equality, hazard-aware when both
//!    sides carry a hazard. First qualifying row in sheet order wins.
//! 2. Fuzzy (only if enabled and phase 1 found nothing): weighted scenario
//!    and hazard similarity, best strictly-greater score at or above the
//!    threshold. Ties keep the earlier row.
//!
//! Exact always takes priority over fuzzy, regardless of fuzzy scores.

use crate::asil::validate_rating;
use crate::column::{LogicalColumn, RiskAssessmentColumns};
use crate::config::MatchConfig;
use crate::error::HaraError;
use crate::extract::ScenarioRecord;
use crate::normalize::{normalize, normalize_cell};
use crate::result::ResultRow;
use crate::sheet::{Cell, Sheet};
use crate::similarity::{Algorithm, Scorer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score recorded for exact matches.
pub const EXACT_SCORE: f64 = 100.0;

// ─── Risk Assessment view ──────────────────────────────────────────────

/// Read-only view of a Risk Assessment sheet with its columns resolved.
#[derive(Debug, Clone)]
pub struct RiskAssessment<'a> {
    sheet: &'a Sheet,
    columns: RiskAssessmentColumns,
}

impl<'a> RiskAssessment<'a> {
    pub fn new(sheet: &'a Sheet) -> Self {
        Self {
            sheet,
            columns: RiskAssessmentColumns::resolve(sheet),
        }
    }

    pub fn sheet(&self) -> &'a Sheet {
        self.sheet
    }

    pub fn columns(&self) -> &RiskAssessmentColumns {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.sheet.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.sheet.row_count() == 0
    }

    /// Rows in original sheet order.
    pub fn rows(&self) -> impl Iterator<Item = RiskAssessmentRow<'_>> {
        (0..self.sheet.row_count()).map(move |index| RiskAssessmentRow {
            sheet: self.sheet,
            columns: &self.columns,
            index,
        })
    }
}

/// One Risk Assessment row, addressed by logical column. Never copied out
/// of the sheet until enrichment.
#[derive(Debug, Clone, Copy)]
pub struct RiskAssessmentRow<'a> {
    sheet: &'a Sheet,
    columns: &'a RiskAssessmentColumns,
    index: usize,
}

impl<'a> RiskAssessmentRow<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell for a logical column; [`Cell::Empty`] when the column is unresolved.
    pub fn cell(&self, column: LogicalColumn) -> &'a Cell {
        static EMPTY: Cell = Cell::Empty;
        match self.columns.get(column) {
            Some(col) => self.sheet.cell(self.index, col),
            None => &EMPTY,
        }
    }

    /// Textual value, empty string when unavailable.
    pub fn value(&self, column: LogicalColumn) -> String {
        self.cell(column).to_string()
    }

    pub fn has_value(&self, column: LogicalColumn) -> bool {
        !self.cell(column).is_blank()
    }
}

// ─── Match outcome ─────────────────────────────────────────────────────

/// How a scenario was matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchKind {
    ExactScenarioAndHazard,
    ExactScenario,
    Fuzzy { algorithm: Algorithm, score: f64 },
    NoMatch,
}

impl MatchKind {
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            MatchKind::ExactScenarioAndHazard | MatchKind::ExactScenario
        )
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(self, MatchKind::Fuzzy { .. })
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::ExactScenarioAndHazard => write!(f, "Exact (OS+Hazard)"),
            MatchKind::ExactScenario => write!(f, "Exact (OS)"),
            MatchKind::Fuzzy { algorithm, score } => write!(
                f,
                "Fuzzy-{} ({}%)",
                algorithm.short_name(),
                score.round_ties_even() as i64
            ),
            MatchKind::NoMatch => write!(f, "No match"),
        }
    }
}

/// Result of matching one scenario.
#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub matched_row: Option<RiskAssessmentRow<'a>>,
    pub score: f64,
    pub kind: MatchKind,
}

impl MatchResult<'_> {
    fn none() -> Self {
        Self {
            matched_row: None,
            score: 0.0,
            kind: MatchKind::NoMatch,
        }
    }
}

/// Outcome counts over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub exact: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
}

impl MatchSummary {
    pub fn record(&mut self, kind: &MatchKind) {
        match kind {
            MatchKind::ExactScenarioAndHazard | MatchKind::ExactScenario => self.exact += 1,
            MatchKind::Fuzzy { .. } => self.fuzzy += 1,
            MatchKind::NoMatch => self.unmatched += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.exact + self.fuzzy + self.unmatched
    }
}

// ─── Matcher ───────────────────────────────────────────────────────────

/// Exact-then-fuzzy matcher over a Risk Assessment sheet.
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchConfig,
    scorer: Scorer,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Result<Self, HaraError> {
        config.validate()?;
        let scorer = config.scorer();
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Find the Risk Assessment row corresponding to `scenario`.
    pub fn find_match<'r>(
        &self,
        scenario: &ScenarioRecord,
        ra: &'r RiskAssessment<'_>,
    ) -> MatchResult<'r> {
        if let Some(result) = self.exact_match(scenario, ra) {
            return result;
        }
        if self.config.fuzzy_enabled {
            return self.fuzzy_match(scenario, ra);
        }
        MatchResult::none()
    }

    /// Phase 1. A scenario-equal row whose hazard disagrees is skipped, and
    /// the scan does not fall back to a scenario-only match afterwards: the
    /// plain branch fires only when no hazard comparison is attempted.
    fn exact_match<'r>(
        &self,
        scenario: &ScenarioRecord,
        ra: &'r RiskAssessment<'_>,
    ) -> Option<MatchResult<'r>> {
        let options = self.config.normalize_options();
        let target = normalize(&scenario.scenario_text, options);
        let hazard = scenario
            .hazard_text
            .as_deref()
            .filter(|_| ra.columns().hazard.is_some())
            .map(|h| normalize(h, options));

        for row in ra.rows() {
            let cell = row.cell(LogicalColumn::OperatingScenario);
            if cell.is_blank() || normalize_cell(cell, options) != target {
                continue;
            }
            match &hazard {
                Some(wanted) => {
                    if row.has_value(LogicalColumn::Hazard)
                        && normalize_cell(row.cell(LogicalColumn::Hazard), options) == *wanted
                    {
                        return Some(MatchResult {
                            matched_row: Some(row),
                            score: EXACT_SCORE,
                            kind: MatchKind::ExactScenarioAndHazard,
                        });
                    }
                }
                None => {
                    return Some(MatchResult {
                        matched_row: Some(row),
                        score: EXACT_SCORE,
                        kind: MatchKind::ExactScenario,
                    });
                }
            }
        }
        None
    }

    /// Phase 2: weighted similarity, strictly-better and at-threshold.
    fn fuzzy_match<'r>(
        &self,
        scenario: &ScenarioRecord,
        ra: &'r RiskAssessment<'_>,
    ) -> MatchResult<'r> {
        let threshold = f64::from(self.config.fuzzy_threshold);
        let mut best = MatchResult::none();

        for row in ra.rows() {
            let cell = row.cell(LogicalColumn::OperatingScenario);
            if cell.is_blank() {
                continue;
            }
            let os_score = f64::from(self.scorer.score(&scenario.scenario_text, cell.to_string().trim()));

            let score = match scenario.hazard_text.as_deref() {
                Some(hazard) if row.has_value(LogicalColumn::Hazard) => {
                    let hazard_score =
                        f64::from(self.scorer.score(hazard, &row.value(LogicalColumn::Hazard)));
                    os_score * self.config.os_weight + hazard_score * self.config.hazard_weight
                }
                _ => os_score,
            };

            if score > best.score && score >= threshold {
                best = MatchResult {
                    matched_row: Some(row),
                    score,
                    kind: MatchKind::Fuzzy {
                        algorithm: self.config.fuzzy_algorithm,
                        score,
                    },
                };
            }
        }
        best
    }

    /// Build the enriched result row for a scenario and its match outcome.
    ///
    /// Every Risk Assessment field defaults to empty independently. Severity
    /// and controllability keep only integers in 0..=3.
    pub fn enrich(&self, scenario: &ScenarioRecord, result: &MatchResult<'_>) -> ResultRow {
        let mut row = ResultRow {
            scenario: scenario.scenario_text.clone(),
            exposure: scenario.exposure,
            hazard: scenario.hazard_text.clone().unwrap_or_default(),
            match_kind: result.kind.clone(),
            match_score: result.score,
            source_row_index: scenario.source_row_index,
            ..ResultRow::default()
        };

        let Some(ra) = result.matched_row else {
            return row;
        };

        if scenario.hazard_text.is_none() && ra.has_value(LogicalColumn::Hazard) {
            row.hazard = ra.value(LogicalColumn::Hazard);
        }
        row.hazardous_event = ra.value(LogicalColumn::HazardousEvent);
        row.details = ra.value(LogicalColumn::Details);
        row.people_at_risk = ra.value(LogicalColumn::PeopleAtRisk);
        row.delta_v = ra.value(LogicalColumn::DeltaV);
        row.severity = validate_rating(ra.cell(LogicalColumn::Severity));
        row.severity_rationale = ra.value(LogicalColumn::SeverityRationale);
        row.controllability = validate_rating(ra.cell(LogicalColumn::Controllability));
        row.controllability_rationale = ra.value(LogicalColumn::ControllabilityRationale);
        row
    }

    /// Match and enrich every scenario, in order. One result row per scenario.
    pub fn match_all<I>(&self, scenarios: I, ra: &RiskAssessment<'_>) -> (Vec<ResultRow>, MatchSummary)
    where
        I: IntoIterator<Item = ScenarioRecord>,
    {
        let mut summary = MatchSummary::default();
        let mut rows = Vec::new();
        for scenario in scenarios {
            let result = self.find_match(&scenario, ra);
            tracing::debug!(
                row = scenario.source_row_index,
                kind = %result.kind,
                matched = ?result.matched_row.map(|r| r.index()),
                "matched scenario"
            );
            summary.record(&result.kind);
            rows.push(self.enrich(&scenario, &result));
        }
        tracing::info!(
            exact = summary.exact,
            fuzzy = summary.fuzzy,
            unmatched = summary.unmatched,
            algorithm = self.config.fuzzy_algorithm.short_name(),
            "matching complete"
        );
        (rows, summary)
    }
}
