//! Pipeline orchestrator: extract → match → determine.
//!
//! A run is a plain synchronous function over two in-memory sheets. Progress
//! and log lines go to an [`EventSink`]; the run ends with exactly one
//! terminal event (`Completed` or `Failed`). Nothing is retried and no partial
//! table is returned on failure.

use crate::config::MatchConfig;
use crate::error::HaraError;
use crate::event::{EventKind, EventSink, Stage};
use crate::extract::ScenarioExtractor;
use crate::matcher::{Matcher, RiskAssessment};
use crate::result::ResultTable;
use crate::sheet::{Sheet, Workbook};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// The two sheets a run reads, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSelection {
    pub scenarios: String,
    pub risk_assessment: String,
}

impl SheetSelection {
    pub fn new(scenarios: impl Into<String>, risk_assessment: impl Into<String>) -> Self {
        Self {
            scenarios: scenarios.into(),
            risk_assessment: risk_assessment.into(),
        }
    }

    /// Both sheets must exist and must differ.
    pub fn resolve<'w>(&self, workbook: &'w Workbook) -> Result<(&'w Sheet, &'w Sheet), HaraError> {
        if self.scenarios == self.risk_assessment {
            return Err(HaraError::SameSheet(self.scenarios.clone()));
        }
        let os = workbook
            .sheet(&self.scenarios)
            .ok_or_else(|| HaraError::SheetNotFound(self.scenarios.clone()))?;
        let ra = workbook
            .sheet(&self.risk_assessment)
            .ok_or_else(|| HaraError::SheetNotFound(self.risk_assessment.clone()))?;
        Ok((os, ra))
    }
}

/// Runs the full HARA pipeline with one matcher configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    matcher: Matcher,
}

impl Pipeline {
    /// Fails with a configuration error if `config` is invalid.
    pub fn new(config: MatchConfig) -> Result<Self, HaraError> {
        Ok(Self {
            matcher: Matcher::new(config)?,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        self.matcher.config()
    }

    /// Resolve the selected sheets and run.
    pub fn run(
        &self,
        workbook: &Workbook,
        selection: &SheetSelection,
        sink: &dyn EventSink,
    ) -> Result<ResultTable, HaraError> {
        let outcome = selection
            .resolve(workbook)
            .and_then(|(os, ra)| self.guarded(os, ra, sink));
        finish(outcome, sink)
    }

    /// Run on two sheets directly.
    pub fn run_sheets(
        &self,
        scenarios: &Sheet,
        risk_assessment: &Sheet,
        sink: &dyn EventSink,
    ) -> Result<ResultTable, HaraError> {
        let outcome = self.guarded(scenarios, risk_assessment, sink);
        finish(outcome, sink)
    }

    /// Converts a panic anywhere in the stages into an internal error.
    fn guarded(&self, os: &Sheet, ra: &Sheet, sink: &dyn EventSink) -> Result<ResultTable, HaraError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.stages(os, ra, sink)))
            .unwrap_or_else(|payload| Err(HaraError::Internal(panic_message(payload.as_ref()))))
    }

    fn stages(&self, os: &Sheet, ra: &Sheet, sink: &dyn EventSink) -> Result<ResultTable, HaraError> {
        let config = self.matcher.config();

        sink.emit(EventKind::info(format!("Loading Operating Scenario sheet: {}", os.name)));
        sink.emit(EventKind::progress(Stage::LoadScenarios));
        sink.emit(EventKind::info(format!("Loading Risk Assessment sheet: {}", ra.name)));
        sink.emit(EventKind::progress(Stage::LoadRiskAssessment));

        sink.emit(EventKind::info("Processing Operating Scenarios..."));
        sink.emit(EventKind::progress(Stage::Extract));
        let extractor = ScenarioExtractor::new(os)?;
        sink.emit(EventKind::info(format!(
            "Found columns: Operating Scenario, E, {} hazard columns",
            extractor.hazard_column_count()
        )));
        if !extractor.has_exposure_column() {
            tracing::warn!(sheet = %os.name, "no exposure column, every scenario uses E4");
        }
        let scenarios: Vec<_> = extractor.collect();
        tracing::info!(sheet = %os.name, count = scenarios.len(), "extracted scenarios");
        sink.emit(EventKind::info(format!(
            "Processed {} operating scenarios",
            scenarios.len()
        )));

        sink.emit(EventKind::info(format!("Matching scenarios ({})", config.describe())));
        sink.emit(EventKind::progress(Stage::Match));
        let ra_view = RiskAssessment::new(ra);
        if ra_view.columns().scenario.is_none() {
            tracing::warn!(sheet = %ra.name, "risk assessment has no Operating Scenario column");
            sink.emit(EventKind::warn(format!(
                "Operating Scenario column not found in Risk Assessment sheet '{}'; no rows can match",
                ra.name
            )));
        }
        let (mut rows, summary) = self.matcher.match_all(scenarios, &ra_view);
        let algorithm = if config.fuzzy_enabled {
            format!(" ({})", config.fuzzy_algorithm.short_name())
        } else {
            String::new()
        };
        sink.emit(EventKind::info(format!(
            "Matching complete: {} exact, {} fuzzy{}, {} unmatched",
            summary.exact, summary.fuzzy, algorithm, summary.unmatched
        )));

        sink.emit(EventKind::info("Determining ASIL values..."));
        sink.emit(EventKind::progress(Stage::Determine));
        for row in &mut rows {
            row.determine_asil();
        }
        let table = ResultTable::new(rows, summary);
        if table.summary.distribution.is_empty() {
            sink.emit(EventKind::info(
                "ASIL determination: No valid S/C values found for ASIL calculation",
            ));
        } else {
            sink.emit(EventKind::info(format!(
                "ASIL determination: {}",
                table.summary.distribution
            )));
        }
        tracing::info!(
            rows = table.len(),
            with_asil = table.summary.with_asil,
            "asil determination complete"
        );

        sink.emit(EventKind::info("Processing completed successfully"));
        sink.emit(EventKind::progress(Stage::Complete));
        Ok(table)
    }
}

/// Emit the terminal event for a run.
fn finish(outcome: Result<ResultTable, HaraError>, sink: &dyn EventSink) -> Result<ResultTable, HaraError> {
    match &outcome {
        Ok(table) => sink.emit(EventKind::Completed { rows: table.len() }),
        Err(e) => {
            tracing::error!(error = %e, "pipeline run failed");
            sink.emit(EventKind::error(format!("Error during processing: {e}")));
            sink.emit(EventKind::Failed {
                message: e.to_string(),
            });
        }
    }
    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
