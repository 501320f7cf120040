//! Case-insensitive header lookup against a fixed alias table.

use crate::sheet::Sheet;
use std::fmt;

/// A column the pipeline knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalColumn {
    OperatingScenario,
    Hazard,
    HazardousEvent,
    Details,
    PeopleAtRisk,
    DeltaV,
    Severity,
    Exposure,
    Controllability,
    SeverityRationale,
    ControllabilityRationale,
}

impl LogicalColumn {
    /// Recognized header names, tried in order. All lowercase.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            LogicalColumn::OperatingScenario => &[
                "operating scenario",
                "os",
                "operating_scenario",
                "operating scenarios",
            ],
            LogicalColumn::Hazard => &["hazard", "hazards"],
            LogicalColumn::HazardousEvent => &["hazardous event", "he", "hazardous_event"],
            LogicalColumn::Details => &["details of hazardous event", "details", "he_details"],
            LogicalColumn::PeopleAtRisk => &["people at risk", "people", "persons_at_risk"],
            LogicalColumn::DeltaV => &["δv", "deltav", "delta_v"],
            LogicalColumn::Severity => &["s", "severity", "severity rating", "severity level"],
            LogicalColumn::Exposure => &["e", "exposure", "exposure rating", "exposure level"],
            LogicalColumn::Controllability => &[
                "c",
                "controllability",
                "controllability rating",
                "controllability level",
            ],
            LogicalColumn::SeverityRationale => &[
                "severity rational",
                "severity_rationale",
                "s_rationale",
                "severity rationale",
            ],
            LogicalColumn::ControllabilityRationale => &[
                "controllability rational",
                "controllability_rationale",
                "c_rationale",
                "controllability rationale",
            ],
        }
    }

    /// Header used for this column in the result table.
    pub fn output_header(&self) -> &'static str {
        match self {
            LogicalColumn::OperatingScenario => "Operating Scenario",
            LogicalColumn::Hazard => "Hazard",
            LogicalColumn::HazardousEvent => "Hazardous Event",
            LogicalColumn::Details => "Details of Hazardous event",
            LogicalColumn::PeopleAtRisk => "people at risk",
            LogicalColumn::DeltaV => "Δv",
            LogicalColumn::Severity => "S",
            LogicalColumn::Exposure => "E",
            LogicalColumn::Controllability => "C",
            LogicalColumn::SeverityRationale => "Severity Rational",
            LogicalColumn::ControllabilityRationale => "Controllability Rational",
        }
    }
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output_header())
    }
}

/// Index of the first header equal to `name` once both are trimmed and
/// lowercased. Exact after normalization, never fuzzy.
pub fn resolve(headers: &[String], name: &str) -> Option<usize> {
    let target = name.trim().to_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_lowercase() == target)
}

/// Resolve a logical column by trying each of its aliases in order.
pub fn resolve_logical(headers: &[String], column: LogicalColumn) -> Option<usize> {
    column
        .aliases()
        .iter()
        .find_map(|alias| resolve(headers, alias))
}

/// Every column whose header contains "hazard", in sheet order, except
/// `exclude` (the scenario column).
pub fn hazard_candidates(headers: &[String], exclude: Option<usize>) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(i, h)| Some(*i) != exclude && h.to_lowercase().contains("hazard"))
        .map(|(i, _)| i)
        .collect()
}

/// Resolved column positions on a Risk Assessment sheet. Anything missing
/// simply reads as empty downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskAssessmentColumns {
    pub scenario: Option<usize>,
    pub hazard: Option<usize>,
    pub hazardous_event: Option<usize>,
    pub details: Option<usize>,
    pub people_at_risk: Option<usize>,
    pub delta_v: Option<usize>,
    pub severity: Option<usize>,
    pub severity_rationale: Option<usize>,
    pub controllability: Option<usize>,
    pub controllability_rationale: Option<usize>,
}

impl RiskAssessmentColumns {
    pub fn resolve(sheet: &Sheet) -> Self {
        let h = &sheet.headers;
        Self {
            scenario: resolve_logical(h, LogicalColumn::OperatingScenario),
            hazard: resolve_logical(h, LogicalColumn::Hazard),
            hazardous_event: resolve_logical(h, LogicalColumn::HazardousEvent),
            details: resolve_logical(h, LogicalColumn::Details),
            people_at_risk: resolve_logical(h, LogicalColumn::PeopleAtRisk),
            delta_v: resolve_logical(h, LogicalColumn::DeltaV),
            severity: resolve_logical(h, LogicalColumn::Severity),
            severity_rationale: resolve_logical(h, LogicalColumn::SeverityRationale),
            controllability: resolve_logical(h, LogicalColumn::Controllability),
            controllability_rationale: resolve_logical(h, LogicalColumn::ControllabilityRationale),
        }
    }

    /// Position of a logical column, if it was resolved.
    pub fn get(&self, column: LogicalColumn) -> Option<usize> {
        match column {
            LogicalColumn::OperatingScenario => self.scenario,
            LogicalColumn::Hazard => self.hazard,
            LogicalColumn::HazardousEvent => self.hazardous_event,
            LogicalColumn::Details => self.details,
            LogicalColumn::PeopleAtRisk => self.people_at_risk,
            LogicalColumn::DeltaV => self.delta_v,
            LogicalColumn::Severity => self.severity,
            LogicalColumn::SeverityRationale => self.severity_rationale,
            LogicalColumn::Controllability => self.controllability,
            LogicalColumn::ControllabilityRationale => self.controllability_rationale,
            LogicalColumn::Exposure => None,
        }
    }

    /// Logical columns that could not be found, for diagnostics.
    pub fn missing(&self) -> Vec<LogicalColumn> {
        [
            LogicalColumn::OperatingScenario,
            LogicalColumn::Hazard,
            LogicalColumn::HazardousEvent,
            LogicalColumn::Details,
            LogicalColumn::PeopleAtRisk,
            LogicalColumn::DeltaV,
            LogicalColumn::Severity,
            LogicalColumn::SeverityRationale,
            LogicalColumn::Controllability,
            LogicalColumn::ControllabilityRationale,
        ]
        .into_iter()
        .filter(|c| self.get(*c).is_none())
        .collect()
    }
}
