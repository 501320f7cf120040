//! End-to-end runs over in-memory workbooks.

use hara_core::asil::AsilLevel;
use hara_core::config::{HaraConfig, MatchConfig};
use hara_core::event::{EventKind, NullSink, RecordingSink};
use hara_core::matcher::MatchKind;
use hara_core::pipeline::{Pipeline, SheetSelection};
use hara_core::result::RESULT_COLUMNS;
use hara_core::sheet::{Cell, Sheet, Workbook};
use hara_core::similarity::Algorithm;

const OS: &str = "Operating Scenarios";
const RA: &str = "Risk Assessment";

fn os_sheet(rows: Vec<Vec<Cell>>) -> Sheet {
    Sheet::from_rows(OS, ["Operating Scenario", "E", "Hazard"], rows)
}

fn ra_sheet(rows: Vec<Vec<Cell>>) -> Sheet {
    Sheet::from_rows(
        RA,
        [
            "Operating Scenario",
            "Hazard",
            "Hazardous Event",
            "Details of Hazardous event",
            "people at risk",
            "Δv",
            "S",
            "Severity Rational",
            "C",
            "Controllability Rational",
        ],
        rows,
    )
}

fn ra_row(os: &str, hazard: Option<&str>, s: Cell, c: Cell) -> Vec<Cell> {
    vec![
        Cell::text(os),
        hazard.map(Cell::text).unwrap_or_default(),
        Cell::text("Vehicle rolls away"),
        Cell::text("Unattended vehicle moves downhill"),
        Cell::text("Pedestrians"),
        Cell::text("10 km/h"),
        s,
        Cell::text("Injuries likely"),
        c,
        Cell::text("Hard to stop"),
    ]
}

fn run(config: MatchConfig, os: Sheet, ra: Sheet) -> hara_core::result::ResultTable {
    let workbook = Workbook::new(vec![os, ra]);
    Pipeline::new(config)
        .unwrap()
        .run(&workbook, &SheetSelection::new(OS, RA), &NullSink)
        .unwrap()
}

#[test]
fn exact_case_insensitive_match_determines_asil() {
    let table = run(
        MatchConfig::default(),
        os_sheet(vec![vec![Cell::text("Vehicle parked on slope"), Cell::from(3), Cell::Empty]]),
        ra_sheet(vec![ra_row("vehicle parked on slope", None, Cell::from(2), Cell::from(2))]),
    );
    assert_eq!(table.len(), 1);
    let row = &table.rows[0];
    assert_eq!(row.match_kind, MatchKind::ExactScenario);
    assert_eq!(row.match_kind.to_string(), "Exact (OS)");
    assert_eq!(row.match_score_label(), "100%");
    assert_eq!(row.severity, Some(2));
    assert_eq!(row.controllability, Some(2));
    assert_eq!(row.asil, Some(AsilLevel::AsilA));
    assert_eq!(row.hazardous_event, "Vehicle rolls away");
    assert_eq!(row.delta_v, "10 km/h");
}

#[test]
fn unmatched_row_with_fuzzy_disabled_has_empty_ratings() {
    let config = MatchConfig {
        fuzzy_enabled: false,
        ..MatchConfig::default()
    };
    let table = run(
        config,
        os_sheet(vec![vec![Cell::text("Car wash"), Cell::from(2), Cell::Empty]]),
        ra_sheet(vec![ra_row("Vehicle parked on slope", None, Cell::from(3), Cell::from(3))]),
    );
    let row = &table.rows[0];
    assert_eq!(row.match_kind.to_string(), "No match");
    assert_eq!(row.match_score_label(), "0%");
    assert_eq!(row.severity, None);
    assert_eq!(row.controllability, None);
    assert_eq!(row.asil, None);

    let sheet = table.to_sheet("RESULT");
    let s_col = RESULT_COLUMNS.iter().position(|c| *c == "S").unwrap();
    let asil_col = RESULT_COLUMNS.iter().position(|c| *c == "ASIL").unwrap();
    assert_eq!(sheet.cell(0, s_col), &Cell::Empty);
    assert_eq!(sheet.cell(0, asil_col), &Cell::Empty);
}

#[test]
fn fuzzy_match_at_85_percent_is_labelled() {
    // ratio("city driving at dusk", "city driving at dawn") == 85
    let table = run(
        MatchConfig::default(),
        os_sheet(vec![vec![Cell::text("City driving at dusk"), Cell::from(4), Cell::Empty]]),
        ra_sheet(vec![ra_row("City driving at dawn", None, Cell::from(3), Cell::from(2))]),
    );
    let row = &table.rows[0];
    assert_eq!(
        row.match_kind,
        MatchKind::Fuzzy {
            algorithm: Algorithm::Ratio,
            score: 85.0
        }
    );
    assert_eq!(row.match_kind.to_string(), "Fuzzy-Ratio (85%)");
    assert_eq!(row.match_score_label(), "85%");
    assert_eq!(row.asil, Some(AsilLevel::AsilC));
}

#[test]
fn fuzzy_threshold_is_inclusive() {
    let os = || os_sheet(vec![vec![Cell::text("City driving at dusk"), Cell::from(4), Cell::Empty]]);
    let ra = || ra_sheet(vec![ra_row("City driving at dawn", None, Cell::from(3), Cell::from(2))]);

    let at = run(
        MatchConfig {
            fuzzy_threshold: 85,
            ..MatchConfig::default()
        },
        os(),
        ra(),
    );
    assert!(at.rows[0].match_kind.is_fuzzy());

    let above = run(
        MatchConfig {
            fuzzy_threshold: 86,
            ..MatchConfig::default()
        },
        os(),
        ra(),
    );
    assert_eq!(above.rows[0].match_kind, MatchKind::NoMatch);
}

#[test]
fn exact_match_beats_fuzzy_settings() {
    for config in [
        MatchConfig {
            fuzzy_enabled: false,
            ..MatchConfig::default()
        },
        MatchConfig {
            fuzzy_threshold: 100,
            ..MatchConfig::default()
        },
    ] {
        let table = run(
            config,
            os_sheet(vec![vec![Cell::text("  TUNNEL   entry "), Cell::from(2), Cell::Empty]]),
            ra_sheet(vec![
                ra_row("Tunnel exit", None, Cell::from(1), Cell::from(1)),
                ra_row("tunnel entry", None, Cell::from(3), Cell::from(3)),
            ]),
        );
        assert_eq!(table.rows[0].match_kind, MatchKind::ExactScenario);
        assert_eq!(table.rows[0].match_score, 100.0);
        assert_eq!(table.rows[0].asil, Some(AsilLevel::AsilC));
    }
}

/// A scenario whose hazard disagrees with every scenario-equal RA row does
/// not fall back to a scenario-only exact match.
#[test]
fn hazard_mismatch_skips_scenario_only_exact_match() {
    let config = MatchConfig {
        fuzzy_enabled: false,
        ..MatchConfig::default()
    };
    let table = run(
        config,
        os_sheet(vec![vec![
            Cell::text("Vehicle parked on slope"),
            Cell::from(3),
            Cell::text("Fire"),
        ]]),
        ra_sheet(vec![ra_row(
            "Vehicle parked on slope",
            Some("Rollaway"),
            Cell::from(2),
            Cell::from(2),
        )]),
    );
    assert_eq!(table.rows[0].match_kind, MatchKind::NoMatch);
    assert_eq!(table.rows[0].hazard, "Fire");
}

#[test]
fn hazard_aware_exact_match() {
    let table = run(
        MatchConfig::default(),
        os_sheet(vec![vec![
            Cell::text("Vehicle parked on slope"),
            Cell::from(4),
            Cell::text("rollaway"),
        ]]),
        ra_sheet(vec![
            ra_row("Vehicle parked on slope", Some("Fire"), Cell::from(1), Cell::from(1)),
            ra_row("Vehicle parked on slope", Some("Rollaway"), Cell::from(3), Cell::from(3)),
        ]),
    );
    let row = &table.rows[0];
    assert_eq!(row.match_kind.to_string(), "Exact (OS+Hazard)");
    assert_eq!(row.asil, Some(AsilLevel::AsilD));
}

#[test]
fn invalid_ratings_are_dropped_and_exposure_defaults() {
    let table = run(
        MatchConfig::default(),
        os_sheet(vec![
            vec![Cell::text("A"), Cell::text("often"), Cell::Empty],
            vec![Cell::Empty, Cell::from(1), Cell::text("Fire")],
            vec![Cell::text("B"), Cell::from(9), Cell::Empty],
        ]),
        ra_sheet(vec![
            ra_row("a", None, Cell::text("high"), Cell::from(2)),
            ra_row("b", None, Cell::from(3), Cell::from(3)),
        ]),
    );
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0].exposure, 4);
    assert_eq!(table.rows[0].severity, None);
    assert_eq!(table.rows[0].asil, None);
    // E9 is kept as read but clamped to E4 for the lookup
    assert_eq!(table.rows[1].exposure, 9);
    assert_eq!(table.rows[1].asil, Some(AsilLevel::AsilD));
}

#[test]
fn severity_zero_yields_no_grade() {
    let table = run(
        MatchConfig::default(),
        os_sheet(vec![vec![Cell::text("Tunnel"), Cell::from(4), Cell::Empty]]),
        ra_sheet(vec![ra_row("Tunnel", None, Cell::from(0), Cell::from(3))]),
    );
    assert_eq!(table.rows[0].severity, Some(0));
    assert_eq!(table.rows[0].asil, None);
    assert!(table.summary.hint().is_some());
}

#[test]
fn events_end_with_single_terminal_outcome() {
    let workbook = Workbook::new(vec![
        os_sheet(vec![vec![Cell::text("Tunnel"), Cell::from(4), Cell::Empty]]),
        ra_sheet(vec![ra_row("Tunnel", None, Cell::from(2), Cell::from(2))]),
    ]);
    let sink = RecordingSink::new();
    let config = HaraConfig::from_toml("[matching]\nfuzzy_enabled = false\n").unwrap();
    Pipeline::new(config.matching)
        .unwrap()
        .run(&workbook, &SheetSelection::new(OS, RA), &sink)
        .unwrap();

    let kinds = sink.kinds();
    assert_eq!(kinds.iter().filter(|k| k.is_terminal()).count(), 1);
    assert_eq!(kinds.last(), Some(&EventKind::Completed { rows: 1 }));
    let messages = sink.messages();
    assert!(messages.contains(&"Matching scenarios (Fuzzy: False, Threshold: 80%)".to_string()));
    assert!(messages.contains(&"Matching complete: 1 exact, 0 fuzzy, 0 unmatched".to_string()));
    assert_eq!(messages.last().map(String::as_str), Some("Processing completed successfully"));
}

#[test]
fn result_rows_follow_scenario_order() {
    let table = run(
        MatchConfig::default(),
        os_sheet(vec![
            vec![Cell::text("Tunnel"), Cell::from(1), Cell::Empty],
            vec![Cell::text("Bridge"), Cell::from(2), Cell::Empty],
            vec![Cell::text("Car wash"), Cell::from(3), Cell::Empty],
        ]),
        ra_sheet(vec![
            ra_row("Bridge", None, Cell::from(1), Cell::from(1)),
            ra_row("Tunnel", None, Cell::from(1), Cell::from(1)),
        ]),
    );
    let names: Vec<&str> = table.rows.iter().map(|r| r.scenario.as_str()).collect();
    assert_eq!(names, vec!["Tunnel", "Bridge", "Car wash"]);
    assert_eq!(table.summary.matches.exact, 2);
}
