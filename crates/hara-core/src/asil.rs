//! ISO 26262 ASIL determination from Severity, Exposure and Controllability.

use crate::sheet::Cell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Highest valid severity / controllability class.
pub const MAX_RATING: u8 = 3;
pub const MIN_EXPOSURE: u8 = 1;
pub const MAX_EXPOSURE: u8 = 4;

// ─── ASIL grade ────────────────────────────────────────────────────────

/// Automotive Safety Integrity Level (ISO 26262).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AsilLevel {
    #[serde(rename = "QM")]
    Qm,
    #[serde(rename = "A")]
    AsilA,
    #[serde(rename = "B")]
    AsilB,
    #[serde(rename = "C")]
    AsilC,
    #[serde(rename = "D")]
    AsilD,
}

impl AsilLevel {
    pub const ALL: [AsilLevel; 5] = [
        AsilLevel::Qm,
        AsilLevel::AsilA,
        AsilLevel::AsilB,
        AsilLevel::AsilC,
        AsilLevel::AsilD,
    ];

    /// Grade as written in the ASIL column.
    pub fn grade(&self) -> &'static str {
        match self {
            AsilLevel::Qm => "QM",
            AsilLevel::AsilA => "A",
            AsilLevel::AsilB => "B",
            AsilLevel::AsilC => "C",
            AsilLevel::AsilD => "D",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            AsilLevel::Qm => "QM",
            AsilLevel::AsilA => "ASIL A",
            AsilLevel::AsilB => "ASIL B",
            AsilLevel::AsilC => "ASIL C",
            AsilLevel::AsilD => "ASIL D",
        }
    }

    /// Display colour (RGB) used when exporting results.
    pub fn color(&self) -> u32 {
        match self {
            AsilLevel::Qm => 0x2E7D32,
            AsilLevel::AsilA => 0xFFC107,
            AsilLevel::AsilB => 0xFF9800,
            AsilLevel::AsilC => 0xFF5722,
            AsilLevel::AsilD => 0xF44336,
        }
    }
}

impl fmt::Display for AsilLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grade())
    }
}

impl std::str::FromStr for AsilLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase();
        let key = key.strip_prefix("ASIL").map(str::trim).unwrap_or(&key);
        match key {
            "QM" => Ok(AsilLevel::Qm),
            "A" => Ok(AsilLevel::AsilA),
            "B" => Ok(AsilLevel::AsilB),
            "C" => Ok(AsilLevel::AsilC),
            "D" => Ok(AsilLevel::AsilD),
            _ => Err(format!("unknown ASIL grade '{s}'")),
        }
    }
}

// ─── Determination table ───────────────────────────────────────────────

use AsilLevel::{AsilA as A, AsilB as B, AsilC as C, AsilD as D, Qm as QM};

/// Fixed determination table: (S, E) → grade for C0..C3.
///
/// ```text
///  S,E   │ C0 │ C1 │ C2 │ C3
/// ───────┼────┼────┼────┼────
///  S1,E1 │ QM │ QM │ QM │ QM
///  S1,E2 │ QM │ QM │ QM │ QM
///  S1,E3 │ QM │ QM │ QM │ A
///  S1,E4 │ QM │ QM │ A  │ B
///  S2,E1 │ QM │ QM │ QM │ QM
///  S2,E2 │ QM │ QM │ QM │ A
///  S2,E3 │ QM │ QM │ A  │ B
///  S2,E4 │ A  │ A  │ B  │ C
///  S3,E1 │ QM │ QM │ A  │ B
///  S3,E2 │ QM │ QM │ B  │ C
///  S3,E3 │ A  │ A  │ B  │ C
///  S3,E4 │ B  │ B  │ C  │ D
/// ```
///
/// There is no S0 row: severity 0 has no entry and determines nothing.
pub const DETERMINATION_TABLE: [((u8, u8), [AsilLevel; 4]); 12] = [
    ((1, 1), [QM, QM, QM, QM]),
    ((1, 2), [QM, QM, QM, QM]),
    ((1, 3), [QM, QM, QM, A]),
    ((1, 4), [QM, QM, A, B]),
    ((2, 1), [QM, QM, QM, QM]),
    ((2, 2), [QM, QM, QM, A]),
    ((2, 3), [QM, QM, A, B]),
    ((2, 4), [A, A, B, C]),
    ((3, 1), [QM, QM, A, B]),
    ((3, 2), [QM, QM, B, C]),
    ((3, 3), [A, A, B, C]),
    ((3, 4), [B, B, C, D]),
];

/// Per-controllability grades for a (severity, exposure) pair.
pub fn lookup(severity: u8, exposure: u8) -> Option<&'static [AsilLevel; 4]> {
    DETERMINATION_TABLE
        .iter()
        .find(|(key, _)| *key == (severity, exposure))
        .map(|(_, grades)| grades)
}

/// Clamp any exposure value into E1..E4. Never fails.
pub fn clamp_exposure(exposure: i64) -> u8 {
    exposure.clamp(MIN_EXPOSURE as i64, MAX_EXPOSURE as i64) as u8
}

/// Strict severity / controllability validation: an integer in 0..=3, or
/// nothing. Out-of-range values are dropped, never clamped.
pub fn validate_rating(cell: &Cell) -> Option<u8> {
    cell.parse_int()
        .filter(|v| (0..=MAX_RATING as i64).contains(v))
        .map(|v| v as u8)
}

/// Determine the ASIL for one row.
///
/// Returns `None` when severity or controllability is missing or invalid,
/// and for severity 0 (no table entry). Exposure is clamped and so never
/// blocks a lookup.
pub fn determine(
    exposure: i64,
    severity: Option<u8>,
    controllability: Option<u8>,
) -> Option<AsilLevel> {
    let (severity, controllability) = (severity?, controllability?);
    let exposure = clamp_exposure(exposure);
    if severity > MAX_RATING || controllability > MAX_RATING {
        return None;
    }
    lookup(severity, exposure).map(|grades| grades[controllability as usize])
}

// ─── Distribution ──────────────────────────────────────────────────────

/// Count of determined grades, ordered QM → D.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsilDistribution {
    counts: BTreeMap<AsilLevel, usize>,
}

impl AsilDistribution {
    pub fn from_grades<I>(grades: I) -> Self
    where
        I: IntoIterator<Item = Option<AsilLevel>>,
    {
        let mut counts = BTreeMap::new();
        for grade in grades.into_iter().flatten() {
            *counts.entry(grade).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, level: AsilLevel) -> usize {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AsilLevel, usize)> + '_ {
        self.counts.iter().map(|(k, v)| (*k, *v))
    }
}

impl fmt::Display for AsilDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_entries() {
        assert_eq!(determine(4, Some(3), Some(2)), Some(AsilLevel::AsilC));
        assert_eq!(determine(1, Some(1), Some(0)), Some(AsilLevel::Qm));
        assert_eq!(determine(3, Some(3), Some(3)), Some(AsilLevel::AsilC));
        assert_eq!(determine(4, Some(3), Some(3)), Some(AsilLevel::AsilD));
        assert_eq!(determine(3, Some(2), Some(2)), Some(AsilLevel::AsilA));
        assert_eq!(determine(4, Some(2), Some(0)), Some(AsilLevel::AsilA));
    }

    #[test]
    fn every_table_cell_is_reachable() {
        for ((s, e), grades) in DETERMINATION_TABLE {
            for (c, grade) in grades.iter().enumerate() {
                assert_eq!(determine(e as i64, Some(s), Some(c as u8)), Some(*grade));
            }
        }
    }

    #[test]
    fn table_covers_all_nonzero_severities_and_exposures() {
        for s in 1..=3 {
            for e in 1..=4 {
                assert!(lookup(s, e).is_some(), "missing S{s},E{e}");
            }
        }
    }

    #[test]
    fn missing_severity_or_controllability_yields_nothing() {
        for e in -2..7 {
            for v in 0..=3 {
                assert_eq!(determine(e, None, Some(v)), None);
                assert_eq!(determine(e, Some(v), None), None);
            }
        }
    }

    #[test]
    fn severity_zero_has_no_table_entry() {
        for e in 1..=4 {
            for c in 0..=3 {
                assert_eq!(determine(e, Some(0), Some(c)), None);
            }
        }
    }

    #[test]
    fn out_of_range_ratings_are_rejected() {
        assert_eq!(determine(4, Some(4), Some(1)), None);
        assert_eq!(determine(4, Some(1), Some(7)), None);
    }

    #[test]
    fn exposure_clamps() {
        assert_eq!(determine(0, Some(1), Some(1)), determine(1, Some(1), Some(1)));
        assert_eq!(determine(99, Some(1), Some(1)), determine(4, Some(1), Some(1)));
        assert_eq!(determine(-5, Some(3), Some(3)), Some(AsilLevel::AsilB));
        assert_eq!(clamp_exposure(i64::MIN), 1);
        assert_eq!(clamp_exposure(i64::MAX), 4);
    }

    #[test]
    fn rating_validation_drops_instead_of_clamping() {
        assert_eq!(validate_rating(&Cell::Number(2.0)), Some(2));
        assert_eq!(validate_rating(&Cell::text("0")), Some(0));
        assert_eq!(validate_rating(&Cell::Number(4.0)), None);
        assert_eq!(validate_rating(&Cell::Number(-1.0)), None);
        assert_eq!(validate_rating(&Cell::text("S2")), None);
        assert_eq!(validate_rating(&Cell::Empty), None);
    }

    #[test]
    fn asil_ordering_and_display() {
        assert!(AsilLevel::Qm < AsilLevel::AsilA);
        assert!(AsilLevel::AsilD > AsilLevel::AsilC);
        assert_eq!(AsilLevel::Qm.to_string(), "QM");
        assert_eq!(AsilLevel::AsilB.to_string(), "B");
        assert_eq!(AsilLevel::AsilB.long_name(), "ASIL B");
        assert_eq!("asil c".parse::<AsilLevel>(), Ok(AsilLevel::AsilC));
        assert_eq!("qm".parse::<AsilLevel>(), Ok(AsilLevel::Qm));
        assert!("E".parse::<AsilLevel>().is_err());
    }

    #[test]
    fn distribution_counts_in_grade_order() {
        let dist = AsilDistribution::from_grades([
            Some(AsilLevel::AsilB),
            None,
            Some(AsilLevel::Qm),
            Some(AsilLevel::AsilB),
        ]);
        assert_eq!(dist.total(), 3);
        assert_eq!(dist.count(AsilLevel::AsilB), 2);
        assert_eq!(dist.to_string(), "QM=1, B=2");
        assert!(AsilDistribution::default().is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any exposure behaves exactly like its clamped value.
        #[test]
        fn exposure_is_clamped_before_lookup(e in any::<i64>(), s in 0u8..=3, c in 0u8..=3) {
            let clamped = clamp_exposure(e) as i64;
            prop_assert_eq!(determine(e, Some(s), Some(c)), determine(clamped, Some(s), Some(c)));
        }

        /// A higher controllability class never lowers the grade.
        #[test]
        fn grade_is_monotonic_in_controllability(e in 1i64..=4, s in 1u8..=3, c in 0u8..3) {
            let lower = determine(e, Some(s), Some(c));
            let higher = determine(e, Some(s), Some(c + 1));
            prop_assert!(lower <= higher);
        }
    }
}
