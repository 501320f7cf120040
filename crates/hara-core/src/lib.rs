//! Hazard Analysis and Risk Assessment (HARA) automation.
//!
//! Matches Operating Scenario rows against a Risk Assessment sheet and
//! determines the ISO 26262 ASIL for each scenario from its E/S/C ratings.

pub mod asil;
pub mod column;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod extract;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod result;
pub mod sheet;
pub mod similarity;
pub mod telemetry;
