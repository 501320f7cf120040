//! Error taxonomy for a pipeline run.
//!
//! Per-cell parse problems never show up here: exposure falls back to its
//! default and severity/controllability collapse to the empty marker. What
//! remains are the conditions that abort a whole run.

/// Errors that abort a pipeline run or a workbook operation.
#[derive(Debug, thiserror::Error)]
pub enum HaraError {
    /// A mandatory column could not be resolved on a sheet.
    #[error("{column} column not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    /// Invalid matching or output configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The requested sheet does not exist in the workbook.
    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    /// Operating Scenario and Risk Assessment selections name the same sheet.
    #[error("Operating Scenario and Risk Assessment sheets must differ (both are '{0}')")]
    SameSheet(String),

    /// Reading or writing a workbook failed.
    #[error("workbook error: {0}")]
    Workbook(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything unexpected caught at the orchestration boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HaraError {
    /// Whether this error belongs to the configuration class (raised before
    /// any matching takes place).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HaraError::MissingColumn { .. }
                | HaraError::Config(_)
                | HaraError::SheetNotFound(_)
                | HaraError::SameSheet(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_names_the_requirement() {
        let err = HaraError::MissingColumn {
            sheet: "OS".into(),
            column: "Operating Scenario".into(),
        };
        assert_eq!(
            err.to_string(),
            "Operating Scenario column not found in sheet 'OS'"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn io_is_not_configuration() {
        let err = HaraError::from(std::io::Error::other("locked"));
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "locked");
    }
}
