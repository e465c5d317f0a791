//! Error types for salesboard-core
//!
//! Provides the error hierarchy with thiserror plus a load report for
//! graceful degradation during snapshot ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for salesboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot not found: {path}")]
    SnapshotNotFound { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown period '{input}' (expected one of: {expected})")]
    UnknownPeriod { input: String, expected: String },

    // ===================
    // Data Errors
    // ===================
    #[error("No valid dates in table")]
    NoData,

    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<&'static str> },

    // ===================
    // Watch Errors
    // ===================
    #[error("File watcher error: {message}")]
    WatchError {
        message: String,
        #[source]
        source: Option<notify::Error>,
    },
}

/// Severity level for errors during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, can continue with degraded functionality
    Warning,
    /// Snapshot could not be loaded
    Error,
}

/// Individual error entry in load report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, suggestion) = match error {
            CoreError::SnapshotNotFound { path } => (
                format!("Snapshot not found: {}", path.display()),
                Some("Run the cleaning step first or pass --data <path>".to_string()),
            ),
            CoreError::FileRead { path, .. } => (
                format!("Cannot read file: {}", path.display()),
                Some(format!("Check permissions: chmod +r {}", path.display())),
            ),
            CoreError::JsonParse { path, message, .. } => (
                format!("Invalid JSON in {}: {}", path.display(), message),
                Some("Validate JSON syntax with: jq . <file>".to_string()),
            ),
            CoreError::NoData => (
                "Table has no valid dates".to_string(),
                Some("Make sure the upload has a 'Date' column in ISO format".to_string()),
            ),
            _ => (error.to_string(), None),
        };

        Self {
            source,
            message,
            severity: ErrorSeverity::Error,
            suggestion,
        }
    }
}

/// Report of problems encountered while loading a snapshot
///
/// Malformed cells are coerced, not rejected; the report records how many
/// were coerced so callers can surface a warning.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub snapshot_loaded: bool,
    pub rows_loaded: usize,
    pub invalid_dates: usize,
    pub coerced_numbers: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }
}

/// Degraded state indicator for the table store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedState {
    /// Current snapshot loaded cleanly
    Healthy,
    /// Snapshot loaded but some cells were coerced
    PartialData { reason: String },
    /// Latest reload failed; previous table still served
    Stale { reason: String },
}

impl DegradedState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, DegradedState::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        !self.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_report_warnings_only() {
        let mut report = LoadReport::new();
        report.add_warning("snapshot", "3 rows with invalid dates");
        report.add_error(LoadError::from_core_error("snapshot", &CoreError::NoData));

        assert!(report.has_errors());
        let warnings: Vec<&str> = report.warnings().map(|w| w.message.as_str()).collect();
        assert_eq!(warnings, vec!["3 rows with invalid dates"]);
    }

    #[test]
    fn test_missing_columns_message() {
        let err = CoreError::MissingColumns {
            missing: vec!["Item", "Quantity"],
        };
        assert_eq!(err.to_string(), "Missing required columns: Item, Quantity");
    }

    #[test]
    fn test_suggestion_for_missing_snapshot() {
        let err = CoreError::SnapshotNotFound {
            path: PathBuf::from("static/data.json"),
        };
        let load_error = LoadError::from_core_error("snapshot", &err);
        assert_eq!(load_error.message, "Snapshot not found: static/data.json");
        assert_eq!(
            load_error.suggestion.as_deref(),
            Some("Run the cleaning step first or pass --data <path>")
        );
        assert_eq!(load_error.severity, ErrorSeverity::Error);
    }
}
