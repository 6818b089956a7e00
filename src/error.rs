//! Unified error hierarchy for the overlay engine
//!
//! Loader-level failures are returned as typed results, never raised as
//! uncaught faults. `NotFound` and `NoDataForRange` are valid empty results
//! for the UI, not error states.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::Metric;

/// Top-level error type for all engine operations
#[derive(Debug, Error)]
pub enum VitalError {
    /// Transport or server failure on a series/overlay load; recoverable
    /// by retry, last-good state should be left untouched
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// No record at the queried instant or date
    #[error("No {metric} record at {instant}")]
    NotFound { metric: Metric, instant: String },

    /// The requested day holds zero samples
    #[error("No {metric} samples on {date}")]
    NoDataForRange { metric: Metric, date: NaiveDate },

    /// Window bounds rejected before any load was attempted
    #[error("Invalid window: {from} must precede {to}")]
    InvalidWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, VitalError>;

impl From<reqwest::Error> for VitalError {
    fn from(err: reqwest::Error) -> Self {
        VitalError::DataUnavailable(err.to_string())
    }
}

impl VitalError {
    /// Check if the operation is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, VitalError::DataUnavailable(_))
    }

    /// True for the "valid empty result" half of the taxonomy; callers
    /// render a placeholder state for these, not an error banner
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            VitalError::NotFound { .. } | VitalError::NoDataForRange { .. }
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            VitalError::DataUnavailable(msg) => {
                format!("Could not reach the measurement service: {}", msg)
            }
            VitalError::NotFound { metric, instant } => {
                format!("No {} measurement recorded at {}", metric, instant)
            }
            VitalError::NoDataForRange { metric, date } => {
                format!("No {} measurements recorded on {}", metric, date)
            }
            VitalError::InvalidWindow { .. } => {
                "The start of the window must be earlier than its end".to_string()
            }
            VitalError::Configuration(msg) => format!("Configuration problem: {}", msg),
        }
    }
}
