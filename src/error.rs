//! Error taxonomy for downloading and analysing kline data

use thiserror::Error;

use crate::planner::TimeWindow;

/// Errors raised by the library.
///
/// Input validation (`InvalidRange`, `UnsupportedInterval`, `InvalidParameter`)
/// is reported before any network or numeric work starts. Fetch errors abort
/// the whole download. `MissingColumns` and `EmptySeries` are turned into a
/// failed [`crate::analysis::Analysis`] by the analyzer instead of being
/// propagated.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    #[error("unsupported interval '{0}' (supported: {supported})", supported = crate::interval::SUPPORTED_INTERVALS.join(", "))]
    UnsupportedInterval(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("request failed{}: {reason}", .window.map(|w| format!(" for window {w}")).unwrap_or_default())]
    TransientFetch {
        window: Option<TimeWindow>,
        reason: String,
    },

    #[error("unexpected response from exchange: {0}")]
    MalformedResponse(String),

    #[error("series is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("series has {rows} rows, at least {required} required")]
    EmptySeries { rows: usize, required: usize },

    #[error("invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a fetch error for a failed request, keeping the window it targeted.
    pub fn fetch(window: Option<TimeWindow>, reason: impl std::fmt::Display) -> Self {
        Error::TransientFetch {
            window,
            reason: reason.to_string(),
        }
    }

    /// Attach the request window to a fetch error that lacks one
    pub fn for_window(self, window: TimeWindow) -> Self {
        match self {
            Error::TransientFetch { window: None, reason } => Error::TransientFetch {
                window: Some(window),
                reason,
            },
            other => other,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
