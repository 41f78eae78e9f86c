use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid date in field '{field}': {value:?}")]
    DateFormat { field: String, value: String },

    #[error("No {series} row found for date {date}")]
    MissingBaseline { series: String, date: String },

    #[error("Total mismatch on {date}: computed {computed} != reported {reported}")]
    TotalsMismatch {
        date: String,
        computed: f64,
        reported: f64,
    },

    #[error("Invalid report period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// User-facing message returned by a fetch or export collaborator.
    #[error("{0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ReportError {
    /// Message for the notification collaborator: the remote's own text when
    /// it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ReportError::Remote(message) if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
