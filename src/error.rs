use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Invalid month label '{0}': expected 'MonthName YYYY'")]
    InvalidMonthLabel(String),

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Invalid week index {0}: must be between 1 and 5")]
    InvalidWeek(u8),

    #[error("Week {week} of {month}/{year} is locked for this edit")]
    WeekLocked { week: u8, month: u32, year: i32 },

    #[error("Projection for client '{client_code}' has no id; cannot {action} it")]
    MissingProjectionId {
        client_code: String,
        action: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportingError>;
