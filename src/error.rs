use thiserror::Error;

/// Rejections the report engine can raise on its own. Everything else
/// (store failures, IO) passes through unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("invalid period: {reason}")]
    InvalidPeriod { reason: String },

    #[error("unknown audience: {value} (expected exec, it or users)")]
    UnknownAudience { value: String },
}

impl ReportError {
    pub fn invalid_period(reason: impl Into<String>) -> Self {
        ReportError::InvalidPeriod {
            reason: reason.into(),
        }
    }
}
