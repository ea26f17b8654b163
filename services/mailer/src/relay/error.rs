use thiserror::Error;

/// Terminal outcomes of a send request. The display text is what the caller
/// sees in the `msg` field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendRequestError {
    #[error("Missing fields")]
    MissingFields,

    #[error("Invalid Gmail")]
    InvalidSenderAddress,

    #[error("{limit} email limit reached")]
    QuotaExhausted { limit: u64 },

    #[error("No valid recipients")]
    NoValidRecipients,

    #[error("Only {remaining} emails allowed")]
    QuotaExceeded { remaining: u64 },

    #[error("Gmail login failed")]
    AuthenticationFailed,

    #[error("Sending was interrupted")]
    DispatchInterrupted,
}

impl SendRequestError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::InvalidSenderAddress => "invalid_sender_address",
            Self::QuotaExhausted { .. } | Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::NoValidRecipients => "no_valid_recipients",
            Self::AuthenticationFailed => "authentication_failed",
            Self::DispatchInterrupted => "dispatch_interrupted",
        }
    }
}
