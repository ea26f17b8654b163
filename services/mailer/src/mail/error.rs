use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("relay setup failed: {0}")]
    Setup(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("send failed: {0}")]
    Send(String),
}
