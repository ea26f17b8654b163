use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuotaError {
    #[error("quota exhausted for sender {identity}: limit={limit}, used={used}")]
    LimitExceeded {
        identity: String,
        limit: u64,
        used: u64,
    },
}
