pub mod error;
pub mod record;
pub mod tracker;

pub use error::QuotaError;
pub use record::{UsageRecord, UsageSnapshot};
pub use tracker::{QuotaReservation, QuotaTracker};

/// Per-sender ceiling imposed by the webmail provider for one epoch.
pub const DEFAULT_SENDER_CAP: u64 = 28;
pub const DEFAULT_RESET_INTERVAL_SECS: u64 = 24 * 60 * 60;
