pub mod dispatcher;
pub mod ledger;
pub mod policy;

pub use dispatcher::{DispatchResult, Dispatcher};
pub use ledger::SendLedger;
pub use policy::{DispatchPolicy, DispatchPolicyKind};

pub const DEFAULT_SEND_DELAY_MS: u64 = 150;
pub const DEFAULT_SEND_JITTER_MS: u64 = 50;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 1_000;
