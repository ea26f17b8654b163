pub mod error;
pub mod service;

pub use error::SendRequestError;
pub use service::{ContentLimits, RelayService, SendOutcome, SendRequest};
