pub mod api;
pub mod config;
pub mod dispatch;
pub mod mail;
pub mod quota;
pub mod relay;

pub use api::{create_router, ApiState, SendMailRequest, SendMailResponse};
pub use config::MailerConfig;
pub use dispatch::{DispatchPolicy, DispatchResult, Dispatcher, SendLedger};
pub use mail::{MailTransport, OutgoingMessage, SenderCredentials, TransportError, TransportFactory};
pub use quota::{QuotaError, QuotaReservation, QuotaTracker};
pub use relay::{RelayService, SendRequest, SendRequestError};
