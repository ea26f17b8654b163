pub mod error;
pub mod message;
pub mod transport;
pub mod validation;

pub use error::TransportError;
pub use message::{OutgoingMessage, SenderCredentials};
pub use transport::{MailTransport, SmtpMailTransport, SmtpTransportFactory, TransportFactory};
pub use validation::{is_valid_address, parse_recipients, sanitize_body, sanitize_subject};

pub const DEFAULT_SMTP_RELAY: &str = "smtp.gmail.com";
pub const DEFAULT_SUBJECT_MAX_CHARS: usize = 200;
pub const DEFAULT_BODY_MAX_CHARS: usize = 10_000;
