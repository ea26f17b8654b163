use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::address::Address;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::error::TransportError;
use super::message::{OutgoingMessage, SenderCredentials};

/// A connection to the provider's relay scoped to one sender account.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Checks connectivity and that the relay accepts the credentials.
    async fn verify(&self) -> Result<(), TransportError>;

    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError>;
}

/// Builds a [`MailTransport`] for the credentials supplied with a request.
pub trait TransportFactory: Send + Sync {
    fn connect(
        &self,
        credentials: &SenderCredentials,
    ) -> Result<Arc<dyn MailTransport>, TransportError>;
}

pub struct SmtpTransportFactory {
    relay: String,
    timeout: Duration,
}

impl SmtpTransportFactory {
    pub fn new(relay: impl Into<String>, timeout: Duration) -> Self {
        Self {
            relay: relay.into(),
            timeout,
        }
    }
}

impl TransportFactory for SmtpTransportFactory {
    fn connect(
        &self,
        credentials: &SenderCredentials,
    ) -> Result<Arc<dyn MailTransport>, TransportError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.relay)
            .map_err(|err| TransportError::Setup(err.to_string()))?
            .credentials(Credentials::new(
                credentials.identity.clone(),
                credentials.secret.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        debug!(relay = %self.relay, identity = %credentials.identity, "built smtp transport");
        Ok(Arc::new(SmtpMailTransport { transport }))
    }
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn verify(&self) -> Result<(), TransportError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransportError::Authentication(
                "relay rejected the connection".to_string(),
            )),
            Err(err) => Err(TransportError::Authentication(err.to_string())),
        }
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let email = build_email(message)?;
        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|err| TransportError::Send(err.to_string()))
    }
}

fn build_email(message: &OutgoingMessage) -> Result<Message, TransportError> {
    let from = Mailbox::new(
        Some(message.from_display_name.clone()),
        parse_address(&message.from_address)?,
    );
    let reply_to = Mailbox::new(None, parse_address(&message.reply_to)?);
    let to = Mailbox::new(None, parse_address(&message.to_address)?);

    Message::builder()
        .from(from)
        .reply_to(reply_to)
        .to(to)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|err| TransportError::Build(err.to_string()))
}

fn parse_address(address: &str) -> Result<Address, TransportError> {
    address
        .parse::<Address>()
        .map_err(|err| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })
}
