use std::sync::Arc;

use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;
use crate::mail::{
    is_valid_address, parse_recipients, sanitize_body, sanitize_subject, OutgoingMessage,
    SenderCredentials, TransportFactory,
};
use crate::quota::{QuotaError, QuotaTracker};

use super::error::SendRequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    pub subject_max_chars: usize,
    pub body_max_chars: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub sender_name: Option<String>,
    pub sender: Option<String>,
    pub secret: Option<String>,
    pub recipients: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub attempted: usize,
    pub sent: usize,
    pub used: u64,
    pub limit: u64,
}

struct RequiredFields<'a> {
    sender: &'a str,
    secret: &'a str,
    recipients: &'a str,
    subject: &'a str,
    body: &'a str,
}

impl SendRequest {
    fn required(&self) -> Result<RequiredFields<'_>, SendRequestError> {
        // Whitespace-only values count as absent.
        fn present(field: &Option<String>) -> Result<&str, SendRequestError> {
            field
                .as_deref()
                .filter(|value| !value.trim().is_empty())
                .ok_or(SendRequestError::MissingFields)
        }

        Ok(RequiredFields {
            sender: present(&self.sender)?,
            secret: present(&self.secret)?,
            recipients: present(&self.recipients)?,
            subject: present(&self.subject)?,
            body: present(&self.body)?,
        })
    }
}

/// Runs one bulk send: validation, quota reservation, relay login, dispatch
/// and quota commit.
pub struct RelayService {
    quota: QuotaTracker,
    dispatcher: Dispatcher,
    transports: Arc<dyn TransportFactory>,
    limits: ContentLimits,
}

impl RelayService {
    pub fn new(
        quota: QuotaTracker,
        dispatcher: Dispatcher,
        transports: Arc<dyn TransportFactory>,
        limits: ContentLimits,
    ) -> Self {
        Self {
            quota,
            dispatcher,
            transports,
            limits,
        }
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub async fn send(&self, request: &SendRequest) -> Result<SendOutcome, SendRequestError> {
        let fields = request.required()?;
        let identity = fields.sender;
        let limit = self.quota.cap();

        if !is_valid_address(identity) {
            return Err(SendRequestError::InvalidSenderAddress);
        }

        if self.quota.is_exhausted(identity) {
            info!(identity, limit, "sender quota exhausted");
            return Err(SendRequestError::QuotaExhausted { limit });
        }

        let recipients = parse_recipients(fields.recipients);
        if recipients.is_empty() {
            return Err(SendRequestError::NoValidRecipients);
        }

        let requested = recipients.len() as u64;
        let reservation = match self.quota.reserve(identity, requested) {
            Ok(reservation) => reservation,
            Err(QuotaError::LimitExceeded { used, .. }) if used >= limit => {
                return Err(SendRequestError::QuotaExhausted { limit });
            }
            Err(QuotaError::LimitExceeded { .. }) => {
                return Err(SendRequestError::QuotaExceeded { remaining: 0 });
            }
        };

        if reservation.granted() < requested {
            let remaining = reservation.granted();
            reservation.release();
            info!(identity, requested, remaining, "recipient count exceeds remaining quota");
            return Err(SendRequestError::QuotaExceeded { remaining });
        }

        let credentials = SenderCredentials::new(identity, fields.secret);
        let transport = match self.transports.connect(&credentials) {
            Ok(transport) => transport,
            Err(err) => {
                warn!(identity, error = %err, "failed to set up relay transport");
                return Err(SendRequestError::AuthenticationFailed);
            }
        };

        if let Err(err) = transport.verify().await {
            warn!(identity, error = %err, "relay rejected sender credentials");
            return Err(SendRequestError::AuthenticationFailed);
        }

        let display_name = request
            .sender_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(identity);
        let subject = sanitize_subject(fields.subject, self.limits.subject_max_chars);
        let body = sanitize_body(fields.body, self.limits.body_max_chars);

        let messages: Vec<OutgoingMessage> = recipients
            .into_iter()
            .map(|to| OutgoingMessage::new(display_name, identity, to, &subject, &body))
            .collect();

        // Detached so a dropped request cannot cut a send short. Each send is
        // committed to the quota as soon as the relay confirms it.
        let dispatcher = self.dispatcher.clone();
        let dispatch = tokio::spawn(async move {
            let result = dispatcher
                .dispatch(transport.as_ref(), &messages, &reservation)
                .await;
            let used = reservation.finish();
            (result, used)
        });
        let (result, used) = dispatch.await.map_err(|err| {
            error!(identity, error = %err, "dispatch task ended abnormally");
            SendRequestError::DispatchInterrupted
        })?;

        info!(
            identity,
            requested,
            attempted = result.attempted,
            sent = result.sent,
            used,
            limit,
            "bulk send completed"
        );

        Ok(SendOutcome {
            attempted: result.attempted,
            sent: result.sent,
            used,
            limit,
        })
    }
}
