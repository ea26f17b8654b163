use std::fmt;

/// One message addressed to exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from_display_name: String,
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub reply_to: String,
}

impl OutgoingMessage {
    /// Builds the message for `to_address`. Replies go back to the sender.
    pub fn new(
        from_display_name: &str,
        from_address: &str,
        to_address: impl Into<String>,
        subject: &str,
        body: &str,
    ) -> Self {
        Self {
            from_display_name: from_display_name.to_string(),
            from_address: from_address.to_string(),
            to_address: to_address.into(),
            subject: subject.to_string(),
            body: body.to_string(),
            reply_to: from_address.to_string(),
        }
    }
}

/// Account credentials supplied with a send request.
#[derive(Clone)]
pub struct SenderCredentials {
    pub identity: String,
    pub secret: String,
}

impl SenderCredentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for SenderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}
