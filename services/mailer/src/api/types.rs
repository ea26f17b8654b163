use serde::{Deserialize, Serialize};

use crate::relay::{SendOutcome, SendRequest, SendRequestError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMailRequest {
    #[serde(rename = "senderName")]
    pub sender_name: Option<String>,
    pub gmail: Option<String>,
    pub apppass: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl From<SendMailRequest> for SendRequest {
    fn from(request: SendMailRequest) -> Self {
        Self {
            sender_name: request.sender_name,
            sender: request.gmail,
            secret: request.apppass,
            recipients: request.to,
            subject: request.subject,
            body: request.message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMailResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl From<SendOutcome> for SendMailResponse {
    fn from(outcome: SendOutcome) -> Self {
        Self {
            success: true,
            sent: Some(outcome.sent as u64),
            used: Some(outcome.used),
            limit: Some(outcome.limit),
            msg: None,
        }
    }
}

impl From<SendRequestError> for SendMailResponse {
    fn from(err: SendRequestError) -> Self {
        Self {
            success: false,
            msg: Some(err.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_accepts_partial_bodies() {
        let request: SendMailRequest =
            serde_json::from_value(json!({ "gmail": "a@gmail.com", "senderName": "Alice" }))
                .expect("partial body should deserialize");

        assert_eq!(request.gmail.as_deref(), Some("a@gmail.com"));
        assert_eq!(request.sender_name.as_deref(), Some("Alice"));
        assert!(request.apppass.is_none());
    }

    #[test]
    fn failure_response_only_carries_message() {
        let response = SendMailResponse::from(SendRequestError::QuotaExhausted { limit: 28 });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": false, "msg": "28 email limit reached" })
        );
    }

    #[test]
    fn success_response_reports_usage() {
        let response = SendMailResponse::from(SendOutcome {
            attempted: 3,
            sent: 2,
            used: 7,
            limit: 28,
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": true, "sent": 2, "used": 7, "limit": 28 })
        );
    }
}
