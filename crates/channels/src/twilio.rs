//! Twilio Programmable Messaging client.

use crate::segments::calculate_segments;
use crate::sender::SmsSender;
use async_trait::async_trait;
use bulksms_core::config::SmsConfig;
use bulksms_core::{BulkSmsError, BulkSmsResult, SendError, SendReceipt};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Twilio error codes that mean the destination itself is unusable.
const INVALID_ADDRESS_CODES: &[u64] = &[21211, 21214, 21610, 21612, 21614];

/// Sends through `POST /2010-04-01/Accounts/{sid}/Messages.json`.
pub struct TwilioSmsSender {
    client: reqwest::Client,
    config: SmsConfig,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    num_segments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

impl TwilioSmsSender {
    /// `timeout` bounds the whole HTTP exchange for one message.
    pub fn new(config: SmsConfig, timeout: Duration) -> BulkSmsResult<Self> {
        config.validate().map_err(BulkSmsError::InputValidation)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BulkSmsError::Internal(e.into()))?;
        let endpoint = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base_url.trim_end_matches('/'),
            config.account_sid
        );

        info!(
            account_sid = %config.account_sid,
            from = %config.from_number,
            "Twilio SMS provider initialized"
        );
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn form<'a>(&'a self, to: &'a str, body: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("To", to), ("Body", body)];
        match &self.config.messaging_service_sid {
            Some(sid) => form.push(("MessagingServiceSid", sid.as_str())),
            None => form.push(("From", self.config.from_number.as_str())),
        }
        if let Some(callback) = &self.config.status_callback_url {
            form.push(("StatusCallback", callback.as_str()));
        }
        form
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send(&self, to: &str, body: &str) -> Result<SendReceipt, SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.form(to, body))
            .send()
            .await
            .map_err(|e| SendError::Transient(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SendError::Transient(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        let message: TwilioMessage = serde_json::from_str(&text)
            .map_err(|e| SendError::Transient(format!("unreadable provider response: {e}")))?;
        let segments = message
            .num_segments
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| calculate_segments(body));

        debug!(to = %to, sid = %message.sid, segments, "Twilio accepted message");
        Ok(SendReceipt {
            provider_id: message.sid,
            to: to.to_string(),
            segments,
            status: message.status.unwrap_or_else(|| "queued".to_string()),
        })
    }
}

/// Map a non-2xx Twilio response onto the send error taxonomy.
pub fn classify_error(status: u16, body: &str) -> SendError {
    let parsed: Option<TwilioErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("HTTP {status}"));

    if status == 429 || status >= 500 {
        return SendError::Transient(message);
    }
    match code {
        Some(code) if INVALID_ADDRESS_CODES.contains(&code) => SendError::InvalidAddress(message),
        Some(code) => SendError::Rejected {
            code: code.to_string(),
            message,
        },
        None => SendError::Rejected {
            code: status.to_string(),
            message,
        },
    }
}
