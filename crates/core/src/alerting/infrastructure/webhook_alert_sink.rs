use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::alerting::domain::alert_sink::AlertSink;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to encode alert payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("webhook request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("webhook {url} answered with status {status}")]
    Status { url: String, status: u16 },
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts alerts as `{"text": "..."}` JSON, the format Slack-style incoming
/// webhooks and most chat bridges accept.
pub struct WebhookAlertSink {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WebhookError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, message: &str) -> Result<(), WebhookError> {
        let body = payload(message)?;
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| WebhookError::Request {
                url: self.url.clone(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

fn payload(message: &str) -> Result<String, WebhookError> {
    Ok(serde_json::to_string(&WebhookPayload { text: message })?)
}

impl AlertSink for WebhookAlertSink {
    fn notify(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.post(message)?;
        Ok(())
    }
}
