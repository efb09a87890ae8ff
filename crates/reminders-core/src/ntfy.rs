//! Push delivery through an ntfy server.

use crate::dispatch::Dispatcher;
use crate::error::{ReminderError, Result};
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "https://ntfy.sh";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct NtfyDispatcher {
    url: String,
    client: reqwest::blocking::Client,
}

impl NtfyDispatcher {
    /// `channel` is either a bare topic (published on ntfy.sh) or, if it
    /// contains `http`, the full URL to post to.
    pub fn new(channel: &str) -> Result<Self> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(ReminderError::MissingChannel);
        }
        let url = if channel.contains("http") {
            channel.to_string()
        } else {
            format!("{DEFAULT_SERVER}/{channel}")
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReminderError::Dispatch(e.to_string()))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Dispatcher for NtfyDispatcher {
    fn send(&self, title: &str, body: &str, scheduled_at: Option<i64>) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .header("Title", title)
            .body(body.as_bytes().to_vec());
        if let Some(at) = scheduled_at {
            req = req.header("At", at.to_string());
        }

        let resp = req
            .send()
            .map_err(|e| ReminderError::Dispatch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(ReminderError::Dispatch(format!(
                "{} returned {status}: {}",
                self.url,
                text.trim()
            )));
        }
        tracing::debug!(url = %self.url, title, "notification sent");
        Ok(())
    }
}
