//! Notification delivery.
//!
//! DingTalk robots with signing enabled require every request to carry a
//! `timestamp` (milliseconds) and a `sign` query parameter, where `sign` is
//! the base64 HMAC-SHA256 of `"{timestamp}\n{secret}"` keyed by the secret.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use natmgr_common::{NatMgrError, NatMgrResult};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::config::ChannelConfig;

type HmacSha256 = Hmac<Sha256>;

/// Per-request delivery timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends a titled markdown message to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &ChannelConfig, title: &str, body: &str) -> NatMgrResult<()>;
}

#[derive(Debug, Deserialize)]
struct RobotResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Posts to DingTalk custom robot webhooks.
pub struct DingTalkNotifier {
    client: reqwest::Client,
}

impl DingTalkNotifier {
    pub fn new() -> NatMgrResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NatMgrError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

/// Computes the `sign` parameter for a millisecond timestamp.
pub fn sign(timestamp_ms: i64, secret: &str) -> NatMgrResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NatMgrError::internal(format!("invalid signing key: {e}")))?;
    mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// JSON payload of a markdown robot message.
pub fn markdown_payload(title: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "msgtype": "markdown",
        "markdown": {
            "title": title,
            "text": body,
        },
        "at": {
            "atMobiles": [],
            "isAtAll": false,
        },
    })
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    #[instrument(skip(self, channel, body), fields(channel = %channel.name))]
    async fn send(&self, channel: &ChannelConfig, title: &str, body: &str) -> NatMgrResult<()> {
        let timestamp = Utc::now().timestamp_millis();
        let signature = sign(timestamp, &channel.secret)?;

        let response = self
            .client
            .post(&channel.webhook)
            .query(&[("timestamp", timestamp.to_string()), ("sign", signature)])
            .json(&markdown_payload(title, body))
            .send()
            .await
            .map_err(|e| NatMgrError::delivery(&channel.name, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NatMgrError::delivery(
                &channel.name,
                format!("HTTP status {status}"),
            ));
        }

        let result: RobotResponse = response
            .json()
            .await
            .map_err(|e| NatMgrError::delivery(&channel.name, format!("invalid response: {e}")))?;
        if result.errcode != 0 {
            return Err(NatMgrError::delivery(
                &channel.name,
                format!("errcode {}: {}", result.errcode, result.errmsg),
            ));
        }

        debug!("Notification delivered");
        Ok(())
    }
}
