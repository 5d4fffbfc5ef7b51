//! Web Push sender (RFC 8030 / RFC 8291 / RFC 8292).
//!
//! The `web-push` crate encrypts the payload and signs the VAPID JWT; the
//! HTTP request itself goes out through a shared `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

use crate::config::PushConfig;
use crate::domain::push::{PushNotification, PushSubscription};
use crate::ports::{DeliveryError, PushSender};

/// Errors building a [`WebPushSender`].
#[derive(Debug, thiserror::Error)]
pub enum WebPushSetupError {
    #[error("VAPID private key is not configured")]
    MissingPrivateKey,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`PushSender`] that talks to browser push services directly.
pub struct WebPushSender {
    client: reqwest::Client,
    vapid_private_key: SecretString,
    subject: String,
    ttl_secs: u32,
}

impl WebPushSender {
    pub fn new(
        vapid_private_key: SecretString,
        subject: impl Into<String>,
        ttl_secs: u32,
        request_timeout: Duration,
    ) -> Result<Self, WebPushSetupError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            vapid_private_key,
            subject: subject.into(),
            ttl_secs,
        })
    }

    pub fn from_config(config: &PushConfig) -> Result<Self, WebPushSetupError> {
        let key = config
            .vapid_private_key
            .clone()
            .ok_or(WebPushSetupError::MissingPrivateKey)?;
        Self::new(
            key,
            config.subject.clone(),
            config.ttl_secs,
            config.request_timeout(),
        )
    }

    fn build_message(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<web_push::WebPushMessage, web_push::WebPushError> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(self.vapid_private_key.expose_secret(), &info)?;
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature.build()?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl_secs);
        builder.build()
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        notification: &PushNotification,
    ) -> Result<(), DeliveryError> {
        let payload = notification
            .to_json_bytes()
            .map_err(|e| DeliveryError::Transient(format!("payload encoding: {}", e)))?;

        let message = self
            .build_message(subscription, &payload)
            .map_err(|e| DeliveryError::Transient(format!("message build: {}", e)))?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }
        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }
        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");
            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }
            request = request.body(push_payload.content);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(format!("request failed: {}", e)))?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            tracing::debug!(endpoint = %subscription.endpoint, status, "Push accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::from_status(status, &body))
    }
}
