/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Web Push transport (RFC 8030 delivery, RFC 8291 `aes128gcm` encryption,
//! RFC 8292 VAPID).
//!
//! `web-push` builds the encrypted, signed request; `reqwest` sends it.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessage,
    WebPushMessageBuilder,
};

use super::{PushResponse, PushTransport};
use crate::error::TransportError;
use crate::models::Subscription;

/// Service-level credentials used to sign every push request.
#[derive(Clone)]
pub struct VapidCredentials {
    /// Contact for the push service operator, a `mailto:` or `https:` URI.
    pub subscriber: String,
    /// Application server public key (base64url), handed to clients.
    pub public_key: String,
    /// Application server private key (base64url).
    pub private_key: String,
}

impl std::fmt::Debug for VapidCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidCredentials")
            .field("subscriber", &self.subscriber)
            .field("public_key", &self.public_key)
            .field("private_key", &"****")
            .finish()
    }
}

/// [`PushTransport`] that talks to real push services.
#[derive(Debug, Clone)]
pub struct WebPushTransport {
    credentials: VapidCredentials,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl WebPushTransport {
    /// Message time-to-live requested from the push service.
    pub const TTL: u32 = 24 * 60 * 60;

    /// `request_timeout` bounds each HTTP exchange with the push service.
    pub fn new(
        credentials: VapidCredentials,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Request {
                endpoint: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            credentials,
            client,
            request_timeout,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.credentials.public_key
    }

    fn encrypt(
        &self,
        payload: &[u8],
        subscription: &Subscription,
    ) -> Result<WebPushMessage, TransportError> {
        let endpoint = &subscription.endpoint;
        let info = SubscriptionInfo::new(
            endpoint.as_str(),
            subscription.keys.p256dh.as_str(),
            subscription.keys.auth.as_str(),
        );
        let encryption = |e: web_push::WebPushError| TransportError::Encryption {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        };

        let mut signature = VapidSignatureBuilder::from_base64(
            &self.credentials.private_key,
            web_push::URL_SAFE_NO_PAD,
            &info,
        )
        .map_err(encryption)?;
        signature.add_claim("sub", self.credentials.subscriber.as_str());
        let signature = signature.build().map_err(encryption)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(Self::TTL);
        builder.build().map_err(encryption)
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(
        &self,
        payload: &[u8],
        subscription: &Subscription,
    ) -> Result<PushResponse, TransportError> {
        let endpoint = subscription.endpoint.clone();
        let url = Url::parse(&endpoint).map_err(|e| TransportError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "https" {
            return Err(TransportError::InvalidEndpoint {
                endpoint,
                reason: "push endpoints must use https".to_string(),
            });
        }

        let message = self.encrypt(payload, subscription)?;
        let (parts, body) =
            web_push::request_builder::build_request::<Vec<u8>>(message).into_parts();
        let mut request = self.client.post(url).body(body);
        for (name, value) in parts.headers.iter() {
            request = request.header(name.as_str(), value.as_bytes());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    endpoint: endpoint.clone(),
                    timeout: self.request_timeout,
                }
            } else {
                TransportError::Request {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Request {
            endpoint: endpoint.clone(),
            reason: format!("failed to read response body: {e}"),
        })?;
        debug!(%endpoint, status, "Push service responded");

        Ok(PushResponse { status, body })
    }
}
