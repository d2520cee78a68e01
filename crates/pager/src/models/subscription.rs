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

//! Push subscription (endpoint) model.
//!
//! The JSON shape matches the browser `PushSubscription.toJSON()` output so a
//! client can post its subscription unchanged.

use serde::{Deserialize, Serialize};

/// Keys used to encrypt payloads end-to-end for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Authentication secret (base64url)
    pub auth: String,
    /// Client public key on the P-256 curve (base64url)
    pub p256dh: String,
}

/// A registered push endpoint.
///
/// No uniqueness is enforced: registering the same endpoint twice means it
/// receives every notification twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl Subscription {
    pub fn new(
        endpoint: impl Into<String>,
        auth: impl Into<String>,
        p256dh: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                auth: auth.into(),
                p256dh: p256dh.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_browser_subscription_json() {
        let json = r#"{"endpoint":"https://push.example/abc","expirationTime":null,
            "keys":{"p256dh":"BNc...","auth":"tBH..."}}"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub, Subscription::new("https://push.example/abc", "tBH...", "BNc..."));
    }
}
