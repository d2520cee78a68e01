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

//! Push delivery transports.
//!
//! A transport delivers one payload to one subscription. Its result has two
//! failure tiers:
//!
//! - `Err(TransportError)` is a hard failure (bad endpoint, encryption,
//!   network, timeout) and fails the whole notification
//! - `Ok(PushResponse)` with a non-2xx status is a soft failure; the fan-out
//!   processor logs it and carries on

pub mod memory;
#[cfg(feature = "webpush")]
pub mod webpush;

pub use memory::{MemoryTransport, RecordedDelivery};
#[cfg(feature = "webpush")]
pub use webpush::{VapidCredentials, WebPushTransport};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::Subscription;

/// Status and body returned by the push service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResponse {
    pub status: u16,
    pub body: String,
}

impl PushResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers encrypted payloads to push endpoints.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        payload: &[u8],
        subscription: &Subscription,
    ) -> Result<PushResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_2xx_is_success() {
        assert!(PushResponse::new(201, "").is_success());
        assert!(!PushResponse::new(410, "gone").is_success());
        assert!(!PushResponse::new(302, "").is_success());
    }
}
