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

//! Recording transport for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use super::{PushResponse, PushTransport};
use crate::error::TransportError;
use crate::models::Subscription;

/// One call made to a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDelivery {
    pub endpoint: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
enum Script {
    HardFail(String),
    Respond(PushResponse),
    Delay(Duration),
}

#[derive(Default)]
struct Inner {
    calls: Vec<RecordedDelivery>,
    scripts: HashMap<String, Script>,
}

/// [`PushTransport`] that records every call in order.
///
/// Endpoints answer `201 Created` unless scripted otherwise. Clones share
/// the same record.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("calls", &self.lock().calls.len())
            .finish()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Calls to `endpoint` fail with a hard [`TransportError::Request`].
    pub fn fail_endpoint(&self, endpoint: impl Into<String>, reason: impl Into<String>) {
        self.lock()
            .scripts
            .insert(endpoint.into(), Script::HardFail(reason.into()));
    }

    /// Calls to `endpoint` return `response`.
    pub fn respond(&self, endpoint: impl Into<String>, response: PushResponse) {
        self.lock()
            .scripts
            .insert(endpoint.into(), Script::Respond(response));
    }

    /// Calls to `endpoint` take `delay` before answering `201 Created`.
    pub fn delay_endpoint(&self, endpoint: impl Into<String>, delay: Duration) {
        self.lock()
            .scripts
            .insert(endpoint.into(), Script::Delay(delay));
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedDelivery> {
        self.lock().calls.clone()
    }

    /// Endpoints called so far, oldest first.
    pub fn endpoints(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(|call| call.endpoint.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for MemoryTransport {
    async fn send(
        &self,
        payload: &[u8],
        subscription: &Subscription,
    ) -> Result<PushResponse, TransportError> {
        let endpoint = subscription.endpoint.clone();
        let script = {
            let mut inner = self.lock();
            inner.calls.push(RecordedDelivery {
                endpoint: endpoint.clone(),
                payload: payload.to_vec(),
            });
            inner.scripts.get(&endpoint).cloned()
        };
        debug!(%endpoint, bytes = payload.len(), "Recorded push delivery");

        match script {
            Some(Script::HardFail(reason)) => Err(TransportError::Request { endpoint, reason }),
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(PushResponse::new(201, ""))
            }
            None => Ok(PushResponse::new(201, "")),
        }
    }
}
