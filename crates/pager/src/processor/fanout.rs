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

//! Fan-out delivery processor.
//!
//! For each notification event: decode the row snapshot, move the
//! notification to `processing`, read the current subscription set and
//! deliver the raw event payload to each subscription in turn. Deliveries are
//! sequential and each one is bounded by the configured timeout.
//!
//! Terminal status is binary. Under [`FanoutPolicy::FailFast`] the first hard
//! delivery error writes `failed` and skips the remaining subscriptions; under
//! [`FanoutPolicy::ContinueAndAggregate`] every subscription is attempted and
//! any hard error writes `failed`. Non-2xx responses are soft and do not
//! affect the outcome.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{pick_up, Pickup};
use crate::config::{ClaimMode, DispatchConfig, FanoutPolicy};
use crate::dal::Store;
use crate::dispatcher::Processor;
use crate::error::{ProcessError, TransportError};
use crate::models::{ChannelEvent, Notification, Status, Subscription};
use crate::push::{PushResponse, PushTransport};

/// [`Processor`] for the notification channel.
pub struct FanoutProcessor {
    store: Arc<dyn Store>,
    transport: Arc<dyn PushTransport>,
    policy: FanoutPolicy,
    claim_mode: ClaimMode,
    delivery_timeout: Duration,
}

impl FanoutProcessor {
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn PushTransport>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            store,
            transport,
            policy: config.fanout_policy(),
            claim_mode: config.claim_mode(),
            delivery_timeout: config.delivery_timeout(),
        }
    }

    async fn deliver(
        &self,
        payload: &[u8],
        subscription: &Subscription,
    ) -> Result<PushResponse, TransportError> {
        metrics::counter!("pager_deliveries_attempted_total").increment(1);
        let result = match tokio::time::timeout(
            self.delivery_timeout,
            self.transport.send(payload, subscription),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                endpoint: subscription.endpoint.clone(),
                timeout: self.delivery_timeout,
            }),
        };
        if result.is_err() {
            metrics::counter!("pager_deliveries_failed_total").increment(1);
        }
        result
    }

    async fn finish(&self, id: i64, status: Status) -> Result<(), ProcessError> {
        if !self.store.set_notification_status(id, status).await? {
            warn!(notification_id = id, %status, "Notification disappeared before its final status write");
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for FanoutProcessor {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn process(&self, event: &ChannelEvent) -> Result<(), ProcessError> {
        let notification: Notification = event.decode("notification")?;
        let id = notification.id;
        debug!(notification_id = id, "Notification event received");

        let store = &self.store;
        let key = id.to_string();
        let pickup = pick_up(self.claim_mode, "notification", &key, |mode| async move {
            match mode {
                ClaimMode::Broadcast => store.set_notification_status(id, Status::Processing).await,
                ClaimMode::Exclusive => store.claim_notification(id).await,
            }
        })
        .await?;
        if pickup != Pickup::Acquired {
            return Ok(());
        }

        let subscriptions = self.store.list_subscriptions().await?;
        let payload = event.as_bytes();
        let mut failures = Vec::new();

        for subscription in &subscriptions {
            match self.deliver(payload, subscription).await {
                Ok(response) if response.is_success() => {
                    debug!(
                        notification_id = id,
                        endpoint = %subscription.endpoint,
                        status = response.status,
                        body = %response.body,
                        "Notification delivered"
                    );
                }
                Ok(response) => {
                    warn!(
                        notification_id = id,
                        endpoint = %subscription.endpoint,
                        status = response.status,
                        body = %response.body,
                        "Push service rejected notification"
                    );
                }
                Err(e) => match self.policy {
                    FanoutPolicy::FailFast => {
                        self.finish(id, Status::Failed).await?;
                        return Err(e.into());
                    }
                    FanoutPolicy::ContinueAndAggregate => {
                        warn!(notification_id = id, error = %e, "Delivery failed, continuing");
                        failures.push(e);
                    }
                },
            }
        }

        if !failures.is_empty() {
            self.finish(id, Status::Failed).await?;
            return Err(ProcessError::Deliveries {
                notification_id: id,
                attempted: subscriptions.len(),
                failures,
            });
        }

        self.finish(id, Status::Completed).await?;
        info!(
            notification_id = id,
            deliveries = subscriptions.len(),
            "Notification completed"
        );
        Ok(())
    }
}
