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

//! Connection guard.
//!
//! Waits for the store to answer a ping before a subscriber starts listening.
//! Attempts are bounded by a [`RetryPolicy`]; the wait between attempts, and
//! the ping itself, end early when the caller's cancellation token fires.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::dal::Store;
use crate::error::GuardError;

/// Bounded-retry connectivity check.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGuard {
    policy: RetryPolicy,
}

impl ConnectionGuard {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Pings `store` until it answers, the policy is exhausted, or `cancel` fires.
    ///
    /// Returns the number of attempts made, counting the successful one. No
    /// wait follows the final failed attempt.
    pub async fn ensure_connected(
        &self,
        store: &dyn Store,
        cancel: &CancellationToken,
    ) -> Result<u32, GuardError> {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            metrics::counter!("pager_guard_attempts_total").increment(1);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(GuardError::Cancelled { attempts: attempt - 1 });
                }
                result = store.ping() => result,
            };

            match result {
                Ok(()) => {
                    if attempt > 1 {
                        info!(attempt, "Database connection established");
                    } else {
                        debug!("Database connection established");
                    }
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Database not reachable"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt == max_attempts {
                break;
            }

            let delay = self.policy.delay_after(attempt);
            if !wait_or_cancel(delay, cancel).await {
                return Err(GuardError::Cancelled { attempts: attempt });
            }
        }

        Err(GuardError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

/// Sleeps for `delay`; returns `false` if `cancel` fired first.
async fn wait_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
