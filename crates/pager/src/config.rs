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

//! Configuration types for the dispatch engine.
//!
//! # Construction
//!
//! ```rust
//! use pager::config::{DispatchConfig, FanoutPolicy};
//! use std::time::Duration;
//!
//! let config = DispatchConfig::builder()
//!     .connect_max_attempts(10)
//!     .connect_interval(Duration::from_secs(2))
//!     .fanout_policy(FanoutPolicy::ContinueAndAggregate)
//!     .build();
//! assert_eq!(config.retry_policy().max_attempts(), 10);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default channel published by the task insert trigger.
pub const DEFAULT_TASK_CHANNEL: &str = "tasks_channel";
/// Default channel published by the notification insert trigger.
pub const DEFAULT_NOTIFICATION_CHANNEL: &str = "notifications_channel";

/// How the wait between connection attempts grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same interval before every retry.
    Fixed,
    /// `interval * multiplier^(n-1)` before the n-th retry, capped at `max_interval`.
    Exponential {
        multiplier: f64,
        max_interval: Duration,
    },
}

/// Bounded retry used by the connection guard.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    /// Fixed-interval policy. `max_attempts` is clamped to at least one.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Wait before the retry that follows failed attempt number `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                multiplier,
                max_interval,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = self.interval.as_secs_f64() * multiplier.max(1.0).powi(exponent);
                if !secs.is_finite() || secs >= max_interval.as_secs_f64() {
                    max_interval
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}

/// What the fan-out processor does when one delivery hard-fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutPolicy {
    /// Mark the notification failed and skip the remaining endpoints.
    #[default]
    FailFast,
    /// Attempt every endpoint, then mark the notification failed if any
    /// delivery failed.
    ContinueAndAggregate,
}

/// Whether processors take exclusive ownership of a row before working on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    /// Every subscriber instance processes every event it receives.
    #[default]
    Broadcast,
    /// The pending -> processing write is conditional; an instance that loses
    /// the race skips the event.
    Exclusive,
}

/// Configuration for the channel workers and processors.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    task_channel: String,
    notification_channel: String,
    retry_policy: RetryPolicy,
    delivery_timeout: Duration,
    fanout_policy: FanoutPolicy,
    claim_mode: ClaimMode,
    restart_on_disconnect: bool,
}

impl DispatchConfig {
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::default()
    }

    pub fn task_channel(&self) -> &str {
        &self.task_channel
    }

    pub fn notification_channel(&self) -> &str {
        &self.notification_channel
    }

    /// Retry policy for the connection guard.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Deadline for a single push delivery.
    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    pub fn fanout_policy(&self) -> FanoutPolicy {
        self.fanout_policy
    }

    pub fn claim_mode(&self) -> ClaimMode {
        self.claim_mode
    }

    /// Whether a worker opens a fresh subscriber after its listen connection closes.
    pub fn restart_on_disconnect(&self) -> bool {
        self.restart_on_disconnect
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfigBuilder::default().build()
    }
}

/// Builder for [`DispatchConfig`].
#[derive(Debug, Clone)]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl Default for DispatchConfigBuilder {
    fn default() -> Self {
        Self {
            config: DispatchConfig {
                task_channel: DEFAULT_TASK_CHANNEL.to_string(),
                notification_channel: DEFAULT_NOTIFICATION_CHANNEL.to_string(),
                retry_policy: RetryPolicy::default(),
                delivery_timeout: Duration::from_secs(30),
                fanout_policy: FanoutPolicy::default(),
                claim_mode: ClaimMode::default(),
                restart_on_disconnect: true,
            },
        }
    }
}

impl DispatchConfigBuilder {
    pub fn task_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.task_channel = channel.into();
        self
    }

    pub fn notification_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.notification_channel = channel.into();
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = policy;
        self
    }

    pub fn connect_max_attempts(mut self, attempts: u32) -> Self {
        let policy = &self.config.retry_policy;
        self.config.retry_policy =
            RetryPolicy::fixed(attempts, policy.interval()).with_backoff(policy.backoff());
        self
    }

    pub fn connect_interval(mut self, interval: Duration) -> Self {
        let policy = &self.config.retry_policy;
        self.config.retry_policy =
            RetryPolicy::fixed(policy.max_attempts(), interval).with_backoff(policy.backoff());
        self
    }

    pub fn connect_backoff(mut self, backoff: Backoff) -> Self {
        self.config.retry_policy = self.config.retry_policy.with_backoff(backoff);
        self
    }

    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.config.delivery_timeout = timeout;
        self
    }

    pub fn fanout_policy(mut self, policy: FanoutPolicy) -> Self {
        self.config.fanout_policy = policy;
        self
    }

    pub fn claim_mode(mut self, mode: ClaimMode) -> Self {
        self.config.claim_mode = mode;
        self
    }

    pub fn restart_on_disconnect(mut self, restart: bool) -> Self {
        self.config.restart_on_disconnect = restart;
        self
    }

    pub fn build(self) -> DispatchConfig {
        self.config
    }
}
