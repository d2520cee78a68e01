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

//! Event processors for the two built-in channels.
//!
//! - [`TaskProcessor`]: the task state machine around a [`TaskHandler`]
//! - [`FanoutProcessor`]: push delivery of a notification to every subscription

pub mod fanout;
pub mod task;

pub use fanout::FanoutProcessor;
pub use task::{LoggingTaskHandler, TaskHandler, TaskProcessor};

use tracing::{debug, warn};

use crate::config::ClaimMode;
use crate::error::StoreError;

/// Outcome of moving a row from `pending` to `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pickup {
    Acquired,
    /// Another instance claimed the row first.
    Lost,
    Missing,
}

/// Writes `processing` according to the claim mode.
///
/// Broadcast mode writes unconditionally, so a missing row is the only way
/// to lose; exclusive mode claims with a conditional write and cannot tell a
/// missing row from one already claimed.
pub(crate) async fn pick_up<Fut>(
    mode: ClaimMode,
    kind: &'static str,
    id: &str,
    mark: impl FnOnce(ClaimMode) -> Fut,
) -> Result<Pickup, StoreError>
where
    Fut: std::future::Future<Output = Result<bool, StoreError>>,
{
    let pickup = match (mode, mark(mode).await?) {
        (_, true) => Pickup::Acquired,
        (ClaimMode::Broadcast, false) => Pickup::Missing,
        (ClaimMode::Exclusive, false) => Pickup::Lost,
    };
    match pickup {
        Pickup::Acquired => {}
        Pickup::Lost => debug!(kind, id, "Row already claimed, skipping"),
        Pickup::Missing => warn!(kind, id, "Row not found, skipping"),
    }
    Ok(pickup)
}
