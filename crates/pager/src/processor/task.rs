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

//! Task processor.
//!
//! For each task event: decode the row snapshot, move the task to
//! `processing`, run the [`TaskHandler`], then write `completed` (or `failed`
//! when the handler returns an error).
//!
//! A store failure on the final write leaves the task at `processing`. The
//! error is returned to the dispatcher, which logs it; nothing retries it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{pick_up, Pickup};
use crate::config::ClaimMode;
use crate::dal::Store;
use crate::dispatcher::Processor;
use crate::error::ProcessError;
use crate::models::{ChannelEvent, Status, Task};

/// The unit of work run for each task.
///
/// No automatic retry exists and the same task may reach several subscriber
/// instances in broadcast mode, so implementations must be idempotent.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Handler that only logs the task.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTaskHandler;

#[async_trait]
impl TaskHandler for LoggingTaskHandler {
    async fn handle(&self, task: &Task) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(task_id = %task.id, task_type = %task.task_type, "Processing task");
        Ok(())
    }
}

/// [`Processor`] for the task channel.
pub struct TaskProcessor {
    store: Arc<dyn Store>,
    handler: Arc<dyn TaskHandler>,
    claim_mode: ClaimMode,
}

impl TaskProcessor {
    pub fn new(store: Arc<dyn Store>, handler: Arc<dyn TaskHandler>, claim_mode: ClaimMode) -> Self {
        Self {
            store,
            handler,
            claim_mode,
        }
    }

    /// Processor with the [`LoggingTaskHandler`] and broadcast claims.
    pub fn logging(store: Arc<dyn Store>) -> Self {
        Self::new(store, Arc::new(LoggingTaskHandler), ClaimMode::Broadcast)
    }

    async fn finish(&self, id: &str, status: Status) -> Result<(), ProcessError> {
        if !self.store.set_task_status(id, status).await? {
            warn!(task_id = id, %status, "Task disappeared before its final status write");
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for TaskProcessor {
    fn name(&self) -> &'static str {
        "task"
    }

    async fn process(&self, event: &ChannelEvent) -> Result<(), ProcessError> {
        let task: Task = event.decode("task")?;
        debug!(task_id = %task.id, status = %task.status, "Task event received");

        let store = &self.store;
        let id = task.id.as_str();
        let pickup = pick_up(self.claim_mode, "task", id, |mode| async move {
            match mode {
                ClaimMode::Broadcast => store.set_task_status(id, Status::Processing).await,
                ClaimMode::Exclusive => store.claim_task(id).await,
            }
        })
        .await?;
        if pickup != Pickup::Acquired {
            return Ok(());
        }

        if let Err(e) = self.handler.handle(&task).await {
            self.finish(id, Status::Failed).await?;
            metrics::counter!("pager_tasks_failed_total").increment(1);
            return Err(ProcessError::Handler {
                task_id: task.id.clone(),
                reason: e.to_string(),
            });
        }

        self.finish(id, Status::Completed).await?;
        metrics::counter!("pager_tasks_completed_total").increment(1);
        info!(task_id = id, "Task completed");
        Ok(())
    }
}
