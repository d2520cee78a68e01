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

//! End-to-end task channel scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pager::config::{ClaimMode, DispatchConfig};
use pager::dal::Store;
use pager::models::{NewTask, Status, Task};
use pager::processor::TaskHandler;
use serde_json::json;

use crate::fixtures::Harness;

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl TaskHandler for CountingHandler {
    async fn handle(&self, task: &Task) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if task.task_type == "explode" {
            return Err("handler rejected task".into());
        }
        Ok(())
    }
}

/// An inserted task moves pending -> processing -> completed.
#[tokio::test]
async fn inserted_task_is_completed() {
    let harness = Harness::start(DispatchConfig::default()).await;

    let task = harness
        .store
        .create_task(NewTask::new("email", json!({"to": "ops@example.com"})))
        .await
        .unwrap();
    assert_eq!(task.status, Status::Pending);

    let done = harness.wait_for_task(&task.id, Status::Completed).await;
    assert_eq!(done.payload, json!({"to": "ops@example.com"}));
    assert!(done.updated >= task.created);

    let history: Vec<Status> = harness
        .store
        .task_history(&task.id)
        .into_iter()
        .map(|change| change.status)
        .collect();
    assert_eq!(
        history,
        vec![Status::Pending, Status::Processing, Status::Completed]
    );

    let reports = harness.shutdown().await;
    let task_report = reports
        .iter()
        .flatten()
        .find(|report| report.channel == "tasks_channel")
        .unwrap();
    assert_eq!(task_report.summary.received, 1);
    assert_eq!(task_report.summary.processed, 1);
}

/// Tasks created with the default body are processed like any other.
#[tokio::test]
async fn default_task_is_completed() {
    let harness = Harness::start(DispatchConfig::default()).await;

    let task = harness.store.create_task(NewTask::default()).await.unwrap();
    let done = harness.wait_for_task(&task.id, Status::Completed).await;
    assert_eq!(done.task_type, "default");
    assert_eq!(done.payload, json!({"message": "New task created"}));

    harness.shutdown().await;
}

/// A handler error marks the task failed and the worker keeps going.
#[tokio::test]
async fn handler_failure_marks_task_failed() {
    let handler = Arc::new(CountingHandler::default());
    let harness = Harness::start_with_handler(DispatchConfig::default(), handler.clone()).await;

    let bad = harness
        .store
        .create_task(NewTask::new("explode", json!({})))
        .await
        .unwrap();
    let good = harness
        .store
        .create_task(NewTask::new("email", json!({})))
        .await
        .unwrap();

    harness.wait_for_task(&bad.id, Status::Failed).await;
    harness.wait_for_task(&good.id, Status::Completed).await;
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);

    harness.shutdown().await;
}

/// In broadcast mode every instance processes every task.
#[tokio::test]
async fn broadcast_instances_each_process_the_task() {
    let handler = Arc::new(CountingHandler::default());
    let mut harness = Harness::start_with_handler(DispatchConfig::default(), handler.clone()).await;
    harness.add_instance().await;

    let task = harness.store.create_task(NewTask::default()).await.unwrap();

    crate::fixtures::wait_until(|| {
        let handler = handler.clone();
        async move { (handler.calls.load(Ordering::SeqCst) == 2).then_some(()) }
    })
    .await;
    harness.wait_for_task(&task.id, Status::Completed).await;

    harness.shutdown().await;
}

/// With exclusive claims two instances process a task exactly once.
#[tokio::test]
async fn exclusive_instances_process_the_task_once() {
    let config = DispatchConfig::builder()
        .claim_mode(ClaimMode::Exclusive)
        .build();
    let handler = Arc::new(CountingHandler::default());
    let mut harness = Harness::start_with_handler(config, handler.clone()).await;
    harness.add_instance().await;

    let first = harness.store.create_task(NewTask::default()).await.unwrap();
    let second = harness.store.create_task(NewTask::default()).await.unwrap();
    harness.wait_for_task(&first.id, Status::Completed).await;
    harness.wait_for_task(&second.id, Status::Completed).await;

    let store = harness.store.clone();
    harness.shutdown().await;
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);

    for id in [&first.id, &second.id] {
        let history: Vec<Status> = store
            .task_history(id)
            .into_iter()
            .map(|change| change.status)
            .collect();
        assert_eq!(
            history,
            vec![Status::Pending, Status::Processing, Status::Completed]
        );
    }
}
