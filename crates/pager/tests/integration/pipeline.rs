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

//! Worker lifecycle: bad input, listener trouble, reconnects and shutdown.

use std::time::Duration;

use pager::config::DispatchConfig;
use pager::dal::Store;
use pager::dispatcher::WorkerExit;
use pager::error::{GuardError, WorkerError};
use pager::models::{NewTask, Status};

use crate::fixtures::{wait_until, Harness, WAIT};

/// Malformed payloads on either channel are dropped and the loops keep going.
#[tokio::test]
async fn malformed_payloads_do_not_stop_the_loops() {
    let harness = Harness::start(DispatchConfig::default()).await;

    harness.source.publish("tasks_channel", "not json");
    harness.source.publish("notifications_channel", "{\"id\": \"nope\"}");

    let task = harness.store.create_task(NewTask::default()).await.unwrap();
    let notification = harness
        .store
        .create_notification("still alive".to_string())
        .await
        .unwrap();
    harness.wait_for_task(&task.id, Status::Completed).await;
    harness
        .wait_for_notification(notification.id, Status::Completed)
        .await;

    let reports = harness.shutdown().await;
    assert_eq!(reports.len(), 2);
    for report in reports {
        let report = report.unwrap();
        assert_eq!(report.exit, WorkerExit::Cancelled);
        assert_eq!(report.summary.received, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.processed, 1);
    }
}

/// A wait error is logged and counted, and the next event is still handled.
#[tokio::test]
async fn wait_errors_are_skipped() {
    let harness = Harness::start(DispatchConfig::default()).await;

    harness
        .source
        .inject_wait_error("tasks_channel", "connection hiccup");
    let task = harness.store.create_task(NewTask::default()).await.unwrap();
    harness.wait_for_task(&task.id, Status::Completed).await;

    let reports = harness.shutdown().await;
    let tasks = reports
        .iter()
        .flatten()
        .find(|report| report.channel == "tasks_channel")
        .unwrap();
    assert_eq!(tasks.summary.wait_errors, 1);
    assert_eq!(tasks.summary.received, 1);
    assert_eq!(tasks.subscriber_runs, 1);
}

/// Cancelling an idle engine ends every worker cleanly.
#[tokio::test]
async fn cancellation_stops_idle_workers() {
    let harness = Harness::start(DispatchConfig::default()).await;

    let reports = harness.shutdown().await;
    assert_eq!(reports.len(), 2);
    for report in reports {
        let report = report.unwrap();
        assert_eq!(report.exit, WorkerExit::Cancelled);
        assert_eq!(report.summary, Default::default());
    }
}

/// After the listen connection closes the worker reconnects and resumes.
#[tokio::test]
async fn closed_connection_is_reopened() {
    let config = DispatchConfig::builder()
        .connect_interval(Duration::from_millis(10))
        .build();
    let harness = Harness::start(config).await;
    let pings_before = harness.store.ping_count();

    harness.source.close_channel("tasks_channel");
    tokio::time::timeout(WAIT, harness.source.wait_for_listeners("tasks_channel", 1))
        .await
        .unwrap();
    assert!(harness.store.ping_count() > pings_before);

    let task = harness.store.create_task(NewTask::default()).await.unwrap();
    harness.wait_for_task(&task.id, Status::Completed).await;

    let reports = harness.shutdown().await;
    let tasks = reports
        .iter()
        .flatten()
        .find(|report| report.channel == "tasks_channel")
        .unwrap();
    assert_eq!(tasks.subscriber_runs, 2);
    assert_eq!(tasks.summary.processed, 1);
}

/// Without restarts a closed connection ends only that channel's worker.
#[tokio::test]
async fn closed_connection_without_restart_ends_worker() {
    let config = DispatchConfig::builder()
        .restart_on_disconnect(false)
        .build();
    let harness = Harness::start(config).await;

    harness.source.close_channel("tasks_channel");
    let notification = harness
        .store
        .create_notification("other channel".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(notification.id, Status::Completed)
        .await;

    let reports = harness.shutdown().await;
    let exits: Vec<(String, WorkerExit)> = reports
        .into_iter()
        .map(|report| {
            let report = report.unwrap();
            (report.channel, report.exit)
        })
        .collect();
    assert!(exits.contains(&("tasks_channel".to_string(), WorkerExit::Disconnected)));
    assert!(exits.contains(&("notifications_channel".to_string(), WorkerExit::Cancelled)));
}

/// A database that stays down exhausts the guard on reconnect.
#[tokio::test]
async fn unreachable_store_exhausts_the_guard() {
    let config = DispatchConfig::builder()
        .connect_max_attempts(3)
        .connect_interval(Duration::from_millis(5))
        .build();
    let harness = Harness::start(config).await;

    let pings_before = harness.store.ping_count();
    harness.store.set_unavailable(true);
    harness.source.close_channel("tasks_channel");

    // The guard does not wait after its last attempt, so once the third ping
    // has been made the worker has already returned.
    let store = &harness.store;
    wait_until(move || async move { (store.ping_count() >= pings_before + 3).then_some(()) }).await;

    let reports = harness.shutdown().await;
    let failure = reports
        .into_iter()
        .find_map(|report| report.err())
        .unwrap();
    match failure {
        WorkerError::Guard(GuardError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("unexpected worker error: {other}"),
    }
}
