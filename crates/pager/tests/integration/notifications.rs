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

//! End-to-end notification fan-out scenarios.

use pager::config::{DispatchConfig, FanoutPolicy};
use pager::dal::Store;
use pager::models::{Notification, Status, Subscription};
use pager::push::PushResponse;

use crate::fixtures::Harness;

async fn register(harness: &Harness, endpoints: &[&str]) {
    for endpoint in endpoints {
        harness
            .store
            .create_subscription(Subscription::new(*endpoint, "auth-secret", "client-key"))
            .await
            .unwrap();
    }
}

/// Every subscriber receives the published row, and the row ends completed.
#[tokio::test]
async fn notification_reaches_every_subscriber() {
    let harness = Harness::start(DispatchConfig::default()).await;
    register(
        &harness,
        &["https://push.example/a", "https://push.example/b"],
    )
    .await;

    let created = harness
        .store
        .create_notification("hi".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(created.id, Status::Completed)
        .await;

    let calls = harness.transport.calls();
    assert_eq!(
        harness.transport.endpoints(),
        vec!["https://push.example/a", "https://push.example/b"]
    );
    for call in &calls {
        let sent: Notification = serde_json::from_slice(&call.payload).unwrap();
        assert_eq!(sent.id, created.id);
        assert_eq!(sent.body, "hi");
        assert_eq!(sent.status, Status::Pending);
    }

    harness.shutdown().await;
}

/// A hard failure on one endpoint fails the notification and stops the fan-out.
#[tokio::test]
async fn failing_endpoint_fails_notification() {
    let harness = Harness::start(DispatchConfig::default()).await;
    register(
        &harness,
        &[
            "https://push.example/good",
            "https://push.example/broken",
            "https://push.example/never",
        ],
    )
    .await;
    harness
        .transport
        .fail_endpoint("https://push.example/broken", "connection refused");

    let created = harness
        .store
        .create_notification("hi".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(created.id, Status::Failed)
        .await;

    assert_eq!(
        harness.transport.endpoints(),
        vec!["https://push.example/good", "https://push.example/broken"]
    );

    let reports = harness.shutdown().await;
    let fanout = reports
        .iter()
        .flatten()
        .find(|report| report.channel == "notifications_channel")
        .unwrap();
    assert_eq!(fanout.summary.failed, 1);
}

/// With aggregation every endpoint is tried before the row is failed.
#[tokio::test]
async fn aggregate_policy_tries_every_endpoint() {
    let config = DispatchConfig::builder()
        .fanout_policy(FanoutPolicy::ContinueAndAggregate)
        .build();
    let harness = Harness::start(config).await;
    register(
        &harness,
        &[
            "https://push.example/good",
            "https://push.example/broken",
            "https://push.example/last",
        ],
    )
    .await;
    harness
        .transport
        .fail_endpoint("https://push.example/broken", "connection refused");

    let created = harness
        .store
        .create_notification("hi".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(created.id, Status::Failed)
        .await;
    assert_eq!(harness.transport.calls().len(), 3);

    harness.shutdown().await;
}

/// A rejected push (for example an expired subscription) does not fail the row.
#[tokio::test]
async fn rejected_push_is_not_a_failure() {
    let harness = Harness::start(DispatchConfig::default()).await;
    register(
        &harness,
        &["https://push.example/gone", "https://push.example/ok"],
    )
    .await;
    harness.transport.respond(
        "https://push.example/gone",
        PushResponse::new(410, "subscription expired"),
    );

    let created = harness
        .store
        .create_notification("hi".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(created.id, Status::Completed)
        .await;
    assert_eq!(harness.transport.calls().len(), 2);

    harness.shutdown().await;
}

/// Subscriptions registered after startup are picked up by the next event.
#[tokio::test]
async fn subscriptions_are_read_per_event() {
    let harness = Harness::start(DispatchConfig::default()).await;

    let first = harness
        .store
        .create_notification("before".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(first.id, Status::Completed)
        .await;
    assert!(harness.transport.calls().is_empty());

    register(&harness, &["https://push.example/late"]).await;
    let second = harness
        .store
        .create_notification("after".to_string())
        .await
        .unwrap();
    harness
        .wait_for_notification(second.id, Status::Completed)
        .await;
    assert_eq!(harness.transport.endpoints(), vec!["https://push.example/late"]);

    harness.shutdown().await;
}
