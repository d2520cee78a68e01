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

//! HTTP boundary for the pager dispatch engine.
//!
//! The API only reads and inserts rows; processing happens in the channel
//! workers, which the insert triggers wake up.
//!
//! # Endpoints
//!
//! - `POST /tasks`, `GET /tasks`
//! - `POST /subscriptions`, `GET /subscriptions`
//! - `POST /notifications`, `GET /notifications`
//! - `GET /health`: store ping
//! - `GET /metrics`: Prometheus text format
//! - `GET /vapid-public-key`: application server key for browser clients

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use pager::dal::Store;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    metrics: Option<PrometheusHandle>,
    vapid_public_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            metrics: None,
            vapid_public_key: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_vapid_public_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.vapid_public_key = Some(key.into());
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    pub fn vapid_public_key(&self) -> Option<&str> {
        self.vapid_public_key.as_deref()
    }
}

/// Builds the router with every endpoint.
pub fn build_router(state: AppState) -> Router {
    use routes::{health, notifications, subscriptions, tasks};

    Router::new()
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/vapid-public-key", get(health::vapid_public_key))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
