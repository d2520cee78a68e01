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

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use pager::models::Subscription;
use tracing::info;

use super::decode;
use crate::error::ApiError;
use crate::AppState;

/// `POST /subscriptions`. Takes the browser's `PushSubscription` JSON as is.
pub async fn create_subscription(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Subscription>, ApiError> {
    let subscription: Subscription = decode(&body)?;
    let stored = state
        .store()
        .create_subscription(subscription)
        .await
        .map_err(ApiError::store("store subscription"))?;
    metrics::counter!("pager_api_rows_created_total", "table" => "subscriptions").increment(1);
    info!(endpoint = %stored.endpoint, "Subscription registered");
    Ok(Json(stored))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let subscriptions = state
        .store()
        .list_subscriptions()
        .await
        .map_err(ApiError::store("read subscriptions"))?;
    Ok(Json(subscriptions))
}
