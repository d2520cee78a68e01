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

//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pager::error::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to decode request: {0}")]
    BadRequest(String),

    /// The underlying error is logged, never returned to the client.
    #[error("failed to {action}")]
    Store {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl ApiError {
    pub fn store(action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| ApiError::Store { action, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotConfigured(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store { action, source } = &self {
            error!(action, error = %source, "Store request failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
