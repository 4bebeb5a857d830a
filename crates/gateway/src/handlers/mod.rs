//! API handlers module

pub mod health;
pub mod imports;
pub mod recommendations;
pub mod strains;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use budai_common::errors::{AppError, Result};

/// Unwrap a JSON body, turning extractor rejections into `InvalidFormat`
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidFormat {
            message: rejection.body_text(),
        })
}

/// Report any failure as a 400 carrying `message`, with the cause as details
pub(crate) fn rejected(message: &'static str) -> impl FnOnce(AppError) -> AppError {
    move |cause| {
        if cause.is_server_error() {
            tracing::error!(error = %cause, "{}", message);
        }
        AppError::Rejected {
            message: cause.to_string(),
        }
        .context(message)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{create_router, AppState};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use budai_common::{AppConfig, MemoryStore, MockSource};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Defaults with no pause between imported URLs
    pub fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.import.delay_ms = 0;
        config
    }

    pub fn state(source: MockSource) -> AppState {
        AppState::new(Arc::new(config()), Arc::new(MemoryStore::new()), Arc::new(source))
    }

    pub fn router(state: &AppState) -> Router {
        create_router(state.clone())
    }

    /// Send one request and decode the JSON body (`Null` when empty)
    pub async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }
}
