//! HTTP route handlers for the agent's control plane.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use murmur_common::constants::routes;
use murmur_common::{ErrorResponse, MurmurError};

use crate::state::AppState;

mod health;
mod status;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route(routes::HEALTH, get(health::health_check))

        // Status
        .route(
            routes::STATUS,
            get(status::get_status).post(status::update_status),
        )
        .route(routes::MEMBERS, get(status::get_members))

        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}

/// Error returned by handlers, rendered as an [`ErrorResponse`] body
pub struct ApiError(MurmurError);

impl From<MurmurError> for ApiError {
    fn from(err: MurmurError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: self.0.to_string(),
            current: self.0.current_status().map(str::to_string),
        };
        (code, Json(body)).into_response()
    }
}
