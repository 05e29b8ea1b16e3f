//! Status endpoints: read, compare-and-set, and the membership view.

use axum::{Json, extract::State};

use murmur_common::{MembersResponse, StatusResponse, UpdateStatusRequest};

use super::ApiError;
use crate::state::AppState;

/// Current local status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.status().status,
    })
}

/// Switch to `new` if the current status matches `expected`.
///
/// Gossip picks the change up from the state's watch channel.
pub async fn update_status(
    State(state): State<AppState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let updated = state.update_status(&payload.expected, &payload.new)?;

    Ok(Json(StatusResponse {
        status: updated.status,
    }))
}

/// This node's view of the cluster
pub async fn get_members(State(state): State<AppState>) -> Json<MembersResponse> {
    Json(state.members().await)
}
