use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;
use crate::utils::auth::AuthContext;
use crate::utils::response::success;

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// The caller's stored record, including the free-plan creation counter the
/// UI displays ("0/1 events").
pub async fn current_user(State(state): State<AppState>, ctx: AuthContext) -> Response {
    let user = state.store.get_or_create_user(ctx.user_id);
    success(user, "User fetched")
}

pub async fn update_location(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<UpdateLocationRequest>,
) -> Response {
    let user = state.store.update_user_location(
        ctx.user_id,
        payload.city,
        payload.state,
        payload.country,
    );
    success(user, "Location updated")
}
