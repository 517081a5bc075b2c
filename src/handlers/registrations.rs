use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::Event;
use crate::models::registration::Registration;
use crate::state::AppState;
use crate::ticket;
use crate::utils::auth::AuthContext;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize, Default)]
pub struct RegisterRequest {
    pub attendee_name: Option<String>,
}

/// A registration joined with its event, as shown on the my-tickets page.
#[derive(Serialize)]
pub struct TicketView {
    pub registration: Registration,
    pub event: Event,
}

pub async fn register(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(event_id): Path<Uuid>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    let attendee_name = payload
        .attendee_name
        .or_else(|| ctx.display_name.clone())
        .unwrap_or_default();

    let registration = state
        .guard
        .register(&ctx, event_id, &attendee_name, Utc::now())?;
    Ok(created(registration, "Registration confirmed"))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(registration_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state.guard.cancel(&ctx, registration_id, Utc::now())?;
    Ok(success(registration, "Registration cancelled"))
}

/// The caller's tickets across all events, cancelled ones included.
pub async fn my_registrations(State(state): State<AppState>, ctx: AuthContext) -> Response {
    let tickets: Vec<TicketView> = state
        .store
        .registrations_for_user(ctx.user_id)
        .into_iter()
        .filter_map(|registration| {
            state
                .store
                .event(registration.event_id)
                .map(|event| TicketView {
                    registration,
                    event,
                })
        })
        .collect();
    success(tickets, "Your tickets fetched")
}

pub async fn check_in(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    let check_in = ticket::validate_check_in(&state.store, &ctx, &code)?;
    Ok(success(check_in, "Ticket valid"))
}
