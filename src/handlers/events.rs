use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::discovery::{self, TimeWindow};
use crate::models::event::{CreateEventRequest, EventCategory};
use crate::state::AppState;
use crate::utils::auth::AuthContext;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Deserialize)]
pub struct LimitParams {
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct BrowseParams {
    category: Option<EventCategory>,
    when: Option<TimeWindow>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct LocationParams {
    city: Option<String>,
    state: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    q: String,
    limit: Option<usize>,
}

pub async fn create_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    let event = state.guard.create_event(&ctx, payload, Utc::now())?;
    Ok(created(event, "Event created"))
}

pub async fn browse_events(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> Response {
    let events = state.discovery.browse(
        Utc::now(),
        params.category,
        params.when,
        params.limit.unwrap_or(discovery::BROWSE_LIMIT),
    );
    success(events, "Events fetched")
}

pub async fn featured_events(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Response {
    let events = state
        .discovery
        .upcoming(Utc::now(), params.limit.unwrap_or(discovery::FEATURED_LIMIT));
    success(events, "Featured events fetched")
}

pub async fn popular_events(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Response {
    let events = state
        .discovery
        .upcoming(Utc::now(), params.limit.unwrap_or(discovery::POPULAR_LIMIT));
    success(events, "Popular events fetched")
}

pub async fn nearby_events(
    State(state): State<AppState>,
    Query(params): Query<LocationParams>,
) -> Response {
    let events = state.discovery.by_location(
        Utc::now(),
        params.city.as_deref(),
        params.state.as_deref(),
        params.limit.unwrap_or(discovery::LOCATION_LIMIT),
    );
    success(events, "Nearby events fetched")
}

pub async fn category_counts(State(state): State<AppState>) -> Response {
    let counts = state.discovery.category_counts(Utc::now());
    success(counts, "Category counts fetched")
}

pub async fn search_events(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let events = state.discovery.search(
        Utc::now(),
        &params.q,
        params.limit.unwrap_or(discovery::SEARCH_LIMIT),
    );
    success(events, "Search results fetched")
}

pub async fn event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event_by_slug(&slug)
        .ok_or_else(|| AppError::NotFound(format!("No event with slug '{slug}'")))?;
    Ok(success(event, "Event fetched"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.guard.delete_event(&ctx, event_id)?;
    Ok(empty_success("Event deleted"))
}

pub async fn my_events(State(state): State<AppState>, ctx: AuthContext) -> Response {
    let events = state.store.events_by_organizer(ctx.user_id);
    success(events, "Your events fetched")
}

/// Attendee list for an event; restricted to its organizer.
pub async fn event_registrations(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event(event_id)
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if event.organizer_id != ctx.user_id {
        return Err(AppError::Forbidden(
            "Only the organizer can view attendees".to_string(),
        ));
    }
    let registrations = state.store.registrations_for_event(event_id);
    Ok(success(registrations, "Attendees fetched"))
}
