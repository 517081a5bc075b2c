use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{events, health_check, registrations, users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/events", post(events::create_event).get(events::browse_events))
        .route("/events/featured", get(events::featured_events))
        .route("/events/popular", get(events::popular_events))
        .route("/events/nearby", get(events::nearby_events))
        .route("/events/categories", get(events::category_counts))
        .route("/events/search", get(events::search_events))
        .route("/events/mine", get(events::my_events))
        .route(
            "/events/:id",
            get(events::event_by_slug).delete(events::delete_event),
        )
        .route(
            "/events/:id/registrations",
            post(registrations::register).get(events::event_registrations),
        )
        .route("/registrations", get(registrations::my_registrations))
        .route("/registrations/:id", delete(registrations::cancel_registration))
        .route("/checkin/:code", get(registrations::check_in))
        .route("/users/me", get(users::current_user))
        .route("/users/me/location", put(users::update_location))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer());

    apply_security_headers(router)
}
