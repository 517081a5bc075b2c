use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;

use crate::models::event::Event;
use crate::models::registration::Registration;
use crate::store::Store;
use crate::utils::auth::AuthContext;
use crate::utils::error::AppError;

/// 32 alphanumeric characters, roughly 190 bits of entropy; unguessable and
/// unique for any realistic number of tickets.
const TOKEN_LEN: usize = 32;

pub fn mint_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CheckIn {
    pub registration: Registration,
    pub event: Event,
}

/// Resolves a scanned qr token to its registration. Read-only and idempotent;
/// only the event's organizer may perform the lookup.
pub fn validate_check_in(
    store: &Store,
    ctx: &AuthContext,
    token: &str,
) -> Result<CheckIn, AppError> {
    let registration = store
        .registration_by_token(token)
        .ok_or_else(|| AppError::NotFound("No ticket matches this code".to_string()))?;
    let event = store
        .event(registration.event_id)
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if event.organizer_id != ctx.user_id {
        return Err(AppError::Forbidden(
            "Only the event organizer can check attendees in".to_string(),
        ));
    }
    if registration.is_cancelled() {
        return Err(AppError::AlreadyCancelled);
    }

    Ok(CheckIn {
        registration,
        event,
    })
}
