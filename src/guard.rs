use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::event::{CreateEventRequest, Event, DEFAULT_THEME_COLOR};
use crate::models::registration::Registration;
use crate::models::user::PlanTier;
use crate::store::{FreeQuota, Store, StoreError};
use crate::ticket;
use crate::utils::auth::AuthContext;
use crate::utils::error::AppError;

/// Events a free-plan user may create, ever.
pub const FREE_EVENT_LIMIT: u32 = 1;

const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Gates every capacity-affecting write: event creation (plan quota, theme
/// gating), registration (seat limit, duplicate and ended checks), and
/// cancellation. Plan rules live here so they cannot be bypassed by a client
/// that skips the UI checks.
#[derive(Clone)]
pub struct CapacityGuard {
    store: Store,
}

impl CapacityGuard {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create_event(
        &self,
        ctx: &AuthContext,
        request: CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event, AppError> {
        request.validate()?;
        if ctx.plan == PlanTier::Free && request.theme_color != DEFAULT_THEME_COLOR {
            return Err(AppError::FeatureLocked);
        }

        let event = request.into_event(ctx.user_id, ctx.organizer_name(), now);
        self.store.get_or_create_user(ctx.user_id);
        let quota = (ctx.plan == PlanTier::Free).then_some(FreeQuota {
            user_id: ctx.user_id,
            limit: FREE_EVENT_LIMIT,
        });

        let created = self.commit(|| self.store.create_event(event.clone(), quota))?;
        tracing::info!(event_id = %created.id, slug = %created.slug, "event created");
        Ok(created)
    }

    pub fn register(
        &self,
        ctx: &AuthContext,
        event_id: Uuid,
        attendee_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Registration, AppError> {
        let attendee_name = attendee_name.trim();
        if attendee_name.is_empty() {
            return Err(AppError::ValidationError(
                "attendee name is required".to_string(),
            ));
        }

        let registration = Registration::new(
            event_id,
            ctx.user_id,
            attendee_name.to_string(),
            ticket::mint_token(),
            now,
        );
        self.store.get_or_create_user(ctx.user_id);

        let confirmed =
            self.commit(|| self.store.insert_registration(registration.clone(), now))?;
        tracing::info!(
            registration_id = %confirmed.id,
            event_id = %event_id,
            "registration confirmed"
        );
        Ok(confirmed)
    }

    /// Cancels a registration on behalf of the attendee or the event's
    /// organizer. Idempotent: a second cancellation returns the registration
    /// unchanged and leaves the seat counter alone.
    pub fn cancel(
        &self,
        ctx: &AuthContext,
        registration_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Registration, AppError> {
        let registration = self
            .store
            .registration(registration_id)
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;
        let organizer_id = self
            .store
            .event(registration.event_id)
            .map(|e| e.organizer_id);
        if ctx.user_id != registration.user_id && Some(ctx.user_id) != organizer_id {
            return Err(AppError::Forbidden(
                "Only the attendee or the event organizer can cancel a registration".to_string(),
            ));
        }

        self.commit(|| self.store.cancel_registration(registration_id, now))
    }

    pub fn delete_event(&self, ctx: &AuthContext, event_id: Uuid) -> Result<Event, AppError> {
        let event = self
            .store
            .event(event_id)
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        if event.organizer_id != ctx.user_id {
            return Err(AppError::Forbidden(
                "Only the organizer can delete this event".to_string(),
            ));
        }

        let deleted = self.commit(|| self.store.delete_event(event_id))?;
        tracing::info!(event_id = %deleted.id, "event deleted");
        Ok(deleted)
    }

    /// Runs a store commit, retrying transparently when a concurrent write
    /// invalidates it. Business rejections pass through untouched; only
    /// exhausted retries surface as `Conflict`.
    fn commit<T>(&self, op: impl Fn() -> Result<T, StoreError>) -> Result<T, AppError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match op() {
                Ok(value) => return Ok(value),
                Err(StoreError::Conflict) => {
                    tracing::warn!(attempt, "commit conflicted with a concurrent write");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(AppError::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventCategory, LocationType, TicketType, DEFAULT_TIMEZONE};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn ctx(plan: PlanTier) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            plan,
            display_name: Some("Asha Rao".to_string()),
        }
    }

    fn request(title: &str, now: DateTime<Utc>) -> CreateEventRequest {
        CreateEventRequest {
            title: title.to_string(),
            description: "Talks, demos, and networking.".to_string(),
            category: EventCategory::Tech,
            tags: vec!["tech".to_string()],
            start_date: now + Duration::days(5),
            end_date: now + Duration::days(5) + Duration::hours(4),
            timezone: DEFAULT_TIMEZONE.to_string(),
            capacity: 3,
            ticket_type: TicketType::Free,
            ticket_price: None,
            location_type: LocationType::Online,
            city: None,
            state: None,
            address: None,
            venue: None,
            cover_image: None,
            theme_color: DEFAULT_THEME_COLOR.to_string(),
        }
    }

    fn guard() -> (CapacityGuard, Store) {
        let store = Store::new();
        (CapacityGuard::new(store.clone()), store)
    }

    #[test]
    fn free_plan_is_limited_to_one_event() {
        let (guard, store) = guard();
        let now = Utc::now();
        let ctx = ctx(PlanTier::Free);

        guard.create_event(&ctx, request("First", now), now).unwrap();
        assert_eq!(store.user(ctx.user_id).unwrap().free_events_created, 1);

        let second = guard.create_event(&ctx, request("Second", now), now);
        assert!(matches!(second, Err(AppError::QuotaExceeded)));
        assert_eq!(store.user(ctx.user_id).unwrap().free_events_created, 1);
    }

    #[test]
    fn pro_plan_creates_without_counting() {
        let (guard, store) = guard();
        let now = Utc::now();
        let ctx = ctx(PlanTier::Pro);

        guard.create_event(&ctx, request("One", now), now).unwrap();
        guard.create_event(&ctx, request("Two", now), now).unwrap();
        assert_eq!(store.user(ctx.user_id).unwrap().free_events_created, 0);
    }

    #[test]
    fn custom_theme_color_is_pro_only() {
        let (guard, _) = guard();
        let now = Utc::now();

        let mut req = request("Styled", now);
        req.theme_color = "#4c1d95".to_string();
        let denied = guard.create_event(&ctx(PlanTier::Free), req.clone(), now);
        assert!(matches!(denied, Err(AppError::FeatureLocked)));

        assert!(guard.create_event(&ctx(PlanTier::Pro), req, now).is_ok());
    }

    #[test]
    fn feature_lock_does_not_consume_quota() {
        let (guard, store) = guard();
        let now = Utc::now();
        let ctx = ctx(PlanTier::Free);

        let mut req = request("Styled", now);
        req.theme_color = "#4c1d95".to_string();
        let _ = guard.create_event(&ctx, req, now);
        assert_eq!(
            store.user(ctx.user_id).map(|u| u.free_events_created),
            Some(0)
        );
    }

    #[test]
    fn registration_path_rejections() {
        let (guard, _) = guard();
        let now = Utc::now();
        let organizer = ctx(PlanTier::Pro);
        let event = guard
            .create_event(&organizer, request("Gig", now), now)
            .unwrap();

        let attendee = ctx(PlanTier::Free);
        guard.register(&attendee, event.id, "Asha", now).unwrap();

        let dup = guard.register(&attendee, event.id, "Asha", now);
        assert!(matches!(dup, Err(AppError::AlreadyRegistered)));

        let blank = guard.register(&ctx(PlanTier::Free), event.id, "  ", now);
        assert!(matches!(blank, Err(AppError::ValidationError(_))));

        let missing = guard.register(&ctx(PlanTier::Free), Uuid::new_v4(), "X", now);
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn full_event_rejects_further_registrations() {
        let (guard, store) = guard();
        let now = Utc::now();
        let event = guard
            .create_event(&ctx(PlanTier::Pro), request("Tiny", now), now)
            .unwrap();

        for _ in 0..event.capacity {
            guard
                .register(&ctx(PlanTier::Free), event.id, "Guest", now)
                .unwrap();
        }
        let overflow = guard.register(&ctx(PlanTier::Free), event.id, "Guest", now);
        assert!(matches!(overflow, Err(AppError::EventFull)));
        assert_eq!(
            store.event(event.id).unwrap().registration_count,
            event.capacity
        );
    }

    #[test]
    fn ended_event_rejects_registration() {
        let (guard, _) = guard();
        let now = Utc::now();
        let event = guard
            .create_event(&ctx(PlanTier::Pro), request("Past", now), now)
            .unwrap();

        let later = event.end_date + Duration::hours(1);
        let late = guard.register(&ctx(PlanTier::Free), event.id, "Late", later);
        assert!(matches!(late, Err(AppError::EventEnded)));
    }

    #[test]
    fn cancellation_decrements_once_and_is_idempotent() {
        let (guard, store) = guard();
        let now = Utc::now();
        let event = guard
            .create_event(&ctx(PlanTier::Pro), request("Gig", now), now)
            .unwrap();
        let attendee = ctx(PlanTier::Free);
        let reg = guard.register(&attendee, event.id, "Asha", now).unwrap();
        assert_eq!(store.event(event.id).unwrap().registration_count, 1);

        let cancelled = guard.cancel(&attendee, reg.id, now).unwrap();
        assert!(cancelled.is_cancelled());
        assert_eq!(store.event(event.id).unwrap().registration_count, 0);

        // Second cancellation leaves the counter untouched.
        let again = guard.cancel(&attendee, reg.id, now).unwrap();
        assert!(again.is_cancelled());
        assert_eq!(store.event(event.id).unwrap().registration_count, 0);
        assert_eq!(store.confirmed_count(event.id), 0);
    }

    #[test]
    fn organizer_may_cancel_but_strangers_may_not() {
        let (guard, _) = guard();
        let now = Utc::now();
        let organizer = ctx(PlanTier::Pro);
        let event = guard
            .create_event(&organizer, request("Gig", now), now)
            .unwrap();
        let attendee = ctx(PlanTier::Free);
        let reg = guard.register(&attendee, event.id, "Asha", now).unwrap();

        let stranger = ctx(PlanTier::Free);
        assert!(matches!(
            guard.cancel(&stranger, reg.id, now),
            Err(AppError::Forbidden(_))
        ));

        assert!(guard.cancel(&organizer, reg.id, now).is_ok());
    }

    #[test]
    fn cancelled_seat_can_be_reregistered() {
        let (guard, _) = guard();
        let now = Utc::now();
        let event = guard
            .create_event(&ctx(PlanTier::Pro), request("Gig", now), now)
            .unwrap();
        let attendee = ctx(PlanTier::Free);

        let reg = guard.register(&attendee, event.id, "Asha", now).unwrap();
        guard.cancel(&attendee, reg.id, now).unwrap();
        assert!(guard.register(&attendee, event.id, "Asha", now).is_ok());
    }

    #[test]
    fn paid_price_round_trips() {
        let (guard, store) = guard();
        let now = Utc::now();
        let mut req = request("Concert", now);
        req.ticket_type = TicketType::Paid;
        req.ticket_price = Some(Decimal::from(500));

        let event = guard.create_event(&ctx(PlanTier::Pro), req, now).unwrap();
        let read_back = store.event_by_slug(&event.slug).unwrap();
        assert_eq!(read_back.ticket_price, Some(Decimal::from(500)));
        assert_eq!(read_back.ticket_type, TicketType::Paid);

        let free = guard
            .create_event(&ctx(PlanTier::Pro), request("Free gig", now), now)
            .unwrap();
        assert_eq!(store.event(free.id).unwrap().ticket_price, None);
    }

    #[test]
    fn commit_retries_conflicts_up_to_the_bound() {
        let (guard, _) = guard();
        let attempts = std::cell::Cell::new(0u32);

        let exhausted: Result<(), AppError> = guard.commit(|| {
            attempts.set(attempts.get() + 1);
            Err(StoreError::Conflict)
        });
        assert!(matches!(exhausted, Err(AppError::Conflict)));
        assert_eq!(attempts.get(), MAX_COMMIT_ATTEMPTS);

        attempts.set(0);
        let recovered = guard.commit(|| {
            attempts.set(attempts.get() + 1);
            if attempts.get() < MAX_COMMIT_ATTEMPTS {
                Err(StoreError::Conflict)
            } else {
                Ok("seated")
            }
        });
        assert_eq!(recovered.unwrap(), "seated");
    }

    #[test]
    fn commit_passes_business_rejections_through() {
        let (guard, _) = guard();
        let attempts = std::cell::Cell::new(0u32);

        let rejected: Result<(), AppError> = guard.commit(|| {
            attempts.set(attempts.get() + 1);
            Err(StoreError::EventFull)
        });
        assert!(matches!(rejected, Err(AppError::EventFull)));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn deleting_requires_the_organizer() {
        let (guard, store) = guard();
        let now = Utc::now();
        let organizer = ctx(PlanTier::Pro);
        let event = guard
            .create_event(&organizer, request("Mine", now), now)
            .unwrap();

        assert!(matches!(
            guard.delete_event(&ctx(PlanTier::Pro), event.id),
            Err(AppError::Forbidden(_))
        ));
        guard.delete_event(&organizer, event.id).unwrap();
        assert!(store.event(event.id).is_none());
    }
}
