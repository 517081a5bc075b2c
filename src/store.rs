use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::event::{slug_candidate, Event};
use crate::models::registration::{Registration, RegistrationStatus};
use crate::models::user::User;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("event does not exist")]
    EventNotFound,

    #[error("registration does not exist")]
    RegistrationNotFound,

    #[error("event is at capacity")]
    EventFull,

    #[error("event has already ended")]
    EventEnded,

    #[error("an active registration already exists for this attendee")]
    AlreadyRegistered,

    #[error("free event quota exhausted")]
    QuotaExceeded,

    #[error("a concurrent write invalidated this commit")]
    Conflict,
}

/// Free-plan quota enforced inside the event-creation transaction.
#[derive(Debug, Clone, Copy)]
pub struct FreeQuota {
    pub user_id: Uuid,
    pub limit: u32,
}

#[derive(Default)]
struct StoreInner {
    events: HashMap<Uuid, Event>,
    slugs: HashMap<String, Uuid>,
    registrations: HashMap<Uuid, Registration>,
    /// qr token -> registration; entries survive cancellation so a cancelled
    /// ticket can still be identified at the door.
    by_token: HashMap<String, Uuid>,
    /// (user, event) -> confirmed registration; removed on cancellation.
    active_by_attendee: HashMap<(Uuid, Uuid), Uuid>,
    users: HashMap<Uuid, User>,
}

/// In-process store for events, registrations, and user counters.
///
/// Every capacity-affecting write validates its preconditions and mutates
/// inside one write-lock critical section, so conflicting writes (two
/// registrations racing for the last seat, two creations racing for the last
/// free-plan slot) serialize and at most one succeeds. Reads clone snapshots
/// under the read lock and never observe a half-applied write.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections contain no panicking operations, so a poisoned lock
    // can only come from a panicking test; the data is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- users ----

    pub fn get_or_create_user(&self, id: Uuid) -> User {
        let mut inner = self.write();
        inner.users.entry(id).or_insert_with(|| User::new(id)).clone()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.read().users.get(&id).cloned()
    }

    pub fn update_user_location(
        &self,
        id: Uuid,
        city: Option<String>,
        state: Option<String>,
        country: Option<String>,
    ) -> User {
        let mut inner = self.write();
        let user = inner.users.entry(id).or_insert_with(|| User::new(id));
        user.city = city;
        user.state = state;
        user.country = country;
        user.clone()
    }

    // ---- events ----

    /// Inserts the event, enforcing the free-plan quota and incrementing the
    /// creator's counter in the same transaction when `quota` is given. The
    /// counter check and the insert cannot interleave with a concurrent
    /// creation by the same user.
    pub fn create_event(
        &self,
        mut event: Event,
        quota: Option<FreeQuota>,
    ) -> Result<Event, StoreError> {
        let mut inner = self.write();

        if let Some(q) = quota {
            let created = inner
                .users
                .get(&q.user_id)
                .map(|u| u.free_events_created)
                .unwrap_or(0);
            if created >= q.limit {
                return Err(StoreError::QuotaExceeded);
            }
        }

        // The random suffix makes collisions vanishingly rare; regenerate on
        // the off chance anyway.
        while inner.slugs.contains_key(&event.slug) {
            event.slug = slug_candidate(&event.title);
        }
        inner.slugs.insert(event.slug.clone(), event.id);
        inner.events.insert(event.id, event.clone());

        if let Some(q) = quota {
            let user = inner
                .users
                .entry(q.user_id)
                .or_insert_with(|| User::new(q.user_id));
            user.free_events_created += 1;
        }

        Ok(event)
    }

    pub fn event(&self, id: Uuid) -> Option<Event> {
        self.read().events.get(&id).cloned()
    }

    pub fn event_by_slug(&self, slug: &str) -> Option<Event> {
        let inner = self.read();
        let id = inner.slugs.get(slug)?;
        inner.events.get(id).cloned()
    }

    pub fn events(&self) -> Vec<Event> {
        self.read().events.values().cloned().collect()
    }

    pub fn events_by_organizer(&self, organizer_id: Uuid) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .read()
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        events
    }

    /// Removes the event and cascades deletion of all its registrations.
    pub fn delete_event(&self, id: Uuid) -> Result<Event, StoreError> {
        let mut inner = self.write();
        let event = inner.events.remove(&id).ok_or(StoreError::EventNotFound)?;
        inner.slugs.remove(&event.slug);

        let doomed: Vec<Uuid> = inner
            .registrations
            .values()
            .filter(|r| r.event_id == id)
            .map(|r| r.id)
            .collect();
        for registration_id in doomed {
            if let Some(reg) = inner.registrations.remove(&registration_id) {
                inner.by_token.remove(&reg.qr_code);
                inner.active_by_attendee.remove(&(reg.user_id, reg.event_id));
            }
        }

        Ok(event)
    }

    // ---- registrations ----

    /// Inserts the registration and increments the event's counter as one
    /// transaction. All seat preconditions are re-evaluated under the write
    /// lock, so N concurrent attempts at k remaining seats admit exactly k.
    pub fn insert_registration(
        &self,
        mut registration: Registration,
        now: DateTime<Utc>,
    ) -> Result<Registration, StoreError> {
        let mut inner = self.write();

        {
            let event = inner
                .events
                .get(&registration.event_id)
                .ok_or(StoreError::EventNotFound)?;
            if event.has_ended(now) {
                return Err(StoreError::EventEnded);
            }
            if inner
                .active_by_attendee
                .contains_key(&(registration.user_id, registration.event_id))
            {
                return Err(StoreError::AlreadyRegistered);
            }
            if event.is_full() {
                return Err(StoreError::EventFull);
            }
        }

        let event = inner
            .events
            .get_mut(&registration.event_id)
            .ok_or(StoreError::EventNotFound)?;
        event.registration_count += 1;

        // Same treatment as slugs: door tokens are unique, colliding ones
        // are regenerated under the write lock.
        while inner.by_token.contains_key(&registration.qr_code) {
            registration.qr_code = crate::ticket::mint_token();
        }
        inner
            .by_token
            .insert(registration.qr_code.clone(), registration.id);
        inner.active_by_attendee.insert(
            (registration.user_id, registration.event_id),
            registration.id,
        );
        inner
            .registrations
            .insert(registration.id, registration.clone());

        Ok(registration)
    }

    /// Marks the registration cancelled and decrements the event's counter.
    /// Cancelling an already-cancelled registration is a no-op, not an error.
    pub fn cancel_registration(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Registration, StoreError> {
        let mut inner = self.write();

        let (event_id, user_id) = {
            let reg = inner
                .registrations
                .get(&id)
                .ok_or(StoreError::RegistrationNotFound)?;
            if reg.is_cancelled() {
                return Ok(reg.clone());
            }
            (reg.event_id, reg.user_id)
        };

        if let Some(event) = inner.events.get_mut(&event_id) {
            event.registration_count = event.registration_count.checked_sub(1).unwrap_or_else(|| {
                tracing::error!(event_id = %event_id, "registration counter underflow");
                0
            });
        }
        inner.active_by_attendee.remove(&(user_id, event_id));

        let reg = inner
            .registrations
            .get_mut(&id)
            .ok_or(StoreError::RegistrationNotFound)?;
        reg.status = RegistrationStatus::Cancelled;
        reg.cancelled_at = Some(now);
        Ok(reg.clone())
    }

    pub fn registration(&self, id: Uuid) -> Option<Registration> {
        self.read().registrations.get(&id).cloned()
    }

    pub fn registration_by_token(&self, token: &str) -> Option<Registration> {
        let inner = self.read();
        let id = inner.by_token.get(token)?;
        inner.registrations.get(id).cloned()
    }

    pub fn active_registration_for(&self, user_id: Uuid, event_id: Uuid) -> Option<Registration> {
        let inner = self.read();
        let id = inner.active_by_attendee.get(&(user_id, event_id))?;
        inner.registrations.get(id).cloned()
    }

    pub fn registrations_for_event(&self, event_id: Uuid) -> Vec<Registration> {
        let mut regs: Vec<Registration> = self
            .read()
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        regs.sort_by_key(|r| r.created_at);
        regs
    }

    pub fn registrations_for_user(&self, user_id: Uuid) -> Vec<Registration> {
        let mut regs: Vec<Registration> = self
            .read()
            .registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        regs.sort_by_key(|r| r.created_at);
        regs
    }

    /// Confirmed registrations on record for the event; the denormalized
    /// counter must always agree with this.
    pub fn confirmed_count(&self, event_id: Uuid) -> usize {
        self.read()
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && !r.is_cancelled())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{
        CreateEventRequest, EventCategory, LocationType, TicketType, DEFAULT_THEME_COLOR,
        DEFAULT_TIMEZONE,
    };
    use chrono::Duration;

    fn sample_event(title: &str, organizer: Uuid, now: DateTime<Utc>) -> Event {
        CreateEventRequest {
            title: title.to_string(),
            description: "A long enough description.".to_string(),
            category: EventCategory::Tech,
            tags: vec![],
            start_date: now + Duration::days(3),
            end_date: now + Duration::days(3) + Duration::hours(2),
            timezone: DEFAULT_TIMEZONE.to_string(),
            capacity: 2,
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
        .into_event(organizer, "Organizer".to_string(), now)
    }

    fn register(store: &Store, event_id: Uuid, now: DateTime<Utc>) -> Registration {
        store
            .insert_registration(
                Registration::new(
                    event_id,
                    Uuid::new_v4(),
                    "Attendee".to_string(),
                    crate::ticket::mint_token(),
                    now,
                ),
                now,
            )
            .unwrap()
    }

    #[test]
    fn slug_collisions_are_resolved_at_insert() {
        let store = Store::new();
        let now = Utc::now();
        let organizer = Uuid::new_v4();
        let mut a = sample_event("Duplicate", organizer, now);
        let mut b = sample_event("Duplicate", organizer, now);
        b.slug = a.slug.clone();
        a = store.create_event(a, None).unwrap();
        b = store.create_event(b, None).unwrap();
        assert_ne!(a.slug, b.slug);
        assert_eq!(store.event_by_slug(&b.slug).unwrap().id, b.id);
    }

    #[test]
    fn token_collisions_are_resolved_at_insert() {
        let store = Store::new();
        let now = Utc::now();
        let event = store
            .create_event(sample_event("Door", Uuid::new_v4(), now), None)
            .unwrap();

        let first = register(&store, event.id, now);
        let clash = store
            .insert_registration(
                Registration::new(
                    event.id,
                    Uuid::new_v4(),
                    "Attendee".to_string(),
                    first.qr_code.clone(),
                    now,
                ),
                now,
            )
            .unwrap();

        assert_ne!(clash.qr_code, first.qr_code);
        assert_eq!(store.registration_by_token(&first.qr_code).unwrap().id, first.id);
        assert_eq!(store.registration_by_token(&clash.qr_code).unwrap().id, clash.id);
    }

    #[test]
    fn quota_is_checked_and_counted_in_one_transaction() {
        let store = Store::new();
        let now = Utc::now();
        let user = Uuid::new_v4();
        let quota = Some(FreeQuota { user_id: user, limit: 1 });

        store
            .create_event(sample_event("First", user, now), quota)
            .unwrap();
        assert_eq!(store.user(user).unwrap().free_events_created, 1);

        let second = store.create_event(sample_event("Second", user, now), quota);
        assert_eq!(second.unwrap_err(), StoreError::QuotaExceeded);
        assert_eq!(store.user(user).unwrap().free_events_created, 1);
    }

    #[test]
    fn capacity_is_enforced_at_insert() {
        let store = Store::new();
        let now = Utc::now();
        let event = store
            .create_event(sample_event("Small", Uuid::new_v4(), now), None)
            .unwrap();

        register(&store, event.id, now);
        register(&store, event.id, now);
        let third = store.insert_registration(
            Registration::new(
                event.id,
                Uuid::new_v4(),
                "Late".to_string(),
                crate::ticket::mint_token(),
                now,
            ),
            now,
        );
        assert_eq!(third.unwrap_err(), StoreError::EventFull);
        assert_eq!(store.event(event.id).unwrap().registration_count, 2);
        assert_eq!(store.confirmed_count(event.id), 2);
    }

    #[test]
    fn duplicate_active_registration_is_rejected() {
        let store = Store::new();
        let now = Utc::now();
        let event = store
            .create_event(sample_event("Dup", Uuid::new_v4(), now), None)
            .unwrap();
        let user = Uuid::new_v4();

        let make = |token: String| {
            Registration::new(event.id, user, "Same person".to_string(), token, now)
        };
        store
            .insert_registration(make(crate::ticket::mint_token()), now)
            .unwrap();
        let dup = store.insert_registration(make(crate::ticket::mint_token()), now);
        assert_eq!(dup.unwrap_err(), StoreError::AlreadyRegistered);
    }

    #[test]
    fn cancelled_tickets_remain_findable_by_token() {
        let store = Store::new();
        let now = Utc::now();
        let event = store
            .create_event(sample_event("Keep", Uuid::new_v4(), now), None)
            .unwrap();
        let reg = register(&store, event.id, now);

        store.cancel_registration(reg.id, now).unwrap();
        let found = store.registration_by_token(&reg.qr_code).unwrap();
        assert!(found.is_cancelled());
        assert!(found.cancelled_at.is_some());
    }

    #[test]
    fn deleting_an_event_cascades_to_registrations() {
        let store = Store::new();
        let now = Utc::now();
        let event = store
            .create_event(sample_event("Doomed", Uuid::new_v4(), now), None)
            .unwrap();
        let reg = register(&store, event.id, now);

        store.delete_event(event.id).unwrap();
        assert!(store.event(event.id).is_none());
        assert!(store.event_by_slug(&event.slug).is_none());
        assert!(store.registration(reg.id).is_none());
        assert!(store.registration_by_token(&reg.qr_code).is_none());
        assert_eq!(
            store.delete_event(event.id).unwrap_err(),
            StoreError::EventNotFound
        );
    }
}
