//! Sample data for local development, loaded when `SPOTT_DEMO_SEED` is set.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::guard::CapacityGuard;
use crate::models::event::{
    CreateEventRequest, EventCategory, LocationType, TicketType, DEFAULT_THEME_COLOR,
    DEFAULT_TIMEZONE,
};
use crate::models::user::PlanTier;
use crate::store::Store;
use crate::utils::auth::AuthContext;

struct SeedEvent {
    title: &'static str,
    description: &'static str,
    category: EventCategory,
    tags: &'static [&'static str],
    days_out: i64,
    duration_hours: i64,
    capacity: u32,
    price: Option<u32>,
    city: Option<(&'static str, &'static str)>,
}

const SEED_EVENTS: &[SeedEvent] = &[
    SeedEvent {
        title: "React 19 Workshop: Master the New Features",
        description: "Hands-on workshop covering the Actions API, server components, \
                      and migration strategies from React 18. Bring your laptop.",
        category: EventCategory::Tech,
        tags: &["tech", "react", "frontend"],
        days_out: 5,
        duration_hours: 6,
        capacity: 50,
        price: None,
        city: Some(("Bangalore", "Karnataka")),
    },
    SeedEvent {
        title: "AI & Machine Learning Meetup: Building with LLMs",
        description: "Prompt engineering, RAG applications, and real-world demos. \
                      Network with fellow AI enthusiasts; Q&A session included.",
        category: EventCategory::Tech,
        tags: &["tech", "ai", "llm"],
        days_out: 9,
        duration_hours: 3,
        capacity: 100,
        price: None,
        city: Some(("Hyderabad", "Telangana")),
    },
    SeedEvent {
        title: "Indie Music Night: Acoustic Sessions",
        description: "An evening of unplugged performances by indie artists from \
                      across India, with an open mic and artist meet & greet.",
        category: EventCategory::Music,
        tags: &["music", "indie", "live"],
        days_out: 12,
        duration_hours: 4,
        capacity: 120,
        price: Some(499),
        city: Some(("Mumbai", "Maharashtra")),
    },
    SeedEvent {
        title: "Remote Careers AMA",
        description: "A live online Q&A on landing and keeping remote roles, with \
                      hiring managers from three distributed companies.",
        category: EventCategory::Business,
        tags: &["business", "careers", "remote"],
        days_out: 3,
        duration_hours: 2,
        capacity: 500,
        price: None,
        city: None,
    },
];

/// Creates the sample events through the guarded creation path so seeded data
/// obeys the same invariants as user data.
pub fn load_demo_events(store: &Store) {
    let guard = CapacityGuard::new(store.clone());
    let organizer = AuthContext {
        user_id: Uuid::new_v4(),
        plan: PlanTier::Pro,
        display_name: Some("Spott Team".to_string()),
    };
    let now = Utc::now();

    for seed in SEED_EVENTS {
        let start = now + Duration::days(seed.days_out);
        let request = CreateEventRequest {
            title: seed.title.to_string(),
            description: seed.description.to_string(),
            category: seed.category,
            tags: seed.tags.iter().map(|t| t.to_string()).collect(),
            start_date: start,
            end_date: start + Duration::hours(seed.duration_hours),
            timezone: DEFAULT_TIMEZONE.to_string(),
            capacity: seed.capacity,
            ticket_type: if seed.price.is_some() {
                TicketType::Paid
            } else {
                TicketType::Free
            },
            ticket_price: seed.price.map(Decimal::from),
            location_type: if seed.city.is_some() {
                LocationType::Physical
            } else {
                LocationType::Online
            },
            city: seed.city.map(|(c, _)| c.to_string()),
            state: seed.city.map(|(_, s)| s.to_string()),
            address: None,
            venue: None,
            cover_image: None,
            theme_color: DEFAULT_THEME_COLOR.to_string(),
        };

        match guard.create_event(&organizer, request, now) {
            Ok(event) => tracing::info!(slug = %event.slug, "seeded demo event"),
            Err(e) => tracing::warn!(title = seed.title, error = %e, "failed to seed event"),
        }
    }
}
