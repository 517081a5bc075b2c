use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc, Weekday};
use serde::Deserialize;

use crate::models::event::{Event, EventCategory, LocationType};
use crate::store::Store;

pub const FEATURED_LIMIT: usize = 3;
pub const POPULAR_LIMIT: usize = 6;
pub const BROWSE_LIMIT: usize = 20;
pub const LOCATION_LIMIT: usize = 4;
pub const CATEGORY_LIMIT: usize = 12;
pub const SEARCH_LIMIT: usize = 5;

/// Queries shorter than this return nothing rather than matching everything.
const MIN_SEARCH_LEN: usize = 2;

/// All calendar windows ("today", "this weekend") are computed in IST; the
/// product serves India and event times are displayed in that zone.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is in range")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "this-weekend")]
    ThisWeekend,
    #[serde(rename = "next-7-days")]
    Next7Days,
    #[serde(rename = "online")]
    Online,
}

/// Read-only filtering and ranking over the event collection. Every listing
/// works on a snapshot, excludes events that have already started, and has no
/// side effects.
#[derive(Clone)]
pub struct Discovery {
    store: Store,
}

impl Discovery {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn upcoming_snapshot(&self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = self.store.events();
        events.retain(|e| e.start_date >= now);
        events
    }

    /// Upcoming events ranked by popularity; serves the featured and popular
    /// rails as well as the generic upcoming listing.
    pub fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Vec<Event> {
        let mut events = self.upcoming_snapshot(now);
        events.sort_by(rank_popular);
        events.truncate(limit);
        events
    }

    /// Upcoming events in the caller's city, falling back to state matching
    /// when no city is given. Matching is case-insensitive and exact.
    pub fn by_location(
        &self,
        now: DateTime<Utc>,
        city: Option<&str>,
        state: Option<&str>,
        limit: usize,
    ) -> Vec<Event> {
        let mut events = self.upcoming_snapshot(now);
        if let Some(city) = city {
            let city = city.to_lowercase();
            events.retain(|e| {
                e.city
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == city)
            });
        } else if let Some(state) = state {
            let state = state.to_lowercase();
            events.retain(|e| {
                e.state
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase() == state)
            });
        }
        finish_by_start(events, limit)
    }

    pub fn by_category(
        &self,
        now: DateTime<Utc>,
        category: EventCategory,
        limit: usize,
    ) -> Vec<Event> {
        let mut events = self.upcoming_snapshot(now);
        events.retain(|e| e.category == category);
        finish_by_start(events, limit)
    }

    pub fn by_window(&self, now: DateTime<Utc>, window: TimeWindow, limit: usize) -> Vec<Event> {
        let mut events = self.upcoming_snapshot(now);
        events.retain(|e| in_window(e, window, now));
        finish_by_start(events, limit)
    }

    /// Combined category/window browse backing the explore page.
    pub fn browse(
        &self,
        now: DateTime<Utc>,
        category: Option<EventCategory>,
        window: Option<TimeWindow>,
        limit: usize,
    ) -> Vec<Event> {
        let mut events = self.upcoming_snapshot(now);
        if let Some(category) = category {
            events.retain(|e| e.category == category);
        }
        if let Some(window) = window {
            events.retain(|e| in_window(e, window, now));
        }
        finish_by_start(events, limit)
    }

    /// Upcoming event count per category; categories with no upcoming events
    /// are omitted.
    pub fn category_counts(&self, now: DateTime<Utc>) -> BTreeMap<EventCategory, usize> {
        let mut counts = BTreeMap::new();
        for event in self.upcoming_snapshot(now) {
            *counts.entry(event.category).or_insert(0) += 1;
        }
        counts
    }

    /// Case-insensitive substring match over event titles.
    pub fn search(&self, now: DateTime<Utc>, query: &str, limit: usize) -> Vec<Event> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        let mut events = self.upcoming_snapshot(now);
        events.retain(|e| e.title.to_lowercase().contains(&needle));
        finish_by_start(events, limit)
    }
}

/// Popularity ordering: most registrations first, earliest start breaking
/// ties so the result order is deterministic.
fn rank_popular(a: &Event, b: &Event) -> Ordering {
    b.registration_count
        .cmp(&a.registration_count)
        .then_with(|| a.start_date.cmp(&b.start_date))
}

fn finish_by_start(mut events: Vec<Event>, limit: usize) -> Vec<Event> {
    events.sort_by_key(|e| e.start_date);
    events.truncate(limit);
    events
}

fn in_window(event: &Event, window: TimeWindow, now: DateTime<Utc>) -> bool {
    match window {
        TimeWindow::Today => {
            let (start, end) = today_bounds(now);
            event.start_date >= start && event.start_date < end
        }
        TimeWindow::ThisWeekend => {
            let (start, end) = weekend_bounds(now);
            event.start_date >= start && event.start_date < end
        }
        TimeWindow::Next7Days => {
            event.start_date >= now && event.start_date <= now + Duration::days(7)
        }
        TimeWindow::Online => event.location_type == LocationType::Online,
    }
}

/// [IST midnight of today, IST midnight of tomorrow), as UTC instants.
fn today_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = ist_midnight(now.with_timezone(&ist()).date_naive());
    (start, start + Duration::days(1))
}

/// Saturday 00:00 IST of the selected weekend through the end of its Sunday.
/// A `now` falling on Saturday or Sunday selects the weekend in progress.
fn weekend_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_date = now.with_timezone(&ist()).date_naive();
    let days_to_saturday: i64 = match local_date.weekday() {
        Weekday::Sun => -1,
        wd => i64::from(Weekday::Sat.num_days_from_monday())
            - i64::from(wd.num_days_from_monday()),
    };
    let start = ist_midnight(local_date + Duration::days(days_to_saturday));
    (start, start + Duration::days(2))
}

fn ist_midnight(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight exists on every date")
        .and_local_timezone(ist())
        .single()
        .expect("fixed offsets are unambiguous")
        .with_timezone(&Utc)
}
