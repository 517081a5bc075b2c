use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

/// The one theme color available on the free plan.
pub const DEFAULT_THEME_COLOR: &str = "#1e3a8a";
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

const MIN_TITLE_LEN: usize = 3;
const MIN_DESCRIPTION_LEN: usize = 10;
const MAX_SLUG_BASE_LEN: usize = 60;
const SLUG_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Tech,
    Music,
    Business,
    Sports,
    Food,
    Arts,
    Gaming,
    Health,
    Education,
    Community,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Free,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Physical,
    Online,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub tags: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Display timezone only; calendar-window math uses the service-wide zone.
    pub timezone: String,
    pub capacity: u32,
    pub registration_count: u32,
    pub ticket_type: TicketType,
    pub ticket_price: Option<Decimal>,
    pub location_type: LocationType,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub venue: Option<String>,
    pub organizer_id: Uuid,
    pub organizer_name: String,
    pub cover_image: Option<String>,
    pub theme_color: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.registration_count >= self.capacity
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub capacity: u32,
    pub ticket_type: TicketType,
    pub ticket_price: Option<Decimal>,
    pub location_type: LocationType,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub venue: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_theme_color() -> String {
    DEFAULT_THEME_COLOR.to_string()
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(AppError::ValidationError(format!(
                "title must be at least {MIN_TITLE_LEN} characters"
            )));
        }
        if self.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            return Err(AppError::ValidationError(format!(
                "description must be at least {MIN_DESCRIPTION_LEN} characters"
            )));
        }
        if self.end_date <= self.start_date {
            return Err(AppError::ValidationError(
                "end date must be after start date".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(AppError::ValidationError(
                "capacity must be at least 1".to_string(),
            ));
        }
        match (self.ticket_type, self.ticket_price) {
            (TicketType::Paid, None) => {
                return Err(AppError::ValidationError(
                    "paid events require a ticket price".to_string(),
                ));
            }
            (TicketType::Paid, Some(price)) if price <= Decimal::ZERO => {
                return Err(AppError::ValidationError(
                    "ticket price must be positive".to_string(),
                ));
            }
            (TicketType::Free, Some(_)) => {
                return Err(AppError::ValidationError(
                    "free events must not set a ticket price".to_string(),
                ));
            }
            _ => {}
        }
        if self.location_type == LocationType::Physical
            && self.city.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(AppError::ValidationError(
                "physical events require a city".to_string(),
            ));
        }
        if !is_hex_color(&self.theme_color) {
            return Err(AppError::ValidationError(
                "theme color must be a #rrggbb value".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_event(
        self,
        organizer_id: Uuid,
        organizer_name: String,
        now: DateTime<Utc>,
    ) -> Event {
        let title = self.title.trim().to_string();
        let slug = slug_candidate(&title);
        Event {
            id: Uuid::new_v4(),
            slug,
            title,
            description: self.description.trim().to_string(),
            category: self.category,
            tags: normalize_tags(self.tags),
            start_date: self.start_date,
            end_date: self.end_date,
            timezone: self.timezone,
            capacity: self.capacity,
            registration_count: 0,
            ticket_type: self.ticket_type,
            ticket_price: self.ticket_price,
            location_type: self.location_type,
            city: normalize_opt(self.city),
            state: normalize_opt(self.state),
            address: normalize_opt(self.address),
            venue: normalize_opt(self.venue),
            organizer_id,
            organizer_name,
            cover_image: normalize_opt(self.cover_image),
            theme_color: self.theme_color,
            created_at: now,
        }
    }
}

/// Derives a URL slug from the title plus a short random suffix. The suffix
/// keeps independently created events with identical titles apart; the store
/// still verifies uniqueness before committing.
pub fn slug_candidate(title: &str) -> String {
    let mut base = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if base.len() >= MAX_SLUG_BASE_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            if pending_dash && !base.is_empty() {
                base.push('-');
            }
            pending_dash = false;
            base.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn normalize_opt(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
