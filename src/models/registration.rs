use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
}

/// One attendee's claim on one seat of an event. `qr_code` is the opaque
/// check-in token minted at creation and never rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub attendee_name: String,
    pub status: RegistrationStatus,
    pub qr_code: String,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Registration {
    pub fn new(
        event_id: Uuid,
        user_id: Uuid,
        attendee_name: String,
        qr_code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            attendee_name,
            status: RegistrationStatus::Confirmed,
            qr_code,
            created_at: now,
            cancelled_at: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RegistrationStatus::Cancelled
    }
}
