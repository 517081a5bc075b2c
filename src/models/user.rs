use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Subscription level supplied by the identity provider on every request.
/// The service consults it but never computes or stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

#[derive(Debug, Error)]
#[error("unrecognized plan tier")]
pub struct ParsePlanTierError;

impl FromStr for PlanTier {
    type Err = ParsePlanTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            _ => Err(ParsePlanTierError),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Free events created so far; gates free-plan event creation.
    pub free_events_created: u32,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl User {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            free_events_created: 0,
            city: None,
            state: None,
            country: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_tier_parses_case_insensitively() {
        assert_eq!("free".parse::<PlanTier>().unwrap(), PlanTier::Free);
        assert_eq!(" Pro ".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert!("enterprise".parse::<PlanTier>().is_err());
    }
}
