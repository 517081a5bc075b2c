use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::user::PlanTier;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PLAN_TIER_HEADER: &str = "x-plan-tier";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// The identity provider's view of the caller, forwarded by the gateway as
/// request headers. Plan tier is taken verbatim; it is never computed here.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub plan: PlanTier,
    pub display_name: Option<String>,
}

impl AuthContext {
    pub fn organizer_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| "Event organizer".to_string())
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(format!("missing {USER_ID_HEADER} header"))
            })?;
        let user_id = Uuid::parse_str(user_id.trim()).map_err(|_| {
            AppError::AuthError(format!("{USER_ID_HEADER} must be a uuid"))
        })?;

        let plan = match headers.get(PLAN_TIER_HEADER) {
            None => PlanTier::Free,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| {
                    AppError::AuthError(format!(
                        "{PLAN_TIER_HEADER} must be 'free' or 'pro'"
                    ))
                })?,
        };

        let display_name = headers
            .get(USER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        Ok(Self {
            user_id,
            plan,
            display_name,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        AuthContext::from_headers(&parts.headers)
    }
}
