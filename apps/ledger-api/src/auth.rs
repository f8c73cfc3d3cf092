//! JWT authentication module.
//!
//! Handles token minting and validation, and turns the bearer token of a
//! request into the [`Caller`] every ledger operation runs as.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Authorization: Bearer <jwt>                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  extract_bearer_token ── missing/malformed ──► 401 UNAUTHENTICATED      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  JwtManager::validate ── bad signature/expired ──► 401                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Claims::into_caller ── non-admin without tenant ──► 403 FORBIDDEN      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Authenticated(Caller) ──► handler                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use tillpoint_core::{Caller, CoreResult, Role};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,

    pub username: String,

    pub role: Role,

    /// Tenant ID; absent only for global super admins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    /// Builds the caller the token stands for.
    pub fn into_caller(self) -> CoreResult<Caller> {
        Caller::new(self.sub, self.username, self.role, self.tenant_id, self.branch_id)
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Mint a token for a caller.
    pub fn issue(&self, caller: &Caller) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: caller.user_id().to_string(),
            username: caller.username().to_string(),
            role: caller.role(),
            tenant_id: caller.tenant_id().map(str::to_string),
            branch_id: caller.branch_id().map(str::to_string),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::unauthenticated(format!("Invalid token: {}", e))
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and resolve its caller.
    pub fn authenticate(&self, token: &str) -> Result<Caller, ApiError> {
        let claims = self.validate(token)?;
        Ok(claims.into_caller()?)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller of a request.
///
/// ```rust,ignore
/// async fn handler(Authenticated(caller): Authenticated) -> ApiResult<..> { .. }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("Missing Authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthenticated("Expected a Bearer token"))?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        jwt.authenticate(token).map(Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn cashier() -> Caller {
        Caller::new("u-1", "alice", Role::Cashier, Some("t-a".into()), Some("b-1".into())).unwrap()
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);

        let token = manager.issue(&cashier()).unwrap();
        let caller = manager.authenticate(&token).unwrap();

        assert_eq!(caller, cashier());
    }

    #[test]
    fn test_wrong_secret_is_unauthenticated() {
        let token = JwtManager::new("secret-a", 3600).issue(&cashier()).unwrap();
        let err = JwtManager::new("secret-b", 3600).validate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_expired_token() {
        // Default validation allows 60s of leeway.
        let manager = JwtManager::new("test-secret", -120);
        let token = manager.issue(&cashier()).unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn test_token_without_tenant_for_manager_is_forbidden() {
        let manager = JwtManager::new("test-secret", 3600);
        let claims = Claims {
            sub: "u-2".into(),
            username: "bob".into(),
            role: Role::Manager,
            tenant_id: None,
            branch_id: None,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )
        .unwrap();

        let err = manager.authenticate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic dXNlcg=="), None);
    }
}
