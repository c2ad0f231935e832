/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWT authentication for the food-ordering API.
 *
 * - [`AuthService`] issues and validates HS256 tokens and resolves them to
 *   the current user record.
 * - [`auth_middleware`] runs on every request; when an `Authorization`
 *   header is present it must carry a valid token for an active user.
 * - [`AuthUser`] is the extractor handlers use to require authentication.
 * - [`policy`] maps roles to capabilities.
 */

use crate::{
    config::AppConfig,
    entities::{user, Role},
    errors::{ErrorResponse, ServiceError},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

mod password;
pub mod policy;

pub use password::{hash_password, verify_password};
pub use policy::{allows, Capability};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub username: String, // Username at issue time
    pub role: Role,       // Role at issue time; requests use the stored role
    pub jti: String,      // JWT ID (unique identifier for this token)
    pub iat: i64,         // Issued at time
    pub exp: i64,         // Expiration time
    pub nbf: i64,         // Not valid before time
    pub iss: String,      // Issuer
    pub aud: String,      // Audience
}

/// Authenticated caller, resolved from the token and the users table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

/// A freshly signed access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Signs an access token for `user`.
    pub fn issue_token(&self, user: &user::Model) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.config.access_token_expiration.as_secs(),
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!(error = %e, "Rejected bearer token");
                AuthError::InvalidToken
            }
        })
    }

    /// Resolves a bearer token to the current, active user.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id: i32 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load user for token");
                AuthError::DatabaseError(e.to_string())
            })?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            warn!(user_id, "Token presented for inactive account");
            return Err(AuthError::InactiveAccount);
        }

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Account is inactive")]
    InactiveAccount,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required",
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token",
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired",
            ),
            // A token for a deleted user is just an invalid token to the caller
            Self::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token",
            ),
            Self::InactiveAccount => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INACTIVE_ACCOUNT",
                "Account is inactive",
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Internal server error",
            ),
            Self::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_DATABASE_ERROR",
                "Internal server error",
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error",
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!(error = %self, "authentication failed");
        }

        let body = ErrorResponse {
            error: json!({
                "code": code,
                "message": message,
            }),
            request_id: crate::tracing::current_request_id().map(|id| id.0),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
            AuthError::DatabaseError(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authentication middleware that extracts and validates bearer tokens.
///
/// Requests without an `Authorization` header pass through anonymously; the
/// [`AuthUser`] extractor rejects them where authentication is required.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = match value.to_str().ok().and_then(bearer_token) {
        Some(token) => token.to_string(),
        None => return AuthError::InvalidToken.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "Xq7vN2pL9wR4tY6uK8mB3cF5hJ1gD0sZaQeWrTyUiOpLkJhGfDsAzXcVbNm24680";

    async fn service() -> AuthService {
        let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1);
        let db = sea_orm::Database::connect(opt).await.unwrap();
        AuthService::new(
            AuthConfig::new(
                SECRET.into(),
                "foodcart-client".into(),
                "foodcart-api".into(),
                Duration::from_secs(3600),
            ),
            Arc::new(db),
        )
    }

    fn sample_user(id: i32, role: Role) -> user::Model {
        let now = Utc::now();
        user::Model {
            id,
            username: format!("user{}", id),
            email: None,
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn issued_tokens_validate() {
        let auth = service().await;
        let issued = auth.issue_token(&sample_user(3, Role::Admin)).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = auth.validate_token(&issued.access_token).unwrap();
        assert_eq!(claims.sub, "3");
        assert_eq!(claims.username, "user3");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.aud, "foodcart-client");
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let auth = service().await;
        let mut other = auth.clone();
        other.config.jwt_secret = SECRET.chars().rev().collect();
        let issued = other.issue_token(&sample_user(1, Role::Customer)).unwrap();

        assert_matches!(
            auth.validate_token(&issued.access_token),
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn tokens_for_another_audience_are_rejected() {
        let auth = service().await;
        let mut other = auth.clone();
        other.config.jwt_audience = "someone-else".into();
        let issued = other.issue_token(&sample_user(1, Role::Customer)).unwrap();

        assert_matches!(
            auth.validate_token(&issued.access_token),
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn garbage_is_not_a_token() {
        let auth = service().await;
        assert_matches!(auth.validate_token("abc.def.ghi"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn bearer_scheme_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn auth_errors_map_to_service_errors() {
        assert_matches!(
            ServiceError::from(AuthError::InvalidCredentials),
            ServiceError::Unauthorized(_)
        );
        assert_matches!(
            ServiceError::from(AuthError::TokenCreation("x".into())),
            ServiceError::InternalError(_)
        );
    }
}
