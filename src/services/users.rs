use crate::{
    auth::{hash_password, verify_password, AuthError, AuthService},
    entities::{user, Role},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::validate_email as validate_email_address;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// Public view of a user account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignUpInput {
    #[schema(example = "jane.doe")]
    pub username: String,
    #[schema(example = "correct-horse-battery")]
    pub password: String,
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignInInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    pub user: UserView,
}

pub fn validate_username(username: &str) -> Result<String, ServiceError> {
    let username = username.trim();
    let len = username.chars().count();
    if len == 0 || len > MAX_USERNAME_LEN {
        return Err(ServiceError::ValidationError(format!(
            "username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ServiceError::ValidationError(
            "username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Blank emails are treated as absent.
pub fn validate_email(email: Option<&str>) -> Result<Option<String>, ServiceError> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    if !validate_email_address(email) {
        return Err(ServiceError::ValidationError(
            "email is not a valid address".to_string(),
        ));
    }
    Ok(Some(email.to_lowercase()))
}

/// Account registration, sign-in and administration.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Registers a customer account.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn sign_up(&self, input: SignUpInput) -> Result<UserView, ServiceError> {
        self.create_user(
            &input.username,
            &input.password,
            input.email.as_deref(),
            Role::Customer,
        )
        .await
    }

    /// Creates an account with an explicit role.
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<UserView, ServiceError> {
        let username = validate_username(username)?;
        validate_password(password)?;
        let email = validate_email(email)?;

        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .one(&*self.db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username {} is already taken",
                username
            )));
        }
        if let Some(email) = email.as_deref() {
            let taken = user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(&*self.db)
                .await?;
            if taken.is_some() {
                return Err(ServiceError::Conflict(
                    "Email is already registered".to_string(),
                ));
            }
        }

        let password_hash = hash_password(password)?;
        let now = Utc::now();
        let created = user::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| match ServiceError::from(e) {
            err if err.is_unique_violation() => {
                ServiceError::Conflict("Username or email is already registered".to_string())
            }
            err => err,
        })?;

        info!(user_id = created.id, role = role.as_ref(), "Created user");
        Ok(created.into())
    }

    /// Checks credentials and issues an access token.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn sign_in(&self, input: SignInInput) -> Result<TokenResponse, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(input.username.trim()))
            .one(&*self.db)
            .await?;

        let Some(found) = found else {
            warn!("Sign-in for unknown username");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !verify_password(&input.password, &found.password_hash)? {
            warn!(user_id = found.id, "Sign-in with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !found.is_active {
            warn!(user_id = found.id, "Sign-in for inactive account");
            return Err(AuthError::InactiveAccount.into());
        }

        let issued = self.auth.issue_token(&found)?;
        info!(user_id = found.id, "User signed in");
        Ok(TokenResponse {
            access_token: issued.access_token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
            user: found.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserView>, ServiceError> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    /// Flips a user's `is_active` flag. `actor_id` may not deactivate itself.
    #[instrument(skip(self))]
    pub async fn toggle_user_status(
        &self,
        actor_id: i32,
        user_id: i32,
    ) -> Result<UserView, ServiceError> {
        if actor_id == user_id {
            return Err(ServiceError::ValidationError(
                "You cannot change the status of your own account".to_string(),
            ));
        }

        let found = self.find_by_id(user_id).await?;
        let is_active = !found.is_active;

        let mut active: user::ActiveModel = found.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(actor_id, user_id, is_active, "Toggled user status");
        Ok(updated.into())
    }

    /// Changes the role of the user named `username`.
    #[instrument(skip(self))]
    pub async fn set_role(&self, username: &str, role: Role) -> Result<UserView, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", username)))?;

        let mut active: user::ActiveModel = found.into();
        active.role = Set(role);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(user_id = updated.id, role = role.as_ref(), "Changed user role");
        Ok(updated.into())
    }

    async fn find_by_id(&self, user_id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("alice")]
    #[case("bob.smith+food@home")]
    #[case("under_score-dash")]
    #[case("Zoë")]
    fn acceptable_usernames(#[case] name: &str) {
        assert_eq!(validate_username(name).unwrap(), name);
    }

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("semi;colon")]
    #[case("slash/name")]
    fn unacceptable_usernames(#[case] name: &str) {
        assert_matches!(validate_username(name), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn username_length_is_capped() {
        assert!(validate_username(&"u".repeat(150)).is_ok());
        assert_matches!(
            validate_username(&"u".repeat(151)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert_matches!(validate_password("seven77"), Err(ServiceError::ValidationError(_)));
        assert!(validate_password("eight888").is_ok());
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some("   "), None)]
    #[case(Some("Jane@Example.com"), Some("jane@example.com"))]
    #[case(Some(" jane@localhost "), Some("jane@localhost"))]
    fn emails_are_normalized(#[case] input: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(
            validate_email(input).unwrap(),
            expected.map(str::to_string)
        );
    }

    #[rstest]
    #[case("no-at-sign")]
    #[case("@example.com")]
    #[case("jane@")]
    #[case("ja ne@example.com")]
    #[case("jane@exa mple.com")]
    fn malformed_emails_are_rejected(#[case] email: &str) {
        assert_matches!(
            validate_email(Some(email)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn user_view_hides_password_hash() {
        let now = Utc::now();
        let view = UserView::from(user::Model {
            id: 1,
            username: "alice".into(),
            email: None,
            password_hash: "$argon2id$secret".into(),
            role: Role::Customer,
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"customer\""));
    }
}
