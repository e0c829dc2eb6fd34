//! User service: accounts, sessions and profiles.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use postboard_common::{AppError, AppResult, IdGenerator};
use postboard_db::{
    entities::{user, user_profile},
    repositories::{UserProfileRepository, UserRepository},
};
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

/// Input for creating a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 1, max = 150), regex(path = *USERNAME_RE))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(email)]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// Input for changing a password.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordInput {
    pub old_password: String,

    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Input for updating a profile.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 2048))]
    pub description: Option<String>,

    #[validate(url, length(max = 1024))]
    pub avatar_url: Option<String>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, profile_repo: UserProfileRepository) -> Self {
        Self {
            user_repo,
            profile_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user. The account starts logged out.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;

        if self.user_repo.username_exists(&input.username).await? {
            return Err(AppError::Validation(
                "username: a user with that username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            username: Set(input.username),
            email: Set(input.email.filter(|e| !e.is_empty())),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            password_hash: Set(password_hash),
            token: Set(None),
            is_staff: Set(false),
            date_joined: Set(Utc::now().into()),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = user.id, username = %user.username, "User signed up");
        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: i32) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Check credentials and return the user's session token, issuing one if
    /// the user has none.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(user::Model, String)> {
        let user = self.authenticate(username, password).await?;

        if let Some(token) = user.token.clone() {
            return Ok((user, token));
        }

        let token = self.id_gen.generate_token();
        let user = self.user_repo.set_token(user.id, Some(token.clone())).await?;
        tracing::info!(user_id = user.id, "Session token issued");
        Ok((user, token))
    }

    /// Revoke the user's token, ending every session.
    pub async fn logout(&self, user_id: i32) -> AppResult<()> {
        self.user_repo.set_token(user_id, None).await?;
        tracing::info!(user_id, "Session token revoked");
        Ok(())
    }

    /// Change a password after checking the current one.
    pub async fn change_password(
        &self,
        user: &user::Model,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        input.validate()?;

        if !verify_password(&input.old_password, &user.password_hash)? {
            return Err(AppError::Validation(
                "old_password: your old password was entered incorrectly".to_string(),
            ));
        }

        let hash = hash_password(&input.new_password)?;
        self.user_repo.update_password(user.id, &hash).await?;
        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Delete a user and everything they own.
    pub async fn delete(&self, user_id: i32) -> AppResult<()> {
        if self.user_repo.delete(user_id).await? == 0 {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }
        tracing::info!(user_id, "User deleted");
        Ok(())
    }

    /// Get a user's profile, if one was ever written.
    pub async fn get_profile(&self, user_id: i32) -> AppResult<Option<user_profile::Model>> {
        self.profile_repo.find_by_user_id(user_id).await
    }

    /// Update a profile, creating it on first write.
    pub async fn update_profile(
        &self,
        user_id: i32,
        input: UpdateProfileInput,
    ) -> AppResult<user_profile::Model> {
        input.validate()?;

        match self.profile_repo.find_by_user_id(user_id).await? {
            Some(profile) => {
                let mut active: user_profile::ActiveModel = profile.into();
                active.description = Set(input.description);
                active.avatar_url = Set(input.avatar_url);
                self.profile_repo.update(active).await
            }
            None => {
                let active = user_profile::ActiveModel {
                    user_id: Set(user_id),
                    description: Set(input.description),
                    avatar_url: Set(input.avatar_url),
                    ..Default::default()
                };
                self.profile_repo.create(active).await
            }
        }
    }
}

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
///
/// A hash that cannot be parsed never matches.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return Ok(false);
    };

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: i32, username: &str, password: &str) -> user::Model {
        user::Model {
            id,
            username: username.to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password(password).unwrap(),
            token: Some("test_token".to_string()),
            is_staff: false,
            date_joined: Utc::now().into(),
        }
    }

    fn create_service(db: sea_orm::DatabaseConnection) -> UserService {
        let db = Arc::new(db);
        UserService::new(UserRepository::new(db.clone()), UserProfileRepository::new(db))
    }

    fn signup(username: &str, password: &str) -> SignupInput {
        SignupInput {
            username: username.to_string(),
            password: password.to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_unusable_hash() {
        assert!(!verify_password("anything", "!").unwrap());
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup("leo.tolstoy", "long enough").validate().is_ok());
        assert!(signup("leo", "short").validate().is_err());
        assert!(signup("has space", "long enough").validate().is_err());
        assert!(signup("", "long enough").validate().is_err());
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_username() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(1))
            }]])
            .into_connection();

        let service = create_service(db);
        let result = service.signup(signup("leo", "long enough")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let user = create_test_user(1, "leo", "correct horse");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .into_connection();

        let service = create_service(db);
        let result = service.authenticate("leo", "battery staple").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_reuses_existing_token() {
        let user = create_test_user(1, "leo", "correct horse");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .into_connection();

        let service = create_service(db);
        let (_, token) = service.login("leo", "correct horse").await.unwrap();

        assert_eq!(token, "test_token");
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let service = create_service(db);
        let result = service.authenticate_by_token("nope").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
