use crate::{
    errors::{AppError, FieldErrors},
    store::{StoreError, user::UserRepository},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;
use uuid::Uuid;

const USERNAME_MAX_LENGTH: usize = 150;

#[derive(Clone, Debug)]
pub struct AuthService {
    repo: UserRepository,
}

impl AuthService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    #[instrument(name = "AuthService: Register", skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AppError> {
        let username = username.trim();
        let mut errors = FieldErrors::default();
        if username.is_empty() {
            errors.add("username", "This field is required.");
        } else if username.chars().count() > USERNAME_MAX_LENGTH
            || !username
                .chars()
                .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result(())?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal
            })?
            .to_string();

        self.repo
            .create_user(username, email.trim(), &hash)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::Validation(FieldErrors::single(
                    "username",
                    "A user with that username already exists.",
                )),
                StoreError::Other(e) => e.into(),
            })
    }

    #[instrument(
        name = "AuthService: Login attempt",
        skip(self, password),
        fields(username = %username)
    )]
    pub async fn login(&self, username: &str, password: &str) -> Result<Uuid, AppError> {
        // 1. Fetch User
        let user = self.repo.find_by_username(username).await.map_err(|e| {
            tracing::error!("Database error during login: {:?}", e);
            AppError::Internal
        })?;

        let user = match user {
            Some(u) => u,
            None => {
                tracing::warn!("Login failed: User not found");
                return Err(AppError::WrongCredentials);
            }
        };

        // 2. Parse Hash
        let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
            tracing::error!("Critical: Failed to parse password hash from DB: {:?}", e);
            AppError::Internal
        })?;

        // 3. Verify Password
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            tracing::warn!("Login failed: Invalid password provided");
            return Err(AppError::WrongCredentials);
        }

        tracing::info!("User authenticated successfully");
        Ok(user.id)
    }
}
