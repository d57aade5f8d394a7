use crate::models::user::UserModel;
use crate::store::{Database, StoreError};
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, username, email, password_hash, created_at";

#[derive(Clone, Debug)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(name = "Saving new user to database", skip(self, password_hash))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Uuid, StoreError> {
        match &self.db {
            Database::Postgres(pool) => {
                let id = sqlx::query_scalar::<_, Uuid>(
                    "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(username)
                .bind(email)
                .bind(password_hash)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to execute query: {:?}", e);
                    e
                })?;
                Ok(id)
            }
            Database::Memory(db) => db.with(|t| {
                if t.users.iter().any(|u| u.username == username) {
                    return Err(StoreError::Conflict("username"));
                }
                let id = Uuid::new_v4();
                t.users.push(UserModel {
                    id,
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: chrono::Utc::now(),
                });
                Ok(id)
            }),
        }
    }

    #[instrument(name = "Fetching user by username from database", skip(self))]
    pub async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<UserModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let user = sqlx::query_as::<_, UserModel>(&format!(
                    "SELECT {COLUMNS} FROM users WHERE username = $1"
                ))
                .bind(username)
                .fetch_optional(pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to fetch user: {:?}", e);
                    e
                })?;
                Ok(user)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.users.iter().find(|u| u.username == username).cloned()
            })),
        }
    }
}
