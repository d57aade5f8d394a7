use tracing::instrument;
use uuid::Uuid;

use crate::models::category::CategoryModel;
use crate::models::profile::{ProfileDraft, ProfileSummary, UserProfileModel};
use crate::store::Database;

#[derive(Clone, Debug)]
pub struct ProfileRepository {
    db: Database,
}

impl ProfileRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(name = "Fetching or creating profile", skip(self))]
    pub async fn get_or_create(&self, user_id: Uuid) -> anyhow::Result<UserProfileModel> {
        match &self.db {
            Database::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
                )
                .bind(user_id)
                .execute(pool)
                .await?;
                let row = sqlx::query_as::<_, UserProfileModel>(
                    "SELECT user_id, website, picture FROM user_profiles WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                Ok(row)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.profiles
                    .entry(user_id)
                    .or_insert_with(|| UserProfileModel {
                        user_id,
                        ..Default::default()
                    })
                    .clone()
            })),
        }
    }

    #[instrument(name = "Saving profile", skip(self))]
    pub async fn upsert(
        &self,
        user_id: Uuid,
        draft: &ProfileDraft,
    ) -> anyhow::Result<UserProfileModel> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, UserProfileModel>(
                    "INSERT INTO user_profiles (user_id, website, picture) VALUES ($1, $2, $3)
                     ON CONFLICT (user_id) DO UPDATE
                       SET website = EXCLUDED.website, picture = EXCLUDED.picture
                     RETURNING user_id, website, picture",
                )
                .bind(user_id)
                .bind(&draft.website)
                .bind(&draft.picture)
                .fetch_one(pool)
                .await?;
                Ok(row)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                let row = UserProfileModel {
                    user_id,
                    website: draft.website.clone(),
                    picture: draft.picture.clone(),
                };
                t.profiles.insert(user_id, row.clone());
                row
            })),
        }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<ProfileSummary>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, ProfileSummary>(
                    "SELECT u.username, p.website, p.picture
                     FROM user_profiles p JOIN users u ON u.id = p.user_id
                     ORDER BY u.username",
                )
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                let mut rows: Vec<_> = t
                    .users
                    .iter()
                    .filter_map(|user| {
                        t.profiles.get(&user.id).map(|profile| ProfileSummary {
                            username: user.username.clone(),
                            website: profile.website.clone(),
                            picture: profile.picture.clone(),
                        })
                    })
                    .collect();
                rows.sort_by(|a, b| a.username.cmp(&b.username));
                rows
            })),
        }
    }

    /// Adds the category to the user's liked set; liking twice is a no-op.
    #[instrument(name = "Recording liked category", skip(self))]
    pub async fn add_liked_category(&self, user_id: Uuid, category_id: i32) -> anyhow::Result<()> {
        match &self.db {
            Database::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO user_liked_categories (user_id, category_id) VALUES ($1, $2)
                     ON CONFLICT DO NOTHING",
                )
                .bind(user_id)
                .bind(category_id)
                .execute(pool)
                .await?;
            }
            Database::Memory(db) => db.with(|t| {
                t.liked.insert((user_id, category_id));
            }),
        }
        Ok(())
    }

    pub async fn liked_categories(&self, user_id: Uuid) -> anyhow::Result<Vec<CategoryModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, CategoryModel>(
                    "SELECT c.id, c.name, c.views, c.likes, c.slug
                     FROM user_liked_categories l JOIN categories c ON c.id = l.category_id
                     WHERE l.user_id = $1
                     ORDER BY c.id",
                )
                .bind(user_id)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.liked
                    .iter()
                    .filter(|(uid, _)| *uid == user_id)
                    .filter_map(|(_, category_id)| t.categories.get(category_id).cloned())
                    .collect()
            })),
        }
    }
}
