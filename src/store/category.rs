use tracing::instrument;

use crate::models::category::{CategoryDraft, CategoryModel, filter_by_prefix};
use crate::store::{Database, StoreError};

const COLUMNS: &str = "id, name, views, likes, slug";

#[derive(Clone, Debug)]
pub struct CategoryRepository {
    db: Database,
}

impl CategoryRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<CategoryModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, CategoryModel>(&format!(
                    "SELECT {COLUMNS} FROM categories ORDER BY id"
                ))
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| t.categories.values().cloned().collect())),
        }
    }

    pub async fn top_by_likes(&self, limit: usize) -> anyhow::Result<Vec<CategoryModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, CategoryModel>(&format!(
                    "SELECT {COLUMNS} FROM categories ORDER BY likes DESC, id LIMIT $1"
                ))
                .bind(limit as i64)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                let mut rows: Vec<_> = t.categories.values().cloned().collect();
                rows.sort_by(|a, b| b.likes.cmp(&a.likes).then(a.id.cmp(&b.id)));
                rows.truncate(limit);
                rows
            })),
        }
    }

    /// Categories whose name starts with `prefix`, ignoring case; `max_results`
    /// of 0 means no cap.
    #[instrument(name = "Fetching category suggestions", skip(self))]
    pub async fn starting_with(
        &self,
        prefix: Option<&str>,
        max_results: usize,
    ) -> anyhow::Result<Vec<CategoryModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let limit = (max_results > 0).then_some(max_results as i64);
                let rows = sqlx::query_as::<_, CategoryModel>(&format!(
                    "SELECT {COLUMNS} FROM categories
                     WHERE $1::text IS NULL OR $1 = '' OR starts_with(lower(name), lower($1))
                     ORDER BY id
                     LIMIT $2"
                ))
                .bind(prefix)
                .bind(limit)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                filter_by_prefix(t.categories.values().cloned(), prefix, max_results)
            })),
        }
    }

    pub async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<CategoryModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CategoryModel>(&format!(
                    "SELECT {COLUMNS} FROM categories WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(pool)
                .await?;
                Ok(row)
            }
            Database::Memory(db) => Ok(db.with(|t| t.categories.get(&id).cloned())),
        }
    }

    pub async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<CategoryModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CategoryModel>(&format!(
                    "SELECT {COLUMNS} FROM categories WHERE slug = $1"
                ))
                .bind(slug)
                .fetch_optional(pool)
                .await?;
                Ok(row)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.categories.values().find(|c| c.slug == slug).cloned()
            })),
        }
    }

    #[instrument(name = "Saving new category to database", skip(self))]
    pub async fn insert(&self, draft: &CategoryDraft) -> Result<CategoryModel, StoreError> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CategoryModel>(&format!(
                    "INSERT INTO categories (name, views, likes, slug) VALUES ($1, $2, $3, $4)
                     RETURNING {COLUMNS}"
                ))
                .bind(&draft.name)
                .bind(draft.views)
                .bind(draft.likes)
                .bind(&draft.slug)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to insert category: {:?}", e);
                    e
                })?;
                Ok(row)
            }
            Database::Memory(db) => db.with(|t| {
                if let Some(column) = conflicting_column(t.categories.values(), draft, None) {
                    return Err(StoreError::Conflict(column));
                }
                let id = t.next_category_id();
                let row = CategoryModel {
                    id,
                    name: draft.name.clone(),
                    views: draft.views,
                    likes: draft.likes,
                    slug: draft.slug.clone(),
                };
                t.categories.insert(id, row.clone());
                Ok(row)
            }),
        }
    }

    /// Writes a new name and slug; counters are left untouched.
    #[instrument(name = "Renaming category", skip(self))]
    pub async fn rename(
        &self,
        id: i32,
        draft: &CategoryDraft,
    ) -> Result<Option<CategoryModel>, StoreError> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CategoryModel>(&format!(
                    "UPDATE categories SET name = $2, slug = $3 WHERE id = $1 RETURNING {COLUMNS}"
                ))
                .bind(id)
                .bind(&draft.name)
                .bind(&draft.slug)
                .fetch_optional(pool)
                .await?;
                Ok(row)
            }
            Database::Memory(db) => db.with(|t| {
                if !t.categories.contains_key(&id) {
                    return Ok(None);
                }
                if let Some(column) = conflicting_column(t.categories.values(), draft, Some(id)) {
                    return Err(StoreError::Conflict(column));
                }
                let row = t.categories.get_mut(&id).map(|row| {
                    row.name = draft.name.clone();
                    row.slug = draft.slug.clone();
                    row.clone()
                });
                Ok(row)
            }),
        }
    }

    /// Deletes the category together with its pages and likes.
    #[instrument(name = "Deleting category", skip(self))]
    pub async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        match &self.db {
            Database::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM categories WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                let removed = t.categories.remove(&id).is_some();
                if removed {
                    t.pages.retain(|_, page| page.category_id != id);
                    t.liked.retain(|(_, category_id)| *category_id != id);
                }
                removed
            })),
        }
    }

    /// Adds one like and returns the new total, or `None` if the category is gone.
    #[instrument(name = "Incrementing category likes", skip(self))]
    pub async fn increment_likes(&self, id: i32) -> anyhow::Result<Option<i32>> {
        match &self.db {
            Database::Postgres(pool) => {
                let likes = sqlx::query_scalar::<_, i32>(
                    "UPDATE categories SET likes = likes + 1 WHERE id = $1 RETURNING likes",
                )
                .bind(id)
                .fetch_optional(pool)
                .await?;
                Ok(likes)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.categories.get_mut(&id).map(|row| {
                    row.likes += 1;
                    row.likes
                })
            })),
        }
    }
}

fn conflicting_column<'a>(
    existing: impl Iterator<Item = &'a CategoryModel>,
    draft: &CategoryDraft,
    except: Option<i32>,
) -> Option<&'static str> {
    existing
        .filter(|row| Some(row.id) != except)
        .find_map(|row| {
            if row.name == draft.name {
                Some("name")
            } else if row.slug == draft.slug {
                Some("slug")
            } else {
                None
            }
        })
}
