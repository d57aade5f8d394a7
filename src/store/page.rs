use anyhow::anyhow;
use tracing::instrument;
use uuid::Uuid;

use crate::models::page::{PageDraft, PageModel};
use crate::store::Database;

const COLUMNS: &str = "id, category_id, title, url, views, added_by";

#[derive(Clone, Debug)]
pub struct PageRepository {
    db: Database,
}

impl PageRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn top_by_views(&self, limit: usize) -> anyhow::Result<Vec<PageModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, PageModel>(&format!(
                    "SELECT {COLUMNS} FROM pages ORDER BY views DESC, id LIMIT $1"
                ))
                .bind(limit as i64)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                let mut rows: Vec<_> = t.pages.values().cloned().collect();
                sort_by_views(&mut rows);
                rows.truncate(limit);
                rows
            })),
        }
    }

    /// Pages of one category, most viewed first.
    pub async fn list_for_category(&self, category_id: i32) -> anyhow::Result<Vec<PageModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, PageModel>(&format!(
                    "SELECT {COLUMNS} FROM pages WHERE category_id = $1 ORDER BY views DESC, id"
                ))
                .bind(category_id)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                let mut rows: Vec<_> = t
                    .pages
                    .values()
                    .filter(|p| p.category_id == category_id)
                    .cloned()
                    .collect();
                sort_by_views(&mut rows);
                rows
            })),
        }
    }

    pub async fn list_added_by(&self, user_id: Uuid) -> anyhow::Result<Vec<PageModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, PageModel>(&format!(
                    "SELECT {COLUMNS} FROM pages WHERE added_by = $1 ORDER BY id"
                ))
                .bind(user_id)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.pages
                    .values()
                    .filter(|p| p.added_by == Some(user_id))
                    .cloned()
                    .collect()
            })),
        }
    }

    pub async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<PageModel>> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, PageModel>(&format!(
                    "SELECT {COLUMNS} FROM pages WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(pool)
                .await?;
                Ok(row)
            }
            Database::Memory(db) => Ok(db.with(|t| t.pages.get(&id).cloned())),
        }
    }

    #[instrument(name = "Saving new page to database", skip(self))]
    pub async fn insert(
        &self,
        category_id: i32,
        draft: &PageDraft,
        added_by: Option<Uuid>,
    ) -> anyhow::Result<PageModel> {
        match &self.db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, PageModel>(&format!(
                    "INSERT INTO pages (category_id, title, url, views, added_by)
                     VALUES ($1, $2, $3, 0, $4)
                     RETURNING {COLUMNS}"
                ))
                .bind(category_id)
                .bind(&draft.title)
                .bind(&draft.url)
                .bind(added_by)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to insert page: {:?}", e);
                    e
                })?;
                Ok(row)
            }
            Database::Memory(db) => db.with(|t| {
                if !t.categories.contains_key(&category_id) {
                    return Err(anyhow!("category {category_id} does not exist"));
                }
                let id = t.next_page_id();
                let row = PageModel {
                    id,
                    category_id,
                    title: draft.title.clone(),
                    url: draft.url.clone(),
                    views: 0,
                    added_by,
                };
                t.pages.insert(id, row.clone());
                Ok(row)
            }),
        }
    }

    /// Returns the page with exactly these fields, inserting it if none exists.
    #[instrument(name = "Fetching or creating page", skip(self))]
    pub async fn get_or_create(
        &self,
        category_id: i32,
        draft: &PageDraft,
        added_by: Option<Uuid>,
    ) -> anyhow::Result<PageModel> {
        let existing = match &self.db {
            Database::Postgres(pool) => {
                sqlx::query_as::<_, PageModel>(&format!(
                    "SELECT {COLUMNS} FROM pages
                     WHERE category_id = $1 AND title = $2 AND url = $3
                       AND added_by IS NOT DISTINCT FROM $4
                     ORDER BY id LIMIT 1"
                ))
                .bind(category_id)
                .bind(&draft.title)
                .bind(&draft.url)
                .bind(added_by)
                .fetch_optional(pool)
                .await?
            }
            Database::Memory(db) => db.with(|t| {
                t.pages
                    .values()
                    .find(|p| {
                        p.category_id == category_id
                            && p.title == draft.title
                            && p.url == draft.url
                            && p.added_by == added_by
                    })
                    .cloned()
            }),
        };

        match existing {
            Some(page) => Ok(page),
            None => self.insert(category_id, draft, added_by).await,
        }
    }

    /// Counts one click-through and returns the page's URL, or `None` if the
    /// page does not exist.
    #[instrument(name = "Recording page view", skip(self))]
    pub async fn record_view(&self, id: i32) -> anyhow::Result<Option<String>> {
        match &self.db {
            Database::Postgres(pool) => {
                let url = sqlx::query_scalar::<_, String>(
                    "UPDATE pages SET views = views + 1 WHERE id = $1 RETURNING url",
                )
                .bind(id)
                .fetch_optional(pool)
                .await?;
                Ok(url)
            }
            Database::Memory(db) => Ok(db.with(|t| {
                t.pages.get_mut(&id).map(|page| {
                    page.views += 1;
                    page.url.clone()
                })
            })),
        }
    }
}

fn sort_by_views(rows: &mut [PageModel]) {
    rows.sort_by(|a, b| b.views.cmp(&a.views).then(a.id.cmp(&b.id)));
}
