use tracing::instrument;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::page::{PageDraft, PageModel},
    store::{CategoryRepository, PageRepository},
};

/// Where the click-through tracker sends visitors it cannot resolve.
pub const DEFAULT_REDIRECT: &str = "/rango/";

#[derive(Clone, Debug)]
pub struct PageService {
    pages: PageRepository,
    categories: CategoryRepository,
}

impl PageService {
    pub fn new(pages: PageRepository, categories: CategoryRepository) -> Self {
        Self { pages, categories }
    }

    pub async fn top_by_views(&self, limit: usize) -> Result<Vec<PageModel>, AppError> {
        Ok(self.pages.top_by_views(limit).await?)
    }

    /// Validates and stores a page submitted through the add-page form.
    #[instrument(name = "Service: Add page", skip(self))]
    pub async fn add(
        &self,
        category_id: i32,
        title: &str,
        url: &str,
        added_by: Option<Uuid>,
    ) -> Result<PageModel, AppError> {
        let draft = PageDraft::from_submission(title, url)?;
        Ok(self.pages.insert(category_id, &draft, added_by).await?)
    }

    /// Stores a search result as a page of the category (once) and returns
    /// the category's refreshed page list.
    #[instrument(name = "Service: Auto add page", skip(self))]
    pub async fn auto_add(
        &self,
        category_id: i32,
        title: &str,
        url: &str,
        added_by: Uuid,
    ) -> Result<Vec<PageModel>, AppError> {
        let category = self
            .categories
            .find_by_id(category_id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        let draft = PageDraft::from_submission(title, url)?;
        self.pages
            .get_or_create(category.id, &draft, Some(added_by))
            .await?;

        Ok(self.pages.list_for_category(category.id).await?)
    }

    /// Resolves a tracked click-through: counts the view and returns the
    /// page's URL. Anything that goes wrong yields [`DEFAULT_REDIRECT`].
    #[instrument(name = "Service: Track page view", skip(self))]
    pub async fn track_view(&self, page_id: Option<&str>) -> String {
        let Some(raw_id) = page_id else {
            return DEFAULT_REDIRECT.to_string();
        };

        let Ok(id) = raw_id.trim().parse::<i32>() else {
            tracing::warn!("Page id {:?} is not a number", raw_id);
            return DEFAULT_REDIRECT.to_string();
        };

        match self.pages.record_view(id).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::warn!(page_id = id, "Page was not found");
                DEFAULT_REDIRECT.to_string()
            }
            Err(e) => {
                tracing::error!("Failed to record page view: {:?}", e);
                DEFAULT_REDIRECT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::CategoryDraft;
    use crate::store::Database;

    async fn service_with_page() -> (PageService, PageRepository, PageModel) {
        let db = Database::in_memory();
        let categories = CategoryRepository::new(db.clone());
        let pages = PageRepository::new(db);
        let category = categories
            .insert(&CategoryDraft::new("Python", 0, 0))
            .await
            .unwrap();
        let page = pages
            .insert(
                category.id,
                &PageDraft::from_submission("Docs", "https://docs.python.org/3/").unwrap(),
                None,
            )
            .await
            .unwrap();
        (PageService::new(pages.clone(), categories), pages, page)
    }

    #[tokio::test]
    async fn valid_id_counts_view_and_returns_url() {
        let (service, pages, page) = service_with_page().await;

        let target = service.track_view(Some(&page.id.to_string())).await;
        assert_eq!(target, "https://docs.python.org/3/");
        assert_eq!(pages.find_by_id(page.id).await.unwrap().unwrap().views, 1);
    }

    #[tokio::test]
    async fn unknown_ids_fall_back_without_counting() {
        let (service, pages, page) = service_with_page().await;

        assert_eq!(service.track_view(None).await, DEFAULT_REDIRECT);
        assert_eq!(service.track_view(Some("abc")).await, DEFAULT_REDIRECT);
        assert_eq!(service.track_view(Some("999")).await, DEFAULT_REDIRECT);
        assert_eq!(pages.find_by_id(page.id).await.unwrap().unwrap().views, 0);
    }

    #[tokio::test]
    async fn auto_add_does_not_duplicate_pages() {
        let (service, _, page) = service_with_page().await;
        let user = Uuid::new_v4();

        let first = service
            .auto_add(page.category_id, "Rust Book", "https://doc.rust-lang.org/book/", user)
            .await
            .unwrap();
        let second = service
            .auto_add(page.category_id, "Rust Book", "https://doc.rust-lang.org/book/", user)
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert!(matches!(
            service.auto_add(404, "x", "https://x.org", user).await,
            Err(AppError::NotFound(_))
        ));
    }
}
