use tracing::instrument;
use uuid::Uuid;

use crate::{
    errors::{AppError, FieldErrors},
    models::{
        category::{CategoryDraft, CategoryModel},
        page::PageModel,
    },
    store::{CategoryRepository, PageRepository, ProfileRepository, StoreError},
};

/// Maximum number of categories returned by the suggestion endpoint.
pub const SUGGESTION_LIMIT: usize = 8;

#[derive(Clone, Debug)]
pub struct CategoryService {
    categories: CategoryRepository,
    pages: PageRepository,
    profiles: ProfileRepository,
}

impl CategoryService {
    pub fn new(
        categories: CategoryRepository,
        pages: PageRepository,
        profiles: ProfileRepository,
    ) -> Self {
        Self {
            categories,
            pages,
            profiles,
        }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<CategoryModel>> {
        self.categories.list().await
    }

    pub async fn top_by_likes(&self, limit: usize) -> Result<Vec<CategoryModel>, AppError> {
        Ok(self.categories.top_by_likes(limit).await?)
    }

    pub async fn get(&self, id: i32) -> Result<CategoryModel, AppError> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Category"))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryModel, AppError> {
        self.categories
            .find_by_slug(slug)
            .await?
            .ok_or(AppError::NotFound("Category"))
    }

    /// The category behind `slug` and its pages, most viewed first.
    #[instrument(name = "Service: Show category", skip(self))]
    pub async fn with_pages(&self, slug: &str) -> Result<(CategoryModel, Vec<PageModel>), AppError> {
        let category = self.get_by_slug(slug).await?;
        let pages = self.pages.list_for_category(category.id).await?;
        Ok((category, pages))
    }

    #[instrument(name = "Service: Create category", skip(self))]
    pub async fn create(&self, name: &str) -> Result<CategoryModel, AppError> {
        let draft = CategoryDraft::from_submitted_name(name)?;
        self.categories
            .insert(&draft)
            .await
            .map_err(conflict_to_field_error)
    }

    #[instrument(name = "Service: Rename category", skip(self))]
    pub async fn rename(&self, id: i32, name: &str) -> Result<CategoryModel, AppError> {
        let draft = CategoryDraft::from_submitted_name(name)?;
        self.categories
            .rename(id, &draft)
            .await
            .map_err(conflict_to_field_error)?
            .ok_or(AppError::NotFound("Category"))
    }

    #[instrument(name = "Service: Delete category", skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        if self.categories.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Category"))
        }
    }

    /// Adds the category to the user's liked set and bumps its like counter.
    ///
    /// The counter goes up on every call, also when the user had already
    /// liked the category, so it can exceed the number of distinct likers.
    #[instrument(name = "Service: Like category", skip(self))]
    pub async fn like(&self, user_id: Uuid, category_id: i32) -> Result<i32, AppError> {
        let category = self.get(category_id).await?;

        self.profiles.get_or_create(user_id).await?;
        self.profiles
            .add_liked_category(user_id, category.id)
            .await?;

        let likes = self
            .categories
            .increment_likes(category.id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        tracing::info!(category_id, likes, "Category liked");
        Ok(likes)
    }

    pub async fn suggest(&self, prefix: Option<&str>) -> Vec<CategoryModel> {
        self.categories
            .starting_with(prefix, SUGGESTION_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Failed to fetch suggestions: {:?}", e);
                Vec::new()
            })
    }
}

fn conflict_to_field_error(e: StoreError) -> AppError {
    let message = match e {
        StoreError::Conflict("slug") => {
            "This name maps to the same URL as an existing category."
        }
        StoreError::Conflict(_) => "Category with this name already exists.",
        StoreError::Other(e) => return e.into(),
    };
    AppError::Validation(FieldErrors::single("name", message))
}
