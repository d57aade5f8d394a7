use tracing::instrument;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        category::CategoryModel,
        page::PageModel,
        profile::{ProfileDraft, ProfileSummary, UserProfileModel},
        user::UserModel,
    },
    store::{PageRepository, ProfileRepository, UserRepository},
};

/// Everything the profile page shows about one user.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: UserModel,
    pub profile: UserProfileModel,
    pub liked_categories: Vec<CategoryModel>,
    pub created_pages: Vec<PageModel>,
}

#[derive(Clone, Debug)]
pub struct ProfileService {
    profiles: ProfileRepository,
    users: UserRepository,
    pages: PageRepository,
}

impl ProfileService {
    pub fn new(profiles: ProfileRepository, users: UserRepository, pages: PageRepository) -> Self {
        Self {
            profiles,
            users,
            pages,
        }
    }

    #[instrument(name = "Service: Save profile", skip(self))]
    pub async fn save(
        &self,
        user_id: Uuid,
        website: &str,
        picture: &str,
    ) -> Result<UserProfileModel, AppError> {
        let draft = ProfileDraft::from_submission(website, picture)?;
        Ok(self.profiles.upsert(user_id, &draft).await?)
    }

    /// Loads a user's profile page, creating an empty profile on first view.
    #[instrument(name = "Service: Show profile", skip(self))]
    pub async fn view(&self, username: &str) -> Result<ProfileView, AppError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        let profile = self.profiles.get_or_create(user.id).await?;
        let liked_categories = self.profiles.liked_categories(user.id).await?;
        let created_pages = self.pages.list_added_by(user.id).await?;

        Ok(ProfileView {
            user,
            profile,
            liked_categories,
            created_pages,
        })
    }

    pub async fn list(&self) -> Result<Vec<ProfileSummary>, AppError> {
        Ok(self.profiles.list().await?)
    }
}
