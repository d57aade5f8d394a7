use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::errors::FieldErrors;
use crate::models::page::{check_url, normalize_url};

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfileModel {
    pub user_id: Uuid,
    pub website: Option<String>,
    pub picture: Option<String>,
}

/// A profile row joined with its owner's username, for listings.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub username: String,
    pub website: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub website: Option<String>,
    pub picture: Option<String>,
}

impl ProfileDraft {
    /// Blank inputs mean "not set"; a website is scheme-normalized and checked.
    pub fn from_submission(website: &str, picture: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        let website = match normalize_url(website) {
            url if url.is_empty() => None,
            url => {
                if let Err(message) = check_url(&url) {
                    errors.add("website", message);
                }
                Some(url)
            }
        };
        let picture = Some(picture.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        errors.into_result(Self { website, picture })
    }
}
