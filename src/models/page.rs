use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use uuid::Uuid;

use crate::errors::FieldErrors;

pub const TITLE_MAX_LENGTH: usize = 128;
pub const URL_MAX_LENGTH: usize = 200;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageModel {
    pub id: i32,
    pub category_id: i32,
    pub title: String,
    pub url: String,
    pub views: i32,
    pub added_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDraft {
    pub title: String,
    pub url: String,
}

impl PageDraft {
    pub fn from_submission(title: &str, url: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = title.trim();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        } else if title.chars().count() > TITLE_MAX_LENGTH {
            errors.add(
                "title",
                format!("Ensure this value has at most {TITLE_MAX_LENGTH} characters."),
            );
        }

        let url = normalize_url(url);
        if url.is_empty() {
            errors.add("url", "This field is required.");
        } else if let Err(message) = check_url(&url) {
            errors.add("url", message);
        }

        errors.into_result(Self {
            title: title.to_string(),
            url,
        })
    }
}

/// Prefixes `http://` when the value carries no http(s) scheme.
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

pub fn check_url(url: &str) -> Result<(), String> {
    if url.chars().count() > URL_MAX_LENGTH {
        return Err(format!(
            "Ensure this value has at most {URL_MAX_LENGTH} characters."
        ));
    }
    match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(()),
        _ => Err("Enter a valid URL.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scheme_gets_http_prefix() {
        assert_eq!(normalize_url("www.python.org"), "http://www.python.org");
        assert_eq!(normalize_url(" http://a.org "), "http://a.org");
        assert_eq!(normalize_url("https://a.org"), "https://a.org");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn submission_is_trimmed_and_normalized() {
        let draft = PageDraft::from_submission("  Official Tutorial ", "docs.python.org/3/")
            .expect("valid page");
        assert_eq!(draft.title, "Official Tutorial");
        assert_eq!(draft.url, "http://docs.python.org/3/");
    }

    #[test]
    fn invalid_submission_reports_each_field() {
        let errors = PageDraft::from_submission("", "not a url").unwrap_err();
        assert_eq!(errors.get("title"), ["This field is required."]);
        assert_eq!(errors.get("url"), ["Enter a valid URL."]);

        let long = format!("example.com/{}", "x".repeat(URL_MAX_LENGTH));
        assert!(PageDraft::from_submission("ok", &long).unwrap_err().contains("url"));
    }
}
