use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::errors::FieldErrors;

pub const NAME_MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryModel {
    pub id: i32,
    pub name: String,
    pub views: i32,
    pub likes: i32,
    pub slug: String,
}

/// A category as it is about to be written: the slug is always derived from
/// the name and the counters are never negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub slug: String,
    pub views: i32,
    pub likes: i32,
}

impl CategoryDraft {
    pub fn new(name: &str, views: i32, likes: i32) -> Self {
        Self {
            name: name.to_string(),
            slug: slugify(name),
            views: views.max(0),
            likes: likes.max(0),
        }
    }

    /// Validates a submitted name and builds a fresh draft with zeroed counters.
    pub fn from_submitted_name(raw: &str) -> Result<Self, FieldErrors> {
        let name = validate_name(raw)?;
        Ok(Self::new(&name, 0, 0))
    }
}

pub fn validate_name(raw: &str) -> Result<String, FieldErrors> {
    let name = raw.trim();
    let mut errors = FieldErrors::default();

    if name.is_empty() {
        errors.add("name", "This field is required.");
    } else {
        if name.chars().count() > NAME_MAX_LENGTH {
            errors.add(
                "name",
                format!("Ensure this value has at most {NAME_MAX_LENGTH} characters."),
            );
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '.')
        {
            errors.add(
                "name",
                "Only alphanumeric characters and whitespace are allowed.",
            );
        }
    }

    errors.into_result(name.to_string())
}

/// Lowercases, drops anything that is not a word character, whitespace or
/// hyphen, and joins the remaining runs with single hyphens.
pub fn slugify(value: &str) -> String {
    let cleaned: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    cleaned
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// Keeps the categories whose name starts with `prefix` (case-insensitive),
/// in iteration order, capped at `max_results` when it is non-zero. An empty
/// or missing prefix keeps everything.
pub fn filter_by_prefix(
    categories: impl IntoIterator<Item = CategoryModel>,
    prefix: Option<&str>,
    max_results: usize,
) -> Vec<CategoryModel> {
    let prefix = prefix.filter(|p| !p.is_empty()).map(str::to_lowercase);
    let matching = categories.into_iter().filter(|category| match &prefix {
        Some(prefix) => category.name.to_lowercase().starts_with(prefix.as_str()),
        None => true,
    });

    if max_results > 0 {
        matching.take(max_results).collect()
    } else {
        matching.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_lowercase_and_hyphenated() {
        assert_eq!(slugify("Test Category"), "test-category");
        assert_eq!(slugify("  Other   Frameworks "), "other-frameworks");
        assert_eq!(slugify("Django 4.2"), "django-42");
        assert_eq!(slugify("C++ & Rust!"), "c-rust");
    }

    #[test]
    fn accepted_names_produce_their_slug() {
        for name in ["Python", "Web Dev", "v1.0 notes", "a b\tc"] {
            let draft = CategoryDraft::from_submitted_name(name).expect("name should be valid");
            assert_eq!(draft.slug, slugify(name));
            assert_eq!(draft.slug, draft.slug.to_lowercase());
            assert!(!draft.slug.contains(' '));
        }
    }

    #[test]
    fn special_characters_are_rejected() {
        for name in ["C#", "rock&roll", "what?", "ünïcode", "under_score", "dash-ed"] {
            let errors = CategoryDraft::from_submitted_name(name).unwrap_err();
            assert_eq!(
                errors.get("name"),
                ["Only alphanumeric characters and whitespace are allowed."]
            );
        }
    }

    #[test]
    fn empty_and_overlong_names_are_rejected() {
        assert!(validate_name("   ").unwrap_err().contains("name"));
        assert!(validate_name(&"a".repeat(NAME_MAX_LENGTH + 1)).is_err());
        assert!(validate_name(&"a".repeat(NAME_MAX_LENGTH)).is_ok());
    }

    #[test]
    fn counters_are_never_negative() {
        let draft = CategoryDraft::new("test", -1, -20);
        assert_eq!(draft.views, 0);
        assert_eq!(draft.likes, 0);

        let draft = CategoryDraft::new("test", 3, 7);
        assert_eq!((draft.views, draft.likes), (3, 7));
    }

    fn category(id: i32, name: &str) -> CategoryModel {
        CategoryModel {
            id,
            name: name.to_string(),
            views: 0,
            likes: 0,
            slug: slugify(name),
        }
    }

    fn names(categories: &[CategoryModel]) -> Vec<&str> {
        categories.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn prefix_match_ignores_case_and_caps_results() {
        let all = vec![
            category(1, "Python"),
            category(2, "php"),
            category(3, "Pottery"),
            category(4, "Rust"),
        ];

        let found = filter_by_prefix(all.clone(), Some("p"), 2);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.name.to_lowercase().starts_with('p')));

        let found = filter_by_prefix(all.clone(), Some("PY"), 8);
        assert_eq!(names(&found), ["Python"]);
    }

    #[test]
    fn empty_prefix_returns_everything() {
        let all = vec![category(1, "Python"), category(2, "Rust")];
        assert_eq!(filter_by_prefix(all.clone(), None, 0).len(), 2);
        assert_eq!(filter_by_prefix(all.clone(), Some(""), 0).len(), 2);
        assert_eq!(filter_by_prefix(all, Some(""), 1).len(), 1);
    }

    #[test]
    fn zero_max_means_uncapped() {
        let all: Vec<_> = (1..=20).map(|i| category(i, &format!("p{i}"))).collect();
        assert_eq!(filter_by_prefix(all, Some("p"), 0).len(), 20);
    }
}
