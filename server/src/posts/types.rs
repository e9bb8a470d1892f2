//! Request types for posts.

use std::borrow::Cow;

use serde::Deserialize;
use validator::Validate;

use super::constants::TAG_NAME_MAX_LENGTH;

/// Body for creating or updating a post.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct PostRequest {
    #[serde(default)]
    #[validate(length(
        min = 5,
        max = 190,
        message = "The title must be between 5 and 190 characters."
    ))]
    pub title: String,

    #[serde(default)]
    #[validate(length(
        min = 5,
        max = 300,
        message = "The description must be between 5 and 300 characters."
    ))]
    pub description: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "The content field is required."))]
    pub content: String,

    /// Relative asset path, or the absolute URL previously returned for it.
    #[validate(length(
        max = 191,
        message = "The banner may not be greater than 191 characters."
    ))]
    pub banner: Option<String>,

    #[validate(custom(function = "validate_tag_names"))]
    pub tags: Option<Vec<String>>,

    /// Defaults to true on create; unchanged on update when omitted.
    pub visible: Option<bool>,

    /// Defaults to false on create; unchanged on update when omitted.
    pub private: Option<bool>,
}

/// Tag names are stored trimmed, so surrounding whitespace does not count.
fn validate_tag_names(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags
        .iter()
        .all(|tag| tag.trim().chars().count() <= TAG_NAME_MAX_LENGTH)
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("tag_length").with_message(Cow::Borrowed(
            "Each tag may not be greater than 64 characters.",
        )))
    }
}

/// Listing query parameters.
///
/// Every parameter is ignored when blank after trimming, so `?p=` lists
/// public posts. `mine` and `p` switch on for any other value.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPostsQuery {
    /// Only the caller's own posts, ignoring visibility and privacy.
    pub mine: Option<String>,
    /// Private posts instead of public ones. Requires authentication.
    pub p: Option<String>,
    /// Case-insensitive substring searched in title or content.
    pub q: Option<String>,
    /// Comma-separated tags; a post needs at least one of them.
    pub t: Option<String>,
    /// Comma-separated terms; posts whose title or content match any are dropped.
    pub e: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
}

impl ListPostsQuery {
    /// Requested page, clamped to 1 when missing or invalid.
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_with_page(page: &str) -> ListPostsQuery {
        ListPostsQuery {
            page: Some(page.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_page_clamping() {
        assert_eq!(ListPostsQuery::default().page(), 1);
        assert_eq!(query_with_page("3").page(), 3);
        assert_eq!(query_with_page("0").page(), 1);
        assert_eq!(query_with_page("-2").page(), 1);
        assert_eq!(query_with_page("abc").page(), 1);
    }

    #[test]
    fn test_post_request_validation() {
        let valid = PostRequest {
            title: "Hello world".into(),
            description: "A short summary".into(),
            content: "Body".into(),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let short_title = PostRequest {
            title: "Hey".into(),
            ..valid.clone()
        };
        let errors = short_title.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let no_content = PostRequest {
            content: String::new(),
            ..valid.clone()
        };
        assert!(no_content.validate().unwrap_err().field_errors().contains_key("content"));

        let long_banner = PostRequest {
            banner: Some("b".repeat(192)),
            ..valid
        };
        assert!(long_banner.validate().unwrap_err().field_errors().contains_key("banner"));
    }

    #[test]
    fn test_tag_name_length() {
        let valid = PostRequest {
            title: "Hello world".into(),
            description: "A short summary".into(),
            content: "Body".into(),
            tags: Some(vec!["t".repeat(64), format!("  {}  ", "ß".repeat(64))]),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let too_long = PostRequest {
            tags: Some(vec!["rust".into(), "t".repeat(65)]),
            ..valid
        };
        let errors = too_long.validate().unwrap_err();
        let tag_errors = errors.field_errors()["tags"];
        assert_eq!(tag_errors[0].code, "tag_length");
    }

    #[test]
    fn test_title_length_counts_characters() {
        let request = PostRequest {
            title: "ñandú".into(),
            description: "Birds of the pampas".into(),
            content: "Body".into(),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }
}
