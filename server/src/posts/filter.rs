//! Post listing filter.
//!
//! Turns listing query parameters into an ordered list of predicates. The
//! `PostgreSQL` store translates each predicate to SQL; the in-memory store
//! evaluates them with [`PostPredicate::matches`]. Both must agree.
//!
//! Predicates are composed in a fixed order:
//! 1. Ownership (`mine`) or visibility/privacy (`p`)
//! 2. Substring search (`q`)
//! 3. Tag inclusion (`t`), any of the listed tags
//! 4. Exclusion (`e`), title and content must both miss every term

use regex::{Regex, RegexBuilder};
use uuid::Uuid;

use super::constants::EXCLUSION_REGEX_SIZE_LIMIT;
use super::types::ListPostsQuery;
use crate::api::ApiError;
use crate::auth::AuthUser;
use crate::db::{Post, Tag};
use crate::permissions::{Action, Resource};

// ============================================================================
// Predicates
// ============================================================================

/// Case-insensitive substring searched in title or content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `LIKE` pattern with the term's own wildcards escaped.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.0.len() + 2);
        pattern.push('%');
        for c in self.0.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    #[must_use]
    pub fn found_in(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.0.to_lowercase())
    }
}

/// Exclusion terms joined into one case-insensitive alternation.
#[derive(Debug, Clone)]
pub struct ExclusionPattern {
    alternation: String,
    regex: Regex,
}

impl ExclusionPattern {
    /// Build from a comma-separated list. `None` when no term survives trimming.
    pub fn parse(raw: &str) -> Result<Option<Self>, regex::Error> {
        let terms = split_list(raw);
        if terms.is_empty() {
            return Ok(None);
        }

        let alternation = terms.join("|");
        let regex = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .size_limit(EXCLUSION_REGEX_SIZE_LIMIT)
            .build()?;

        Ok(Some(Self { alternation, regex }))
    }

    /// The alternation source, as sent to the database.
    #[must_use]
    pub fn alternation(&self) -> &str {
        &self.alternation
    }

    /// True when neither title nor content matches any term.
    #[must_use]
    pub fn keeps(&self, title: &str, content: &str) -> bool {
        !self.regex.is_match(title) && !self.regex.is_match(content)
    }
}

impl PartialEq for ExclusionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.alternation == other.alternation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostPredicate {
    /// Posts owned by this user, regardless of visibility or privacy.
    OwnedBy(Uuid),
    /// Visible posts with the given privacy flag.
    Visibility { private: bool },
    /// Title or content contains the term.
    Search(SearchTerm),
    /// Post carries at least one of these tag names.
    AnyTag(Vec<String>),
    /// Neither title nor content matches the pattern.
    Exclude(ExclusionPattern),
}

impl PostPredicate {
    /// Evaluate against a post and its tags.
    #[must_use]
    pub fn matches(&self, post: &Post, tags: &[Tag]) -> bool {
        match self {
            Self::OwnedBy(user_id) => post.user_id == *user_id,
            Self::Visibility { private } => post.visible && post.private == *private,
            Self::Search(term) => term.found_in(&post.title) || term.found_in(&post.content),
            Self::AnyTag(names) => tags.iter().any(|tag| names.contains(&tag.name)),
            Self::Exclude(pattern) => pattern.keeps(&post.title, &post.content),
        }
    }
}

// ============================================================================
// Filter
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    predicates: Vec<PostPredicate>,
}

impl PostFilter {
    /// Build the filter for a listing request.
    ///
    /// Authentication and capability checks for `mine` and `p` happen here,
    /// before any query runs.
    pub fn from_query(query: &ListPostsQuery, caller: Option<&AuthUser>) -> Result<Self, ApiError> {
        let mut predicates = Vec::new();

        if filled(query.mine.as_deref()).is_some() {
            let caller = caller.ok_or(ApiError::Unauthenticated)?;
            caller.require(Action::Create, Resource::Posts)?;
            predicates.push(PostPredicate::OwnedBy(caller.id));
        } else {
            let private = filled(query.p.as_deref()).is_some();
            if private && caller.is_none() {
                return Err(ApiError::Unauthenticated);
            }
            predicates.push(PostPredicate::Visibility { private });
        }

        if let Some(q) = filled(query.q.as_deref()) {
            predicates.push(PostPredicate::Search(SearchTerm::new(q)));
        }

        if let Some(t) = filled(query.t.as_deref()) {
            let tags = split_list(t);
            if !tags.is_empty() {
                predicates.push(PostPredicate::AnyTag(tags));
            }
        }

        if let Some(e) = filled(query.e.as_deref()) {
            let pattern = ExclusionPattern::parse(e).map_err(|err| {
                tracing::debug!(error = %err, "Rejected exclusion pattern");
                ApiError::invalid("e", "The e field must contain valid expressions.")
            })?;
            if let Some(pattern) = pattern {
                predicates.push(PostPredicate::Exclude(pattern));
            }
        }

        Ok(Self { predicates })
    }

    #[must_use]
    pub fn predicates(&self) -> &[PostPredicate] {
        &self.predicates
    }

    /// Whether any predicate needs the post's tags.
    #[must_use]
    pub fn needs_tags(&self) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, PostPredicate::AnyTag(_)))
    }

    /// All predicates hold for this post.
    #[must_use]
    pub fn matches(&self, post: &Post, tags: &[Tag]) -> bool {
        self.predicates.iter().all(|p| p.matches(post, tags))
    }
}

/// Trimmed value, or `None` when missing or blank.
fn filled(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split on commas, trim, drop empty fragments.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
