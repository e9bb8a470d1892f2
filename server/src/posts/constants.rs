//! Constants for posts.

/// Posts per listing page.
pub const PAGE_SIZE: i64 = 15;

/// Compiled size limit for the exclusion regex.
pub const EXCLUSION_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Longest tag name, in characters. Matches the `tags.name` column.
pub const TAG_NAME_MAX_LENGTH: usize = 64;
