//! Board post aggregate: `Post` root owning its `HashTag` members.
//!
//! # Invariants
//! - A `HashTag` belongs to exactly one post through `post_id`.
//! - `Post::hash_tags` is `Unloaded` until explicitly loaded or joined.
//! - Hashtags are owned: one that leaves its post's collection without
//!   joining another post must be deleted.

use super::{require_text, HashTagId, PostId, ValidationError};
use crate::fetch::{Association, Relationship, POST_HASH_TAGS};
use crate::sync::{AggregateRoot, Member};

pub const WRITER_MIN_CHARS: usize = 2;
pub const WRITER_MAX_CHARS: usize = 5;
pub const TITLE_MIN_CHARS: usize = 1;
pub const TITLE_MAX_CHARS: usize = 20;

/// Persisted board post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub writer: String,
    pub title: String,
    pub content: Option<String>,
    /// Epoch milliseconds, set by storage on insert.
    pub created_at: i64,
    /// Epoch milliseconds, refreshed by storage on every update.
    pub updated_at: i64,
    pub hash_tags: Association<Vec<HashTag>>,
}

impl Post {
    /// Tag names in collection order, or `None` while the collection is unloaded.
    pub fn hash_tag_names(&self) -> Option<Vec<String>> {
        self.hash_tags
            .get()
            .map(|tags| tags.iter().map(|tag| tag.tag_name.clone()).collect())
    }
}

/// Unsaved post draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub writer: String,
    pub title: String,
    pub content: Option<String>,
}

impl NewPost {
    pub fn new(writer: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            writer: writer.into(),
            title: title.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Validates writer/title bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("writer", &self.writer, WRITER_MIN_CHARS, WRITER_MAX_CHARS)?;
        validate_title(&self.title)
    }
}

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    require_text("title", title, TITLE_MIN_CHARS, TITLE_MAX_CHARS)
}

/// Persisted hashtag attached to one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTag {
    pub id: HashTagId,
    pub tag_name: String,
    pub post_id: PostId,
}

/// Unsaved hashtag draft. Carries its owner's id from construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHashTag {
    pub tag_name: String,
    pub post_id: PostId,
}

impl NewHashTag {
    pub fn new(tag_name: impl Into<String>, post_id: PostId) -> Self {
        Self {
            tag_name: tag_name.into(),
            post_id,
        }
    }
}

/// Trims a raw tag and strips one leading `#`.
///
/// Returns `None` for values that are empty after normalization.
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Normalizes tags and drops duplicates, keeping first-seen order.
pub fn normalize_tag_names(raw: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for value in raw {
        if let Some(tag) = normalize_tag_name(value) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

impl AggregateRoot for Post {
    type Id = PostId;
    type Member = HashTag;

    const RELATIONSHIP: Relationship = POST_HASH_TAGS;

    fn root_id(&self) -> PostId {
        self.id
    }

    fn members(&self) -> &Association<Vec<HashTag>> {
        &self.hash_tags
    }

    fn members_mut(&mut self) -> &mut Association<Vec<HashTag>> {
        &mut self.hash_tags
    }
}

impl Member for HashTag {
    type Id = HashTagId;
    type RootId = PostId;

    fn member_id(&self) -> HashTagId {
        self.id
    }

    fn owner_id(&self) -> PostId {
        self.post_id
    }

    fn set_owner_id(&mut self, owner: PostId) {
        self.post_id = owner;
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag_names, NewPost};
    use crate::model::ValidationError;

    #[test]
    fn writer_length_is_bounded() {
        let err = NewPost::new("k", "title").validate().unwrap_err();
        assert!(matches!(err, ValidationError::Length { field: "writer", .. }));
        assert!(NewPost::new("kim", "title").validate().is_ok());
        assert!(NewPost::new("kimchi", "title").validate().is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = NewPost::new("kim", "   ").validate().unwrap_err();
        assert_eq!(err, ValidationError::Blank { field: "title" });
    }

    #[test]
    fn tag_names_are_trimmed_stripped_and_deduplicated() {
        let raw = vec![
            " #rust ".to_string(),
            "rust".to_string(),
            "#".to_string(),
            "jpa".to_string(),
        ];
        assert_eq!(normalize_tag_names(&raw), vec!["rust", "jpa"]);
    }
}
