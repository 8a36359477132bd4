//! Board post use-case service.
//!
//! # Responsibility
//! - Create, read, modify and delete posts together with their hashtags.
//! - Keep a post's in-memory hashtag collection in step with the
//!   hashtags persisted during the same call.
//! - Produce paged list responses with a page window.
//!
//! # Invariants
//! - Post listings are sorted by `created_at DESC, post_no DESC`.
//! - Post plus hashtag inserts run in one transaction.
//! - Foreign keys are persisted before the in-memory collections change, so
//!   a storage failure leaves the loaded aggregates untouched.

use super::{ListingPolicy, ServiceError, ServiceResult};
use crate::model::post::{normalize_tag_names, NewHashTag, NewPost, Post};
use crate::model::{HashTagId, PostId};
use crate::pagination::{window_for, PageWindow, SortKey};
use crate::repo::post_repo::{HashTagRepository, PostCriteria, PostRepository, PostSort};
use crate::sync::{attach_member, detach_member, ensure_owned_by, reassign_member, AggregateRoot};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Create request for one post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCreate {
    pub writer: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Raw tag names; blanks and duplicates are dropped, leading `#` stripped.
    #[serde(default)]
    pub hash_tags: Vec<String>,
}

/// Modify request; writer and hashtags are not editable here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostModify {
    pub post_no: PostId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub post_no: PostId,
    pub writer: String,
    pub title: String,
    pub content: Option<String>,
    pub hash_tags: Vec<String>,
    /// Creation time, epoch milliseconds.
    pub reg_date: i64,
}

impl PostDetail {
    fn from_post(post: &Post) -> Self {
        Self {
            post_no: post.id,
            writer: post.writer.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            hash_tags: post.hash_tag_names().unwrap_or_default(),
            reg_date: post.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    /// Number of posts on this page.
    pub count: usize,
    pub page_info: PageWindow,
    pub posts: Vec<PostDetail>,
}

/// Both posts touched by a hashtag move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedHashTag {
    pub from: PostDetail,
    pub to: PostDetail,
}

/// Post service facade over repository implementations.
pub struct PostService<P: PostRepository, T: HashTagRepository> {
    posts: P,
    tags: T,
    policy: ListingPolicy,
}

impl<P: PostRepository, T: HashTagRepository> PostService<P, T> {
    pub fn new(posts: P, tags: T) -> Self {
        Self::with_policy(posts, tags, ListingPolicy::default())
    }

    pub fn with_policy(posts: P, tags: T, policy: ListingPolicy) -> Self {
        Self {
            posts,
            tags,
            policy,
        }
    }

    pub fn post_repo(&self) -> &P {
        &self.posts
    }

    /// Lists one page of posts, newest first, with hashtags joined in.
    ///
    /// # Errors
    /// - `InvalidPageRequest` for a page or size below 1; storage is not
    ///   touched in that case.
    pub fn list_posts(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> ServiceResult<PostListResponse> {
        let request = self.policy.page_request(page, size)?;
        let (posts, total) = self.posts.query_posts_with_hash_tags(
            &PostCriteria::default(),
            &[SortKey::desc(PostSort::CreatedAt)],
            &request,
        )?;
        let page_info = window_for(&request, total, self.policy.window_size());
        debug!(
            "event=page_window module=service list=posts page={} start={} end={} total={}",
            page_info.current_page, page_info.start_page, page_info.end_page, total
        );

        let posts: Vec<PostDetail> = posts.iter().map(PostDetail::from_post).collect();
        Ok(PostListResponse {
            count: posts.len(),
            page_info,
            posts,
        })
    }

    pub fn get_detail(&self, id: PostId) -> ServiceResult<PostDetail> {
        let post = self.load_post(id)?;
        Ok(PostDetail::from_post(&post))
    }

    /// Persists a post and its hashtags, returning the detail assembled from
    /// the in-memory aggregate.
    pub fn insert(&self, request: PostCreate) -> ServiceResult<PostDetail> {
        let mut draft = NewPost::new(request.writer, request.title);
        draft.content = request.content;
        draft.validate()?;
        let tag_names = normalize_tag_names(&request.hash_tags);

        let post = self.posts.transaction(|posts| {
            let mut post = posts.persist_post(&draft)?;
            for name in &tag_names {
                let mut tag = self
                    .tags
                    .persist_hash_tag(&NewHashTag::new(name.as_str(), post.id))?;
                attach_member(&mut post, &mut tag);
            }
            Ok(post)
        })?;

        info!(
            "event=post_insert module=service status=ok post_no={} tags={}",
            post.id,
            tag_names.len()
        );
        Ok(PostDetail::from_post(&post))
    }

    pub fn modify(&self, request: PostModify) -> ServiceResult<PostDetail> {
        let mut post = self.find_post(request.post_no)?;
        post.title = request.title;
        post.content = request.content;

        let mut post = self.posts.update_post(&post)?;
        self.posts.load_hash_tags(&mut post)?;
        info!(
            "event=post_modify module=service status=ok post_no={}",
            post.id
        );
        Ok(PostDetail::from_post(&post))
    }

    /// Deletes the post; its hashtags go with it.
    pub fn delete(&self, id: PostId) -> ServiceResult<()> {
        self.posts.delete_post(id)?;
        info!("event=post_delete module=service status=ok post_no={id}");
        Ok(())
    }

    /// Removes one hashtag from its post and deletes it.
    ///
    /// # Errors
    /// - `NotFound` for an unknown post or hashtag.
    /// - `InconsistentState` when the hashtag belongs to another post.
    pub fn remove_hash_tag(&self, post_id: PostId, tag_id: HashTagId) -> ServiceResult<PostDetail> {
        let mut post = self.load_post(post_id)?;
        let tag = self
            .tags
            .find_hash_tag(tag_id)?
            .ok_or_else(|| ServiceError::not_found("hash_tag", tag_id))?;
        ensure_owned_by(&tag, &post)?;

        if Post::RELATIONSHIP.removes_orphans() {
            self.tags.delete_hash_tag(tag_id)?;
        }
        detach_member(&mut post, tag_id);
        info!(
            "event=hash_tag_remove module=service status=ok post_no={post_id} tag_no={tag_id}"
        );
        Ok(PostDetail::from_post(&post))
    }

    /// Moves one hashtag from `from` to `to`.
    ///
    /// # Errors
    /// - `NotFound` for an unknown post or hashtag.
    /// - `InconsistentState` when the hashtag is not owned by `from`; nothing
    ///   is persisted in that case.
    pub fn move_hash_tag(
        &self,
        tag_id: HashTagId,
        from: PostId,
        to: PostId,
    ) -> ServiceResult<MovedHashTag> {
        let mut from_post = self.load_post(from)?;
        let mut tag = self
            .tags
            .find_hash_tag(tag_id)?
            .ok_or_else(|| ServiceError::not_found("hash_tag", tag_id))?;
        ensure_owned_by(&tag, &from_post)?;
        if from == to {
            let detail = PostDetail::from_post(&from_post);
            return Ok(MovedHashTag {
                from: detail.clone(),
                to: detail,
            });
        }
        let mut to_post = self.load_post(to)?;

        self.tags.update_hash_tag_owner(tag.id, to_post.id)?;
        reassign_member(&mut tag, &from_post, &mut to_post)?;
        detach_member(&mut from_post, tag.id);

        info!(
            "event=hash_tag_move module=service status=ok tag_no={tag_id} from={from} to={to}"
        );
        Ok(MovedHashTag {
            from: PostDetail::from_post(&from_post),
            to: PostDetail::from_post(&to_post),
        })
    }

    fn find_post(&self, id: PostId) -> ServiceResult<Post> {
        self.posts
            .find_post(id)?
            .ok_or_else(|| ServiceError::not_found("post", id))
    }

    fn load_post(&self, id: PostId) -> ServiceResult<Post> {
        let mut post = self.find_post(id)?;
        self.posts.load_hash_tags(&mut post)?;
        Ok(post)
    }
}
