//! Post/hashtag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist posts and their owned hashtags as independent rows.
//! - Offer a lazy listing (`query_posts`) and a batched join listing
//!   (`query_posts_with_hash_tags`) with identical paging semantics.
//!
//! # Invariants
//! - Posts read by id or by `query_posts` carry `hash_tags = Unloaded`.
//! - `query_posts_with_hash_tags` issues exactly one statement per call.
//! - Deleting a post deletes its hashtags (`ON DELETE CASCADE`).
//! - Persisting a hashtag never touches any in-memory `Post`; callers
//!   reconcile with `sync::attach_member`.

use super::{resolve_order, run_paged, MemberJoin, PagedSelect, RepoError, RepoResult, SortField};
use crate::fetch::{Association, RoundTrips};
use crate::model::post::{HashTag, NewHashTag, NewPost, Post};
use crate::model::{HashTagId, PostId};
use crate::pagination::{PageRequest, SortDirection, SortKey};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

const POST_COLUMNS: &[&str] = &[
    "post_no",
    "writer",
    "title",
    "content",
    "create_date",
    "update_date",
];
const HASH_TAG_COLUMNS: &[&str] = &["tag_no", "tag_name", "post_no"];

/// Sortable post columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    Id,
    CreatedAt,
    UpdatedAt,
    Writer,
    Title,
}

impl SortField for PostSort {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "post_no",
            Self::CreatedAt => "create_date",
            Self::UpdatedAt => "update_date",
            Self::Writer => "writer",
            Self::Title => "title",
        }
    }
}

/// Filter for post listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCriteria {
    /// Exact writer match.
    pub writer: Option<String>,
}

/// Storage contract for posts.
pub trait PostRepository {
    /// Runs `work` inside one storage transaction; rolls back on error.
    fn transaction<T>(&self, work: impl FnOnce(&Self) -> RepoResult<T>) -> RepoResult<T>
    where
        Self: Sized;
    /// Inserts a post and returns it with its storage-assigned id and an
    /// empty, loaded hashtag collection.
    fn persist_post(&self, post: &NewPost) -> RepoResult<Post>;
    /// Writes scalar fields and returns the post with a refreshed `updated_at`.
    fn update_post(&self, post: &Post) -> RepoResult<Post>;
    fn find_post(&self, id: PostId) -> RepoResult<Option<Post>>;
    fn delete_post(&self, id: PostId) -> RepoResult<()>;
    /// One page of posts with hashtags left unloaded.
    fn query_posts(
        &self,
        criteria: &PostCriteria,
        sort: &[SortKey<PostSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Post>, u64)>;
    /// One page of posts with hashtags joined in the same statement.
    fn query_posts_with_hash_tags(
        &self,
        criteria: &PostCriteria,
        sort: &[SortKey<PostSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Post>, u64)>;
    /// Explicit lazy load of one post's hashtags.
    fn load_hash_tags(&self, post: &mut Post) -> RepoResult<()>;
    fn round_trips(&self) -> &RoundTrips;
}

/// Storage contract for hashtags as independently persisted rows.
pub trait HashTagRepository {
    fn persist_hash_tag(&self, tag: &NewHashTag) -> RepoResult<HashTag>;
    fn find_hash_tag(&self, id: HashTagId) -> RepoResult<Option<HashTag>>;
    fn find_hash_tags_by_post(&self, post_id: PostId) -> RepoResult<Vec<HashTag>>;
    /// Persists a new owner for an existing hashtag.
    fn update_hash_tag_owner(&self, id: HashTagId, post_id: PostId) -> RepoResult<()>;
    fn delete_hash_tag(&self, id: HashTagId) -> RepoResult<()>;
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
    round_trips: RoundTrips,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            round_trips: RoundTrips::new(),
        }
    }

    fn query_page(
        &self,
        criteria: &PostCriteria,
        sort: &[SortKey<PostSort>],
        page: &PageRequest,
        with_hash_tags: bool,
    ) -> RepoResult<(Vec<Post>, u64)> {
        let mut filtered = String::from(
            "SELECT post_no, writer, title, content, create_date, update_date FROM tbl_post",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(writer) = criteria.writer.as_ref() {
            filtered.push_str(" WHERE writer = ?");
            bind_values.push(Value::Text(writer.clone()));
        }

        let order = resolve_order(sort, "post_no", SortDirection::Desc);
        let select = PagedSelect {
            filtered: &filtered,
            root_key: "post_no",
            root_columns: POST_COLUMNS,
            order: &order,
            join: with_hash_tags.then_some(MemberJoin {
                table: "tbl_hash_tag",
                foreign_key: "post_no",
                member_key: "tag_no",
                columns: HASH_TAG_COLUMNS,
            }),
        };

        self.round_trips.record(if with_hash_tags {
            "query_posts_with_hash_tags"
        } else {
            "query_posts"
        });

        let mut posts: Vec<Post> = Vec::new();
        let total = run_paged(self.conn, &select, bind_values, page, |row| {
            let post_id = PostId(row.get("post_no")?);
            if posts.last().map(|post| post.id) != Some(post_id) {
                let mut post = parse_post_row(row)?;
                if with_hash_tags {
                    post.hash_tags = Association::Loaded(Vec::new());
                }
                posts.push(post);
            }
            if with_hash_tags {
                if let Some(tag_no) = row.get::<_, Option<i64>>("m_tag_no")? {
                    let tag = HashTag {
                        id: HashTagId(tag_no),
                        tag_name: row.get("m_tag_name")?,
                        post_id: PostId(row.get("m_post_no")?),
                    };
                    if let Some(tags) = posts
                        .last_mut()
                        .and_then(|post| post.hash_tags.get_mut())
                    {
                        tags.push(tag);
                    }
                }
            }
            Ok(())
        })?;

        Ok((posts, total))
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn transaction<T>(&self, work: impl FnOnce(&Self) -> RepoResult<T>) -> RepoResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = work(self)?;
        tx.commit()?;
        Ok(value)
    }

    fn persist_post(&self, post: &NewPost) -> RepoResult<Post> {
        post.validate()?;

        self.round_trips.record("persist_post");
        let (id, created_at, updated_at) = self.conn.query_row(
            "INSERT INTO tbl_post (writer, title, content)
             VALUES (?1, ?2, ?3)
             RETURNING post_no, create_date, update_date;",
            params![post.writer, post.title, post.content],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Post {
            id: PostId(id),
            writer: post.writer.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            created_at,
            updated_at,
            hash_tags: Association::Loaded(Vec::new()),
        })
    }

    fn update_post(&self, post: &Post) -> RepoResult<Post> {
        crate::model::post::validate_title(&post.title)?;

        self.round_trips.record("update_post");
        let updated_at: Option<i64> = self
            .conn
            .query_row(
                "UPDATE tbl_post
                 SET
                    title = ?1,
                    content = ?2,
                    update_date = (strftime('%s', 'now') * 1000)
                 WHERE post_no = ?3
                 RETURNING update_date;",
                params![post.title, post.content, post.id.0],
                |row| row.get(0),
            )
            .optional()?;

        let Some(updated_at) = updated_at else {
            return Err(RepoError::not_found("post", post.id));
        };
        Ok(Post {
            updated_at,
            ..post.clone()
        })
    }

    fn find_post(&self, id: PostId) -> RepoResult<Option<Post>> {
        self.round_trips.record("find_post");
        let mut stmt = self.conn.prepare(
            "SELECT post_no, writer, title, content, create_date, update_date
             FROM tbl_post
             WHERE post_no = ?1;",
        )?;
        let mut rows = stmt.query([id.0])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_post_row(row)?));
        }
        Ok(None)
    }

    fn delete_post(&self, id: PostId) -> RepoResult<()> {
        self.round_trips.record("delete_post");
        let changed = self
            .conn
            .execute("DELETE FROM tbl_post WHERE post_no = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::not_found("post", id));
        }
        Ok(())
    }

    fn query_posts(
        &self,
        criteria: &PostCriteria,
        sort: &[SortKey<PostSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Post>, u64)> {
        self.query_page(criteria, sort, page, false)
    }

    fn query_posts_with_hash_tags(
        &self,
        criteria: &PostCriteria,
        sort: &[SortKey<PostSort>],
        page: &PageRequest,
    ) -> RepoResult<(Vec<Post>, u64)> {
        self.query_page(criteria, sort, page, true)
    }

    fn load_hash_tags(&self, post: &mut Post) -> RepoResult<()> {
        self.round_trips.record("load_hash_tags");
        let tags = select_hash_tags_by_post(self.conn, post.id)?;
        post.hash_tags.set(tags);
        Ok(())
    }

    fn round_trips(&self) -> &RoundTrips {
        &self.round_trips
    }
}

/// SQLite-backed hashtag repository.
pub struct SqliteHashTagRepository<'conn> {
    conn: &'conn Connection,
    round_trips: RoundTrips,
}

impl<'conn> SqliteHashTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            round_trips: RoundTrips::new(),
        }
    }

    pub fn round_trips(&self) -> &RoundTrips {
        &self.round_trips
    }
}

impl HashTagRepository for SqliteHashTagRepository<'_> {
    fn persist_hash_tag(&self, tag: &NewHashTag) -> RepoResult<HashTag> {
        self.round_trips.record("persist_hash_tag");
        let id: i64 = self.conn.query_row(
            "INSERT INTO tbl_hash_tag (tag_name, post_no)
             VALUES (?1, ?2)
             RETURNING tag_no;",
            params![tag.tag_name, tag.post_id.0],
            |row| row.get(0),
        )?;
        Ok(HashTag {
            id: HashTagId(id),
            tag_name: tag.tag_name.clone(),
            post_id: tag.post_id,
        })
    }

    fn find_hash_tag(&self, id: HashTagId) -> RepoResult<Option<HashTag>> {
        self.round_trips.record("find_hash_tag");
        let tag = self
            .conn
            .query_row(
                "SELECT tag_no, tag_name, post_no FROM tbl_hash_tag WHERE tag_no = ?1;",
                [id.0],
                parse_hash_tag_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn find_hash_tags_by_post(&self, post_id: PostId) -> RepoResult<Vec<HashTag>> {
        self.round_trips.record("find_hash_tags_by_post");
        select_hash_tags_by_post(self.conn, post_id)
    }

    fn update_hash_tag_owner(&self, id: HashTagId, post_id: PostId) -> RepoResult<()> {
        self.round_trips.record("update_hash_tag_owner");
        let changed = self.conn.execute(
            "UPDATE tbl_hash_tag SET post_no = ?1 WHERE tag_no = ?2;",
            params![post_id.0, id.0],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("hash_tag", id));
        }
        Ok(())
    }

    fn delete_hash_tag(&self, id: HashTagId) -> RepoResult<()> {
        self.round_trips.record("delete_hash_tag");
        let changed = self
            .conn
            .execute("DELETE FROM tbl_hash_tag WHERE tag_no = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::not_found("hash_tag", id));
        }
        Ok(())
    }
}

fn select_hash_tags_by_post(conn: &Connection, post_id: PostId) -> RepoResult<Vec<HashTag>> {
    let mut stmt = conn.prepare(
        "SELECT tag_no, tag_name, post_no
         FROM tbl_hash_tag
         WHERE post_no = ?1
         ORDER BY tag_no ASC;",
    )?;
    let tags = stmt
        .query_map([post_id.0], parse_hash_tag_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<Post> {
    Ok(Post {
        id: PostId(row.get("post_no")?),
        writer: row.get("writer")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("create_date")?,
        updated_at: row.get("update_date")?,
        hash_tags: Association::Unloaded,
    })
}

fn parse_hash_tag_row(row: &Row<'_>) -> rusqlite::Result<HashTag> {
    Ok(HashTag {
        id: HashTagId(row.get("tag_no")?),
        tag_name: row.get("tag_name")?,
        post_id: PostId(row.get("post_no")?),
    })
}
