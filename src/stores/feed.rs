/// Home feed store
///
/// Caches the newest posts and quote reposts, applies optimistic toggles
/// with compensating rollback, and patches itself incrementally from the
/// realtime change feed.
use crate::{
    backend::{
        decode_rows, Bucket, ChangeEvent, ChangeKind, DataPlane, Filter, Query, Realtime,
        Table,
    },
    config::FeedConfig,
    error::{ClientError, ClientResult},
    models::{
        FeedItem, Hashtag, OriginalPost, Post, PostRow, QuoteRepost, RepostRow,
        DELETED_POST_PLACEHOLDER,
    },
    session::SessionContext,
    stores::enrich::{enrich_post, enrich_posts, fetch_authors, fetch_post_enrichment},
    toast::ToastSink,
};
use chrono::Utc;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, warn};
use uuid::Uuid;

lazy_static! {
    /// Hashtag token: `#` followed by word or Thai characters
    static ref HASHTAG_RE: Regex = Regex::new(r"#[\wก-๙]+").unwrap();
}

/// Extract lowercased hashtags from a post body
pub fn extract_hashtags(content: &str) -> Vec<String> {
    HASHTAG_RE
        .find_iter(content)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Image attachment for a new post
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// File extension without the dot, e.g. "jpg"
    pub extension: String,
    pub content_type: String,
}

#[derive(Default)]
struct FeedState {
    posts: Vec<Post>,
    quote_reposts: Vec<QuoteRepost>,
}

/// Feed store; cheap to clone, state is shared
#[derive(Clone)]
pub struct FeedStore {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    toasts: ToastSink,
    config: FeedConfig,
    state: Arc<RwLock<FeedState>>,
}

impl FeedStore {
    pub fn new(
        data: Arc<dyn DataPlane>,
        session: SessionContext,
        toasts: ToastSink,
        config: FeedConfig,
    ) -> Self {
        Self {
            data,
            session,
            toasts,
            config,
            state: Arc::new(RwLock::new(FeedState::default())),
        }
    }

    /// Snapshot of the cached posts, newest first
    pub fn posts(&self) -> Vec<Post> {
        self.state.read().posts.clone()
    }

    /// Snapshot of the cached quote reposts, newest first
    pub fn quote_reposts(&self) -> Vec<QuoteRepost> {
        self.state.read().quote_reposts.clone()
    }

    /// Merge posts and quote reposts into one timeline sorted by timestamp
    /// descending; ties keep their relative order
    pub fn merged_feed(&self) -> Vec<FeedItem> {
        let state = self.state.read();
        let mut items: Vec<FeedItem> = state
            .posts
            .iter()
            .cloned()
            .map(FeedItem::Post)
            .chain(
                state
                    .quote_reposts
                    .iter()
                    .cloned()
                    .map(FeedItem::QuoteRepost),
            )
            .collect();
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        items
    }

    /// Re-fetch the post feed and its enrichment
    pub async fn refresh(&self) -> ClientResult<()> {
        let rows = self
            .data
            .select(
                Table::Posts,
                Query::new()
                    .order("created_at", true)
                    .limit(self.config.page_limit),
            )
            .await?;
        let rows: Vec<PostRow> = decode_rows(rows)?;
        let posts = enrich_posts(&self.data, rows, self.session.user_id()).await?;
        self.state.write().posts = posts;
        Ok(())
    }

    /// Re-fetch quote reposts with their quoters and original posts
    pub async fn refresh_quote_reposts(&self) -> ClientResult<()> {
        let rows = self
            .data
            .select(
                Table::Reposts,
                Query::new()
                    .filter(Filter::NotNull("quote_content"))
                    .order("created_at", true)
                    .limit(self.config.page_limit),
            )
            .await?;
        let reposts: Vec<RepostRow> = decode_rows(rows)?;
        if reposts.is_empty() {
            self.state.write().quote_reposts = Vec::new();
            return Ok(());
        }

        let quoter_ids: HashSet<Uuid> = reposts.iter().map(|r| r.user_id).collect();
        let post_ids: HashSet<Uuid> = reposts.iter().map(|r| r.post_id).collect();

        let post_rows = self
            .data
            .select(
                Table::Posts,
                Query::new().filter(Filter::in_set("id", post_ids.iter())),
            )
            .await?;
        let originals: Vec<PostRow> = decode_rows(post_rows)?;
        let original_author_ids: HashSet<Uuid> = originals.iter().map(|p| p.user_id).collect();

        let author_ids: HashSet<Uuid> =
            quoter_ids.union(&original_author_ids).copied().collect();
        let authors = fetch_authors(&self.data, &author_ids).await?;
        let enrichment =
            fetch_post_enrichment(&self.data, &post_ids, self.session.user_id()).await?;

        let quote_reposts = reposts
            .into_iter()
            .map(|repost| {
                let original = originals.iter().find(|p| p.id == repost.post_id);
                let original_post = match original {
                    Some(post) => OriginalPost {
                        id: post.id,
                        content: post.content.clone(),
                        image_url: post.image_url.clone(),
                        author: authors.get(&post.user_id).cloned(),
                    },
                    // Cascade already removed the post; keep the quote visible
                    None => OriginalPost {
                        id: repost.post_id,
                        content: DELETED_POST_PLACEHOLDER.to_string(),
                        image_url: None,
                        author: None,
                    },
                };
                let counts = enrichment.counts_for(repost.post_id);
                QuoteRepost {
                    quoter: authors.get(&repost.user_id).cloned(),
                    original_post,
                    likes_count: counts.likes_count,
                    comments_count: counts.comments_count,
                    reposts_count: counts.reposts_count,
                    is_liked: enrichment.liked.contains(&repost.post_id),
                    is_reposted: enrichment.reposted.contains(&repost.post_id),
                    id: repost.id,
                    user_id: repost.user_id,
                    post_id: repost.post_id,
                    quote_content: repost.quote_content.unwrap_or_default(),
                    created_at: repost.created_at,
                }
            })
            .collect();
        self.state.write().quote_reposts = quote_reposts;
        Ok(())
    }

    /// Fetch a single post with full enrichment
    pub async fn fetch_post(&self, post_id: Uuid) -> ClientResult<Option<Post>> {
        let rows = self
            .data
            .select(
                Table::Posts,
                Query::new().filter(Filter::eq("id", post_id)).limit(1),
            )
            .await?;
        let mut rows: Vec<PostRow> = decode_rows(rows)?;
        match rows.pop() {
            Some(row) => Ok(Some(
                enrich_post(&self.data, row, self.session.user_id()).await?,
            )),
            None => Ok(None),
        }
    }

    /// Create a post, uploading the image first when present and recording
    /// its hashtags afterwards
    pub async fn create_post(
        &self,
        content: &str,
        image: Option<ImageUpload>,
    ) -> ClientResult<()> {
        let user_id = match self.session.require_user() {
            Ok(user_id) => user_id,
            Err(e) => {
                self.toasts.error("กรุณาเข้าสู่ระบบ");
                return Err(e);
            }
        };

        let result: ClientResult<()> = async {
            let image_url = match image {
                Some(image) => {
                    let object =
                        format!("{}/{}.{}", user_id, Uuid::new_v4(), image.extension);
                    Some(
                        self.data
                            .upload(Bucket::Posts, &object, image.bytes, &image.content_type)
                            .await?,
                    )
                }
                None => None,
            };

            self.data
                .insert(
                    Table::Posts,
                    json!({
                        "user_id": user_id,
                        "content": content,
                        "image_url": image_url,
                    }),
                )
                .await?;

            for tag in extract_hashtags(content) {
                self.upsert_hashtag(&tag).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.toasts.success("โพสต์สำเร็จ!");
                Ok(())
            }
            Err(e) => {
                error!("Error creating post: {}", e);
                self.toasts.error("ไม่สามารถโพสต์ได้");
                Err(e)
            }
        }
    }

    /// Bump an existing hashtag or create it
    async fn upsert_hashtag(&self, tag: &str) -> ClientResult<()> {
        let rows = self
            .data
            .select(
                Table::Hashtags,
                Query::new().filter(Filter::eq("tag", tag)).limit(1),
            )
            .await?;
        let mut existing: Vec<Hashtag> = decode_rows(rows)?;
        match existing.pop() {
            Some(hashtag) => {
                self.data
                    .update(
                        Table::Hashtags,
                        vec![Filter::eq("id", hashtag.id)],
                        json!({
                            "post_count": hashtag.post_count + 1,
                            "last_used_at": Utc::now(),
                        }),
                    )
                    .await
            }
            None => {
                self.data
                    .insert(Table::Hashtags, json!({ "tag": tag, "post_count": 1 }))
                    .await?;
                Ok(())
            }
        }
    }

    /// Delete one of the viewer's own posts
    pub async fn delete_post(&self, post_id: Uuid) -> ClientResult<()> {
        let user_id = self.session.require_user()?;
        match self
            .data
            .delete(
                Table::Posts,
                vec![Filter::eq("id", post_id), Filter::eq("user_id", user_id)],
            )
            .await
        {
            Ok(()) => {
                self.state.write().posts.retain(|p| p.id != post_id);
                self.toasts.success("ลบโพสต์แล้ว");
                Ok(())
            }
            Err(e) => {
                error!("Error deleting post: {}", e);
                self.toasts.error("ไม่สามารถลบโพสต์ได้");
                Err(e)
            }
        }
    }

    /// Flip the like flag and counter on the cached post; returns the state
    /// before the flip so a failed request can be compensated
    fn flip_like(&self, post_id: Uuid) -> Option<bool> {
        let mut state = self.state.write();
        let post = state.posts.iter_mut().find(|p| p.id == post_id)?;
        let was_liked = post.is_liked;
        post.is_liked = !was_liked;
        post.likes_count = if was_liked {
            (post.likes_count - 1).max(0)
        } else {
            post.likes_count + 1
        };
        Some(was_liked)
    }

    /// Toggle the viewer's like on a post
    ///
    /// The flag and counter flip optimistically before the request; a failed
    /// request rolls both back.
    pub async fn toggle_like(&self, post_id: Uuid) -> ClientResult<()> {
        let user_id = match self.session.require_user() {
            Ok(user_id) => user_id,
            Err(e) => {
                self.toasts.error("กรุณาเข้าสู่ระบบ");
                return Err(e);
            }
        };

        let was_liked = match self.flip_like(post_id) {
            Some(was_liked) => was_liked,
            None => return Ok(()), // post not in the cached feed
        };

        let result = if was_liked {
            self.data
                .delete(
                    Table::Likes,
                    vec![
                        Filter::eq("user_id", user_id),
                        Filter::eq("post_id", post_id),
                    ],
                )
                .await
        } else {
            self.data
                .insert(
                    Table::Likes,
                    json!({ "user_id": user_id, "post_id": post_id }),
                )
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            error!("Error toggling like: {}", e);
            self.flip_like(post_id);
            self.toasts.error(e.user_message());
            return Err(e);
        }
        Ok(())
    }

    fn flip_repost(&self, post_id: Uuid) -> Option<bool> {
        let mut state = self.state.write();
        let post = state.posts.iter_mut().find(|p| p.id == post_id)?;
        let was_reposted = post.is_reposted;
        post.is_reposted = !was_reposted;
        post.reposts_count = if was_reposted {
            (post.reposts_count - 1).max(0)
        } else {
            post.reposts_count + 1
        };
        Some(was_reposted)
    }

    /// Toggle the viewer's plain repost on a post, optimistically with
    /// rollback on failure
    pub async fn toggle_repost(&self, post_id: Uuid) -> ClientResult<()> {
        let user_id = match self.session.require_user() {
            Ok(user_id) => user_id,
            Err(e) => {
                self.toasts.error("กรุณาเข้าสู่ระบบ");
                return Err(e);
            }
        };

        let was_reposted = match self.flip_repost(post_id) {
            Some(was_reposted) => was_reposted,
            None => return Ok(()),
        };

        let result = if was_reposted {
            self.data
                .delete(
                    Table::Reposts,
                    vec![
                        Filter::eq("user_id", user_id),
                        Filter::eq("post_id", post_id),
                    ],
                )
                .await
        } else {
            self.data
                .insert(
                    Table::Reposts,
                    json!({ "user_id": user_id, "post_id": post_id }),
                )
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            error!("Error toggling repost: {}", e);
            self.flip_repost(post_id);
            self.toasts.error(e.user_message());
            return Err(e);
        }
        Ok(())
    }

    /// Repost with quoted commentary
    ///
    /// The cached flag and counter bump optimistically like the plain
    /// toggles; a failed insert restores both.
    pub async fn quote_repost(&self, post_id: Uuid, quote_content: &str) -> ClientResult<()> {
        let user_id = match self.session.require_user() {
            Ok(user_id) => user_id,
            Err(e) => {
                self.toasts.error("กรุณาเข้าสู่ระบบ");
                return Err(e);
            }
        };

        // prior (flag, count) for rollback; None when the post is not cached
        let prior = {
            let mut state = self.state.write();
            state.posts.iter_mut().find(|p| p.id == post_id).map(|post| {
                let prior = (post.is_reposted, post.reposts_count);
                post.is_reposted = true;
                post.reposts_count += 1;
                prior
            })
        };

        match self
            .data
            .insert(
                Table::Reposts,
                json!({
                    "user_id": user_id,
                    "post_id": post_id,
                    "quote_content": quote_content,
                }),
            )
            .await
        {
            Ok(_) => {
                self.toasts.success("โควตรีโพสต์สำเร็จ!");
                Ok(())
            }
            Err(e) => {
                error!("Error quote reposting: {}", e);
                if let Some((was_reposted, count)) = prior {
                    let mut state = self.state.write();
                    if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
                        post.is_reposted = was_reposted;
                        post.reposts_count = count;
                    }
                }
                self.toasts.error("ไม่สามารถโควตรีโพสต์ได้");
                Err(e)
            }
        }
    }

    /// Trending hashtags, precomputed remotely
    pub async fn trending_hashtags(&self) -> ClientResult<Vec<Hashtag>> {
        let value = self
            .data
            .rpc(
                "get_trending_hashtags",
                json!({ "limit_count": self.config.trending_limit }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Apply one change event from the posts channel, keyed by row id.
    /// Unknown updates fall back to a full refresh.
    pub async fn apply_change(&self, event: ChangeEvent) -> ClientResult<()> {
        match event.kind {
            ChangeKind::Insert => {
                let row: PostRow = serde_json::from_value(event.row)?;
                if self.state.read().posts.iter().any(|p| p.id == row.id) {
                    return Ok(());
                }
                let post = enrich_post(&self.data, row, self.session.user_id()).await?;
                let mut state = self.state.write();
                state.posts.push(post);
                state
                    .posts
                    .sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            ChangeKind::Update => {
                let row: PostRow = serde_json::from_value(event.row)?;
                let known = {
                    let mut state = self.state.write();
                    match state.posts.iter_mut().find(|p| p.id == row.id) {
                        Some(post) => {
                            post.content = row.content.clone();
                            post.image_url = row.image_url.clone();
                            true
                        }
                        None => false,
                    }
                };
                if !known {
                    warn!(post_id = %row.id, "Update for unknown post, refreshing feed");
                    self.refresh().await?;
                }
            }
            ChangeKind::Delete => {
                if let Some(id) = event.row.get("id").and_then(|v| v.as_str()) {
                    if let Ok(id) = Uuid::parse_str(id) {
                        self.state.write().posts.retain(|p| p.id != id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Open the posts change feed and patch the store until the task is
    /// aborted or the subscription ends
    pub fn spawn_realtime(&self, realtime: &Realtime) -> ClientResult<JoinHandle<()>> {
        let mut subscription = realtime.subscribe(Table::Posts, None)?;
        let store = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let Err(e) = store.apply_change(event).await {
                    error!("Failed to apply feed change: {}", e);
                }
            }
        }))
    }
}
