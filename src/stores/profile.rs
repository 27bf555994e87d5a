/// Profile viewing and editing, plus the per-user timelines shown on a
/// profile page: the user's own posts, the posts they liked, the posts they
/// reposted and their comments
///
/// Edits apply to the viewer's own row; handle uniqueness is enforced
/// remotely and surfaces as a conflict. Avatar and cover images are uploaded
/// under the owner's id prefix and referenced by public URL. Timeline lists
/// are enriched the same way the home feed is, with the viewer's own flags.
use crate::{
    backend::{decode_rows, Bucket, DataPlane, Filter, Query, Table},
    config::FeedConfig,
    error::{ClientError, ClientResult},
    models::{CommentRow, OriginalPost, Post, PostRow, Profile, ProfileComment},
    session::SessionContext,
    stores::enrich::{enrich_posts, fetch_authors},
    toast::ToastSink,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct PostEdge {
    post_id: Uuid,
}

/// Fields of a profile edit; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
}

impl ProfilePatch {
    fn into_value(self) -> Value {
        let mut patch = serde_json::Map::new();
        if let Some(display_name) = self.display_name {
            patch.insert("display_name".to_string(), json!(display_name));
        }
        if let Some(username) = self.username {
            patch.insert("username".to_string(), json!(username));
        }
        if let Some(bio) = self.bio {
            patch.insert("bio".to_string(), json!(bio));
        }
        if let Some(avatar_url) = self.avatar_url {
            patch.insert("avatar_url".to_string(), json!(avatar_url));
        }
        if let Some(cover_url) = self.cover_url {
            patch.insert("cover_url".to_string(), json!(cover_url));
        }
        Value::Object(patch)
    }

    fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.username.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.cover_url.is_none()
    }
}

/// Profile store for viewing any user, their timelines, and editing the
/// viewer's own row
#[derive(Clone)]
pub struct ProfileStore {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    toasts: ToastSink,
    config: FeedConfig,
}

impl ProfileStore {
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
        }
    }

    /// Fetch any user's profile row
    pub async fn fetch_profile(&self, user_id: Uuid) -> ClientResult<Option<Profile>> {
        let rows = self
            .data
            .select(
                Table::Profiles,
                Query::new().filter(Filter::eq("user_id", user_id)).limit(1),
            )
            .await?;
        let mut profiles: Vec<Profile> = decode_rows(rows)?;
        Ok(profiles.pop())
    }

    /// A user's own posts, newest first, with full feed enrichment
    pub async fn user_posts(&self, user_id: Uuid) -> ClientResult<Vec<Post>> {
        let rows = self
            .data
            .select(
                Table::Posts,
                Query::new()
                    .filter(Filter::eq("user_id", user_id))
                    .order("created_at", true)
                    .limit(self.config.page_limit),
            )
            .await?;
        let rows: Vec<PostRow> = decode_rows(rows)?;
        enrich_posts(&self.data, rows, self.session.user_id()).await
    }

    /// Posts the user liked, most recently liked first
    pub async fn liked_posts(&self, user_id: Uuid) -> ClientResult<Vec<Post>> {
        self.edge_posts(Table::Likes, user_id).await
    }

    /// Posts the user reposted, most recently reposted first
    pub async fn reposted_posts(&self, user_id: Uuid) -> ClientResult<Vec<Post>> {
        self.edge_posts(Table::Reposts, user_id).await
    }

    /// Resolve a user's like/repost edges to enriched posts, keeping the
    /// edge order. Edges to deleted posts drop out.
    async fn edge_posts(&self, edge_table: Table, user_id: Uuid) -> ClientResult<Vec<Post>> {
        let rows = self
            .data
            .select(
                edge_table,
                Query::new()
                    .filter(Filter::eq("user_id", user_id))
                    .order("created_at", true)
                    .limit(self.config.page_limit),
            )
            .await?;
        let edges: Vec<PostEdge> = decode_rows(rows)?;
        if edges.is_empty() {
            return Ok(Vec::new());
        }

        // a plain and a quote repost of the same post share one entry
        let mut seen = HashSet::new();
        let post_ids: Vec<Uuid> = edges
            .iter()
            .map(|e| e.post_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let post_rows = self
            .data
            .select(
                Table::Posts,
                Query::new().filter(Filter::in_set("id", post_ids.iter())),
            )
            .await?;
        let post_rows: Vec<PostRow> = decode_rows(post_rows)?;
        let mut posts = enrich_posts(&self.data, post_rows, self.session.user_id()).await?;

        let order: HashMap<Uuid, usize> = post_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        posts.sort_by_key(|p| order.get(&p.id).copied().unwrap_or(usize::MAX));
        Ok(posts)
    }

    /// A user's comments, newest first, each with the commented post
    /// summarized; deleted posts leave `post` empty
    pub async fn user_comments(&self, user_id: Uuid) -> ClientResult<Vec<ProfileComment>> {
        let rows = self
            .data
            .select(
                Table::Comments,
                Query::new()
                    .filter(Filter::eq("user_id", user_id))
                    .order("created_at", true)
                    .limit(self.config.page_limit),
            )
            .await?;
        let comments: Vec<CommentRow> = decode_rows(rows)?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: HashSet<Uuid> = comments.iter().map(|c| c.post_id).collect();
        let post_rows = self
            .data
            .select(
                Table::Posts,
                Query::new().filter(Filter::in_set("id", post_ids.iter())),
            )
            .await?;
        let posts: Vec<PostRow> = decode_rows(post_rows)?;

        let author_ids: HashSet<Uuid> = posts.iter().map(|p| p.user_id).collect();
        let authors = fetch_authors(&self.data, &author_ids).await?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let post = posts.iter().find(|p| p.id == comment.post_id).map(|p| {
                    OriginalPost {
                        id: p.id,
                        content: p.content.clone(),
                        image_url: p.image_url.clone(),
                        author: authors.get(&p.user_id).cloned(),
                    }
                });
                ProfileComment {
                    id: comment.id,
                    post_id: comment.post_id,
                    parent_comment_id: comment.parent_comment_id,
                    content: comment.content,
                    created_at: comment.created_at,
                    post,
                }
            })
            .collect())
    }

    /// Apply a partial edit to the viewer's own profile
    pub async fn update_profile(&self, patch: ProfilePatch) -> ClientResult<()> {
        let user_id = self.session.require_user()?;
        if patch.is_empty() {
            return Ok(());
        }
        if let Some(display_name) = &patch.display_name {
            if display_name.chars().count() < 2 {
                self.toasts.error("ชื่อที่แสดงต้องมีอย่างน้อย 2 ตัวอักษร");
                return Err(ClientError::Validation(
                    "Display name too short".to_string(),
                ));
            }
        }

        match self
            .data
            .update(
                Table::Profiles,
                vec![Filter::eq("user_id", user_id)],
                patch.into_value(),
            )
            .await
        {
            Ok(()) => {
                self.toasts.success("บันทึกสำเร็จ! ✨");
                if let Err(e) = self.session.refresh_profile().await {
                    error!("Failed to refresh profile after edit: {}", e);
                }
                Ok(())
            }
            Err(ClientError::Conflict(message)) => {
                self.toasts
                    .error("ชื่อผู้ใช้นี้ถูกใช้งานแล้ว กรุณาเลือกชื่ออื่น");
                Err(ClientError::Conflict(message))
            }
            Err(e) => {
                error!("Error updating profile: {}", e);
                self.toasts.error("ไม่สามารถบันทึกได้");
                Err(e)
            }
        }
    }

    /// Upload a new avatar, returning its public URL
    pub async fn upload_avatar(
        &self,
        bytes: Vec<u8>,
        extension: &str,
        content_type: &str,
    ) -> ClientResult<String> {
        self.upload_image(Bucket::Avatars, bytes, extension, content_type)
            .await
    }

    /// Upload a new cover image, returning its public URL
    pub async fn upload_cover(
        &self,
        bytes: Vec<u8>,
        extension: &str,
        content_type: &str,
    ) -> ClientResult<String> {
        self.upload_image(Bucket::Covers, bytes, extension, content_type)
            .await
    }

    async fn upload_image(
        &self,
        bucket: Bucket,
        bytes: Vec<u8>,
        extension: &str,
        content_type: &str,
    ) -> ClientResult<String> {
        let user_id = self.session.require_user()?;
        let object = format!("{}/{}.{}", user_id, Uuid::new_v4(), extension);
        match self.data.upload(bucket, &object, bytes, content_type).await {
            Ok(url) => Ok(url),
            Err(e) => {
                error!("Error uploading image: {}", e);
                self.toasts.error("ไม่สามารถอัปโหลดรูปได้");
                Err(e)
            }
        }
    }
}
