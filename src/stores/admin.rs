/// Admin panel operations: platform stats, user role management and
/// moderation deletes
///
/// Moderation deletes are scoped by row id only; server-side policy decides
/// whether the caller may act. Role changes replace the user's role row.
use crate::{
    backend::{decode_rows, DataPlane, Filter, Query, Table},
    config::FeedConfig,
    error::ClientResult,
    models::{Comment, CommentRow, PlatformStats, Post, PostRow, Role, UserWithRole},
    session::SessionContext,
    stores::enrich::{enrich_posts, fetch_authors},
    toast::ToastSink,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct RoleRow {
    user_id: Uuid,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    user_id: Uuid,
    display_name: Option<String>,
    username: Option<String>,
    avatar_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// Admin panel facade for moderators and admins
#[derive(Clone)]
pub struct AdminPanel {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    toasts: ToastSink,
    config: FeedConfig,
}

impl AdminPanel {
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

    /// Whether the signed-in viewer holds the admin role, per the server
    pub async fn is_admin(&self) -> ClientResult<bool> {
        let user_id = self.session.require_user()?;
        let value = self
            .data
            .rpc("is_admin", json!({ "_user_id": user_id }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Platform-wide aggregate counters
    pub async fn platform_stats(&self) -> ClientResult<PlatformStats> {
        let value = self.data.rpc("get_platform_stats", json!({})).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// All users, newest first, with their roles joined in one batched query
    pub async fn users(&self) -> ClientResult<Vec<UserWithRole>> {
        let rows = self
            .data
            .select(
                Table::Profiles,
                Query::new()
                    .order("created_at", true)
                    .limit(self.config.admin_page_limit),
            )
            .await?;
        let profiles: Vec<ProfileRow> = decode_rows(rows)?;
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<Uuid> = profiles.iter().map(|p| p.user_id).collect();
        let role_rows = self
            .data
            .select(
                Table::UserRoles,
                Query::new().filter(Filter::in_set("user_id", user_ids)),
            )
            .await?;
        let roles: Vec<RoleRow> = decode_rows(role_rows)?;
        let roles: HashMap<Uuid, Role> =
            roles.into_iter().map(|r| (r.user_id, r.role)).collect();

        Ok(profiles
            .into_iter()
            .map(|p| UserWithRole {
                role: roles.get(&p.user_id).copied(),
                user_id: p.user_id,
                display_name: p.display_name,
                username: p.username,
                avatar_url: p.avatar_url,
                created_at: p.created_at,
            })
            .collect())
    }

    /// Latest posts for moderation review, author-enriched
    pub async fn posts(&self) -> ClientResult<Vec<Post>> {
        let rows = self
            .data
            .select(
                Table::Posts,
                Query::new()
                    .order("created_at", true)
                    .limit(self.config.admin_page_limit),
            )
            .await?;
        let rows: Vec<PostRow> = decode_rows(rows)?;
        enrich_posts(&self.data, rows, self.session.user_id()).await
    }

    /// Latest comments for moderation review, author-enriched
    pub async fn comments(&self) -> ClientResult<Vec<Comment>> {
        let rows = self
            .data
            .select(
                Table::Comments,
                Query::new()
                    .order("created_at", true)
                    .limit(self.config.admin_page_limit),
            )
            .await?;
        let rows: Vec<CommentRow> = decode_rows(rows)?;

        let author_ids: HashSet<Uuid> = rows.iter().map(|r| r.user_id).collect();
        let authors = fetch_authors(&self.data, &author_ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let author = authors.get(&row.user_id).cloned();
                Comment::from_row(row, author)
            })
            .collect())
    }

    /// Replace a user's role
    pub async fn set_role(&self, user_id: Uuid, role: Role) -> ClientResult<()> {
        self.session.require_user()?;
        let result: ClientResult<()> = async {
            self.data
                .delete(Table::UserRoles, vec![Filter::eq("user_id", user_id)])
                .await?;
            self.data
                .insert(
                    Table::UserRoles,
                    json!({ "user_id": user_id, "role": role.as_str() }),
                )
                .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.toasts.success("เปลี่ยนบทบาทสำเร็จ");
                Ok(())
            }
            Err(e) => {
                error!("Error updating role: {}", e);
                self.toasts.error("ไม่สามารถเปลี่ยนบทบาทได้");
                Err(e)
            }
        }
    }

    /// Delete any post by id
    pub async fn delete_post(&self, post_id: Uuid) -> ClientResult<()> {
        self.session.require_user()?;
        match self
            .data
            .delete(Table::Posts, vec![Filter::eq("id", post_id)])
            .await
        {
            Ok(()) => {
                self.toasts.success("ลบโพสต์สำเร็จ");
                Ok(())
            }
            Err(e) => {
                error!("Error deleting post: {}", e);
                self.toasts.error("ไม่สามารถลบโพสต์ได้");
                Err(e)
            }
        }
    }

    /// Delete any comment by id
    pub async fn delete_comment(&self, comment_id: Uuid) -> ClientResult<()> {
        self.session.require_user()?;
        match self
            .data
            .delete(Table::Comments, vec![Filter::eq("id", comment_id)])
            .await
        {
            Ok(()) => {
                self.toasts.success("ลบความคิดเห็นสำเร็จ");
                Ok(())
            }
            Err(e) => {
                error!("Error deleting comment: {}", e);
                self.toasts.error("ไม่สามารถลบความคิดเห็นได้");
                Err(e)
            }
        }
    }
}
