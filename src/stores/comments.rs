/// Per-post comment store
///
/// Comments are ordered oldest first and support one level of reply nesting
/// through `parent_comment_id`. Realtime changes are applied incrementally
/// by row id.
use crate::{
    backend::{decode_rows, ChangeEvent, ChangeKind, DataPlane, Filter, Query, Realtime, Table},
    error::{ClientError, ClientResult},
    models::{Comment, CommentRow},
    session::SessionContext,
    stores::enrich::fetch_authors,
    toast::ToastSink,
};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

/// Comment store scoped to one post
#[derive(Clone)]
pub struct CommentStore {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    toasts: ToastSink,
    post_id: Uuid,
    state: Arc<RwLock<Vec<Comment>>>,
}

impl CommentStore {
    pub fn new(
        data: Arc<dyn DataPlane>,
        session: SessionContext,
        toasts: ToastSink,
        post_id: Uuid,
    ) -> Self {
        Self {
            data,
            session,
            toasts,
            post_id,
            state: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of the cached comments, oldest first
    pub fn comments(&self) -> Vec<Comment> {
        self.state.read().clone()
    }

    /// Top-level comments only
    pub fn top_level(&self) -> Vec<Comment> {
        self.state
            .read()
            .iter()
            .filter(|c| c.parent_comment_id.is_none())
            .cloned()
            .collect()
    }

    /// Replies to one comment
    pub fn replies_to(&self, comment_id: Uuid) -> Vec<Comment> {
        self.state
            .read()
            .iter()
            .filter(|c| c.parent_comment_id == Some(comment_id))
            .cloned()
            .collect()
    }

    /// Re-fetch all comments for the post with batched author enrichment
    pub async fn refresh(&self) -> ClientResult<()> {
        let rows = self
            .data
            .select(
                Table::Comments,
                Query::new()
                    .filter(Filter::eq("post_id", self.post_id))
                    .order("created_at", false),
            )
            .await?;
        let rows: Vec<CommentRow> = decode_rows(rows)?;

        let author_ids: HashSet<Uuid> = rows.iter().map(|r| r.user_id).collect();
        let authors = fetch_authors(&self.data, &author_ids).await?;

        let comments = rows
            .into_iter()
            .map(|row| {
                let author = authors.get(&row.user_id).cloned();
                Comment::from_row(row, author)
            })
            .collect();
        *self.state.write() = comments;
        Ok(())
    }

    /// Add a comment, or a reply when `parent_comment_id` is given
    pub async fn add_comment(
        &self,
        content: &str,
        parent_comment_id: Option<Uuid>,
    ) -> ClientResult<()> {
        let user_id = match self.session.require_user() {
            Ok(user_id) => user_id,
            Err(e) => {
                self.toasts.error("กรุณาเข้าสู่ระบบ");
                return Err(e);
            }
        };

        let content = content.trim();
        if content.is_empty() {
            self.toasts.error("กรุณาเขียนความคิดเห็น");
            return Err(ClientError::Validation("Empty comment".to_string()));
        }

        match self
            .data
            .insert(
                Table::Comments,
                json!({
                    "user_id": user_id,
                    "post_id": self.post_id,
                    "parent_comment_id": parent_comment_id,
                    "content": content,
                }),
            )
            .await
        {
            Ok(_) => {
                self.toasts.success("แสดงความคิดเห็นแล้ว");
                Ok(())
            }
            Err(e) => {
                error!("Error adding comment: {}", e);
                self.toasts.error("ไม่สามารถแสดงความคิดเห็นได้");
                Err(e)
            }
        }
    }

    /// Delete one of the viewer's own comments
    pub async fn delete_comment(&self, comment_id: Uuid) -> ClientResult<()> {
        let user_id = self.session.require_user()?;
        match self
            .data
            .delete(
                Table::Comments,
                vec![
                    Filter::eq("id", comment_id),
                    Filter::eq("user_id", user_id),
                ],
            )
            .await
        {
            Ok(()) => {
                self.state.write().retain(|c| c.id != comment_id);
                self.toasts.success("ลบความคิดเห็นแล้ว");
                Ok(())
            }
            Err(e) => {
                error!("Error deleting comment: {}", e);
                self.toasts.error("ไม่สามารถลบความคิดเห็นได้");
                Err(e)
            }
        }
    }

    /// Apply one change event from this post's comment channel
    pub async fn apply_change(&self, event: ChangeEvent) -> ClientResult<()> {
        match event.kind {
            ChangeKind::Insert => {
                let row: CommentRow = serde_json::from_value(event.row)?;
                if row.post_id != self.post_id
                    || self.state.read().iter().any(|c| c.id == row.id)
                {
                    return Ok(());
                }
                let author_ids: HashSet<Uuid> = [row.user_id].into_iter().collect();
                let authors = fetch_authors(&self.data, &author_ids).await?;
                let author = authors.get(&row.user_id).cloned();
                let mut state = self.state.write();
                state.push(Comment::from_row(row, author));
                state.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            }
            ChangeKind::Update => {
                let row: CommentRow = serde_json::from_value(event.row)?;
                if let Some(comment) =
                    self.state.write().iter_mut().find(|c| c.id == row.id)
                {
                    comment.content = row.content;
                }
            }
            ChangeKind::Delete => {
                if let Some(id) = event.row.get("id").and_then(|v| v.as_str()) {
                    if let Ok(id) = Uuid::parse_str(id) {
                        self.state.write().retain(|c| c.id != id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Open the comment change feed for this post
    pub fn spawn_realtime(&self, realtime: &Realtime) -> ClientResult<JoinHandle<()>> {
        let mut subscription =
            realtime.subscribe(Table::Comments, Some(("post_id", self.post_id.to_string())))?;
        let store = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let Err(e) = store.apply_change(event).await {
                    error!("Failed to apply comment change: {}", e);
                }
            }
        }))
    }
}
