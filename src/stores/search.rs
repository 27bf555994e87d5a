/// User, post and hashtag search
use crate::{
    backend::{decode_rows, DataPlane, Filter, Query, Table},
    config::SearchConfig,
    error::ClientResult,
    models::{Post, PostRow, ProfileCard},
    session::SessionContext,
    stores::enrich::enrich_posts,
};
use std::sync::Arc;
use tracing::error;

/// Stateless search facade; results are returned, not cached
#[derive(Clone)]
pub struct SearchStore {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    config: SearchConfig,
}

impl SearchStore {
    pub fn new(data: Arc<dyn DataPlane>, session: SessionContext, config: SearchConfig) -> Self {
        Self {
            data,
            session,
            config,
        }
    }

    /// Search profiles by display name or handle; blank queries return
    /// nothing without a remote call
    pub async fn search_users(&self, query: &str) -> ClientResult<Vec<ProfileCard>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .data
            .select(
                Table::Profiles,
                Query::new()
                    .any_of(vec![
                        Filter::contains("display_name", query),
                        Filter::contains("username", query),
                    ])
                    .limit(self.config.user_limit),
            )
            .await
            .map_err(|e| {
                error!("Error searching users: {}", e);
                e
            })?;
        decode_rows(rows)
    }

    /// Search post bodies, newest first, with full feed enrichment
    pub async fn search_posts(&self, query: &str) -> ClientResult<Vec<Post>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .data
            .select(
                Table::Posts,
                Query::new()
                    .filter(Filter::contains("content", query))
                    .order("created_at", true)
                    .limit(self.config.post_limit),
            )
            .await
            .map_err(|e| {
                error!("Error searching posts: {}", e);
                e
            })?;
        let rows: Vec<PostRow> = decode_rows(rows)?;
        enrich_posts(&self.data, rows, self.session.user_id()).await
    }

    /// Search posts carrying a hashtag; a missing leading `#` is added
    pub async fn search_hashtag(&self, tag: &str) -> ClientResult<Vec<Post>> {
        let tag = tag.trim();
        let tag = if tag.starts_with('#') {
            tag.to_string()
        } else {
            format!("#{}", tag)
        };
        self.search_posts(&tag).await
    }
}
