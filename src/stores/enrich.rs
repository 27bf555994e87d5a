/// Batched enrichment-by-join
///
/// Base rows are enriched in a fixed number of round trips regardless of
/// list length: one profile fetch keyed by the distinct author-id set, one
/// aggregate RPC keyed by the post-id set, and two viewer-flag RPCs for the
/// whole set. Posts with no aggregate row default every count to zero.
use crate::{
    backend::{decode_rows, DataPlane, Filter, Query, Table},
    error::ClientResult,
    models::{Author, Post, PostRow, PostStats},
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Fetch profiles for a set of user ids in one call
pub async fn fetch_authors(
    data: &Arc<dyn DataPlane>,
    user_ids: &HashSet<Uuid>,
) -> ClientResult<HashMap<Uuid, Author>> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = data
        .select(
            Table::Profiles,
            Query::new().filter(Filter::in_set("user_id", user_ids.iter())),
        )
        .await?;
    let authors: Vec<Author> = decode_rows(rows)?;
    Ok(authors.into_iter().map(|a| (a.user_id, a)).collect())
}

/// Aggregate counts and viewer flags for a set of posts
#[derive(Debug, Default)]
pub struct PostEnrichment {
    pub stats: HashMap<Uuid, PostStats>,
    pub liked: HashSet<Uuid>,
    pub reposted: HashSet<Uuid>,
}

impl PostEnrichment {
    pub fn counts_for(&self, post_id: Uuid) -> PostStats {
        self.stats.get(&post_id).cloned().unwrap_or(PostStats {
            post_id,
            ..PostStats::default()
        })
    }
}

/// Fetch stats and viewer flags for the given post-id set
pub async fn fetch_post_enrichment(
    data: &Arc<dyn DataPlane>,
    post_ids: &HashSet<Uuid>,
    viewer: Option<Uuid>,
) -> ClientResult<PostEnrichment> {
    if post_ids.is_empty() {
        return Ok(PostEnrichment::default());
    }
    let ids: Vec<Uuid> = post_ids.iter().copied().collect();

    let stats_value = data
        .rpc("get_post_stats_batch", json!({ "post_ids": ids }))
        .await?;
    let stats: Vec<PostStats> = serde_json::from_value(stats_value)?;

    let (liked, reposted) = match viewer {
        Some(user_id) => {
            let liked_value = data
                .rpc(
                    "liked_post_ids",
                    json!({ "user_uuid": user_id, "post_ids": ids }),
                )
                .await?;
            let reposted_value = data
                .rpc(
                    "reposted_post_ids",
                    json!({ "user_uuid": user_id, "post_ids": ids }),
                )
                .await?;
            let liked: Vec<Uuid> = serde_json::from_value(liked_value)?;
            let reposted: Vec<Uuid> = serde_json::from_value(reposted_value)?;
            (
                liked.into_iter().collect(),
                reposted.into_iter().collect(),
            )
        }
        None => (HashSet::new(), HashSet::new()),
    };

    Ok(PostEnrichment {
        stats: stats.into_iter().map(|s| (s.post_id, s)).collect(),
        liked,
        reposted,
    })
}

/// Enrich a fetched list of post rows; output has exactly one item per input
pub async fn enrich_posts(
    data: &Arc<dyn DataPlane>,
    rows: Vec<PostRow>,
    viewer: Option<Uuid>,
) -> ClientResult<Vec<Post>> {
    let author_ids: HashSet<Uuid> = rows.iter().map(|r| r.user_id).collect();
    let post_ids: HashSet<Uuid> = rows.iter().map(|r| r.id).collect();

    let authors = fetch_authors(data, &author_ids).await?;
    let enrichment = fetch_post_enrichment(data, &post_ids, viewer).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let counts = enrichment.counts_for(row.id);
            Post {
                author: authors.get(&row.user_id).cloned(),
                likes_count: counts.likes_count,
                comments_count: counts.comments_count,
                reposts_count: counts.reposts_count,
                is_liked: enrichment.liked.contains(&row.id),
                is_reposted: enrichment.reposted.contains(&row.id),
                id: row.id,
                user_id: row.user_id,
                content: row.content,
                image_url: row.image_url,
                created_at: row.created_at,
            }
        })
        .collect())
}

/// Enrich a single row; used for realtime inserts
pub async fn enrich_post(
    data: &Arc<dyn DataPlane>,
    row: PostRow,
    viewer: Option<Uuid>,
) -> ClientResult<Post> {
    let mut posts = enrich_posts(data, vec![row], viewer).await?;
    posts
        .pop()
        .ok_or_else(|| crate::error::ClientError::Internal("Enrichment lost a row".to_string()))
}
