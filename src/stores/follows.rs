/// Follow store scoped to one target user
///
/// Counters come from remote count queries; the follow toggle is optimistic
/// with rollback on failure. Zero follow edges resolve to empty lists, never
/// an error.
use crate::{
    backend::{decode_rows, DataPlane, Filter, Query, Table},
    error::{ClientError, ClientResult},
    models::{FollowStats, ProfileCard},
    session::SessionContext,
    toast::ToastSink,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct FollowerEdge {
    follower_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct FollowingEdge {
    following_id: Uuid,
}

/// Which side of the edge set a list resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowListKind {
    Followers,
    Following,
}

/// Follow stats and actions for one target user
#[derive(Clone)]
pub struct FollowStore {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    toasts: ToastSink,
    target: Uuid,
    stats: Arc<RwLock<FollowStats>>,
}

impl FollowStore {
    pub fn new(
        data: Arc<dyn DataPlane>,
        session: SessionContext,
        toasts: ToastSink,
        target: Uuid,
    ) -> Self {
        Self {
            data,
            session,
            toasts,
            target,
            stats: Arc::new(RwLock::new(FollowStats::default())),
        }
    }

    /// Current cached stats
    pub fn stats(&self) -> FollowStats {
        *self.stats.read()
    }

    /// Re-fetch follower/following counts and the viewer-relative flag
    pub async fn refresh(&self) -> ClientResult<()> {
        let followers_count = self
            .data
            .count(
                Table::Follows,
                vec![Filter::eq("following_id", self.target)],
            )
            .await?;
        let following_count = self
            .data
            .count(
                Table::Follows,
                vec![Filter::eq("follower_id", self.target)],
            )
            .await?;

        let is_following = match self.session.user_id() {
            Some(viewer) if viewer != self.target => {
                let rows = self
                    .data
                    .select(
                        Table::Follows,
                        Query::new()
                            .filter(Filter::eq("follower_id", viewer))
                            .filter(Filter::eq("following_id", self.target))
                            .limit(1),
                    )
                    .await?;
                !rows.is_empty()
            }
            _ => false,
        };

        *self.stats.write() = FollowStats {
            followers_count,
            following_count,
            is_following,
        };
        Ok(())
    }

    /// Follow the target user
    ///
    /// The followers count and flag bump optimistically before the request
    /// resolves; a failed request restores both.
    pub async fn follow(&self) -> ClientResult<()> {
        let viewer = self.session.require_user()?;
        if viewer == self.target {
            return Err(ClientError::Validation(
                "Cannot follow yourself".to_string(),
            ));
        }
        if self.stats.read().is_following {
            return Ok(());
        }

        {
            let mut stats = self.stats.write();
            stats.followers_count += 1;
            stats.is_following = true;
        }

        match self
            .data
            .insert(
                Table::Follows,
                json!({ "follower_id": viewer, "following_id": self.target }),
            )
            .await
        {
            Ok(_) => {
                self.toasts.success("ติดตามแล้ว");
                Ok(())
            }
            Err(e) => {
                error!("Error following user: {}", e);
                let mut stats = self.stats.write();
                stats.followers_count = (stats.followers_count - 1).max(0);
                stats.is_following = false;
                drop(stats);
                self.toasts.error("ไม่สามารถติดตามได้");
                Err(e)
            }
        }
    }

    /// Unfollow the target user, optimistically with rollback
    pub async fn unfollow(&self) -> ClientResult<()> {
        let viewer = self.session.require_user()?;
        if !self.stats.read().is_following {
            return Ok(());
        }

        {
            let mut stats = self.stats.write();
            stats.followers_count = (stats.followers_count - 1).max(0);
            stats.is_following = false;
        }

        match self
            .data
            .delete(
                Table::Follows,
                vec![
                    Filter::eq("follower_id", viewer),
                    Filter::eq("following_id", self.target),
                ],
            )
            .await
        {
            Ok(()) => {
                self.toasts.success("เลิกติดตามแล้ว");
                Ok(())
            }
            Err(e) => {
                error!("Error unfollowing user: {}", e);
                let mut stats = self.stats.write();
                stats.followers_count += 1;
                stats.is_following = true;
                drop(stats);
                self.toasts.error("ไม่สามารถเลิกติดตามได้");
                Err(e)
            }
        }
    }

    /// Follow or unfollow based on the current flag
    pub async fn toggle_follow(&self) -> ClientResult<()> {
        if self.stats.read().is_following {
            self.unfollow().await
        } else {
            self.follow().await
        }
    }

    /// Resolve the target's follower or following list to profiles
    pub async fn list(&self, kind: FollowListKind) -> ClientResult<Vec<ProfileCard>> {
        let user_ids: Vec<Uuid> = match kind {
            FollowListKind::Followers => {
                let rows = self
                    .data
                    .select(
                        Table::Follows,
                        Query::new().filter(Filter::eq("following_id", self.target)),
                    )
                    .await?;
                let edges: Vec<FollowerEdge> = decode_rows(rows)?;
                edges.into_iter().map(|e| e.follower_id).collect()
            }
            FollowListKind::Following => {
                let rows = self
                    .data
                    .select(
                        Table::Follows,
                        Query::new().filter(Filter::eq("follower_id", self.target)),
                    )
                    .await?;
                let edges: Vec<FollowingEdge> = decode_rows(rows)?;
                edges.into_iter().map(|e| e.following_id).collect()
            }
        };

        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .data
            .select(
                Table::Profiles,
                Query::new().filter(Filter::in_set("user_id", user_ids)),
            )
            .await?;
        decode_rows(rows)
    }
}
