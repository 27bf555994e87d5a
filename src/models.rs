/// Entity types mirrored from the hosted backend
///
/// All rows are externally owned; the client holds transient, denormalized
/// copies enriched with joined author profiles and aggregate counts.
use crate::error::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal profile projection joined onto posts, comments and notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Full profile row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile projection used in follow lists and user search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCard {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Bare post row as stored remotely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Post enriched with author, aggregate counts and viewer flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: Option<Author>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reposts_count: i64,
    pub is_liked: bool,
    pub is_reposted: bool,
}

/// Aggregate counts for one post, as returned by the stats RPC
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostStats {
    pub post_id: Uuid,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reposts_count: i64,
}

/// Bare repost row; `quote_content` is present only for quote reposts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub quote_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Original post summary embedded in a quote repost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalPost {
    pub id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub author: Option<Author>,
}

/// Repost carrying quoted commentary, enriched for the timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRepost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub quote_content: String,
    pub created_at: DateTime<Utc>,
    pub quoter: Option<Author>,
    pub original_post: OriginalPost,
    /// Stats and viewer flags refer to the original post
    pub likes_count: i64,
    pub comments_count: i64,
    pub reposts_count: i64,
    pub is_liked: bool,
    pub is_reposted: bool,
}

/// Placeholder body shown when a quoted post was deleted
pub const DELETED_POST_PLACEHOLDER: &str = "[โพสต์ถูกลบแล้ว]";

/// One entry in the merged home timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem {
    Post(Post),
    QuoteRepost(QuoteRepost),
}

impl FeedItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            FeedItem::Post(p) => p.created_at,
            FeedItem::QuoteRepost(q) => q.created_at,
        }
    }
}

/// Bare comment row; `parent_comment_id` gives one level of nesting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment enriched with its author profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<Author>,
}

impl Comment {
    pub fn from_row(row: CommentRow, author: Option<Author>) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            parent_comment_id: row.parent_comment_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            author,
        }
    }
}

/// A user's comment shown on their profile timeline, with the commented
/// post summarized; `post` is `None` when the post was deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub post: Option<OriginalPost>,
}

/// Notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    Repost,
    Reply,
}

/// Notification row enriched with the acting user's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub actor_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub actor: Option<Author>,
}

/// Follow counters and the viewer-relative flag
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FollowStats {
    pub followers_count: i64,
    pub following_count: i64,
    pub is_following: bool,
}

/// Moderation role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> ClientResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(ClientError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// User row in the admin panel, with its role joined in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRole {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub role: Option<Role>,
}

/// Trending hashtag row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashtag {
    pub id: Uuid,
    pub tag: String,
    pub post_count: i64,
}

/// Platform-wide statistics returned by the admin RPC
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_comments: i64,
    pub total_likes: i64,
    pub users_today: i64,
    pub posts_today: i64,
}

/// Mention autocomplete candidate; handles are guaranteed non-null
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionCandidate {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin.can_act_as(Role::Moderator));
        assert!(Role::Moderator.can_act_as(Role::Moderator));
        assert!(!Role::User.can_act_as(Role::Moderator));
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::User, Role::Moderator, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("owner").is_err());
    }

    #[test]
    fn test_notification_kind_wire_names() {
        let kind: NotificationKind = serde_json::from_str("\"reply\"").unwrap();
        assert_eq!(kind, NotificationKind::Reply);
        assert_eq!(
            serde_json::to_string(&NotificationKind::Follow).unwrap(),
            "\"follow\""
        );
    }

    #[test]
    fn test_feed_item_timestamp_accessor() {
        let post = Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: "สวัสดี".to_string(),
            image_url: None,
            created_at: Utc::now(),
            author: None,
            likes_count: 0,
            comments_count: 0,
            reposts_count: 0,
            is_liked: false,
            is_reposted: false,
        };
        let ts = post.created_at;
        assert_eq!(FeedItem::Post(post).created_at(), ts);
    }
}
