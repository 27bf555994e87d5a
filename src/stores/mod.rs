/// Client-side stores
///
/// Each store owns a slice of application state behind an `Arc`'d lock and
/// exposes async operations against the hosted backend. Stores are cheap to
/// clone; clones share state.
pub mod admin;
pub mod comments;
pub mod enrich;
pub mod feed;
pub mod follows;
pub mod mention;
pub mod notifications;
pub mod profile;
pub mod search;

pub use admin::AdminPanel;
pub use comments::CommentStore;
pub use feed::{extract_hashtags, FeedStore, ImageUpload};
pub use follows::{FollowListKind, FollowStore};
pub use mention::{apply_selection, detect_mention, MentionHit, MentionTracker};
pub use notifications::NotificationStore;
pub use profile::{ProfilePatch, ProfileStore};
pub use search::SearchStore;
