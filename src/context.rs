/// Shared application context
///
/// Wires the configuration, the HTTP data plane, the realtime factory, the
/// toast channel and the session together, and hands out stores bound to
/// them. One context per client; everything inside is cheap to clone.
use crate::{
    backend::{Backend, DataPlane, Realtime, RealtimeConfig},
    config::ClientConfig,
    error::ClientResult,
    session::SessionContext,
    stores::{
        AdminPanel, CommentStore, FeedStore, FollowStore, MentionTracker, NotificationStore,
        ProfileStore, SearchStore,
    },
    toast::ToastSink,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ClientConfig>,
    pub data: Arc<dyn DataPlane>,
    pub realtime: Realtime,
    pub toasts: ToastSink,
    pub session: SessionContext,
}

impl AppContext {
    /// Build a context over the HTTP backend
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let realtime = Realtime::new(RealtimeConfig {
            url: config.realtime_url(),
            reconnect_interval: config.backend.reconnect_interval,
            buffer_size: config.backend.event_buffer_size,
            ..RealtimeConfig::default()
        });
        let data: Arc<dyn DataPlane> = Arc::new(Backend::new(config.backend.clone())?);
        let toasts = ToastSink::default();
        let session = SessionContext::new(data.clone(), toasts.clone());

        Ok(Self {
            config: Arc::new(config),
            data,
            realtime,
            toasts,
            session,
        })
    }

    /// Build a context over an arbitrary data plane (tests)
    pub fn with_data_plane(config: ClientConfig, data: Arc<dyn DataPlane>) -> Self {
        let realtime = Realtime::new(RealtimeConfig {
            url: config.realtime_url(),
            reconnect_interval: config.backend.reconnect_interval,
            buffer_size: config.backend.event_buffer_size,
            ..RealtimeConfig::default()
        });
        let toasts = ToastSink::default();
        let session = SessionContext::new(data.clone(), toasts.clone());
        Self {
            config: Arc::new(config),
            data,
            realtime,
            toasts,
            session,
        }
    }

    pub fn feed(&self) -> FeedStore {
        FeedStore::new(
            self.data.clone(),
            self.session.clone(),
            self.toasts.clone(),
            self.config.feed.clone(),
        )
    }

    pub fn comments(&self, post_id: Uuid) -> CommentStore {
        CommentStore::new(
            self.data.clone(),
            self.session.clone(),
            self.toasts.clone(),
            post_id,
        )
    }

    pub fn follows(&self, target: Uuid) -> FollowStore {
        FollowStore::new(
            self.data.clone(),
            self.session.clone(),
            self.toasts.clone(),
            target,
        )
    }

    pub fn notifications(&self) -> NotificationStore {
        NotificationStore::new(
            self.data.clone(),
            self.session.clone(),
            self.toasts.clone(),
            self.config.notification.clone(),
        )
    }

    pub fn search(&self) -> SearchStore {
        SearchStore::new(
            self.data.clone(),
            self.session.clone(),
            self.config.search.clone(),
        )
    }

    pub fn mention(&self) -> MentionTracker {
        MentionTracker::new(self.data.clone(), self.config.mention.clone())
    }

    pub fn admin(&self) -> AdminPanel {
        AdminPanel::new(
            self.data.clone(),
            self.session.clone(),
            self.toasts.clone(),
            self.config.feed.clone(),
        )
    }

    pub fn profile(&self) -> ProfileStore {
        ProfileStore::new(
            self.data.clone(),
            self.session.clone(),
            self.toasts.clone(),
            self.config.feed.clone(),
        )
    }
}
