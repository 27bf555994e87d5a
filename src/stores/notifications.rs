/// Notification store for the signed-in viewer
///
/// Keeps the newest notifications with their actors joined in and maintains
/// the unread counter locally. Realtime inserts are enriched individually
/// and prepended; no full refetch.
use crate::{
    backend::{decode_rows, ChangeEvent, ChangeKind, DataPlane, Filter, Query, Realtime, Table},
    config::NotificationConfig,
    error::ClientResult,
    models::Notification,
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

#[derive(Default)]
struct NotificationState {
    notifications: Vec<Notification>,
    unread_count: usize,
}

/// Notification store; empty when signed out
#[derive(Clone)]
pub struct NotificationStore {
    data: Arc<dyn DataPlane>,
    session: SessionContext,
    toasts: ToastSink,
    config: NotificationConfig,
    state: Arc<RwLock<NotificationState>>,
}

impl NotificationStore {
    pub fn new(
        data: Arc<dyn DataPlane>,
        session: SessionContext,
        toasts: ToastSink,
        config: NotificationConfig,
    ) -> Self {
        Self {
            data,
            session,
            toasts,
            config,
            state: Arc::new(RwLock::new(NotificationState::default())),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.read().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state.read().unread_count
    }

    /// Re-fetch the viewer's notifications with batched actor enrichment
    pub async fn refresh(&self) -> ClientResult<()> {
        let user_id = match self.session.user_id() {
            Some(user_id) => user_id,
            None => {
                *self.state.write() = NotificationState::default();
                return Ok(());
            }
        };

        let rows = self
            .data
            .select(
                Table::Notifications,
                Query::new()
                    .filter(Filter::eq("user_id", user_id))
                    .order("created_at", true)
                    .limit(self.config.page_limit),
            )
            .await?;
        let mut notifications: Vec<Notification> = decode_rows(rows)?;

        let actor_ids: HashSet<Uuid> = notifications.iter().map(|n| n.actor_id).collect();
        let actors = fetch_authors(&self.data, &actor_ids).await?;
        for notification in &mut notifications {
            notification.actor = actors.get(&notification.actor_id).cloned();
        }

        let unread_count = notifications.iter().filter(|n| !n.read).count();
        *self.state.write() = NotificationState {
            notifications,
            unread_count,
        };
        Ok(())
    }

    /// Mark one notification read
    pub async fn mark_read(&self, notification_id: Uuid) -> ClientResult<()> {
        let user_id = self.session.require_user()?;
        match self
            .data
            .update(
                Table::Notifications,
                vec![
                    Filter::eq("id", notification_id),
                    Filter::eq("user_id", user_id),
                ],
                json!({ "read": true }),
            )
            .await
        {
            Ok(()) => {
                let mut state = self.state.write();
                if let Some(notification) = state
                    .notifications
                    .iter_mut()
                    .find(|n| n.id == notification_id)
                {
                    if !notification.read {
                        notification.read = true;
                        state.unread_count = state.unread_count.saturating_sub(1);
                    }
                }
                Ok(())
            }
            Err(e) => {
                error!("Error marking notification as read: {}", e);
                Err(e)
            }
        }
    }

    /// Mark every unread notification read
    pub async fn mark_all_read(&self) -> ClientResult<()> {
        let user_id = self.session.require_user()?;
        match self
            .data
            .update(
                Table::Notifications,
                vec![
                    Filter::eq("user_id", user_id),
                    Filter::eq("read", "false"),
                ],
                json!({ "read": true }),
            )
            .await
        {
            Ok(()) => {
                let mut state = self.state.write();
                for notification in &mut state.notifications {
                    notification.read = true;
                }
                state.unread_count = 0;
                Ok(())
            }
            Err(e) => {
                error!("Error marking all as read: {}", e);
                Err(e)
            }
        }
    }

    /// Delete one notification
    pub async fn delete(&self, notification_id: Uuid) -> ClientResult<()> {
        let user_id = self.session.require_user()?;
        match self
            .data
            .delete(
                Table::Notifications,
                vec![
                    Filter::eq("id", notification_id),
                    Filter::eq("user_id", user_id),
                ],
            )
            .await
        {
            Ok(()) => {
                let mut state = self.state.write();
                let was_unread = state
                    .notifications
                    .iter()
                    .find(|n| n.id == notification_id)
                    .map(|n| !n.read)
                    .unwrap_or(false);
                state.notifications.retain(|n| n.id != notification_id);
                if was_unread {
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
                Ok(())
            }
            Err(e) => {
                error!("Error deleting notification: {}", e);
                Err(e)
            }
        }
    }

    /// Apply one change event from the viewer's notification channel
    pub async fn apply_change(&self, event: ChangeEvent) -> ClientResult<()> {
        match event.kind {
            ChangeKind::Insert => {
                let mut notification: Notification = serde_json::from_value(event.row)?;
                if self
                    .state
                    .read()
                    .notifications
                    .iter()
                    .any(|n| n.id == notification.id)
                {
                    return Ok(());
                }
                let actor_ids: HashSet<Uuid> =
                    [notification.actor_id].into_iter().collect();
                let actors = fetch_authors(&self.data, &actor_ids).await?;
                notification.actor = actors.get(&notification.actor_id).cloned();

                let mut state = self.state.write();
                if !notification.read {
                    state.unread_count += 1;
                }
                state.notifications.insert(0, notification);
            }
            ChangeKind::Update => {
                let updated: Notification = serde_json::from_value(event.row)?;
                let mut state = self.state.write();
                let mut became_read = false;
                if let Some(notification) = state
                    .notifications
                    .iter_mut()
                    .find(|n| n.id == updated.id)
                {
                    if !notification.read && updated.read {
                        notification.read = true;
                        became_read = true;
                    }
                }
                if became_read {
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
            }
            ChangeKind::Delete => {
                if let Some(id) = event.row.get("id").and_then(|v| v.as_str()) {
                    if let Ok(id) = Uuid::parse_str(id) {
                        let mut state = self.state.write();
                        let was_unread = state
                            .notifications
                            .iter()
                            .find(|n| n.id == id)
                            .map(|n| !n.read)
                            .unwrap_or(false);
                        state.notifications.retain(|n| n.id != id);
                        if was_unread {
                            state.unread_count = state.unread_count.saturating_sub(1);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Open the notification change feed scoped to the viewer
    pub fn spawn_realtime(&self, realtime: &Realtime) -> ClientResult<JoinHandle<()>> {
        let user_id = self.session.require_user()?;
        let mut subscription = realtime.subscribe(
            Table::Notifications,
            Some(("user_id", user_id.to_string())),
        )?;
        let store = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let Err(e) = store.apply_change(event).await {
                    error!("Failed to apply notification change: {}", e);
                }
            }
        }))
    }
}
