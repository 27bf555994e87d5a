mod common;

use common::{context_with, profile_row, signed_in_context, FakePlane};
use serde_json::json;
use std::sync::Arc;
use tongfah::backend::{ChangeEvent, ChangeKind, Table};
use uuid::Uuid;

fn notification_row(
    id: Uuid,
    user_id: Uuid,
    actor_id: Uuid,
    kind: &str,
    read: bool,
    created_at: &str,
) -> serde_json::Value {
    json!({
        "id": id.to_string(),
        "user_id": user_id.to_string(),
        "actor_id": actor_id.to_string(),
        "type": kind,
        "post_id": null,
        "read": read,
        "created_at": created_at,
    })
}

#[tokio::test]
async fn refresh_joins_actors_and_counts_unread() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);
    plane.seed(
        Table::Notifications,
        vec![
            notification_row(Uuid::new_v4(), viewer, actor, "like", false, "2024-06-01T08:00:00Z"),
            notification_row(Uuid::new_v4(), viewer, actor, "follow", true, "2024-06-01T09:00:00Z"),
            // someone else's notification stays invisible
            notification_row(Uuid::new_v4(), Uuid::new_v4(), actor, "like", false, "2024-06-01T10:00:00Z"),
        ],
    );

    let ctx = signed_in_context(plane).await;
    let store = ctx.notifications();
    store.refresh().await.unwrap();

    let all = store.notifications();
    assert_eq!(all.len(), 2);
    assert_eq!(store.unread_count(), 1);
    assert_eq!(all[0].actor.as_ref().unwrap().username.as_deref(), Some("mind"));
}

#[tokio::test]
async fn refresh_honors_the_configured_page_limit() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);
    plane.seed(
        Table::Notifications,
        (0..3)
            .map(|i| {
                notification_row(
                    Uuid::new_v4(),
                    viewer,
                    actor,
                    "like",
                    false,
                    &format!("2024-06-0{}T08:00:00Z", i + 1),
                )
            })
            .collect(),
    );

    let mut config = common::test_config();
    config.notification.page_limit = 2;
    let ctx = tongfah::AppContext::with_data_plane(config, plane);
    ctx.session.sign_in("fern@example.co", "secret1").await.unwrap();

    let store = ctx.notifications();
    store.refresh().await.unwrap();
    assert_eq!(store.notifications().len(), 2);
    // the newest two survive the cut
    assert_eq!(store.unread_count(), 2);
}

#[tokio::test]
async fn refresh_when_signed_out_yields_empty_state() {
    let plane = Arc::new(FakePlane::new());
    plane.seed(
        Table::Notifications,
        vec![notification_row(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "like",
            false,
            "2024-06-01T08:00:00Z",
        )],
    );
    let ctx = context_with(plane);
    let store = ctx.notifications();
    store.refresh().await.unwrap();
    assert!(store.notifications().is_empty());
    assert_eq!(store.unread_count(), 0);
}

#[tokio::test]
async fn mark_read_updates_counter_once() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    let target = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);
    plane.seed(
        Table::Notifications,
        vec![notification_row(target, viewer, actor, "comment", false, "2024-06-01T08:00:00Z")],
    );

    let ctx = signed_in_context(plane.clone()).await;
    let store = ctx.notifications();
    store.refresh().await.unwrap();
    assert_eq!(store.unread_count(), 1);

    store.mark_read(target).await.unwrap();
    assert_eq!(store.unread_count(), 0);
    assert_eq!(plane.rows(Table::Notifications)[0]["read"], true);

    // a second call must not underflow
    store.mark_read(target).await.unwrap();
    assert_eq!(store.unread_count(), 0);
}

#[tokio::test]
async fn mark_all_read_clears_counter() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);
    plane.seed(
        Table::Notifications,
        vec![
            notification_row(Uuid::new_v4(), viewer, actor, "like", false, "2024-06-01T08:00:00Z"),
            notification_row(Uuid::new_v4(), viewer, actor, "reply", false, "2024-06-01T09:00:00Z"),
        ],
    );

    let ctx = signed_in_context(plane.clone()).await;
    let store = ctx.notifications();
    store.refresh().await.unwrap();
    assert_eq!(store.unread_count(), 2);

    store.mark_all_read().await.unwrap();
    assert_eq!(store.unread_count(), 0);
    assert!(store.notifications().iter().all(|n| n.read));
    assert!(plane
        .rows(Table::Notifications)
        .iter()
        .all(|n| n["read"] == true));
}

#[tokio::test]
async fn realtime_insert_prepends_and_bumps_counter() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);

    let ctx = signed_in_context(plane).await;
    let store = ctx.notifications();
    store.refresh().await.unwrap();

    store
        .apply_change(ChangeEvent {
            kind: ChangeKind::Insert,
            table: "notifications".to_string(),
            row: notification_row(Uuid::new_v4(), viewer, actor, "repost", false, "2024-06-02T08:00:00Z"),
        })
        .await
        .unwrap();

    assert_eq!(store.notifications().len(), 1);
    assert_eq!(store.unread_count(), 1);
    assert_eq!(
        store.notifications()[0].actor.as_ref().unwrap().username.as_deref(),
        Some("mind")
    );
}

#[tokio::test]
async fn realtime_update_to_read_decrements_counter() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    let target = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);
    plane.seed(
        Table::Notifications,
        vec![notification_row(target, viewer, actor, "like", false, "2024-06-01T08:00:00Z")],
    );

    let ctx = signed_in_context(plane).await;
    let store = ctx.notifications();
    store.refresh().await.unwrap();
    assert_eq!(store.unread_count(), 1);

    store
        .apply_change(ChangeEvent {
            kind: ChangeKind::Update,
            table: "notifications".to_string(),
            row: notification_row(target, viewer, actor, "like", true, "2024-06-01T08:00:00Z"),
        })
        .await
        .unwrap();
    assert_eq!(store.unread_count(), 0);
    assert!(store.notifications()[0].read);
}

#[tokio::test]
async fn delete_removes_row_and_adjusts_counter() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let actor = Uuid::new_v4();
    let target = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(actor, "มายด์", "mind")]);
    plane.seed(
        Table::Notifications,
        vec![notification_row(target, viewer, actor, "follow", false, "2024-06-01T08:00:00Z")],
    );

    let ctx = signed_in_context(plane.clone()).await;
    let store = ctx.notifications();
    store.refresh().await.unwrap();

    store.delete(target).await.unwrap();
    assert!(store.notifications().is_empty());
    assert_eq!(store.unread_count(), 0);
    assert!(plane.rows(Table::Notifications).is_empty());
}
