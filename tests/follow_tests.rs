mod common;

use common::{profile_row, signed_in_context, FakePlane};
use serde_json::json;
use std::sync::Arc;
use tongfah::backend::Table;
use tongfah::stores::FollowListKind;
use uuid::Uuid;

fn follow_edge(follower: Uuid, following: Uuid) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "follower_id": follower.to_string(),
        "following_id": following.to_string(),
        "created_at": "2024-06-01T08:00:00Z",
    })
}

#[tokio::test]
async fn refresh_counts_and_viewer_flag() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let target = Uuid::new_v4();
    let fan = Uuid::new_v4();
    plane.seed(
        Table::Follows,
        vec![
            follow_edge(viewer, target),
            follow_edge(fan, target),
            follow_edge(target, fan),
        ],
    );

    let ctx = signed_in_context(plane).await;
    let follows = ctx.follows(target);
    follows.refresh().await.unwrap();

    let stats = follows.stats();
    assert_eq!(stats.followers_count, 2);
    assert_eq!(stats.following_count, 1);
    assert!(stats.is_following);
}

#[tokio::test]
async fn follow_then_unfollow_round_trips() {
    let plane = Arc::new(FakePlane::new());
    let target = Uuid::new_v4();

    let ctx = signed_in_context(plane.clone()).await;
    let follows = ctx.follows(target);
    follows.refresh().await.unwrap();

    follows.follow().await.unwrap();
    assert_eq!(plane.rows(Table::Follows).len(), 1);
    assert!(follows.stats().is_following);
    assert_eq!(follows.stats().followers_count, 1);

    follows.unfollow().await.unwrap();
    assert!(plane.rows(Table::Follows).is_empty());
    assert!(!follows.stats().is_following);
    assert_eq!(follows.stats().followers_count, 0);
}

#[tokio::test]
async fn failed_follow_rolls_back_counter_and_flag() {
    let plane = Arc::new(FakePlane::new());
    let target = Uuid::new_v4();

    let ctx = signed_in_context(plane.clone()).await;
    let follows = ctx.follows(target);
    follows.refresh().await.unwrap();

    plane.set_fail_writes(true);
    assert!(follows.follow().await.is_err());

    let stats = follows.stats();
    assert!(!stats.is_following);
    assert_eq!(stats.followers_count, 0);
    assert!(plane.rows(Table::Follows).is_empty());
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;

    let ctx = signed_in_context(plane.clone()).await;
    let follows = ctx.follows(viewer);
    assert!(follows.follow().await.is_err());
    assert!(plane.rows(Table::Follows).is_empty());
}

#[tokio::test]
async fn follow_when_already_following_is_a_no_op() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;
    let target = Uuid::new_v4();
    plane.seed(Table::Follows, vec![follow_edge(viewer, target)]);

    let ctx = signed_in_context(plane.clone()).await;
    let follows = ctx.follows(target);
    follows.refresh().await.unwrap();

    follows.follow().await.unwrap();
    assert_eq!(plane.rows(Table::Follows).len(), 1);
    assert_eq!(follows.stats().followers_count, 1);
}

#[tokio::test]
async fn zero_edges_resolve_to_empty_lists() {
    let plane = Arc::new(FakePlane::new());
    let target = Uuid::new_v4();

    let ctx = signed_in_context(plane).await;
    let follows = ctx.follows(target);
    assert!(follows.list(FollowListKind::Followers).await.unwrap().is_empty());
    assert!(follows.list(FollowListKind::Following).await.unwrap().is_empty());
}

#[tokio::test]
async fn follower_list_resolves_profiles_in_one_batch() {
    let plane = Arc::new(FakePlane::new());
    let target = Uuid::new_v4();
    let fan_a = Uuid::new_v4();
    let fan_b = Uuid::new_v4();
    plane.seed(
        Table::Profiles,
        vec![
            profile_row(fan_a, "ใบเฟิร์น", "fern"),
            profile_row(fan_b, "มายด์", "mind"),
        ],
    );
    plane.seed(
        Table::Follows,
        vec![follow_edge(fan_a, target), follow_edge(fan_b, target)],
    );

    let ctx = signed_in_context(plane).await;
    let followers = ctx.follows(target).list(FollowListKind::Followers).await.unwrap();
    assert_eq!(followers.len(), 2);
    let names: Vec<_> = followers
        .iter()
        .filter_map(|p| p.username.as_deref())
        .collect();
    assert!(names.contains(&"fern"));
    assert!(names.contains(&"mind"));
}
