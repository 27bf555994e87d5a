mod common;

use common::{post_row, profile_row, signed_in_context, FakePlane};
use serde_json::json;
use std::sync::Arc;
use tongfah::backend::Table;
use tongfah::models::Role;
use uuid::Uuid;

fn role_row(user_id: Uuid, role: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "user_id": user_id.to_string(),
        "role": role,
    })
}

#[tokio::test]
async fn is_admin_reflects_the_role_table() {
    let plane = Arc::new(FakePlane::new());
    let viewer = plane.session_user;

    let ctx = signed_in_context(plane.clone()).await;
    let admin = ctx.admin();
    assert!(!admin.is_admin().await.unwrap());

    plane.seed(Table::UserRoles, vec![role_row(viewer, "admin")]);
    assert!(admin.is_admin().await.unwrap());
}

#[tokio::test]
async fn users_join_roles_in_one_batch() {
    let plane = Arc::new(FakePlane::new());
    let moderator = Uuid::new_v4();
    let plain = Uuid::new_v4();
    plane.seed(
        Table::Profiles,
        vec![
            profile_row(moderator, "มายด์", "mind"),
            profile_row(plain, "ใบเฟิร์น", "fern"),
        ],
    );
    plane.seed(Table::UserRoles, vec![role_row(moderator, "moderator")]);

    let ctx = signed_in_context(plane).await;
    let users = ctx.admin().users().await.unwrap();
    assert_eq!(users.len(), 2);

    let mod_user = users.iter().find(|u| u.user_id == moderator).unwrap();
    assert_eq!(mod_user.role, Some(Role::Moderator));
    let plain_user = users.iter().find(|u| u.user_id == plain).unwrap();
    assert_eq!(plain_user.role, None);
}

#[tokio::test]
async fn set_role_replaces_the_existing_row() {
    let plane = Arc::new(FakePlane::new());
    let target = Uuid::new_v4();
    plane.seed(Table::UserRoles, vec![role_row(target, "moderator")]);

    let ctx = signed_in_context(plane.clone()).await;
    ctx.admin().set_role(target, Role::Admin).await.unwrap();

    let rows = plane.rows(Table::UserRoles);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["role"], "admin");
}

#[tokio::test]
async fn moderation_delete_is_not_owner_scoped() {
    let plane = Arc::new(FakePlane::new());
    let stranger = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    plane.seed(
        Table::Posts,
        vec![post_row(post_id, stranger, "ขยะ", "2024-06-01T08:00:00Z")],
    );

    let ctx = signed_in_context(plane.clone()).await;
    ctx.admin().delete_post(post_id).await.unwrap();
    assert!(plane.rows(Table::Posts).is_empty());
}

#[tokio::test]
async fn platform_stats_decode() {
    let plane = Arc::new(FakePlane::new());
    plane.seed(
        Table::Profiles,
        vec![profile_row(Uuid::new_v4(), "ใบเฟิร์น", "fern")],
    );
    plane.seed(
        Table::Posts,
        vec![post_row(Uuid::new_v4(), Uuid::new_v4(), "หนึ่ง", "2024-06-01T08:00:00Z")],
    );

    let ctx = signed_in_context(plane).await;
    let stats = ctx.admin().platform_stats().await.unwrap();
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_posts, 1);
    assert_eq!(stats.total_comments, 0);
}

#[tokio::test]
async fn admin_lists_enrich_authors() {
    let plane = Arc::new(FakePlane::new());
    let author = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    plane.seed(Table::Profiles, vec![profile_row(author, "ใบเฟิร์น", "fern")]);
    plane.seed(
        Table::Posts,
        vec![post_row(post_id, author, "ตรวจสอบ", "2024-06-01T08:00:00Z")],
    );
    plane.seed(
        Table::Comments,
        vec![json!({
            "id": Uuid::new_v4().to_string(),
            "post_id": post_id.to_string(),
            "parent_comment_id": null,
            "user_id": author.to_string(),
            "content": "ความคิดเห็น",
            "created_at": "2024-06-01T09:00:00Z",
        })],
    );

    let ctx = signed_in_context(plane).await;
    let posts = ctx.admin().posts().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author.as_ref().unwrap().username.as_deref(), Some("fern"));

    let comments = ctx.admin().comments().await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(
        comments[0].author.as_ref().unwrap().username.as_deref(),
        Some("fern")
    );
}
