#![allow(dead_code)]

//! In-memory data plane and fixtures shared by the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tongfah::backend::{DataPlane, Filter, Query, Session, SignUpRequest, Table};
use tongfah::config::{
    BackendConfig, ClientConfig, FeedConfig, MentionConfig, NotificationConfig, SearchConfig,
};
use tongfah::error::{ClientError, ClientResult};
use tongfah::AppContext;
use uuid::Uuid;

/// In-memory stand-in for the hosted backend.
///
/// Rows live in per-table vectors of JSON objects; filters, counts and the
/// enrichment RPCs are evaluated against them. Setting `fail_writes` makes
/// every mutation return a backend error, for rollback tests.
pub struct FakePlane {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    pub session_user: Uuid,
    pub fail_writes: AtomicBool,
}

impl FakePlane {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            session_user: Uuid::new_v4(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        self.tables.lock().entry(table).or_default().extend(rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.lock().get(&table).cloned().unwrap_or_default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> ClientResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Backend {
                status: 500,
                code: None,
                message: "injected failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn matching(&self, table: Table, filters: &[Filter]) -> Vec<Value> {
        self.tables
            .lock()
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| filter_matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn field_str(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn filter_matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => field_str(row, column).as_deref() == Some(value.as_str()),
        Filter::In(column, values) => field_str(row, column)
            .map(|v| values.contains(&v))
            .unwrap_or(false),
        Filter::Contains(column, pattern) => field_str(row, column)
            .map(|v| v.to_lowercase().contains(&pattern.to_lowercase()))
            .unwrap_or(false),
        Filter::IsNull(column) => row.get(column).map(|v| v.is_null()).unwrap_or(true),
        Filter::NotNull(column) => row.get(column).map(|v| !v.is_null()).unwrap_or(false),
    }
}

#[async_trait]
impl DataPlane for FakePlane {
    async fn select(&self, table: Table, query: Query) -> ClientResult<Vec<Value>> {
        let mut rows: Vec<Value> = self
            .tables
            .lock()
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query.filters.iter().all(|f| filter_matches(row, f))
                            && (query.any_of.is_empty()
                                || query.any_of.iter().any(|f| filter_matches(row, f)))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(column) = query.order_by {
            rows.sort_by(|a, b| {
                let left = field_str(a, column).unwrap_or_default();
                let right = field_str(b, column).unwrap_or_default();
                if query.descending {
                    right.cmp(&left)
                } else {
                    left.cmp(&right)
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Value) -> ClientResult<Value> {
        self.check_writable()?;
        let object = row
            .as_object_mut()
            .ok_or_else(|| ClientError::Internal("row must be an object".to_string()))?;
        object
            .entry("id")
            .or_insert_with(|| json!(Uuid::new_v4().to_string()));
        object
            .entry("created_at")
            .or_insert_with(|| json!(chrono::Utc::now().to_rfc3339()));
        let stored = Value::Object(object.clone());
        self.tables.lock().entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: Table,
        filters: Vec<Filter>,
        patch: Value,
    ) -> ClientResult<()> {
        self.check_writable()?;
        let patch = patch
            .as_object()
            .ok_or_else(|| ClientError::Internal("patch must be an object".to_string()))?
            .clone();
        let mut tables = self.tables.lock();
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut() {
                if filters.iter().all(|f| filter_matches(row, f)) {
                    if let Some(object) = row.as_object_mut() {
                        for (key, value) in &patch {
                            object.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> ClientResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock();
        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|row| !filters.iter().all(|f| filter_matches(row, f)));
        }
        Ok(())
    }

    async fn count(&self, table: Table, filters: Vec<Filter>) -> ClientResult<i64> {
        Ok(self.matching(table, &filters).len() as i64)
    }

    async fn rpc(&self, function: &str, params: Value) -> ClientResult<Value> {
        match function {
            "get_post_stats_batch" => {
                let post_ids = string_array(&params["post_ids"]);
                let stats: Vec<Value> = post_ids
                    .into_iter()
                    .map(|post_id| {
                        json!({
                            "post_id": post_id,
                            "likes_count": self.count_by(Table::Likes, "post_id", &post_id),
                            "comments_count":
                                self.count_by(Table::Comments, "post_id", &post_id),
                            "reposts_count":
                                self.count_by(Table::Reposts, "post_id", &post_id),
                        })
                    })
                    .collect();
                Ok(json!(stats))
            }
            "liked_post_ids" => Ok(self.viewer_flag_ids(Table::Likes, &params)),
            "reposted_post_ids" => Ok(self.viewer_flag_ids(Table::Reposts, &params)),
            "is_admin" => {
                let user_id = params["_user_id"].as_str().unwrap_or_default().to_string();
                let admin = self.rows(Table::UserRoles).iter().any(|row| {
                    field_str(row, "user_id").as_deref() == Some(user_id.as_str())
                        && field_str(row, "role").as_deref() == Some("admin")
                });
                Ok(json!(admin))
            }
            "get_platform_stats" => Ok(json!({
                "total_users": self.rows(Table::Profiles).len(),
                "total_posts": self.rows(Table::Posts).len(),
                "total_comments": self.rows(Table::Comments).len(),
                "total_likes": self.rows(Table::Likes).len(),
                "users_today": 0,
                "posts_today": 0,
            })),
            "get_trending_hashtags" => {
                let limit = params["limit_count"].as_u64().unwrap_or(10) as usize;
                let mut tags = self.rows(Table::Hashtags);
                tags.sort_by_key(|t| -(t["post_count"].as_i64().unwrap_or(0)));
                tags.truncate(limit);
                Ok(json!(tags))
            }
            other => Err(ClientError::Internal(format!("unknown rpc {}", other))),
        }
    }

    async fn upload(
        &self,
        bucket: tongfah::backend::Bucket,
        object: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> ClientResult<String> {
        self.check_writable()?;
        Ok(format!(
            "https://test.example.co/storage/v1/object/public/{}/{}",
            bucket.as_str(),
            object
        ))
    }

    async fn sign_up(&self, request: SignUpRequest) -> ClientResult<Session> {
        Ok(Session {
            user_id: self.session_user,
            email: request.email,
            access_token: "test-token".to_string(),
        })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> ClientResult<Session> {
        Ok(Session {
            user_id: self.session_user,
            email: email.to_string(),
            access_token: "test-token".to_string(),
        })
    }
}

impl FakePlane {
    fn count_by(&self, table: Table, column: &str, value: &str) -> i64 {
        self.rows(table)
            .iter()
            .filter(|row| field_str(row, column).as_deref() == Some(value))
            .count() as i64
    }

    fn viewer_flag_ids(&self, table: Table, params: &Value) -> Value {
        let user_id = params["user_uuid"].as_str().unwrap_or_default().to_string();
        let post_ids = string_array(&params["post_ids"]);
        let flagged: Vec<String> = self
            .rows(table)
            .iter()
            .filter(|row| {
                field_str(row, "user_id").as_deref() == Some(user_id.as_str())
                    && field_str(row, "post_id")
                        .map(|id| post_ids.contains(&id))
                        .unwrap_or(false)
            })
            .filter_map(|row| field_str(row, "post_id"))
            .collect();
        json!(flagged)
    }
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        backend: BackendConfig {
            base_url: "https://test.example.co".to_string(),
            anon_key: "test-anon-key".to_string(),
            request_timeout: 10,
            reconnect_interval: 5,
            event_buffer_size: 256,
        },
        feed: FeedConfig::default(),
        mention: MentionConfig::default(),
        search: SearchConfig::default(),
        notification: NotificationConfig::default(),
    }
}

pub fn context_with(plane: Arc<FakePlane>) -> AppContext {
    AppContext::with_data_plane(test_config(), plane)
}

/// Build a context and sign the fake's session user in.
pub async fn signed_in_context(plane: Arc<FakePlane>) -> AppContext {
    let ctx = context_with(plane);
    ctx.session
        .sign_in("fern@example.co", "secret1")
        .await
        .expect("sign-in against the fake cannot fail");
    ctx
}

pub fn post_row(id: Uuid, user_id: Uuid, content: &str, created_at: &str) -> Value {
    json!({
        "id": id.to_string(),
        "user_id": user_id.to_string(),
        "content": content,
        "image_url": null,
        "created_at": created_at,
    })
}

pub fn profile_row(user_id: Uuid, display_name: &str, username: &str) -> Value {
    json!({
        "user_id": user_id.to_string(),
        "display_name": display_name,
        "username": username,
        "avatar_url": null,
        "cover_url": null,
        "bio": null,
        "created_at": "2024-01-01T00:00:00Z",
    })
}
