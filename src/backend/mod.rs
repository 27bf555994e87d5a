/// Backend-as-a-service boundary
///
/// Everything the client knows about the hosted platform goes through the
/// `DataPlane` trait: CRUD-style table operations, server-defined RPCs,
/// object-storage uploads and the authentication session primitives.
/// Realtime change feeds live in `realtime` and are handled separately
/// because they are long-lived resources rather than request/response.
pub mod http;
pub mod realtime;

pub use http::Backend;
pub use realtime::{ChangeEvent, ChangeKind, Realtime, RealtimeConfig, Subscription};

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Named tables owned by the hosted relational store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Posts,
    Comments,
    Likes,
    Reposts,
    Follows,
    Notifications,
    Profiles,
    Hashtags,
    UserRoles,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::Comments => "comments",
            Table::Likes => "likes",
            Table::Reposts => "reposts",
            Table::Follows => "follows",
            Table::Notifications => "notifications",
            Table::Profiles => "profiles",
            Table::Hashtags => "hashtags",
            Table::UserRoles => "user_roles",
        }
    }
}

/// Named object-storage buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Avatars,
    Covers,
    Posts,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Covers => "covers",
            Bucket::Posts => "posts",
        }
    }
}

/// Row filter, composed with AND unless placed in `Query::any_of`
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// column equals value
    Eq(&'static str, String),
    /// column is in the given set
    In(&'static str, Vec<String>),
    /// column contains the pattern, case-insensitive
    Contains(&'static str, String),
    /// column is null
    IsNull(&'static str),
    /// column is not null
    NotNull(&'static str),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Filter::Eq(column, value.to_string())
    }

    pub fn in_set<I, T>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Filter::In(column, values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn contains(column: &'static str, pattern: impl ToString) -> Self {
        Filter::Contains(column, pattern.to_string())
    }
}

/// Select query: filters, optional OR-group, ordering and limit
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    /// Filters matched as a single OR group (profile search)
    pub any_of: Vec<Filter>,
    /// Order column; `descending` picks the direction
    pub order_by: Option<&'static str>,
    pub descending: bool,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn any_of(mut self, filters: Vec<Filter>) -> Self {
        self.any_of = filters;
        self
    }

    pub fn order(mut self, column: &'static str, descending: bool) -> Self {
        self.order_by = Some(column);
        self.descending = descending;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Sign-up payload; `display_name` is stored as profile metadata
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Authenticated session returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
}

/// The hosted-service boundary
///
/// Implemented over HTTP by `Backend` and by in-memory fakes in tests. The
/// client owns no schema invariants: uniqueness, cascades and aggregate
/// counts are enforced remotely and only reflected here.
#[async_trait]
pub trait DataPlane: Send + Sync {
    /// Fetch rows matching a query
    async fn select(&self, table: Table, query: Query) -> ClientResult<Vec<Value>>;

    /// Insert a row, returning the stored representation
    async fn insert(&self, table: Table, row: Value) -> ClientResult<Value>;

    /// Update rows matching the filters
    async fn update(&self, table: Table, filters: Vec<Filter>, patch: Value)
        -> ClientResult<()>;

    /// Delete rows matching the filters
    async fn delete(&self, table: Table, filters: Vec<Filter>) -> ClientResult<()>;

    /// Count rows matching the filters without fetching them
    async fn count(&self, table: Table, filters: Vec<Filter>) -> ClientResult<i64>;

    /// Call a server-defined function with JSON parameters
    async fn rpc(&self, function: &str, params: Value) -> ClientResult<Value>;

    /// Upload bytes into a bucket, returning the public URL
    async fn upload(
        &self,
        _bucket: Bucket,
        _object: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> ClientResult<String> {
        Err(ClientError::Storage("storage not available".to_string()))
    }

    /// Register a new account
    async fn sign_up(&self, _request: SignUpRequest) -> ClientResult<Session> {
        Err(ClientError::Authentication("auth not available".to_string()))
    }

    /// Sign in with email and password
    async fn sign_in(&self, _email: &str, _password: &str) -> ClientResult<Session> {
        Err(ClientError::Authentication("auth not available".to_string()))
    }

    /// Invalidate the given session token
    async fn sign_out(&self, _access_token: &str) -> ClientResult<()> {
        Ok(())
    }
}

/// Decode a list of JSON rows into typed values
pub fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> ClientResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ClientError::from))
        .collect()
}
