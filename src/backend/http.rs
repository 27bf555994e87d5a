/// HTTP implementation of the backend boundary
///
/// Speaks the hosted service's REST conventions: row operations under
/// `/rest/v1/{table}`, server functions under `/rest/v1/rpc/{fn}`, object
/// storage under `/storage/v1` and session auth under `/auth/v1`.
use crate::{
    backend::{Bucket, DataPlane, Filter, Query, Session, SignUpRequest, Table},
    config::BackendConfig,
    error::{ClientError, ClientResult},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{header::HeaderMap, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Error body shapes the hosted service produces
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

/// Auth endpoint response; the session may be absent until email confirmation
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
    id: Option<Uuid>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    email: Option<String>,
}

/// HTTP backend client
pub struct Backend {
    config: BackendConfig,
    http: reqwest::Client,
    /// Bearer token for the signed-in user; anon key is used when absent
    access_token: RwLock<Option<String>>,
}

impl Backend {
    /// Create a new backend client
    pub fn new(config: BackendConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Tongfah/0.1")
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| ClientError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            access_token: RwLock::new(None),
        })
    }

    fn rest_url(&self, table: Table) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            table.as_str()
        )
    }

    /// Authorization headers for one request
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.config.anon_key.clone());
        if let Ok(value) = format!("Bearer {}", bearer).parse() {
            headers.insert("Authorization", value);
        }
        if let Ok(value) = self.config.anon_key.parse() {
            headers.insert("apikey", value);
        }
        headers
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).headers(self.auth_headers())
    }

    /// Translate one filter into a REST query pair
    fn filter_pair(filter: &Filter) -> (String, String) {
        match filter {
            Filter::Eq(column, value) => (column.to_string(), format!("eq.{}", value)),
            Filter::In(column, values) => {
                (column.to_string(), format!("in.({})", values.join(",")))
            }
            Filter::Contains(column, pattern) => {
                (column.to_string(), format!("ilike.*{}*", pattern))
            }
            Filter::IsNull(column) => (column.to_string(), "is.null".to_string()),
            Filter::NotNull(column) => (column.to_string(), "not.is.null".to_string()),
        }
    }

    /// Inner form used inside an `or=(...)` group
    fn filter_group_term(filter: &Filter) -> String {
        let (column, op) = Self::filter_pair(filter);
        format!("{}.{}", column, op)
    }

    fn query_pairs(query: &Query) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        for filter in &query.filters {
            pairs.push(Self::filter_pair(filter));
        }
        if !query.any_of.is_empty() {
            let terms: Vec<String> =
                query.any_of.iter().map(Self::filter_group_term).collect();
            pairs.push(("or".to_string(), format!("({})", terms.join(","))));
        }
        if let Some(column) = query.order_by {
            let direction = if query.descending { "desc" } else { "asc" };
            pairs.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some(limit) = query.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// Turn a non-success response into a ClientError
    async fn response_error(response: Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
            let message = body
                .message
                .or(body.error_description)
                .or(body.msg)
                .unwrap_or_else(|| text.clone());
            return ClientError::from_response(status, body.code, message);
        }
        ClientError::from_response(status, None, text)
    }

    async fn check(response: Response) -> ClientResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::response_error(response).await)
        }
    }

    fn session_from_auth(response: AuthResponse) -> ClientResult<Session> {
        let (user_id, email) = match response.user {
            Some(user) => (user.id, user.email.unwrap_or_default()),
            None => (
                response
                    .id
                    .ok_or_else(|| ClientError::Authentication("No user in response".to_string()))?,
                response.email.unwrap_or_default(),
            ),
        };
        let access_token = response.access_token.ok_or_else(|| {
            ClientError::Authentication("Session not yet active".to_string())
        })?;
        Ok(Session {
            user_id,
            email,
            access_token,
        })
    }
}

#[async_trait]
impl DataPlane for Backend {
    async fn select(&self, table: Table, query: Query) -> ClientResult<Vec<Value>> {
        let pairs = Self::query_pairs(&query);
        debug!(table = table.as_str(), "select");
        let response = self
            .request(Method::GET, &self.rest_url(table))
            .query(&pairs)
            .send()
            .await?;
        let rows = Self::check(response).await?.json::<Vec<Value>>().await?;
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> ClientResult<Value> {
        debug!(table = table.as_str(), "insert");
        let response = self
            .request(Method::POST, &self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let mut rows = Self::check(response).await?.json::<Vec<Value>>().await?;
        rows.pop()
            .ok_or_else(|| ClientError::Internal("Insert returned no row".to_string()))
    }

    async fn update(
        &self,
        table: Table,
        filters: Vec<Filter>,
        patch: Value,
    ) -> ClientResult<()> {
        let pairs: Vec<(String, String)> = filters.iter().map(Self::filter_pair).collect();
        debug!(table = table.as_str(), "update");
        let response = self
            .request(Method::PATCH, &self.rest_url(table))
            .query(&pairs)
            .json(&patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> ClientResult<()> {
        let pairs: Vec<(String, String)> = filters.iter().map(Self::filter_pair).collect();
        debug!(table = table.as_str(), "delete");
        let response = self
            .request(Method::DELETE, &self.rest_url(table))
            .query(&pairs)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn count(&self, table: Table, filters: Vec<Filter>) -> ClientResult<i64> {
        let mut pairs: Vec<(String, String)> = filters.iter().map(Self::filter_pair).collect();
        pairs.push(("select".to_string(), "*".to_string()));
        let response = self
            .request(Method::HEAD, &self.rest_url(table))
            .query(&pairs)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = Self::check(response).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        // Content-Range is "{from}-{to}/{total}"
        let total = range
            .rsplit('/')
            .next()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| ClientError::Internal(format!("Bad count header: {}", range)))?;
        Ok(total)
    }

    async fn rpc(&self, function: &str, params: Value) -> ClientResult<Value> {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.config.base_url.trim_end_matches('/'),
            function
        );
        debug!(function, "rpc");
        let response = self
            .request(Method::POST, &url)
            .json(&params)
            .send()
            .await?;
        let value = Self::check(response).await?.json::<Value>().await?;
        Ok(value)
    }

    async fn upload(
        &self,
        bucket: Bucket,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ClientResult<String> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{}/storage/v1/object/{}/{}", base, bucket.as_str(), object);
        let response = self
            .request(Method::POST, &url)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let err = Self::response_error(response).await;
            if status == StatusCode::PAYLOAD_TOO_LARGE {
                return Err(ClientError::Storage("File too large".to_string()));
            }
            return Err(err);
        }
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            base,
            bucket.as_str(),
            object
        ))
    }

    async fn sign_up(&self, request: SignUpRequest) -> ClientResult<Session> {
        let url = format!(
            "{}/auth/v1/signup",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "email": request.email,
            "password": request.password,
            "data": { "display_name": request.display_name },
        });
        let response = self.request(Method::POST, &url).json(&body).send().await?;
        let auth = Self::check(response).await?.json::<AuthResponse>().await?;
        let session = Self::session_from_auth(auth)?;
        *self.access_token.write() = Some(session.access_token.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let url = format!(
            "{}/auth/v1/token?grant_type=password",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.request(Method::POST, &url).json(&body).send().await?;
        let auth = Self::check(response).await?.json::<AuthResponse>().await?;
        let session = Self::session_from_auth(auth)?;
        *self.access_token.write() = Some(session.access_token.clone());
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> ClientResult<()> {
        let url = format!(
            "{}/auth/v1/logout",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        Self::check(response).await?;
        *self.access_token.write() = None;
        Ok(())
    }
}
