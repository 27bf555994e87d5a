/// Configuration management for the Tongfah client
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub backend: BackendConfig,
    pub feed: FeedConfig,
    pub mention: MentionConfig,
    pub search: SearchConfig,
    pub notification: NotificationConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted service, e.g. https://project.example.co
    pub base_url: String,
    /// Publishable API key sent with every request
    pub anon_key: String,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Realtime reconnect interval in seconds
    pub reconnect_interval: u64,
    /// Buffer size for realtime event channels
    pub event_buffer_size: usize,
}

/// Feed fetch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Maximum posts per feed fetch
    pub page_limit: u32,
    /// Maximum rows in admin panel lists
    pub admin_page_limit: u32,
    /// Trending hashtag count
    pub trending_limit: u32,
}

/// Mention autocomplete tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionConfig {
    /// Debounce before firing the suggestion search, in milliseconds
    pub debounce_ms: u64,
    /// Maximum suggestions returned
    pub suggestion_limit: u32,
}

/// Search limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub user_limit: u32,
    pub post_limit: u32,
}

/// Notification list tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Maximum notifications per fetch
    pub page_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_limit: 50,
            admin_page_limit: 100,
            trending_limit: 10,
        }
    }
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            suggestion_limit: 5,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            user_limit: 20,
            post_limit: 50,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { page_limit: 50 }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ClientResult<Self> {
        dotenv::dotenv().ok();

        let base_url = env::var("TONGFAH_BACKEND_URL")
            .map_err(|_| ClientError::Validation("Backend URL required".to_string()))?;
        let anon_key = env::var("TONGFAH_ANON_KEY")
            .map_err(|_| ClientError::Validation("API key required".to_string()))?;

        let request_timeout = env::var("TONGFAH_REQUEST_TIMEOUT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let reconnect_interval = env::var("TONGFAH_RECONNECT_INTERVAL")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let event_buffer_size = env::var("TONGFAH_EVENT_BUFFER_SIZE")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .unwrap_or(256);

        let page_limit = env::var("TONGFAH_FEED_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let admin_page_limit = env::var("TONGFAH_ADMIN_LIMIT")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let trending_limit = env::var("TONGFAH_TRENDING_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let debounce_ms = env::var("TONGFAH_MENTION_DEBOUNCE_MS")
            .unwrap_or_else(|_| "200".to_string())
            .parse()
            .unwrap_or(200);
        let suggestion_limit = env::var("TONGFAH_MENTION_LIMIT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let user_limit = env::var("TONGFAH_SEARCH_USER_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .unwrap_or(20);
        let post_limit = env::var("TONGFAH_SEARCH_POST_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let notification_page_limit = env::var("TONGFAH_NOTIFICATION_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let config = ClientConfig {
            backend: BackendConfig {
                base_url,
                anon_key,
                request_timeout,
                reconnect_interval,
                event_buffer_size,
            },
            feed: FeedConfig {
                page_limit,
                admin_page_limit,
                trending_limit,
            },
            mention: MentionConfig {
                debounce_ms,
                suggestion_limit,
            },
            search: SearchConfig {
                user_limit,
                post_limit,
            },
            notification: NotificationConfig {
                page_limit: notification_page_limit,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.backend.base_url)
            .map_err(|_| ClientError::Validation("Invalid backend URL".to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Validation(
                "Backend URL must be http or https".to_string(),
            ));
        }
        if self.backend.anon_key.is_empty() {
            return Err(ClientError::Validation("API key cannot be empty".to_string()));
        }
        if self.feed.page_limit == 0 {
            return Err(ClientError::Validation(
                "Feed page limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// WebSocket URL for the realtime change feed
    pub fn realtime_url(&self) -> String {
        let ws_base = self
            .backend
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!(
            "{}/realtime/v1/websocket?apikey={}",
            ws_base.trim_end_matches('/'),
            urlencoding::encode(&self.backend.anon_key)
        )
    }
}
