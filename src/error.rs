/// Unified error types for the Tongfah client
use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Errors reported by the hosted backend
    #[error("Backend error ({status}): {message}")]
    Backend {
        status: u16,
        /// Server error code, e.g. "23505" for a unique violation
        code: Option<String>,
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Validation errors (caught locally before any remote call)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict errors (e.g. duplicate handle)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Realtime subscription errors
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Storage upload errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payload decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Unique-violation code reported by the backend's relational store
pub const UNIQUE_VIOLATION: &str = "23505";

impl ClientError {
    /// Build a Backend error from a response status and body.
    ///
    /// Unique violations and duplicate registrations are promoted to
    /// Conflict so callers can show a specific message.
    pub fn from_response(status: u16, code: Option<String>, message: String) -> Self {
        let is_unique = code.as_deref() == Some(UNIQUE_VIOLATION);
        if is_unique || message.contains("already registered") {
            return ClientError::Conflict(message);
        }
        if status == 404 {
            return ClientError::NotFound(message);
        }
        if status == 401 || status == 403 {
            return ClientError::Authentication(message);
        }
        ClientError::Backend {
            status,
            code,
            message,
        }
    }

    /// Thai-language message suitable for a user-facing toast
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::Http(_) => "เชื่อมต่อเซิร์ฟเวอร์ไม่ได้ กรุณาลองใหม่อีกครั้ง",
            ClientError::Backend { .. } => "เกิดข้อผิดพลาด กรุณาลองใหม่อีกครั้ง",
            ClientError::Authentication(_) => "กรุณาเข้าสู่ระบบ",
            ClientError::Validation(_) => "ข้อมูลไม่ถูกต้อง",
            ClientError::Conflict(_) => "ข้อมูลนี้ถูกใช้งานแล้ว",
            ClientError::NotFound(_) => "ไม่พบข้อมูล",
            ClientError::Subscription(_) => "การเชื่อมต่อแบบเรียลไทม์ขัดข้อง",
            ClientError::Storage(_) => "ไม่สามารถอัปโหลดไฟล์ได้",
            ClientError::Decode(_) | ClientError::Internal(_) => {
                "เกิดข้อผิดพลาด กรุณาลองใหม่อีกครั้ง"
            }
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
