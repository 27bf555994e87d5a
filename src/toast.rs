/// Transient user-facing notifications
///
/// Stores push success and error toasts here; an embedding UI subscribes
/// and renders them. Messages are already localized (Thai).
use tokio::sync::broadcast;

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// One toast message
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// Shared toast channel
#[derive(Debug, Clone)]
pub struct ToastSink {
    tx: broadcast::Sender<Toast>,
}

impl ToastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to toasts; each subscriber sees every message
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        // No subscribers is fine; the toast is simply dropped
        let _ = self.tx.send(Toast {
            level: ToastLevel::Success,
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.tx.send(Toast {
            level: ToastLevel::Error,
            message: message.into(),
        });
    }
}

impl Default for ToastSink {
    fn default() -> Self {
        Self::new(64)
    }
}
