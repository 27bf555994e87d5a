//! Tongfah — client data layer for a Thai-language social network
//!
//! The crate talks to a hosted backend-as-a-service: a relational store
//! behind a REST row API, server-defined RPC functions, object storage and a
//! WebSocket change feed. All persistent state lives remotely; the stores in
//! this crate cache denormalized snapshots, apply optimistic mutations with
//! rollback, and patch themselves incrementally from realtime events.
//!
//! Entry point is [`context::AppContext`]: build it from a [`config::ClientConfig`]
//! and ask it for stores bound to the shared session and toast channel.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod session;
pub mod stores;
pub mod toast;

pub use backend::{Backend, DataPlane, Realtime, Session};
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ClientError, ClientResult};
pub use session::SessionContext;
pub use toast::{Toast, ToastLevel, ToastSink};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber, honoring `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tongfah=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
