//! # Huddle
//!
//! A real-time presence and room fan-out hub for collaborative platform
//! backends. Huddle owns the live side of a platform's social features:
//! it admits authenticated WebSocket connections, multiplexes several
//! simultaneous connections per identity, tracks room membership and
//! ephemeral presence (typing indicators, call signaling), and fans events
//! out to exactly the right set of live connections.
//!
//! Durable state stays outside: chat history, notifications and presence
//! records belong to collaborator services reached through the `storage`
//! trait seams. A disconnected recipient misses live events and backfills
//! from the durable store on reconnect.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use huddle::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     huddle::server::init_tracing();
//!
//!     let config = HubConfig::from_yaml_file("huddle.yaml")?;
//!     let hub = Hub::builder()
//!         .with_config(&config)
//!         .with_notification_store(my_notification_store)
//!         .with_presence_store(my_presence_store)
//!         .build();
//!
//!     // Business services keep a handle for injected events:
//!     // hub.send_notification(user_id, payload).await;
//!
//!     let verifier = Arc::new(JwtVerifier::with_leeway(
//!         &config.auth.jwt_secret,
//!         config.auth.leeway_seconds,
//!     ));
//!     huddle::server::serve(config, hub, verifier).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod hub;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Hub ===
    pub use crate::hub::{
        Hub, HubBuilder,
        protocol::{ClientFrame, ServerFrame},
    };
    pub use crate::hub::HealthSnapshot;

    // === Auth ===
    pub use crate::core::auth::{Claims, JwtVerifier, StaticVerifier, TokenVerifier};

    // === Errors ===
    pub use crate::core::error::{
        AdmissionError, CollaboratorError, ConfigError, HubError, HubResult,
    };

    // === Config ===
    pub use crate::config::{AuthConfig, HubConfig};

    // === Storage ===
    pub use crate::storage::{
        InMemoryNotificationStore, InMemoryPresenceStore, NotificationStore, PresenceStatus,
        PresenceStore,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
    pub use uuid::Uuid;
}
