//! Channelz Core - entity model and data sources
//!
//! Types and data sources shared by the channelz inspector: the entity
//! snapshots reported by a `grpc.channelz.v1.Channelz` service, the error
//! taxonomy, client configuration and paged listing access.

pub mod config;
pub mod entity;
pub mod error;
pub mod memory;
pub mod pages;
pub mod proto;
pub mod source;

// Re-export commonly used types
pub use config::ClientConfig;
pub use entity::{
    Address, CallStats, ChannelEntity, Entity, EntityId, EntityKind, EntityRecord, EntityRef,
    ServerEntity, Severity, SocketEntity, State, Trace, TraceEvent,
};
pub use error::{ChannelzError, Result};
pub use memory::MemorySource;
pub use pages::{channel_pages, server_pages};
pub use source::{ChannelzSource, GrpcSource, Page};

/// Channelz inspector version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
