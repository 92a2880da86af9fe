//! In-memory `ChannelzSource`.
//!
//! Serves a fixed set of entities with the same paging contract as the live
//! service and records every call it receives, so callers can assert how
//! many RPCs an operation costs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::entity::{ChannelEntity, EntityId, EntityKind, ServerEntity, SocketEntity};
use crate::error::{ChannelzError, Result};
use crate::source::{ChannelzSource, Page};

#[derive(Default)]
struct Inner {
    servers: BTreeMap<EntityId, ServerEntity>,
    top_channels: BTreeMap<EntityId, ChannelEntity>,
    nested_channels: BTreeMap<EntityId, ChannelEntity>,
    subchannels: BTreeMap<EntityId, ChannelEntity>,
    sockets: BTreeMap<EntityId, SocketEntity>,
    calls: Vec<String>,
    /// Listing calls answered before the injected failure kicks in
    listing_failure: Option<(usize, tonic::Code, String)>,
    listings_served: usize,
    /// Detail calls that fail, keyed by their recorded form
    detail_failures: BTreeMap<String, (tonic::Code, String)>,
}

/// In-memory channelz data source.
#[derive(Default)]
pub struct MemorySource {
    inner: Mutex<Inner>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_server(&self, server: ServerEntity) {
        self.inner.lock().servers.insert(server.id, server);
    }

    /// Add a top-level channel (visible in the channel listing).
    pub fn add_channel(&self, channel: ChannelEntity) {
        self.inner.lock().top_channels.insert(channel.id, channel);
    }

    /// Add a channel that is only reachable by ID, as a child of another.
    pub fn add_nested_channel(&self, channel: ChannelEntity) {
        self.inner.lock().nested_channels.insert(channel.id, channel);
    }

    pub fn add_subchannel(&self, subchannel: ChannelEntity) {
        self.inner.lock().subchannels.insert(subchannel.id, subchannel);
    }

    pub fn add_socket(&self, socket: SocketEntity) {
        self.inner.lock().sockets.insert(socket.id, socket);
    }

    /// Fail every listing call with `status`.
    pub fn fail_listing(&self, status: tonic::Status) {
        self.fail_listing_after(0, status);
    }

    /// Serve `pages` listing calls, then fail every later one with `status`.
    pub fn fail_listing_after(&self, pages: usize, status: tonic::Status) {
        self.inner.lock().listing_failure =
            Some((pages, status.code(), status.message().to_string()));
    }

    /// Fail the detail call recorded as `call` (e.g. `GetSocket(7)`) with `status`.
    pub fn fail_call(&self, call: &str, status: tonic::Status) {
        self.inner.lock().detail_failures.insert(
            call.to_string(),
            (status.code(), status.message().to_string()),
        );
    }

    /// Calls received so far, e.g. `ListServers(0)` or `GetChannel(3)`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }
}

fn page<T: Clone>(map: &BTreeMap<EntityId, T>, start: EntityId, max_results: i64) -> Page<T> {
    let max = usize::try_from(max_results).unwrap_or(0);
    let mut rest = map.range(start..);
    let items: Vec<T> = rest.by_ref().take(max).map(|(_, v)| v.clone()).collect();
    Page {
        items,
        end: rest.next().is_none(),
    }
}

fn lookup<T: Clone>(
    map: &BTreeMap<EntityId, T>,
    operation: &str,
    kind: EntityKind,
    id: EntityId,
) -> Result<T> {
    map.get(&id).cloned().ok_or_else(|| {
        ChannelzError::from_status(
            tonic::Status::not_found(format!("{kind} {id} not found")),
            operation,
            kind,
            id,
        )
    })
}

impl Inner {
    fn record_listing(&mut self, operation: &str, kind: EntityKind, start: EntityId) -> Result<()> {
        self.calls.push(format!("{operation}({start})"));
        if let Some((allowed, code, message)) = &self.listing_failure {
            if self.listings_served >= *allowed {
                let status = tonic::Status::new(*code, message.clone());
                return Err(ChannelzError::from_status(status, operation, kind, start));
            }
        }
        self.listings_served += 1;
        Ok(())
    }

    fn record_detail(&mut self, operation: &str, kind: EntityKind, id: EntityId) -> Result<()> {
        let call = format!("{operation}({id})");
        let failure = self.detail_failures.get(&call).cloned();
        self.calls.push(call);
        match failure {
            Some((code, message)) => Err(ChannelzError::from_status(
                tonic::Status::new(code, message),
                operation,
                kind,
                id,
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChannelzSource for MemorySource {
    async fn list_servers(&self, start: EntityId, max_results: i64) -> Result<Page<ServerEntity>> {
        let mut inner = self.inner.lock();
        inner.record_listing("ListServers", EntityKind::Server, start)?;
        Ok(page(&inner.servers, start, max_results))
    }

    async fn get_server(&self, id: EntityId) -> Result<ServerEntity> {
        let mut inner = self.inner.lock();
        inner.record_detail("GetServer", EntityKind::Server, id)?;
        lookup(&inner.servers, "GetServer", EntityKind::Server, id)
    }

    async fn list_channels(
        &self,
        start: EntityId,
        max_results: i64,
    ) -> Result<Page<ChannelEntity>> {
        let mut inner = self.inner.lock();
        inner.record_listing("ListChannels", EntityKind::Channel, start)?;
        Ok(page(&inner.top_channels, start, max_results))
    }

    async fn get_channel(&self, id: EntityId) -> Result<ChannelEntity> {
        let mut inner = self.inner.lock();
        inner.record_detail("GetChannel", EntityKind::Channel, id)?;
        match inner.nested_channels.get(&id) {
            Some(channel) => Ok(channel.clone()),
            None => lookup(&inner.top_channels, "GetChannel", EntityKind::Channel, id),
        }
    }

    async fn get_subchannel(&self, id: EntityId) -> Result<ChannelEntity> {
        let mut inner = self.inner.lock();
        inner.record_detail("GetSubchannel", EntityKind::Subchannel, id)?;
        lookup(&inner.subchannels, "GetSubchannel", EntityKind::Subchannel, id)
    }

    async fn get_socket(&self, id: EntityId) -> Result<SocketEntity> {
        let mut inner = self.inner.lock();
        inner.record_detail("GetSocket", EntityKind::Socket, id)?;
        lookup(&inner.sockets, "GetSocket", EntityKind::Socket, id)
    }
}
