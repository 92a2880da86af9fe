//! Data sources that answer channelz queries.
//!
//! - `ChannelzSource`: the query surface consumed by the inspector.
//! - `GrpcSource`: talks to a live process over `grpc.channelz.v1.Channelz`.
//!
//! Every call made through one `GrpcSource` shares a single deadline, fixed
//! when the source is created.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::entity::{ChannelEntity, EntityId, EntityKind, ServerEntity, SocketEntity};
use crate::error::{ChannelzError, Result};
use crate::proto;
use crate::proto::channelz_client::ChannelzClient;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The service reported that nothing follows this page
    pub end: bool,
}

/// Query surface of the channelz service.
#[async_trait]
pub trait ChannelzSource: Send + Sync {
    /// List servers with ID >= `start`, ascending, at most `max_results`.
    async fn list_servers(&self, start: EntityId, max_results: i64) -> Result<Page<ServerEntity>>;

    async fn get_server(&self, id: EntityId) -> Result<ServerEntity>;

    /// List top-level channels with ID >= `start`, ascending, at most `max_results`.
    async fn list_channels(&self, start: EntityId, max_results: i64)
        -> Result<Page<ChannelEntity>>;

    async fn get_channel(&self, id: EntityId) -> Result<ChannelEntity>;

    async fn get_subchannel(&self, id: EntityId) -> Result<ChannelEntity>;

    async fn get_socket(&self, id: EntityId) -> Result<SocketEntity>;
}

/// `ChannelzSource` backed by a tonic client.
#[derive(Debug, Clone)]
pub struct GrpcSource {
    client: ChannelzClient<tonic::transport::Channel>,
    deadline: Instant,
}

impl GrpcSource {
    /// Connect to `address`. The deadline for every later call starts now.
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        let endpoint = tonic::transport::Endpoint::from_shared(address.to_string())
            .map_err(|e| ChannelzError::ConfigError(format!("invalid address {address}: {e}")))?;

        tracing::debug!(address, ?timeout, "Connecting to channelz service");
        let channel = match tokio::time::timeout_at(deadline, endpoint.connect()).await {
            Ok(channel) => channel?,
            Err(_) => {
                return Err(ChannelzError::Unavailable {
                    operation: format!("connect({address})"),
                    status: tonic::Status::deadline_exceeded("connection timed out"),
                })
            }
        };

        Ok(Self::new(ChannelzClient::new(channel), deadline))
    }

    pub fn new(client: ChannelzClient<tonic::transport::Channel>, deadline: Instant) -> Self {
        Self { client, deadline }
    }

    /// Run one RPC under the shared deadline and map its status.
    async fn call<T, F>(&self, operation: &str, kind: EntityKind, id: EntityId, rpc: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<tonic::Response<T>, tonic::Status>>,
    {
        tracing::debug!(operation, id, "channelz call");
        let status = match tokio::time::timeout_at(self.deadline, rpc).await {
            Ok(Ok(response)) => return Ok(response.into_inner()),
            Ok(Err(status)) => status,
            Err(_) => tonic::Status::deadline_exceeded("deadline exceeded"),
        };
        Err(ChannelzError::from_status(status, operation, kind, id))
    }
}

fn missing(kind: EntityKind, id: EntityId) -> ChannelzError {
    ChannelzError::NotFound {
        kind,
        identifier: id.to_string(),
    }
}

#[async_trait]
impl ChannelzSource for GrpcSource {
    async fn list_servers(&self, start: EntityId, max_results: i64) -> Result<Page<ServerEntity>> {
        let mut client = self.client.clone();
        let request = proto::GetServersRequest {
            start_server_id: start,
            max_results,
        };
        let response = self
            .call("GetServers", EntityKind::Server, start, client.get_servers(request))
            .await?;
        Ok(Page {
            items: response.server.into_iter().map(ServerEntity::from).collect(),
            end: response.end,
        })
    }

    async fn get_server(&self, id: EntityId) -> Result<ServerEntity> {
        let mut client = self.client.clone();
        let request = proto::GetServerRequest { server_id: id };
        let response = self
            .call("GetServer", EntityKind::Server, id, client.get_server(request))
            .await?;
        response
            .server
            .map(ServerEntity::from)
            .ok_or_else(|| missing(EntityKind::Server, id))
    }

    async fn list_channels(
        &self,
        start: EntityId,
        max_results: i64,
    ) -> Result<Page<ChannelEntity>> {
        let mut client = self.client.clone();
        let request = proto::GetTopChannelsRequest {
            start_channel_id: start,
            max_results,
        };
        let response = self
            .call(
                "GetTopChannels",
                EntityKind::Channel,
                start,
                client.get_top_channels(request),
            )
            .await?;
        Ok(Page {
            items: response.channel.into_iter().map(ChannelEntity::from).collect(),
            end: response.end,
        })
    }

    async fn get_channel(&self, id: EntityId) -> Result<ChannelEntity> {
        let mut client = self.client.clone();
        let request = proto::GetChannelRequest { channel_id: id };
        let response = self
            .call("GetChannel", EntityKind::Channel, id, client.get_channel(request))
            .await?;
        response
            .channel
            .map(ChannelEntity::from)
            .ok_or_else(|| missing(EntityKind::Channel, id))
    }

    async fn get_subchannel(&self, id: EntityId) -> Result<ChannelEntity> {
        let mut client = self.client.clone();
        let request = proto::GetSubchannelRequest { subchannel_id: id };
        let response = self
            .call(
                "GetSubchannel",
                EntityKind::Subchannel,
                id,
                client.get_subchannel(request),
            )
            .await?;
        response
            .subchannel
            .map(ChannelEntity::from)
            .ok_or_else(|| missing(EntityKind::Subchannel, id))
    }

    async fn get_socket(&self, id: EntityId) -> Result<SocketEntity> {
        let mut client = self.client.clone();
        let request = proto::GetSocketRequest {
            socket_id: id,
            summary: false,
        };
        let response = self
            .call("GetSocket", EntityKind::Socket, id, client.get_socket(request))
            .await?;
        response
            .socket
            .map(SocketEntity::from)
            .ok_or_else(|| missing(EntityKind::Socket, id))
    }
}
