//! Detail retrieval once an entity ID is known.

use channelz_core::{
    Address, CallStats, ChannelEntity, ChannelzSource, Entity, EntityId, EntityKind, EntityRef,
    Result, ServerEntity, State, Trace,
};

/// Fetch the detail of entity `id` of `kind` with a single call.
///
/// A missing entity surfaces as `NotFound`; any other failure as
/// `Unavailable` with the service status attached.
pub async fn fetch(source: &dyn ChannelzSource, id: EntityId, kind: EntityKind) -> Result<Entity> {
    tracing::debug!(%kind, id, "Fetching entity");
    let entity = match kind {
        EntityKind::Server => Entity::Server(source.get_server(id).await?),
        EntityKind::Channel => Entity::Channel(source.get_channel(id).await?),
        EntityKind::Subchannel => Entity::Subchannel(source.get_subchannel(id).await?),
        EntityKind::Socket => Entity::Socket(source.get_socket(id).await?),
    };
    Ok(entity)
}

/// A channel (or subchannel) together with the detail of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetail {
    pub channel: ChannelEntity,
    /// Child channels, in reference order
    pub channels: Vec<ChannelEntity>,
    /// Child subchannels, in reference order
    pub subchannels: Vec<ChannelEntity>,
}

/// Fetch every child channel and subchannel referenced by `channel`.
///
/// `kind` is the kind of `channel` itself. A child that no longer exists is
/// kept as an `UNKNOWN` row built from its reference; any other failure is
/// reported against the parent.
pub async fn expand(
    source: &dyn ChannelzSource,
    kind: EntityKind,
    channel: ChannelEntity,
) -> Result<ChannelDetail> {
    let mut channels = Vec::with_capacity(channel.channels.len());
    for child in &channel.channels {
        let found = source.get_channel(child.id).await;
        channels.push(child_or_placeholder(found, child, kind, channel.id)?);
    }

    let mut subchannels = Vec::with_capacity(channel.subchannels.len());
    for child in &channel.subchannels {
        let found = source.get_subchannel(child.id).await;
        subchannels.push(child_or_placeholder(found, child, kind, channel.id)?);
    }

    Ok(ChannelDetail {
        channel,
        channels,
        subchannels,
    })
}

fn child_or_placeholder(
    found: Result<ChannelEntity>,
    child: &EntityRef,
    parent_kind: EntityKind,
    parent_id: EntityId,
) -> Result<ChannelEntity> {
    match found {
        Ok(entity) => Ok(entity),
        Err(e) if e.is_not_found() => {
            tracing::warn!(%parent_kind, parent_id, child = child.id, "Child entity is gone");
            Ok(ChannelEntity {
                id: child.id,
                name: child.name.clone(),
                state: State::Unknown,
                target: String::new(),
                calls: CallStats::default(),
                trace: Trace::default(),
                channels: vec![],
                subchannels: vec![],
                sockets: vec![],
            })
        }
        Err(e) => Err(e.within(parent_kind, parent_id)),
    }
}

/// Local addresses of a server's listen sockets.
///
/// Listen sockets that no longer exist contribute no address.
pub async fn local_addresses(
    source: &dyn ChannelzSource,
    server: &ServerEntity,
) -> Result<Vec<Address>> {
    let mut addrs = Vec::with_capacity(server.listen_sockets.len());
    for listen in &server.listen_sockets {
        match source.get_socket(listen.id).await {
            Ok(socket) => addrs.extend(socket.local),
            Err(e) if e.is_not_found() => {
                tracing::warn!(server = server.id, socket = listen.id, "Listen socket is gone");
            }
            Err(e) => return Err(e.within(EntityKind::Server, server.id)),
        }
    }
    Ok(addrs)
}
