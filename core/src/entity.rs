//! Entity snapshots reported by the channelz service.
//!
//! The wire messages in [`crate::proto`] are converted into these types once,
//! at the source boundary. Missing optional messages collapse to their
//! defaults: an absent timestamp is the Unix epoch ("never recorded") and an
//! absent call block is all zeros.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};

use crate::proto;

/// Process-scoped entity ID assigned by the remote service.
pub type EntityId = i64;

/// The closed set of entity kinds exposed by channelz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Server,
    Channel,
    Subchannel,
    Socket,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Server => "server",
            EntityKind::Channel => "channel",
            EntityKind::Subchannel => "subchannel",
            EntityKind::Socket => "socket",
        };
        f.write_str(name)
    }
}

/// Connectivity state of a channel or subchannel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Unknown,
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Unknown => "UNKNOWN",
            State::Idle => "IDLE",
            State::Connecting => "CONNECTING",
            State::Ready => "READY",
            State::TransientFailure => "TRANSIENT_FAILURE",
            State::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

impl From<proto::channel_connectivity_state::State> for State {
    fn from(state: proto::channel_connectivity_state::State) -> Self {
        use proto::channel_connectivity_state::State as Wire;
        match state {
            Wire::Unknown => State::Unknown,
            Wire::Idle => State::Idle,
            Wire::Connecting => State::Connecting,
            Wire::Ready => State::Ready,
            Wire::TransientFailure => State::TransientFailure,
            Wire::Shutdown => State::Shutdown,
        }
    }
}

/// Severity of a channel trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Unknown,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Unknown => "UNKNOWN",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(name)
    }
}

impl From<proto::channel_trace_event::Severity> for Severity {
    fn from(severity: proto::channel_trace_event::Severity) -> Self {
        use proto::channel_trace_event::Severity as Wire;
        match severity {
            Wire::CtUnknown => Severity::Unknown,
            Wire::CtInfo => Severity::Info,
            Wire::CtWarning => Severity::Warning,
            Wire::CtError => Severity::Error,
        }
    }
}

/// Call counters attached to every entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallStats {
    pub started: i64,
    pub succeeded: i64,
    pub failed: i64,
    /// Epoch when no call was ever recorded
    pub last_call_started: DateTime<Utc>,
}

/// A single channel trace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Trace log of a channel, subchannel or server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace {
    /// Events ever logged, including those the service has evicted
    pub num_events_logged: i64,
    pub creation_timestamp: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
}

impl Trace {
    /// Events logged by the service but no longer retained.
    pub fn num_events_dropped(&self) -> i64 {
        let retained = i64::try_from(self.events.len()).unwrap_or(i64::MAX);
        self.num_events_logged.saturating_sub(retained).max(0)
    }
}

/// Reference to a child entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub id: EntityId,
    pub name: String,
}

/// Socket endpoint address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    TcpIp { ip: Option<IpAddr>, port: i32 },
    Unix { path: String },
    Other { name: String },
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::TcpIp { ip: Some(ip), port } => write!(f, "[{ip}]:{port}"),
            Address::TcpIp { ip: None, port } => write!(f, "[]:{port}"),
            Address::Unix { path } => write!(f, "unix:{path}"),
            Address::Other { name } => f.write_str(name),
        }
    }
}

/// Server snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntity {
    pub id: EntityId,
    pub name: String,
    pub calls: CallStats,
    pub trace: Option<Trace>,
    pub listen_sockets: Vec<EntityRef>,
}

/// Channel or subchannel snapshot; both share the channelz `ChannelData` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntity {
    pub id: EntityId,
    pub name: String,
    pub state: State,
    pub target: String,
    pub calls: CallStats,
    pub trace: Trace,
    pub channels: Vec<EntityRef>,
    pub subchannels: Vec<EntityRef>,
    pub sockets: Vec<EntityRef>,
}

/// Socket snapshot. Stream counters fill the shared [`CallStats`] shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntity {
    pub id: EntityId,
    pub name: String,
    pub local: Option<Address>,
    pub remote: Option<Address>,
    pub remote_name: String,
    pub streams: CallStats,
    pub messages_sent: i64,
    pub messages_received: i64,
    pub keep_alives_sent: i64,
    pub last_message_sent: DateTime<Utc>,
    pub last_message_received: DateTime<Utc>,
}

/// Interface shared by every entity kind.
pub trait EntityRecord {
    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
    fn calls(&self) -> &CallStats;
}

impl EntityRecord for ServerEntity {
    fn id(&self) -> EntityId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn calls(&self) -> &CallStats {
        &self.calls
    }
}

impl EntityRecord for ChannelEntity {
    fn id(&self) -> EntityId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn calls(&self) -> &CallStats {
        &self.calls
    }
}

impl EntityRecord for SocketEntity {
    fn id(&self) -> EntityId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn calls(&self) -> &CallStats {
        &self.streams
    }
}

/// Any entity returned by a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Server(ServerEntity),
    Channel(ChannelEntity),
    Subchannel(ChannelEntity),
    Socket(SocketEntity),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Server(_) => EntityKind::Server,
            Entity::Channel(_) => EntityKind::Channel,
            Entity::Subchannel(_) => EntityKind::Subchannel,
            Entity::Socket(_) => EntityKind::Socket,
        }
    }

    fn record(&self) -> &dyn EntityRecord {
        match self {
            Entity::Server(s) => s,
            Entity::Channel(c) | Entity::Subchannel(c) => c,
            Entity::Socket(s) => s,
        }
    }
}

impl EntityRecord for Entity {
    fn id(&self) -> EntityId {
        self.record().id()
    }
    fn name(&self) -> &str {
        self.record().name()
    }
    fn calls(&self) -> &CallStats {
        self.record().calls()
    }
}

// --- Wire conversions ---

/// Convert a wire timestamp; absent or out-of-range values become the epoch.
pub fn timestamp(ts: Option<&prost_types::Timestamp>) -> DateTime<Utc> {
    ts.and_then(|ts| DateTime::from_timestamp(ts.seconds, ts.nanos.max(0) as u32))
        .unwrap_or_default()
}

impl From<proto::ChannelTrace> for Trace {
    fn from(trace: proto::ChannelTrace) -> Self {
        let events = trace
            .events
            .into_iter()
            .map(|event| TraceEvent {
                severity: proto::channel_trace_event::Severity::try_from(event.severity)
                    .map(Severity::from)
                    .unwrap_or_default(),
                timestamp: timestamp(event.timestamp.as_ref()),
                description: event.description,
            })
            .collect();
        Trace {
            num_events_logged: trace.num_events_logged,
            creation_timestamp: timestamp(trace.creation_timestamp.as_ref()),
            events,
        }
    }
}

impl From<proto::ChannelRef> for EntityRef {
    fn from(r: proto::ChannelRef) -> Self {
        EntityRef {
            id: r.channel_id,
            name: r.name,
        }
    }
}

impl From<proto::SubchannelRef> for EntityRef {
    fn from(r: proto::SubchannelRef) -> Self {
        EntityRef {
            id: r.subchannel_id,
            name: r.name,
        }
    }
}

impl From<proto::SocketRef> for EntityRef {
    fn from(r: proto::SocketRef) -> Self {
        EntityRef {
            id: r.socket_id,
            name: r.name,
        }
    }
}

/// Convert a wire address; an address with no variant set is `None`.
pub fn address(addr: proto::Address) -> Option<Address> {
    use proto::address::Address as Wire;
    match addr.address? {
        Wire::TcpipAddress(tcp) => {
            let ip = match tcp.ip_address.len() {
                4 => {
                    let octets: [u8; 4] = tcp.ip_address.as_slice().try_into().ok()?;
                    Some(IpAddr::V4(Ipv4Addr::from(octets)))
                }
                16 => {
                    let octets: [u8; 16] = tcp.ip_address.as_slice().try_into().ok()?;
                    Some(IpAddr::V6(Ipv6Addr::from(octets)))
                }
                _ => None,
            };
            Some(Address::TcpIp { ip, port: tcp.port })
        }
        Wire::UdsAddress(uds) => Some(Address::Unix { path: uds.filename }),
        Wire::OtherAddress(other) => Some(Address::Other { name: other.name }),
    }
}

fn channel_fields(data: Option<proto::ChannelData>) -> (State, String, CallStats, Trace) {
    let data = data.unwrap_or_default();
    let state = data
        .state
        .and_then(|s| proto::channel_connectivity_state::State::try_from(s.state).ok())
        .map(State::from)
        .unwrap_or_default();
    let calls = CallStats {
        started: data.calls_started,
        succeeded: data.calls_succeeded,
        failed: data.calls_failed,
        last_call_started: timestamp(data.last_call_started_timestamp.as_ref()),
    };
    let trace = data.trace.map(Trace::from).unwrap_or_default();
    (state, data.target, calls, trace)
}

impl From<proto::Channel> for ChannelEntity {
    fn from(channel: proto::Channel) -> Self {
        let r = channel.r#ref.unwrap_or_default();
        let (state, target, calls, trace) = channel_fields(channel.data);
        ChannelEntity {
            id: r.channel_id,
            name: r.name,
            state,
            target,
            calls,
            trace,
            channels: channel.channel_ref.into_iter().map(EntityRef::from).collect(),
            subchannels: channel.subchannel_ref.into_iter().map(EntityRef::from).collect(),
            sockets: channel.socket_ref.into_iter().map(EntityRef::from).collect(),
        }
    }
}

impl From<proto::Subchannel> for ChannelEntity {
    fn from(subchannel: proto::Subchannel) -> Self {
        let r = subchannel.r#ref.unwrap_or_default();
        let (state, target, calls, trace) = channel_fields(subchannel.data);
        ChannelEntity {
            id: r.subchannel_id,
            name: r.name,
            state,
            target,
            calls,
            trace,
            channels: subchannel.channel_ref.into_iter().map(EntityRef::from).collect(),
            subchannels: subchannel.subchannel_ref.into_iter().map(EntityRef::from).collect(),
            sockets: subchannel.socket_ref.into_iter().map(EntityRef::from).collect(),
        }
    }
}

impl From<proto::Server> for ServerEntity {
    fn from(server: proto::Server) -> Self {
        let r = server.r#ref.unwrap_or_default();
        let data = server.data.unwrap_or_default();
        ServerEntity {
            id: r.server_id,
            name: r.name,
            calls: CallStats {
                started: data.calls_started,
                succeeded: data.calls_succeeded,
                failed: data.calls_failed,
                last_call_started: timestamp(data.last_call_started_timestamp.as_ref()),
            },
            trace: data.trace.map(Trace::from),
            listen_sockets: server.listen_socket.into_iter().map(EntityRef::from).collect(),
        }
    }
}

impl From<proto::Socket> for SocketEntity {
    fn from(socket: proto::Socket) -> Self {
        let r = socket.r#ref.unwrap_or_default();
        let data = socket.data.unwrap_or_default();
        SocketEntity {
            id: r.socket_id,
            name: r.name,
            local: socket.local.and_then(address),
            remote: socket.remote.and_then(address),
            remote_name: socket.remote_name,
            streams: CallStats {
                started: data.streams_started,
                succeeded: data.streams_succeeded,
                failed: data.streams_failed,
                last_call_started: timestamp(data.last_local_stream_created_timestamp.as_ref()),
            },
            messages_sent: data.messages_sent,
            messages_received: data.messages_received,
            keep_alives_sent: data.keep_alives_sent,
            last_message_sent: timestamp(data.last_message_sent_timestamp.as_ref()),
            last_message_received: timestamp(data.last_message_received_timestamp.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(seconds: i64, nanos: i32) -> Option<prost_types::Timestamp> {
        Some(prost_types::Timestamp { seconds, nanos })
    }

    #[test]
    fn test_missing_timestamp_is_epoch() {
        assert_eq!(timestamp(None), DateTime::<Utc>::default());
        assert_eq!(timestamp(None).timestamp(), 0);
    }

    #[test]
    fn test_timestamp_keeps_nanos() {
        let t = timestamp(ts(1_543_700_000, 123_456_789).as_ref());
        assert_eq!(t.timestamp(), 1_543_700_000);
        assert_eq!(t.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(State::Ready.to_string(), "READY");
        assert_eq!(State::TransientFailure.to_string(), "TRANSIENT_FAILURE");
        assert_eq!(State::default().to_string(), "UNKNOWN");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EntityKind::Subchannel.to_string(), "subchannel");
    }

    #[test]
    fn test_channel_from_wire() {
        let wire = proto::Channel {
            r#ref: Some(proto::ChannelRef {
                channel_id: 4,
                name: "foo4".to_string(),
            }),
            data: Some(proto::ChannelData {
                state: Some(proto::ChannelConnectivityState {
                    state: proto::channel_connectivity_state::State::Connecting as i32,
                }),
                target: "foo4.test.com".to_string(),
                trace: None,
                calls_started: 5,
                calls_succeeded: 3,
                calls_failed: 2,
                last_call_started_timestamp: ts(60, 0),
            }),
            channel_ref: vec![],
            subchannel_ref: vec![proto::SubchannelRef {
                subchannel_id: 9,
                name: "bar9".to_string(),
            }],
            socket_ref: vec![],
        };
        let channel = ChannelEntity::from(wire);
        assert_eq!(channel.id, 4);
        assert_eq!(channel.name, "foo4");
        assert_eq!(channel.state, State::Connecting);
        assert_eq!(channel.calls.started, 5);
        assert_eq!(channel.calls.last_call_started.timestamp(), 60);
        assert_eq!(channel.trace, Trace::default());
        assert_eq!(
            channel.subchannels,
            vec![EntityRef {
                id: 9,
                name: "bar9".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_state_value_falls_back() {
        let wire = proto::Channel {
            data: Some(proto::ChannelData {
                state: Some(proto::ChannelConnectivityState { state: 42 }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(ChannelEntity::from(wire).state, State::Unknown);
    }

    #[test]
    fn test_server_without_data_has_zero_calls() {
        let wire = proto::Server {
            r#ref: Some(proto::ServerRef {
                server_id: 2,
                name: "server2".to_string(),
            }),
            data: None,
            listen_socket: vec![],
        };
        let server = ServerEntity::from(wire);
        assert_eq!(server.calls, CallStats::default());
        assert!(server.trace.is_none());
    }

    #[test]
    fn test_trace_from_wire() {
        let wire = proto::ChannelTrace {
            num_events_logged: 5,
            creation_timestamp: ts(10, 0),
            events: vec![proto::ChannelTraceEvent {
                description: "Channel created".to_string(),
                severity: proto::channel_trace_event::Severity::CtInfo as i32,
                timestamp: ts(10, 0),
                child_ref: None,
            }],
        };
        let trace = Trace::from(wire);
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.events[0].severity, Severity::Info);
        assert_eq!(trace.num_events_dropped(), 4);
    }

    #[test]
    fn test_num_events_dropped_never_negative() {
        let trace = Trace {
            num_events_logged: 0,
            creation_timestamp: DateTime::<Utc>::default(),
            events: vec![TraceEvent {
                description: "x".to_string(),
                severity: Severity::Info,
                timestamp: DateTime::<Utc>::default(),
            }],
        };
        assert_eq!(trace.num_events_dropped(), 0);
    }

    #[test]
    fn test_num_events_dropped_extreme_count() {
        let mut trace = Trace {
            num_events_logged: i64::MIN,
            creation_timestamp: DateTime::<Utc>::default(),
            events: vec![TraceEvent {
                description: "x".to_string(),
                severity: Severity::Info,
                timestamp: DateTime::<Utc>::default(),
            }],
        };
        assert_eq!(trace.num_events_dropped(), 0);

        trace.num_events_logged = i64::MAX;
        assert_eq!(trace.num_events_dropped(), i64::MAX - 1);
    }

    #[test]
    fn test_tcp_address_display() {
        let wire = proto::Address {
            address: Some(proto::address::Address::TcpipAddress(
                proto::address::TcpIpAddress {
                    ip_address: vec![127, 0, 1, 2],
                    port: 9000,
                },
            )),
        };
        let addr = address(wire).unwrap();
        assert_eq!(addr.to_string(), "[127.0.1.2]:9000");
    }

    #[test]
    fn test_ipv6_and_unix_address_display() {
        let v6 = Address::TcpIp {
            ip: Some(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            port: 443,
        };
        assert_eq!(v6.to_string(), "[::1]:443");
        let uds = Address::Unix {
            path: "/tmp/grpc.sock".to_string(),
        };
        assert_eq!(uds.to_string(), "unix:/tmp/grpc.sock");
    }

    #[test]
    fn test_entity_dispatch() {
        let server = ServerEntity {
            id: 3,
            name: "server3".to_string(),
            calls: CallStats {
                started: 7,
                ..Default::default()
            },
            trace: None,
            listen_sockets: vec![],
        };
        let entity = Entity::Server(server);
        assert_eq!(entity.kind(), EntityKind::Server);
        assert_eq!(entity.id(), 3);
        assert_eq!(entity.name(), "server3");
        assert_eq!(entity.calls().started, 7);
    }
}
