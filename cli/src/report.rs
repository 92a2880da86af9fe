//! Describe and list reports.
//!
//! Describe reports are key/value blocks: consecutive `Label:\tvalue` lines
//! are aligned together and a nested section (`Calls:`, `Trace:`, ...) ends
//! the block. List reports are a single table. Describe shows timestamps
//! absolute; list shows them relative to `now`.

use std::fmt;

use chrono::{DateTime, Utc};

use channelz_core::{
    Address, CallStats, ChannelEntity, EntityRef, ServerEntity, SocketEntity, Trace,
};

use crate::fetch::ChannelDetail;
use crate::output::{format_ago, format_timestamp, TabTable};

const NONE: &str = "<none>";
const INDENT: &str = "  ";

#[derive(Default)]
struct Describe {
    out: String,
    fields: TabTable,
}

impl Describe {
    fn field(&mut self, label: &str, value: impl fmt::Display) -> &mut Self {
        self.fields.add_row([format!("{label}:"), value.to_string()]);
        self
    }

    fn section(&mut self, label: &str, body: impl fmt::Display) -> &mut Self {
        self.flush();
        self.out.push_str(&format!("{label}:\n{body}"));
        self
    }

    /// A nested table, or `<none>` on the label line when there are no rows.
    fn table_or_none(&mut self, label: &str, table: Option<TabTable>) -> &mut Self {
        match table {
            Some(table) => self.section(label, table),
            None => self.field(label, NONE),
        }
    }

    fn flush(&mut self) {
        let fields = std::mem::take(&mut self.fields);
        self.out.push_str(&fields.to_string());
    }

    fn finish(mut self) -> String {
        self.flush();
        self.out
    }
}

fn calls_block(calls: &CallStats) -> TabTable {
    let mut table = TabTable::default().indented(INDENT);
    table.add_row(["Started:".to_string(), calls.started.to_string()]);
    table.add_row(["Succeeded:".to_string(), calls.succeeded.to_string()]);
    table.add_row(["Failed:".to_string(), calls.failed.to_string()]);
    table.add_row([
        "LastCallStarted:".to_string(),
        format_timestamp(&calls.last_call_started),
    ]);
    table
}

fn trace_block(trace: &Trace) -> String {
    let mut table = TabTable::default().indented(INDENT);
    table.add_row(["NumEvents:".to_string(), trace.num_events_logged.to_string()]);
    let dropped = trace.num_events_dropped();
    if dropped > 0 {
        table.add_row(["NumEventsDropped:".to_string(), dropped.to_string()]);
    }
    table.add_row([
        "CreationTimestamp:".to_string(),
        format_timestamp(&trace.creation_timestamp),
    ]);

    let mut out = table.to_string();
    for event in &trace.events {
        out.push_str(&format!(
            "{INDENT}{} {} {}\n",
            format_timestamp(&event.timestamp),
            event.severity,
            event.description
        ));
    }
    out
}

fn channel_table(channels: &[ChannelEntity]) -> Option<TabTable> {
    if channels.is_empty() {
        return None;
    }
    let mut table =
        TabTable::new(&["ID", "Name", "State", "Start", "Succeeded", "Failed"]).indented(INDENT);
    for ch in channels {
        table.add_row([
            ch.id.to_string(),
            ch.name.clone(),
            ch.state.to_string(),
            ch.calls.started.to_string(),
            ch.calls.succeeded.to_string(),
            ch.calls.failed.to_string(),
        ]);
    }
    Some(table)
}

fn ref_table(refs: &[EntityRef]) -> Option<TabTable> {
    if refs.is_empty() {
        return None;
    }
    let mut table = TabTable::new(&["ID", "Name"]).indented(INDENT);
    for r in refs {
        table.add_row([r.id.to_string(), r.name.clone()]);
    }
    Some(table)
}

fn address_or_none(addr: &Option<Address>) -> String {
    addr.as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| NONE.to_string())
}

/// Describe report for a server.
pub fn describe_server(server: &ServerEntity) -> String {
    let mut d = Describe::default();
    d.field("ID", server.id).field("Name", &server.name);
    d.section("Calls", calls_block(&server.calls));
    if let Some(trace) = &server.trace {
        d.section("Trace", trace_block(trace));
    }
    d.finish()
}

/// Describe report for a channel or subchannel with its expanded children.
pub fn describe_channel(detail: &ChannelDetail) -> String {
    let ch = &detail.channel;
    let mut d = Describe::default();
    d.field("ID", ch.id)
        .field("Name", &ch.name)
        .field("State", ch.state)
        .field("Target", &ch.target);
    d.section("Calls", calls_block(&ch.calls));
    d.table_or_none("Socket", ref_table(&ch.sockets))
        .table_or_none("Channels", channel_table(&detail.channels))
        .table_or_none("Subchannels", channel_table(&detail.subchannels));
    d.section("Trace", trace_block(&ch.trace));
    d.finish()
}

/// Describe report for a socket.
pub fn describe_socket(socket: &SocketEntity) -> String {
    let mut d = Describe::default();
    d.field("ID", socket.id)
        .field("Name", &socket.name)
        .field("Local", address_or_none(&socket.local))
        .field("Remote", address_or_none(&socket.remote));
    if !socket.remote_name.is_empty() {
        d.field("RemoteName", &socket.remote_name);
    }

    let mut streams = TabTable::default().indented(INDENT);
    streams.add_row(["Started:".to_string(), socket.streams.started.to_string()]);
    streams.add_row(["Succeeded:".to_string(), socket.streams.succeeded.to_string()]);
    streams.add_row(["Failed:".to_string(), socket.streams.failed.to_string()]);
    streams.add_row([
        "LastCreated:".to_string(),
        format_timestamp(&socket.streams.last_call_started),
    ]);
    d.section("Streams", streams);

    let mut messages = TabTable::default().indented(INDENT);
    messages.add_row(["Sent:".to_string(), socket.messages_sent.to_string()]);
    messages.add_row(["Received:".to_string(), socket.messages_received.to_string()]);
    messages.add_row([
        "LastSent:".to_string(),
        format_timestamp(&socket.last_message_sent),
    ]);
    messages.add_row([
        "LastReceived:".to_string(),
        format_timestamp(&socket.last_message_received),
    ]);
    d.section("Messages", messages);

    d.field("KeepAlivesSent", socket.keep_alives_sent);
    d.finish()
}

/// A server row of the server list, with its listen addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRow {
    pub server: ServerEntity,
    pub local_addrs: Vec<Address>,
}

/// List report for servers.
pub fn list_servers(rows: &[ServerRow], now: &DateTime<Utc>) -> String {
    let mut table = TabTable::new(&[
        "ID", "Name", "LocalAddr", "Calls", "Success", "Fail", "LastCall",
    ]);
    for row in rows {
        let s = &row.server;
        let addrs: Vec<String> = row.local_addrs.iter().map(ToString::to_string).collect();
        table.add_row([
            s.id.to_string(),
            s.name.clone(),
            addrs.join(","),
            s.calls.started.to_string(),
            s.calls.succeeded.to_string(),
            s.calls.failed.to_string(),
            format_ago(&s.calls.last_call_started, now),
        ]);
    }
    table.to_string()
}

/// List report for top-level channels.
pub fn list_channels(channels: &[ChannelEntity], now: &DateTime<Utc>) -> String {
    let mut table = TabTable::new(&[
        "ID",
        "Name",
        "State",
        "Channel",
        "SubChannel",
        "Calls",
        "Success",
        "Fail",
        "LastCall",
    ]);
    for ch in channels {
        table.add_row([
            ch.id.to_string(),
            ch.name.clone(),
            ch.state.to_string(),
            ch.channels.len().to_string(),
            ch.subchannels.len().to_string(),
            ch.calls.started.to_string(),
            ch.calls.succeeded.to_string(),
            ch.calls.failed.to_string(),
            format_ago(&ch.calls.last_call_started, now),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use channelz_core::{Severity, State, TraceEvent};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 12, 1, 21, 33, 20).unwrap() + Duration::nanoseconds(123_456_789)
    }

    fn calls(started: i64, last: DateTime<Utc>) -> CallStats {
        CallStats {
            started,
            succeeded: started * 9 / 10,
            failed: started / 10,
            last_call_started: last,
        }
    }

    fn make_channel(id: i64, name: &str, started: i64) -> ChannelEntity {
        ChannelEntity {
            id,
            name: name.to_string(),
            state: State::Ready,
            target: format!("{name}.test.com"),
            calls: calls(started, now()),
            trace: Trace::default(),
            channels: vec![],
            subchannels: vec![],
            sockets: vec![],
        }
    }

    #[test]
    fn test_describe_server() {
        let server = ServerEntity {
            id: 0,
            name: "server0".to_string(),
            calls: calls(100, DateTime::<Utc>::default()),
            trace: None,
            listen_sockets: vec![],
        };
        assert_eq!(
            describe_server(&server),
            "ID:  \t0\n\
             Name:\tserver0\n\
             Calls:\n\
             \x20 Started:        \t100\n\
             \x20 Succeeded:      \t90\n\
             \x20 Failed:         \t10\n\
             \x20 LastCallStarted:\t1970-01-01 00:00:00 +0000 UTC\n"
        );
    }

    #[test]
    fn test_describe_server_with_trace() {
        let server = ServerEntity {
            id: 1,
            name: "server1".to_string(),
            calls: calls(0, DateTime::<Utc>::default()),
            trace: Some(Trace {
                num_events_logged: 1,
                creation_timestamp: now(),
                events: vec![TraceEvent {
                    description: "Server created".to_string(),
                    severity: Severity::Info,
                    timestamp: now(),
                }],
            }),
            listen_sockets: vec![],
        };
        let report = describe_server(&server);
        assert!(report.contains(
            "Trace:\n  NumEvents:        \t1\n  CreationTimestamp:\t2018-12-01 21:33:20.123456789 +0000 UTC\n"
        ));
        assert!(report
            .ends_with("  2018-12-01 21:33:20.123456789 +0000 UTC INFO Server created\n"));
    }

    #[test]
    fn test_describe_channel_without_children() {
        let detail = ChannelDetail {
            channel: make_channel(0, "foo0", 100),
            channels: vec![],
            subchannels: vec![],
        };
        assert_eq!(
            describe_channel(&detail),
            "ID:    \t0\n\
             Name:  \tfoo0\n\
             State: \tREADY\n\
             Target:\tfoo0.test.com\n\
             Calls:\n\
             \x20 Started:        \t100\n\
             \x20 Succeeded:      \t90\n\
             \x20 Failed:         \t10\n\
             \x20 LastCallStarted:\t2018-12-01 21:33:20.123456789 +0000 UTC\n\
             Socket:     \t<none>\n\
             Channels:   \t<none>\n\
             Subchannels:\t<none>\n\
             Trace:\n\
             \x20 NumEvents:        \t0\n\
             \x20 CreationTimestamp:\t1970-01-01 00:00:00 +0000 UTC\n"
        );
    }

    #[test]
    fn test_describe_channel_with_children() {
        let mut channel = make_channel(1, "foo1", 110);
        channel.sockets = vec![EntityRef {
            id: 20,
            name: "sock20".to_string(),
        }];
        let detail = ChannelDetail {
            channel,
            channels: vec![],
            subchannels: vec![make_channel(1, "bar1", 110), make_channel(2, "bar2", 120)],
        };
        let report = describe_channel(&detail);
        assert!(report.contains("Socket:\n  ID\tName\n  20\tsock20\nChannels:\t<none>\n"));
        assert!(report.contains(
            "Subchannels:\n\
             \x20 ID\tName\tState\tStart\tSucceeded\tFailed\n\
             \x20 1 \tbar1\tREADY\t110  \t99       \t11\n\
             \x20 2 \tbar2\tREADY\t120  \t108      \t12\n\
             Trace:\n"
        ));
    }

    #[test]
    fn test_describe_trace_reports_dropped_events() {
        let mut channel = make_channel(0, "foo0", 0);
        channel.trace = Trace {
            num_events_logged: 7,
            creation_timestamp: DateTime::<Utc>::default(),
            events: vec![TraceEvent {
                description: "Resolution failed".to_string(),
                severity: Severity::Error,
                timestamp: DateTime::<Utc>::default(),
            }],
        };
        let report = describe_channel(&ChannelDetail {
            channel,
            channels: vec![],
            subchannels: vec![],
        });
        assert!(report.contains("  NumEventsDropped: \t6\n"));
        assert!(report.ends_with("  1970-01-01 00:00:00 +0000 UTC ERROR Resolution failed\n"));
    }

    #[test]
    fn test_describe_socket() {
        let socket = SocketEntity {
            id: 9,
            name: "sock9".to_string(),
            local: Some(Address::Unix {
                path: "/tmp/s.sock".to_string(),
            }),
            remote: None,
            remote_name: String::new(),
            streams: calls(3, DateTime::<Utc>::default()),
            messages_sent: 12,
            messages_received: 11,
            keep_alives_sent: 2,
            last_message_sent: DateTime::<Utc>::default(),
            last_message_received: DateTime::<Utc>::default(),
        };
        let report = describe_socket(&socket);
        assert!(report.starts_with(
            "ID:    \t9\nName:  \tsock9\nLocal: \tunix:/tmp/s.sock\nRemote:\t<none>\nStreams:\n"
        ));
        assert!(report.contains("  Sent:        \t12\n"));
        assert!(report.ends_with("KeepAlivesSent:\t2\n"));
    }

    #[test]
    fn test_list_servers_relative_last_call() {
        let rows = vec![
            ServerRow {
                server: ServerEntity {
                    id: 0,
                    name: "server0".to_string(),
                    calls: calls(100, DateTime::<Utc>::default()),
                    trace: None,
                    listen_sockets: vec![],
                },
                local_addrs: vec![],
            },
            ServerRow {
                server: ServerEntity {
                    id: 1,
                    name: "server1".to_string(),
                    calls: calls(110, now()),
                    trace: None,
                    listen_sockets: vec![],
                },
                local_addrs: vec![],
            },
        ];
        assert_eq!(
            list_servers(&rows, &now()),
            "ID\tName   \tLocalAddr\tCalls\tSuccess\tFail\tLastCall\n\
             0 \tserver0\t         \t100  \t90     \t10  \t17866d\n\
             1 \tserver1\t         \t110  \t99     \t11  \t0ms\n"
        );
    }

    #[test]
    fn test_list_channels_counts_children() {
        let mut foo0 = make_channel(0, "foo0", 100);
        foo0.subchannels = vec![EntityRef {
            id: 0,
            name: "bar0".to_string(),
        }];
        let report = list_channels(&[foo0], &now());
        assert_eq!(
            report,
            "ID\tName\tState\tChannel\tSubChannel\tCalls\tSuccess\tFail\tLastCall\n\
             0 \tfoo0\tREADY\t0      \t1         \t100  \t90     \t10  \t0ms\n"
        );
    }

    #[test]
    fn test_list_empty_has_header_only() {
        assert_eq!(
            list_channels(&[], &now()),
            "ID\tName\tState\tChannel\tSubChannel\tCalls\tSuccess\tFail\tLastCall\n"
        );
    }
}
