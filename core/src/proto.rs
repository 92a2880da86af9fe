//! `grpc.channelz.v1` messages and client, compiled from
//! `proto/channelz.proto` by `build.rs`.
//!
//! Only the client half of the service is generated; the inspector never
//! serves channelz itself.

#![allow(clippy::derive_partial_eq_without_eq)]

tonic::include_proto!("grpc.channelz.v1");
