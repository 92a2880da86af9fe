//! Channelz CLI - describe and list channelz entities of a running gRPC process.

pub mod commands;
pub mod fetch;
pub mod inspect;
pub mod output;
pub mod report;
pub mod resolve;
