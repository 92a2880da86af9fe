//! Describe and list operations over a channelz source.
//!
//! Each operation renders its whole report before writing anything, so a
//! failed fetch never leaves half a report on the terminal. The one
//! exception is a listing that fails part-way: the rows already received are
//! written, then the error is returned.

use std::io::Write;
use std::pin::pin;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;

use channelz_core::{
    channel_pages, server_pages, ChannelEntity, ChannelzError, ChannelzSource, Entity, EntityKind,
    Result,
};

use crate::fetch::{expand, fetch, local_addresses};
use crate::report::{self, ServerRow};
use crate::resolve::resolve;

/// Runs describe and list operations against one source.
pub struct Inspector<'a> {
    source: &'a dyn ChannelzSource,
    page_size: i64,
    /// Reference instant for relative times in list reports
    now: DateTime<Utc>,
}

impl<'a> Inspector<'a> {
    pub fn new(source: &'a dyn ChannelzSource, page_size: i64, now: DateTime<Utc>) -> Self {
        Self {
            source,
            page_size,
            now,
        }
    }

    /// Resolve `identifier` as an entity of `kind` and write its describe report.
    pub async fn describe<W: Write>(
        &self,
        w: &mut W,
        kind: EntityKind,
        identifier: &str,
    ) -> Result<()> {
        let id = resolve(self.source, identifier, kind, self.page_size).await?;
        let rendered = match fetch(self.source, id, kind).await? {
            Entity::Server(server) => report::describe_server(&server),
            Entity::Channel(channel) | Entity::Subchannel(channel) => {
                report::describe_channel(&expand(self.source, kind, channel).await?)
            }
            Entity::Socket(socket) => report::describe_socket(&socket),
        };
        w.write_all(rendered.as_bytes())?;
        Ok(())
    }

    pub async fn describe_server<W: Write>(&self, w: &mut W, identifier: &str) -> Result<()> {
        self.describe(w, EntityKind::Server, identifier).await
    }

    pub async fn describe_channel<W: Write>(&self, w: &mut W, identifier: &str) -> Result<()> {
        self.describe(w, EntityKind::Channel, identifier).await
    }

    /// Write the server list, with each server's listen addresses.
    pub async fn list_servers<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut rows = Vec::new();
        let outcome = async {
            let mut pages = pin!(server_pages(self.source, self.page_size));
            while let Some(page) = pages.try_next().await? {
                for server in page {
                    let local_addrs = local_addresses(self.source, &server).await?;
                    rows.push(ServerRow {
                        server,
                        local_addrs,
                    });
                }
            }
            Ok::<_, ChannelzError>(())
        }
        .await;

        self.finish_list(w, outcome, rows.len(), || {
            report::list_servers(&rows, &self.now)
        })
    }

    /// Write the top-level channel list.
    pub async fn list_channels<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut channels: Vec<ChannelEntity> = Vec::new();
        let outcome = async {
            let mut pages = pin!(channel_pages(self.source, self.page_size));
            while let Some(page) = pages.try_next().await? {
                channels.extend(page);
            }
            Ok::<_, ChannelzError>(())
        }
        .await;

        self.finish_list(w, outcome, channels.len(), || {
            report::list_channels(&channels, &self.now)
        })
    }

    fn finish_list<W: Write>(
        &self,
        w: &mut W,
        outcome: Result<()>,
        received: usize,
        render: impl FnOnce() -> String,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                w.write_all(render().as_bytes())?;
                Ok(())
            }
            Err(e) if received > 0 => {
                tracing::warn!(
                    received,
                    error = %e,
                    "Listing failed part-way, showing partial results"
                );
                w.write_all(render().as_bytes())?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
