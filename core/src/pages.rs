//! Lazy page sequences over the channelz listing operations.
//!
//! A listing is walked with an ascending-ID cursor starting at 0. Each page
//! is fetched only when the consumer asks for it; the sequence ends after a
//! short page, an explicit end-of-listing page, or an empty page.

use futures::future::BoxFuture;
use futures::stream::{self, Stream};

use crate::entity::{ChannelEntity, EntityId, EntityRecord, ServerEntity};
use crate::error::Result;
use crate::source::{ChannelzSource, Page};

/// Build a page sequence from a page-fetching function.
///
/// `fetch(start, page_size)` must return entities with ID >= `start` in
/// ascending order.
pub fn paginate<'a, T, F>(page_size: i64, mut fetch: F) -> impl Stream<Item = Result<Vec<T>>> + 'a
where
    T: EntityRecord + Send + 'a,
    F: FnMut(EntityId, i64) -> BoxFuture<'a, Result<Page<T>>> + 'a,
{
    stream::try_unfold(Some(0), move |cursor: Option<EntityId>| {
        let next = cursor.map(|start| fetch(start, page_size));
        async move {
            let Some(pending) = next else {
                return Ok(None);
            };
            let page = pending.await?;
            if page.items.is_empty() {
                return Ok(None);
            }

            let exhausted = page.end || (page.items.len() as i64) < page_size;
            let cursor = match page.items.last() {
                Some(last) if !exhausted => last.id().checked_add(1),
                _ => None,
            };
            tracing::debug!(items = page.items.len(), exhausted, "Fetched listing page");
            Ok(Some((page.items, cursor)))
        }
    })
}

/// Pages of the server listing.
pub fn server_pages(
    source: &dyn ChannelzSource,
    page_size: i64,
) -> impl Stream<Item = Result<Vec<ServerEntity>>> + '_ {
    paginate(page_size, move |start, max| source.list_servers(start, max))
}

/// Pages of the top-level channel listing.
pub fn channel_pages(
    source: &dyn ChannelzSource,
    page_size: i64,
) -> impl Stream<Item = Result<Vec<ChannelEntity>>> + '_ {
    paginate(page_size, move |start, max| source.list_channels(start, max))
}
