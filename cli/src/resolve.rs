//! Identifier resolution for channelz entities.
//!
//! Resolution order: decimal ID (trusted, no RPC) -> exact name, scanning the
//! listing of the requested kind page by page in ascending-ID order.

use std::pin::pin;

use futures::{Stream, TryStreamExt};

use channelz_core::{
    channel_pages, server_pages, ChannelzError, ChannelzSource, EntityId, EntityKind,
    EntityRecord, Result,
};

/// Resolve an identifier to the ID of an entity of `kind`.
///
/// 1. A decimal integer is returned as is. Whether it exists is left to the
///    detail fetch.
/// 2. Anything else is matched against entity names (exact, case-sensitive).
///    The first match in ascending-ID order wins and scanning stops there.
pub async fn resolve(
    source: &dyn ChannelzSource,
    identifier: &str,
    kind: EntityKind,
    page_size: i64,
) -> Result<EntityId> {
    if identifier.is_empty() {
        return Err(invalid(kind, identifier, "identifier is empty"));
    }

    if identifier.bytes().all(|b| b.is_ascii_digit()) {
        return identifier
            .parse::<EntityId>()
            .map_err(|_| invalid(kind, identifier, "ID is out of range"));
    }

    match kind {
        EntityKind::Server => {
            find_by_name(server_pages(source, page_size), identifier, kind).await
        }
        EntityKind::Channel => {
            find_by_name(channel_pages(source, page_size), identifier, kind).await
        }
        // No listing exists for these kinds.
        EntityKind::Subchannel | EntityKind::Socket => Err(invalid(
            kind,
            identifier,
            &format!("{kind}s can only be addressed by ID"),
        )),
    }
}

async fn find_by_name<T, S>(pages: S, name: &str, kind: EntityKind) -> Result<EntityId>
where
    T: EntityRecord,
    S: Stream<Item = Result<Vec<T>>>,
{
    let mut pages = pin!(pages);
    let mut scanned = 0;

    while let Some(page) = pages.try_next().await? {
        scanned += page.len();
        if let Some(found) = page.iter().find(|e| e.name() == name) {
            tracing::debug!(%kind, name, id = found.id(), scanned, "Resolved name");
            return Ok(found.id());
        }
    }

    tracing::debug!(%kind, name, scanned, "Name not found in listing");
    Err(ChannelzError::NotFound {
        kind,
        identifier: name.to_string(),
    })
}

fn invalid(kind: EntityKind, identifier: &str, reason: &str) -> ChannelzError {
    ChannelzError::InvalidInput {
        kind,
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    }
}
