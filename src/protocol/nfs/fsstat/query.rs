use tracing::debug;

use crate::cache::{Attributes, DynamicFsInfo, EntryRef, StorageError};

use super::{FailureReason, NfsVersion, State};

/// What the encoders need from the cache for one request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Statistics {
    pub info: DynamicFsInfo,
    /// Only fetched for version 3 replies.
    pub attributes: Option<Attributes>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryFailure {
    /// The query that failed, [`State::StatQuerying`] or [`State::AttrQuerying`].
    pub stage: State,
    pub reason: FailureReason,
    pub error: StorageError,
}

/// An entry that vanished under a held reference is reported like a stale
/// handle; anything else is the `unavailable` reason of the failed query.
fn classify(error: &StorageError, unavailable: FailureReason) -> FailureReason {
    match error {
        StorageError::NotFound | StorageError::Stale => FailureReason::StaleHandle,
        StorageError::Unavailable(_) => unavailable,
    }
}

/// Reads the usage figures of `entry` and, for version 3, its attributes.
///
/// The first failing query ends the request; the attribute query is not
/// attempted after a failed usage query.
pub async fn query_statistics(
    entry: &EntryRef<'_>,
    version: NfsVersion,
) -> Result<Statistics, QueryFailure> {
    let info = entry.statfs().await.map_err(|error| {
        debug!("statfs of {:?} failed: {}", entry, error);
        let reason = classify(&error, FailureReason::StorageUnavailable);
        QueryFailure { stage: State::StatQuerying, reason, error }
    })?;

    let attributes = match version {
        NfsVersion::V2 => None,
        NfsVersion::V3 => Some(entry.getattr().await.map_err(|error| {
            debug!("getattr of {:?} failed: {}", entry, error);
            let reason = classify(&error, FailureReason::AttributeUnavailable);
            QueryFailure { stage: State::AttrQuerying, reason, error }
        })?),
    };

    Ok(Statistics { info, attributes })
}
