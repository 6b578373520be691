use std::path::PathBuf;

use thiserror::Error;

use crate::device::DeviceError;
use crate::library::query::ParseError;
use crate::library::{LibraryError, TrackId};

use super::transcode::TranscodeError;

/// Why a single track could not be synced. The first one hit in a batch
/// becomes the root cause of the [`BatchError`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid track id {0}")]
    InvalidIdentifier(i32),
    #[error("can't fetch metadata of track {id}: {source}")]
    MetadataFetchFailed {
        id: TrackId,
        #[source]
        source: LibraryError,
    },
    #[error("can't determine path for track {id}: {reason}")]
    PathResolutionFailed { id: TrackId, reason: String },
    #[error("can't transcode {}: {source}", .path.display())]
    TranscodeFailed {
        path: PathBuf,
        #[source]
        source: TranscodeError,
    },
    #[error("can't copy \"{title}\" to the device: {source}")]
    DeviceCopyFailed {
        title: String,
        #[source]
        source: DeviceError,
    },
    #[error("can't write the device database: {0}")]
    CatalogPersistFailed(#[source] DeviceError),
}

/// A failed batch, after everything it added has been undone.
#[derive(Debug, Error)]
#[error("sync failed: {root}")]
pub struct BatchError {
    /// The first failure of the batch.
    pub root: SyncError,
    /// Tracks that had been synced and were removed again.
    pub rolled_back: usize,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to parse query: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to get collection: {0}")]
    Collection(#[source] LibraryError),
    #[error(transparent)]
    Sync(#[from] BatchError),
}
