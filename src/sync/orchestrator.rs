use tracing::{debug, error, info, warn};

use crate::device::{CatalogHandle, DeviceError};
use crate::library::MediaLibrary;
use crate::library::query;

use super::importer::import;
use super::transcode::TranscodeGate;
use super::writer::{ClearReport, DeviceWriter};
use super::{BatchError, QueryError, SyncError};

enum BatchState {
    /// Syncing the id at this index.
    Processing(usize),
    Committing,
    RollingBack(SyncError),
}

/// Everything a sync needs: the media library, the transcode gate and the
/// device. Operations must not run concurrently against one `Syncer`.
pub struct Syncer {
    library: Box<dyn MediaLibrary>,
    gate: TranscodeGate,
    writer: DeviceWriter,
}

impl Syncer {
    pub fn new(library: Box<dyn MediaLibrary>, gate: TranscodeGate, writer: DeviceWriter) -> Self {
        Self {
            library,
            gate,
            writer,
        }
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &DeviceWriter {
        &self.writer
    }

    /// Sync `ids` in order, all or nothing.
    ///
    /// On success the catalog has been written once and the number of
    /// synced tracks is returned. On failure every track this call added is
    /// removed again and the first error is reported. Duplicate ids are
    /// synced as separate tracks.
    pub fn sync_batch(&mut self, ids: &[i32]) -> Result<usize, BatchError> {
        if ids.is_empty() {
            debug!("empty batch, nothing to sync");
            return Ok(0);
        }

        let mut undo: Vec<CatalogHandle> = Vec::with_capacity(ids.len());
        let mut state = BatchState::Processing(0);

        loop {
            state = match state {
                BatchState::Processing(i) => match ids.get(i) {
                    Some(&id) => match self.sync_track(id) {
                        Ok(handle) => {
                            undo.push(handle);
                            BatchState::Processing(i + 1)
                        }
                        Err(e) => BatchState::RollingBack(e),
                    },
                    None => BatchState::Committing,
                },
                BatchState::Committing => match self.writer.persist() {
                    Ok(()) => {
                        info!(tracks = undo.len(), "batch synced");
                        return Ok(undo.len());
                    }
                    Err(e) => BatchState::RollingBack(SyncError::CatalogPersistFailed(e)),
                },
                BatchState::RollingBack(root) => {
                    error!(undo = undo.len(), "{root}, rolling back");
                    let rolled_back = undo.len();
                    // Newest first, so the id counter ends where it started.
                    for handle in undo.drain(..).rev() {
                        self.writer.remove(handle);
                    }
                    debug_assert!(self.writer.catalog().is_consistent());
                    return Err(BatchError { root, rolled_back });
                }
            };
        }
    }

    /// Import, convert, register and copy one track. When this fails the
    /// catalog holds nothing from it.
    fn sync_track(&mut self, id: i32) -> Result<CatalogHandle, SyncError> {
        let track = import(self.library.as_ref(), id)?;
        info!("Syncing track {} by {}", track.title, track.artist);

        let source = self.gate.normalize(&track.source)?;
        debug!(path = %source.path().display(), temporary = source.is_temporary(), "copying");
        let handle = self.writer.register(track);

        if let Err(e) = self.writer.materialize(handle, source.path()) {
            self.writer.remove(handle);
            return Err(e);
        }
        drop(source);

        self.writer.narrate(handle);
        Ok(handle)
    }

    /// Parse a collection query, resolve it through the media library and
    /// sync the result. A bad query never reaches the library.
    pub fn run_query(&mut self, query: &str) -> Result<usize, QueryError> {
        let collection = query::parse(query)?;
        debug!(%collection, "parsed query");

        let ids = self
            .library
            .query_ids(&collection)
            .map_err(QueryError::Collection)?;
        info!(tracks = ids.len(), "resolved collection");

        Ok(self.sync_batch(&ids)?)
    }

    /// Remove every track from the device, keeping the playlists.
    pub fn clear_all(&mut self) -> Result<ClearReport, DeviceError> {
        let report = self.writer.clear_all()?;
        if report.is_complete() {
            info!(tracks = report.removed, "cleared device");
        } else {
            warn!(
                tracks = report.removed,
                leftover = report.leftover_files.len(),
                "cleared catalog, but some track files are still on the device"
            );
        }
        Ok(report)
    }
}
