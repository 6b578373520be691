use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::device::{Catalog, CatalogHandle, DeviceDatabase, DeviceError, TrackDescriptor};
use crate::narration::Narrator;

use super::SyncError;

/// What [`DeviceWriter::remove`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The handle was not in the catalog.
    Absent,
    Removed,
    /// Removed from the catalog, but the stored file could not be deleted.
    FileLeft(PathBuf),
}

/// Outcome of [`DeviceWriter::clear_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub removed: usize,
    /// Stored files that are still on the device.
    pub leftover_files: Vec<PathBuf>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.leftover_files.is_empty()
    }
}

/// Applies catalog and storage changes to the device.
///
/// Nothing is written to the device database except by [`Self::persist`]
/// and [`Self::clear_all`].
pub struct DeviceWriter {
    device: Box<dyn DeviceDatabase>,
    narrator: Box<dyn Narrator>,
}

impl DeviceWriter {
    pub fn new(device: Box<dyn DeviceDatabase>, narrator: Box<dyn Narrator>) -> Self {
        Self { device, narrator }
    }

    pub fn catalog(&self) -> &Catalog {
        self.device.catalog()
    }

    #[cfg(test)]
    pub(crate) fn device(&self) -> &dyn DeviceDatabase {
        self.device.as_ref()
    }

    /// Add a track to the catalog and its master playlist. In memory only.
    pub fn register(&mut self, track: TrackDescriptor) -> CatalogHandle {
        self.device.catalog_mut().add_track(track)
    }

    /// Copy `path` into device storage for a registered track. On failure
    /// the track stays registered.
    pub fn materialize(&mut self, handle: CatalogHandle, path: &Path) -> Result<(), SyncError> {
        self.device
            .copy_track(handle, path)
            .map_err(|source| SyncError::DeviceCopyFailed {
                title: self
                    .device
                    .catalog()
                    .track(handle)
                    .map(|t| t.title.clone())
                    .unwrap_or_default(),
                source,
            })
    }

    /// Generate the spoken clip of a materialized track. Failures are only
    /// logged.
    pub fn narrate(&self, handle: CatalogHandle) {
        let Some(track) = self.device.catalog().track(handle) else {
            return;
        };
        if let Err(e) = self.narrator.narrate(track) {
            warn!(track = %track.title, "can't narrate track: {e}");
        }
    }

    /// Take a track out of every playlist and the track list, then delete
    /// its stored file and spoken clip. Never fails; a file that can't be
    /// deleted is reported back.
    pub fn remove(&mut self, handle: CatalogHandle) -> Removal {
        let file = self.device.file_on_device(handle);

        let Some(track) = self.device.catalog_mut().remove_track(handle) else {
            debug!(%handle, "track already gone");
            return Removal::Absent;
        };
        info!("Deleting track {}", track.title);
        self.narrator.discard(&track);

        let Some(file) = file else {
            return Removal::Removed;
        };
        match fs::remove_file(&file) {
            Ok(()) => Removal::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Removal::Removed,
            Err(e) => {
                warn!(path = %file.display(), "can't delete track file: {e}");
                Removal::FileLeft(file)
            }
        }
    }

    /// Write the catalog to the device.
    pub fn persist(&mut self) -> Result<(), DeviceError> {
        self.device.write()
    }

    /// Remove every track, keeping the playlists, then write the catalog.
    /// Only the final write can fail.
    pub fn clear_all(&mut self) -> Result<ClearReport, DeviceError> {
        let mut report = ClearReport::default();

        for handle in self.device.catalog().handles() {
            match self.remove(handle) {
                Removal::Absent => {}
                Removal::Removed => report.removed += 1,
                Removal::FileLeft(file) => {
                    report.removed += 1;
                    report.leftover_files.push(file);
                }
            }
        }

        self.persist()?;
        Ok(report)
    }
}
