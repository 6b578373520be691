//! The device catalog library: the on-device database and file storage.
//!
//! The sync code only talks to the device through [`DeviceDatabase`].
//! [`MountedDevice`] implements it for a player mounted as a filesystem.

mod catalog;
mod mounted;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use catalog::{Catalog, CatalogHandle, TrackDescriptor};
pub use mounted::MountedDevice;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{} is not a mounted device", .0.display())]
    NotMounted(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse device database {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("can't serialize device database: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no track {0} in the catalog")]
    UnknownTrack(CatalogHandle),
    #[error("no free file name left in {}", .0.display())]
    StorageFull(PathBuf),
}

impl DeviceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Access to a device's catalog and storage.
///
/// Catalog edits are in memory only; nothing reaches the device database
/// until [`DeviceDatabase::write`] succeeds.
pub trait DeviceDatabase: Send + Sync {
    /// Root directory of the device.
    fn mountpoint(&self) -> &Path;

    fn catalog(&self) -> &Catalog;

    fn catalog_mut(&mut self) -> &mut Catalog;

    /// Copy `source` into device storage and bind the stored file to the
    /// track behind `handle`.
    fn copy_track(&mut self, handle: CatalogHandle, source: &Path) -> Result<(), DeviceError>;

    /// Persist the catalog to the device.
    fn write(&mut self) -> Result<(), DeviceError>;

    /// Absolute path of the file bound to `handle`, if one was copied.
    fn file_on_device(&self, handle: CatalogHandle) -> Option<PathBuf> {
        let track = self.catalog().track(handle)?;
        let relative = track.device_path.as_deref()?;
        Some(
            relative
                .split('/')
                .fold(self.mountpoint().to_path_buf(), |path, part| path.join(part)),
        )
    }
}

/// Directory holding the player's control files.
pub fn control_dir(mountpoint: &Path) -> PathBuf {
    mountpoint.join("iPod_Control")
}
