use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lofty::file::AudioFile;
use rand::Rng;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::catalog::{Catalog, CatalogHandle};
use super::{DeviceDatabase, DeviceError, control_dir};

/// Give up looking for an unused storage name after this many tries.
const NAME_ATTEMPTS: usize = 64;

/// A player mounted as a plain filesystem.
///
/// Layout under the mountpoint:
/// - `iPod_Control/iTunes/podsync.toml`: the catalog
/// - `iPod_Control/Music/Fnn/XXXX.ext`: stored tracks
pub struct MountedDevice {
    mountpoint: PathBuf,
    catalog: Catalog,
    music_folders: u32,
}

impl MountedDevice {
    /// Load the catalog of the device mounted at `mountpoint`. A device
    /// without a catalog yet starts out empty; missing storage folders are
    /// created.
    pub fn open(mountpoint: &Path, music_folders: u32) -> Result<Self, DeviceError> {
        if !mountpoint.is_dir() {
            return Err(DeviceError::NotMounted(mountpoint.to_path_buf()));
        }

        let path = database_path(mountpoint);
        let catalog = match fs::read_to_string(&path) {
            Ok(text) => {
                let mut catalog: Catalog = toml::from_str(&text).map_err(|source| DeviceError::Parse {
                    path: path.clone(),
                    source,
                })?;
                catalog.normalize();
                catalog
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no device database yet, starting empty");
                Catalog::new()
            }
            Err(e) => return Err(DeviceError::io(&path, e)),
        };

        let music_folders = music_folders.max(1);
        prepare_storage(mountpoint, music_folders)?;

        info!(
            tracks = catalog.tracks().len(),
            playlists = catalog.playlists().len(),
            "opened device at {}",
            mountpoint.display()
        );

        Ok(Self {
            mountpoint: mountpoint.to_path_buf(),
            catalog,
            music_folders,
        })
    }

    /// Pick an unused storage location. Returns the mountpoint-relative
    /// name and the absolute path.
    fn allocate(&self, extension: &str) -> Result<(String, PathBuf), DeviceError> {
        let music = music_dir(&self.mountpoint);
        let mut rng = rand::rng();

        for _ in 0..NAME_ATTEMPTS {
            let folder = format!("F{:02}", rng.random_range(0..self.music_folders));
            let name: String = (0..4)
                .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
                .collect();
            let file_name = if extension.is_empty() {
                name
            } else {
                format!("{name}.{extension}")
            };

            let path = music.join(&folder).join(&file_name);
            if !path.exists() {
                return Ok((format!("iPod_Control/Music/{folder}/{file_name}"), path));
            }
        }

        Err(DeviceError::StorageFull(music))
    }
}

fn music_dir(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("Music")
}

/// Create the `F00..Fnn` storage folders an initialised device has. Copies
/// only ever add files to them.
fn prepare_storage(mountpoint: &Path, folders: u32) -> Result<(), DeviceError> {
    let music = music_dir(mountpoint);
    for n in 0..folders {
        let folder = music.join(format!("F{n:02}"));
        fs::create_dir_all(&folder).map_err(|e| DeviceError::io(&folder, e))?;
    }
    Ok(())
}

fn database_path(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("iTunes").join("podsync.toml")
}

struct Probe {
    duration: i64,
    bitrate: Option<i64>,
}

fn probe(path: &Path) -> Option<Probe> {
    let tagged = lofty::read_from_path(path).ok()?;
    let properties = tagged.properties();
    Some(Probe {
        duration: i64::try_from(properties.duration().as_millis()).unwrap_or(i64::MAX),
        bitrate: properties.audio_bitrate().map(i64::from),
    })
}

impl DeviceDatabase for MountedDevice {
    fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    fn copy_track(&mut self, handle: CatalogHandle, source: &Path) -> Result<(), DeviceError> {
        if self.catalog.track(handle).is_none() {
            return Err(DeviceError::UnknownTrack(handle));
        }

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let (relative, dest) = self.allocate(&extension)?;

        let copied = match fs::copy(source, &dest) {
            Ok(n) => n,
            Err(e) => {
                // don't leave a truncated file behind
                let _ = fs::remove_file(&dest);
                return Err(DeviceError::io(source, e));
            }
        };

        let track = self
            .catalog
            .track_mut(handle)
            .ok_or(DeviceError::UnknownTrack(handle))?;
        debug!(from = %source.display(), to = %relative, bytes = copied, "copied track");

        track.device_path = Some(relative);
        if track.size <= 0 {
            track.size = i64::try_from(copied).unwrap_or(i64::MAX);
        }
        if track.duration <= 0 || track.bitrate <= 0 {
            if let Some(probe) = probe(&dest) {
                if track.duration <= 0 {
                    track.duration = probe.duration;
                }
                if track.bitrate <= 0 {
                    track.bitrate = probe.bitrate.unwrap_or_default();
                }
            }
        }

        Ok(())
    }

    fn write(&mut self) -> Result<(), DeviceError> {
        let path = database_path(&self.mountpoint);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.mountpoint.clone());
        fs::create_dir_all(&dir).map_err(|e| DeviceError::io(&dir, e))?;

        let text = toml::to_string(&self.catalog)?;

        // Written next to the target, then renamed over it.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| DeviceError::io(&dir, e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| DeviceError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| DeviceError::io(&path, e.error))?;

        info!(tracks = self.catalog.tracks().len(), "wrote device database");
        Ok(())
    }
}
