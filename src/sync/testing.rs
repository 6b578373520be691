//! Fake collaborators for exercising a [`Syncer`] without D-Bus, a real
//! transcoder or a real player.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::{TempDir, tempdir};
use walkdir::WalkDir;

use crate::device::{Catalog, CatalogHandle, DeviceDatabase, DeviceError, MountedDevice};
use crate::library::query::Collection;
use crate::library::{LibraryError, MediaLibrary, TrackId, TrackProperties};
use crate::narration::{NarrationError, Narrator};

use super::{DeviceWriter, Syncer, TranscodeError, TranscodeGate, Transcoder};

/// How often each collaborator was called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    pub get_info: usize,
    pub query_ids: usize,
    pub transcodes: usize,
    pub copies: usize,
    pub writes: usize,
    pub narrations: usize,
    pub discards: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<Counts>>);

impl Calls {
    pub fn snapshot(&self) -> Counts {
        self.0.lock().unwrap().clone()
    }

    fn bump(&self, f: impl FnOnce(&mut Counts)) {
        f(&mut self.0.lock().unwrap());
    }
}

pub struct FakeLibrary {
    tracks: HashMap<i32, TrackProperties>,
    query_result: Option<Vec<i32>>,
    calls: Calls,
}

impl MediaLibrary for FakeLibrary {
    fn query_ids(&self, _collection: &Collection) -> Result<Vec<i32>, LibraryError> {
        self.calls.bump(|c| c.query_ids += 1);
        self.query_result
            .clone()
            .ok_or_else(|| LibraryError::Request(zbus::Error::Failure("no such collection".into())))
    }

    fn get_info(&self, id: TrackId) -> Result<TrackProperties, LibraryError> {
        self.calls.bump(|c| c.get_info += 1);
        self.tracks
            .get(&id.get())
            .cloned()
            .ok_or(LibraryError::UnknownTrack(id))
    }
}

/// A [`MountedDevice`] that counts calls and fails on request.
pub struct FakeDevice {
    inner: MountedDevice,
    calls: Calls,
    fail_copy_of: Option<String>,
    fail_write: bool,
}

impl DeviceDatabase for FakeDevice {
    fn mountpoint(&self) -> &Path {
        self.inner.mountpoint()
    }

    fn catalog(&self) -> &Catalog {
        self.inner.catalog()
    }

    fn catalog_mut(&mut self) -> &mut Catalog {
        self.inner.catalog_mut()
    }

    fn copy_track(&mut self, handle: CatalogHandle, source: &Path) -> Result<(), DeviceError> {
        self.calls.bump(|c| c.copies += 1);
        let title = self.catalog().track(handle).map(|t| t.title.clone());
        if title.is_some() && title == self.fail_copy_of {
            return Err(DeviceError::StorageFull(self.mountpoint().to_path_buf()));
        }
        self.inner.copy_track(handle, source)
    }

    fn write(&mut self) -> Result<(), DeviceError> {
        self.calls.bump(|c| c.writes += 1);
        if self.fail_write {
            return Err(DeviceError::io(
                self.mountpoint(),
                std::io::Error::other("read-only filesystem"),
            ));
        }
        self.inner.write()
    }
}

/// Writes an `.mp3` next to nothing in particular and remembers it.
pub struct FakeTranscoder {
    out_dir: PathBuf,
    produced: Arc<Mutex<Vec<PathBuf>>>,
    calls: Calls,
    fail: bool,
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, source: &Path) -> Result<PathBuf, TranscodeError> {
        self.calls.bump(|c| c.transcodes += 1);
        if self.fail {
            return Err(TranscodeError::NoOutput);
        }
        let mut produced = self.produced.lock().unwrap();
        let stem = source.file_stem().unwrap().to_string_lossy();
        let out = self.out_dir.join(format!("{stem}-{}.mp3", produced.len()));
        fs::write(&out, fs::read(source).unwrap()).unwrap();
        produced.push(out.clone());
        Ok(out)
    }
}

pub struct FakeNarrator {
    calls: Calls,
    fail: bool,
}

impl Narrator for FakeNarrator {
    fn narrate(&self, _track: &crate::device::TrackDescriptor) -> Result<(), NarrationError> {
        self.calls.bump(|c| c.narrations += 1);
        if self.fail {
            return Err(NarrationError::MissingField("artist"));
        }
        Ok(())
    }

    fn discard(&self, _track: &crate::device::TrackDescriptor) {
        self.calls.bump(|c| c.discards += 1);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Failures {
    /// Title of the track whose copy fails.
    pub copy_of: Option<String>,
    pub write: bool,
    pub transcode: bool,
    pub narration: bool,
    pub query: bool,
}

/// Scratch directories for a device, a music library and transcoder
/// output, plus the tracks the fake library knows about.
pub struct Harness {
    pub mount: TempDir,
    pub music: TempDir,
    pub scratch: TempDir,
    pub calls: Calls,
    pub produced: Arc<Mutex<Vec<PathBuf>>>,
    pub query_result: Vec<i32>,
    tracks: HashMap<i32, TrackProperties>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            mount: tempdir().unwrap(),
            music: tempdir().unwrap(),
            scratch: tempdir().unwrap(),
            calls: Calls::default(),
            produced: Arc::default(),
            query_result: Vec::new(),
            tracks: HashMap::new(),
        }
    }

    /// Put `file_name` into the music directory and let the library serve
    /// it as track `id`.
    pub fn add_track(&mut self, id: i32, title: &str, file_name: &str) -> PathBuf {
        let path = self.music.path().join(file_name);
        fs::write(&path, format!("audio of {title}")).unwrap();

        let url = format!("file://{}", path.display()).replace(' ', "+");
        let props: TrackProperties = [
            ("title", crate::library::PropertyValue::from(title)),
            ("artist", "Artist".into()),
            ("album", "Album".into()),
            ("url", url.into()),
            ("tracknr", 1i64.into()),
        ]
        .into_iter()
        .collect();
        self.tracks.insert(id, props);
        path
    }

    pub fn set_properties(&mut self, id: i32, props: TrackProperties) {
        self.tracks.insert(id, props);
    }

    pub fn syncer(&self, failures: Failures) -> Syncer {
        let library = FakeLibrary {
            tracks: self.tracks.clone(),
            query_result: (!failures.query).then(|| self.query_result.clone()),
            calls: self.calls.clone(),
        };
        let transcoder = FakeTranscoder {
            out_dir: self.scratch.path().to_path_buf(),
            produced: self.produced.clone(),
            calls: self.calls.clone(),
            fail: failures.transcode,
        };
        let device = FakeDevice {
            inner: MountedDevice::open(self.mount.path(), 4).unwrap(),
            calls: self.calls.clone(),
            fail_copy_of: failures.copy_of,
            fail_write: failures.write,
        };
        let narrator = FakeNarrator {
            calls: self.calls.clone(),
            fail: failures.narration,
        };

        Syncer::new(
            Box::new(library),
            TranscodeGate::new("mp3", Box::new(transcoder)),
            DeviceWriter::new(Box::new(device), Box::new(narrator)),
        )
    }

    /// Every file stored on the device, sorted.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(self.music_dir())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    /// Everything under the device's music directory, folders included,
    /// sorted.
    pub fn music_listing(&self) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = WalkDir::new(self.music_dir())
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .map(|e| e.into_path())
            .collect();
        entries.sort();
        entries
    }

    fn music_dir(&self) -> PathBuf {
        crate::device::control_dir(self.mount.path()).join("Music")
    }

    pub fn transcoder_leftovers(&self) -> Vec<PathBuf> {
        self.produced
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.exists())
            .cloned()
            .collect()
    }
}
