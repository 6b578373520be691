//! In-memory catalog: the device's track list and playlists.
//!
//! Every track in `tracks` is also listed in the master playlist. Only
//! [`Catalog::add_track`] and [`Catalog::remove_track`] change track
//! membership, and both keep that invariant.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name given to the master playlist of a freshly initialised device.
pub const MASTER_PLAYLIST: &str = "iPod";

/// Refers to one registered track; stable until the track is removed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogHandle(pub(crate) u64);

impl fmt::Display for CatalogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// A track as the device knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackDescriptor {
    /// Assigned on registration; 0 until then.
    pub id: u64,
    pub medialib_id: i32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Bytes.
    pub size: i64,
    /// kbit/s.
    pub bitrate: i64,
    /// Milliseconds.
    pub duration: i64,
    pub track_nr: i64,
    /// Location of the stored file relative to the mountpoint, `/`-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_path: Option<String>,
    /// Local file the track was imported from. Not persisted.
    #[serde(skip)]
    pub source: PathBuf,
}

impl TrackDescriptor {
    pub fn handle(&self) -> CatalogHandle {
        CatalogHandle(self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub name: String,
    pub master: bool,
    /// Track ids, in playlist order.
    pub tracks: Vec<u64>,
}

impl Playlist {
    pub fn contains(&self, handle: CatalogHandle) -> bool {
        self.tracks.contains(&handle.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    tracks: Vec<TrackDescriptor>,
    playlists: Vec<Playlist>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// An empty catalog holding only the master playlist.
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            playlists: vec![Playlist {
                name: MASTER_PLAYLIST.to_string(),
                master: true,
                tracks: Vec::new(),
            }],
        }
    }

    /// Repair a catalog read from disk: make sure a master playlist exists
    /// and lists every track.
    pub(crate) fn normalize(&mut self) {
        if !self.playlists.iter().any(|p| p.master) {
            self.playlists.insert(
                0,
                Playlist {
                    name: MASTER_PLAYLIST.to_string(),
                    master: true,
                    tracks: Vec::new(),
                },
            );
        }
        let ids: Vec<u64> = self.tracks.iter().map(|t| t.id).collect();
        let master = self.master_mut();
        for id in ids {
            if !master.tracks.contains(&id) {
                master.tracks.push(id);
            }
        }
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn handles(&self) -> Vec<CatalogHandle> {
        self.tracks.iter().map(TrackDescriptor::handle).collect()
    }

    pub fn master(&self) -> &Playlist {
        self.playlists
            .iter()
            .find(|p| p.master)
            .unwrap_or(&self.playlists[0])
    }

    fn master_mut(&mut self) -> &mut Playlist {
        let idx = self.playlists.iter().position(|p| p.master).unwrap_or(0);
        &mut self.playlists[idx]
    }

    pub fn track(&self, handle: CatalogHandle) -> Option<&TrackDescriptor> {
        self.tracks.iter().find(|t| t.id == handle.0)
    }

    pub fn track_mut(&mut self, handle: CatalogHandle) -> Option<&mut TrackDescriptor> {
        self.tracks.iter_mut().find(|t| t.id == handle.0)
    }

    /// Append `track` to the track list and the master playlist.
    ///
    /// Ids are `max + 1`, so removing the newest tracks gives back exactly
    /// the catalog that was there before they were added.
    pub fn add_track(&mut self, mut track: TrackDescriptor) -> CatalogHandle {
        track.id = self.tracks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let handle = track.handle();
        self.tracks.push(track);
        self.master_mut().tracks.push(handle.0);
        handle
    }

    /// Remove a track from every playlist and from the track list.
    pub fn remove_track(&mut self, handle: CatalogHandle) -> Option<TrackDescriptor> {
        for playlist in &mut self.playlists {
            playlist.tracks.retain(|id| *id != handle.0);
        }
        let idx = self.tracks.iter().position(|t| t.id == handle.0)?;
        Some(self.tracks.remove(idx))
    }

    /// Whether every track is a member of the master playlist.
    pub fn is_consistent(&self) -> bool {
        let master = self.master();
        self.tracks.iter().all(|t| master.contains(t.handle()))
    }
}
