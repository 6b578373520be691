use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/podsync/config.toml` or `~/.config/podsync/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PODSYNC__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceSettings,
    pub medialib: MedialibSettings,
    pub transcode: TranscodeSettings,
    pub narration: NarrationSettings,
    pub service: ServiceSettings,
}

pub const DEFAULT_MOUNTPOINT: &str = "/media/IPOD";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Where the player is mounted. `--mountpoint` wins over this.
    pub mountpoint: PathBuf,
    /// Number of `Fnn` storage folders tracks are spread across.
    pub music_folders: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            mountpoint: PathBuf::from(DEFAULT_MOUNTPOINT),
            music_folders: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MedialibSettings {
    /// D-Bus address of the media library. `None` means the session bus.
    /// The `MEDIALIB_PATH` environment variable wins over this.
    pub address: Option<String>,
    pub bus_name: String,
    pub object_path: String,
}

impl Default for MedialibSettings {
    fn default() -> Self {
        Self {
            address: None,
            bus_name: "org.podsync.MediaLibrary".to_string(),
            object_path: "/org/podsync/MediaLibrary".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscodeSettings {
    /// Extension (without dot, case-insensitive) the player accepts as-is.
    pub target_extension: String,
    /// Executable called as `<command> <source>`; prints the converted file's path.
    pub command: PathBuf,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            target_extension: "mp3".to_string(),
            command: PathBuf::from("scripts/convert-2mp3.sh"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    /// Generate spoken title clips when the device supports them.
    pub enabled: bool,
    pub program: PathBuf,
    pub voice: String,
    pub pitch: u32,
    /// Pause between words, in units of 10ms.
    pub word_gap: u32,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: PathBuf::from("espeak"),
            // young female voice, US accent
            voice: "en-us+f2".to_string(),
            pitch: 70,
            word_gap: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub bus_name: String,
    pub object_path: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            bus_name: "org.podsync.Syncer".to_string(),
            object_path: "/org/podsync/Syncer".to_string(),
        }
    }
}
