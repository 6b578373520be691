use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::config::Settings;
use crate::device::{DeviceError, MountedDevice};
use crate::library::{DbusMediaLibrary, LibraryError};
use crate::narration::narrator_for;
use crate::sync::{DeviceWriter, ScriptTranscoder, Syncer, TranscodeGate};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("can't open device: {0}")]
    Device(#[from] DeviceError),
}

/// Connect to the media library and open the device.
pub fn build_syncer(
    settings: &Settings,
    mountpoint: &Path,
    address: Option<&str>,
) -> Result<Syncer, StartupError> {
    debug!(address = address.unwrap_or("session bus"), "connecting to the media library");
    let library = DbusMediaLibrary::connect(address, &settings.medialib)?;

    let device = MountedDevice::open(mountpoint, settings.device.music_folders)?;
    let narrator = narrator_for(mountpoint, &settings.narration);

    let gate = TranscodeGate::new(
        &settings.transcode.target_extension,
        Box::new(ScriptTranscoder::new(settings.transcode.command.clone())),
    );

    Ok(Syncer::new(
        Box::new(library),
        gate,
        DeviceWriter::new(Box::new(device), narrator),
    ))
}
