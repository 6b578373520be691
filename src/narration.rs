//! Spoken track titles ("voiceover") for players that support them.
//!
//! Narration is optional: a failure here never fails a sync.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::NarrationSettings;
use crate::device::{TrackDescriptor, control_dir};

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("track has no {0} to speak")]
    MissingField(&'static str),
    #[error("can't run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} exited with {status}", .program.display())]
    Failed { program: PathBuf, status: ExitStatus },
}

pub trait Narrator: Send + Sync {
    /// Produce the spoken clip for a track that was just copied.
    fn narrate(&self, track: &TrackDescriptor) -> Result<(), NarrationError>;

    /// Delete the clip of a track being removed, if there is one.
    fn discard(&self, track: &TrackDescriptor);
}

/// Narration turned off.
pub struct Silent;

impl Narrator for Silent {
    fn narrate(&self, _track: &TrackDescriptor) -> Result<(), NarrationError> {
        Ok(())
    }

    fn discard(&self, _track: &TrackDescriptor) {}
}

/// Directory the player reads track clips from.
pub fn speakable_dir(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("Speakable").join("Tracks")
}

/// Narration through the `espeak` command line tool.
pub struct Espeak {
    settings: NarrationSettings,
    dir: PathBuf,
}

impl Espeak {
    /// `None` when narration is disabled or the device has no clip
    /// directory.
    pub fn for_device(mountpoint: &Path, settings: &NarrationSettings) -> Option<Self> {
        if !settings.enabled {
            return None;
        }
        let dir = speakable_dir(mountpoint);
        dir.is_dir().then(|| Self {
            settings: settings.clone(),
            dir,
        })
    }

    pub fn clip_path(&self, track: &TrackDescriptor) -> PathBuf {
        self.dir.join(format!("{}.wav", track.handle()))
    }
}

/// What gets spoken for a track.
pub fn spoken_text(track: &TrackDescriptor) -> Result<String, NarrationError> {
    if track.artist.is_empty() {
        return Err(NarrationError::MissingField("artist"));
    }
    if track.title.is_empty() {
        return Err(NarrationError::MissingField("title"));
    }
    Ok(format!("{}. {}.", track.artist, track.title))
}

impl Narrator for Espeak {
    fn narrate(&self, track: &TrackDescriptor) -> Result<(), NarrationError> {
        let text = spoken_text(track)?;
        let clip = self.clip_path(track);
        let program = &self.settings.program;

        let status = Command::new(program)
            .arg("-v")
            .arg(&self.settings.voice)
            .arg("-p")
            .arg(self.settings.pitch.to_string())
            .arg("-g")
            .arg(self.settings.word_gap.to_string())
            .arg("-w")
            .arg(&clip)
            .arg(&text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| NarrationError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            let _ = fs::remove_file(&clip);
            return Err(NarrationError::Failed {
                program: program.clone(),
                status,
            });
        }

        debug!(clip = %clip.display(), %text, "narrated track");
        Ok(())
    }

    fn discard(&self, track: &TrackDescriptor) {
        let clip = self.clip_path(track);
        if fs::remove_file(&clip).is_ok() {
            debug!(clip = %clip.display(), "removed narration clip");
        }
    }
}

/// Pick the narrator for the device at `mountpoint`.
pub fn narrator_for(mountpoint: &Path, settings: &NarrationSettings) -> Box<dyn Narrator> {
    match Espeak::for_device(mountpoint, settings) {
        Some(espeak) => {
            info!(dir = %espeak.dir.display(), "narration enabled");
            Box::new(espeak)
        }
        None => Box::new(Silent),
    }
}
