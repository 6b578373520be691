use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use super::SyncError;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("can't run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transcoder exited with {0}")]
    Failed(ExitStatus),
    #[error("transcoder reported no output file")]
    NoOutput,
    #[error("transcoder output {} does not exist", .0.display())]
    MissingOutput(PathBuf),
}

/// Converts audio files into the format the device plays.
pub trait Transcoder: Send + Sync {
    /// Convert `source` and return the path of the newly created file.
    /// The caller owns that file.
    fn transcode(&self, source: &Path) -> Result<PathBuf, TranscodeError>;
}

/// Runs an external program as `<program> <source>`; the program prints the
/// path of the converted file on stdout.
#[derive(Debug, Clone)]
pub struct ScriptTranscoder {
    program: PathBuf,
}

impl ScriptTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for ScriptTranscoder {
    fn transcode(&self, source: &Path) -> Result<PathBuf, TranscodeError> {
        debug!(program = %self.program.display(), source = %source.display(), "transcoding");

        let output = Command::new(&self.program)
            .arg(source)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let reported = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            if !reported.is_empty() {
                match fs::remove_file(&reported) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %reported, "can't remove transcoder output: {e}"),
                }
            }
            return Err(TranscodeError::Failed(output.status));
        }
        if reported.is_empty() {
            return Err(TranscodeError::NoOutput);
        }

        let path = PathBuf::from(reported);
        if !path.is_file() {
            return Err(TranscodeError::MissingOutput(path));
        }
        Ok(path)
    }
}

/// A transcoder output file, deleted on drop.
#[derive(Debug)]
pub struct TemporaryFile {
    path: PathBuf,
}

impl TemporaryFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "can't remove temporary file: {e}"),
        }
    }
}

/// The file to copy to the device for one track.
#[derive(Debug)]
pub enum Source {
    /// The library's own file, already in a playable format.
    Original(PathBuf),
    /// A converted copy; removed once this value goes away.
    Transcoded(TemporaryFile),
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Source::Original(path) => path,
            Source::Transcoded(file) => file.path(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Source::Transcoded(_))
    }
}

/// Decides whether a file needs converting before it goes on the device.
pub struct TranscodeGate {
    target_extension: String,
    transcoder: Box<dyn Transcoder>,
}

impl TranscodeGate {
    pub fn new(target_extension: &str, transcoder: Box<dyn Transcoder>) -> Self {
        Self {
            target_extension: target_extension.trim_start_matches('.').to_string(),
            transcoder,
        }
    }

    /// Whether `path` is not already in the target format. Extensions are
    /// compared case-insensitively.
    pub fn needs_transcode(&self, path: &Path) -> bool {
        !path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.target_extension))
    }

    pub fn normalize(&self, path: &Path) -> Result<Source, SyncError> {
        if !self.needs_transcode(path) {
            return Ok(Source::Original(path.to_path_buf()));
        }

        let converted = self
            .transcoder
            .transcode(path)
            .map_err(|source| SyncError::TranscodeFailed {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(from = %path.display(), to = %converted.display(), "transcoded");
        Ok(Source::Transcoded(TemporaryFile::new(converted)))
    }
}
