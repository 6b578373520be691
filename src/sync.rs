//! Batch track sync: pull tracks out of the media library and onto the
//! device, all or nothing.
//!
//! One batch runs the importer, the transcode gate and the device writer
//! for every id in order. Either every track lands in the catalog and the
//! catalog is written once, or everything the batch added is removed again.

mod error;
mod importer;
mod orchestrator;
mod transcode;
mod writer;

pub use error::{BatchError, QueryError, SyncError};
pub use orchestrator::Syncer;
pub use transcode::{ScriptTranscoder, TranscodeError, TranscodeGate, Transcoder};
pub use writer::DeviceWriter;

#[cfg(test)]
pub(crate) mod testing;
