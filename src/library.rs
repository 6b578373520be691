//! Media library side: track ids, property bags, the collection query
//! language and the client used to talk to the library service.

mod client;
mod model;
pub mod query;

pub use client::{DbusMediaLibrary, LibraryError, MediaLibrary};
pub use model::{TrackId, TrackProperties};
#[cfg(test)]
pub use model::PropertyValue;
