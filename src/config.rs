//! Configuration loader and schema types.
//!
//! This module exposes the settings schema (device, media library,
//! transcoder, narration and service sections) and helpers to load it
//! from disk and the environment.

mod load;
mod schema;

pub use schema::*;
