use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

use tracing::debug;
use url::Url;

use crate::device::TrackDescriptor;
use crate::library::{MediaLibrary, TrackId, TrackProperties};

use super::SyncError;

/// Where a media library property lands in a [`TrackDescriptor`], and the
/// value used when the library doesn't have it.
enum Slot {
    Text(fn(&mut TrackDescriptor) -> &mut String, &'static str),
    Int(fn(&mut TrackDescriptor) -> &mut i64, i64),
}

struct FieldMapping {
    key: &'static str,
    slot: Slot,
}

const FIELDS: &[FieldMapping] = &[
    FieldMapping { key: "title", slot: Slot::Text(|t| &mut t.title, "") },
    FieldMapping { key: "album", slot: Slot::Text(|t| &mut t.album, "") },
    FieldMapping { key: "artist", slot: Slot::Text(|t| &mut t.artist, "") },
    FieldMapping { key: "genre", slot: Slot::Text(|t| &mut t.genre, "") },
    FieldMapping { key: "size", slot: Slot::Int(|t| &mut t.size, 0) },
    FieldMapping { key: "bitrate", slot: Slot::Int(|t| &mut t.bitrate, 0) },
    FieldMapping { key: "duration", slot: Slot::Int(|t| &mut t.duration, 0) },
    FieldMapping { key: "tracknr", slot: Slot::Int(|t| &mut t.track_nr, 0) },
];

/// Fetch track `raw` from the media library and turn it into a descriptor
/// ready for registration.
///
/// Ids that are not strictly positive are rejected before the library is
/// asked anything.
pub fn import(library: &dyn MediaLibrary, raw: i32) -> Result<TrackDescriptor, SyncError> {
    let id = TrackId::new(raw).ok_or(SyncError::InvalidIdentifier(raw))?;

    let properties = library
        .get_info(id)
        .map_err(|source| SyncError::MetadataFetchFailed { id, source })?;

    let mut track = TrackDescriptor {
        medialib_id: id.get(),
        ..TrackDescriptor::default()
    };
    apply_fields(&mut track, &properties);

    track.source =
        source_path(&properties).map_err(|reason| SyncError::PathResolutionFailed { id, reason })?;

    debug!(%id, source = %track.source.display(), "imported track");
    Ok(track)
}

fn apply_fields(track: &mut TrackDescriptor, properties: &TrackProperties) {
    for field in FIELDS {
        match field.slot {
            Slot::Text(slot, default) => {
                *slot(track) = properties.text(field.key).unwrap_or(default).to_string();
            }
            Slot::Int(slot, default) => {
                *slot(track) = properties.int(field.key).unwrap_or(default);
            }
        }
    }
}

/// Resolve the local file behind a track's `url` property.
///
/// The media library encodes urls with `+` for spaces and `%XX` escapes.
/// Only `file://` urls on this host have a local path. The decoded path is
/// taken as raw bytes, so file names need not be UTF-8.
pub fn source_path(properties: &TrackProperties) -> Result<PathBuf, String> {
    let encoded = properties
        .text("url")
        .ok_or_else(|| "no url property".to_string())?;

    let url = Url::parse(encoded).map_err(|e| format!("invalid url {encoded}: {e}"))?;
    if url.scheme() != "file" {
        return Err(format!("{encoded} is not a local file"));
    }
    if let Some(host) = url.host_str().filter(|h| !h.is_empty() && *h != "localhost") {
        return Err(format!("{encoded} is on another host ({host})"));
    }

    let spaced = url.path().replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes()).into_owned();
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}
