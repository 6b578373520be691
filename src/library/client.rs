use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;
use zbus::blocking::Connection;
use zbus::proxy;
use zvariant::{OwnedValue, Value};

use crate::config::MedialibSettings;

use super::model::{PropertyValue, TrackId, TrackProperties};
use super::query::Collection;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to connect to the media library: {0}")]
    Connect(#[source] zbus::Error),
    #[error("media library request failed: {0}")]
    Request(#[from] zbus::Error),
    #[error("no track with id {0}")]
    UnknownTrack(TrackId),
}

/// Read access to the media library.
///
/// Calls block until the library answers.
pub trait MediaLibrary: Send + Sync {
    /// Resolve a collection to the ids of its tracks, in library order.
    fn query_ids(&self, collection: &Collection) -> Result<Vec<i32>, LibraryError>;

    /// Fetch the property bag of one track.
    fn get_info(&self, id: TrackId) -> Result<TrackProperties, LibraryError>;
}

#[proxy(
    interface = "org.podsync.MediaLibrary1",
    gen_async = false,
    blocking_name = "MediaLibraryBusProxy"
)]
trait MediaLibraryBus {
    fn query_ids(&self, collection: &str) -> zbus::Result<Vec<i32>>;

    fn get_info(&self, id: i32) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// Media library reached over D-Bus.
pub struct DbusMediaLibrary {
    proxy: MediaLibraryBusProxy<'static>,
}

impl DbusMediaLibrary {
    /// Connect to the library at `address`, or on the session bus when `None`.
    pub fn connect(address: Option<&str>, settings: &MedialibSettings) -> Result<Self, LibraryError> {
        let connection = match address {
            Some(address) => zbus::blocking::connection::Builder::address(address)
                .and_then(|builder| builder.build()),
            None => Connection::session(),
        }
        .map_err(LibraryError::Connect)?;

        let proxy = MediaLibraryBusProxy::builder(&connection)
            .destination(settings.bus_name.clone())
            .and_then(|builder| builder.path(settings.object_path.clone()))
            .and_then(|builder| builder.build())
            .map_err(LibraryError::Connect)?;

        Ok(Self { proxy })
    }
}

impl MediaLibrary for DbusMediaLibrary {
    fn query_ids(&self, collection: &Collection) -> Result<Vec<i32>, LibraryError> {
        let query = collection.to_string();
        debug!(%query, "resolving collection");
        Ok(self.proxy.query_ids(&query)?)
    }

    fn get_info(&self, id: TrackId) -> Result<TrackProperties, LibraryError> {
        let raw = self.proxy.get_info(id.get())?;
        if raw.is_empty() {
            return Err(LibraryError::UnknownTrack(id));
        }
        Ok(properties_from_dict(raw))
    }
}

/// Keep the text and integer entries of a D-Bus property dict; anything
/// else has no counterpart on the device.
pub(super) fn properties_from_dict(raw: HashMap<String, OwnedValue>) -> TrackProperties {
    raw.into_iter()
        .filter_map(|(key, value)| property_value(&value).map(|v| (key, v)))
        .collect()
}

fn property_value(value: &Value<'_>) -> Option<PropertyValue> {
    let value = match value {
        Value::Str(s) => PropertyValue::Text(s.to_string()),
        Value::U8(v) => PropertyValue::Int(i64::from(*v)),
        Value::I16(v) => PropertyValue::Int(i64::from(*v)),
        Value::U16(v) => PropertyValue::Int(i64::from(*v)),
        Value::I32(v) => PropertyValue::Int(i64::from(*v)),
        Value::U32(v) => PropertyValue::Int(i64::from(*v)),
        Value::I64(v) => PropertyValue::Int(*v),
        Value::U64(v) => PropertyValue::Int(i64::try_from(*v).ok()?),
        Value::Value(inner) => return property_value(inner),
        _ => return None,
    };
    Some(value)
}
