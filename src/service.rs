//! The sync operations exported on D-Bus so other clients can push tracks
//! to the device.

use async_io::{Timer, block_on};
use tracing::{error, info};
use zbus::{Connection, fdo, interface};

use crate::config::ServiceSettings;
use crate::sync::Syncer;

pub struct SyncService {
    syncer: Syncer,
}

impl SyncService {
    pub fn new(syncer: Syncer) -> Self {
        Self { syncer }
    }

    fn run(&mut self, ids: &[i32]) -> fdo::Result<()> {
        match self.syncer.sync_batch(ids) {
            Ok(count) => {
                info!(tracks = count, "synced tracks for a remote client");
                Ok(())
            }
            Err(e) => {
                error!("remote sync request failed: {e}");
                Err(fdo::Error::Failed(e.to_string()))
            }
        }
    }
}

#[interface(name = "org.podsync.Syncer1")]
impl SyncService {
    /// Sync a list of media library ids to the device, all or nothing.
    fn sync(&mut self, ids: Vec<i32>) -> fdo::Result<()> {
        self.run(&ids)
    }

    /// Sync a single track to the device.
    fn sync_id(&mut self, id: i32) -> fdo::Result<()> {
        self.run(&[id])
    }
}

/// Export the service and handle requests until the process is killed.
/// Requests are served one at a time.
pub fn serve(syncer: Syncer, address: Option<&str>, settings: &ServiceSettings) -> zbus::Result<()> {
    block_on(run_service(SyncService::new(syncer), address, settings))
}

async fn run_service(
    service: SyncService,
    address: Option<&str>,
    settings: &ServiceSettings,
) -> zbus::Result<()> {
    let connection = match address {
        Some(address) => zbus::connection::Builder::address(address)?.build().await?,
        None => Connection::session().await?,
    };

    connection.request_name(settings.bus_name.as_str()).await?;
    connection
        .object_server()
        .at(settings.object_path.as_str(), service)
        .await?;

    info!(
        name = %settings.bus_name,
        path = %settings.object_path,
        "sync service ready"
    );

    // Keep the service alive.
    loop {
        Timer::after(std::time::Duration::from_secs(3600)).await;
    }
}
