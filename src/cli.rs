//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "podsync",
    version,
    about = "Sync tracks from the media library to a portable player"
)]
pub struct Cli {
    /// Where the player is mounted [default: /media/IPOD]
    #[arg(short, long, value_name = "PATH")]
    pub mountpoint: Option<PathBuf>,

    /// Serve sync requests on D-Bus
    #[arg(short, long)]
    pub service: bool,

    /// Display more messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Remove all tracks from the player
    #[arg(long)]
    pub clear: bool,

    /// Collection query selecting the tracks to sync
    #[arg(value_name = "QUERY")]
    pub query: Vec<String>,
}

impl Cli {
    /// The positional arguments joined into one query string.
    pub fn query(&self) -> Option<String> {
        (!self.query.is_empty()).then(|| self.query.join(" "))
    }

    /// Whether there is anything to do at all.
    pub fn has_work(&self) -> bool {
        self.service || self.clear || !self.query.is_empty()
    }
}
