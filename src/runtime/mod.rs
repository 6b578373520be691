//! Process lifecycle: parse the command line, set up logging and the
//! collaborators, then clear, sync and serve as requested.

use std::process::ExitCode;

use clap::Parser;
use dialoguer::{Confirm, console::Term};
use tracing::{error, info};

use crate::cli::Cli;
use crate::service;

mod logging;
mod settings;
mod startup;

pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    if !cli.has_work() {
        eprintln!("podsync: need either --service, --clear or a query string");
        return ExitCode::FAILURE;
    }

    logging::init(cli.verbose);

    let settings = settings::load_settings();
    let mountpoint = cli
        .mountpoint
        .clone()
        .unwrap_or_else(|| settings.device.mountpoint.clone());
    let address = settings::medialib_address(&settings);

    let mut syncer = match startup::build_syncer(&settings, &mountpoint, address.as_deref()) {
        Ok(syncer) => syncer,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut status = ExitCode::SUCCESS;

    if cli.clear && confirm_clear() {
        if let Err(e) = syncer.clear_all() {
            error!("can't write device database: {e}");
            status = ExitCode::FAILURE;
        }
    }

    if let Some(query) = cli.query() {
        match syncer.run_query(&query) {
            Ok(count) => info!(tracks = count, "query synced"),
            Err(e) => {
                error!("{e}");
                status = ExitCode::FAILURE;
            }
        }
    }

    if cli.service {
        if let Err(e) = service::serve(syncer, address.as_deref(), &settings.service) {
            error!("sync service stopped: {e}");
            return ExitCode::FAILURE;
        }
    }

    status
}

/// Ask before wiping the player. Anything but an explicit yes (including a
/// terminal that can't be prompted) leaves it alone.
fn confirm_clear() -> bool {
    match Confirm::new()
        .with_prompt("Do you really wish to clear all tracks?")
        .default(true)
        .interact_on(&Term::stderr())
    {
        Ok(answer) => answer,
        Err(e) => {
            error!("can't ask for confirmation, not clearing: {e}");
            false
        }
    }
}
