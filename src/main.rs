use std::process::ExitCode;

mod cli;
mod config;
mod device;
mod library;
mod narration;
mod runtime;
mod service;
mod sync;

fn main() -> ExitCode {
    runtime::run()
}
