//! # iqstream
//!
//! Host-side capture tool for the AT32 ADC streaming firmware: configures
//! the board over its USB-CDC serial command channel, triggers
//! acquisition, then unpacks the continuous SC12 sample stream to 16-bit
//! I/Q words on stdout.
//!
//! Standard output carries only the binary sample stream; every
//! diagnostic, including the per-second throughput report, goes to stderr.

mod capture;
mod cli;
mod config;
mod errors;

use cli::Args;
use config::CaptureConfig;
use log::debug;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use tokio::runtime::Builder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    TermLogger::init(
        args.level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    debug!("Parsed args and initialized logger");

    let config = CaptureConfig::load(&args)?;
    debug!("Effective configuration: {config:?}");

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(capture::run(config))?;
    Ok(())
}
