// Main CLI entrypoint
// (c) 2024 Ross Younger

use std::process::ExitCode;

use clap::Parser;

use super::{args::CliArgs, styles::ERROR};
use crate::{pipeline, util::setup_tracing};

/// Main CLI entrypoint
pub fn cli() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    setup_tracing(args.trace_level(), args.log_file.as_deref())
        .inspect_err(|e| eprintln!("{ERROR}Error:{ERROR:#} {e:?}"))?;

    let config = args.run_config();
    tracing::debug!("{config:?}");
    Ok(match pipeline::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    })
}
