// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `canopy` binary entry point.

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use canopy_cli::{Cli, FileConfig, Settings, logging};
use clap::Parser;

fn try_main(cli: &Cli) -> Result<()> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli, &file)?;
    logging::init(&settings.logging)?;
    tracing::debug!(?settings, "resolved settings");

    let stdout = io::stdout();
    canopy_cli::run(&settings, &mut stdout.lock())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = format!("{err:#}");
            tracing::error!(error = %message, "run failed");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
