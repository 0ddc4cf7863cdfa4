// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Log subscriber setup.

use std::io;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogSettings;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level.
fn filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level `{level}`")),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays free for results.
///
/// # Errors
///
/// Fails on an invalid level directive or if a subscriber is already installed.
pub fn init(settings: &LogSettings) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(&settings.level)?);
    let installed = if settings.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()
    };
    installed.context("failed to install log subscriber")?;

    tracing::debug!(level = %settings.level, json = settings.json, "logging initialized");
    Ok(())
}
