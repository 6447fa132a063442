// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. With `json_output` every event
/// is written as one JSON object per line.
pub fn init_tracing(log_level: &str, json_output: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    let subscriber = Registry::default().with(env_filter);

    if json_output {
        let json_layer = fmt::layer().json().with_current_span(true);
        tracing::subscriber::set_global_default(subscriber.with(json_layer))?;
    } else {
        let fmt_layer = fmt::layer().with_target(true).with_level(true);
        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_filter() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(init_tracing("=[{", false).is_err());
        }
    }
}
