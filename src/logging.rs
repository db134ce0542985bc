//! Logging setup using tracing_subscriber.
//!
//! The library itself only emits `tracing` events; binaries and tests call
//! [`init`] to see them.

use std::{io::IsTerminal, sync::Once};

use tracing_subscriber::{filter::LevelFilter, EnvFilter};

static DOSSIER_LOG_ENV_VAR: &str = "DOSSIER_LOG";

/// Initializes a tracing subscriber writing to stderr.
///
/// `RUST_LOG` directives are honoured as-is; `DOSSIER_LOG` sets the level
/// for this crate unless `RUST_LOG` already names it.
pub fn init() {
    // Tests call this too, so guard against double initialization.
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let (env_filter, log_level) = env_filter_and_log_level();

        let installed = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init();

        if installed.is_ok() {
            tracing::debug!("log level: {}", log_level);
        }
    });
}

fn env_filter_and_log_level() -> (EnvFilter, String) {
    let directive_string = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(&directive_string);

    let log_level = std::env::var(DOSSIER_LOG_ENV_VAR).unwrap_or_else(|_| "info".to_string());

    if !directive_string.contains("dossier=") {
        match format!("dossier={log_level}").parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(err) => eprintln!("ignoring {DOSSIER_LOG_ENV_VAR}={log_level}: {err}"),
        }
    }

    (env_filter, log_level)
}
