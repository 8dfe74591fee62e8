//! depscan library - expose modules for testing
//!
//! The binary in `main.rs` is a thin clap front end over these modules.

pub mod commands;
pub mod common;
pub mod errors;

pub use common::GlobalOpts;
pub use depscan_logger as logger;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber used by the library crates
///
/// `RUST_LOG` takes precedence; otherwise the filter follows the logger's
/// verbosity. Output goes to stderr so manifests printed by `--dry-run` stay
/// clean on stdout.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| logger::verbosity_to_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
