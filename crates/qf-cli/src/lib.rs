//! QualityForce command line
//!
//! `qf` runs the built-in testing agents against a file-backed result store
//! and inspects what they produced.
//!
//! ```text
//! qf agents
//! qf run --agent unit_testing --input source_code=@src/app.py
//! qf batch -a load_testing -a stress_testing -i 'endpoints=["/search"]' --sequential
//! qf result 01J9Z3K6W0Q8N5V7X2Y4T1R3M8 --view rca
//! qf list
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod inputs;
pub mod output;

pub use cli::command;
pub use commands::{execute, resolve_config, App, Outcome};

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber
///
/// `RUST_LOG` wins over `verbose`; a second call is a no-op.
pub fn init_tracing(json: bool, verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
