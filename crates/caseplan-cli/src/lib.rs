#![forbid(unsafe_code)]

//! `caseplan`: command-line access to the Case Planner engine.
//!
//! | Command | Does |
//! |---------|------|
//! | `catalog` | dump the built-in product catalog |
//! | `generate` | auto-generate a case into a `.fishcase` |
//! | `check` | validate a `.fishcase` and print usage and warnings |
//! | `import` | add a `.fishcase` to a planner state file |
//! | `export` | write a layout from a planner state file |
//!
//! Diagnostics go to stderr through `tracing`; set `CASEPLAN_LOG` (or
//! `--log`) to an `EnvFilter` directive to see more than warnings.

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{CliError, Result};

use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. Later calls are ignored.
pub fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
