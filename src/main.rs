//! cmbuild - a CMake build driver for C/C++ projects
//!
//! Verifies the toolchain, configures the project with CMake and runs the
//! generator's build program. Cleaning keeps `build/_deps` so fetched
//! third-party sources are not downloaded again.
//!
//! ## Architecture
//!
//! ```text
//! cli → config (validated axes) → build::BuildContext → cmake / make / ninja
//! ```
//!
//! Exit codes: 0 on success, the failing command's own code when configure or
//! build fails, 1 for every other error.

mod build;
mod cli;
mod config;
mod error;
mod exec;
mod utils;

use clap::Parser;

use cli::Cli;
use error::BuildError;
use utils::terminal;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        std::process::exit(report_failure(&err));
    }
}

/// Print the final error and pick the process exit code
fn report_failure(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BuildError>() {
        Some(build_err) => {
            build_err.display_with_hints();
            build_err.exit_code()
        }
        None => {
            terminal::print_error(&format!("{:#}", err));
            1
        }
    }
}
