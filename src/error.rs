//! Error types and helpers for user-friendly error messages
//!
//! Every failure the tool can end with is a [`BuildError`]. Each variant knows
//! which process exit code it maps to, so `main` can terminate with the code
//! of a failed external command instead of a fixed value.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced to the user before the process terminates
#[derive(Error, Debug)]
pub enum BuildError {
    /// One or more required tools are absent or could not be probed
    #[error("Missing required dependencies: {}", tools.join(", "))]
    MissingDependency { tools: Vec<String> },

    /// A configuration value outside its allow-list
    #[error("Invalid {axis} '{value}' (expected one of: {})", allowed.join(", "))]
    InvalidConfiguration {
        axis: &'static str,
        value: String,
        allowed: Vec<String>,
    },

    /// The project configuration file could not be read or parsed
    #[error("Invalid configuration file {}: {message}", path.display())]
    ConfigFile { path: PathBuf, message: String },

    /// An external command ran and exited unsuccessfully
    #[error("{command} failed with exit code {code}")]
    ExternalCommand { command: String, code: i32 },

    /// An external command could not be started at all
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A create, move or delete inside the build tree failed
    #[error("Failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Some dependency cache entries could not be moved back into the build tree
    #[error(
        "Failed to restore {failed} dependency cache entries; they remain in {}",
        stash.display()
    )]
    CacheRestore { stash: PathBuf, failed: usize },

    /// Resetting the build tree failed and the stashed cache could not be put back
    #[error("{source}; the dependency cache was left in {}", stash.display())]
    CacheStranded {
        stash: PathBuf,
        #[source]
        source: Box<BuildError>,
    },

    /// The build step was requested but there is no build tree to run it in
    #[error("Build directory {} does not exist", path.display())]
    MissingBuildTree { path: PathBuf },
}

impl BuildError {
    /// Create an invalid configuration error for an axis
    pub fn invalid(axis: &'static str, value: impl Into<String>, allowed: &[&str]) -> Self {
        Self::InvalidConfiguration {
            axis,
            value: value.into(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a filesystem error
    pub fn filesystem(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure
    ///
    /// External command failures propagate the command's own code. A child
    /// killed by a signal has no code and maps to 1 like every other failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ExternalCommand { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("\n{} {}", style("ERROR:").red().bold(), self);

        match self {
            BuildError::MissingDependency { .. } => {
                eprintln!(
                    "\n{} Install the tools listed above and make sure they are on your PATH",
                    style("HINT:").yellow().bold()
                );
            }
            BuildError::Filesystem { .. } => {
                eprintln!(
                    "\n{} The build directory may be partially removed; rerun the clean once the cause is fixed",
                    style("HINT:").yellow().bold()
                );
            }
            BuildError::CacheRestore { stash, .. } => {
                eprintln!(
                    "\n{} Move the remaining entries from {} into build/_deps manually",
                    style("HINT:").yellow().bold(),
                    stash.display()
                );
            }
            BuildError::CacheStranded { stash, .. } => {
                eprintln!(
                    "\n{} Move {} back to build/_deps before cleaning again",
                    style("HINT:").yellow().bold(),
                    stash.display()
                );
            }
            BuildError::MissingBuildTree { .. } => {
                eprintln!(
                    "\n{} Run cmbuild without --make first to configure the project",
                    style("HINT:").yellow().bold()
                );
            }
            _ => {}
        }
    }
}

/// Installation hints for tools the build depends on
pub mod hints {
    /// Get hint for missing CMake
    pub fn cmake() -> &'static str {
        "Install CMake 3.20+ from https://cmake.org/download/ or use your package manager:\n\
         • macOS: brew install cmake\n\
         • Ubuntu: sudo apt install cmake"
    }

    /// Get hint for missing Make
    pub fn make() -> &'static str {
        "Install GNU Make:\n\
         • macOS: xcode-select --install\n\
         • Ubuntu: sudo apt install make"
    }

    /// Get hint for missing Ninja
    pub fn ninja() -> &'static str {
        "Install Ninja:\n\
         • macOS: brew install ninja\n\
         • Ubuntu: sudo apt install ninja-build"
    }

    /// Get hint for a missing GNU compiler
    pub fn gcc() -> &'static str {
        "Install GCC:\n\
         • macOS: brew install gcc\n\
         • Ubuntu: sudo apt install build-essential"
    }

    /// Get hint for a missing LLVM compiler
    pub fn clang() -> &'static str {
        "Install Clang:\n\
         • macOS: xcode-select --install\n\
         • Ubuntu: sudo apt install clang"
    }

    /// Get hint for a missing Intel compiler
    pub fn intel() -> &'static str {
        "Install the Intel oneAPI C/C++ compilers and source setvars.sh before building"
    }

    /// Get hint for missing Git
    pub fn git() -> &'static str {
        "Install Git from https://git-scm.com/ or use your package manager:\n\
         • macOS: brew install git\n\
         • Ubuntu: sudo apt install git"
    }

    /// Hint lookup by command name
    pub fn for_command(command: &str) -> Option<&'static str> {
        match command {
            "cmake" => Some(cmake()),
            "make" => Some(make()),
            "ninja" => Some(ninja()),
            "gcc" | "g++" => Some(gcc()),
            "clang" | "clang++" => Some(clang()),
            "icc" | "icx" | "icpc" | "icpx" => Some(intel()),
            "git" => Some(git()),
            _ => None,
        }
    }
}
