//! CMake configuration and execution
//!
//! This module turns a [`BuildConfiguration`] into the configure and build
//! invocations and maps their exit status onto [`BuildError`].

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::build::tree::BuildTree;
use crate::config::BuildConfiguration;
use crate::error::BuildError;
use crate::exec::subprocess::{run_command, CommandResult, OutputMode};
use crate::utils::terminal::Reporter;

/// Configure tool invoked for the configure step
pub const CMAKE: &str = "cmake";

/// A resolved external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Shell-like rendering for status messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(' ') {
                    format!("\"{}\"", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Configure and build driver for one project
#[derive(Debug)]
pub struct CMakeInvocation<'a> {
    config: &'a BuildConfiguration,
    tree: &'a BuildTree,
    project_root: PathBuf,
    jobs: usize,
}

impl<'a> CMakeInvocation<'a> {
    /// Create a driver that builds with one job per available CPU
    pub fn new(config: &'a BuildConfiguration, tree: &'a BuildTree, project_root: &Path) -> Self {
        Self {
            config,
            tree,
            project_root: project_root.to_path_buf(),
            jobs: num_cpus(),
        }
    }

    /// Set number of parallel jobs
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Arguments of the configure step
    ///
    /// Compilers are passed as absolute paths when they resolve on PATH.
    pub fn configure_args(&self) -> Vec<String> {
        let config = self.config;
        let mut args = vec![
            "-G".to_string(),
            config.generator().to_string(),
            format!("-DCMAKE_BUILD_TYPE={}", config.build_type()),
            format!(
                "-DCMAKE_C_COMPILER={}",
                compiler_path(config.c_compiler().as_str())
            ),
            format!(
                "-DCMAKE_CXX_COMPILER={}",
                compiler_path(config.cxx_compiler().as_str())
            ),
            format!("-DCMAKE_C_STANDARD={}", config.c_standard().cmake_value()),
            format!("-DCMAKE_CXX_STANDARD={}", config.cxx_standard()),
        ];
        args.extend(config.extra_defines().iter().map(|d| format!("-D{}", d)));
        args.push(self.project_root.display().to_string());
        args
    }

    /// Command line of the build step
    pub fn build_step(&self) -> Invocation {
        Invocation {
            program: self.config.generator().build_program().to_string(),
            args: vec![format!("-j{}", self.jobs)],
        }
    }

    /// Run the configure step inside the build tree
    ///
    /// CMake's stdout is streamed; stderr is captured so it can be repeated
    /// with the failure message.
    pub fn configure(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        self.tree.ensure_exists(reporter)?;

        let invocation = Invocation {
            program: CMAKE.to_string(),
            args: self.configure_args(),
        };
        reporter.info(&format!(
            "Running CMake with command: {}",
            invocation.display()
        ));

        let result = self.run(&invocation, OutputMode::CaptureStderr)?;
        if !result.success {
            return Err(self.failure(&invocation, result, reporter));
        }

        // Warnings from a successful configure still belong in front of the user.
        for line in result.stderr.lines().filter(|l| !l.trim().is_empty()) {
            reporter.warning(line);
        }
        reporter.success("CMake configuration completed successfully.");
        Ok(())
    }

    /// Run the build step inside the build tree with live output
    pub fn build(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        let invocation = self.build_step();
        reporter.info(&format!(
            "Building with {} ({} jobs)",
            invocation.display(),
            self.jobs
        ));

        let result = self.run(&invocation, OutputMode::Inherit)?;
        if !result.success {
            return Err(self.failure(&invocation, result, reporter));
        }

        reporter.success(&format!(
            "Build completed successfully in {:.1}s.",
            result.duration.as_secs_f64()
        ));
        Ok(())
    }

    fn run(&self, invocation: &Invocation, mode: OutputMode) -> Result<CommandResult, BuildError> {
        debug!("cwd {}: {}", self.tree.path().display(), invocation.display());
        run_command(
            &invocation.program,
            &invocation.args,
            Some(self.tree.path()),
            mode,
        )
        .map_err(|source| BuildError::Spawn {
            command: invocation.program.clone(),
            source,
        })
    }

    fn failure(
        &self,
        invocation: &Invocation,
        result: CommandResult,
        reporter: &dyn Reporter,
    ) -> BuildError {
        reporter.error(&format!(
            "{} failed with exit code {}",
            invocation.program, result.exit_code
        ));
        if !result.stderr.trim().is_empty() {
            reporter.error(result.stderr.trim_end());
        }
        BuildError::ExternalCommand {
            command: invocation.program.clone(),
            code: result.exit_code,
        }
    }
}

/// Absolute path of a compiler on PATH, or its bare name
fn compiler_path(name: &str) -> String {
    which::which(name)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| name.to_string())
}

/// Get number of CPUs for parallel builds
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
