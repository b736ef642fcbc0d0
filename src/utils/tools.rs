//! Tool detection and version probing
//!
//! A probe never fails the caller: an absent command, a launch failure and a
//! non-zero `--version` exit all come back as `exists == false`. Whether a
//! missing tool is fatal is decided by [`check_dependencies`].

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::BuildConfiguration;
use crate::error::{hints, BuildError};
use crate::exec::subprocess::{command_exists, run_command, OutputMode};
use crate::utils::terminal::Reporter;

/// Oldest CMake release the generated projects are tested against
pub const MIN_CMAKE_VERSION: (u32, u32) = (3, 20);

/// Outcome of probing one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyProbeResult {
    pub command: String,
    pub exists: bool,
    pub version_signature: Option<String>,
}

impl DependencyProbeResult {
    fn missing(command: &str) -> Self {
        Self {
            command: command.to_string(),
            exists: false,
            version_signature: None,
        }
    }
}

/// Tool requirement level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRequirement {
    /// Missing tool fails the dependency check
    Required,
    /// Missing tool only produces a warning
    Optional,
}

/// A tool the build expects on PATH
#[derive(Debug, Clone)]
pub struct Dependency {
    pub command: String,
    pub version_flag: String,
    pub requirement: ToolRequirement,
}

impl Dependency {
    pub fn required(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            version_flag: "--version".to_string(),
            requirement: ToolRequirement::Required,
        }
    }

    pub fn optional(command: impl Into<String>) -> Self {
        Self {
            requirement: ToolRequirement::Optional,
            ..Self::required(command)
        }
    }
}

/// Probe a command for existence and a one-line version signature
///
/// The command is looked up on PATH first and is only spawned when found.
/// The signature is the first non-empty line of stdout, or of stderr when
/// stdout is empty.
pub fn probe(command: &str, version_flag: &str) -> DependencyProbeResult {
    if !command_exists(command) {
        debug!("{} not found on PATH", command);
        return DependencyProbeResult::missing(command);
    }

    let result = match run_command(command, &[version_flag], None, OutputMode::Capture) {
        Ok(result) => result,
        Err(e) => {
            debug!("failed to launch {}: {}", command, e);
            return DependencyProbeResult::missing(command);
        }
    };

    if !result.success {
        debug!("{} {} exited with {}", command, version_flag, result.exit_code);
        return DependencyProbeResult::missing(command);
    }

    let version_signature =
        first_non_empty_line(&result.stdout).or_else(|| first_non_empty_line(&result.stderr));

    DependencyProbeResult {
        command: command.to_string(),
        exists: true,
        version_signature,
    }
}

fn first_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Dependencies needed to configure and build with `config`
pub fn build_dependencies(config: &BuildConfiguration, extra_optional: &[String]) -> Vec<Dependency> {
    let mut deps = vec![
        Dependency::required(config.c_compiler().as_str()),
        Dependency::required(config.cxx_compiler().as_str()),
        Dependency::required("cmake"),
        Dependency::required(config.generator().build_program()),
        Dependency::optional("git"),
    ];
    for command in extra_optional {
        if !deps.iter().any(|d| &d.command == command) {
            deps.push(Dependency::optional(command.clone()));
        }
    }
    deps
}

/// Probe every dependency and report the outcome of each
///
/// All dependencies are probed before failing so the user sees the complete
/// list of missing tools at once.
pub fn check_dependencies(
    deps: &[Dependency],
    reporter: &dyn Reporter,
) -> Result<Vec<DependencyProbeResult>, BuildError> {
    reporter.header("DEPENDENCIES CHECK");

    let mut results = Vec::with_capacity(deps.len());
    let mut missing = Vec::new();

    for dep in deps {
        let result = probe(&dep.command, &dep.version_flag);

        if result.exists {
            let signature = result.version_signature.as_deref().unwrap_or("version unknown");
            reporter.success(&format!("✅  {}: {}", result.command, signature));
            if dep.command == "cmake" {
                check_cmake_version(result.version_signature.as_deref(), reporter);
            }
        } else {
            match dep.requirement {
                ToolRequirement::Required => {
                    reporter.error(&format!("❌  {} not found", dep.command));
                    missing.push(dep.command.clone());
                }
                ToolRequirement::Optional => {
                    reporter.warning(&format!("⚠️  {} not found", dep.command));
                }
            }
            if let Some(hint) = hints::for_command(&dep.command) {
                reporter.info(hint);
            }
        }

        results.push(result);
    }

    if !missing.is_empty() {
        return Err(BuildError::MissingDependency { tools: missing });
    }

    Ok(results)
}

/// Extract `major.minor` from a version signature
pub fn parse_version(signature: &str) -> Option<(u32, u32)> {
    static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VERSION
        .get_or_init(|| Regex::new(r"(\d+)\.(\d+)").ok())
        .as_ref()?;
    let caps = re.captures(signature)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}

fn check_cmake_version(signature: Option<&str>, reporter: &dyn Reporter) {
    if let Some((major, minor)) = signature.and_then(parse_version) {
        if (major, minor) < MIN_CMAKE_VERSION {
            reporter.warning(&format!(
                "CMake version {}.{} is old. Recommended: {}.{}+",
                major, minor, MIN_CMAKE_VERSION.0, MIN_CMAKE_VERSION.1
            ));
        }
    }
}
