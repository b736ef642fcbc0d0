//! Build orchestration
//!
//! ## Architecture
//!
//! ```text
//! CLI → BuildContext → tools::check_dependencies → CMakeInvocation (configure, build)
//!                    ↘ BuildTree (clean, clean-all)
//! ```
//!
//! ## Modules
//!
//! - `tree` - Build directory lifecycle with dependency-cache preserving clean
//! - `cmake` - CMake configure step and generator-specific build step

pub mod cmake;
pub mod tree;

use std::path::{Path, PathBuf};

use crate::config::{BuildConfiguration, ProjectFile};
use crate::error::BuildError;
use crate::utils::terminal::Reporter;
use crate::utils::tools::{build_dependencies, check_dependencies};

use cmake::CMakeInvocation;
use tree::{BuildTree, TreeState};

/// Environment variable overriding where `_deps` is stashed during a clean
pub const STASH_DIR_ENV: &str = "CMBUILD_STASH_DIR";

/// Everything one invocation of the tool works on
#[derive(Debug)]
pub struct BuildContext {
    /// Project root directory (where CMakeLists.txt is located)
    pub project_root: PathBuf,
    /// Display name of the project
    pub project_name: String,
    /// Resolved build configuration
    pub config: BuildConfiguration,
    /// Build tree under the project root
    pub tree: BuildTree,
    /// Extra tools probed as optional dependencies
    pub optional_tools: Vec<String>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

impl BuildContext {
    /// Create a context for `project_root` with an already resolved configuration
    pub fn new(project_root: &Path, config: BuildConfiguration, file: Option<&ProjectFile>) -> Self {
        let project_name = file
            .and_then(|f| f.project.name.clone())
            .or_else(|| {
                project_root
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "project".to_string());
        let optional_tools = file
            .map(|f| f.dependencies.optional.clone())
            .unwrap_or_default();

        let mut tree = BuildTree::new(project_root);
        if let Some(dir) = std::env::var_os(STASH_DIR_ENV) {
            tree = tree.with_stash_root(dir);
        }

        Self {
            project_root: project_root.to_path_buf(),
            project_name,
            config,
            tree,
            optional_tools,
            jobs: None,
        }
    }

    fn driver(&self) -> CMakeInvocation<'_> {
        let driver = CMakeInvocation::new(&self.config, &self.tree, &self.project_root);
        match self.jobs {
            Some(jobs) => driver.jobs(jobs),
            None => driver,
        }
    }

    /// Probe all tools, configure, then build
    pub fn configure_and_build(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        let deps = build_dependencies(&self.config, &self.optional_tools);
        check_dependencies(&deps, reporter)?;

        reporter.header(&format!("CONFIGURING {}", self.project_name));
        let driver = self.driver();
        driver.configure(reporter)?;

        reporter.header(&format!("BUILDING {}", self.project_name));
        driver.build(reporter)
    }

    /// Run only the build step against an existing configuration
    pub fn build_only(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        reporter.header(&format!("BUILDING {}", self.project_name));
        match self.tree.state() {
            TreeState::Absent => {
                return Err(BuildError::MissingBuildTree {
                    path: self.tree.path().to_path_buf(),
                });
            }
            TreeState::PresentClean => reporter.warning(&format!(
                "{} has not been configured yet; run without --make first",
                self.tree.path().display()
            )),
            TreeState::PresentConfigured => {}
        }
        self.driver().build(reporter)
    }

    /// Clean the build tree, keeping the dependency cache
    pub fn clean(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        reporter.header("CLEAN");
        self.tree.clean(reporter)
    }

    /// Remove the build tree and the dependency cache
    pub fn clean_all(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        reporter.header("CLEAN ALL");
        reporter.warning("Removing the build directory including the dependency cache");
        self.tree.clean_all(reporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::terminal::testing::{Level, RecordingReporter};

    #[test]
    fn test_project_name_defaults_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("algorithms");
        let ctx = BuildContext::new(&root, BuildConfiguration::new(), None);
        assert_eq!(ctx.project_name, "algorithms");
        assert_eq!(ctx.tree.path(), root.join("build"));
        assert!(ctx.optional_tools.is_empty());
    }

    #[test]
    fn test_project_file_overrides_name_and_optional_tools() {
        let file: ProjectFile = toml::from_str(
            "[project]\nname = \"sorting\"\n[dependencies]\noptional = [\"ccache\"]\n",
        )
        .unwrap();
        let ctx = BuildContext::new(Path::new("/work/algo"), BuildConfiguration::new(), Some(&file));
        assert_eq!(ctx.project_name, "sorting");
        assert_eq!(ctx.optional_tools, vec!["ccache".to_string()]);
    }

    #[test]
    fn test_build_only_requires_build_tree() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = BuildContext::new(dir.path(), BuildConfiguration::new(), None);
        let reporter = RecordingReporter::new();

        let err = ctx.build_only(&reporter).unwrap_err();

        match &err {
            BuildError::MissingBuildTree { path } => assert_eq!(path, &dir.path().join("build")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.exit_code(), 1);
        assert!(!ctx.tree.path().exists());
        assert!(reporter.at(Level::Info).is_empty());
    }

    #[test]
    fn test_missing_compiler_stops_before_configure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfiguration::new();
        // Intel compilers are practically never installed on CI hosts.
        config.set_c_compiler("icx").unwrap();
        config.set_cxx_compiler("icpx").unwrap();
        let ctx = BuildContext::new(dir.path(), config, None);
        let reporter = RecordingReporter::new();

        if which::which("icx").is_ok() || which::which("icpx").is_ok() {
            return;
        }

        let err = ctx.configure_and_build(&reporter).unwrap_err();
        assert!(matches!(err, BuildError::MissingDependency { .. }));
        assert!(!ctx.tree.path().exists());
        assert!(!reporter
            .at(Level::Header)
            .iter()
            .any(|h| h.starts_with("CONFIGURING")));
    }
}
