//! cmbuild.toml parsing
//!
//! The file is optional and only supplies defaults; command-line flags and
//! environment variables override it. Values stay raw strings here and are
//! validated by the [`BuildConfiguration`](super::BuildConfiguration) setters.
//!
//! ```toml
//! [project]
//! name = "algorithms"
//!
//! [build]
//! build_type = "debug"
//! generator = "Ninja"
//! defines = ["ENABLE_TESTS=ON"]
//!
//! [dependencies]
//! optional = ["clang-format"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BuildError;

/// File name looked up in the project root
pub const PROJECT_FILE_NAME: &str = "cmbuild.toml";

/// Root of cmbuild.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub dependencies: DependenciesSection,
}

/// `[project]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Display name used in status messages
    pub name: Option<String>,
}

/// `[build]` defaults, one key per configuration axis
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    pub build_type: Option<String>,
    pub c_compiler: Option<String>,
    pub cxx_compiler: Option<String>,
    pub c_standard: Option<String>,
    pub cxx_standard: Option<String>,
    pub generator: Option<String>,
    #[serde(default)]
    pub defines: Vec<String>,
}

/// `[dependencies]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependenciesSection {
    /// Extra tools probed without failing the build when missing
    #[serde(default)]
    pub optional: Vec<String>,
}

impl ProjectFile {
    /// Load `cmbuild.toml` from the project root, if present
    pub fn load(project_root: &Path) -> Result<Option<Self>, BuildError> {
        let path = project_root.join(PROJECT_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| config_error(&path, e))?;
        let file = toml::from_str(&content).map_err(|e| config_error(&path, e))?;
        Ok(Some(file))
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> BuildError {
    BuildError::ConfigFile {
        path: PathBuf::from(path),
        message: err.to_string(),
    }
}
