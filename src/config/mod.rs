//! Build configuration
//!
//! Each configurable axis is a closed enumeration. Raw strings from the
//! command line, the environment or `cmbuild.toml` are parsed exactly once,
//! in the setters of [`BuildConfiguration`]; anything outside an axis'
//! allow-list is rejected with [`BuildError::InvalidConfiguration`].

pub mod project_toml;

use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

pub use project_toml::ProjectFile;

/// Declares a closed axis whose accepted spellings are matched exactly
macro_rules! closed_axis {
    (
        $(#[$meta:meta])*
        $name:ident, $axis:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every accepted value, in display order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical spelling
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Accepted spellings, for help and error messages
            pub fn allowed() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = BuildError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| BuildError::invalid($axis, s, &Self::allowed()))
            }
        }
    };
}

/// CMake build type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = BuildError;

    /// Case-insensitive; always normalizes to the capitalized form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            _ => Err(BuildError::invalid("build type", s, &["debug", "release"])),
        }
    }
}

closed_axis! {
    /// C compiler driver
    CCompiler, "C compiler" {
        Gcc => "gcc",
        Clang => "clang",
        Icc => "icc",
        Icx => "icx",
    }
}

closed_axis! {
    /// C++ compiler driver
    CxxCompiler, "C++ compiler" {
        Gxx => "g++",
        Clangxx => "clang++",
        Icpc => "icpc",
        Icpx => "icpx",
    }
}

closed_axis! {
    /// C language standard
    CStandard, "C standard" {
        C89 => "89",
        C90 => "90",
        /// ANSI C, the same language as C89/C90
        Ansi => "ANSI",
        /// ISO C90
        Iso => "ISO",
        C11 => "11",
        C17 => "17",
        C23 => "23",
    }
}

closed_axis! {
    /// C++ language standard
    CxxStandard, "C++ standard" {
        Cxx11 => "11",
        Cxx14 => "14",
        Cxx17 => "17",
        Cxx20 => "20",
        Cxx23 => "23",
    }
}

closed_axis! {
    /// CMake generator
    Generator, "generator" {
        UnixMakefiles => "Unix Makefiles",
        Ninja => "Ninja",
        Xcode => "Xcode",
        VisualStudio2019 => "Visual Studio 16 2019",
    }
}

impl CStandard {
    /// Value understood by `CMAKE_C_STANDARD`
    ///
    /// CMake only knows `90` for the C89/C90/ANSI/ISO family.
    pub fn cmake_value(&self) -> &'static str {
        match self {
            CStandard::C89 | CStandard::C90 | CStandard::Ansi | CStandard::Iso => "90",
            CStandard::C11 => "11",
            CStandard::C17 => "17",
            CStandard::C23 => "23",
        }
    }
}

impl Generator {
    /// Whether the build step is driven by Ninja
    pub fn is_ninja(&self) -> bool {
        matches!(self, Generator::Ninja)
    }

    /// Program that executes the generated build files
    pub fn build_program(&self) -> &'static str {
        if self.is_ninja() {
            "ninja"
        } else {
            "make"
        }
    }
}

/// The full set of choices for one invocation
///
/// Starts from defaults and is then overridden field by field through the
/// validating setters. It is never partially valid: a rejected value leaves
/// the previous one in place and the caller aborts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    build_type: BuildType,
    c_compiler: CCompiler,
    cxx_compiler: CxxCompiler,
    c_standard: CStandard,
    cxx_standard: CxxStandard,
    generator: Generator,
    extra_defines: Vec<String>,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            build_type: BuildType::Release,
            c_compiler: CCompiler::Gcc,
            cxx_compiler: CxxCompiler::Gxx,
            c_standard: CStandard::C23,
            cxx_standard: CxxStandard::Cxx23,
            generator: Generator::UnixMakefiles,
            extra_defines: Vec::new(),
        }
    }
}

impl BuildConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_type(&self) -> BuildType {
        self.build_type
    }

    pub fn c_compiler(&self) -> CCompiler {
        self.c_compiler
    }

    pub fn cxx_compiler(&self) -> CxxCompiler {
        self.cxx_compiler
    }

    pub fn c_standard(&self) -> CStandard {
        self.c_standard
    }

    pub fn cxx_standard(&self) -> CxxStandard {
        self.cxx_standard
    }

    pub fn generator(&self) -> Generator {
        self.generator
    }

    pub fn extra_defines(&self) -> &[String] {
        &self.extra_defines
    }

    pub fn set_build_type(&mut self, value: &str) -> Result<(), BuildError> {
        self.build_type = value.parse()?;
        Ok(())
    }

    pub fn set_c_compiler(&mut self, value: &str) -> Result<(), BuildError> {
        self.c_compiler = value.parse()?;
        Ok(())
    }

    pub fn set_cxx_compiler(&mut self, value: &str) -> Result<(), BuildError> {
        self.cxx_compiler = value.parse()?;
        Ok(())
    }

    pub fn set_c_standard(&mut self, value: &str) -> Result<(), BuildError> {
        self.c_standard = value.parse()?;
        Ok(())
    }

    pub fn set_cxx_standard(&mut self, value: &str) -> Result<(), BuildError> {
        self.cxx_standard = value.parse()?;
        Ok(())
    }

    pub fn set_generator(&mut self, value: &str) -> Result<(), BuildError> {
        self.generator = value.parse()?;
        Ok(())
    }

    /// Append a `NAME=VALUE` cache definition passed through to CMake
    pub fn push_define(&mut self, define: &str) -> Result<(), BuildError> {
        match define.split_once('=') {
            Some((name, _)) if !name.trim().is_empty() => {
                self.extra_defines.push(define.to_string());
                Ok(())
            }
            _ => Err(BuildError::invalid("define", define, &["NAME=VALUE"])),
        }
    }

    /// Apply defaults from `cmbuild.toml`, leaving unset keys untouched
    pub fn apply_project_file(&mut self, file: &ProjectFile) -> Result<(), BuildError> {
        let build = &file.build;
        if let Some(v) = &build.build_type {
            self.set_build_type(v)?;
        }
        if let Some(v) = &build.c_compiler {
            self.set_c_compiler(v)?;
        }
        if let Some(v) = &build.cxx_compiler {
            self.set_cxx_compiler(v)?;
        }
        if let Some(v) = &build.c_standard {
            self.set_c_standard(v)?;
        }
        if let Some(v) = &build.cxx_standard {
            self.set_cxx_standard(v)?;
        }
        if let Some(v) = &build.generator {
            self.set_generator(v)?;
        }
        for define in &build.defines {
            self.push_define(define)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfiguration::new();
        assert_eq!(config.build_type(), BuildType::Release);
        assert_eq!(config.c_compiler(), CCompiler::Gcc);
        assert_eq!(config.cxx_compiler(), CxxCompiler::Gxx);
        assert_eq!(config.c_standard(), CStandard::C23);
        assert_eq!(config.cxx_standard(), CxxStandard::Cxx23);
        assert_eq!(config.generator(), Generator::UnixMakefiles);
        assert!(config.extra_defines().is_empty());
    }

    #[test]
    fn test_build_type_is_case_insensitive() {
        for input in ["debug", "Debug", "DEBUG", "dEbUg"] {
            let mut config = BuildConfiguration::new();
            config.set_build_type(input).unwrap();
            assert_eq!(config.build_type(), BuildType::Debug);
            assert_eq!(config.build_type().to_string(), "Debug");
        }
        for input in ["release", "Release", "RELEASE"] {
            let mut config = BuildConfiguration::new();
            config.set_build_type("debug").unwrap();
            config.set_build_type(input).unwrap();
            assert_eq!(config.build_type().to_string(), "Release");
        }
    }

    #[test]
    fn test_every_allowed_value_is_accepted() {
        let mut config = BuildConfiguration::new();
        for v in ["gcc", "clang", "icc", "icx"] {
            config.set_c_compiler(v).unwrap();
            assert_eq!(config.c_compiler().as_str(), v);
        }
        for v in ["g++", "clang++", "icpc", "icpx"] {
            config.set_cxx_compiler(v).unwrap();
            assert_eq!(config.cxx_compiler().as_str(), v);
        }
        for v in ["89", "90", "ANSI", "ISO", "11", "17", "23"] {
            config.set_c_standard(v).unwrap();
            assert_eq!(config.c_standard().as_str(), v);
        }
        for v in ["11", "14", "17", "20", "23"] {
            config.set_cxx_standard(v).unwrap();
            assert_eq!(config.cxx_standard().as_str(), v);
        }
        for v in ["Unix Makefiles", "Ninja", "Xcode", "Visual Studio 16 2019"] {
            config.set_generator(v).unwrap();
            assert_eq!(config.generator().as_str(), v);
        }
    }

    #[test]
    fn test_values_outside_allow_list_are_rejected() {
        let mut config = BuildConfiguration::new();
        let before = config.clone();

        assert!(config.set_build_type("profile").is_err());
        assert!(config.set_c_compiler("tcc").is_err());
        assert!(config.set_c_compiler("g++").is_err());
        assert!(config.set_cxx_compiler("gcc").is_err());
        assert!(config.set_c_standard("99").is_err());
        assert!(config.set_cxx_standard("98").is_err());
        assert!(config.set_generator("ninja").is_err());
        assert!(config.set_generator("Visual Studio 17 2022").is_err());

        assert_eq!(config, before);
    }

    #[test]
    fn test_rejection_names_axis_and_choices() {
        let err = "msvc".parse::<CCompiler>().unwrap_err();
        match err {
            BuildError::InvalidConfiguration { axis, value, allowed } => {
                assert_eq!(axis, "C compiler");
                assert_eq!(value, "msvc");
                assert_eq!(allowed, vec!["gcc", "clang", "icc", "icx"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_c_standard_cmake_encoding() {
        assert_eq!(CStandard::C89.cmake_value(), "90");
        assert_eq!(CStandard::Ansi.cmake_value(), "90");
        assert_eq!(CStandard::Iso.cmake_value(), "90");
        assert_eq!(CStandard::C17.cmake_value(), "17");
        assert_eq!(CStandard::C23.cmake_value(), "23");
    }

    #[test]
    fn test_generator_build_program() {
        assert_eq!(Generator::Ninja.build_program(), "ninja");
        assert_eq!(Generator::UnixMakefiles.build_program(), "make");
        assert_eq!(Generator::Xcode.build_program(), "make");
        assert_eq!(Generator::VisualStudio2019.build_program(), "make");
    }

    #[test]
    fn test_defines_keep_order_and_require_name() {
        let mut config = BuildConfiguration::new();
        config.push_define("ENABLE_TESTS=ON").unwrap();
        config.push_define("PREFIX=").unwrap();
        assert!(config.push_define("NO_VALUE").is_err());
        assert!(config.push_define("=ON").is_err());
        assert_eq!(config.extra_defines(), ["ENABLE_TESTS=ON", "PREFIX="]);
    }

    #[test]
    fn test_apply_project_file() {
        let file: ProjectFile = toml::from_str(
            r#"
            [build]
            build_type = "DEBUG"
            c_compiler = "clang"
            generator = "Ninja"
            defines = ["A=1"]
            "#,
        )
        .unwrap();

        let mut config = BuildConfiguration::new();
        config.apply_project_file(&file).unwrap();
        assert_eq!(config.build_type(), BuildType::Debug);
        assert_eq!(config.c_compiler(), CCompiler::Clang);
        assert_eq!(config.cxx_compiler(), CxxCompiler::Gxx);
        assert_eq!(config.generator(), Generator::Ninja);
        assert_eq!(config.extra_defines(), ["A=1"]);
    }

    #[test]
    fn test_apply_project_file_rejects_bad_value() {
        let file: ProjectFile = toml::from_str("[build]\ncxx_standard = \"98\"\n").unwrap();
        let mut config = BuildConfiguration::new();
        assert!(matches!(
            config.apply_project_file(&file),
            Err(BuildError::InvalidConfiguration { axis: "C++ standard", .. })
        ));
    }
}
