//! CLI argument parsing using clap derive macros

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use crate::build::BuildContext;
use crate::config::{BuildConfiguration, ProjectFile};
use crate::utils::terminal::{self, ConsoleReporter};

/// cmbuild - CMake build driver
///
/// Checks the toolchain, configures the project with CMake and builds it.
/// `build/_deps` (fetched third-party sources) survives `--clean`.
#[derive(Parser, Debug)]
#[command(name = "cmbuild")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("action").args(["clean", "clean_all", "make"])))]
pub struct Cli {
    /// Clean the build directory, keeping the dependency cache
    #[arg(short = 'c', long)]
    pub clean: bool,

    /// Remove the build directory including the dependency cache
    #[arg(long)]
    pub clean_all: bool,

    /// Run the build step only, skipping dependency checks and configure
    #[arg(short, long)]
    pub make: bool,

    /// Build type (debug, release)
    #[arg(long, env = "CMBUILD_BUILD_TYPE")]
    pub build_type: Option<String>,

    /// Shorthand for --build-type debug, wins over --build-type
    #[arg(short, long, conflicts_with = "release")]
    pub debug: bool,

    /// Shorthand for --build-type release, wins over --build-type
    #[arg(short, long)]
    pub release: bool,

    /// C compiler (gcc, clang, icc, icx)
    #[arg(long, env = "CMBUILD_C_COMPILER")]
    pub c_compiler: Option<String>,

    /// C++ compiler (g++, clang++, icpc, icpx)
    #[arg(long, env = "CMBUILD_CXX_COMPILER")]
    pub cxx_compiler: Option<String>,

    /// C standard (89, 90, ANSI, ISO, 11, 17, 23)
    #[arg(long, env = "CMBUILD_C_STANDARD")]
    pub c_standard: Option<String>,

    /// C++ standard (11, 14, 17, 20, 23)
    #[arg(long, env = "CMBUILD_CXX_STANDARD")]
    pub cxx_standard: Option<String>,

    /// CMake generator (Unix Makefiles, Ninja, Xcode, Visual Studio 16 2019)
    #[arg(short = 'G', long, env = "CMBUILD_GENERATOR")]
    pub generator: Option<String>,

    /// Extra CMake cache entry passed as -DNAME=VALUE (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,

    /// Number of parallel build jobs (default: number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        if self.no_color {
            terminal::set_colors(false);
        }
        init_tracing(self.verbose);

        let project_root =
            std::env::current_dir().context("Failed to get current working directory")?;
        let file = ProjectFile::load(&project_root)?;

        // Everything is validated before the first filesystem change or subprocess.
        let config = self.resolve_configuration(file.as_ref())?;
        tracing::debug!("resolved configuration: {:?}", config);

        let mut ctx = BuildContext::new(&project_root, config, file.as_ref());
        ctx.jobs = self.jobs;
        let reporter = ConsoleReporter;

        if self.clean {
            ctx.clean(&reporter)?;
        } else if self.clean_all {
            ctx.clean_all(&reporter)?;
        } else if self.make {
            ctx.build_only(&reporter)?;
        } else {
            ctx.configure_and_build(&reporter)?;
        }
        Ok(())
    }

    /// Layer defaults, cmbuild.toml and flags into one validated configuration
    pub fn resolve_configuration(&self, file: Option<&ProjectFile>) -> Result<BuildConfiguration> {
        let mut config = BuildConfiguration::new();

        if let Some(file) = file {
            config.apply_project_file(file)?;
        }

        if let Some(v) = &self.build_type {
            config.set_build_type(v)?;
        }
        if self.debug {
            config.set_build_type("debug")?;
        }
        if self.release {
            config.set_build_type("release")?;
        }
        if let Some(v) = &self.c_compiler {
            config.set_c_compiler(v)?;
        }
        if let Some(v) = &self.cxx_compiler {
            config.set_cxx_compiler(v)?;
        }
        if let Some(v) = &self.c_standard {
            config.set_c_standard(v)?;
        }
        if let Some(v) = &self.cxx_standard {
            config.set_cxx_standard(v)?;
        }
        if let Some(v) = &self.generator {
            config.set_generator(v)?;
        }
        for define in &self.defines {
            config.push_define(define)?;
        }

        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cmbuild=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildType, CCompiler, CxxStandard, Generator};
    use crate::error::BuildError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cmbuild").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "--c-compiler",
            "clang",
            "--cxx-compiler",
            "clang++",
            "--generator",
            "Ninja",
            "--debug",
            "-D",
            "ENABLE_TESTS=ON",
        ]);
        let config = cli.resolve_configuration(None).unwrap();
        assert_eq!(config.build_type(), BuildType::Debug);
        assert_eq!(config.c_compiler(), CCompiler::Clang);
        assert_eq!(config.generator(), Generator::Ninja);
        assert_eq!(config.extra_defines(), ["ENABLE_TESTS=ON"]);
    }

    #[test]
    fn test_flags_override_project_file() {
        let file: ProjectFile = toml::from_str(
            "[build]\nbuild_type = \"debug\"\ncxx_standard = \"17\"\ngenerator = \"Ninja\"\n",
        )
        .unwrap();
        let cli = parse(&["--release", "--generator", "Unix Makefiles"]);
        let config = cli.resolve_configuration(Some(&file)).unwrap();
        assert_eq!(config.build_type(), BuildType::Release);
        assert_eq!(config.cxx_standard(), CxxStandard::Cxx17);
        assert_eq!(config.generator(), Generator::UnixMakefiles);
    }

    #[test]
    fn test_invalid_value_is_configuration_error() {
        let cli = parse(&["--c-standard", "99"]);
        let err = cli.resolve_configuration(None).unwrap_err();
        let err = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(err, BuildError::InvalidConfiguration { axis: "C standard", .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_actions_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["cmbuild", "--clean", "--clean-all"]).is_err());
        assert!(Cli::try_parse_from(["cmbuild", "--clean", "--make"]).is_err());
        assert!(Cli::try_parse_from(["cmbuild", "--debug", "--release"]).is_err());
    }

    #[test]
    fn test_shorthand_wins_over_build_type() {
        let cli = parse(&["--build-type", "release", "--debug"]);
        let config = cli.resolve_configuration(None).unwrap();
        assert_eq!(config.build_type(), BuildType::Debug);
    }
}
