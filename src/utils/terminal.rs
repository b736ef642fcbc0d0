//! Terminal output utilities

use console::style;

/// Sink for user-facing status messages
///
/// The build tree and the CMake driver report through this trait instead of
/// printing directly, so they can be exercised without a terminal.
pub trait Reporter {
    /// Print a section banner
    fn header(&self, message: &str);

    /// Print an informational message
    fn info(&self, message: &str);

    /// Print a success message
    fn success(&self, message: &str);

    /// Print a warning message
    fn warning(&self, message: &str);

    /// Print an error message
    fn error(&self, message: &str);
}

/// Colored console reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn header(&self, message: &str) {
        let rule = "=".repeat(60);
        println!("\n{}", style(&rule).cyan());
        println!("  {}", style(message).cyan().bold());
        println!("{}", style(&rule).cyan());
    }

    fn info(&self, message: &str) {
        println!("{}: {}", style("info").blue().bold(), message);
    }

    fn success(&self, message: &str) {
        println!("{}: {}", style("success").green().bold(), message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}: {}", style("warning").yellow().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}: {}", style("error").red().bold(), message);
    }
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
    ConsoleReporter.error(message);
}

/// Enable or disable colors on both output streams
pub fn set_colors(enabled: bool) {
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::Reporter;

    /// Severity of a recorded message
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Header,
        Info,
        Success,
        Warning,
        Error,
    }

    /// Reporter that keeps every message for later assertions
    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        messages: RefCell<Vec<(Level, String)>>,
    }

    impl RecordingReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<(Level, String)> {
            self.messages.borrow().clone()
        }

        pub fn at(&self, level: Level) -> Vec<String> {
            self.messages
                .borrow()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }

        fn push(&self, level: Level, message: &str) {
            self.messages.borrow_mut().push((level, message.to_string()));
        }
    }

    impl Reporter for RecordingReporter {
        fn header(&self, message: &str) {
            self.push(Level::Header, message);
        }

        fn info(&self, message: &str) {
            self.push(Level::Info, message);
        }

        fn success(&self, message: &str) {
            self.push(Level::Success, message);
        }

        fn warning(&self, message: &str) {
            self.push(Level::Warning, message);
        }

        fn error(&self, message: &str) {
            self.push(Level::Error, message);
        }
    }
}
