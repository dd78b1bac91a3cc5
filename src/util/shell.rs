//! Console status output.
//!
//! Every user-facing line goes through [`Shell`], formatted as
//! `{status:>12} [tag] message`. The tag is an architecture or ABI name.
//! Long-running external steps get a spinner in normal mode; verbose mode
//! streams the tool output instead, and quiet mode prints errors only.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// How much the shell prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Status lines and spinners
    #[default]
    Normal,
    /// Status lines; tool output is streamed, so no spinners
    Verbose,
}

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Only when stderr is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            other => Err(format!(
                "unknown color mode `{}`; use auto, always or never",
                other
            )),
        }
    }
}

/// Label printed in the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Finished,
    Installed,
    Building,
    Cleaning,
    Configuring,
    Injecting,
    Compiling,
    Installing,
    Verifying,
    Info,
    Warning,
    Error,
}

const GREEN: &str = "\x1b[1;32m";
const CYAN: &str = "\x1b[1;36m";
const BLUE: &str = "\x1b[1;34m";
const YELLOW: &str = "\x1b[1;33m";
const RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

impl Status {
    /// Label and ANSI color.
    fn style(&self) -> (&'static str, &'static str) {
        match self {
            Status::Finished => ("Finished", GREEN),
            Status::Installed => ("Installed", GREEN),
            Status::Building => ("Building", CYAN),
            Status::Cleaning => ("Cleaning", CYAN),
            Status::Configuring => ("Configuring", CYAN),
            Status::Injecting => ("Injecting", CYAN),
            Status::Compiling => ("Compiling", CYAN),
            Status::Installing => ("Installing", CYAN),
            Status::Verifying => ("Verifying", CYAN),
            Status::Info => ("Info", BLUE),
            Status::Warning => ("Warning", YELLOW),
            Status::Error => ("error", RED),
        }
    }
}

/// Width of the right-aligned status column.
const LABEL_WIDTH: usize = 12;

/// Console output for one abuild invocation.
#[derive(Debug, Default)]
pub struct Shell {
    verbosity: Verbosity,
    color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let color = match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stderr().is_terminal(),
        };
        Shell { verbosity, color }
    }

    /// Shell for the `--quiet`/`--verbose` flags; quiet wins.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };
        Shell::new(verbosity, color)
    }

    /// Same color handling, different verbosity.
    pub fn with_verbosity(&self, verbosity: Verbosity) -> Shell {
        Shell {
            verbosity,
            color: self.color,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print one status line. Quiet mode drops everything but errors.
    pub fn status(&self, status: Status, msg: impl Display) {
        if status != Status::Error && self.is_quiet() {
            return;
        }
        eprintln!("{} {}", self.label(status), msg);
    }

    /// Print a status line prefixed with `[tag]`.
    pub fn status_tagged(&self, status: Status, tag: &str, msg: impl Display) {
        self.status(status, format_args!("[{}] {}", tag, msg));
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn label(&self, status: Status) -> String {
        let (text, color) = status.style();
        if self.color {
            format!("{}{:>w$}{}", color, text, RESET, w = LABEL_WIDTH)
        } else {
            format!("{:>w$}", text, w = LABEL_WIDTH)
        }
    }

    /// Spinner shown while an external step blocks.
    ///
    /// Normal mode on a terminal only. Cleared when the guard drops.
    pub fn spinner(&self, msg: impl Display) -> Spinner {
        if self.verbosity != Verbosity::Normal || !io::stderr().is_terminal() {
            return Spinner { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(msg.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Spinner { bar: Some(bar) }
    }
}

/// Guard returned by [`Shell::spinner`].
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
