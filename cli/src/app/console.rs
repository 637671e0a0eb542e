//! Terminal output for deployment progress and logs

use std::fmt::Display;
use std::io::{self, Stdout, Write};

use colored::Colorize;

use crate::deploy::tracker::ProgressSink;
use crate::models::deployment::DeploymentStatus;

/// Writes progress and log lines to a terminal
///
/// Write failures (a closed pipe, typically) are ignored: losing output must
/// not abort a deployment that is already running remotely.
pub struct ConsoleSink<W: Write = Stdout> {
    out: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a success notice
    pub fn success(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{} {}", "✔".green(), message);
    }

    /// Print a warning notice
    pub fn warning(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{} {}", "⚠".yellow(), message);
    }
}

impl<W: Write> ProgressSink for ConsoleSink<W> {
    fn on_line(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }

    fn on_transition(&mut self, status: &DeploymentStatus) {
        let _ = writeln!(self.out, "{} {}", "◷".blue(), status.describe());
    }
}
