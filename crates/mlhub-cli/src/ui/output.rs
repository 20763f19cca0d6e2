//! Terminal reporter.
//!
//! Status lines go to stdout, warnings and errors to stderr. Download
//! progress redraws a single stderr line when stderr is a terminal and is
//! silent otherwise. In quiet mode only warnings and errors are printed.

use std::io::{IsTerminal, Write};

use crossterm::style::Stylize;
use mlhub_core::Reporter;

use super::theme::{Icons, format_progress_bar, format_size};

/// A cloneable handle for printing status to the terminal.
#[derive(Debug, Clone)]
pub struct Output {
    quiet: bool,
    icons: Icons,
    live: bool,
}

impl Output {
    /// Create a new output handle.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            icons: Icons::default(),
            live: std::io::stderr().is_terminal(),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{} {}", title.bold(), "─".repeat(40).dark_grey());
    }

    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        if self.quiet || !self.live {
            return;
        }
        let line = match total.filter(|&t| t > 0) {
            Some(total) => {
                let pct = (current * 100 / total).min(100);
                format!(
                    "{} {name}  {}  {pct:>3}%  {}",
                    self.icons.active.red(),
                    format_progress_bar(current, total, 24),
                    format_size(total)
                )
            }
            None => format!("{} {name}  {}", self.icons.active.red(), format_size(current)),
        };
        let mut err = std::io::stderr();
        let _ = write!(err, "\r{line}");
        if total.is_some_and(|t| current >= t) {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    }

    fn extracting(&self, name: &str) {
        if !self.quiet {
            println!("  {} Extracting {name}", self.icons.info);
        }
    }

    fn installing(&self, name: &str, detail: &str) {
        if !self.quiet {
            println!("  {} {} {}", self.icons.active.red(), name.cyan(), detail);
        }
    }

    fn done(&self, name: &str, detail: &str, size: Option<u64>) {
        if self.quiet {
            return;
        }
        match size {
            Some(size) => println!(
                "  {} {} {} {}",
                self.icons.success.green(),
                name.cyan(),
                detail,
                format_size(size).dark_grey()
            ),
            None => println!("  {} {} {}", self.icons.success.green(), name.cyan(), detail),
        }
    }

    fn failed(&self, name: &str, reason: &str) {
        eprintln!("  {} {} {}", self.icons.error.red(), name.cyan(), reason.red());
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", self.icons.info);
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{} {}", self.icons.success.green(), msg.green());
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {}", self.icons.warning.yellow(), msg.yellow());
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {}", self.icons.error.red(), msg.red());
    }
}
