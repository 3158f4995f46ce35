//! Colored terminal output for the server banner and errors.

use std::fmt::Display;

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    dim: Style,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    /// Create a new output formatter writing to stderr.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            dim: Style::new().dim(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print an indented `label: value` line with a dimmed label.
    pub(crate) fn setting(&self, label: &str, value: impl Display) {
        let _ = self.term.write_line(&self.setting_line(label, value));
    }

    fn setting_line(&self, label: &str, value: impl Display) -> String {
        format!("  {} {value}", self.dim.apply_to(format!("{label}:")))
    }

    /// Print a completion message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_setting_line() {
        console::set_colors_enabled(false);
        let output = Output::new();

        assert_eq!(
            output.setting_line("Address", "http://127.0.0.1:8080"),
            "  Address: http://127.0.0.1:8080"
        );
    }
}
