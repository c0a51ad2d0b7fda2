//! Output formatting utilities for the console
//!
//! Renders kernel output (results, errors) as terminal text and prints
//! the launcher's own status messages.

use std::io::Write;

use jk_protocol::content::ErrorContent;

/// Format an execution result behind its output prefix
///
/// Multi-line results start on a fresh line when there is a prefix, so the
/// first row stays aligned with the rest.
pub fn format_result(out_prompt: &str, text: &str) -> String {
    if !out_prompt.is_empty() && text.contains('\n') {
        format!("{}\n{}", out_prompt, text)
    } else {
        format!("{}{}", out_prompt, text)
    }
}

/// Format a kernel error, preferring its traceback
pub fn format_error(error: &ErrorContent) -> String {
    if error.traceback.is_empty() {
        format!("{}: {}", error.ename, error.evalue)
    } else {
        error.traceback.join("\n")
    }
}

/// Write kernel stream text to stdout or stderr as-is
pub fn write_stream(text: &str, to_stderr: bool) {
    if to_stderr {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    } else {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr with red coloring for error feedback to the user.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
