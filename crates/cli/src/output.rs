// Command output: human text on a terminal, one JSON object per line when
// piped or when `--json` is given. Errors and warnings go to stderr.

use boardpad_common::share::ShareError;
use boardpad_session::config::ConfigError;
use boardpad_session::controller::SessionError;
use boardpad_session::store::StoreError;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (tables, colors, etc.).
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
///
/// - `Human`: calls `human_fn` to produce a human-readable string.
/// - `Json`: serializes `value` as JSON.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Human => {
            writeln!(out, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut out, value).map_err(io::Error::other)?;
            writeln!(out)
        }
    }
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(
                "warning",
                message,
                io::stderr().is_terminal(),
                ANSI_YELLOW,
            );
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "warning": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Write an informational line to stderr in the selected format.
pub fn print_info(format: OutputFormat, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let _ = writeln!(err, "{message}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "info": { "message": message } });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if let Some(store_err) = cause.downcast_ref::<StoreError>() {
            return store_error(store_err);
        }
        if let Some(session_err) = cause.downcast_ref::<SessionError>() {
            return match session_err {
                SessionError::Store(inner) => store_error(inner),
                SessionError::Share(inner) => share_error(inner),
                SessionError::VersionLoading => (
                    "VERSION_LOADING",
                    "A board library version is still loading. Try again in a moment.".into(),
                ),
                SessionError::Import { path, reason } => {
                    ("IMPORT_FAILED", format!("Could not read {path}: {reason}"))
                }
                _ => ("SESSION_ERROR", message),
            };
        }
        if let Some(share_err) = cause.downcast_ref::<ShareError>() {
            return share_error(share_err);
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return (
                "CONFIG_ERROR",
                format!("{message}. Check ~/.boardpad/config.toml or pass --config"),
            );
        }
    }

    ("ERROR", message)
}

fn store_error(error: &StoreError) -> (&'static str, String) {
    let message = match error {
        StoreError::NotFound(id) => {
            format!("Document {id} not found. Run: boardpad ls to see stored documents")
        }
        StoreError::QuotaExceeded(_) => {
            "Storage is full. Export or delete some documents, then try again.".to_string()
        }
        StoreError::CorruptedRecord { id, reason } => {
            format!("Document {id} is unreadable ({reason}). Remove it with: boardpad rm {id}")
        }
        other => other.to_string(),
    };
    (error.code(), message)
}

fn share_error(error: &ShareError) -> (&'static str, String) {
    match error {
        ShareError::Encoding(_) => ("SHARE_ENCODING_FAILED", error.to_string()),
        ShareError::Decoding { .. } => {
            ("INVALID_SHARE", format!("Share link could not be decoded: {error}"))
        }
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        // --json should force JSON even when detect() would normally check
        // the real stdout. We test the flag logic directly.
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Saved {
            id: String,
        }
        let saved = Saved { id: "1-abc".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &saved, |s| format!("Saved {}", s.id))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Saved 1-abc\n");
    }

    #[test]
    fn write_output_json_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
            count: u32,
        }
        let info = Info { name: "orbit".into(), count: 42 };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &info, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        // Should be valid JSON followed by a newline.
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["name"], "orbit");
        assert_eq!(parsed["count"], 42);
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true, ANSI_RED);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_warning_without_tty_is_plain() {
        let line = render_human_stderr_line("warning", "careful", false, ANSI_YELLOW);
        assert_eq!(line, "warning: careful");
    }

    #[test]
    fn actionable_error_not_found_points_to_ls() {
        let err = anyhow::Error::new(StoreError::NotFound("1-abc".into()));
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "NOT_FOUND");
        assert!(message.contains("1-abc"));
        assert!(message.contains("boardpad ls"));
    }

    #[test]
    fn actionable_error_quota_suggests_cleanup() {
        let err = anyhow::Error::new(StoreError::QuotaExceeded("too big".into()));
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "QUOTA_EXCEEDED");
        assert!(message.contains("Export or delete"));
    }

    #[test]
    fn actionable_error_corrupted_suggests_rm() {
        let err = anyhow::Error::new(StoreError::CorruptedRecord {
            id: "7-bad".into(),
            reason: "expected value".into(),
        });
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "CORRUPTED_RECORD");
        assert!(message.contains("boardpad rm 7-bad"));
    }

    #[test]
    fn actionable_error_unwraps_session_store_error() {
        let err = anyhow::Error::new(SessionError::Store(StoreError::NotFound("x".into())));
        assert_eq!(actionable_error(&err).0, "NOT_FOUND");
    }

    #[test]
    fn actionable_error_share_failure() {
        let share_err = boardpad_common::share::decode("%%%").unwrap_err();
        let err = anyhow::Error::new(share_err).context("failed to read share link");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "INVALID_SHARE");
        assert!(message.contains("could not be decoded"));
    }

    #[test]
    fn actionable_error_generic_keeps_message() {
        let err = anyhow::anyhow!("something went wrong");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "ERROR");
        assert_eq!(message, "something went wrong");
    }
}
