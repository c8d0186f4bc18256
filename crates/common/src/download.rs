// Download filenames for exported documents.

/// Extension appended when a name carries none.
pub const DEFAULT_EXTENSION: &str = "js";

/// Derive a download filename from a document name.
///
/// A name with an extension marker (a `.` that is neither leading nor
/// trailing) is used as-is; otherwise `default_extension` is appended.
/// Path separators are replaced so the result is always a single component.
pub fn download_filename(name: &str, default_extension: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let base = if sanitized.is_empty() { "untitled".to_string() } else { sanitized };

    if has_extension(&base) {
        return base;
    }
    let extension = default_extension.trim_start_matches('.');
    if extension.is_empty() {
        return base;
    }
    format!("{base}.{extension}")
}

fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(idx) => idx > 0 && idx + 1 < name.len(),
        None => false,
    }
}
