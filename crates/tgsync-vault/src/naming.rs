//! Path and file name helpers shared by notes and stored attachments

use chrono::{DateTime, Local, Utc};
use regex::Regex;
use std::sync::LazyLock;

static ILLEGAL_FILE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\n\r]"#).expect("valid file name regex"));

/// Replace characters that are illegal in file names with `_`
pub fn sanitize_file_name(name: &str) -> String {
    ILLEGAL_FILE_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// First `count` characters of `text` (not bytes)
pub fn leading_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Note title derived from free text: sanitized first 20 characters
pub fn note_title(text: &str) -> String {
    sanitize_file_name(leading_chars(text, 20))
}

/// Collapse repeated separators, drop leading and trailing slashes and
/// replace non-breaking spaces, the way the vault addresses files.
pub fn normalize_path(path: &str) -> String {
    path.replace(['\u{00A0}', '\u{202F}'], " ")
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a folder (possibly empty) and a file name into a vault path
pub fn join(folder: &str, name: &str) -> String {
    if folder.trim().is_empty() {
        normalize_path(name)
    } else {
        normalize_path(&format!("{}/{}", folder, name))
    }
}

/// `YYYYMMDD` in local time
pub fn date_string(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y%m%d").to_string()
}

/// `HHMMSS` in local time
pub fn time_string(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%H%M%S").to_string()
}

/// `{base} - {date}{time}{extension}`; `extension` includes its dot
pub fn dated_file_name(base: &str, date: &str, time: &str, extension: &str) -> String {
    format!("{} - {}{}{}", base, date, time, extension)
}
