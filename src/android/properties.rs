//! `gradle.properties` upserts
//!
//! Lines are `key=value` (or `key: value`, or `key value`). Comments and
//! unrelated entries are kept byte for byte.

use crate::edit::Edit;

/// Escape a value the way `java.util.Properties` reads it back.
///
/// Gradle loads `gradle.properties` as ISO-8859-1, so anything outside
/// printable ASCII is written as `\uXXXX` (UTF-16 units, surrogate pairs
/// above the BMP).
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' ' if i == 0 => out.push_str("\\ "),
            ' '..='~' => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{unit:04X}"));
                }
            }
        }
    }
    out
}

/// Byte range of the value on the first line defining `key`.
fn find_entry(content: &str, key: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let trimmed = body.trim_start();
        let indent = body.len() - trimmed.len();
        if !trimmed.starts_with('#') && !trimmed.starts_with('!') {
            if let Some(rest) = trimmed.strip_prefix(key) {
                let separator = rest.trim_start_matches([' ', '\t']);
                let value = if let Some(value) = separator.strip_prefix(['=', ':']) {
                    Some(value.trim_start_matches([' ', '\t']))
                } else if separator.len() < rest.len() || rest.is_empty() {
                    Some(separator)
                } else {
                    None
                };
                if let Some(value) = value {
                    let start = offset + indent + (trimmed.len() - value.len());
                    return Some((start, offset + body.len()));
                }
            }
        }
        offset += line.len();
    }
    None
}

/// Edits that set every `(key, value)` pair.
///
/// Keys already holding the value produce no edit. Missing keys are
/// appended together in one insertion, in order.
pub fn upsert_edits(content: &str, entries: &[(&str, &str)]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut appended = String::new();

    for (key, value) in entries {
        let escaped = escape_value(value);
        match find_entry(content, key) {
            Some((start, end)) => {
                let current = &content[start..end];
                if current != escaped {
                    edits.push(Edit::replace(start, end, escaped, current));
                }
            }
            None => appended.push_str(&format!("{key}={escaped}\n")),
        }
    }

    if !appended.is_empty() {
        if !content.is_empty() && !content.ends_with('\n') {
            appended.insert(0, '\n');
        }
        edits.push(Edit::insert(content.len(), appended));
    }
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPERTIES: &str = "# Project-wide Gradle settings.\norg.gradle.jvmargs=-Xmx2048m\nandroid.useAndroidX = true\nhermesEnabled: true\n";

    fn value<'a>(content: &'a str, key: &str) -> Option<&'a str> {
        find_entry(content, key).map(|(start, end)| &content[start..end])
    }

    fn upsert(content: &str, entries: &[(&str, &str)]) -> String {
        Edit::apply_all(content, upsert_edits(content, entries)).unwrap()
    }

    #[test]
    fn test_find_entry_separators() {
        assert_eq!(value(PROPERTIES, "org.gradle.jvmargs"), Some("-Xmx2048m"));
        assert_eq!(value(PROPERTIES, "android.useAndroidX"), Some("true"));
        assert_eq!(value(PROPERTIES, "hermesEnabled"), Some("true"));
        assert_eq!(value(PROPERTIES, "org.gradle"), None);
        assert_eq!(value(PROPERTIES, "Project-wide"), None);
    }

    #[test]
    fn test_upsert_appends_missing_key() {
        let patched = upsert(PROPERTIES, &[("beaconUsername", "a")]);
        assert!(patched.ends_with("hermesEnabled: true\nbeaconUsername=a\n"));
    }

    #[test]
    fn test_upsert_replaces_value_only() {
        let patched = upsert(PROPERTIES, &[("android.useAndroidX", "false")]);
        assert!(patched.contains("android.useAndroidX = false\n"));
    }

    #[test]
    fn test_upsert_same_value_is_noop() {
        assert!(upsert_edits(PROPERTIES, &[("hermesEnabled", "true")]).is_empty());
    }

    #[test]
    fn test_missing_trailing_newline_added_once() {
        assert_eq!(upsert("a=1", &[("b", "2")]), "a=1\nb=2\n");
        assert_eq!(upsert("a=1", &[("b", "2"), ("c", "3")]), "a=1\nb=2\nc=3\n");
    }

    #[test]
    fn test_replace_and_append_together() {
        assert_eq!(
            upsert("b=old\na=1", &[("b", "new"), ("c", "3")]),
            "b=new\na=1\nc=3\n"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_value("p\\w"), "p\\\\w");
        assert_eq!(escape_value(" lead"), "\\ lead");
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape_value("pässwörd"), "p\\u00E4ssw\\u00F6rd");
        assert_eq!(escape_value("a\u{1F511}"), "a\\uD83D\\uDD11");
        assert_eq!(escape_value("bell\u{7}"), "bell\\u0007");
        assert_eq!(escape_value("plain~!"), "plain~!");
    }
}
