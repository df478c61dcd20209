//! Xcode project file model
//!
//! A minimal structured view over `project.pbxproj` text: objects are located
//! by id and section, values and lists are read out of their bodies, and
//! every mutation is a span [`Edit`] so untouched bytes stay exactly as Xcode
//! wrote them.

use crate::edit::Edit;
use crate::patch::PatchError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::path::PathBuf;
use xxhash_rust::xxh3::xxh3_128;

static OBJECT_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([0-9A-Fa-f]{24})(?:[ \t]*/\*[ \t]*(.*?)[ \t]*\*/)?[ \t]*=[ \t]*\{")
        .expect("valid pbx object head regex")
});

static OBJECTS_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*objects[ \t]*=[ \t]*\{[ \t]*\n").expect("valid objects regex"));

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*.*?\*/").expect("valid comment regex"));

static BARE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$./]+$").expect("valid bare value regex"));

/// One `ID /* comment */ = { ... };` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxObject {
    pub id: String,
    pub comment: Option<String>,
    /// Byte range of the text between the braces
    pub body: Range<usize>,
}

/// A `PBXFileReference` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub id: String,
    pub name: Option<String>,
    pub path: Option<String>,
}

/// Parsed view of a `project.pbxproj` file.
#[derive(Debug, Clone)]
pub struct PbxProject {
    path: PathBuf,
    content: String,
}

/// Quote a value the way Xcode does.
pub fn quote_value(value: &str) -> String {
    if BARE_VALUE.is_match(value) {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => raw.to_string(),
    }
}

/// Index just past a quoted string starting at `start` (which holds `"`).
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != b'"' {
        if bytes[i] == b'\\' {
            i += 1;
        }
        i += 1;
    }
    i + 1
}

/// Index just past a `/* */` comment starting at `start`.
fn skip_comment(text: &str, start: usize) -> Option<usize> {
    text[start + 2..].find("*/").map(|end| start + 2 + end + 2)
}

/// Find the delimiter closing the one at `open`, skipping strings and comments.
fn matching(text: &str, open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(text, i)?;
                continue;
            }
            c if c == open_ch => depth += 1,
            c if c == close_ch => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Find `key = ` at nesting depth zero inside `range`, returning the offset
/// of the first byte of the value.
fn find_key(text: &str, range: Range<usize>, key: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = range.start;
    while i < range.end {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(text, i)?;
                continue;
            }
            b'{' | b'(' => depth += 1,
            b'}' | b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && bytes[i..range.end].starts_with(key.as_bytes()) => {
                let boundary_before = i == range.start
                    || matches!(bytes[i - 1], b' ' | b'\t' | b'\n' | b';' | b'{');
                let rest = &text[i + key.len()..range.end];
                let trimmed = rest.trim_start_matches([' ', '\t']);
                if boundary_before && trimmed.starts_with('=') {
                    let after_eq = &trimmed[1..];
                    let value_start =
                        range.end - after_eq.len() + (after_eq.len() - after_eq.trim_start().len());
                    return Some(value_start);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset of the `;` ending the scalar value that starts at `start`.
fn value_end(text: &str, start: usize, limit: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < limit {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(text, i)?;
                continue;
            }
            b';' => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn line_start(text: &str, at: usize) -> usize {
    text[..at].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn indentation_at(text: &str, at: usize) -> &str {
    let start = line_start(text, at);
    let line = &text[start..];
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Split the inside of a `( ... )` list into raw items.
fn split_items(inner: &str) -> Vec<String> {
    let bytes = inner.as_bytes();
    let mut items = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(inner, i).unwrap_or(bytes.len());
                continue;
            }
            b',' => {
                items.push(inner[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    items.push(inner[start.min(inner.len())..].to_string());

    items
        .into_iter()
        .map(|item| COMMENT.replace_all(&item, "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl PbxProject {
    pub fn parse(path: impl Into<PathBuf>, content: impl Into<String>) -> Result<Self, PatchError> {
        let path = path.into();
        let content = content.into();
        if !OBJECTS_OPEN.is_match(&content) {
            return Err(PatchError::ProjectFormat {
                path,
                reason: "no 'objects = {' dictionary".to_string(),
            });
        }
        Ok(Self { path, content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    fn format_error(&self, reason: impl Into<String>) -> PatchError {
        PatchError::ProjectFormat {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn apply(&mut self, edit: Edit) -> Result<(), PatchError> {
        self.content = edit.apply_to(&self.content)?;
        Ok(())
    }

    /// Apply edits computed against the current content in one step.
    pub fn apply_all(&mut self, edits: Vec<Edit>) -> Result<(), PatchError> {
        if !edits.is_empty() {
            self.content = Edit::apply_all(&self.content, edits)?;
        }
        Ok(())
    }

    fn section(&self, isa: &str) -> Option<Range<usize>> {
        let begin = format!("/* Begin {isa} section */");
        let end = format!("/* End {isa} section */");
        let start = self.content.find(&begin)? + begin.len();
        let stop = start + self.content[start..].find(&end)?;
        Some(start..line_start(&self.content, stop))
    }

    fn object_at(&self, head: regex::Captures<'_>) -> Option<PbxObject> {
        let whole = head.get(0)?;
        let open = whole.end() - 1;
        let close = matching(&self.content, open, b'{', b'}')?;
        Some(PbxObject {
            id: head[1].to_string(),
            comment: head.get(2).map(|c| c.as_str().to_string()),
            body: open + 1..close,
        })
    }

    /// Objects declared in the `isa` section, in file order.
    pub fn objects(&self, isa: &str) -> Vec<PbxObject> {
        let Some(range) = self.section(isa) else {
            return Vec::new();
        };
        OBJECT_HEAD
            .captures_iter(&self.content)
            .filter(|caps| caps.get(0).is_some_and(|m| range.contains(&m.start())))
            .filter_map(|caps| self.object_at(caps))
            .collect()
    }

    /// Look up any object by id.
    pub fn object(&self, id: &str) -> Option<PbxObject> {
        OBJECT_HEAD
            .captures_iter(&self.content)
            .find(|caps| &caps[1] == id)
            .and_then(|caps| self.object_at(caps))
    }

    /// Scalar value of `key` directly inside `body`.
    pub fn value(&self, body: &Range<usize>, key: &str) -> Option<String> {
        let start = find_key(&self.content, body.clone(), key)?;
        if matches!(self.content.as_bytes().get(start), Some(b'(' | b'{')) {
            return None;
        }
        let end = value_end(&self.content, start, body.end)?;
        let raw = COMMENT.replace_all(&self.content[start..end], "");
        Some(unquote(&raw))
    }

    /// Raw span of a scalar value (quotes kept, `;` excluded).
    pub fn scalar_range(&self, body: &Range<usize>, key: &str) -> Option<Range<usize>> {
        let start = find_key(&self.content, body.clone(), key)?;
        if matches!(self.content.as_bytes().get(start), Some(b'(' | b'{')) {
            return None;
        }
        let end = value_end(&self.content, start, body.end)?;
        Some(start..self.content[..end].trim_end().len())
    }

    /// Range of the `( ... )` list for `key` inside `body`, parens included.
    fn list_range(&self, body: &Range<usize>, key: &str) -> Option<Range<usize>> {
        let start = find_key(&self.content, body.clone(), key)?;
        if self.content.as_bytes().get(start) != Some(&b'(') {
            return None;
        }
        let close = matching(&self.content, start, b'(', b')')?;
        Some(start..close + 1)
    }

    /// Unquoted items of the list `key` inside `body`.
    pub fn list(&self, body: &Range<usize>, key: &str) -> Option<Vec<String>> {
        let range = self.list_range(body, key)?;
        let inner = &self.content[range.start + 1..range.end - 1];
        Some(split_items(inner).iter().map(|item| unquote(item)).collect())
    }

    /// Range of a nested `{ ... }` dictionary for `key` inside `body`, braces excluded.
    pub fn dictionary(&self, body: &Range<usize>, key: &str) -> Option<Range<usize>> {
        let start = find_key(&self.content, body.clone(), key)?;
        if self.content.as_bytes().get(start) != Some(&b'{') {
            return None;
        }
        let close = matching(&self.content, start, b'{', b'}')?;
        Some(start + 1..close)
    }

    /// Edit that appends `item` (raw pbx text, no trailing comma) to a list.
    pub fn list_append_edit(&self, body: &Range<usize>, key: &str, item: &str) -> Option<Edit> {
        let range = self.list_range(body, key)?;
        let close = range.end - 1;
        let close_line = line_start(&self.content, close);
        let key_indent = indentation_at(&self.content, range.start);

        if self.content[close_line..close].trim().is_empty() {
            let indent = &self.content[close_line..close];
            Some(Edit::insert(close_line, format!("{indent}\t{item},\n")))
        } else {
            Some(Edit::insert(close, format!("\n{key_indent}\t{item},\n{key_indent}")))
        }
    }

    /// Append `item` to the list `key` of object `id`.
    pub fn append_to_list(&mut self, id: &str, key: &str, item: &str) -> Result<(), PatchError> {
        let object = self
            .object(id)
            .ok_or_else(|| self.format_error(format!("object {id} not found")))?;
        let edit = self
            .list_append_edit(&object.body, key, item)
            .ok_or_else(|| self.format_error(format!("object {id} has no '{key}' list")))?;
        self.apply(edit)
    }

    /// Create an empty section for `isa` if the file has none.
    fn ensure_section(&mut self, isa: &str) -> Result<(), PatchError> {
        if self.section(isa).is_some() {
            return Ok(());
        }
        let open = OBJECTS_OPEN
            .find(&self.content)
            .ok_or_else(|| self.format_error("no 'objects = {' dictionary"))?;
        let block = format!("\n/* Begin {isa} section */\n/* End {isa} section */\n");
        self.apply(Edit::insert(open.end(), block))
    }

    /// Add a single-line object to the `isa` section, creating it if needed.
    pub fn insert_object(&mut self, isa: &str, line: &str) -> Result<(), PatchError> {
        self.ensure_section(isa)?;
        let range = self
            .section(isa)
            .ok_or_else(|| self.format_error(format!("{isa} section vanished")))?;
        self.apply(Edit::insert(range.end, format!("\t\t{line}\n")))
    }

    pub fn file_references(&self) -> Vec<FileReference> {
        self.objects("PBXFileReference")
            .into_iter()
            .map(|object| FileReference {
                name: self.value(&object.body, "name"),
                path: self.value(&object.body, "path"),
                id: object.id,
            })
            .collect()
    }

    pub fn root_object(&self) -> Option<PbxObject> {
        let outer_open = self.content.find('{')?;
        let outer_close = matching(&self.content, outer_open, b'{', b'}')?;
        let id = self.value(&(outer_open + 1..outer_close), "rootObject")?;
        self.object(&id)
    }

    pub fn main_group(&self) -> Option<PbxObject> {
        let root = self.root_object()?;
        let id = self.value(&root.body, "mainGroup")?;
        self.object(&id)
    }

    pub fn first_native_target(&self) -> Option<PbxObject> {
        self.objects("PBXNativeTarget").into_iter().next()
    }

    /// The `PBXFrameworksBuildPhase` among `target`'s build phases.
    pub fn frameworks_phase(&self, target: &PbxObject) -> Option<PbxObject> {
        let phases = self.list(&target.body, "buildPhases")?;
        let frameworks = self.objects("PBXFrameworksBuildPhase");
        phases.iter().find_map(|phase| {
            frameworks
                .iter()
                .find(|object| object.id == *phase)
                .cloned()
        })
    }

    pub fn build_configurations(&self) -> Vec<PbxObject> {
        self.objects("XCBuildConfiguration")
    }

    /// Deterministic 24-hex-digit object id for `seed`, unique in this file.
    pub fn generate_id(&self, seed: &str) -> String {
        let mut salt = 0u32;
        loop {
            let hash = xxh3_128(format!("{seed}#{salt}").as_bytes());
            let id = format!("{:024X}", hash & ((1u128 << 96) - 1));
            if !self.content.contains(&id) {
                return id;
            }
            salt += 1;
        }
    }
}
