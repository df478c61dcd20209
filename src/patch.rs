//! Idempotent anchored text insertion
//!
//! Every artifact patcher in this crate is a parameterization of
//! [`TextPatch`]: a marker substring that means "already applied", a primary
//! anchor, an ordered list of fallback anchors and the lines to insert.
//!
//! Only the first match of an anchor is used. A Podfile with several targets
//! or a build script with several `dependencies` blocks is patched at the
//! first one only.

use crate::edit::{Edit, EditError};
use crate::safety::SafetyError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Hard failures while patching; anchor misses are outcomes, not errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("edit error: {0}")]
    Edit(#[from] EditError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("could not build repository url: {0}")]
    SourceUrl(String),

    #[error("malformed project file {path}: {reason}")]
    ProjectFormat { path: PathBuf, reason: String },
}

impl PatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Where the inserted block goes relative to the anchor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// On the line(s) before the line where the match starts
    Before,
    /// On the line(s) after the line where the match ends
    After,
}

/// How inserted lines are indented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    /// No indentation
    Flush,
    /// Same leading whitespace as the anchor line
    Anchor,
    /// Anchor indentation plus one extra level
    Nested(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum Locator {
    Pattern(&'static Regex),
    FileStart,
    FileEnd,
}

/// A named place to insert text.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub name: &'static str,
    pub locator: Locator,
    pub placement: Placement,
    pub indent: Indent,
}

impl Anchor {
    pub fn after(name: &'static str, pattern: &'static Lazy<Regex>, indent: Indent) -> Self {
        Self {
            name,
            locator: Locator::Pattern(Lazy::force(pattern)),
            placement: Placement::After,
            indent,
        }
    }

    pub fn before(name: &'static str, pattern: &'static Lazy<Regex>, indent: Indent) -> Self {
        Self {
            name,
            locator: Locator::Pattern(Lazy::force(pattern)),
            placement: Placement::Before,
            indent,
        }
    }

    pub fn file_start() -> Self {
        Self {
            name: "start of file",
            locator: Locator::FileStart,
            placement: Placement::Before,
            indent: Indent::Flush,
        }
    }

    pub fn file_end() -> Self {
        Self {
            name: "end of file",
            locator: Locator::FileEnd,
            placement: Placement::After,
            indent: Indent::Flush,
        }
    }

    /// Compute the insertion edit for `lines`, or `None` when the anchor is absent.
    pub fn locate(&self, content: &str, lines: &[String]) -> Option<Edit> {
        match self.locator {
            Locator::FileStart => Some(Edit::insert(0, render(lines, ""))),
            Locator::FileEnd => {
                let mut block = String::new();
                if !content.is_empty() && !content.ends_with('\n') {
                    block.push('\n');
                }
                block.push_str(&render(lines, ""));
                Some(Edit::insert(content.len(), block))
            }
            Locator::Pattern(regex) => {
                let found = regex.find(content)?;
                let line_start = line_start(content, found.start());
                let base = leading_whitespace(&content[line_start..]);
                let indent = match self.indent {
                    Indent::Flush => String::new(),
                    Indent::Anchor => base.to_string(),
                    Indent::Nested(unit) => format!("{base}{unit}"),
                };

                match self.placement {
                    Placement::Before => Some(Edit::insert(line_start, render(lines, &indent))),
                    Placement::After => {
                        let (at, needs_newline) = after_line(content, found.end());
                        let mut block = String::new();
                        if needs_newline {
                            block.push('\n');
                        }
                        block.push_str(&render(lines, &indent));
                        Some(Edit::insert(at, block))
                    }
                }
            }
        }
    }
}

fn line_start(content: &str, at: usize) -> usize {
    content[..at].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Offset just past the line containing `match_end`, and whether a newline
/// must be emitted first because that line is the unterminated last line.
fn after_line(content: &str, match_end: usize) -> (usize, bool) {
    if match_end > 0 && content.as_bytes()[match_end - 1] == b'\n' {
        return (match_end, false);
    }
    match content[match_end..].find('\n') {
        Some(idx) => (match_end + idx + 1, false),
        None => (content.len(), true),
    }
}

fn render(lines: &[String], indent: &str) -> String {
    let mut out = String::new();
    for line in lines {
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Why a patch left the artifact untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The marker is already present
    AlreadyApplied,
    /// Neither the primary nor any fallback anchor matched
    AnchorNotFound,
    /// The artifact does not exist in this project
    ArtifactMissing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyApplied => write!(f, "already applied"),
            SkipReason::AnchorNotFound => write!(f, "no insertion anchor found"),
            SkipReason::ArtifactMissing => write!(f, "artifact not found"),
        }
    }
}

/// Result of running one patcher against one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "PatchOutcome should be checked for fallback/skip"]
pub enum PatchOutcome {
    /// Inserted at the primary anchor
    Applied { anchor: &'static str },
    /// Inserted at a fallback anchor
    AppliedViaFallback { anchor: &'static str },
    /// Nothing was inserted
    Skipped(SkipReason),
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, PatchOutcome::Skipped(_))
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Applied { anchor } => write!(f, "applied at {anchor}"),
            PatchOutcome::AppliedViaFallback { anchor } => {
                write!(f, "applied via fallback anchor {anchor}")
            }
            PatchOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Artifact text after a patcher ran, with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub content: String,
    pub outcome: PatchOutcome,
}

impl Patched {
    pub fn unchanged(content: &str, reason: SkipReason) -> Self {
        Self {
            content: content.to_string(),
            outcome: PatchOutcome::Skipped(reason),
        }
    }
}

/// A located insertion and whether it came from a fallback anchor.
#[derive(Debug, Clone)]
pub struct Located {
    pub edit: Edit,
    pub anchor: &'static str,
    pub via_fallback: bool,
}

impl Located {
    pub fn outcome(&self) -> PatchOutcome {
        if self.via_fallback {
            PatchOutcome::AppliedViaFallback {
                anchor: self.anchor,
            }
        } else {
            PatchOutcome::Applied {
                anchor: self.anchor,
            }
        }
    }
}

/// One marker-guarded insertion.
#[derive(Debug, Clone)]
pub struct TextPatch {
    pub name: &'static str,
    pub marker: String,
    pub primary: Anchor,
    pub fallbacks: Vec<Anchor>,
    pub lines: Vec<String>,
}

impl TextPatch {
    pub fn new(name: &'static str, marker: impl Into<String>, primary: Anchor) -> Self {
        Self {
            name,
            marker: marker.into(),
            primary,
            fallbacks: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn fallback(mut self, anchor: Anchor) -> Self {
        self.fallbacks.push(anchor);
        self
    }

    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_applied(&self, content: &str) -> bool {
        content.contains(&self.marker)
    }

    /// Find the first anchor that matches, ignoring the marker.
    pub fn locate(&self, content: &str) -> Option<Located> {
        if let Some(edit) = self.primary.locate(content, &self.lines) {
            return Some(Located {
                edit,
                anchor: self.primary.name,
                via_fallback: false,
            });
        }

        self.fallbacks.iter().find_map(|anchor| {
            anchor.locate(content, &self.lines).map(|edit| Located {
                edit,
                anchor: anchor.name,
                via_fallback: true,
            })
        })
    }

    /// Apply the patch to `content`.
    ///
    /// A no-op when the marker is present. Otherwise the lines go next to the
    /// first match of the primary anchor, or of the first fallback that
    /// matches. When nothing matches the content comes back unchanged with
    /// [`SkipReason::AnchorNotFound`].
    pub fn apply(&self, content: &str) -> Patched {
        if self.is_applied(content) {
            debug!(patch = self.name, "already applied");
            return Patched::unchanged(content, SkipReason::AlreadyApplied);
        }

        let Some(located) = self.locate(content) else {
            warn!(
                patch = self.name,
                anchor = self.primary.name,
                "no insertion anchor found; artifact left unchanged"
            );
            return Patched::unchanged(content, SkipReason::AnchorNotFound);
        };

        finish(self.name, content, vec![located.edit.clone()], located.outcome())
    }
}

/// Apply located edits and log the outcome.
///
/// Edits are computed by this crate against `content`, so a failure here is a
/// bug in anchor arithmetic; the artifact is then left unchanged.
pub fn finish(
    name: &'static str,
    content: &str,
    edits: Vec<Edit>,
    outcome: PatchOutcome,
) -> Patched {
    match Edit::apply_all(content, edits) {
        Ok(patched) => {
            match outcome {
                PatchOutcome::AppliedViaFallback { anchor } => warn!(
                    patch = name,
                    anchor,
                    "primary anchor not found; inserted at fallback anchor"
                ),
                PatchOutcome::Applied { anchor } => info!(patch = name, anchor, "patch applied"),
                PatchOutcome::Skipped(_) => {}
            }
            Patched {
                content: patched,
                outcome,
            }
        }
        Err(error) => {
            warn!(patch = name, %error, "computed edit did not apply; artifact left unchanged");
            Patched::unchanged(content, SkipReason::AnchorNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^import .*$").unwrap());
    static RETURN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*return true").unwrap());
    static OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^fun start\(\) \{").unwrap());

    fn import_patch() -> TextPatch {
        TextPatch::new("import", "import sdk", Anchor::after("import", &IMPORT, Indent::Flush))
            .fallback(Anchor::file_start())
            .lines(["import sdk"])
    }

    #[test]
    fn test_primary_inserts_after_first_match_only() {
        let content = "import a\nimport b\n";
        let patched = import_patch().apply(content);
        assert_eq!(patched.content, "import a\nimport sdk\nimport b\n");
        assert_eq!(patched.outcome, PatchOutcome::Applied { anchor: "import" });
    }

    #[test]
    fn test_fallback_file_start() {
        let patched = import_patch().apply("val x = 1\n");
        assert_eq!(patched.content, "import sdk\nval x = 1\n");
        assert_eq!(
            patched.outcome,
            PatchOutcome::AppliedViaFallback {
                anchor: "start of file"
            }
        );
    }

    #[test]
    fn test_marker_short_circuits() {
        let once = import_patch().apply("import a\n");
        let twice = import_patch().apply(&once.content);
        assert_eq!(once.content, twice.content);
        assert_eq!(
            twice.outcome,
            PatchOutcome::Skipped(SkipReason::AlreadyApplied)
        );
    }

    #[test]
    fn test_no_anchor_leaves_content() {
        let patch = TextPatch::new("ret", "init()", Anchor::before("return", &RETURN, Indent::Anchor))
            .lines(["init()"]);
        let patched = patch.apply("nothing here\n");
        assert_eq!(patched.content, "nothing here\n");
        assert_eq!(
            patched.outcome,
            PatchOutcome::Skipped(SkipReason::AnchorNotFound)
        );
    }

    #[test]
    fn test_before_uses_anchor_indent() {
        let patch = TextPatch::new("ret", "init()", Anchor::before("return", &RETURN, Indent::Anchor))
            .lines(["init()"]);
        let patched = patch.apply("fun f() {\n    return true\n}\n");
        assert_eq!(patched.content, "fun f() {\n    init()\n    return true\n}\n");
    }

    #[test]
    fn test_nested_indent_after_open_brace() {
        let patch = TextPatch::new(
            "open",
            "init()",
            Anchor::after("start", &OPEN, Indent::Nested("    ")),
        )
        .lines(["init()", "", "configure()"]);
        let patched = patch.apply("fun start() {\n}\n");
        assert_eq!(
            patched.content,
            "fun start() {\n    init()\n\n    configure()\n}\n"
        );
    }

    #[test]
    fn test_after_unterminated_last_line() {
        let patched = import_patch().apply("import a");
        assert_eq!(patched.content, "import a\nimport sdk\n");
    }

    #[test]
    fn test_file_end() {
        let patch = TextPatch::new("tail", "tail", Anchor::before("return", &RETURN, Indent::Anchor))
            .fallback(Anchor::file_end())
            .lines(["tail"]);
        assert_eq!(patch.apply("a").content, "a\ntail\n");
        assert_eq!(patch.apply("").content, "tail\n");
    }
}
