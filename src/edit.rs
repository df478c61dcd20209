use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Every patcher computes its change as one or more `Edit`s over the artifact
/// text; pure insertions are empty spans. Nothing touches the filesystem until
/// the patched text is handed to [`write_artifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to put at [byte_start, byte_end)
    pub new_text: String,
    /// Text expected at the span before applying
    pub expected_before: String,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at byte {byte_start}: expected {expected:?}, found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("Edit span [{byte_start}, {byte_end}) splits a UTF-8 character")]
    NotCharBoundary { byte_start: usize, byte_end: usize },

    #[error("Overlapping edits at byte {0}")]
    Overlap(usize),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of persisting an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

impl Edit {
    /// Insert `text` at `at` without removing anything.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            byte_start: at,
            byte_end: at,
            new_text: text.into(),
            expected_before: String::new(),
        }
    }

    /// Replace [byte_start, byte_end), which must currently read `expected_before`.
    pub fn replace(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: expected_before.into(),
        }
    }

    /// Validate the edit against `content` and return the current span text.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }

        if !content.is_char_boundary(self.byte_start) || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::NotCharBoundary {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if current != self.expected_before {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: self.expected_before.clone(),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this edit to `content`, returning the new text.
    pub fn apply_to(&self, content: &str) -> Result<String, EditError> {
        self.validate(content)?;

        let mut out = String::with_capacity(
            content.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&content[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&content[self.byte_end..]);
        Ok(out)
    }

    /// Apply several edits computed against the same `content`.
    ///
    /// Edits are applied bottom-to-top to avoid offset invalidation. Two
    /// insertions at the same offset end up in their original order.
    pub fn apply_all(content: &str, mut edits: Vec<Edit>) -> Result<String, EditError> {
        for edit in &edits {
            edit.validate(content)?;
        }

        edits.sort_by(|a, b| a.byte_start.cmp(&b.byte_start));
        for window in edits.windows(2) {
            let (earlier, later) = (&window[0], &window[1]);
            if earlier.byte_end > later.byte_start {
                return Err(EditError::Overlap(later.byte_start));
            }
        }

        let mut out = content.to_string();
        for edit in edits.iter().rev() {
            out.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
        }
        Ok(out)
    }
}

/// Persist an artifact if its content changed.
///
/// Uses tempfile + fsync + rename so a crash never leaves a half-written
/// project file, then bumps mtime so Xcode and Gradle notice the change.
pub fn write_artifact(path: &Path, content: &str) -> Result<WriteOutcome, EditError> {
    if let Ok(existing) = fs::read(path) {
        if existing == content.as_bytes() {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    atomic_write(path, content.as_bytes())?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;

    Ok(WriteOutcome::Written)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
