//! Source dialect classification
//!
//! Entry-point files come in two mutually exclusive flavours per platform.
//! The dialect is decided once per artifact from its text and every template
//! choice downstream dispatches on the result.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// `func name(` or a bare `import Module` line; Objective-C only has `#import` / `@import X;`
static SWIFT_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)\bfunc\s+\w+\s*\(|^\s*import\s+[A-Za-z_][\w.]*\s*$")
        .expect("valid swift signature regex")
});

static KOTLIN_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfun\s+\w+\s*\(").expect("valid kotlin signature regex"));

/// iOS application delegate dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppleDialect {
    ObjectiveC,
    Swift,
}

impl AppleDialect {
    pub fn classify(content: &str) -> Self {
        if SWIFT_SIGNATURE.is_match(content) {
            AppleDialect::Swift
        } else {
            AppleDialect::ObjectiveC
        }
    }
}

/// Android application class dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JvmDialect {
    Java,
    Kotlin,
}

impl JvmDialect {
    pub fn classify(content: &str) -> Self {
        if KOTLIN_SIGNATURE.is_match(content) {
            JvmDialect::Kotlin
        } else {
            JvmDialect::Java
        }
    }
}

/// Gradle build script dialect, decided by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradleDialect {
    Groovy,
    KotlinScript,
}

impl GradleDialect {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("kts") => GradleDialect::KotlinScript,
            _ => GradleDialect::Groovy,
        }
    }
}
