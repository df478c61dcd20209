//! MainApplication initialization
//!
//! The start call goes right after `super.onCreate()`, or at the top of
//! `onCreate` when the super call is missing.

use crate::config::PluginConfig;
use crate::dialect::JvmDialect;
use crate::entry;
use crate::patch::{Anchor, Indent, Patched, TextPatch};
use once_cell::sync::Lazy;
use regex::Regex;

static JAVA_SUPER_ON_CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*super\.onCreate\(\s*\)\s*;").expect("valid java super regex")
});

static JAVA_ON_CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:@Override\s+)?public\s+void\s+onCreate\(\s*\)\s*\{")
        .expect("valid java onCreate regex")
});

static KOTLIN_SUPER_ON_CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*super\.onCreate\(\s*\)").expect("valid kotlin super regex")
});

static KOTLIN_ON_CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*override\s+fun\s+onCreate\(\s*\)\s*\{")
        .expect("valid kotlin onCreate regex")
});

static FIRST_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^import\s+[\w.*]+;?[ \t]*$").expect("valid import regex"));

static PACKAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^package\s+[\w.]+;?[ \t]*$").expect("valid package regex"));

fn init_patch(dialect: JvmDialect, config: &PluginConfig) -> TextPatch {
    let (primary, fallback) = match dialect {
        JvmDialect::Java => (
            Anchor::after("super.onCreate()", &JAVA_SUPER_ON_CREATE, Indent::Anchor),
            Anchor::after("onCreate()", &JAVA_ON_CREATE, Indent::Nested("    ")),
        ),
        JvmDialect::Kotlin => (
            Anchor::after("super.onCreate()", &KOTLIN_SUPER_ON_CREATE, Indent::Anchor),
            Anchor::after("onCreate()", &KOTLIN_ON_CREATE, Indent::Nested("    ")),
        ),
    };

    TextPatch::new("android-main-application", dialect.marker(), primary)
        .fallback(fallback)
        .lines(dialect.init_calls(config))
}

fn import_patch(dialect: JvmDialect) -> TextPatch {
    TextPatch::new(
        "android-main-application-import",
        dialect.import_line(),
        Anchor::after("first import", &FIRST_IMPORT, Indent::Flush),
    )
    .fallback(Anchor::after("package declaration", &PACKAGE_LINE, Indent::Flush))
    .fallback(Anchor::file_start())
    .lines([dialect.import_line()])
}

/// Insert the SDK import and start call into a MainApplication source.
pub fn patch_main_application(content: &str, config: &PluginConfig) -> Patched {
    let dialect = JvmDialect::classify(content);
    entry::splice(
        "android-main-application",
        content,
        &init_patch(dialect, config),
        &import_patch(dialect),
    )
}
