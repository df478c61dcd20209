//! Entry-point splicing shared by the iOS and Android application patchers
//!
//! An entry point gets two insertions in one pass: the SDK import and the
//! initialization block. Both are gated by the init marker, and the import
//! is only added when the init block has somewhere to go.

use crate::patch::{finish, Patched, SkipReason, TextPatch};
use tracing::{debug, warn};

pub fn splice(name: &'static str, content: &str, init: &TextPatch, import: &TextPatch) -> Patched {
    if init.is_applied(content) {
        debug!(patch = name, "already applied");
        return Patched::unchanged(content, SkipReason::AlreadyApplied);
    }

    let Some(init_site) = init.locate(content) else {
        warn!(
            patch = name,
            anchor = init.primary.name,
            "no lifecycle anchor found; entry point left unchanged"
        );
        return Patched::unchanged(content, SkipReason::AnchorNotFound);
    };

    let mut edits = vec![init_site.edit.clone()];
    if !import.is_applied(content) {
        match import.locate(content) {
            Some(import_site) => edits.push(import_site.edit),
            None => warn!(patch = name, "no import anchor found; SDK import not added"),
        }
    }

    finish(name, content, edits, init_site.outcome())
}
