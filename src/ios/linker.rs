//! Build-setting list flags across every build configuration

use crate::edit::Edit;
use crate::ios::pbxproj::{quote_value, PbxProject};
use crate::patch::{PatchError, PatchOutcome, SkipReason};
use crate::sdk::LINKER_FLAG;
use tracing::{debug, info, warn};

const INHERITED: &str = "$(inherited)";

/// Make sure `value` is a member of the list setting `key` in every
/// `XCBuildConfiguration`.
///
/// A scalar setting is widened to a list that keeps the original value. A
/// missing setting is created as `("$(inherited)", value)`. Membership is
/// decided per item, never by substring. Returns how many configurations
/// changed.
pub fn ensure_list_setting(
    project: &mut PbxProject,
    key: &str,
    value: &str,
) -> Result<usize, PatchError> {
    let content = project.content();
    let quoted = quote_value(value);
    let mut edits = Vec::new();

    for config in project.build_configurations() {
        let Some(settings) = project.dictionary(&config.body, "buildSettings") else {
            debug!(configuration = %config.id, "no buildSettings dictionary");
            continue;
        };

        if let Some(items) = project.list(&settings, key) {
            if items.iter().any(|item| item == value) {
                continue;
            }
            if let Some(edit) = project.list_append_edit(&settings, key, &quoted) {
                edits.push(edit);
            }
        } else if let Some(span) = project.scalar_range(&settings, key) {
            let raw = &content[span.clone()];
            let current = project.value(&settings, key).unwrap_or_default();
            if current.split_whitespace().any(|token| token == value) {
                continue;
            }
            let indent = indentation(content, span.start);
            let list = format!("(\n{indent}\t{raw},\n{indent}\t{quoted},\n{indent})");
            edits.push(Edit::replace(span.start, span.end, list, raw));
        } else {
            let base = indentation(content, settings.start);
            let indent = format!("{base}\t");
            let block = format!(
                "{indent}{key} = (\n{indent}\t{},\n{indent}\t{quoted},\n{indent});\n",
                quote_value(INHERITED)
            );
            let inner = &content[settings.clone()];
            match inner.find('\n') {
                Some(newline) => {
                    edits.push(Edit::insert(settings.start + newline + 1, block));
                }
                None => {
                    // one-line dictionary: rewrite it in multi-line form
                    let mut body = String::from("\n");
                    let existing = inner.trim();
                    if !existing.is_empty() {
                        body.push_str(&format!("{indent}{existing}\n"));
                    }
                    body.push_str(&block);
                    body.push_str(base);
                    edits.push(Edit::replace(settings.start, settings.end, body, inner));
                }
            }
        }
    }

    let changed = edits.len();
    project.apply_all(edits)?;
    Ok(changed)
}

fn indentation(content: &str, at: usize) -> &str {
    let start = content[..at].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let line = &content[start..];
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Ensure the SDK's linker flag is in `OTHER_LDFLAGS` of every configuration.
pub fn patch_linker_flags(project: &mut PbxProject) -> Result<PatchOutcome, PatchError> {
    if project.build_configurations().is_empty() {
        warn!(patch = "ios-linker-flags", "project has no build configurations");
        return Ok(PatchOutcome::Skipped(SkipReason::AnchorNotFound));
    }

    let changed = ensure_list_setting(project, "OTHER_LDFLAGS", LINKER_FLAG)?;
    if changed == 0 {
        debug!(patch = "ios-linker-flags", "already applied");
        return Ok(PatchOutcome::Skipped(SkipReason::AlreadyApplied));
    }

    info!(patch = "ios-linker-flags", configurations = changed, "linker flag added");
    Ok(PatchOutcome::Applied {
        anchor: "build configurations",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/ios/Demo.xcodeproj/project.pbxproj");

    fn project() -> PbxProject {
        PbxProject::parse("project.pbxproj", FIXTURE).unwrap()
    }

    fn flags(project: &PbxProject) -> Vec<Vec<String>> {
        project
            .build_configurations()
            .iter()
            .map(|config| {
                let settings = project.dictionary(&config.body, "buildSettings").unwrap();
                project.list(&settings, "OTHER_LDFLAGS").unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn test_every_configuration_shape() {
        let mut project = project();
        let outcome = patch_linker_flags(&mut project).unwrap();
        assert!(outcome.changed());

        assert_eq!(
            flags(&project),
            vec![
                vec!["$(inherited)", "-lc++", "-ObjC"],
                vec!["$(inherited)", "-ObjC"],
                vec!["$(inherited)", "-ObjC"],
            ]
        );
        assert!(project.content().contains(
            "\t\t\t\tOTHER_LDFLAGS = (\n\t\t\t\t\t\"$(inherited)\",\n\t\t\t\t\t\"-ObjC\",\n\t\t\t\t);"
        ));
    }

    #[test]
    fn test_idempotent() {
        let mut project = project();
        let _ = patch_linker_flags(&mut project).unwrap();
        let once = project.content().to_string();

        let outcome = patch_linker_flags(&mut project).unwrap();
        assert_eq!(outcome, PatchOutcome::Skipped(SkipReason::AlreadyApplied));
        assert_eq!(project.content(), once);
    }

    #[test]
    fn test_membership_is_not_substring() {
        let content = FIXTURE.replace("\"-lc++\"", "\"-ObjCxx\"");
        let mut project = PbxProject::parse("p", content).unwrap();
        let _ = patch_linker_flags(&mut project).unwrap();
        assert_eq!(flags(&project)[0], vec!["$(inherited)", "-ObjCxx", "-ObjC"]);
    }

    #[test]
    fn test_inline_build_settings() {
        let content = FIXTURE.replace(
            "buildSettings = {\n\t\t\t\tALWAYS_SEARCH_USER_PATHS = NO;\n\t\t\t\tIPHONEOS_DEPLOYMENT_TARGET = 13.4;\n\t\t\t};",
            "buildSettings = {};",
        );
        let mut project = PbxProject::parse("p", content).unwrap();
        assert!(patch_linker_flags(&mut project).unwrap().changed());
        assert!(project.content().contains(
            "\t\t\tbuildSettings = {\n\t\t\t\tOTHER_LDFLAGS = (\n\t\t\t\t\t\"$(inherited)\",\n\t\t\t\t\t\"-ObjC\",\n\t\t\t\t);\n\t\t\t};\n\t\t\tname = Debug;"
        ));
        assert_eq!(flags(&project)[2], vec!["$(inherited)", "-ObjC"]);

        let once = project.content().to_string();
        let outcome = patch_linker_flags(&mut project).unwrap();
        assert_eq!(outcome, PatchOutcome::Skipped(SkipReason::AlreadyApplied));
        assert_eq!(project.content(), once);
    }

    #[test]
    fn test_inline_build_settings_keep_entries() {
        let content = FIXTURE.replace(
            "buildSettings = {\n\t\t\t\tALWAYS_SEARCH_USER_PATHS = NO;\n\t\t\t\tIPHONEOS_DEPLOYMENT_TARGET = 13.4;\n\t\t\t};",
            "buildSettings = { ALWAYS_SEARCH_USER_PATHS = NO; };",
        );
        let mut project = PbxProject::parse("p", content).unwrap();
        let _ = patch_linker_flags(&mut project).unwrap();

        let config = &project.build_configurations()[2];
        let settings = project.dictionary(&config.body, "buildSettings").unwrap();
        assert_eq!(
            project.value(&settings, "ALWAYS_SEARCH_USER_PATHS").as_deref(),
            Some("NO")
        );
        assert_eq!(
            project.list(&settings, "OTHER_LDFLAGS").unwrap(),
            vec!["$(inherited)", "-ObjC"]
        );
    }

    #[test]
    fn test_scalar_already_containing_flag() {
        let content = FIXTURE.replace(
            "OTHER_LDFLAGS = \"$(inherited)\";",
            "OTHER_LDFLAGS = \"$(inherited) -ObjC\";",
        );
        let mut project = PbxProject::parse("p", content).unwrap();
        assert_eq!(
            ensure_list_setting(&mut project, "OTHER_LDFLAGS", LINKER_FLAG).unwrap(),
            2
        );
        assert!(project
            .content()
            .contains("OTHER_LDFLAGS = \"$(inherited) -ObjC\";"));
    }
}
