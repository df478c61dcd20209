//! Vendored native libraries
//!
//! Binary libraries are found in the configured directory by extension,
//! copied into `ios/Beacon/` and referenced from the Xcode project: a file
//! reference, a build file and an entry in the first target's frameworks
//! phase. No embed (copy files) phase entry is ever created; the libraries
//! are linked, not bundled.

use crate::ios::linker::ensure_list_setting;
use crate::ios::pbxproj::{quote_value, PbxProject};
use crate::patch::{PatchError, PatchOutcome, SkipReason};
use crate::safety::ProjectGuard;
use crate::sdk::NATIVE_GROUP;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    StaticArchive,
    Framework,
    XcFramework,
}

impl LibraryKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "a" if path.is_file() => Some(LibraryKind::StaticArchive),
            "framework" if path.is_dir() => Some(LibraryKind::Framework),
            "xcframework" if path.is_dir() => Some(LibraryKind::XcFramework),
            _ => None,
        }
    }

    /// `lastKnownFileType` Xcode records for this kind.
    pub fn file_type(self) -> &'static str {
        match self {
            LibraryKind::StaticArchive => "archive.ar",
            LibraryKind::Framework => "wrapper.framework",
            LibraryKind::XcFramework => "wrapper.xcframework",
        }
    }

    fn search_path_setting(self) -> &'static str {
        match self {
            LibraryKind::StaticArchive => "LIBRARY_SEARCH_PATHS",
            LibraryKind::Framework | LibraryKind::XcFramework => "FRAMEWORK_SEARCH_PATHS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLibrary {
    pub source: PathBuf,
    pub file_name: String,
    pub kind: LibraryKind,
}

impl NativeLibrary {
    /// Path relative to the Xcode project's directory.
    pub fn project_path(&self) -> String {
        format!("{NATIVE_GROUP}/{}", self.file_name)
    }
}

/// List the libraries directly inside `dir`, sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<NativeLibrary>, PatchError> {
    let mut libraries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            PatchError::io(path, e.into())
        })?;
        let Some(kind) = LibraryKind::from_path(entry.path()) else {
            continue;
        };
        libraries.push(NativeLibrary {
            source: entry.path().to_path_buf(),
            file_name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }
    Ok(libraries)
}

/// Warn when no library file name carries the expected binary version.
pub fn check_version(libraries: &[NativeLibrary], version: &str) -> bool {
    let found = libraries
        .iter()
        .any(|library| library.file_name.contains(version));
    if !found && !libraries.is_empty() {
        warn!(
            expected = version,
            "no native library file name mentions the configured nativeLibraryVersion"
        );
    }
    found
}

/// Copy `source` to `target` unless it already has identical bytes.
fn copy_file(source: &Path, target: &Path) -> Result<bool, PatchError> {
    let bytes = fs::read(source).map_err(|e| PatchError::io(source, e))?;
    if fs::read(target).is_ok_and(|existing| existing == bytes) {
        return Ok(false);
    }
    fs::write(target, &bytes).map_err(|e| PatchError::io(target, e))?;
    Ok(true)
}

/// Copy every library into `target_dir`, creating it when missing.
///
/// Returns the number of files written.
pub fn copy_into(
    libraries: &[NativeLibrary],
    target_dir: &Path,
    guard: &ProjectGuard,
) -> Result<usize, PatchError> {
    let target_dir = guard.validate_new(target_dir)?;
    fs::create_dir_all(&target_dir).map_err(|e| PatchError::io(&target_dir, e))?;

    let mut written = 0;
    for library in libraries {
        let destination = guard.validate_new(target_dir.join(&library.file_name))?;
        match library.kind {
            LibraryKind::StaticArchive => {
                written += usize::from(copy_file(&library.source, &destination)?);
            }
            LibraryKind::Framework | LibraryKind::XcFramework => {
                for entry in WalkDir::new(&library.source).sort_by_file_name() {
                    let entry = entry.map_err(|e| {
                        let path = e.path().unwrap_or(&library.source).to_path_buf();
                        PatchError::io(path, e.into())
                    })?;
                    let relative = entry
                        .path()
                        .strip_prefix(&library.source)
                        .unwrap_or(entry.path());
                    let target = destination.join(relative);
                    if entry.file_type().is_dir() {
                        fs::create_dir_all(&target).map_err(|e| PatchError::io(&target, e))?;
                    } else {
                        written += usize::from(copy_file(entry.path(), &target)?);
                    }
                }
            }
        }
    }

    debug!(target = %target_dir.display(), written, "native libraries copied");
    Ok(written)
}

fn is_registered(project: &PbxProject, library: &NativeLibrary) -> bool {
    project.file_references().iter().any(|reference| {
        reference
            .path
            .as_deref()
            .is_some_and(|path| path.contains(&library.file_name))
    })
}

/// Reference `libraries` from the first native target of `project`.
pub fn register(
    project: &mut PbxProject,
    libraries: &[NativeLibrary],
) -> Result<PatchOutcome, PatchError> {
    if libraries.is_empty() {
        warn!(patch = "ios-native-libraries", "no native libraries found");
        return Ok(PatchOutcome::Skipped(SkipReason::ArtifactMissing));
    }

    let Some(target) = project.first_native_target() else {
        warn!(patch = "ios-native-libraries", "project has no native target");
        return Ok(PatchOutcome::Skipped(SkipReason::AnchorNotFound));
    };
    let Some(phase) = project.frameworks_phase(&target) else {
        warn!(patch = "ios-native-libraries", "target has no frameworks build phase");
        return Ok(PatchOutcome::Skipped(SkipReason::AnchorNotFound));
    };
    let Some(group) = project.main_group() else {
        warn!(patch = "ios-native-libraries", "project has no main group");
        return Ok(PatchOutcome::Skipped(SkipReason::AnchorNotFound));
    };

    let mut added = 0;
    for library in libraries {
        if is_registered(project, library) {
            debug!(library = %library.file_name, "already referenced");
            continue;
        }

        let name = &library.file_name;
        let path = library.project_path();

        let file_ref = project.generate_id(&format!("beacon:file-ref:{path}"));
        project.insert_object(
            "PBXFileReference",
            &format!(
                "{file_ref} /* {name} */ = {{isa = PBXFileReference; lastKnownFileType = {}; name = {}; path = {}; sourceTree = \"<group>\"; }};",
                library.kind.file_type(),
                quote_value(name),
                quote_value(&path),
            ),
        )?;

        let build_file = project.generate_id(&format!("beacon:build-file:{path}"));
        project.insert_object(
            "PBXBuildFile",
            &format!(
                "{build_file} /* {name} in Frameworks */ = {{isa = PBXBuildFile; fileRef = {file_ref} /* {name} */; }};"
            ),
        )?;

        project.append_to_list(&phase.id, "files", &format!("{build_file} /* {name} in Frameworks */"))?;
        project.append_to_list(&group.id, "children", &format!("{file_ref} /* {name} */"))?;

        ensure_list_setting(
            project,
            library.kind.search_path_setting(),
            &format!("$(PROJECT_DIR)/{NATIVE_GROUP}"),
        )?;

        info!(patch = "ios-native-libraries", library = %name, "library referenced");
        added += 1;
    }

    if added == 0 {
        return Ok(PatchOutcome::Skipped(SkipReason::AlreadyApplied));
    }
    Ok(PatchOutcome::Applied {
        anchor: "frameworks build phase",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/ios/Demo.xcodeproj/project.pbxproj");

    fn vendor() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libBeacon-1.2.0.a"), b"!<arch>\n").unwrap();
        fs::write(dir.path().join("README.md"), b"docs").unwrap();
        let framework = dir.path().join("BeaconCore.xcframework");
        fs::create_dir_all(framework.join("ios-arm64")).unwrap();
        fs::write(framework.join("Info.plist"), b"<plist/>").unwrap();
        dir
    }

    #[test]
    fn test_discover_by_extension() {
        let dir = vendor();
        let libraries = discover(dir.path()).unwrap();
        let names: Vec<_> = libraries.iter().map(|l| l.file_name.as_str()).collect();
        assert_eq!(names, vec!["BeaconCore.xcframework", "libBeacon-1.2.0.a"]);
        assert_eq!(libraries[0].kind, LibraryKind::XcFramework);
        assert_eq!(libraries[1].kind, LibraryKind::StaticArchive);
    }

    #[test]
    fn test_check_version() {
        let dir = vendor();
        let libraries = discover(dir.path()).unwrap();
        assert!(check_version(&libraries, "1.2.0"));
        assert!(!check_version(&libraries, "2.0.0"));
    }

    #[test]
    fn test_copy_into_is_repeatable() {
        let vendor = vendor();
        let project = tempfile::tempdir().unwrap();
        fs::create_dir_all(project.path().join("ios")).unwrap();
        let guard = ProjectGuard::new(project.path()).unwrap();
        let libraries = discover(vendor.path()).unwrap();
        let target = project.path().join("ios/Beacon");

        assert_eq!(copy_into(&libraries, &target, &guard).unwrap(), 2);
        assert!(target.join("libBeacon-1.2.0.a").is_file());
        assert!(target.join("BeaconCore.xcframework/Info.plist").is_file());
        assert!(target.join("BeaconCore.xcframework/ios-arm64").is_dir());
        assert_eq!(copy_into(&libraries, &target, &guard).unwrap(), 0);
    }

    #[test]
    fn test_register_links_without_embedding() {
        let dir = vendor();
        let libraries = discover(dir.path()).unwrap();
        let mut project = PbxProject::parse("project.pbxproj", FIXTURE).unwrap();

        let outcome = register(&mut project, &libraries).unwrap();
        assert!(outcome.changed());

        let references = project.file_references();
        assert!(references
            .iter()
            .any(|r| r.path.as_deref() == Some("Beacon/libBeacon-1.2.0.a")));

        let target = project.first_native_target().unwrap();
        let phase = project.frameworks_phase(&target).unwrap();
        assert_eq!(project.list(&phase.body, "files").unwrap().len(), 2);

        let group = project.main_group().unwrap();
        assert_eq!(project.list(&group.body, "children").unwrap().len(), 4);

        assert!(project.objects("PBXCopyFilesBuildPhase").is_empty());
        assert!(!project.content().contains("Embed Frameworks"));
        assert!(project.content().contains("\"$(PROJECT_DIR)/Beacon\""));
    }

    #[test]
    fn test_register_is_idempotent_and_deterministic() {
        let dir = vendor();
        let libraries = discover(dir.path()).unwrap();

        let mut first = PbxProject::parse("p", FIXTURE).unwrap();
        let _ = register(&mut first, &libraries).unwrap();
        let mut second = PbxProject::parse("p", FIXTURE).unwrap();
        let _ = register(&mut second, &libraries).unwrap();
        assert_eq!(first.content(), second.content());

        let once = first.content().to_string();
        let outcome = register(&mut first, &libraries).unwrap();
        assert_eq!(outcome, PatchOutcome::Skipped(SkipReason::AlreadyApplied));
        assert_eq!(first.content(), once);
    }

    #[test]
    fn test_register_without_libraries() {
        let mut project = PbxProject::parse("p", FIXTURE).unwrap();
        assert_eq!(
            register(&mut project, &[]).unwrap(),
            PatchOutcome::Skipped(SkipReason::ArtifactMissing)
        );
        assert_eq!(project.content(), FIXTURE);
    }
}
