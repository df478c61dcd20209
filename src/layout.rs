//! Artifact discovery under a generated project root

use crate::sdk::NATIVE_GROUP;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const APP_DELEGATE_NAMES: &[&str] = &["AppDelegate.mm", "AppDelegate.m", "AppDelegate.swift"];
const MAIN_APPLICATION_NAMES: &[&str] = &["MainApplication.java", "MainApplication.kt"];

/// Paths of every artifact the pipeline may touch.
///
/// `None` means the artifact does not exist in this checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub podfile: Option<PathBuf>,
    pub app_delegate: Option<PathBuf>,
    pub pbxproj: Option<PathBuf>,
    pub project_gradle: Option<PathBuf>,
    pub app_gradle: Option<PathBuf>,
    /// Created on demand, so present whenever `android/` is
    pub gradle_properties: Option<PathBuf>,
    pub main_application: Option<PathBuf>,
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn gradle_script(dir: &Path) -> Option<PathBuf> {
    existing(dir.join("build.gradle")).or_else(|| existing(dir.join("build.gradle.kts")))
}

fn is_generated(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir()
        && (name == "Pods" || name == "build" || (name.starts_with('.') && entry.depth() > 0))
}

/// First file under `dir` whose name is in `names`, preferring earlier names.
fn find_named(dir: &Path, max_depth: usize, names: &[&str]) -> Option<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_generated(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            names
                .iter()
                .any(|name| entry.file_name().to_string_lossy() == *name)
        })
        .map(DirEntry::into_path)
        .collect();

    found.sort_by_key(|path| {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        names
            .iter()
            .position(|candidate| name.as_deref() == Some(*candidate))
    });
    found.into_iter().next()
}

fn find_pbxproj(ios: &Path) -> Option<PathBuf> {
    WalkDir::new(ios)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_dir()
                && entry.path().extension().is_some_and(|ext| ext == "xcodeproj")
                && entry.file_name() != "Pods.xcodeproj"
        })
        .find_map(|entry| existing(entry.path().join("project.pbxproj")))
}

impl ProjectLayout {
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let ios = root.join("ios");
        let android = root.join("android");

        let (podfile, app_delegate, pbxproj) = if ios.is_dir() {
            (
                existing(ios.join("Podfile")),
                find_named(&ios, 3, APP_DELEGATE_NAMES),
                find_pbxproj(&ios),
            )
        } else {
            (None, None, None)
        };

        let (project_gradle, app_gradle, gradle_properties, main_application) =
            if android.is_dir() {
                (
                    gradle_script(&android),
                    gradle_script(&android.join("app")),
                    Some(android.join("gradle.properties")),
                    find_named(&android.join("app/src/main"), 8, MAIN_APPLICATION_NAMES),
                )
            } else {
                (None, None, None, None)
            };

        Self {
            root,
            podfile,
            app_delegate,
            pbxproj,
            project_gradle,
            app_gradle,
            gradle_properties,
            main_application,
        }
    }

    pub fn has_ios(&self) -> bool {
        self.root.join("ios").is_dir()
    }

    pub fn has_android(&self) -> bool {
        self.root.join("android").is_dir()
    }

    /// Where vendored native libraries are copied.
    pub fn ios_library_dir(&self) -> PathBuf {
        self.root.join("ios").join(NATIVE_GROUP)
    }

    /// Resolve the configured native library directory against the root.
    pub fn native_library_source(&self, configured: &Path) -> PathBuf {
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.root.join(configured)
        }
    }

    /// Path relative to the project root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discovers_expo_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "ios/Podfile");
        touch(root, "ios/Demo/AppDelegate.h");
        touch(root, "ios/Demo/AppDelegate.mm");
        touch(root, "ios/Pods/Some/AppDelegate.swift");
        touch(root, "ios/Demo.xcodeproj/project.pbxproj");
        touch(root, "android/build.gradle");
        touch(root, "android/app/build.gradle.kts");
        touch(root, "android/app/src/main/java/com/demo/MainApplication.kt");

        let layout = ProjectLayout::discover(root);
        assert_eq!(layout.podfile, Some(root.join("ios/Podfile")));
        assert_eq!(layout.app_delegate, Some(root.join("ios/Demo/AppDelegate.mm")));
        assert_eq!(
            layout.pbxproj,
            Some(root.join("ios/Demo.xcodeproj/project.pbxproj"))
        );
        assert_eq!(layout.project_gradle, Some(root.join("android/build.gradle")));
        assert_eq!(
            layout.app_gradle,
            Some(root.join("android/app/build.gradle.kts"))
        );
        assert_eq!(
            layout.gradle_properties,
            Some(root.join("android/gradle.properties"))
        );
        assert_eq!(
            layout.main_application,
            Some(root.join("android/app/src/main/java/com/demo/MainApplication.kt"))
        );
    }

    #[test]
    fn test_objc_preferred_over_swift() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ios/A/AppDelegate.swift");
        touch(dir.path(), "ios/B/AppDelegate.m");

        let layout = ProjectLayout::discover(dir.path());
        assert_eq!(layout.app_delegate, Some(dir.path().join("ios/B/AppDelegate.m")));
    }

    #[test]
    fn test_android_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "android/app/build.gradle");

        let layout = ProjectLayout::discover(dir.path());
        assert!(!layout.has_ios());
        assert!(layout.has_android());
        assert_eq!(layout.podfile, None);
        assert_eq!(layout.pbxproj, None);
        assert_eq!(layout.project_gradle, None);
        assert!(layout.app_gradle.is_some());
    }

    #[test]
    fn test_pods_project_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ios/Pods.xcodeproj/project.pbxproj");

        assert_eq!(ProjectLayout::discover(dir.path()).pbxproj, None);
    }
}
