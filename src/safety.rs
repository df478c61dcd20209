use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keeps every write inside the target application project.
#[derive(Debug, Clone)]
pub struct ProjectGuard {
    /// Canonical project root
    project_root: PathBuf,
    /// Canonical paths to directories that are never written
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside project: {path} (project: {project})")]
    OutsideProject { path: PathBuf, project: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

/// Generated or vendored directories inside a project.
const GENERATED_DIRS: &[&str] = &[
    "ios/Pods",
    "ios/build",
    "android/build",
    "android/app/build",
    "android/.gradle",
    "node_modules",
];

impl ProjectGuard {
    /// Create a guard rooted at `project_root`.
    ///
    /// The root is canonicalized so symlinked checkouts compare correctly.
    pub fn new(project_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let project_root = project_root.as_ref().canonicalize()?;

        let mut forbidden_paths: Vec<PathBuf> = GENERATED_DIRS
            .iter()
            .filter_map(|dir| project_root.join(dir).canonicalize().ok())
            .collect();

        // ~/.gradle and ~/.cocoapods - shared build caches
        if let Some(home) = home::home_dir() {
            for cache in [".gradle", ".cocoapods"] {
                if let Ok(dir) = home.join(cache).canonicalize() {
                    forbidden_paths.push(dir);
                }
            }
        }

        Ok(Self {
            project_root,
            forbidden_paths,
        })
    }

    /// Check an existing path and return its canonical form.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = self.absolute(path.as_ref()).canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Check a path that may not exist yet; its parent directory must.
    pub fn validate_new(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let absolute = self.absolute(path.as_ref());
        let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
            return Err(SafetyError::OutsideProject {
                path: absolute.clone(),
                project: self.project_root.clone(),
            });
        };
        let canonical = parent.canonicalize()?.join(name);
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.project_root) {
            return Err(SafetyError::OutsideProject {
                path: canonical.to_path_buf(),
                project: self.project_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}
