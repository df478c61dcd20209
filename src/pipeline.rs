//! Fixed-order patch pipeline
//!
//! Steps run strictly in sequence: iOS pod, iOS entry point, iOS project
//! settings, Android repository, Android dependency, Android entry point.
//! Each step reads its artifact, patches it in memory and writes it back
//! before the next one starts. An I/O failure stops the run and leaves
//! earlier writes in place.

use crate::android::{
    patch_credentials, patch_dependencies, patch_main_application, patch_repositories,
};
use crate::config::PluginConfig;
use crate::dialect::GradleDialect;
use crate::edit::{write_artifact, WriteOutcome};
use crate::ios::native_libs::{self, NativeLibrary};
use crate::ios::{patch_app_delegate, patch_linker_flags, patch_podfile, PbxProject};
use crate::layout::ProjectLayout;
use crate::patch::{PatchError, PatchOutcome, Patched, SkipReason};
use crate::safety::{ProjectGuard, SafetyError};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Name and version of this tool, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginMetadata {
    pub name: &'static str,
    pub version: &'static str,
}

impl PluginMetadata {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Podfile,
    AppDelegate,
    NativeLibraries,
    LinkerFlags,
    AndroidCredentials,
    AndroidRepository,
    AndroidDependency,
    MainApplication,
}

impl Step {
    /// Execution order.
    pub const ALL: [Step; 8] = [
        Step::Podfile,
        Step::AppDelegate,
        Step::NativeLibraries,
        Step::LinkerFlags,
        Step::AndroidCredentials,
        Step::AndroidRepository,
        Step::AndroidDependency,
        Step::MainApplication,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Podfile => "ios-pod",
            Step::AppDelegate => "ios-app-delegate",
            Step::NativeLibraries => "ios-native-libraries",
            Step::LinkerFlags => "ios-linker-flags",
            Step::AndroidCredentials => "android-credentials",
            Step::AndroidRepository => "android-repository",
            Step::AndroidDependency => "android-dependency",
            Step::MainApplication => "android-main-application",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("step {step} failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: PatchError,
    },

    #[error(transparent)]
    Safety(#[from] SafetyError),
}

/// What one step did to one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub artifact: Option<PathBuf>,
    pub outcome: PatchOutcome,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl StepReport {
    fn missing(step: Step, artifact: Option<PathBuf>) -> Self {
        warn!(step = %step, "artifact not found; step skipped");
        Self {
            step,
            artifact,
            outcome: PatchOutcome::Skipped(SkipReason::ArtifactMissing),
            before: None,
            after: None,
        }
    }

    /// Original and patched text, when the step changed something.
    pub fn diff(&self) -> Option<(&str, &str)> {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) if before != after => Some((before, after)),
            _ => None,
        }
    }
}

/// Runs every step against one project checkout.
#[derive(Debug)]
pub struct Pipeline {
    config: PluginConfig,
    layout: ProjectLayout,
    metadata: PluginMetadata,
    guard: ProjectGuard,
    dry_run: bool,
}

fn step_error(step: Step) -> impl Fn(PatchError) -> PipelineError {
    move |source| PipelineError::Step { step, source }
}

fn read_optional(path: &Path) -> Result<Option<String>, PatchError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PatchError::io(path, e)),
    }
}

impl Pipeline {
    pub fn new(
        config: PluginConfig,
        layout: ProjectLayout,
        metadata: PluginMetadata,
    ) -> Result<Self, PipelineError> {
        let guard = ProjectGuard::new(&layout.root)?;
        Ok(Self {
            config,
            layout,
            metadata,
            guard,
            dry_run: false,
        })
    }

    /// Compute every patch without writing or copying anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run(&self) -> Result<Vec<StepReport>, PipelineError> {
        info!(
            tool = self.metadata.name,
            version = self.metadata.version,
            project = %self.guard.project_root().display(),
            dry_run = self.dry_run,
            "patching project"
        );

        let config = &self.config;
        let layout = &self.layout;
        let mut reports = Vec::with_capacity(Step::ALL.len());

        reports.push(self.text_step(Step::Podfile, layout.podfile.as_deref(), false, |content| {
            patch_podfile(content, config)
        })?);

        reports.push(self.text_step(
            Step::AppDelegate,
            layout.app_delegate.as_deref(),
            false,
            |content| Ok(patch_app_delegate(content, config)),
        )?);

        reports.extend(self.xcode_project_steps()?);

        if config.credentials.is_some() {
            reports.push(self.text_step(
                Step::AndroidCredentials,
                layout.gradle_properties.as_deref(),
                true,
                |content| Ok(patch_credentials(content, config)),
            )?);
        }

        let project_gradle = layout.project_gradle.as_deref();
        reports.push(self.text_step(Step::AndroidRepository, project_gradle, false, |content| {
            let dialect = project_gradle.map_or(GradleDialect::Groovy, GradleDialect::from_path);
            Ok(patch_repositories(content, config, dialect))
        })?);

        let app_gradle = layout.app_gradle.as_deref();
        reports.push(self.text_step(Step::AndroidDependency, app_gradle, false, |content| {
            let dialect = app_gradle.map_or(GradleDialect::Groovy, GradleDialect::from_path);
            Ok(patch_dependencies(content, config, dialect))
        })?);

        reports.push(self.text_step(
            Step::MainApplication,
            layout.main_application.as_deref(),
            false,
            |content| Ok(patch_main_application(content, config)),
        )?);

        Ok(reports)
    }

    fn persist(&self, step: Step, path: &Path, content: &str, create: bool) -> Result<(), PipelineError> {
        if self.dry_run {
            debug!(step = %step, "dry run; not writing");
            return Ok(());
        }
        let target = if create {
            self.guard.validate_new(path)?
        } else {
            self.guard.validate_path(path)?
        };
        let written = write_artifact(&target, content)
            .map_err(PatchError::from)
            .map_err(step_error(step))?;
        if written == WriteOutcome::Written {
            debug!(step = %step, path = %target.display(), "artifact written");
        }
        Ok(())
    }

    /// Read, patch and write back one text artifact.
    ///
    /// With `create`, a missing file is patched as if empty.
    fn text_step<F>(
        &self,
        step: Step,
        path: Option<&Path>,
        create: bool,
        patch: F,
    ) -> Result<StepReport, PipelineError>
    where
        F: FnOnce(&str) -> Result<Patched, PatchError>,
    {
        let _span = info_span!("step", step = %step).entered();
        let Some(path) = path else {
            return Ok(StepReport::missing(step, None));
        };

        let wrap = step_error(step);
        let before = match read_optional(path).map_err(&wrap)? {
            Some(content) => content,
            None if create => String::new(),
            None => return Ok(StepReport::missing(step, Some(path.to_path_buf()))),
        };

        let patched = patch(&before).map_err(&wrap)?;
        if patched.outcome.changed() {
            self.persist(step, path, &patched.content, create)?;
        }

        Ok(StepReport {
            step,
            artifact: Some(path.to_path_buf()),
            outcome: patched.outcome,
            before: Some(before),
            after: Some(patched.content),
        })
    }

    /// Native libraries then linker flags, against one in-memory project file.
    fn xcode_project_steps(&self) -> Result<Vec<StepReport>, PipelineError> {
        let Some(path) = self.layout.pbxproj.as_deref() else {
            return Ok(vec![
                StepReport::missing(Step::NativeLibraries, None),
                StepReport::missing(Step::LinkerFlags, None),
            ]);
        };

        let wrap = step_error;
        let original = fs::read_to_string(path)
            .map_err(|e| PatchError::io(path, e))
            .map_err(wrap(Step::NativeLibraries))?;
        let mut project =
            PbxProject::parse(path, original.clone()).map_err(wrap(Step::NativeLibraries))?;

        let libraries_outcome = {
            let _span = info_span!("step", step = %Step::NativeLibraries).entered();
            self.native_libraries(&mut project)
                .map_err(wrap(Step::NativeLibraries))?
        };
        let after_libraries = project.content().to_string();

        let linker_outcome = {
            let _span = info_span!("step", step = %Step::LinkerFlags).entered();
            patch_linker_flags(&mut project).map_err(wrap(Step::LinkerFlags))?
        };

        if project.content() != original {
            self.persist(Step::LinkerFlags, path, project.content(), false)?;
        }

        Ok(vec![
            StepReport {
                step: Step::NativeLibraries,
                artifact: Some(path.to_path_buf()),
                outcome: libraries_outcome,
                before: Some(original),
                after: Some(after_libraries.clone()),
            },
            StepReport {
                step: Step::LinkerFlags,
                artifact: Some(path.to_path_buf()),
                outcome: linker_outcome,
                before: Some(after_libraries),
                after: Some(project.into_content()),
            },
        ])
    }

    fn native_libraries(&self, project: &mut PbxProject) -> Result<PatchOutcome, PatchError> {
        let source = self
            .layout
            .native_library_source(&self.config.native_library_path);
        if !source.is_dir() {
            warn!(
                path = %source.display(),
                "native library directory not found; libraries not referenced"
            );
            return Ok(PatchOutcome::Skipped(SkipReason::ArtifactMissing));
        }

        let libraries: Vec<NativeLibrary> = native_libs::discover(&source)?;
        info!(
            count = libraries.len(),
            version = %self.config.native_library_version,
            "native libraries discovered"
        );
        native_libs::check_version(&libraries, &self.config.native_library_version);

        if !libraries.is_empty() && !self.dry_run {
            native_libs::copy_into(&libraries, &self.layout.ios_library_dir(), &self.guard)?;
        }

        native_libs::register(project, &libraries)
    }
}
