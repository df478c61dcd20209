//! Beacon Patcher: wires the Beacon analytics SDK into generated mobile projects
//!
//! A build-time transform over an iOS/Android project checkout: the Podfile,
//! the AppDelegate, the Xcode project, the Gradle scripts, `gradle.properties`
//! and the Android `MainApplication` each get one idempotent insertion.
//!
//! # Architecture
//!
//! All text changes compile down to a single primitive: [`Edit`], a verified
//! byte-span replacement. Each artifact patcher is a [`TextPatch`]: a marker
//! substring that means "already applied", a primary anchor, fallback anchors
//! and the lines to insert. Patchers report a [`PatchOutcome`] instead of
//! only logging, so callers can tell "already applied" from "anchor missing".
//!
//! # Safety
//!
//! - Configuration is validated before any artifact is read
//! - All edits verify expected before-text before applying
//! - Atomic file writes (tempfile + fsync + rename)
//! - Writes must stay inside the project root, outside generated directories
//!
//! # Example
//!
//! ```no_run
//! use beacon_patcher::{load_config, Pipeline, PluginMetadata, ProjectLayout};
//!
//! let config = load_config("beacon.toml")?;
//! let layout = ProjectLayout::discover(".");
//! let reports = Pipeline::new(config, layout, PluginMetadata::current())?.run()?;
//!
//! for report in reports {
//!     println!("{}: {}", report.step, report.outcome);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod android;
pub mod config;
pub mod dialect;
pub mod edit;
mod entry;
pub mod ios;
pub mod layout;
pub mod patch;
pub mod pipeline;
pub mod safety;
pub mod sdk;

pub use config::{load_config, load_from_path, ConfigError, PluginConfig, PluginOptions, SdkDefaults};
pub use dialect::{AppleDialect, GradleDialect, JvmDialect};
pub use edit::{Edit, EditError, WriteOutcome};
pub use layout::ProjectLayout;
pub use patch::{PatchError, PatchOutcome, Patched, SkipReason, TextPatch};
pub use pipeline::{Pipeline, PipelineError, PluginMetadata, Step, StepReport};
pub use safety::{ProjectGuard, SafetyError};
