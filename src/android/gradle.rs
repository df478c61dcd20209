//! Gradle build script patchers
//!
//! The project-level script gets the SDK's Maven repository, the module-level
//! script gets the dependency. Credentials never land in a build script: the
//! repository block reads them from `gradle.properties`, which
//! [`patch_credentials`] maintains.

use crate::android::properties;
use crate::config::PluginConfig;
use crate::dialect::GradleDialect;
use crate::patch::{finish, Anchor, Indent, PatchOutcome, Patched, SkipReason, TextPatch};
use crate::sdk::{
    quote, quote_single, ANDROID_ARTIFACT, ANDROID_REPOSITORY_URL, PASSWORD_PROPERTY,
    USERNAME_PROPERTY,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ALLPROJECTS_REPOSITORIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*allprojects\s*\{\s*repositories\s*\{")
        .expect("valid allprojects regex")
});

static ANY_REPOSITORIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*repositories\s*\{").expect("valid repositories regex")
});

static TOP_LEVEL_DEPENDENCIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^dependencies\s*\{").expect("valid top-level dependencies regex")
});

static ANY_DEPENDENCIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*dependencies\s*\{").expect("valid dependencies regex")
});

/// The `maven { ... }` block for the SDK repository.
pub fn repository_block(config: &PluginConfig, dialect: GradleDialect) -> Vec<String> {
    let mut lines = vec!["maven {".to_string()];
    match dialect {
        GradleDialect::Groovy => {
            lines.push(format!("    url {}", quote_single(ANDROID_REPOSITORY_URL)));
            if config.credentials.is_some() {
                lines.push("    credentials {".to_string());
                lines.push(format!(
                    "        username = project.findProperty({}) ?: ''",
                    quote_single(USERNAME_PROPERTY)
                ));
                lines.push(format!(
                    "        password = project.findProperty({}) ?: ''",
                    quote_single(PASSWORD_PROPERTY)
                ));
                lines.push("    }".to_string());
            }
        }
        GradleDialect::KotlinScript => {
            lines.push(format!("    url = uri({})", quote(ANDROID_REPOSITORY_URL)));
            if config.credentials.is_some() {
                lines.push("    credentials {".to_string());
                lines.push(format!(
                    "        username = project.findProperty({}) as String?",
                    quote(USERNAME_PROPERTY)
                ));
                lines.push(format!(
                    "        password = project.findProperty({}) as String?",
                    quote(PASSWORD_PROPERTY)
                ));
                lines.push("    }".to_string());
            }
        }
    }
    lines.push("}".to_string());
    lines
}

/// Register the SDK's Maven repository in the project-level build script.
///
/// Prefers `allprojects { repositories { ... } }` and falls back to the first
/// `repositories {` block in the file.
pub fn patch_repositories(content: &str, config: &PluginConfig, dialect: GradleDialect) -> Patched {
    TextPatch::new(
        "android-repository",
        ANDROID_REPOSITORY_URL,
        Anchor::after(
            "allprojects repositories",
            &ALLPROJECTS_REPOSITORIES,
            Indent::Nested("        "),
        ),
    )
    .fallback(Anchor::after(
        "first repositories block",
        &ANY_REPOSITORIES,
        Indent::Nested("    "),
    ))
    .lines(repository_block(config, dialect))
    .apply(content)
}

pub fn dependency_line(config: &PluginConfig, dialect: GradleDialect) -> String {
    let coordinate = format!("{ANDROID_ARTIFACT}:{}", config.sdk_version);
    match dialect {
        GradleDialect::Groovy => format!("implementation {}", quote_single(&coordinate)),
        GradleDialect::KotlinScript => format!("implementation({})", quote(&coordinate)),
    }
}

/// Declare the SDK dependency in the module-level build script.
///
/// The top-level `dependencies {` block wins over one nested in
/// `buildscript`.
pub fn patch_dependencies(content: &str, config: &PluginConfig, dialect: GradleDialect) -> Patched {
    TextPatch::new(
        "android-dependency",
        ANDROID_ARTIFACT,
        Anchor::after(
            "top-level dependencies block",
            &TOP_LEVEL_DEPENDENCIES,
            Indent::Nested("    "),
        ),
    )
    .fallback(Anchor::after(
        "first dependencies block",
        &ANY_DEPENDENCIES,
        Indent::Nested("    "),
    ))
    .lines([dependency_line(config, dialect)])
    .apply(content)
}

/// Store repository credentials in `gradle.properties`.
///
/// Without credentials there is nothing to store and the file is untouched.
pub fn patch_credentials(content: &str, config: &PluginConfig) -> Patched {
    let Some(credentials) = &config.credentials else {
        debug!(patch = "android-credentials", "no credentials configured");
        return Patched::unchanged(content, SkipReason::AlreadyApplied);
    };

    let edits = properties::upsert_edits(
        content,
        &[
            (USERNAME_PROPERTY, credentials.username.as_str()),
            (PASSWORD_PROPERTY, credentials.password.as_str()),
        ],
    );

    if edits.is_empty() {
        debug!(patch = "android-credentials", "already applied");
        return Patched::unchanged(content, SkipReason::AlreadyApplied);
    }

    finish(
        "android-credentials",
        content,
        edits,
        PatchOutcome::Applied {
            anchor: "gradle.properties",
        },
    )
}
