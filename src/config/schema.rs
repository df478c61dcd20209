use crate::config::version::{check_format, version_at_least};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Oldest dependency-manager SDK release the generated code is written against.
pub const MINIMUM_SDK_VERSION: &str = "1.1.66";

/// Raw plugin options as they appear in the host build configuration.
///
/// Every field is optional here; [`PluginOptions::validate`] turns this into a
/// [`PluginConfig`] or reports every violated constraint at once.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub browser_name: Option<String>,
    #[serde(default)]
    pub enable_test_mode: Option<bool>,
    #[serde(default)]
    pub disable_crash_reporting: Option<bool>,
    #[serde(default)]
    pub sdk_version: Option<String>,
    #[serde(default)]
    pub native_library_version: Option<String>,
    #[serde(default)]
    pub native_library_path: Option<String>,
}

/// Values substituted for options the user left out.
///
/// Resolved once at startup (built-ins, optionally overridden by a
/// `[defaults]` table) and handed to validation explicitly.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SdkDefaults {
    pub sdk_version: String,
    pub native_library_version: String,
    pub native_library_path: String,
    pub minimum_sdk_version: String,
}

impl Default for SdkDefaults {
    fn default() -> Self {
        Self {
            sdk_version: "1.2.0".to_string(),
            native_library_version: "1.2.0".to_string(),
            native_library_path: "./vendor/beacon".to_string(),
            minimum_sdk_version: MINIMUM_SDK_VERSION.to_string(),
        }
    }
}

/// Repository credentials; only ever constructed with both halves present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Validated, normalized plugin configuration threaded through every patcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub subscription: String,
    pub uid: String,
    pub credentials: Option<Credentials>,
    pub browser_name: Option<String>,
    pub enable_test_mode: bool,
    pub disable_crash_reporting: bool,
    pub sdk_version: String,
    pub native_library_version: String,
    pub native_library_path: PathBuf,
}

impl PluginConfig {
    /// Convenience constructor with every optional field at its default.
    pub fn new(subscription: impl Into<String>, uid: impl Into<String>) -> Self {
        let defaults = SdkDefaults::default();
        Self {
            subscription: subscription.into(),
            uid: uid.into(),
            credentials: None,
            browser_name: None,
            enable_test_mode: false,
            disable_crash_reporting: false,
            sdk_version: defaults.sdk_version,
            native_library_version: defaults.native_library_version,
            native_library_path: PathBuf::from(defaults.native_library_path),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl PluginOptions {
    pub fn validate(&self, defaults: &SdkDefaults) -> Result<PluginConfig, ValidationError> {
        let mut issues = Vec::new();

        let subscription = present(&self.subscription);
        if subscription.is_none() {
            issues.push(ValidationIssue::MissingField {
                field: "subscription",
            });
        }
        let uid = present(&self.uid);
        if uid.is_none() {
            issues.push(ValidationIssue::MissingField { field: "uid" });
        }

        let credentials = match (present(&self.username), present(&self.password)) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }),
            (None, None) => None,
            (Some(_), None) => {
                issues.push(ValidationIssue::IncompleteCredentials { missing: "password" });
                None
            }
            (None, Some(_)) => {
                issues.push(ValidationIssue::IncompleteCredentials { missing: "username" });
                None
            }
        };

        let declared_sdk = present(&self.sdk_version);
        if let Some(version) = declared_sdk {
            match check_format(version) {
                Err(_) => issues.push(ValidationIssue::MalformedVersion {
                    field: "sdkVersion",
                    value: version.to_string(),
                }),
                Ok(()) => {
                    if !version_at_least(Some(version), &defaults.minimum_sdk_version) {
                        issues.push(ValidationIssue::UnsupportedVersion {
                            field: "sdkVersion",
                            value: version.to_string(),
                            minimum: defaults.minimum_sdk_version.clone(),
                        });
                    }
                }
            }
        }

        let declared_native = present(&self.native_library_version);
        if let Some(version) = declared_native {
            if check_format(version).is_err() {
                issues.push(ValidationIssue::MalformedVersion {
                    field: "nativeLibraryVersion",
                    value: version.to_string(),
                });
            }
        }

        let (Some(subscription), Some(uid)) = (subscription, uid) else {
            return Err(ValidationError { issues });
        };
        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        let sdk_version = declared_sdk.unwrap_or(&defaults.sdk_version).to_string();
        let native_library_version = declared_native
            .unwrap_or(&defaults.native_library_version)
            .to_string();
        info!(
            sdk_version = %sdk_version,
            defaulted = declared_sdk.is_none(),
            "resolved Beacon SDK version"
        );
        info!(
            native_library_version = %native_library_version,
            defaulted = declared_native.is_none(),
            "resolved Beacon native library version"
        );

        Ok(PluginConfig {
            subscription: subscription.to_string(),
            uid: uid.to_string(),
            credentials,
            browser_name: present(&self.browser_name).map(str::to_string),
            enable_test_mode: self.enable_test_mode.unwrap_or(false),
            disable_crash_reporting: self.disable_crash_reporting.unwrap_or(false),
            sdk_version,
            native_library_version,
            native_library_path: PathBuf::from(
                present(&self.native_library_path).unwrap_or(&defaults.native_library_path),
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn has_credential_issue(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| matches!(issue, ValidationIssue::IncompleteCredentials { .. }))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    IncompleteCredentials {
        missing: &'static str,
    },
    MalformedVersion {
        field: &'static str,
        value: String,
    },
    UnsupportedVersion {
        field: &'static str,
        value: String,
        minimum: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required option '{field}'")
            }
            ValidationIssue::IncompleteCredentials { missing } => write!(
                f,
                "authentication requires both 'username' and 'password' ('{missing}' is missing)"
            ),
            ValidationIssue::MalformedVersion { field, value } => write!(
                f,
                "option '{field}' has invalid version '{value}' (expected dot-separated integers)"
            ),
            ValidationIssue::UnsupportedVersion {
                field,
                value,
                minimum,
            } => write!(
                f,
                "option '{field}' requests version {value}, but the minimum supported version is {minimum}"
            ),
        }
    }
}
