//! Beacon SDK identifiers and generated call sequences.

use crate::config::PluginConfig;
use crate::dialect::{AppleDialect, JvmDialect};

pub const POD_NAME: &str = "BeaconSDK";
pub const ANDROID_ARTIFACT: &str = "com.beacon.sdk:beacon-android";
pub const REPOSITORY_HOST: &str = "repo.beacon.example";
pub const ANDROID_REPOSITORY_URL: &str = "https://repo.beacon.example/android";

/// gradle.properties keys holding the repository credentials.
pub const USERNAME_PROPERTY: &str = "beaconUsername";
pub const PASSWORD_PROPERTY: &str = "beaconPassword";

/// Linker flag the static library needs for its Objective-C categories.
pub const LINKER_FLAG: &str = "-ObjC";

/// Group and directory name used for vendored native libraries under `ios/`.
pub const NATIVE_GROUP: &str = "Beacon";

/// Quote a value as a C-family string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quote a value as a Kotlin string literal (`$` would start a template).
pub fn quote_kotlin(value: &str) -> String {
    quote(value).replace('$', "\\$")
}

/// Quote a value as a single-quoted Ruby / Groovy string.
pub fn quote_single(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Optional calls that follow the mandatory start call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionalCall {
    BrowserName(String),
    DisableCrashReporting,
    EnableTestMode,
}

/// Optional calls implied by the configuration, in emission order.
pub fn optional_calls(config: &PluginConfig) -> Vec<OptionalCall> {
    let mut calls = Vec::new();
    if let Some(name) = &config.browser_name {
        calls.push(OptionalCall::BrowserName(name.clone()));
    }
    if config.disable_crash_reporting {
        calls.push(OptionalCall::DisableCrashReporting);
    }
    if config.enable_test_mode {
        calls.push(OptionalCall::EnableTestMode);
    }
    calls
}

impl AppleDialect {
    pub fn import_line(self) -> &'static str {
        match self {
            AppleDialect::ObjectiveC => "#import <BeaconSDK/BeaconSDK.h>",
            AppleDialect::Swift => "import BeaconSDK",
        }
    }

    /// Substring whose presence means the init block is already there.
    pub fn marker(self) -> &'static str {
        match self {
            AppleDialect::ObjectiveC => "[Beacon startWithSubscription:",
            AppleDialect::Swift => "Beacon.start(subscription:",
        }
    }

    pub fn init_calls(self, config: &PluginConfig) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            AppleDialect::ObjectiveC => {
                lines.push(format!(
                    "[Beacon startWithSubscription:@{} uid:@{}];",
                    quote(&config.subscription),
                    quote(&config.uid)
                ));
                for call in optional_calls(config) {
                    lines.push(match call {
                        OptionalCall::BrowserName(name) => {
                            format!("[Beacon setBrowserName:@{}];", quote(&name))
                        }
                        OptionalCall::DisableCrashReporting => {
                            "[Beacon disableCrashReporting];".to_string()
                        }
                        OptionalCall::EnableTestMode => "[Beacon enableTestMode];".to_string(),
                    });
                }
            }
            AppleDialect::Swift => {
                lines.push(format!(
                    "Beacon.start(subscription: {}, uid: {})",
                    quote(&config.subscription),
                    quote(&config.uid)
                ));
                for call in optional_calls(config) {
                    lines.push(match call {
                        OptionalCall::BrowserName(name) => {
                            format!("Beacon.setBrowserName({})", quote(&name))
                        }
                        OptionalCall::DisableCrashReporting => {
                            "Beacon.disableCrashReporting()".to_string()
                        }
                        OptionalCall::EnableTestMode => "Beacon.enableTestMode()".to_string(),
                    });
                }
            }
        }
        lines
    }
}

impl JvmDialect {
    pub fn import_line(self) -> &'static str {
        match self {
            JvmDialect::Java => "import com.beacon.sdk.Beacon;",
            JvmDialect::Kotlin => "import com.beacon.sdk.Beacon",
        }
    }

    pub fn marker(self) -> &'static str {
        "Beacon.start(this,"
    }

    pub fn init_calls(self, config: &PluginConfig) -> Vec<String> {
        let (quote_fn, end) = match self {
            JvmDialect::Java => (quote as fn(&str) -> String, ";"),
            JvmDialect::Kotlin => (quote_kotlin as fn(&str) -> String, ""),
        };

        let mut lines = vec![format!(
            "Beacon.start(this, {}, {}){end}",
            quote_fn(&config.subscription),
            quote_fn(&config.uid)
        )];
        for call in optional_calls(config) {
            lines.push(match call {
                OptionalCall::BrowserName(name) => {
                    format!("Beacon.setBrowserName({}){end}", quote_fn(&name))
                }
                OptionalCall::DisableCrashReporting => {
                    format!("Beacon.disableCrashReporting(){end}")
                }
                OptionalCall::EnableTestMode => format!("Beacon.enableTestMode(){end}"),
            });
        }
        lines
    }
}
