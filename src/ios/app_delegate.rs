//! AppDelegate initialization
//!
//! Objective-C(++) delegates get the init block at the top of
//! `application:didFinishLaunchingWithOptions:`, falling back to the line
//! before `return [super application:...]`. Swift delegates use the matching
//! `func application(_:didFinishLaunchingWithOptions:)` anchors.

use crate::config::PluginConfig;
use crate::dialect::AppleDialect;
use crate::entry;
use crate::patch::{Anchor, Indent, Patched, TextPatch};
use once_cell::sync::Lazy;
use regex::Regex;

static OBJC_DID_FINISH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*-\s*\(BOOL\)\s*application:\s*\(UIApplication\s*\*\)\s*\w+\s+didFinishLaunchingWithOptions:\s*\(NSDictionary[^)]*\)\s*\w+\s*\{",
    )
    .expect("valid objc lifecycle regex")
});

static OBJC_SUPER_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*return\s+\[super\s+application:\s*\w+\s+didFinishLaunchingWithOptions:")
        .expect("valid objc super regex")
});

static OBJC_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*#import\b.*$").expect("valid objc import regex"));

static SWIFT_DID_FINISH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:public|open|override|@objc)\s+)*func\s+application\(\s*_\s+\w+:\s*UIApplication,\s*didFinishLaunchingWithOptions\s+\w+:[^{]*\{",
    )
    .expect("valid swift lifecycle regex")
});

static SWIFT_SUPER_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*return\s+super\.application\(\s*\w+,\s*didFinishLaunchingWithOptions:")
        .expect("valid swift super regex")
});

static SWIFT_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*import\s+\w+.*$").expect("valid swift import regex"));

fn init_patch(dialect: AppleDialect, config: &PluginConfig) -> TextPatch {
    let (primary, fallback) = match dialect {
        AppleDialect::ObjectiveC => (
            Anchor::after(
                "didFinishLaunchingWithOptions",
                &OBJC_DID_FINISH,
                Indent::Nested("  "),
            ),
            Anchor::before("return [super application:...]", &OBJC_SUPER_RETURN, Indent::Anchor),
        ),
        AppleDialect::Swift => (
            Anchor::after(
                "func application(_:didFinishLaunchingWithOptions:)",
                &SWIFT_DID_FINISH,
                Indent::Nested("    "),
            ),
            Anchor::before("return super.application(...)", &SWIFT_SUPER_RETURN, Indent::Anchor),
        ),
    };

    TextPatch::new("ios-app-delegate", dialect.marker(), primary)
        .fallback(fallback)
        .lines(dialect.init_calls(config))
}

fn import_patch(dialect: AppleDialect) -> TextPatch {
    let pattern = match dialect {
        AppleDialect::ObjectiveC => &OBJC_IMPORT,
        AppleDialect::Swift => &SWIFT_IMPORT,
    };
    TextPatch::new(
        "ios-app-delegate-import",
        dialect.import_line(),
        Anchor::after("first import", pattern, Indent::Flush),
    )
    .fallback(Anchor::file_start())
    .lines([dialect.import_line()])
}

/// Insert the SDK import and start call into an AppDelegate source.
pub fn patch_app_delegate(content: &str, config: &PluginConfig) -> Patched {
    let dialect = AppleDialect::classify(content);
    entry::splice(
        "ios-app-delegate",
        content,
        &init_patch(dialect, config),
        &import_patch(dialect),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{PatchOutcome, SkipReason};

    const OBJC: &str = r#"#import "AppDelegate.h"

#import <React/RCTBundleURLProvider.h>

@implementation AppDelegate

- (BOOL)application:(UIApplication *)application didFinishLaunchingWithOptions:(NSDictionary *)launchOptions
{
  self.moduleName = @"main";
  return [super application:application didFinishLaunchingWithOptions:launchOptions];
}

@end
"#;

    const SWIFT: &str = r#"import Expo
import React

@UIApplicationMain
public class AppDelegate: ExpoAppDelegate {
    public override func application(
        _ application: UIApplication,
        didFinishLaunchingWithOptions launchOptions: [UIApplication.LaunchOptionsKey: Any]? = nil
    ) -> Bool {
        self.moduleName = "main"
        return super.application(application, didFinishLaunchingWithOptions: launchOptions)
    }
}
"#;

    #[test]
    fn test_objc_primary_anchor() {
        let mut config = PluginConfig::new("acme", "u1");
        config.browser_name = Some("Acme".to_string());
        let patched = patch_app_delegate(OBJC, &config);

        assert_eq!(
            patched.outcome,
            PatchOutcome::Applied {
                anchor: "didFinishLaunchingWithOptions"
            }
        );
        assert!(patched.content.contains(
            "{\n  [Beacon startWithSubscription:@\"acme\" uid:@\"u1\"];\n  [Beacon setBrowserName:@\"Acme\"];\n  self.moduleName"
        ));
        assert!(patched
            .content
            .starts_with("#import \"AppDelegate.h\"\n#import <BeaconSDK/BeaconSDK.h>\n"));
        assert!(!patched.content.contains("enableTestMode"));
        assert_eq!(patched.content.matches("startWithSubscription").count(), 1);
    }

    #[test]
    fn test_objc_fallback_before_super_return() {
        let source = "#import \"AppDelegate.h\"\n\n@implementation AppDelegate\n- (BOOL)application:(UIApplication *)app didFinishLaunchingWithOptions:(NSDictionary *)options andMore:(id)x\n{\n  return [super application:app didFinishLaunchingWithOptions:options];\n}\n@end\n";
        let patched = patch_app_delegate(source, &PluginConfig::new("acme", "u1"));
        assert!(matches!(
            patched.outcome,
            PatchOutcome::AppliedViaFallback { .. }
        ));
        assert!(patched.content.contains(
            "{\n  [Beacon startWithSubscription:@\"acme\" uid:@\"u1\"];\n  return [super application"
        ));
    }

    #[test]
    fn test_swift_primary_anchor() {
        let mut config = PluginConfig::new("acme", "u1");
        config.enable_test_mode = true;
        let patched = patch_app_delegate(SWIFT, &config);

        assert!(matches!(patched.outcome, PatchOutcome::Applied { .. }));
        assert!(patched.content.contains(
            ") -> Bool {\n        Beacon.start(subscription: \"acme\", uid: \"u1\")\n        Beacon.enableTestMode()\n        self.moduleName"
        ));
        assert!(patched.content.starts_with("import Expo\nimport BeaconSDK\nimport React\n"));
    }

    #[test]
    fn test_swift_fallback_before_super_return() {
        let source = "import UIKit\n\nclass AppDelegate: BaseDelegate {\n    override func application(_ application: UIApplication, didFinishLaunchingWithOptions: [UIApplication.LaunchOptionsKey: Any]?) -> Bool {\n        return super.application(application, didFinishLaunchingWithOptions: didFinishLaunchingWithOptions)\n    }\n}\n";
        let patched = patch_app_delegate(source, &PluginConfig::new("acme", "u1"));

        assert_eq!(
            patched.outcome,
            PatchOutcome::AppliedViaFallback {
                anchor: "return super.application(...)"
            }
        );
        assert!(patched.content.contains(
            "-> Bool {\n        Beacon.start(subscription: \"acme\", uid: \"u1\")\n        return super.application("
        ));
        assert!(patched.content.starts_with("import UIKit\nimport BeaconSDK\n"));
    }

    #[test]
    fn test_no_anchor_leaves_file_and_import_untouched() {
        let source = "import UIKit\n\nclass Helper {\n    func run() {}\n}\n";
        let patched = patch_app_delegate(source, &PluginConfig::new("acme", "u1"));
        assert_eq!(patched.content, source);
        assert_eq!(
            patched.outcome,
            PatchOutcome::Skipped(SkipReason::AnchorNotFound)
        );
    }

    #[test]
    fn test_idempotent() {
        let config = PluginConfig::new("acme", "u1");
        let once = patch_app_delegate(SWIFT, &config);
        let twice = patch_app_delegate(&once.content, &config);
        assert_eq!(once.content, twice.content);
        assert_eq!(
            twice.outcome,
            PatchOutcome::Skipped(SkipReason::AlreadyApplied)
        );
    }

    #[test]
    fn test_existing_import_not_duplicated() {
        let source = OBJC.replacen(
            "#import \"AppDelegate.h\"\n",
            "#import \"AppDelegate.h\"\n#import <BeaconSDK/BeaconSDK.h>\n",
            1,
        );
        let patched = patch_app_delegate(&source, &PluginConfig::new("acme", "u1"));
        assert_eq!(patched.content.matches("BeaconSDK.h").count(), 1);
        assert!(patched.content.contains("startWithSubscription"));
    }
}
