//! Podfile dependency declaration

use crate::config::PluginConfig;
use crate::patch::{Anchor, Indent, PatchError, Patched, TextPatch};
use crate::sdk::{quote_single, POD_NAME, REPOSITORY_HOST};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static TARGET_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*target[ \t]+['"][^'"\n]+['"][ \t]+do\b.*$"#)
        .expect("valid podfile target regex")
});

static PLATFORM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*platform[ \t]+:ios\b.*$").expect("valid podfile platform regex")
});

/// Substring that marks the pod as declared.
pub fn marker() -> String {
    format!("pod '{POD_NAME}'")
}

/// Git source for the private pod, with credentials embedded.
///
/// The subscription id selects the customer's pod repository.
pub fn private_source(config: &PluginConfig) -> Result<Option<String>, PatchError> {
    let Some(credentials) = &config.credentials else {
        return Ok(None);
    };

    let invalid = |reason: &str| PatchError::SourceUrl(reason.to_string());

    let mut url = Url::parse(&format!("https://{REPOSITORY_HOST}/"))
        .map_err(|e| invalid(&e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("repository url cannot have a path"))?
        .pop_if_empty()
        .extend(["ios", config.subscription.as_str(), "beacon-sdk.git"]);
    url.set_username(&credentials.username)
        .map_err(|()| invalid("repository url cannot carry a username"))?;
    url.set_password(Some(&credentials.password))
        .map_err(|()| invalid("repository url cannot carry a password"))?;

    Ok(Some(url.to_string()))
}

/// The `pod` line for this configuration.
pub fn dependency_line(config: &PluginConfig) -> Result<String, PatchError> {
    Ok(match private_source(config)? {
        Some(source) => format!(
            "pod '{POD_NAME}', :git => {}, :tag => {}",
            quote_single(&source),
            quote_single(&config.sdk_version)
        ),
        None => format!(
            "pod '{POD_NAME}', {}",
            quote_single(&config.sdk_version)
        ),
    })
}

/// Declare the SDK pod inside the first `target ... do` block.
///
/// Falls back to the line after `platform :ios` when the Podfile has no
/// target block.
pub fn patch_podfile(content: &str, config: &PluginConfig) -> Result<Patched, PatchError> {
    let patch = TextPatch::new(
        "ios-pod",
        marker(),
        Anchor::after("first target block", &TARGET_BLOCK, Indent::Nested("  ")),
    )
    .fallback(Anchor::after(
        "platform declaration",
        &PLATFORM_LINE,
        Indent::Anchor,
    ))
    .lines([dependency_line(config)?]);

    Ok(patch.apply(content))
}
