//! Android artifact patchers

pub mod gradle;
pub mod main_application;
pub mod properties;

pub use gradle::{patch_credentials, patch_dependencies, patch_repositories};
pub use main_application::patch_main_application;
