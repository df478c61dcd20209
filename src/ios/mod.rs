//! iOS artifact patchers

pub mod app_delegate;
pub mod linker;
pub mod native_libs;
pub mod pbxproj;
pub mod podfile;

pub use app_delegate::patch_app_delegate;
pub use linker::patch_linker_flags;
pub use native_libs::{LibraryKind, NativeLibrary};
pub use pbxproj::PbxProject;
pub use podfile::patch_podfile;
