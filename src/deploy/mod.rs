//! Deployment packaging - turns generated code into per-platform projects.

pub mod archive;
pub mod catalog;
pub mod language;
pub mod packager;
pub mod templates;

pub use catalog::{LanguageSupport, PlatformCatalog, PlatformDescriptor};
pub use packager::{DeploymentPackage, FileEntry, PackageError, Packager};
