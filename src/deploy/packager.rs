//! Builds deployable packages from generated code.
//!
//! The packager only looks platforms up in the catalog and checks the result.
//! Everything platform-specific lives in the descriptor's template function.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::deploy::catalog::{PlatformCatalog, PlatformDescriptor};
use crate::deploy::language;

/// One file of a generated project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the project root.
    pub path: String,
    pub content: String,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Files plus setup instructions for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPackage {
    pub platform: &'static str,
    pub files: Vec<FileEntry>,
    pub instructions: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("{platform} does not support {language}")]
    UnsupportedLanguage { platform: String, language: String },

    /// A template emitted the same path twice.
    #[error("template for {platform} produced duplicate file {path}")]
    DuplicateFile { platform: String, path: String },

    #[error("failed to build archive: {0}")]
    Archive(String),
}

/// Turns code into a [`DeploymentPackage`] for a catalog platform.
#[derive(Clone)]
pub struct Packager {
    catalog: Arc<PlatformCatalog>,
}

impl Packager {
    pub fn new(catalog: Arc<PlatformCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PlatformCatalog {
        &self.catalog
    }

    /// Package `code` written in `language` for the platform with id `platform_id`.
    ///
    /// The language is lowercased and aliases are resolved ("py" → "python")
    /// before it is checked against the platform's language set.
    pub fn package(
        &self,
        code: &str,
        language: &str,
        platform_id: &str,
    ) -> Result<DeploymentPackage, PackageError> {
        let platform = self
            .catalog
            .get(platform_id)
            .ok_or_else(|| PackageError::UnsupportedPlatform(platform_id.to_string()))?;

        let language = language::normalize(language);
        if !platform.supports(&language) {
            return Err(PackageError::UnsupportedLanguage {
                platform: platform.display_name.to_string(),
                language,
            });
        }

        let files = (platform.templates)(code, &language);
        check_unique_paths(platform, &files)?;

        debug!(
            "Packaged {} file(s) for {} ({})",
            files.len(),
            platform.id,
            language
        );

        Ok(DeploymentPackage {
            platform: platform.id,
            files,
            instructions: platform.instructions,
        })
    }
}

fn check_unique_paths(platform: &PlatformDescriptor, files: &[FileEntry]) -> Result<(), PackageError> {
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        if !seen.insert(file.path.as_str()) {
            error!(
                "Template bug: {} emitted {} more than once",
                platform.id, file.path
            );
            return Err(PackageError::DuplicateFile {
                platform: platform.id.to_string(),
                path: file.path.clone(),
            });
        }
    }
    Ok(())
}
