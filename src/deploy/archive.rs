//! Zip archive of a deployment package, sent as a Telegram document.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::deploy::packager::{DeploymentPackage, PackageError};

/// Archive file name for a package, e.g. `railway-project.zip`.
pub fn file_name(package: &DeploymentPackage) -> String {
    format!("{}-project.zip", package.platform)
}

/// Write every file of the package into an in-memory zip.
///
/// Entries carry a fixed timestamp so identical packages give identical bytes.
pub fn zip_package(package: &DeploymentPackage) -> Result<Vec<u8>, PackageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    for file in &package.files {
        writer
            .start_file(file.path.as_str(), options)
            .map_err(|e| PackageError::Archive(e.to_string()))?;
        writer
            .write_all(file.content.as_bytes())
            .map_err(|e| PackageError::Archive(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PackageError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::packager::FileEntry;
    use std::io::Read;
    use zip::ZipArchive;

    fn sample() -> DeploymentPackage {
        DeploymentPackage {
            platform: "railway",
            files: vec![
                FileEntry::new("main.py", "print('hello')"),
                FileEntry::new("Procfile", "web: python main.py\n"),
            ],
            instructions: "deploy it",
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(&sample()), "railway-project.zip");
    }

    #[test]
    fn test_archive_contains_files() {
        let bytes = zip_package(&sample()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("main.py")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "print('hello')");
    }

    #[test]
    fn test_archive_is_reproducible() {
        assert_eq!(zip_package(&sample()).unwrap(), zip_package(&sample()).unwrap());
    }
}
