//! Source archive export
//!
//! The build server receives the project as a `.aia` zip of its source
//! files, optionally with the owner's keystore at the archive root.

use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::storage::{ProjectId, ProjectStorage, StorageError, User};

/// Archive entry holding the user's keystore
pub const KEYSTORE_ENTRY: &str = "android.keystore";

/// Extension of exported source archives
pub const SOURCE_ARCHIVE_EXTENSION: &str = "aia";

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An exported project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArchive {
    /// `<project name>.aia`
    pub file_name: String,
    pub content: Vec<u8>,
}

impl SourceArchive {
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Zip every source file of a project, outputs excluded
pub fn export_source_archive(
    storage: &dyn ProjectStorage,
    user: &User,
    project: ProjectId,
    include_keystore: bool,
) -> Result<SourceArchive, ExportError> {
    let name = storage.project_name(&user.id, project)?;
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for path in storage.source_files(&user.id, project)? {
        zip.start_file(path.as_str(), options)?;
        zip.write_all(&storage.read_file(&user.id, project, &path)?)?;
    }

    if include_keystore {
        match storage.user_keystore(&user.id)? {
            Some(keystore) => {
                zip.start_file(KEYSTORE_ENTRY, options)?;
                zip.write_all(&keystore)?;
            }
            None => debug!("User {} has no keystore yet", user.id),
        }
    }

    let content = zip.finish()?.into_inner();
    Ok(SourceArchive {
        file_name: format!("{}.{}", name, SOURCE_ARCHIVE_EXTENSION),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn entries(archive: &SourceArchive) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.content.clone())).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_export_excludes_outputs() {
        let storage = MemoryStorage::new();
        let user = User::new("u1", "me@example.org");
        storage.create_project("u1", 1, "HelloPurr");
        storage.write_file("u1", 1, "src/a/Screen1.scm", b"form".to_vec()).unwrap();
        storage.write_file("u1", 1, "assets/kitty.png", b"png".to_vec()).unwrap();
        storage.write_file("u1", 1, "build/apk/build.out", b"{}".to_vec()).unwrap();
        storage.set_user_keystore("u1", b"keystore".to_vec());

        let archive = export_source_archive(&storage, &user, 1, true).unwrap();
        assert_eq!(archive.file_name, "HelloPurr.aia");
        assert_eq!(
            entries(&archive),
            vec!["assets/kitty.png", "src/a/Screen1.scm", "android.keystore"]
        );

        let without = export_source_archive(&storage, &user, 1, false).unwrap();
        assert_eq!(entries(&without).len(), 2);
    }

    #[test]
    fn test_export_is_deterministic() {
        let storage = MemoryStorage::new();
        let user = User::new("u1", "me@example.org");
        storage.create_project("u1", 1, "HelloPurr");
        storage.write_file("u1", 1, "src/a/Screen1.scm", b"form".to_vec()).unwrap();

        let first = export_source_archive(&storage, &user, 1, true).unwrap();
        let second = export_source_archive(&storage, &user, 1, true).unwrap();
        assert_eq!(first, second);
    }
}
