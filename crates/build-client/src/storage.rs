//! Project Storage
//!
//! The build protocol only needs a small slice of project storage: file
//! listings split into sources and outputs, plus blob reads, writes and
//! deletes. [`MemoryStorage`] keeps everything in memory.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use aibuild_core::output::BUILD_FOLDER;
use aibuild_core::Project;
use parking_lot::RwLock;
use tracing::debug;
use walkdir::WalkDir;

/// Numeric project identifier, unique per user
pub type ProjectId = u64;

/// Owner of a project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: String,
    pub email: String,
}

impl User {
    pub fn new(id: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
        }
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Project {project} of user {user} does not exist")]
    UnknownProject { user: String, project: ProjectId },
    #[error("File {path} not found in project {project}")]
    FileNotFound { project: ProjectId, path: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value blob store holding users' projects
///
/// Paths are `/`-separated and relative to the project root. Everything
/// under `build/` is build output, everything else is source.
pub trait ProjectStorage: Send + Sync {
    fn project_name(&self, user_id: &str, project: ProjectId) -> Result<String, StorageError>;

    /// Source file paths, sorted
    fn source_files(&self, user_id: &str, project: ProjectId) -> Result<Vec<String>, StorageError>;

    /// Output file paths, sorted
    fn output_files(&self, user_id: &str, project: ProjectId) -> Result<Vec<String>, StorageError>;

    fn read_file(&self, user_id: &str, project: ProjectId, path: &str) -> Result<Vec<u8>, StorageError>;

    fn write_file(
        &self,
        user_id: &str,
        project: ProjectId,
        path: &str,
        contents: Vec<u8>,
    ) -> Result<(), StorageError>;

    fn delete_file(&self, user_id: &str, project: ProjectId, path: &str) -> Result<(), StorageError>;

    /// The user's signing keystore, if one was ever stored
    fn user_keystore(&self, user_id: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Whether a project path is build output
pub fn is_output_file(path: &str) -> bool {
    path.split('/').next() == Some(BUILD_FOLDER) && path.contains('/')
}

#[derive(Debug, Default)]
struct StoredProject {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
}

/// In-memory [`ProjectStorage`]
#[derive(Debug, Default)]
pub struct MemoryStorage {
    projects: RwLock<HashMap<(String, ProjectId), StoredProject>>,
    keystores: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty project, replacing any project with the same id
    pub fn create_project(&self, user_id: &str, project: ProjectId, name: &str) {
        self.projects.write().insert(
            (user_id.to_string(), project),
            StoredProject {
                name: name.to_string(),
                files: BTreeMap::new(),
            },
        );
    }

    /// Copy every file of an on-disk project into storage
    pub fn import_project(
        &self,
        user_id: &str,
        project: ProjectId,
        source: &Project,
    ) -> Result<usize, StorageError> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&source.root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&source.root) else {
                continue;
            };
            let path: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.insert(path.join("/"), std::fs::read(entry.path())?);
        }

        let count = files.len();
        debug!("Imported {} file(s) from {:?}", count, source.root);
        self.projects.write().insert(
            (user_id.to_string(), project),
            StoredProject {
                name: source.project_name().to_string(),
                files,
            },
        );
        Ok(count)
    }

    pub fn set_user_keystore(&self, user_id: &str, keystore: Vec<u8>) {
        self.keystores.write().insert(user_id.to_string(), keystore);
    }

    /// Read a keystore file from disk and store it for the user
    pub fn load_user_keystore(&self, user_id: &str, path: &Path) -> Result<(), StorageError> {
        self.set_user_keystore(user_id, std::fs::read(path)?);
        Ok(())
    }

    fn unknown(user_id: &str, project: ProjectId) -> StorageError {
        StorageError::UnknownProject {
            user: user_id.to_string(),
            project,
        }
    }

    fn list(&self, user_id: &str, project: ProjectId, outputs: bool) -> Result<Vec<String>, StorageError> {
        let projects = self.projects.read();
        let stored = projects
            .get(&(user_id.to_string(), project))
            .ok_or_else(|| Self::unknown(user_id, project))?;
        Ok(stored
            .files
            .keys()
            .filter(|path| is_output_file(path) == outputs)
            .cloned()
            .collect())
    }
}

impl ProjectStorage for MemoryStorage {
    fn project_name(&self, user_id: &str, project: ProjectId) -> Result<String, StorageError> {
        self.projects
            .read()
            .get(&(user_id.to_string(), project))
            .map(|stored| stored.name.clone())
            .ok_or_else(|| Self::unknown(user_id, project))
    }

    fn source_files(&self, user_id: &str, project: ProjectId) -> Result<Vec<String>, StorageError> {
        self.list(user_id, project, false)
    }

    fn output_files(&self, user_id: &str, project: ProjectId) -> Result<Vec<String>, StorageError> {
        self.list(user_id, project, true)
    }

    fn read_file(&self, user_id: &str, project: ProjectId, path: &str) -> Result<Vec<u8>, StorageError> {
        let projects = self.projects.read();
        let stored = projects
            .get(&(user_id.to_string(), project))
            .ok_or_else(|| Self::unknown(user_id, project))?;
        stored
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound {
                project,
                path: path.to_string(),
            })
    }

    fn write_file(
        &self,
        user_id: &str,
        project: ProjectId,
        path: &str,
        contents: Vec<u8>,
    ) -> Result<(), StorageError> {
        let mut projects = self.projects.write();
        let stored = projects
            .get_mut(&(user_id.to_string(), project))
            .ok_or_else(|| Self::unknown(user_id, project))?;
        stored.files.insert(path.to_string(), contents);
        Ok(())
    }

    fn delete_file(&self, user_id: &str, project: ProjectId, path: &str) -> Result<(), StorageError> {
        let mut projects = self.projects.write();
        let stored = projects
            .get_mut(&(user_id.to_string(), project))
            .ok_or_else(|| Self::unknown(user_id, project))?;
        stored.files.remove(path);
        Ok(())
    }

    fn user_keystore(&self, user_id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.keystores.read().get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_split() {
        let storage = MemoryStorage::new();
        storage.create_project("u1", 7, "HelloPurr");
        for path in [
            "youngandroidproject/project.properties",
            "src/a/Screen1.scm",
            "build/apk/build.out",
            "buildings.txt",
        ] {
            storage.write_file("u1", 7, path, b"x".to_vec()).unwrap();
        }

        assert_eq!(
            storage.source_files("u1", 7).unwrap(),
            vec!["buildings.txt", "src/a/Screen1.scm", "youngandroidproject/project.properties"]
        );
        assert_eq!(storage.output_files("u1", 7).unwrap(), vec!["build/apk/build.out"]);

        storage.delete_file("u1", 7, "build/apk/build.out").unwrap();
        assert!(storage.output_files("u1", 7).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_project() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.project_name("u1", 1),
            Err(StorageError::UnknownProject { .. })
        ));
        storage.create_project("u1", 1, "A");
        assert!(matches!(
            storage.read_file("u1", 1, "missing"),
            Err(StorageError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_import_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("youngandroidproject")).unwrap();
        std::fs::write(
            root.join("youngandroidproject/project.properties"),
            "main=a.b.Screen1\nname=B\n",
        )
        .unwrap();
        std::fs::create_dir_all(root.join("src/a/b")).unwrap();
        std::fs::write(root.join("src/a/b/Screen1.scm"), "").unwrap();
        std::fs::create_dir_all(root.join("build/apk")).unwrap();
        std::fs::write(root.join("build/apk/build.out"), "{}").unwrap();

        let project = Project::load(root).unwrap();
        let storage = MemoryStorage::new();
        assert_eq!(storage.import_project("u1", 3, &project).unwrap(), 3);
        assert_eq!(storage.project_name("u1", 3).unwrap(), "B");
        assert_eq!(storage.output_files("u1", 3).unwrap(), vec!["build/apk/build.out"]);
        assert_eq!(storage.source_files("u1", 3).unwrap().len(), 2);
    }
}
