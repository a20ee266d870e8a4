//! Build tasks
//!
//! A build is an ordered list of tasks run against one
//! [`CompilerContext`](crate::CompilerContext). Each task declares the
//! targets it takes part in.

use aibuild_core::CoreError;
use aibuild_manifest_manager::{ConstraintError, ParseError, WriteError};

use crate::config::BuildTarget;
use crate::context::CompilerContext;

/// Task errors
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Permission constraint error: {0}")]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    Project(#[from] CoreError),
    #[error("Could not write manifest: {0}")]
    ManifestWrite(#[from] WriteError),
    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),
    #[error("Could not read back manifest: {0}")]
    ManifestParse(#[from] ParseError),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} has not been computed")]
    MissingPrerequisite(&'static str),
}

impl From<walkdir::Error> for TaskError {
    fn from(e: walkdir::Error) -> Self {
        TaskError::Io(e.into())
    }
}

/// Outcome of one task; there is no partial success
pub type TaskResult = Result<(), TaskError>;

/// One step of the build pipeline
pub trait Task: Send + Sync {
    /// Name shown in the build log
    fn name(&self) -> &'static str;

    /// Targets this task runs for
    fn targets(&self) -> &'static [BuildTarget] {
        BuildTarget::ALL
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult;

    fn applies_to(&self, target: BuildTarget) -> bool {
        self.targets().contains(&target)
    }
}
