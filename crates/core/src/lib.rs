//! aibuild core - shared types
//!
//! Errors, configuration, the project model read from a project's
//! properties and form files, the per-build reporter, and the
//! `build.out` result file exchanged with the build server.

pub mod config;
pub mod error;
pub mod events;
pub mod form;
pub mod output;
pub mod project;

pub use config::{BuildServerConfig, PipelineConfig, ServerConfig};
pub use error::{CoreError, Result};
pub use events::{BuildEvent, LogLevel, Reporter};
pub use form::FormDefinition;
pub use output::{BuildResultCode, BuildResultFile};
pub use project::{FileScope, Project, ProjectProperties, SourceDescriptor};

/// aibuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
