//! aibuild - build server pipeline for a visual Android app builder
//!
//! Turns a project (properties file plus screen definitions) into an
//! AndroidManifest.xml and an unsigned archive, and talks to a remote
//! build server on behalf of project storage.
//!
//! ## Architecture
//!
//! - `aibuild-core`: errors, configuration, project model, build reporting
//! - `aibuild-manifest-manager`: component metadata, permission policy,
//!   manifest synthesis
//! - `aibuild-build-engine`: the task pipeline
//! - `aibuild-build-client`: build request and polling protocol

pub mod commands;

// Re-export main components for library usage
pub use aibuild_build_client as client;
pub use aibuild_build_engine as build;
pub use aibuild_core as core;
pub use aibuild_manifest_manager as manifest;

/// Prelude module for convenient imports
pub mod prelude {
    pub use aibuild_build_client::{BuildServerClient, BuildStatus, MemoryStorage, ProjectStorage, User};
    pub use aibuild_build_engine::{BuildOptions, BuildRunner, BuildTarget};
    pub use aibuild_core::{Project, ServerConfig};
    pub use aibuild_manifest_manager::{ComponentInfo, ManifestParser, ManifestWriter};
}
