//! Build Client
//!
//! Client side of the build protocol: project storage, source archive
//! export, build-server URLs and callback tokens, and the request/poll
//! calls themselves.

pub mod archive;
pub mod callback;
pub mod client;
pub mod endpoint;
pub mod storage;

pub use archive::{export_source_archive, ExportError, SourceArchive};
pub use callback::{CallbackError, CallbackToken};
pub use client::{BuildAccepted, BuildRequestError, BuildServerClient, BuildStatus};
pub use storage::{MemoryStorage, ProjectId, ProjectStorage, StorageError, User};
