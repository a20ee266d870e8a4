//! Build Engine
//!
//! Runs the build pipeline for one project: reads the screens, works out
//! components, SDK level and permissions, writes the manifest and packages
//! an unsigned archive.

pub mod config;
pub mod context;
pub mod runner;
pub mod task;
pub mod tasks;

pub use config::{BuildOptions, BuildTarget};
pub use context::{CompilerContext, Paths, PipelineState};
pub use runner::{result_file, write_result_file, BuildOutput, BuildRunner, PipelineError};
pub use task::{Task, TaskError, TaskResult};
