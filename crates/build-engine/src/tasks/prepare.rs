use std::fs;

use tracing::debug;

use crate::context::CompilerContext;
use crate::task::{Task, TaskResult};

/// Recreates `build/<target>` with its output subdirectories
pub struct PrepareBuildDirectories;

impl Task for PrepareBuildDirectories {
    fn name(&self) -> &'static str {
        "PrepareBuildDirectories"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let paths = &context.paths;
        if paths.build_dir.exists() {
            debug!("Removing stale build output {:?}", paths.build_dir);
            fs::remove_dir_all(&paths.build_dir)?;
        }
        fs::create_dir_all(&paths.assets_dir)?;
        fs::create_dir_all(&paths.deploy_dir)?;

        let message = format!("Build directory: {}", paths.build_dir.display());
        context.reporter.log(message);
        Ok(())
    }
}
