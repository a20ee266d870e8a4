use std::fs;

use walkdir::WalkDir;

use crate::context::CompilerContext;
use crate::task::{Task, TaskResult};

/// Copies the project's assets into the build dir
pub struct AttachAssets;

impl Task for AttachAssets {
    fn name(&self) -> &'static str {
        "AttachAssets"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let source = context.project.assets_dir();
        if !source.is_dir() {
            context.reporter.log("Project has no assets");
            return Ok(());
        }

        let mut copied = Vec::new();
        for entry in WalkDir::new(&source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&source) else {
                continue;
            };
            let destination = context.paths.assets_dir.join(relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &destination)?;

            let name: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            copied.push(name.join("/"));
        }
        copied.sort();

        context.reporter.info(format!("Attached {} asset(s)", copied.len()));
        context.assets = copied;
        Ok(())
    }
}
