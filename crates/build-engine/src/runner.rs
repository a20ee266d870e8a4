//! Build Runner
//!
//! Coordinates the build: filters the task list for the requested target,
//! runs the tasks in order against one context and stops at the first
//! failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aibuild_core::output::RESULT_FILE_NAME;
use aibuild_core::{BuildEvent, BuildResultFile, Project, Reporter};
use aibuild_manifest_manager::ComponentInfo;
use tracing::{debug, info};

use crate::config::{BuildOptions, BuildTarget};
use crate::context::{CompilerContext, PipelineState};
use crate::task::{Task, TaskError};
use crate::tasks::standard_tasks;

/// Build output
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub target: BuildTarget,
    /// `<project build dir>/<target>`
    pub build_dir: PathBuf,
    /// Path to the generated manifest
    pub manifest: Option<PathBuf>,
    /// Path to the output APK/AAB
    pub archive: Option<PathBuf>,
    pub elapsed: Duration,
    /// Build log
    pub log: String,
}

/// A run that stopped at a failing task
#[derive(Debug, thiserror::Error)]
#[error("{task} failed: {source}")]
pub struct PipelineError {
    pub task: String,
    pub source: TaskError,
    /// Build log up to and including the failure
    pub log: String,
}

/// Build runner that coordinates the build process
pub struct BuildRunner {
    info: Arc<ComponentInfo>,
    tasks: Vec<Box<dyn Task>>,
}

impl BuildRunner {
    /// Create a runner without tasks
    pub fn new(info: Arc<ComponentInfo>) -> Self {
        Self {
            info,
            tasks: Vec::new(),
        }
    }

    /// Create a runner with the standard pipeline installed
    pub fn standard(info: Arc<ComponentInfo>) -> Self {
        Self {
            info,
            tasks: standard_tasks(),
        }
    }

    /// Append a task
    pub fn with_task(mut self, task: impl Task + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    pub fn info(&self) -> &Arc<ComponentInfo> {
        &self.info
    }

    /// Tasks that run for `target`, in order
    pub fn tasks_for(&self, target: BuildTarget) -> Vec<&dyn Task> {
        self.tasks
            .iter()
            .filter(|task| task.applies_to(target))
            .map(|task| task.as_ref())
            .collect()
    }

    /// Run the build
    pub fn run(&self, project: Project, options: BuildOptions) -> Result<BuildOutput, PipelineError> {
        self.run_with_reporter(project, options, Reporter::new())
    }

    /// Run the build, logging into `reporter`
    pub fn run_with_reporter(
        &self,
        project: Project,
        options: BuildOptions,
        reporter: Reporter,
    ) -> Result<BuildOutput, PipelineError> {
        let start = Instant::now();
        let mut context = CompilerContext::with_reporter(project, options, self.info.clone(), reporter);

        self.execute(&mut context)?;

        let elapsed = start.elapsed();
        info!("Build completed in {:.2}s", elapsed.as_secs_f64());
        Ok(BuildOutput {
            target: context.target(),
            build_dir: context.paths.build_dir.clone(),
            manifest: context.paths.manifest.clone(),
            archive: context.paths.archive.clone(),
            elapsed,
            log: context.reporter.transcript(),
        })
    }

    /// Run every applicable task against an existing context
    pub fn execute(&self, context: &mut CompilerContext) -> Result<(), PipelineError> {
        let target = context.target();
        let tasks = self.tasks_for(target);
        let total = tasks.len();

        context.reporter.info(format!(
            "Building {} ({})",
            context.project.project_name(),
            target
        ));

        for (index, task) in tasks.into_iter().enumerate() {
            let name = task.name();
            debug!("Running task {}", name);
            context.state = PipelineState::Running(name.to_string());
            context.reporter.emit(BuildEvent::TaskStarted {
                task: name.to_string(),
            });

            if let Err(source) = task.execute(context) {
                context.reporter.error(format!("{} failed: {}", name, source));
                context.state = PipelineState::Failed(name.to_string());
                context.reporter.emit(BuildEvent::Finished { success: false });
                return Err(PipelineError {
                    task: name.to_string(),
                    source,
                    log: context.reporter.transcript(),
                });
            }

            context.reporter.emit(BuildEvent::TaskFinished {
                task: name.to_string(),
            });
            context.reporter.set_progress(((index + 1) * 100 / total) as u32);
        }

        context.state = PipelineState::Succeeded;
        context.reporter.emit(BuildEvent::Finished { success: true });
        Ok(())
    }
}

/// The `build.out` contents describing a finished run
pub fn result_file(run: &Result<BuildOutput, PipelineError>) -> BuildResultFile {
    match run {
        Ok(output) => BuildResultFile::success(output.log.clone()),
        Err(e) => BuildResultFile::failure(e.log.clone(), e.to_string()),
    }
}

/// Write `build.out` under `<build_root>/<target>/`
pub fn write_result_file(
    build_root: &Path,
    target: BuildTarget,
    file: &BuildResultFile,
) -> Result<PathBuf, TaskError> {
    let dir = build_root.join(target.as_str());
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(RESULT_FILE_NAME);
    std::fs::write(&path, file.to_json()?)?;
    Ok(path)
}
