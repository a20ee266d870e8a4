//! Compiler Context
//!
//! Everything one build run accumulates. Created by the runner, handed
//! to each task in turn, dropped when the run ends.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use aibuild_core::{FileScope, FormDefinition, Project, Reporter};
use aibuild_manifest_manager::{BuildMode, ComponentInfo, Permission};

use crate::config::{BuildOptions, BuildTarget};

/// Directory holding the archive inside the target build dir
pub const DEPLOY_DIR: &str = "deploy";

/// Directory holding copied assets inside the target build dir
pub const ASSETS_DIR: &str = "assets";

/// Bundle configuration file name
pub const BUNDLE_CONFIG_FILE: &str = "BundleConfig.json";

/// Where the run puts things
#[derive(Debug, Clone, Default)]
pub struct Paths {
    /// `<project build dir>/<target>`
    pub build_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub deploy_dir: PathBuf,
    /// Set once the manifest has been written
    pub manifest: Option<PathBuf>,
    /// Set once the bundle configuration has been written
    pub bundle_config: Option<PathBuf>,
    /// Set once the archive has been written
    pub archive: Option<PathBuf>,
}

impl Paths {
    pub fn new(project: &Project, target: BuildTarget) -> Self {
        let build_dir = project.build_dir().join(target.as_str());
        Self {
            assets_dir: build_dir.join(ASSETS_DIR),
            deploy_dir: build_dir.join(DEPLOY_DIR),
            build_dir,
            ..Default::default()
        }
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Pending,
    Running(String),
    Succeeded,
    Failed(String),
}

/// Per-run build state
pub struct CompilerContext {
    pub project: Project,
    pub options: BuildOptions,
    pub info: Arc<ComponentInfo>,
    pub paths: Paths,
    pub reporter: Reporter,
    pub state: PipelineState,

    /// Parsed forms keyed by qualified screen name
    pub forms: BTreeMap<String, FormDefinition>,
    /// Component types used anywhere in the project
    pub component_types: BTreeSet<String>,
    /// Screen orientation keyed by qualified screen name
    pub form_orientations: BTreeMap<String, String>,
    /// `DefaultFileScope` of the main screen
    pub file_scope: FileScope,
    pub min_sdk: Option<u32>,
    pub permissions: Option<Vec<Permission>>,
    /// Asset paths copied into the build dir, relative and `/`-separated
    pub assets: Vec<String>,
}

impl CompilerContext {
    pub fn new(project: Project, options: BuildOptions, info: Arc<ComponentInfo>) -> Self {
        Self::with_reporter(project, options, info, Reporter::new())
    }

    /// Create a context that logs into an existing reporter
    pub fn with_reporter(
        project: Project,
        options: BuildOptions,
        info: Arc<ComponentInfo>,
        reporter: Reporter,
    ) -> Self {
        let paths = Paths::new(&project, options.target);
        Self {
            project,
            options,
            info,
            paths,
            reporter,
            state: PipelineState::Pending,
            forms: BTreeMap::new(),
            component_types: BTreeSet::new(),
            form_orientations: BTreeMap::new(),
            file_scope: FileScope::default(),
            min_sdk: None,
            permissions: None,
            assets: Vec::new(),
        }
    }

    pub fn target(&self) -> BuildTarget {
        self.options.target
    }

    /// Flags the permission policy and manifest builder look at
    pub fn build_mode(&self) -> BuildMode {
        BuildMode {
            companion: self.options.companion,
            emulator: self.options.emulator,
            dangerous_permissions: self.options.dangerous_permissions,
            legacy_file_access: self.file_scope == FileScope::Legacy,
            shared_file_access: self.file_scope == FileScope::Shared,
        }
    }
}
