//! CLI commands for aibuild
//!
//! Provides command-line interface functionality for automation and scripting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aibuild_build_client::{BuildServerClient, BuildStatus, MemoryStorage, ProjectId, User};
use aibuild_build_engine::{result_file, write_result_file, BuildOptions, BuildOutput, BuildRunner, BuildTarget};
use aibuild_core::{PipelineConfig, Project, ServerConfig};
use aibuild_manifest_manager::ComponentInfo;
use anyhow::{anyhow, Context, Result};
use tracing::info;

/// Project id used when a project directory is loaded into storage
pub const LOCAL_PROJECT_ID: ProjectId = 1;

/// Load the component catalog: an explicit file, the configured file, or the built-in one
pub fn load_component_info(pipeline: &PipelineConfig, path: Option<&Path>) -> Result<ComponentInfo> {
    match path.or(pipeline.component_info.as_deref()) {
        Some(path) => ComponentInfo::load(path)
            .with_context(|| format!("loading component metadata from {}", path.display())),
        None => Ok(ComponentInfo::builtin()?),
    }
}

fn load_project(path: &Path) -> Result<Project> {
    Project::load(path).map_err(|e| anyhow!(e.user_message()))
}

/// Local build command options
pub struct BuildCommand {
    pub project_path: PathBuf,
    pub target: BuildTarget,
    pub companion: bool,
    pub emulator: bool,
    pub dangerous_permissions: bool,
    pub components: Option<PathBuf>,
}

impl BuildCommand {
    /// Run the pipeline and record the outcome in `build.out`
    pub fn execute(&self, config: &ServerConfig) -> Result<BuildOutput> {
        info!("Building project: {:?}", self.project_path);

        let info = load_component_info(&config.pipeline, self.components.as_deref())?;
        let project = load_project(&self.project_path)?;
        let build_root = project.build_dir();

        let options = BuildOptions::from_pipeline(&config.pipeline, self.target)
            .with_companion(self.companion)
            .with_emulator(self.emulator)
            .with_dangerous_permissions(self.dangerous_permissions);

        let run = BuildRunner::standard(Arc::new(info)).run(project, options);
        let result = write_result_file(&build_root, self.target, &result_file(&run))?;
        info!("Wrote {}", result.display());

        let output = run?;
        if let Some(ref archive) = output.archive {
            println!("Built {}", archive.display());
        }
        Ok(output)
    }
}

/// Identity used for remote builds
pub struct RemoteUser {
    pub email: String,
    /// Defaults to the email address
    pub id: Option<String>,
}

impl RemoteUser {
    fn user(&self) -> User {
        User::new(self.id.as_deref().unwrap_or(&self.email), &self.email)
    }
}

fn client_for(config: &ServerConfig, user: &User, project_path: &Path, keystore: Option<&Path>) -> Result<BuildServerClient> {
    let project = load_project(project_path)?;
    let storage = Arc::new(MemoryStorage::new());
    storage.import_project(&user.id, LOCAL_PROJECT_ID, &project)?;
    if let Some(keystore) = keystore {
        storage.load_user_keystore(&user.id, keystore)?;
    }
    Ok(BuildServerClient::new(config.build_server.clone(), storage)?)
}

/// Remote build request options
pub struct SubmitCommand {
    pub project_path: PathBuf,
    pub user: RemoteUser,
    pub target: BuildTarget,
    pub keystore: Option<PathBuf>,
}

impl SubmitCommand {
    /// Upload the project to the build server
    pub async fn execute(&self, config: &ServerConfig) -> Result<()> {
        let user = self.user.user();
        let client = client_for(config, &user, &self.project_path, self.keystore.as_deref())?;
        let accepted = client
            .request_build(&user, LOCAL_PROJECT_ID, self.target.as_str())
            .await?;
        println!("{}", accepted.message);
        Ok(())
    }
}

/// Build result poll options
pub struct PollCommand {
    pub project_path: PathBuf,
    pub user: RemoteUser,
    pub target: BuildTarget,
}

impl PollCommand {
    /// Check once for a build result
    pub async fn execute(&self, config: &ServerConfig) -> Result<BuildStatus> {
        let user = self.user.user();
        let client = client_for(config, &user, &self.project_path, None)?;
        let status = client
            .poll_build_result(&user, LOCAL_PROJECT_ID, self.target.as_str())
            .await?;

        match &status {
            BuildStatus::InProgress { progress } => println!("Build in progress ({}%)", progress),
            BuildStatus::Succeeded { output } => println!("Build succeeded\n{}", output),
            BuildStatus::Failed { code, output, error } => {
                println!("Build failed with result {}\n{}{}", code, output, error)
            }
        }
        Ok(status)
    }
}

/// Component catalog listing
pub struct ComponentsCommand {
    pub components: Option<PathBuf>,
}

impl ComponentsCommand {
    /// One line per component type
    pub fn lines(&self, config: &ServerConfig) -> Result<Vec<String>> {
        let info = load_component_info(&config.pipeline, self.components.as_deref())?;
        Ok(info
            .component_types()
            .map(|name| {
                let mut line = name.to_string();
                if let Some(min_sdk) = info.min_sdk(name) {
                    line.push_str(&format!(" (minSdk {})", min_sdk));
                }
                let permissions = info.permissions(name);
                if !permissions.is_empty() {
                    let names: Vec<&str> = permissions.iter().map(String::as_str).collect();
                    line.push_str(&format!(": {}", names.join(", ")));
                }
                line
            })
            .collect())
    }

    pub fn execute(&self, config: &ServerConfig) -> Result<()> {
        let lines = self.lines(config)?;
        println!("{} component types:", lines.len());
        for line in lines {
            println!("  {}", line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aibuild_core::BuildResultFile;

    fn write_project(root: &Path, screen: &str) {
        std::fs::create_dir_all(root.join("youngandroidproject")).unwrap();
        std::fs::write(
            root.join("youngandroidproject/project.properties"),
            "main=appinventor.ai_test.HelloPurr.Screen1\nname=HelloPurr\n",
        )
        .unwrap();
        let package = root.join("src/appinventor/ai_test/HelloPurr");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(package.join("Screen1.scm"), screen).unwrap();
    }

    fn build(root: &Path) -> BuildCommand {
        BuildCommand {
            project_path: root.to_path_buf(),
            target: BuildTarget::Apk,
            companion: false,
            emulator: false,
            dangerous_permissions: false,
            components: None,
        }
    }

    #[test]
    fn test_build_writes_result_file() {
        let dir = tempfile::tempdir().unwrap();
        write_project(
            dir.path(),
            "#|\n$JSON\n{\"Properties\":{\"$Name\":\"Screen1\",\"$Type\":\"Form\"}}\n|#\n",
        );

        let output = build(dir.path()).execute(&ServerConfig::default()).unwrap();
        assert!(output.archive.unwrap().ends_with("deploy/HelloPurr.apk"));

        let text = std::fs::read_to_string(dir.path().join("build/apk/build.out")).unwrap();
        let file = BuildResultFile::from_json(&text).unwrap();
        assert!(file.is_success());
        assert!(file.output.contains("Building HelloPurr"));
    }

    #[test]
    fn test_failed_build_writes_result_file() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), "not a form");

        assert!(build(dir.path()).execute(&ServerConfig::default()).is_err());
        let text = std::fs::read_to_string(dir.path().join("build/apk/build.out")).unwrap();
        let file = BuildResultFile::from_json(&text).unwrap();
        assert_eq!(file.result, 1);
        assert!(file.error.starts_with("ReadProjectSources failed"));
    }

    #[test]
    fn test_component_catalog_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.json");
        std::fs::write(&path, r#"{"Beacon": {"minSdk": 18, "permissions": ["android.permission.BLUETOOTH"]}}"#)
            .unwrap();

        let command = ComponentsCommand {
            components: Some(path),
        };
        assert_eq!(
            command.lines(&ServerConfig::default()).unwrap(),
            vec!["Beacon (minSdk 18): android.permission.BLUETOOTH"]
        );

        let builtin = ComponentsCommand { components: None };
        assert!(builtin.lines(&ServerConfig::default()).unwrap().len() > 10);
    }
}
