//! aibuild - command line entry point
//!
//! Runs builds locally or against a remote build server.

use std::path::PathBuf;

use aibuild::commands::{BuildCommand, ComponentsCommand, PollCommand, RemoteUser, SubmitCommand};
use aibuild::core::ServerConfig;
use aibuild::build::BuildTarget;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Application name
pub const APP_NAME: &str = "aibuild";

#[derive(Parser)]
#[command(name = "aibuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, global = true, env = "AIBUILD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build pipeline locally
    Build(BuildArgs),

    /// Ask the build server to build a project
    Submit(RemoteArgs),

    /// Check once whether a remote build has finished
    Poll(RemoteArgs),

    /// List the component catalog
    Components(ComponentsArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Project root directory
    project: PathBuf,

    #[arg(long, default_value = "apk")]
    target: BuildTarget,

    /// Build the live-testing companion
    #[arg(long)]
    companion: bool,

    /// Companion build for the emulator
    #[arg(long)]
    emulator: bool,

    /// Keep SMS and call-log permissions in companion builds
    #[arg(long)]
    dangerous_permissions: bool,

    /// Component metadata JSON replacing the built-in catalog
    #[arg(long)]
    components: Option<PathBuf>,
}

#[derive(Args)]
struct RemoteArgs {
    /// Project root directory
    project: PathBuf,

    /// Email address of the project owner
    #[arg(long)]
    user: String,

    /// Storage id of the owner, defaults to the email address
    #[arg(long)]
    user_id: Option<String>,

    #[arg(long, default_value = "apk")]
    target: BuildTarget,

    /// Keystore uploaded with the sources
    #[arg(long)]
    keystore: Option<PathBuf>,
}

impl RemoteArgs {
    fn remote_user(&self) -> RemoteUser {
        RemoteUser {
            email: self.user.clone(),
            id: self.user_id.clone(),
        }
    }
}

#[derive(Args)]
struct ComponentsArgs {
    /// Component metadata JSON replacing the built-in catalog
    #[arg(long)]
    components: Option<PathBuf>,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} starting...", APP_NAME, aibuild::core::VERSION);
    let config = load_config(cli.config).await?;

    match cli.command {
        Commands::Build(args) => {
            BuildCommand {
                project_path: args.project,
                target: args.target,
                companion: args.companion,
                emulator: args.emulator,
                dangerous_permissions: args.dangerous_permissions,
                components: args.components,
            }
            .execute(&config)?;
        }
        Commands::Submit(args) => {
            SubmitCommand {
                user: args.remote_user(),
                project_path: args.project,
                target: args.target,
                keystore: args.keystore,
            }
            .execute(&config)
            .await?;
        }
        Commands::Poll(args) => {
            PollCommand {
                user: args.remote_user(),
                project_path: args.project,
                target: args.target,
            }
            .execute(&config)
            .await?;
        }
        Commands::Components(args) => {
            ComponentsCommand {
                components: args.components,
            }
            .execute(&config)?;
        }
    }

    Ok(())
}

/// Load configuration from an explicit path or the platform config dir
async fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    let path = match path.or_else(ServerConfig::config_file) {
        Some(path) => path,
        None => {
            debug!("No configuration directory, using defaults");
            return Ok(ServerConfig::default());
        }
    };
    Ok(ServerConfig::load_from(&path).await?)
}
