use serde_json::json;

use crate::config::BuildTarget;
use crate::context::{CompilerContext, BUNDLE_CONFIG_FILE};
use crate::task::{Task, TaskResult};

/// Writes the bundletool configuration for app bundles
pub struct CreateBundleConfig;

impl Task for CreateBundleConfig {
    fn name(&self) -> &'static str {
        "CreateBundleConfig"
    }

    fn targets(&self) -> &'static [BuildTarget] {
        &[BuildTarget::Aab]
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let config = json!({
            "compression": {
                "uncompressedGlob": ["assets/**"]
            },
            "optimizations": {
                "uncompressNativeLibraries": {
                    "enabled": false
                }
            }
        });

        let path = context.paths.build_dir.join(BUNDLE_CONFIG_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&config)?)?;
        context.paths.bundle_config = Some(path);
        Ok(())
    }
}
