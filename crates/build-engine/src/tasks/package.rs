use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use aibuild_manifest_manager::{ManifestParser, MANIFEST_FILE_NAME};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::config::BuildTarget;
use crate::context::{CompilerContext, ASSETS_DIR, BUNDLE_CONFIG_FILE};
use crate::task::{Task, TaskError, TaskResult};

/// Module directory inside an app bundle
const BUNDLE_MODULE: &str = "base";

/// Validates the manifest and zips the build dir into `deploy/<name>.<ext>`
///
/// The archive is neither compiled nor signed. Entries are written in a
/// fixed order with a fixed timestamp so identical inputs give identical
/// bytes.
pub struct PackageArchive;

impl PackageArchive {
    /// Archive entry names paired with the files they are read from
    fn entries(
        context: &CompilerContext,
        manifest: &Path,
    ) -> Result<Vec<(String, PathBuf)>, TaskError> {
        let mut entries = Vec::new();
        let (manifest_entry, assets_prefix) = match context.target() {
            BuildTarget::Apk => (MANIFEST_FILE_NAME.to_string(), ASSETS_DIR.to_string()),
            BuildTarget::Aab => {
                let config = context
                    .paths
                    .bundle_config
                    .clone()
                    .ok_or(TaskError::MissingPrerequisite("bundle configuration"))?;
                entries.push((BUNDLE_CONFIG_FILE.to_string(), config));
                (
                    format!("{}/manifest/{}", BUNDLE_MODULE, MANIFEST_FILE_NAME),
                    format!("{}/{}", BUNDLE_MODULE, ASSETS_DIR),
                )
            }
        };

        entries.push((manifest_entry, manifest.to_path_buf()));
        for asset in &context.assets {
            entries.push((
                format!("{}/{}", assets_prefix, asset),
                context.paths.assets_dir.join(asset),
            ));
        }
        Ok(entries)
    }
}

impl Task for PackageArchive {
    fn name(&self) -> &'static str {
        "PackageArchive"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let manifest = context
            .paths
            .manifest
            .clone()
            .ok_or(TaskError::MissingPrerequisite("manifest"))?;

        let summary = ManifestParser::parse_file(&manifest)?;
        let launcher = summary
            .launcher()
            .ok_or_else(|| TaskError::ManifestInvalid("no launcher activity".into()))?;
        context.reporter.log(format!(
            "Package {} launches {}",
            summary.package, launcher.name
        ));

        let entries = Self::entries(context, &manifest)?;
        let archive = context.paths.deploy_dir.join(format!(
            "{}.{}",
            context.project.project_name(),
            context.target().extension()
        ));
        fs::create_dir_all(&context.paths.deploy_dir)?;

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        let mut zip = ZipWriter::new(File::create(&archive)?);
        for (name, path) in &entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&fs::read(path)?)?;
        }
        zip.finish()?;

        let size = fs::metadata(&archive)?.len();
        context.reporter.info(format!(
            "Packaged {} ({} bytes, {} entries)",
            archive.display(),
            size,
            entries.len()
        ));
        context.paths.archive = Some(archive);
        Ok(())
    }
}
