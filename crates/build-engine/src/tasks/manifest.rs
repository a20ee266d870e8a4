use aibuild_manifest_manager::{
    ManifestBuilder, ManifestInputs, ManifestWarning, ManifestWriter, Screen, MANIFEST_FILE_NAME,
};

use crate::context::CompilerContext;
use crate::task::{Task, TaskError, TaskResult};

/// Synthesizes `AndroidManifest.xml` into the build dir
pub struct CreateManifest;

impl Task for CreateManifest {
    fn name(&self) -> &'static str {
        "CreateManifest"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let min_sdk = context
            .min_sdk
            .ok_or(TaskError::MissingPrerequisite("min SDK"))?;
        let permissions = context
            .permissions
            .as_deref()
            .ok_or(TaskError::MissingPrerequisite("permissions"))?;

        let screens: Vec<Screen> = context
            .project
            .sources
            .iter()
            .map(|source| {
                let orientation = context
                    .form_orientations
                    .get(&source.qualified_name)
                    .map_or("unspecified", String::as_str);
                Screen::new(&source.qualified_name, orientation)
            })
            .collect();

        let properties = &context.project.properties;
        let inputs = ManifestInputs {
            main_class: context.project.main_class(),
            project_name: context.project.project_name(),
            version_code: properties.version_code(),
            version_name: properties.version_name(),
            app_name: properties.app_name(),
            maps_key: properties.maps_key(),
            screens: &screens,
            used_components: &context.component_types,
            permissions,
            mode: context.build_mode(),
            min_sdk,
            target_sdk: context.options.target_sdk,
        };
        let manifest = ManifestBuilder::new(&context.info).build(&inputs);

        let mut errors = Vec::new();
        for warning in manifest.validate() {
            match warning {
                ManifestWarning::Error(message) => errors.push(message),
                ManifestWarning::Warning(message) => context.reporter.warn(message),
            }
        }
        if !errors.is_empty() {
            return Err(TaskError::ManifestInvalid(errors.join("; ")));
        }

        context.reporter.log(format!("VCode: {}", manifest.version_code));
        context.reporter.log(format!("VName: {}", manifest.version_name));

        let path = context.paths.build_dir.join(MANIFEST_FILE_NAME);
        ManifestWriter::new().write_to_file(&manifest, &path)?;
        context.paths.manifest = Some(path);
        Ok(())
    }
}
