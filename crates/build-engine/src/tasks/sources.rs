use aibuild_core::{FileScope, FormDefinition};

use crate::context::CompilerContext;
use crate::task::{Task, TaskError, TaskResult};

/// Main-screen property selecting the file access mode
const FILE_SCOPE_PROPERTY: &str = "DefaultFileScope";

/// Parses every screen and records which components the project uses
pub struct ReadProjectSources;

impl Task for ReadProjectSources {
    fn name(&self) -> &'static str {
        "ReadProjectSources"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        for source in &context.project.sources {
            let contents = std::fs::read_to_string(&source.file)?;
            let form = FormDefinition::parse(&source.file.display().to_string(), &contents)?;
            context.component_types.extend(form.component_types.iter().cloned());
            context.forms.insert(source.qualified_name.clone(), form);
        }

        let main = context
            .forms
            .get(context.project.main_class())
            .ok_or(TaskError::MissingPrerequisite("main screen"))?;
        context.file_scope = FileScope::from_property(main.property(FILE_SCOPE_PROPERTY));

        let unknown: Vec<String> = context
            .component_types
            .iter()
            .filter(|name| !context.info.contains(name))
            .cloned()
            .collect();
        for name in unknown {
            context
                .reporter
                .warn(format!("No build information for component {}", name));
        }

        let message = format!(
            "Read {} screen(s) using {} component type(s)",
            context.forms.len(),
            context.component_types.len()
        );
        context.reporter.info(message);
        Ok(())
    }
}

/// Records the orientation every screen asks for
pub struct ResolveScreenOrientations;

impl Task for ResolveScreenOrientations {
    fn name(&self) -> &'static str {
        "ResolveScreenOrientations"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        if context.forms.is_empty() {
            return Err(TaskError::MissingPrerequisite("screen definitions"));
        }

        for (name, form) in &context.forms {
            context
                .form_orientations
                .insert(name.clone(), form.screen_orientation().to_string());
        }
        Ok(())
    }
}
