use aibuild_manifest_manager::aggregate_permissions;

use crate::context::CompilerContext;
use crate::task::{Task, TaskError, TaskResult};

pub struct AggregatePermissions;

impl Task for AggregatePermissions {
    fn name(&self) -> &'static str {
        "AggregatePermissions"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let min_sdk = context
            .min_sdk
            .ok_or(TaskError::MissingPrerequisite("min SDK"))?;
        let mode = context.build_mode();
        let permissions =
            aggregate_permissions(&context.info, &context.component_types, &mode, min_sdk)?;

        for permission in &permissions {
            context.reporter.log(format!("Permission {}", permission.name));
        }
        context.permissions = Some(permissions);
        Ok(())
    }
}
