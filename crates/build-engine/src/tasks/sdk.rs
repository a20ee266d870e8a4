use crate::context::CompilerContext;
use crate::task::{Task, TaskResult};

/// minSdkVersion is the highest floor among the default and every used component
pub struct ComputeMinSdk;

impl Task for ComputeMinSdk {
    fn name(&self) -> &'static str {
        "ComputeMinSdk"
    }

    fn execute(&self, context: &mut CompilerContext) -> TaskResult {
        let floors = context.info.used(&context.component_types).min_sdks_needed();
        let min_sdk = floors
            .into_values()
            .fold(context.options.default_min_sdk, u32::max);

        context.min_sdk = Some(min_sdk);
        context.reporter.log(format!("Min SDK {}", min_sdk));
        Ok(())
    }
}
