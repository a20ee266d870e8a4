//! Standard pipeline tasks, in run order.

mod assets;
mod bundle;
mod manifest;
mod package;
mod permissions;
mod prepare;
mod sdk;
mod sources;

pub use assets::AttachAssets;
pub use bundle::CreateBundleConfig;
pub use manifest::CreateManifest;
pub use package::PackageArchive;
pub use permissions::AggregatePermissions;
pub use prepare::PrepareBuildDirectories;
pub use sdk::ComputeMinSdk;
pub use sources::{ReadProjectSources, ResolveScreenOrientations};

use crate::task::Task;

/// The standard task list
pub fn standard_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(PrepareBuildDirectories),
        Box::new(ReadProjectSources),
        Box::new(ResolveScreenOrientations),
        Box::new(ComputeMinSdk),
        Box::new(AggregatePermissions),
        Box::new(CreateManifest),
        Box::new(AttachAssets),
        Box::new(CreateBundleConfig),
        Box::new(PackageArchive),
    ]
}
