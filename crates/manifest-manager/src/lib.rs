//! Android Manifest Manager
//!
//! Component metadata registry, permission aggregation and deterministic
//! AndroidManifest.xml synthesis for the build server.

pub mod builder;
pub mod components;
pub mod infrastructure;
pub mod intent_filters;
pub mod manifest;
pub mod parser;
pub mod permissions;
pub mod policy;
pub mod registry;
pub mod writer;

pub use builder::{ManifestBuilder, ManifestInputs, Screen};
pub use components::{Activity, Provider, Receiver};
pub use intent_filters::IntentFilter;
pub use manifest::{AndroidManifest, ManifestApplication, ManifestMetadata, ManifestWarning};
pub use parser::{ManifestParser, ManifestSummary, ParseError};
pub use permissions::{
    reduce_constraints, reducer_for, ConstraintError, ConstraintReducer, ConstraintValue,
    Permission, PermissionConstraint,
};
pub use policy::{aggregate_permissions, BuildMode};
pub use registry::{ComponentInfo, ComponentMetadata, LegacyReceiver, RegistryError, SubelementKind};
pub use writer::{ManifestWriter, WriteError};

/// Android XML namespace
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

/// File name of the generated manifest
pub const MANIFEST_FILE_NAME: &str = "AndroidManifest.xml";

/// Android permissions the build policy refers to by name
pub mod common_permissions {
    /// Storage
    pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
    pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
    pub const READ_MEDIA_IMAGES: &str = "android.permission.READ_MEDIA_IMAGES";
    pub const READ_MEDIA_VIDEO: &str = "android.permission.READ_MEDIA_VIDEO";
    pub const READ_MEDIA_AUDIO: &str = "android.permission.READ_MEDIA_AUDIO";

    /// SMS
    pub const READ_SMS: &str = "android.permission.READ_SMS";
    pub const RECEIVE_MMS: &str = "android.permission.RECEIVE_MMS";
    pub const RECEIVE_SMS: &str = "android.permission.RECEIVE_SMS";
    pub const RECEIVE_WAP_PUSH: &str = "android.permission.RECEIVE_WAP_PUSH";
    pub const SEND_SMS: &str = "android.permission.SEND_SMS";
    pub const WRITE_SMS: &str = "android.permission.WRITE_SMS";

    /// Phone
    pub const PROCESS_OUTGOING_CALLS: &str = "android.permission.PROCESS_OUTGOING_CALLS";
    pub const CALL_PHONE: &str = "android.permission.CALL_PHONE";
    pub const READ_CALL_LOG: &str = "android.permission.READ_CALL_LOG";
    pub const WRITE_CALL_LOG: &str = "android.permission.WRITE_CALL_LOG";

    pub const INTERNET: &str = "android.permission.INTERNET";
    pub const READ_LOGS: &str = "android.permission.READ_LOGS";
}
