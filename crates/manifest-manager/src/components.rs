//! Android Component Types
//!
//! Activity, BroadcastReceiver, and ContentProvider elements written
//! directly by the manifest builder. Everything a component type
//! contributes on its own arrives as a raw template instead.

use serde::{Deserialize, Serialize};

use crate::intent_filters::IntentFilter;
use crate::manifest::ManifestMetadata;

/// Activity component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Class name (.Screen1 or full package.Class)
    pub name: String,

    /// Whether the activity is exported
    pub exported: Option<bool>,

    /// Screen orientation
    pub screen_orientation: Option<String>,

    /// Launch mode
    pub launch_mode: Option<String>,

    /// Config changes to handle
    pub config_changes: Option<String>,

    /// Window soft input mode
    pub window_soft_input_mode: Option<String>,

    /// Intent filters
    pub intent_filters: Vec<IntentFilter>,

    /// Raw `<meta-data>` templates placed after the intent filters
    pub metadata_fragments: Vec<String>,
}

impl Activity {
    /// Create a new activity
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Check if this is the main launcher activity
    pub fn is_launcher(&self) -> bool {
        self.intent_filters.iter().any(|f| f.is_launcher())
    }
}

/// Screen orientation options
pub mod orientation {
    pub const BEHIND: &str = "behind";
}

/// Launch mode options
pub mod launch_mode {
    pub const SINGLE_TOP: &str = "singleTop";
    pub const SINGLE_TASK: &str = "singleTask";
}

/// Config changes handled by every screen
pub const SCREEN_CONFIG_CHANGES: &str =
    "orientation|screenSize|keyboardHidden|keyboard|screenLayout|smallestScreenSize";

/// Broadcast receiver component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    pub exported: Option<bool>,
    pub intent_filters: Vec<IntentFilter>,
}

impl Receiver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Content provider component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub authorities: String,
    pub exported: Option<bool>,
    pub grant_uri_permissions: Option<bool>,
    pub metadata: Vec<ManifestMetadata>,
}

impl Provider {
    /// The file provider every app ships, used for sharing files with other apps
    pub fn file_provider(package: &str) -> Self {
        Self {
            name: "androidx.core.content.FileProvider".to_string(),
            authorities: format!("{}.provider", package),
            exported: Some(false),
            grant_uri_permissions: Some(true),
            metadata: vec![ManifestMetadata {
                name: "android.support.FILE_PROVIDER_PATHS".to_string(),
                value: None,
                resource: Some("@xml/provider_paths".to_string()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_provider() {
        let provider = Provider::file_provider("com.example");
        assert_eq!(provider.authorities, "com.example.provider");
        assert_eq!(provider.metadata[0].resource.as_deref(), Some("@xml/provider_paths"));
    }
}
