//! Android Manifest Data Structures
//!
//! The manifest as the builder assembles it. Parts contributed by
//! component metadata or infrastructure blocks are kept as raw XML
//! templates and re-emitted verbatim by the writer.

use serde::{Deserialize, Serialize};

use crate::components::{Activity, Provider, Receiver};
use crate::permissions::Permission;

/// Complete Android Manifest representation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidManifest {
    /// Package name (e.g., "appinventor.ai_user.HelloPurr")
    pub package: String,

    pub version_code: String,

    pub version_name: String,

    /// Hardware/software features
    pub features: Vec<UsesFeature>,

    /// `<queries>` children, already substituted
    pub queries: Vec<String>,

    /// Required permissions
    pub permissions: Vec<Permission>,

    /// Manifest-level fragments written after the permissions
    pub extra_elements: Vec<String>,

    pub min_sdk: u32,

    pub target_sdk: u32,

    /// Application block
    pub application: ManifestApplication,
}

/// uses-feature element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsesFeature {
    pub name: String,
    /// `None` leaves the attribute out, which Android reads as required
    pub required: Option<bool>,
}

impl UsesFeature {
    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: Some(false),
        }
    }

    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: None,
        }
    }
}

/// uses-library element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseLibrary {
    pub name: String,
    pub required: bool,
}

/// Application element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestApplication {
    /// Application class name
    pub name: Option<String>,

    pub debuggable: Option<bool>,

    /// Application label
    pub label: Option<String>,

    /// Network security config
    pub network_security_config: Option<String>,

    /// Request legacy external storage
    pub request_legacy_external_storage: Option<bool>,

    /// Preserve legacy external storage
    pub preserve_legacy_external_storage: Option<bool>,

    /// Icon resource
    pub icon: Option<String>,

    /// Round icon resource (adaptive icons)
    pub round_icon: Option<String>,

    /// Theme
    pub theme: Option<String>,

    /// Used libraries
    pub uses_libraries: Vec<UseLibrary>,

    /// Activities, one per screen plus the companion splash screen
    pub activities: Vec<Activity>,

    /// Infrastructure and component templates, in emission order
    pub fragments: Vec<String>,

    /// Legacy broadcast receivers
    pub receivers: Vec<Receiver>,

    /// Content providers
    pub providers: Vec<Provider>,
}

/// Meta-data element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    pub value: Option<String>,
    pub resource: Option<String>,
}

impl AndroidManifest {
    /// Get the main activity
    pub fn main_activity(&self) -> Option<&Activity> {
        self.application.activities.iter().find(|a| a.is_launcher())
    }

    /// Validate the manifest
    pub fn validate(&self) -> Vec<ManifestWarning> {
        let mut warnings = Vec::new();

        if self.package.is_empty() {
            warnings.push(ManifestWarning::Error("Package name is required".into()));
        }

        if self.application.activities.is_empty() {
            warnings.push(ManifestWarning::Error("Manifest declares no activities".into()));
        } else if self.main_activity().is_none() {
            warnings.push(ManifestWarning::Warning("No launcher activity".into()));
        }

        if self.min_sdk > self.target_sdk {
            warnings.push(ManifestWarning::Warning(format!(
                "minSdkVersion {} exceeds targetSdkVersion {}",
                self.min_sdk, self.target_sdk
            )));
        }

        warnings
    }
}

/// Manifest validation warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestWarning {
    Error(String),
    Warning(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent_filters::IntentFilter;

    #[test]
    fn test_validate() {
        let mut manifest = AndroidManifest {
            package: "com.example".into(),
            min_sdk: 7,
            target_sdk: 34,
            ..Default::default()
        };
        assert_eq!(manifest.validate().len(), 1);

        let mut screen = Activity::new(".Screen1");
        screen.intent_filters.push(IntentFilter::launcher());
        manifest.application.activities.push(screen);
        assert!(manifest.validate().is_empty());
        assert_eq!(manifest.main_activity().unwrap().name, ".Screen1");

        manifest.min_sdk = 40;
        assert!(matches!(manifest.validate()[0], ManifestWarning::Warning(_)));
    }
}
