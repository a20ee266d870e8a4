//! AndroidManifest.xml Parser
//!
//! Reads a generated manifest back into a summary used to validate it
//! before packaging.

use std::path::Path;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::permissions::Permission;
use crate::ANDROID_NS;

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    XmlError(#[from] roxmltree::Error),
    #[error("Invalid manifest structure: {0}")]
    InvalidStructure(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One `<activity>` as declared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    pub name: String,
    pub screen_orientation: Option<String>,
    pub launch_mode: Option<String>,
    pub launcher: bool,
}

/// What a manifest declares, by element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub package: String,
    pub version_code: Option<String>,
    pub version_name: Option<String>,
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,
    pub permissions: Vec<Permission>,
    pub features: Vec<String>,
    pub activities: Vec<ActivitySummary>,
    pub services: Vec<String>,
    pub receivers: Vec<String>,
    pub providers: Vec<String>,
    pub queries: usize,
}

impl ManifestSummary {
    pub fn launcher(&self) -> Option<&ActivitySummary> {
        self.activities.iter().find(|a| a.launcher)
    }

    pub fn permission(&self, name: &str) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.name == name)
    }
}

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest file from path
    pub fn parse_file(path: impl AsRef<Path>) -> Result<ManifestSummary, ParseError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::summarize(&content)
    }

    /// Parse manifest from string
    pub fn summarize(xml: &str) -> Result<ManifestSummary, ParseError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "manifest" {
            return Err(ParseError::InvalidStructure(format!(
                "root element is <{}>",
                root.tag_name().name()
            )));
        }

        let package = root
            .attribute("package")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ParseError::InvalidStructure("missing package attribute".into()))?;

        let mut summary = ManifestSummary {
            package: package.to_string(),
            version_code: android(&root, "versionCode").map(str::to_string),
            version_name: android(&root, "versionName").map(str::to_string),
            ..Default::default()
        };

        let mut applications = 0;
        for child in root.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "uses-sdk" => {
                    summary.min_sdk = Self::sdk_level(&child, "minSdkVersion")?;
                    summary.target_sdk = Self::sdk_level(&child, "targetSdkVersion")?;
                }
                "uses-permission" => summary.permissions.push(Self::parse_permission(&child)?),
                "uses-feature" => {
                    if let Some(name) = android(&child, "name") {
                        summary.features.push(name.to_string());
                    }
                }
                "queries" => summary.queries += child.children().filter(Node::is_element).count(),
                "application" => {
                    applications += 1;
                    Self::parse_application(&child, &mut summary)?;
                }
                other => debug!("Skipping <{}>", other),
            }
        }

        if applications != 1 {
            return Err(ParseError::InvalidStructure(format!(
                "expected one <application>, found {}",
                applications
            )));
        }

        Ok(summary)
    }

    fn parse_application(app: &Node, summary: &mut ManifestSummary) -> Result<(), ParseError> {
        for child in app.children().filter(Node::is_element) {
            let tag = child.tag_name().name();
            if tag == "uses-library" || tag == "meta-data" {
                continue;
            }
            let name = required_name(&child)?;
            match tag {
                "activity" => summary.activities.push(ActivitySummary {
                    name,
                    screen_orientation: android(&child, "screenOrientation").map(str::to_string),
                    launch_mode: android(&child, "launchMode").map(str::to_string),
                    launcher: is_launcher(&child),
                }),
                "service" => summary.services.push(name),
                "receiver" => summary.receivers.push(name),
                "provider" => summary.providers.push(name),
                other => debug!("Skipping <{}> in <application>", other),
            }
        }
        Ok(())
    }

    fn parse_permission(node: &Node) -> Result<Permission, ParseError> {
        let mut permission = Permission::new(&required_name(node)?);
        for attr in node.attributes() {
            if attr.namespace() == Some(ANDROID_NS) && attr.name() != "name" {
                permission
                    .attributes
                    .push((attr.name().to_string(), attr.value().to_string()));
            }
        }
        Ok(permission)
    }

    fn sdk_level(node: &Node, attribute: &str) -> Result<Option<u32>, ParseError> {
        android(node, attribute)
            .map(|value| {
                value.parse().map_err(|_| {
                    ParseError::InvalidStructure(format!("{} is not a number: {}", attribute, value))
                })
            })
            .transpose()
    }
}

fn android<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((ANDROID_NS, name))
}

fn required_name(node: &Node) -> Result<String, ParseError> {
    android(node, "name").map(str::to_string).ok_or_else(|| {
        ParseError::InvalidStructure(format!("<{}> without android:name", node.tag_name().name()))
    })
}

fn is_launcher(activity: &Node) -> bool {
    activity
        .children()
        .filter(|n| n.has_tag_name("intent-filter"))
        .any(|filter| {
            let has = |tag: &str, value: &str| {
                filter
                    .children()
                    .any(|n| n.has_tag_name(tag) && android(&n, "name") == Some(value))
            };
            has("action", "android.intent.action.MAIN")
                && has("category", "android.intent.category.LAUNCHER")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.app" android:versionCode="1" android:versionName="1.0">
  <uses-feature android:name="android.hardware.wifi"/>
  <uses-permission android:name="android.permission.BLUETOOTH_SCAN" android:usesPermissionFlags="neverForLocation"/>
  <uses-sdk android:minSdkVersion="7" android:targetSdkVersion="34"/>
  <application android:label="App">
    <uses-library android:name="org.apache.http.legacy" android:required="false"/>
    <activity android:name=".Screen1" android:screenOrientation="portrait">
      <intent-filter>
        <action android:name="android.intent.action.MAIN"/>
        <category android:name="android.intent.category.LAUNCHER"/>
      </intent-filter>
    </activity>
    <activity android:name="com.example.app.Screen2"/>
    <provider android:name="androidx.core.content.FileProvider" android:authorities="com.example.app.provider"/>
  </application>
</manifest>
"#;

    #[test]
    fn test_summarize() {
        let summary = ManifestParser::summarize(MANIFEST).unwrap();
        assert_eq!(summary.package, "com.example.app");
        assert_eq!(summary.min_sdk, Some(7));
        assert_eq!(summary.features, vec!["android.hardware.wifi"]);
        assert_eq!(summary.activities.len(), 2);
        assert_eq!(summary.launcher().unwrap().name, ".Screen1");
        assert_eq!(
            summary
                .permission("android.permission.BLUETOOTH_SCAN")
                .unwrap()
                .attribute("usesPermissionFlags"),
            Some("neverForLocation")
        );
        assert_eq!(summary.providers, vec!["androidx.core.content.FileProvider"]);
    }

    #[test]
    fn test_structure_errors() {
        assert!(matches!(
            ManifestParser::summarize("<resources/>"),
            Err(ParseError::InvalidStructure(_))
        ));
        assert!(matches!(
            ManifestParser::summarize("<manifest package=\"a\"/>"),
            Err(ParseError::InvalidStructure(_))
        ));
        assert!(matches!(
            ManifestParser::summarize("<manifest package=\"a\"><application>"),
            Err(ParseError::XmlError(_))
        ));
    }
}
