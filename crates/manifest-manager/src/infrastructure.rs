//! Infrastructure Blocks
//!
//! Fixed manifest fragments triggered by particular component types, the
//! companion build or a native library, rather than by component metadata.

use std::collections::BTreeSet;

use crate::policy::BuildMode;

/// Placeholder for the application package in templates
pub const PACKAGE_NAME_PLACEHOLDER: &str = "%packageName%";

/// Placeholder for the Google Maps API key
pub const MAPS_KEY_PLACEHOLDER: &str = "%mapsKey%";

/// What makes a block apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every build
    Always,
    /// Any of these component types is used
    AnyComponent(&'static [&'static str]),
    /// The build targets the companion app
    Companion,
    /// A used component ships this library
    Library(&'static str),
}

impl Trigger {
    pub fn matches(
        &self,
        used: &BTreeSet<String>,
        libraries: &BTreeSet<&str>,
        mode: &BuildMode,
    ) -> bool {
        match self {
            Trigger::Always => true,
            Trigger::AnyComponent(types) => types.iter().any(|t| used.contains(*t)),
            Trigger::Companion => mode.companion,
            Trigger::Library(library) => libraries.contains(library),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InfrastructureBlock {
    pub name: &'static str,
    pub trigger: Trigger,
    /// Fragments placed at manifest level, after the permissions
    pub manifest: &'static [&'static str],
    /// Fragments placed inside `<application>`, after the activities
    pub application: &'static [&'static str],
}

pub const INFRASTRUCTURE: &[InfrastructureBlock] = &[
    InfrastructureBlock {
        name: "cloud-messaging",
        trigger: Trigger::AnyComponent(&["GoogleCloudMessaging", "PctMessaging"]),
        manifest: &[
            r#"<permission android:name="com.google.appinventor.aiphoneapp.permission.C2D_MESSAGE" android:protectionLevel="signature" />"#,
            r#"<uses-permission android:name="com.google.appinventor.aiphoneapp.permission.C2D_MESSAGE" />"#,
            r#"<permission android:name="%packageName%.permission.C2D_MESSAGE" android:protectionLevel="signature" />"#,
            r#"<uses-permission android:name="%packageName%.permission.C2D_MESSAGE" />"#,
        ],
        application: &[
            r#"<service android:name="com.google.appinventor.components.runtime.GCMIntentService"></service>"#,
            r#"<receiver android:name="com.google.appinventor.components.runtime.GCMBroadcastReceiver" android:permission="com.google.android.c2dm.permission.SEND" android:exported="true"><intent-filter><action android:name="com.google.android.c2dm.intent.RECEIVE" /><action android:name="com.google.android.c2dm.intent.REGISTRATION" /><category android:name="%packageName%" /></intent-filter></receiver>"#,
        ],
    },
    InfrastructureBlock {
        name: "google-maps",
        trigger: Trigger::AnyComponent(&["GoogleMap"]),
        manifest: &[
            r#"<permission android:name="%packageName%.permission.MAPS_RECEIVE" android:protectionLevel="signature" />"#,
            r#"<uses-permission android:name="%packageName%.permission.MAPS_RECEIVE" />"#,
            r#"<uses-feature android:glEsVersion="0x00020000" android:required="true" />"#,
        ],
        application: &[
            r#"<meta-data android:name="com.google.android.maps.v2.API_KEY" android:value="%mapsKey%" />"#,
        ],
    },
    InfrastructureBlock {
        name: "companion-logs",
        trigger: Trigger::Companion,
        manifest: &[r#"<uses-permission android:name="android.permission.READ_LOGS" />"#],
        application: &[],
    },
    InfrastructureBlock {
        name: "timer",
        trigger: Trigger::AnyComponent(&["Timer"]),
        manifest: &[],
        application: &[
            r#"<service android:name="com.google.appinventor.components.runtime.util.TimerManager" android:enabled="true" android:exported="false"></service>"#,
            concat!(
                r#"<receiver android:name="com.google.appinventor.components.runtime.util.TimerLauncher" android:enabled="true" android:exported="true">"#,
                r#"<intent-filter><action android:name="android.intent.action.BATTERY_CHANGED" /><action android:name="android.intent.action.BOOT_COMPLETED" /><action android:name="android.intent.action.DOCK_EVENT" /><action android:name="android.intent.action.ACTION_SCREEN_ON" /><action android:name="android.intent.action.USER_PRESENT" /></intent-filter>"#,
                "</receiver>"
            ),
        ],
    },
    InfrastructureBlock {
        name: "upload-services",
        trigger: Trigger::Always,
        manifest: &[],
        application: &[
            r#"<service android:name="edu.mit.media.funf.storage.NameValueDatabaseService"></service>"#,
            r#"<service android:name="com.google.appinventor.components.runtime.util.HttpsUploadService"></service>"#,
        ],
    },
    InfrastructureBlock {
        name: "dropbox",
        trigger: Trigger::AnyComponent(&["Dropbox"]),
        manifest: &[],
        application: &[
            r#"<service android:name="com.google.appinventor.components.runtime.DropboxUploadService"></service>"#,
        ],
    },
    InfrastructureBlock {
        name: "google-drive",
        trigger: Trigger::AnyComponent(&["GoogleDrive"]),
        manifest: &[],
        application: &[
            r#"<service android:name="com.google.appinventor.components.runtime.GoogleDriveUploadService"></service>"#,
        ],
    },
    InfrastructureBlock {
        name: "funf",
        trigger: Trigger::Library("funf.jar"),
        manifest: &[],
        application: &[
            r#"<service android:name="edu.mit.media.funf.FunfManager" android:enabled="true" android:exported="false"></service>"#,
            concat!(
                r#"<receiver android:name="edu.mit.media.funf.Launcher" android:enabled="true" android:exported="true">"#,
                r#"<intent-filter><action android:name="android.intent.action.BATTERY_CHANGED" /><action android:name="android.intent.action.BOOT_COMPLETED" /><action android:name="android.intent.action.DOCK_EVENT" /><action android:name="android.intent.action.ACTION_SCREEN_ON" /><action android:name="android.intent.action.USER_PRESENT" /></intent-filter>"#,
                "</receiver>"
            ),
        ],
    },
];

/// Blocks that apply to a build, in table order
pub fn applicable_blocks(
    used: &BTreeSet<String>,
    libraries: &BTreeSet<&str>,
    mode: &BuildMode,
) -> Vec<&'static InfrastructureBlock> {
    INFRASTRUCTURE
        .iter()
        .filter(|block| block.trigger.matches(used, libraries, mode))
        .collect()
}

/// Values substituted into fragment templates
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub package_name: &'a str,
    pub maps_key: &'a str,
}

impl TemplateVars<'_> {
    pub fn apply(&self, template: &str) -> String {
        template
            .replace(PACKAGE_NAME_PLACEHOLDER, self.package_name)
            .replace(MAPS_KEY_PLACEHOLDER, &escape_attribute(self.maps_key))
    }
}

fn escape_attribute(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn names(blocks: &[&InfrastructureBlock]) -> Vec<&'static str> {
        blocks.iter().map(|b| b.name).collect()
    }

    #[test]
    fn test_component_triggers() {
        let blocks = applicable_blocks(
            &set(&["PctMessaging", "Timer", "Button"]),
            &BTreeSet::new(),
            &BuildMode::default(),
        );
        assert_eq!(names(&blocks), vec!["cloud-messaging", "timer", "upload-services"]);
    }

    #[test]
    fn test_companion_and_library_triggers() {
        let mode = BuildMode {
            companion: true,
            ..Default::default()
        };
        let libraries: BTreeSet<&str> = ["funf.jar"].into_iter().collect();
        let blocks = applicable_blocks(&BTreeSet::new(), &libraries, &mode);
        assert_eq!(names(&blocks), vec!["companion-logs", "upload-services", "funf"]);
    }

    #[test]
    fn test_plain_build_gets_upload_services_only() {
        let blocks = applicable_blocks(&set(&["Button"]), &BTreeSet::new(), &BuildMode::default());
        assert_eq!(names(&blocks), vec!["upload-services"]);
    }

    #[test]
    fn test_template_substitution() {
        let vars = TemplateVars {
            package_name: "appinventor.ai_test.HelloPurr",
            maps_key: "k&y",
        };
        assert_eq!(
            vars.apply(r#"<meta-data android:name="%packageName%.KEY" android:value="%mapsKey%" />"#),
            r#"<meta-data android:name="appinventor.ai_test.HelloPurr.KEY" android:value="k&amp;y" />"#
        );
    }
}
