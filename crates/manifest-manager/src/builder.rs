//! Manifest Builder
//!
//! Assembles the `AndroidManifest` for one build from the project
//! descriptor, the aggregated permissions and the metadata of the used
//! components. The same inputs always produce the same manifest.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::components::{launch_mode, orientation, Activity, Provider, Receiver, SCREEN_CONFIG_CHANGES};
use crate::infrastructure::{applicable_blocks, TemplateVars};
use crate::intent_filters::IntentFilter;
use crate::manifest::{AndroidManifest, ManifestApplication, UseLibrary, UsesFeature};
use crate::permissions::Permission;
use crate::policy::{skips_subelement, BuildMode, SMS_RECEIVED_ACTION};
use crate::registry::ComponentInfo;

/// Component whose presence changes how the main screen is launched
pub const NEAR_FIELD_COMPONENT: &str = "NearField";

const REPL_APPLICATION: &str = "com.google.appinventor.components.runtime.ReplApplication";
const MULTIDEX_APPLICATION: &str =
    "com.google.appinventor.components.runtime.multidex.MultiDexApplication";
const SPLASH_ACTIVITY: &str = "com.google.appinventor.components.runtime.SplashActivity";

/// Hardware the companion may use but must not require
const COMPANION_OPTIONAL_FEATURES: &[&str] = &[
    "android.hardware.bluetooth",
    "android.hardware.location",
    "android.hardware.telephony",
    "android.hardware.location.network",
    "android.hardware.location.gps",
    "android.hardware.microphone",
    "android.hardware.touchscreen",
    "android.hardware.camera",
    "android.hardware.camera.autofocus",
];

const WIFI_FEATURE: &str = "android.hardware.wifi";

/// One screen of the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// Fully qualified form class, e.g. `appinventor.ai_me.HelloPurr.Screen1`
    pub qualified_name: String,
    /// Value for `android:screenOrientation`
    pub orientation: String,
}

impl Screen {
    pub fn new(qualified_name: &str, orientation: &str) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            orientation: orientation.to_string(),
        }
    }
}

/// Everything the builder reads
#[derive(Debug, Clone)]
pub struct ManifestInputs<'a> {
    pub main_class: &'a str,
    pub project_name: &'a str,
    pub version_code: &'a str,
    pub version_name: &'a str,
    pub app_name: &'a str,
    pub maps_key: &'a str,
    pub screens: &'a [Screen],
    pub used_components: &'a BTreeSet<String>,
    /// Output of permission aggregation, names may still hold `%packageName%`
    pub permissions: &'a [Permission],
    pub mode: BuildMode,
    pub min_sdk: u32,
    pub target_sdk: u32,
}

/// Text before the last `.` of a class name
pub fn package_name(class: &str) -> &str {
    class.rsplit_once('.').map_or("", |(package, _)| package)
}

/// Text after the last `.` of a class name
pub fn class_name(class: &str) -> &str {
    class.rsplit_once('.').map_or(class, |(_, name)| name)
}

/// Names shown to users may not contain a raw ampersand
pub fn clean_name(name: &str) -> String {
    name.replace('&', "and")
}

/// Keeps the first occurrence of every template
#[derive(Default)]
struct Dedup {
    seen: HashSet<String>,
}

impl Dedup {
    fn push(&mut self, out: &mut Vec<String>, fragment: String) {
        if self.seen.insert(fragment.clone()) {
            out.push(fragment);
        }
    }
}

pub struct ManifestBuilder<'a> {
    info: &'a ComponentInfo,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(info: &'a ComponentInfo) -> Self {
        Self { info }
    }

    pub fn build(&self, inputs: &ManifestInputs) -> AndroidManifest {
        let package = package_name(inputs.main_class);
        let mode = &inputs.mode;
        let vars = TemplateVars {
            package_name: package,
            maps_key: inputs.maps_key,
        };
        let view = self.info.used(inputs.used_components);

        let mut version_name = clean_name(inputs.version_name);
        if mode.dangerous_permissions {
            version_name.push('u');
        }

        let mut manifest = AndroidManifest {
            package: package.to_string(),
            version_code: inputs.version_code.to_string(),
            version_name,
            min_sdk: inputs.min_sdk,
            target_sdk: inputs.target_sdk,
            ..Default::default()
        };

        if mode.companion {
            manifest.features = COMPANION_OPTIONAL_FEATURES
                .iter()
                .map(|name| UsesFeature::optional(name))
                .collect();
            manifest.features.push(if mode.emulator {
                UsesFeature::optional(WIFI_FEATURE)
            } else {
                UsesFeature::required(WIFI_FEATURE)
            });
        }

        let mut seen_queries = Dedup::default();
        for templates in view.queries_needed().into_values() {
            for template in templates {
                seen_queries.push(&mut manifest.queries, vars.apply(template));
            }
        }

        manifest.permissions = inputs
            .permissions
            .iter()
            .map(|permission| Permission {
                name: vars.apply(&permission.name),
                attributes: permission.attributes.clone(),
            })
            .collect();

        let libraries = view.all_libraries();
        let blocks = applicable_blocks(inputs.used_components, &libraries, mode);
        for block in &blocks {
            debug!("Adding {} infrastructure", block.name);
            manifest
                .extra_elements
                .extend(block.manifest.iter().map(|fragment| vars.apply(fragment)));
        }

        let app_name = clean_name(inputs.app_name);
        let mut app = ManifestApplication {
            debuggable: Some(false),
            label: Some(if app_name.is_empty() {
                inputs.project_name.to_string()
            } else {
                app_name
            }),
            network_security_config: Some("@xml/network_security_config".to_string()),
            request_legacy_external_storage: Some(true),
            preserve_legacy_external_storage: (inputs.target_sdk >= 30).then_some(true),
            icon: Some("@mipmap/ic_launcher".to_string()),
            round_icon: Some("@mipmap/ic_launcher".to_string()),
            name: Some(
                if mode.companion {
                    REPL_APPLICATION
                } else {
                    MULTIDEX_APPLICATION
                }
                .to_string(),
            ),
            theme: Some("@style/AppTheme".to_string()),
            uses_libraries: vec![UseLibrary {
                name: "org.apache.http.legacy".to_string(),
                required: false,
            }],
            ..Default::default()
        };

        let activity_metadata: Vec<String> = view
            .activity_metadata_needed()
            .into_values()
            .flatten()
            .map(|template| vars.apply(template))
            .collect();
        let near_field = inputs.used_components.contains(NEAR_FIELD_COMPONENT);

        for screen in inputs.screens {
            let is_main = screen.qualified_name == inputs.main_class;
            let mut activity = if is_main {
                Activity::new(&format!(".{}", class_name(inputs.main_class)))
            } else {
                Activity::new(&screen.qualified_name)
            };

            if is_main && near_field && !mode.companion {
                activity.launch_mode = Some(launch_mode::SINGLE_TASK.to_string());
            } else if is_main && mode.companion {
                activity.launch_mode = Some(launch_mode::SINGLE_TOP.to_string());
            }
            activity.exported = Some(true);
            activity.screen_orientation = Some(screen.orientation.clone());
            activity.window_soft_input_mode = Some("stateHidden".to_string());
            activity.config_changes = Some(SCREEN_CONFIG_CHANGES.to_string());

            activity.intent_filters.push(if is_main {
                IntentFilter::launcher()
            } else {
                IntentFilter::main()
            });
            if mode.companion {
                activity
                    .intent_filters
                    .push(IntentFilter::deep_link("aicompanion", "comp"));
            }
            if is_main && near_field && !mode.companion {
                activity.intent_filters.push(IntentFilter::ndef_text());
            }
            activity.metadata_fragments = activity_metadata.clone();
            app.activities.push(activity);

            if is_main && mode.companion {
                app.activities.push(Activity {
                    name: SPLASH_ACTIVITY.to_string(),
                    exported: Some(false),
                    screen_orientation: Some(orientation::BEHIND.to_string()),
                    config_changes: Some("keyboardHidden|orientation".to_string()),
                    intent_filters: vec![IntentFilter::main()],
                    ..Default::default()
                });
            }
        }

        let mut seen_fragments = Dedup::default();
        for block in &blocks {
            for fragment in block.application {
                seen_fragments.push(&mut app.fragments, vars.apply(fragment));
            }
        }

        for needed in [
            view.activities_needed(),
            view.broadcast_receivers_needed(),
            view.content_providers_needed(),
            view.metadata_needed(),
            view.services_needed(),
        ] {
            for (component, templates) in needed {
                for template in templates {
                    if skips_subelement(mode, template) {
                        debug!("Skipping SMS receiver of {} in companion build", component);
                        continue;
                    }
                    seen_fragments.push(&mut app.fragments, vars.apply(template));
                }
            }
        }

        let legacy: BTreeSet<_> = view
            .legacy_receivers_needed()
            .into_values()
            .flatten()
            .collect();
        for receiver in legacy {
            if mode.strips_restricted() && receiver.handles(SMS_RECEIVED_ACTION) {
                debug!("Skipping legacy receiver {}", receiver.class_name);
                continue;
            }
            let mut element = Receiver::new(&receiver.class_name);
            element.exported = Some(true);
            if !receiver.actions.is_empty() {
                element
                    .intent_filters
                    .push(IntentFilter::actions(receiver.actions.iter().cloned()));
            }
            app.receivers.push(element);
        }

        app.providers.push(Provider::file_provider(package));

        manifest.application = app;
        manifest
    }
}
