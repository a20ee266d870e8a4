//! Component Metadata Registry
//!
//! `ComponentInfo` is the read-only catalog of what every component type
//! needs from the manifest: permissions and their constraints, extra
//! manifest subelements, legacy broadcast receivers, a minimum SDK floor
//! and native libraries. It is built once, validated on load, and shared
//! across build runs behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::permissions::{ConstraintError, PermissionConstraint};

const BUILTIN_CATALOG: &str = include_str!("../data/components.json");

static EMPTY_STRINGS: BTreeSet<String> = BTreeSet::new();
static EMPTY_CONSTRAINTS: BTreeMap<String, BTreeSet<PermissionConstraint>> = BTreeMap::new();
static EMPTY_RECEIVERS: BTreeSet<LegacyReceiver> = BTreeSet::new();

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid component metadata: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Component {component}, permission {permission}: {source}")]
    Constraint {
        component: String,
        permission: String,
        #[source]
        source: ConstraintError,
    },
}

/// Kinds of manifest subelement a component can contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubelementKind {
    Activity,
    Service,
    Receiver,
    Provider,
    Metadata,
    ActivityMetadata,
    Query,
}

impl SubelementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubelementKind::Activity => "activity",
            SubelementKind::Service => "service",
            SubelementKind::Receiver => "receiver",
            SubelementKind::Provider => "provider",
            SubelementKind::Metadata => "metadata",
            SubelementKind::ActivityMetadata => "activity-metadata",
            SubelementKind::Query => "query",
        }
    }
}

/// Broadcast receiver declared in the legacy `"Class,Action1,Action2"` form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LegacyReceiver {
    pub class_name: String,
    pub actions: Vec<String>,
}

impl LegacyReceiver {
    /// Parse the comma-separated form. Returns `None` when no class is named.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split(',').map(str::trim);
        let class_name = parts.next().filter(|name| !name.is_empty())?;
        Some(Self {
            class_name: class_name.to_string(),
            actions: parts
                .filter(|action| !action.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    /// Whether any action equals `action`, ignoring ASCII case
    pub fn handles(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a.eq_ignore_ascii_case(action))
    }
}

/// Everything the catalog knows about one component type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentMetadata {
    pub permissions: BTreeSet<String>,
    /// permission name -> constraints declared on it
    pub permission_constraints: BTreeMap<String, BTreeSet<PermissionConstraint>>,
    pub min_sdk: Option<u32>,
    pub subelements: BTreeMap<SubelementKind, BTreeSet<String>>,
    pub legacy_receivers: BTreeSet<LegacyReceiver>,
    pub libraries: BTreeSet<String>,
}

impl ComponentMetadata {
    pub fn subelements(&self, kind: SubelementKind) -> &BTreeSet<String> {
        self.subelements.get(&kind).unwrap_or(&EMPTY_STRINGS)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct RawComponent {
    permissions: BTreeSet<String>,
    permission_constraints: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    min_sdk: Option<u32>,
    activities: BTreeSet<String>,
    services: BTreeSet<String>,
    broadcast_receivers: BTreeSet<String>,
    content_providers: BTreeSet<String>,
    metadata: BTreeSet<String>,
    activity_metadata: BTreeSet<String>,
    queries: BTreeSet<String>,
    legacy_broadcast_receivers: Vec<String>,
    libraries: BTreeSet<String>,
}

impl RawComponent {
    fn into_metadata(self, component: &str) -> Result<ComponentMetadata, RegistryError> {
        let mut permission_constraints = BTreeMap::new();
        for (permission, attributes) in self.permission_constraints {
            let mut constraints = BTreeSet::new();
            for (attribute, value) in &attributes {
                let constraint = PermissionConstraint::from_json(attribute, value).map_err(
                    |source| RegistryError::Constraint {
                        component: component.to_string(),
                        permission: permission.clone(),
                        source,
                    },
                )?;
                constraints.insert(constraint);
            }
            permission_constraints.insert(permission, constraints);
        }

        let mut subelements = BTreeMap::new();
        for (kind, templates) in [
            (SubelementKind::Activity, self.activities),
            (SubelementKind::Service, self.services),
            (SubelementKind::Receiver, self.broadcast_receivers),
            (SubelementKind::Provider, self.content_providers),
            (SubelementKind::Metadata, self.metadata),
            (SubelementKind::ActivityMetadata, self.activity_metadata),
            (SubelementKind::Query, self.queries),
        ] {
            if !templates.is_empty() {
                subelements.insert(kind, templates);
            }
        }

        let mut legacy_receivers = BTreeSet::new();
        for spec in &self.legacy_broadcast_receivers {
            match LegacyReceiver::parse(spec) {
                Some(receiver) => {
                    legacy_receivers.insert(receiver);
                }
                None => debug!("{}: ignoring empty broadcast receiver entry", component),
            }
        }

        Ok(ComponentMetadata {
            permissions: self.permissions,
            permission_constraints,
            min_sdk: self.min_sdk,
            subelements,
            legacy_receivers,
            libraries: self.libraries,
        })
    }
}

/// Component metadata catalog, keyed by component type name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentInfo {
    components: BTreeMap<String, ComponentMetadata>,
}

impl ComponentInfo {
    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: BTreeMap<String, RawComponent> = serde_json::from_str(json)?;
        let mut components = BTreeMap::new();
        for (name, component) in raw {
            let metadata = component.into_metadata(&name)?;
            components.insert(name, metadata);
        }
        Ok(Self { components })
    }

    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let info = Self::from_json(&text)?;
        info!(
            "Loaded metadata for {} component types from {:?}",
            info.len(),
            path.as_ref()
        );
        Ok(info)
    }

    /// The catalog compiled into this crate
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }

    pub fn get(&self, component: &str) -> Option<&ComponentMetadata> {
        self.components.get(component)
    }

    /// Known component type names, sorted
    pub fn component_types(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn permissions(&self, component: &str) -> &BTreeSet<String> {
        self.get(component)
            .map(|c| &c.permissions)
            .unwrap_or(&EMPTY_STRINGS)
    }

    pub fn permission_constraints(
        &self,
        component: &str,
    ) -> &BTreeMap<String, BTreeSet<PermissionConstraint>> {
        self.get(component)
            .map(|c| &c.permission_constraints)
            .unwrap_or(&EMPTY_CONSTRAINTS)
    }

    pub fn subelements(&self, component: &str, kind: SubelementKind) -> &BTreeSet<String> {
        self.get(component)
            .map(|c| c.subelements(kind))
            .unwrap_or(&EMPTY_STRINGS)
    }

    pub fn legacy_receivers(&self, component: &str) -> &BTreeSet<LegacyReceiver> {
        self.get(component)
            .map(|c| &c.legacy_receivers)
            .unwrap_or(&EMPTY_RECEIVERS)
    }

    pub fn libraries(&self, component: &str) -> &BTreeSet<String> {
        self.get(component)
            .map(|c| &c.libraries)
            .unwrap_or(&EMPTY_STRINGS)
    }

    pub fn min_sdk(&self, component: &str) -> Option<u32> {
        self.get(component).and_then(|c| c.min_sdk)
    }

    /// Restrict the catalog to the component types a project uses
    pub fn used<'a>(&'a self, types: &'a BTreeSet<String>) -> UsedComponents<'a> {
        UsedComponents { info: self, types }
    }
}

/// View of the catalog over the component types used by one project.
///
/// Every query returns a map keyed by component type. Types without an
/// entry in the catalog, or with nothing to contribute, are left out.
#[derive(Debug, Clone, Copy)]
pub struct UsedComponents<'a> {
    info: &'a ComponentInfo,
    types: &'a BTreeSet<String>,
}

impl<'a> UsedComponents<'a> {
    fn known(&self) -> impl Iterator<Item = (&'a str, &'a ComponentMetadata)> + 'a {
        let info = self.info;
        let types = self.types;
        types
            .iter()
            .filter_map(move |t| info.get(t).map(|meta| (t.as_str(), meta)))
    }

    fn collect<T: 'a>(
        &self,
        select: impl Fn(&'a ComponentMetadata) -> Option<T>,
    ) -> BTreeMap<&'a str, T> {
        self.known()
            .filter_map(|(name, meta)| select(meta).map(|value| (name, value)))
            .collect()
    }

    fn subelements_needed(&self, kind: SubelementKind) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.collect(move |meta| meta.subelements.get(&kind))
    }

    pub fn permissions_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.collect(|meta| Some(&meta.permissions).filter(|set| !set.is_empty()))
    }

    pub fn permission_constraints_needed(
        &self,
    ) -> BTreeMap<&'a str, &'a BTreeMap<String, BTreeSet<PermissionConstraint>>> {
        self.collect(|meta| Some(&meta.permission_constraints).filter(|map| !map.is_empty()))
    }

    pub fn activities_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::Activity)
    }

    pub fn services_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::Service)
    }

    pub fn broadcast_receivers_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::Receiver)
    }

    pub fn content_providers_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::Provider)
    }

    pub fn metadata_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::Metadata)
    }

    pub fn activity_metadata_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::ActivityMetadata)
    }

    pub fn queries_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.subelements_needed(SubelementKind::Query)
    }

    pub fn legacy_receivers_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<LegacyReceiver>> {
        self.collect(|meta| Some(&meta.legacy_receivers).filter(|set| !set.is_empty()))
    }

    pub fn min_sdks_needed(&self) -> BTreeMap<&'a str, u32> {
        self.collect(|meta| meta.min_sdk)
    }

    pub fn libraries_needed(&self) -> BTreeMap<&'a str, &'a BTreeSet<String>> {
        self.collect(|meta| Some(&meta.libraries).filter(|set| !set.is_empty()))
    }

    /// Union of every library used by the project
    pub fn all_libraries(&self) -> BTreeSet<&'a str> {
        self.libraries_needed()
            .into_values()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::ConstraintValue;

    const CATALOG: &str = r#"{
        "Button": {},
        "Texting": {
            "permissions": ["android.permission.RECEIVE_SMS", "android.permission.SEND_SMS"],
            "legacyBroadcastReceivers": [
                "com.example.SmsReceiver, android.provider.Telephony.SMS_RECEIVED,",
                "com.example.SmsReceiver,android.provider.Telephony.SMS_RECEIVED",
                ""
            ],
            "minSdk": 14
        },
        "BluetoothClient": {
            "permissions": ["android.permission.BLUETOOTH_SCAN"],
            "permissionConstraints": {
                "android.permission.BLUETOOTH_SCAN": {"usesPermissionFlags": "neverForLocation"}
            },
            "queries": ["<package android:name=\"%packageName%\" />"]
        }
    }"#;

    fn used(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_from_json() {
        let info = ComponentInfo::from_json(CATALOG).unwrap();
        assert_eq!(info.len(), 3);
        assert_eq!(info.min_sdk("Texting"), Some(14));
        assert_eq!(info.permissions("Texting").len(), 2);
        assert_eq!(
            info.permission_constraints("BluetoothClient")["android.permission.BLUETOOTH_SCAN"]
                .iter()
                .next()
                .unwrap()
                .value,
            ConstraintValue::Str("neverForLocation".into())
        );
    }

    #[test]
    fn test_legacy_receivers_normalized() {
        let info = ComponentInfo::from_json(CATALOG).unwrap();
        let receivers = info.legacy_receivers("Texting");
        assert_eq!(receivers.len(), 1);

        let receiver = receivers.iter().next().unwrap();
        assert_eq!(receiver.class_name, "com.example.SmsReceiver");
        assert_eq!(receiver.actions, vec!["android.provider.Telephony.SMS_RECEIVED"]);
        assert!(receiver.handles("ANDROID.PROVIDER.TELEPHONY.SMS_RECEIVED"));
    }

    #[test]
    fn test_absent_component_yields_empty() {
        let info = ComponentInfo::from_json(CATALOG).unwrap();
        assert!(info.permissions("Nonexistent").is_empty());
        assert!(info.subelements("Nonexistent", SubelementKind::Activity).is_empty());
        assert!(info.legacy_receivers("Button").is_empty());
        assert_eq!(info.min_sdk("Button"), None);
    }

    #[test]
    fn test_used_view() {
        let info = ComponentInfo::from_json(CATALOG).unwrap();
        let types = used(&["Button", "BluetoothClient", "Mystery"]);
        let view = info.used(&types);

        let permissions = view.permissions_needed();
        assert_eq!(permissions.keys().copied().collect::<Vec<_>>(), vec!["BluetoothClient"]);
        assert_eq!(view.queries_needed().len(), 1);
        assert!(view.activities_needed().is_empty());
        assert!(view.min_sdks_needed().is_empty());
        assert_eq!(view.permission_constraints_needed().len(), 1);
    }

    #[test]
    fn test_invalid_constraint_fails_load() {
        let json = r#"{"Sensor": {"permissionConstraints": {"android.permission.X": {"minSdkVersion": 3}}}}"#;
        match ComponentInfo::from_json(json) {
            Err(RegistryError::Constraint { component, source, .. }) => {
                assert_eq!(component, "Sensor");
                assert_eq!(source, ConstraintError::Unrecognized("minSdkVersion".into()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            ComponentInfo::from_json(r#"{"Button": {"permision": []}}"#),
            Err(RegistryError::Json(_))
        ));
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let info = ComponentInfo::builtin().unwrap();
        assert!(info.contains("NearField"));
        assert!(info.contains("Texting"));
        assert!(info.permissions("NearField").contains("android.permission.NFC"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.json");
        std::fs::write(&path, CATALOG).unwrap();

        let info = ComponentInfo::load(&path).unwrap();
        assert_eq!(info, ComponentInfo::from_json(CATALOG).unwrap());
        assert!(matches!(
            ComponentInfo::load(dir.path().join("missing.json")),
            Err(RegistryError::Io(_))
        ));
    }
}
