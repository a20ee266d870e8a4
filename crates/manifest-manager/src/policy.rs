//! Permission Policy
//!
//! Build-mode dependent additions and removals applied on top of the
//! permissions the used components ask for, plus the final reduction of
//! permission constraints into `<uses-permission>` attributes.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::common_permissions as perm;
use crate::permissions::{reduce_constraints, ConstraintError, Permission, PermissionConstraint};
use crate::registry::ComponentInfo;

/// Broadcast action whose receivers are dropped along with the SMS permissions
pub const SMS_RECEIVED_ACTION: &str = "android.provider.Telephony.SMS_RECEIVED";

/// SDK level from which scoped storage makes WRITE_EXTERNAL_STORAGE unnecessary
pub const SCOPED_STORAGE_SDK: u32 = 29;

/// Flags describing the kind of build being produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildMode {
    /// Building the companion (live development) app
    pub companion: bool,
    /// Companion build meant for the emulator
    pub emulator: bool,
    /// Keep permissions the store restricts to default SMS/phone handlers
    pub dangerous_permissions: bool,
    /// Project uses legacy (pre scoped storage) file access
    pub legacy_file_access: bool,
    /// Project uses shared file access
    pub shared_file_access: bool,
}

impl BuildMode {
    /// Companion build without the restricted permissions
    pub fn strips_restricted(&self) -> bool {
        self.companion && !self.dangerous_permissions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    LegacyOrSharedFileAccess,
    CompanionOrSharedFileAccess,
    CompanionWithoutDangerousPermissions,
}

impl Condition {
    pub fn holds(&self, mode: &BuildMode) -> bool {
        match self {
            Condition::LegacyOrSharedFileAccess => {
                mode.legacy_file_access || mode.shared_file_access
            }
            Condition::CompanionOrSharedFileAccess => mode.companion || mode.shared_file_access,
            Condition::CompanionWithoutDangerousPermissions => mode.strips_restricted(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Add,
    Remove,
}

/// One row of the policy table
#[derive(Debug, Clone, Copy)]
pub struct PermissionRule {
    pub condition: Condition,
    pub action: RuleAction,
    pub permissions: &'static [&'static str],
}

/// Rows are applied in order.
pub const PERMISSION_RULES: &[PermissionRule] = &[
    PermissionRule {
        condition: Condition::LegacyOrSharedFileAccess,
        action: RuleAction::Add,
        permissions: &[perm::READ_EXTERNAL_STORAGE, perm::WRITE_EXTERNAL_STORAGE],
    },
    PermissionRule {
        condition: Condition::CompanionOrSharedFileAccess,
        action: RuleAction::Add,
        permissions: &[
            perm::READ_MEDIA_AUDIO,
            perm::READ_MEDIA_IMAGES,
            perm::READ_MEDIA_VIDEO,
        ],
    },
    // Default SMS and phone handler permissions
    PermissionRule {
        condition: Condition::CompanionWithoutDangerousPermissions,
        action: RuleAction::Remove,
        permissions: &[
            perm::READ_SMS,
            perm::RECEIVE_MMS,
            perm::RECEIVE_SMS,
            perm::RECEIVE_WAP_PUSH,
            perm::SEND_SMS,
            perm::WRITE_SMS,
            perm::PROCESS_OUTGOING_CALLS,
            perm::CALL_PHONE,
            perm::READ_CALL_LOG,
            perm::WRITE_CALL_LOG,
        ],
    },
];

/// Apply every policy row whose condition holds
pub fn apply_permission_rules(permissions: &mut BTreeSet<String>, mode: &BuildMode) {
    for rule in PERMISSION_RULES {
        if !rule.condition.holds(mode) {
            continue;
        }
        for name in rule.permissions {
            match rule.action {
                RuleAction::Add => {
                    permissions.insert(name.to_string());
                }
                RuleAction::Remove => {
                    if permissions.remove(*name) {
                        debug!("Removed restricted permission {}", name);
                    }
                }
            }
        }
    }
}

/// Constraints the build mode imposes regardless of components
pub fn implicit_constraints(mode: &BuildMode, min_sdk: u32) -> Vec<(&'static str, PermissionConstraint)> {
    let mut constraints = Vec::new();
    if !mode.companion && !mode.legacy_file_access && min_sdk < SCOPED_STORAGE_SDK {
        constraints.push((
            perm::WRITE_EXTERNAL_STORAGE,
            PermissionConstraint::max_sdk_version(SCOPED_STORAGE_SDK),
        ));
    }
    constraints
}

/// Whether a subelement template must be left out of the manifest
pub fn skips_subelement(mode: &BuildMode, template: &str) -> bool {
    mode.strips_restricted() && template.contains(SMS_RECEIVED_ACTION)
}

/// Compute the final `<uses-permission>` list for a build.
///
/// Unions the permissions of every used component, applies the policy
/// table, then reduces the constraints declared on each surviving
/// permission. The result is sorted by permission name.
pub fn aggregate_permissions(
    info: &ComponentInfo,
    used: &BTreeSet<String>,
    mode: &BuildMode,
    min_sdk: u32,
) -> Result<Vec<Permission>, ConstraintError> {
    let view = info.used(used);

    let mut names: BTreeSet<String> = view
        .permissions_needed()
        .into_values()
        .flatten()
        .cloned()
        .collect();
    apply_permission_rules(&mut names, mode);

    let mut constraints: BTreeMap<&str, Vec<PermissionConstraint>> = BTreeMap::new();
    for declared in view.permission_constraints_needed().into_values() {
        for (permission, set) in declared {
            constraints
                .entry(permission.as_str())
                .or_default()
                .extend(set.iter().cloned());
        }
    }
    for (permission, constraint) in implicit_constraints(mode, min_sdk) {
        constraints.entry(permission).or_default().push(constraint);
    }

    names
        .iter()
        .map(|name| {
            let attributes = match constraints.get(name.as_str()) {
                Some(declared) => reduce_constraints(declared)?,
                None => Vec::new(),
            };
            Ok::<_, ConstraintError>(Permission {
                name: name.clone(),
                attributes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_shared_file_access_adds_storage_and_media() {
        let mut permissions = BTreeSet::new();
        let mode = BuildMode {
            shared_file_access: true,
            ..Default::default()
        };
        apply_permission_rules(&mut permissions, &mode);

        assert!(permissions.contains(perm::READ_EXTERNAL_STORAGE));
        assert!(permissions.contains(perm::WRITE_EXTERNAL_STORAGE));
        assert!(permissions.contains(perm::READ_MEDIA_IMAGES));
        assert_eq!(permissions.len(), 5);
    }

    #[test]
    fn test_app_scope_adds_nothing() {
        let mut permissions = set(&[perm::INTERNET]);
        apply_permission_rules(&mut permissions, &BuildMode::default());
        assert_eq!(permissions, set(&[perm::INTERNET]));
    }

    #[test]
    fn test_companion_strips_restricted() {
        let mut permissions = set(&[perm::SEND_SMS, perm::CALL_PHONE, perm::INTERNET]);
        let mode = BuildMode {
            companion: true,
            ..Default::default()
        };
        apply_permission_rules(&mut permissions, &mode);

        assert!(!permissions.contains(perm::SEND_SMS));
        assert!(!permissions.contains(perm::CALL_PHONE));
        assert!(permissions.contains(perm::INTERNET));
        assert!(permissions.contains(perm::READ_MEDIA_AUDIO));
    }

    #[test]
    fn test_dangerous_permissions_keep_restricted() {
        let mut permissions = set(&[perm::SEND_SMS]);
        let mode = BuildMode {
            companion: true,
            dangerous_permissions: true,
            ..Default::default()
        };
        apply_permission_rules(&mut permissions, &mode);
        assert!(permissions.contains(perm::SEND_SMS));
    }

    #[test]
    fn test_sms_template_skipping() {
        let template = "<receiver android:name=\"x\"><intent-filter><action android:name=\"android.provider.Telephony.SMS_RECEIVED\" /></intent-filter></receiver>";
        let companion = BuildMode {
            companion: true,
            ..Default::default()
        };
        assert!(skips_subelement(&companion, template));
        assert!(!skips_subelement(&BuildMode::default(), template));
        assert!(!skips_subelement(&companion, "<service android:name=\"y\" />"));
    }

    #[test]
    fn test_implicit_storage_bound() {
        assert_eq!(implicit_constraints(&BuildMode::default(), 7).len(), 1);
        assert!(implicit_constraints(&BuildMode::default(), 29).is_empty());

        let legacy = BuildMode {
            legacy_file_access: true,
            ..Default::default()
        };
        assert!(implicit_constraints(&legacy, 7).is_empty());
    }

    #[test]
    fn test_aggregate_reduces_constraints() {
        let info = ComponentInfo::from_json(
            r#"{
                "A": {
                    "permissions": ["android.permission.BLUETOOTH"],
                    "permissionConstraints": {"android.permission.BLUETOOTH": {"maxSdkVersion": 30}}
                },
                "B": {
                    "permissions": ["android.permission.BLUETOOTH", "android.permission.WRITE_EXTERNAL_STORAGE"],
                    "permissionConstraints": {
                        "android.permission.BLUETOOTH": {"maxSdkVersion": 28},
                        "android.permission.WRITE_EXTERNAL_STORAGE": {"maxSdkVersion": 32}
                    }
                }
            }"#,
        )
        .unwrap();

        let permissions =
            aggregate_permissions(&info, &set(&["A", "B"]), &BuildMode::default(), 14).unwrap();
        assert_eq!(permissions.len(), 2);
        assert_eq!(permissions[0].name, "android.permission.BLUETOOTH");
        assert_eq!(permissions[0].attribute("maxSdkVersion"), Some("28"));
        // The implicit scoped-storage bound is tighter than the declared one.
        assert_eq!(permissions[1].attribute("maxSdkVersion"), Some("29"));
    }

    #[test]
    fn test_aggregate_without_components() {
        let info = ComponentInfo::default();
        let permissions =
            aggregate_permissions(&info, &BTreeSet::new(), &BuildMode::default(), 7).unwrap();
        assert!(permissions.is_empty());
    }
}
