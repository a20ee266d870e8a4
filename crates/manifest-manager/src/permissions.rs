//! Permissions and permission constraints
//!
//! Several components may declare the same permission with different
//! scoping attributes (`maxSdkVersion`, `usesPermissionFlags`). Each
//! attribute has an explicit reduction policy that collapses all declared
//! values into the single attribute written on `<uses-permission>`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// `maxSdkVersion` attribute name
pub const MAX_SDK_VERSION: &str = "maxSdkVersion";

/// `usesPermissionFlags` attribute name
pub const USES_PERMISSION_FLAGS: &str = "usesPermissionFlags";

/// Constraint errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("Unrecognized permission constraint: {0}")]
    Unrecognized(String),
    #[error("Permission constraint {attribute} expects {expected} values, got {found:?}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        found: ConstraintValue,
    },
    #[error("No values declared for permission constraint {0}")]
    Empty(String),
    #[error("Unsupported value for permission constraint {attribute}: {value}")]
    InvalidValue { attribute: String, value: String },
}

/// Typed constraint value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Int(u32),
    Str(String),
}

/// One scoping attribute declared by one component on one permission
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionConstraint {
    pub attribute: String,
    pub value: ConstraintValue,
}

impl PermissionConstraint {
    pub fn new(attribute: &str, value: ConstraintValue) -> Self {
        Self {
            attribute: attribute.to_string(),
            value,
        }
    }

    pub fn max_sdk_version(version: u32) -> Self {
        Self::new(MAX_SDK_VERSION, ConstraintValue::Int(version))
    }

    pub fn uses_permission_flags(flag: &str) -> Self {
        Self::new(USES_PERMISSION_FLAGS, ConstraintValue::Str(flag.to_string()))
    }

    /// Build a constraint from a metadata JSON value
    pub fn from_json(attribute: &str, value: &serde_json::Value) -> Result<Self, ConstraintError> {
        let value = match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(ConstraintValue::Int),
            serde_json::Value::String(s) => Some(ConstraintValue::Str(s.clone())),
            _ => None,
        }
        .ok_or_else(|| ConstraintError::InvalidValue {
            attribute: attribute.to_string(),
            value: value.to_string(),
        })?;

        let constraint = Self::new(attribute, value);
        // Surface unknown attributes and wrong value types at load time.
        let mut reducer = reducer_for(attribute)?;
        reducer.apply(&constraint.value)?;
        Ok(constraint)
    }
}

/// Reduction policy for one attribute
pub trait ConstraintReducer {
    /// Fold one more value in
    fn apply(&mut self, value: &ConstraintValue) -> Result<(), ConstraintError>;

    /// Rendered attribute value, `None` if nothing was applied
    fn finish(&self) -> Option<String>;
}

/// Numeric minimum: the most restrictive upper bound wins
#[derive(Debug, Default)]
pub struct MinReducer {
    attribute: String,
    value: Option<u32>,
}

impl MinReducer {
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            value: None,
        }
    }
}

impl ConstraintReducer for MinReducer {
    fn apply(&mut self, value: &ConstraintValue) -> Result<(), ConstraintError> {
        match value {
            ConstraintValue::Int(v) => {
                self.value = Some(self.value.map_or(*v, |current| current.min(*v)));
                Ok(())
            }
            other => Err(ConstraintError::TypeMismatch {
                attribute: self.attribute.clone(),
                expected: "integer",
                found: other.clone(),
            }),
        }
    }

    fn finish(&self) -> Option<String> {
        self.value.map(|v| v.to_string())
    }
}

/// Set union of string flags, sorted and joined with `|`
#[derive(Debug, Default)]
pub struct UnionReducer {
    attribute: String,
    values: BTreeSet<String>,
}

impl UnionReducer {
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            values: BTreeSet::new(),
        }
    }
}

impl ConstraintReducer for UnionReducer {
    fn apply(&mut self, value: &ConstraintValue) -> Result<(), ConstraintError> {
        match value {
            ConstraintValue::Str(flags) => {
                // A single declaration may already carry several flags.
                for flag in flags.split('|').map(str::trim).filter(|f| !f.is_empty()) {
                    self.values.insert(flag.to_string());
                }
                Ok(())
            }
            other => Err(ConstraintError::TypeMismatch {
                attribute: self.attribute.clone(),
                expected: "string",
                found: other.clone(),
            }),
        }
    }

    fn finish(&self) -> Option<String> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().cloned().collect::<Vec<_>>().join("|"))
        }
    }
}

/// Look up the reduction policy for an attribute
pub fn reducer_for(attribute: &str) -> Result<Box<dyn ConstraintReducer>, ConstraintError> {
    match attribute {
        MAX_SDK_VERSION => Ok(Box::new(MinReducer::new(attribute))),
        USES_PERMISSION_FLAGS => Ok(Box::new(UnionReducer::new(attribute))),
        other => Err(ConstraintError::Unrecognized(other.to_string())),
    }
}

/// Reduce constraints sharing one attribute into its rendered value
pub fn reduce_attribute<'a>(
    attribute: &str,
    constraints: impl IntoIterator<Item = &'a PermissionConstraint>,
) -> Result<String, ConstraintError> {
    let mut reducer = reducer_for(attribute)?;
    for constraint in constraints {
        if constraint.attribute != attribute {
            continue;
        }
        reducer.apply(&constraint.value)?;
    }
    reducer
        .finish()
        .ok_or_else(|| ConstraintError::Empty(attribute.to_string()))
}

/// Reduce every constraint declared on one permission.
///
/// Returns one `(attribute, value)` pair per attribute, sorted by attribute.
pub fn reduce_constraints<'a>(
    constraints: impl IntoIterator<Item = &'a PermissionConstraint>,
) -> Result<Vec<(String, String)>, ConstraintError> {
    let mut by_attribute: BTreeMap<&str, Vec<&PermissionConstraint>> = BTreeMap::new();
    for constraint in constraints {
        by_attribute
            .entry(constraint.attribute.as_str())
            .or_default()
            .push(constraint);
    }

    by_attribute
        .into_iter()
        .map(|(attribute, group)| {
            reduce_attribute(attribute, group).map(|value| (attribute.to_string(), value))
        })
        .collect()
}

/// A `<uses-permission>` entry ready for emission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Full permission name (e.g., "android.permission.INTERNET")
    pub name: String,

    /// Reduced attributes, sorted by attribute name
    pub attributes: Vec<(String, String)>,
}

impl Permission {
    /// Create a new permission
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_sdk_version_takes_minimum() {
        let constraints = vec![
            PermissionConstraint::max_sdk_version(30),
            PermissionConstraint::max_sdk_version(28),
            PermissionConstraint::max_sdk_version(32),
        ];
        assert_eq!(reduce_attribute(MAX_SDK_VERSION, &constraints).unwrap(), "28");
    }

    #[test]
    fn test_flags_union_is_order_independent() {
        let forward = vec![
            PermissionConstraint::uses_permission_flags("neverForLocation"),
            PermissionConstraint::uses_permission_flags("a|neverForLocation"),
            PermissionConstraint::uses_permission_flags("b"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = reduce_attribute(USES_PERMISSION_FLAGS, &forward).unwrap();
        let b = reduce_attribute(USES_PERMISSION_FLAGS, &reversed).unwrap();
        assert_eq!(a, "a|b|neverForLocation");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unrecognized_attribute_is_fatal() {
        let constraints = vec![PermissionConstraint::new(
            "minSdkVersion",
            ConstraintValue::Int(3),
        )];
        assert_eq!(
            reduce_constraints(&constraints).unwrap_err(),
            ConstraintError::Unrecognized("minSdkVersion".into())
        );
    }

    #[test]
    fn test_type_mismatch() {
        let constraints = vec![PermissionConstraint::new(
            MAX_SDK_VERSION,
            ConstraintValue::Str("30".into()),
        )];
        assert!(matches!(
            reduce_attribute(MAX_SDK_VERSION, &constraints),
            Err(ConstraintError::TypeMismatch { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_reduce_mixed_attributes() {
        let constraints = vec![
            PermissionConstraint::uses_permission_flags("neverForLocation"),
            PermissionConstraint::max_sdk_version(30),
            PermissionConstraint::max_sdk_version(29),
        ];
        assert_eq!(
            reduce_constraints(&constraints).unwrap(),
            vec![
                ("maxSdkVersion".to_string(), "29".to_string()),
                ("usesPermissionFlags".to_string(), "neverForLocation".to_string()),
            ]
        );
        assert!(reduce_constraints(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_from_json() {
        let c = PermissionConstraint::from_json(MAX_SDK_VERSION, &serde_json::json!(30)).unwrap();
        assert_eq!(c.value, ConstraintValue::Int(30));

        assert!(matches!(
            PermissionConstraint::from_json("foo", &serde_json::json!(1)),
            Err(ConstraintError::Unrecognized(_))
        ));
        assert!(matches!(
            PermissionConstraint::from_json(MAX_SDK_VERSION, &serde_json::json!(true)),
            Err(ConstraintError::InvalidValue { .. })
        ));
        assert!(matches!(
            PermissionConstraint::from_json(USES_PERMISSION_FLAGS, &serde_json::json!(3)),
            Err(ConstraintError::TypeMismatch { .. })
        ));
    }
}
