//! Form (screen) definition files
//!
//! A `.scm` file wraps a JSON document between `#|\n$JSON\n` and `\n|#`.
//! Only the properties the build pipeline consumes are extracted.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

const HEADER: &str = "$JSON";

/// Parsed screen definition
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefinition {
    /// Screen name (`$Name` of the form)
    pub name: String,
    /// Top-level form properties
    pub properties: Map<String, Value>,
    /// Every component type used on this screen, the form itself included
    pub component_types: BTreeSet<String>,
}

impl FormDefinition {
    /// Parse the contents of a `.scm` file
    pub fn parse(file: &str, contents: &str) -> Result<Self> {
        let json = strip_envelope(contents).ok_or_else(|| CoreError::Form {
            file: file.to_string(),
            message: "missing $JSON envelope".into(),
        })?;

        let root: Value = serde_json::from_str(json).map_err(|e| CoreError::Form {
            file: file.to_string(),
            message: e.to_string(),
        })?;

        let properties = root
            .get("Properties")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| CoreError::Form {
                file: file.to_string(),
                message: "no Properties object".into(),
            })?;

        let name = properties
            .get("$Name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::Form {
                file: file.to_string(),
                message: "form has no $Name".into(),
            })?
            .to_string();

        let mut component_types = BTreeSet::new();
        collect_types(&properties, &mut component_types);

        Ok(Self {
            name,
            properties,
            component_types,
        })
    }

    /// String-valued top-level property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// `ScreenOrientation`, `unspecified` when the designer never set it
    pub fn screen_orientation(&self) -> &str {
        self.property("ScreenOrientation").unwrap_or("unspecified")
    }
}

fn strip_envelope(contents: &str) -> Option<&str> {
    let body = contents.trim();
    let body = body.strip_prefix("#|")?.strip_suffix("|#")?.trim();
    Some(body.strip_prefix(HEADER)?.trim())
}

fn collect_types(component: &Map<String, Value>, types: &mut BTreeSet<String>) {
    if let Some(kind) = component.get("$Type").and_then(Value::as_str) {
        types.insert(kind.to_string());
    }
    if let Some(children) = component.get("$Components").and_then(Value::as_array) {
        for child in children.iter().filter_map(Value::as_object) {
            collect_types(child, types);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: &str = r#"#|
$JSON
{"authURL":["ai2.appinventor.mit.edu"],"YaVersion":"208","Source":"Form","Properties":{"$Name":"Screen1","$Type":"Form","$Version":"27","ScreenOrientation":"portrait","DefaultFileScope":"Shared","Title":"Screen1","Uuid":"0","$Components":[{"$Name":"Button1","$Type":"Button","$Version":"7","Uuid":"1"},{"$Name":"Arrangement1","$Type":"HorizontalArrangement","$Components":[{"$Name":"NFC1","$Type":"NearField"}]}]}}
|#"#;

    #[test]
    fn test_parse_form() {
        let form = FormDefinition::parse("Screen1.scm", SCREEN).unwrap();
        assert_eq!(form.name, "Screen1");
        assert_eq!(form.screen_orientation(), "portrait");
        assert_eq!(form.property("DefaultFileScope"), Some("Shared"));

        let types: Vec<&str> = form.component_types.iter().map(String::as_str).collect();
        assert_eq!(types, vec!["Button", "Form", "HorizontalArrangement", "NearField"]);
    }

    #[test]
    fn test_orientation_defaults_to_unspecified() {
        let text = "#|\n$JSON\n{\"Properties\":{\"$Name\":\"Screen2\",\"$Type\":\"Form\"}}\n|#\n";
        let form = FormDefinition::parse("Screen2.scm", text).unwrap();
        assert_eq!(form.screen_orientation(), "unspecified");
    }

    #[test]
    fn test_malformed_forms() {
        assert!(matches!(
            FormDefinition::parse("a.scm", "{\"Properties\":{}}"),
            Err(CoreError::Form { .. })
        ));
        assert!(FormDefinition::parse("b.scm", "#|\n$JSON\n{not json\n|#").is_err());
        assert!(FormDefinition::parse("c.scm", "#|\n$JSON\n{\"Properties\":{}}\n|#").is_err());
    }
}
