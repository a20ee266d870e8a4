//! Manifest Writer
//!
//! Writes AndroidManifest.xml from structured data. Raw templates are
//! parsed and re-emitted event by event so they share the document's
//! indentation and a malformed template fails the write.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::info;

use crate::components::{Activity, Provider, Receiver};
use crate::intent_filters::IntentFilter;
use crate::manifest::{AndroidManifest, ManifestApplication, ManifestMetadata};
use crate::permissions::Permission;
use crate::ANDROID_NS;

/// Writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("XML write error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Malformed manifest template: {0}")]
    Template(String),
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Manifest writer
pub struct ManifestWriter {
    indent: usize,
}

impl ManifestWriter {
    /// Create a new writer with default settings
    pub fn new() -> Self {
        Self { indent: 2 }
    }

    /// Write manifest to string
    pub fn write_to_string(&self, manifest: &AndroidManifest) -> Result<String, WriteError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.indent);

        // XML declaration
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;

        // Manifest element
        let mut manifest_elem = BytesStart::new("manifest");
        manifest_elem.push_attribute(("xmlns:android", ANDROID_NS));
        manifest_elem.push_attribute(("package", manifest.package.as_str()));
        manifest_elem.push_attribute(("android:versionCode", manifest.version_code.as_str()));
        manifest_elem.push_attribute(("android:versionName", manifest.version_name.as_str()));
        writer.write_event(Event::Start(manifest_elem))?;

        // Features
        for feature in &manifest.features {
            let mut elem = BytesStart::new("uses-feature");
            elem.push_attribute(("android:name", feature.name.as_str()));
            if let Some(required) = feature.required {
                elem.push_attribute(("android:required", flag(required)));
            }
            writer.write_event(Event::Empty(elem))?;
        }

        // Queries
        if !manifest.queries.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("queries")))?;
            for query in &manifest.queries {
                self.write_fragment(&mut writer, query)?;
            }
            writer.write_event(Event::End(BytesEnd::new("queries")))?;
        }

        // Permissions
        for perm in &manifest.permissions {
            self.write_permission(&mut writer, perm)?;
        }

        for fragment in &manifest.extra_elements {
            self.write_fragment(&mut writer, fragment)?;
        }

        // uses-sdk
        let mut uses_sdk = BytesStart::new("uses-sdk");
        uses_sdk.push_attribute(("android:minSdkVersion", manifest.min_sdk.to_string().as_str()));
        uses_sdk.push_attribute((
            "android:targetSdkVersion",
            manifest.target_sdk.to_string().as_str(),
        ));
        writer.write_event(Event::Empty(uses_sdk))?;

        // Application
        self.write_application(&mut writer, &manifest.application)?;

        writer.write_event(Event::End(BytesEnd::new("manifest")))?;

        let mut result = writer.into_inner().into_inner();
        result.push(b'\n');
        Ok(String::from_utf8(result)?)
    }

    /// Write manifest to file
    pub fn write_to_file(
        &self,
        manifest: &AndroidManifest,
        path: impl AsRef<Path>,
    ) -> Result<(), WriteError> {
        let content = self.write_to_string(manifest)?;
        std::fs::write(path.as_ref(), content)?;
        info!("Wrote manifest to {:?}", path.as_ref());
        Ok(())
    }

    fn write_permission<W: Write>(&self, writer: &mut Writer<W>, perm: &Permission) -> Result<(), WriteError> {
        let mut elem = BytesStart::new("uses-permission");
        elem.push_attribute(("android:name", perm.name.as_str()));
        for (attribute, value) in &perm.attributes {
            let key = format!("android:{}", attribute);
            elem.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn write_application<W: Write>(&self, writer: &mut Writer<W>, app: &ManifestApplication) -> Result<(), WriteError> {
        let mut elem = BytesStart::new("application");

        if let Some(debuggable) = app.debuggable {
            elem.push_attribute(("android:debuggable", flag(debuggable)));
        }
        if let Some(ref label) = app.label {
            elem.push_attribute(("android:label", label.as_str()));
        }
        if let Some(ref network_config) = app.network_security_config {
            elem.push_attribute(("android:networkSecurityConfig", network_config.as_str()));
        }
        if let Some(legacy) = app.request_legacy_external_storage {
            elem.push_attribute(("android:requestLegacyExternalStorage", flag(legacy)));
        }
        if let Some(preserve) = app.preserve_legacy_external_storage {
            elem.push_attribute(("android:preserveLegacyExternalStorage", flag(preserve)));
        }
        if let Some(ref icon) = app.icon {
            elem.push_attribute(("android:icon", icon.as_str()));
        }
        if let Some(ref round_icon) = app.round_icon {
            elem.push_attribute(("android:roundIcon", round_icon.as_str()));
        }
        if let Some(ref name) = app.name {
            elem.push_attribute(("android:name", name.as_str()));
        }
        if let Some(ref theme) = app.theme {
            elem.push_attribute(("android:theme", theme.as_str()));
        }

        writer.write_event(Event::Start(elem))?;

        for library in &app.uses_libraries {
            let mut elem = BytesStart::new("uses-library");
            elem.push_attribute(("android:name", library.name.as_str()));
            elem.push_attribute(("android:required", flag(library.required)));
            writer.write_event(Event::Empty(elem))?;
        }

        // Activities
        for activity in &app.activities {
            self.write_activity(writer, activity)?;
        }

        for fragment in &app.fragments {
            self.write_fragment(writer, fragment)?;
        }

        // Receivers
        for receiver in &app.receivers {
            self.write_receiver(writer, receiver)?;
        }

        // Providers
        for provider in &app.providers {
            self.write_provider(writer, provider)?;
        }

        writer.write_event(Event::End(BytesEnd::new("application")))?;
        Ok(())
    }

    fn write_activity<W: Write>(&self, writer: &mut Writer<W>, activity: &Activity) -> Result<(), WriteError> {
        let mut elem = BytesStart::new("activity");
        elem.push_attribute(("android:name", activity.name.as_str()));

        if let Some(ref launch_mode) = activity.launch_mode {
            elem.push_attribute(("android:launchMode", launch_mode.as_str()));
        }
        if let Some(exported) = activity.exported {
            elem.push_attribute(("android:exported", flag(exported)));
        }
        if let Some(ref orientation) = activity.screen_orientation {
            elem.push_attribute(("android:screenOrientation", orientation.as_str()));
        }
        if let Some(ref window_soft_input) = activity.window_soft_input_mode {
            elem.push_attribute(("android:windowSoftInputMode", window_soft_input.as_str()));
        }
        if let Some(ref config_changes) = activity.config_changes {
            elem.push_attribute(("android:configChanges", config_changes.as_str()));
        }

        if activity.intent_filters.is_empty() && activity.metadata_fragments.is_empty() {
            writer.write_event(Event::Empty(elem))?;
        } else {
            writer.write_event(Event::Start(elem))?;

            for filter in &activity.intent_filters {
                self.write_intent_filter(writer, filter)?;
            }

            for fragment in &activity.metadata_fragments {
                self.write_fragment(writer, fragment)?;
            }

            writer.write_event(Event::End(BytesEnd::new("activity")))?;
        }

        Ok(())
    }

    fn write_receiver<W: Write>(&self, writer: &mut Writer<W>, receiver: &Receiver) -> Result<(), WriteError> {
        let mut elem = BytesStart::new("receiver");
        elem.push_attribute(("android:name", receiver.name.as_str()));

        if let Some(exported) = receiver.exported {
            elem.push_attribute(("android:exported", flag(exported)));
        }

        if receiver.intent_filters.is_empty() {
            writer.write_event(Event::Empty(elem))?;
        } else {
            writer.write_event(Event::Start(elem))?;

            for filter in &receiver.intent_filters {
                self.write_intent_filter(writer, filter)?;
            }

            writer.write_event(Event::End(BytesEnd::new("receiver")))?;
        }

        Ok(())
    }

    fn write_provider<W: Write>(&self, writer: &mut Writer<W>, provider: &Provider) -> Result<(), WriteError> {
        let mut elem = BytesStart::new("provider");
        elem.push_attribute(("android:name", provider.name.as_str()));
        elem.push_attribute(("android:authorities", provider.authorities.as_str()));

        if let Some(exported) = provider.exported {
            elem.push_attribute(("android:exported", flag(exported)));
        }
        if let Some(grant) = provider.grant_uri_permissions {
            elem.push_attribute(("android:grantUriPermissions", flag(grant)));
        }

        if provider.metadata.is_empty() {
            writer.write_event(Event::Empty(elem))?;
        } else {
            writer.write_event(Event::Start(elem))?;

            for meta in &provider.metadata {
                self.write_metadata(writer, meta)?;
            }

            writer.write_event(Event::End(BytesEnd::new("provider")))?;
        }

        Ok(())
    }

    fn write_intent_filter<W: Write>(&self, writer: &mut Writer<W>, filter: &IntentFilter) -> Result<(), WriteError> {
        writer.write_event(Event::Start(BytesStart::new("intent-filter")))?;

        for action in &filter.actions {
            let mut elem = BytesStart::new("action");
            elem.push_attribute(("android:name", action.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }

        for category in &filter.categories {
            let mut elem = BytesStart::new("category");
            elem.push_attribute(("android:name", category.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }

        for data in &filter.data {
            let mut elem = BytesStart::new("data");

            if let Some(ref scheme) = data.scheme {
                elem.push_attribute(("android:scheme", scheme.as_str()));
            }
            if let Some(ref host) = data.host {
                elem.push_attribute(("android:host", host.as_str()));
            }
            if let Some(ref mime_type) = data.mime_type {
                elem.push_attribute(("android:mimeType", mime_type.as_str()));
            }

            writer.write_event(Event::Empty(elem))?;
        }

        writer.write_event(Event::End(BytesEnd::new("intent-filter")))?;
        Ok(())
    }

    fn write_metadata<W: Write>(&self, writer: &mut Writer<W>, meta: &ManifestMetadata) -> Result<(), WriteError> {
        let mut elem = BytesStart::new("meta-data");
        elem.push_attribute(("android:name", meta.name.as_str()));

        if let Some(ref value) = meta.value {
            elem.push_attribute(("android:value", value.as_str()));
        }
        if let Some(ref resource) = meta.resource {
            elem.push_attribute(("android:resource", resource.as_str()));
        }

        writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    /// Re-emit a raw template. `<a></a>` pairs collapse to `<a/>`.
    fn write_fragment<W: Write>(&self, writer: &mut Writer<W>, fragment: &str) -> Result<(), WriteError> {
        let mut reader = Reader::from_str(fragment);
        reader.trim_text(true);

        let mut depth = 0usize;
        let mut pending: Option<BytesStart<'static>> = None;

        loop {
            let event = reader.read_event()?;
            if let Event::End(_) = event {
                if let Some(start) = pending.take() {
                    depth -= 1;
                    writer.write_event(Event::Empty(start))?;
                    continue;
                }
            }
            if let Some(start) = pending.take() {
                writer.write_event(Event::Start(start))?;
            }

            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    depth += 1;
                    pending = Some(normalize(&start)?);
                }
                Event::End(end) => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        WriteError::Template(format!("unbalanced end tag in {}", fragment))
                    })?;
                    writer.write_event(Event::End(end))?;
                }
                Event::Empty(empty) => {
                    writer.write_event(Event::Empty(normalize(&empty)?))?;
                }
                event @ (Event::Text(_) | Event::CData(_)) => {
                    writer.write_event(event)?;
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        if depth != 0 {
            return Err(WriteError::Template(format!("unclosed element in {}", fragment)));
        }
        Ok(())
    }
}

/// Rebuild a start tag so attribute spacing matches generated elements
fn normalize(start: &BytesStart) -> Result<BytesStart<'static>, WriteError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| WriteError::Template(e.to_string()))?
        .to_string();
    let mut elem = BytesStart::new(name);
    for attribute in start.attributes() {
        elem.push_attribute(attribute.map_err(quick_xml::Error::from)?);
    }
    Ok(elem)
}

impl Default for ManifestWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::UsesFeature;

    fn sample() -> AndroidManifest {
        let mut manifest = AndroidManifest {
            package: "com.example.test".into(),
            version_code: "3".into(),
            version_name: "1.2".into(),
            min_sdk: 7,
            target_sdk: 34,
            ..Default::default()
        };
        manifest.features.push(UsesFeature::optional("android.hardware.camera"));
        manifest.permissions.push(Permission {
            name: "android.permission.BLUETOOTH".into(),
            attributes: vec![("maxSdkVersion".into(), "30".into())],
        });
        let mut screen = Activity::new(".Screen1");
        screen.intent_filters.push(IntentFilter::launcher());
        manifest.application.activities.push(screen);
        manifest
    }

    #[test]
    fn test_write_basic_manifest() {
        let xml = ManifestWriter::new().write_to_string(&sample()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<manifest"));
        assert!(xml.contains("package=\"com.example.test\""));
        assert!(xml.contains(
            "<uses-permission android:name=\"android.permission.BLUETOOTH\" android:maxSdkVersion=\"30\"/>"
        ));
        assert!(xml.contains("<uses-sdk android:minSdkVersion=\"7\" android:targetSdkVersion=\"34\"/>"));
        assert!(xml.ends_with("</manifest>\n"));
        roxmltree::Document::parse(&xml).unwrap();
    }

    #[test]
    fn test_fragments_reindented() {
        let mut manifest = sample();
        manifest.application.fragments.push(
            "<service android:name=\"a.B\"></service><receiver android:name=\"a.C\"><intent-filter><action android:name=\"x\" /></intent-filter></receiver>".into(),
        );
        let xml = ManifestWriter::new().write_to_string(&manifest).unwrap();

        assert!(xml.contains("\n    <service android:name=\"a.B\"/>\n"));
        assert!(xml.contains("\n    <receiver android:name=\"a.C\">\n      <intent-filter>\n"));
        roxmltree::Document::parse(&xml).unwrap();
    }

    #[test]
    fn test_malformed_fragment_rejected() {
        let mut manifest = sample();
        manifest.application.fragments.push("<service android:name=\"a.B\">".into());
        assert!(matches!(
            ManifestWriter::new().write_to_string(&manifest),
            Err(WriteError::Template(_)) | Err(WriteError::XmlError(_))
        ));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AndroidManifest.xml");
        ManifestWriter::new().write_to_file(&sample(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, ManifestWriter::new().write_to_string(&sample()).unwrap());
    }
}
