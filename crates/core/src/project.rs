//! Project Model
//!
//! Reads a project from disk: `youngandroidproject/project.properties`
//! plus the screen sources under the source directory.

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Directory holding the properties file, relative to the project root
pub const PROJECT_DIRECTORY: &str = "youngandroidproject";

/// Properties file name
pub const PROPERTIES_FILE: &str = "project.properties";

/// Screen source extension
pub const FORM_EXTENSION: &str = "scm";

/// Section holding keys that precede any `[section]` header
const DEFAULT_SECTION: &str = "default";

/// Characters whose escaped form must survive section and delimiter parsing
const ESCAPABLE: &[char] = &['\\', '=', ':', '#', '!', ' '];

/// First private-use code point standing in for an escaped [`ESCAPABLE`] char
const MASK_BASE: u32 = 0xE000;

/// Keys written by [`ProjectProperties::render`], in order
const CANONICAL_KEYS: &[&str] = &[
    "main",
    "name",
    "assets",
    "source",
    "build",
    "icon",
    "versioncode",
    "versionname",
    "useslocation",
    "mapskey",
    "aname",
    "sizing",
];

/// Parsed `project.properties`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProperties {
    /// Every key in file order
    entries: IndexMap<String, String>,
}

impl ProjectProperties {
    /// Parse the properties text. `key=value` and `key: value` lines are
    /// accepted, `#`/`!` start comments and backslash escapes are resolved.
    pub fn parse(text: &str) -> Result<Self> {
        let mut ini = Ini::new_cs();
        ini.set_comment_symbols(&['#', '!']);
        let sections = ini
            .read(mask_escapes(text))
            .map_err(CoreError::Properties)?;

        if let Some(section) = sections.keys().find(|s| s.as_str() != DEFAULT_SECTION) {
            return Err(CoreError::Properties(format!("unexpected section [{}]", section)));
        }

        let mut entries = IndexMap::new();
        for (key, value) in sections.get(DEFAULT_SECTION).into_iter().flatten() {
            let value = value.as_deref().ok_or_else(|| {
                CoreError::Properties(format!("key '{}' has no value", unescape(key)))
            })?;
            entries.insert(unescape(key), unescape(value));
        }

        for required in ["main", "name"] {
            if entries.get(required).map_or(true, |v| v.is_empty()) {
                return Err(CoreError::Properties(format!("missing required key '{}'", required)));
            }
        }

        Ok(Self { entries })
    }

    /// Build properties for a new project
    pub fn new(name: &str, main: &str) -> Self {
        let mut entries = IndexMap::new();
        entries.insert("main".to_string(), main.to_string());
        entries.insert("name".to_string(), name.to_string());
        entries.insert("assets".to_string(), "../assets".to_string());
        entries.insert("source".to_string(), "../src".to_string());
        entries.insert("build".to_string(), "../build".to_string());
        Self { entries }
    }

    /// Set an optional key; empty values remove it
    pub fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.entries.shift_remove(key);
        } else {
            self.entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Fully qualified name of the main screen
    pub fn main(&self) -> &str {
        self.get("main").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.get("name").unwrap_or_default()
    }

    pub fn assets(&self) -> &str {
        self.get("assets").unwrap_or("../assets")
    }

    pub fn source(&self) -> &str {
        self.get("source").unwrap_or("../src")
    }

    pub fn build(&self) -> &str {
        self.get("build").unwrap_or("../build")
    }

    pub fn icon(&self) -> Option<&str> {
        self.get("icon")
    }

    pub fn version_code(&self) -> &str {
        self.get("versioncode").unwrap_or("1")
    }

    pub fn version_name(&self) -> &str {
        self.get("versionname").unwrap_or("1.0")
    }

    pub fn uses_location(&self) -> bool {
        self.get("useslocation").map_or(false, |v| v.eq_ignore_ascii_case("true"))
    }

    pub fn maps_key(&self) -> &str {
        self.get("mapskey").unwrap_or_default()
    }

    /// Application name shown on the launcher; may be empty
    pub fn app_name(&self) -> &str {
        self.get("aname").unwrap_or_default()
    }

    pub fn sizing(&self) -> Option<&str> {
        self.get("sizing")
    }

    /// Render the file: canonical keys first, unknown keys after in file order
    pub fn render(&self) -> String {
        let mut out = String::new();
        for key in CANONICAL_KEYS {
            if let Some(value) = self.entries.get(*key) {
                out.push_str(&format!("{}={}\n", key, escape(value)));
            }
        }
        for (key, value) in &self.entries {
            if !CANONICAL_KEYS.contains(&key.as_str()) {
                out.push_str(&format!("{}={}\n", escape(key), escape(value)));
            }
        }
        out
    }
}

fn mask_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) => match ESCAPABLE.iter().position(|e| *e == next) {
                Some(i) => out.push(char::from_u32(MASK_BASE + i as u32).unwrap_or(next)),
                None => {
                    out.push('\\');
                    out.push(next);
                }
            },
            None => out.push('\\'),
        }
    }
    out
}

fn unmask(c: char) -> Option<char> {
    let index = (c as u32).checked_sub(MASK_BASE)? as usize;
    ESCAPABLE.get(index).copied()
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if let Some(plain) = unmask(c) {
            out.push(plain);
            continue;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' | '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Storage mode chosen on the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileScope {
    Legacy,
    Shared,
    #[default]
    App,
    Private,
}

impl FileScope {
    /// Parse a `DefaultFileScope` value; unknown values fall back to `App`
    pub fn from_property(value: Option<&str>) -> Self {
        match value {
            Some("Legacy") => FileScope::Legacy,
            Some("Shared") => FileScope::Shared,
            Some("Private") => FileScope::Private,
            _ => FileScope::App,
        }
    }
}

/// One screen source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Dotted name, e.g. `appinventor.ai_test.HelloPurr.Screen1`
    pub qualified_name: String,
    /// Path of the `.scm` file
    pub file: PathBuf,
}

impl SourceDescriptor {
    /// Screen name without the package
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

/// A project loaded from disk
#[derive(Debug, Clone)]
pub struct Project {
    /// Project root directory
    pub root: PathBuf,
    /// Parsed properties
    pub properties: ProjectProperties,
    /// Screens, sorted by qualified name
    pub sources: Vec<SourceDescriptor>,
}

impl Project {
    /// Open a project rooted at `root`
    pub fn load(root: &Path) -> Result<Self> {
        let properties_path = root.join(PROJECT_DIRECTORY).join(PROPERTIES_FILE);
        if !properties_path.exists() {
            return Err(CoreError::NotFound(format!(
                "Project properties not found: {:?}",
                properties_path
            )));
        }

        let text = std::fs::read_to_string(&properties_path)?;
        let properties = ProjectProperties::parse(&text)?;

        let mut project = Self {
            root: root.to_path_buf(),
            properties,
            sources: Vec::new(),
        };
        project.sources = project.scan_sources()?;

        if !project.sources.iter().any(|s| s.qualified_name == project.main_class()) {
            return Err(CoreError::Project(format!(
                "main screen {} has no source file",
                project.main_class()
            )));
        }

        info!(
            "Opened project {} with {} screen(s)",
            project.project_name(),
            project.sources.len()
        );
        Ok(project)
    }

    pub fn main_class(&self) -> &str {
        self.properties.main()
    }

    pub fn project_name(&self) -> &str {
        self.properties.name()
    }

    /// Directory the relative `source`/`assets`/`build` entries resolve against
    fn properties_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIRECTORY)
    }

    pub fn source_dir(&self) -> PathBuf {
        normalize(&self.properties_dir().join(self.properties.source()))
    }

    pub fn assets_dir(&self) -> PathBuf {
        normalize(&self.properties_dir().join(self.properties.assets()))
    }

    pub fn build_dir(&self) -> PathBuf {
        normalize(&self.properties_dir().join(self.properties.build()))
    }

    fn scan_sources(&self) -> Result<Vec<SourceDescriptor>> {
        let source_dir = self.source_dir();
        if !source_dir.is_dir() {
            return Err(CoreError::NotFound(format!("Source directory not found: {:?}", source_dir)));
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&source_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| CoreError::Project(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(FORM_EXTENSION)
            {
                continue;
            }

            let relative = path
                .strip_prefix(&source_dir)
                .map_err(|e| CoreError::Project(e.to_string()))?
                .with_extension("");
            let qualified_name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join(".");

            debug!("Found screen {}", qualified_name);
            sources.push(SourceDescriptor {
                qualified_name,
                file: path.to_path_buf(),
            });
        }

        sources.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        Ok(sources)
    }
}

/// Resolve `..` segments lexically so paths print cleanly
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPERTIES: &str = "\
# generated
main=appinventor.ai_test.HelloPurr.Screen1
name=HelloPurr
assets=../assets
source=../src
build=../build
versioncode=3
versionname=1.2
aname=Hello & Purr
color.primary=&HFF3F51B5
";

    #[test]
    fn test_parse_properties() {
        let props = ProjectProperties::parse(PROPERTIES).unwrap();
        assert_eq!(props.main(), "appinventor.ai_test.HelloPurr.Screen1");
        assert_eq!(props.name(), "HelloPurr");
        assert_eq!(props.version_code(), "3");
        assert_eq!(props.version_name(), "1.2");
        assert_eq!(props.app_name(), "Hello & Purr");
        assert_eq!(props.maps_key(), "");
        assert!(!props.uses_location());
        assert_eq!(props.get("color.primary"), Some("&HFF3F51B5"));
    }

    #[test]
    fn test_defaults() {
        let props = ProjectProperties::parse("main=a.b.Screen1\nname=B\n").unwrap();
        assert_eq!(props.version_code(), "1");
        assert_eq!(props.version_name(), "1.0");
        assert_eq!(props.source(), "../src");
    }

    #[test]
    fn test_malformed_properties() {
        assert!(matches!(
            ProjectProperties::parse("main=a.b.Screen1\nname=B\njunk\n"),
            Err(CoreError::Properties(_))
        ));
        assert!(matches!(
            ProjectProperties::parse("name=B\n"),
            Err(CoreError::Properties(_))
        ));
    }

    #[test]
    fn test_colon_separator_and_escapes() {
        let text = "! exported by the designer\n\
                    main: a.b.Screen1\n\
                    name = B\n\
                    color\\:main=\\#fff\n\
                    aname=Tab\\tand\\u00e9\n";
        let props = ProjectProperties::parse(text).unwrap();
        assert_eq!(props.main(), "a.b.Screen1");
        assert_eq!(props.name(), "B");
        assert_eq!(props.get("color:main"), Some("#fff"));
        assert_eq!(props.app_name(), "Tab\tand\u{e9}");

        let rendered = props.render();
        assert!(rendered.contains("color\\:main=\\#fff\n"));
        assert_eq!(ProjectProperties::parse(&rendered).unwrap(), props);
    }

    #[test]
    fn test_sections_rejected() {
        assert!(matches!(
            ProjectProperties::parse("main=a.b.Screen1\nname=B\n[extra]\nkey=1\n"),
            Err(CoreError::Properties(_))
        ));
    }

    #[test]
    fn test_render_orders_keys() {
        let mut props = ProjectProperties::new("HelloPurr", "x.HelloPurr.Screen1");
        props.set("sizing", "Responsive");
        props.set("icon", "kitty.png");
        props.set("icon", "");

        assert_eq!(
            props.render(),
            "main=x.HelloPurr.Screen1\nname=HelloPurr\nassets=../assets\nsource=../src\n\
             build=../build\nsizing=Responsive\n"
        );
        assert_eq!(ProjectProperties::parse(&props.render()).unwrap(), props);
    }

    #[test]
    fn test_file_scope() {
        assert_eq!(FileScope::from_property(Some("Legacy")), FileScope::Legacy);
        assert_eq!(FileScope::from_property(Some("Shared")), FileScope::Shared);
        assert_eq!(FileScope::from_property(Some("bogus")), FileScope::App);
        assert_eq!(FileScope::from_property(None), FileScope::App);
    }

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(PROJECT_DIRECTORY)).unwrap();
        std::fs::write(root.join(PROJECT_DIRECTORY).join(PROPERTIES_FILE), PROPERTIES).unwrap();

        let pkg = root.join("src/appinventor/ai_test/HelloPurr");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("Screen2.scm"), "").unwrap();
        std::fs::write(pkg.join("Screen1.scm"), "").unwrap();
        std::fs::write(pkg.join("Screen1.bky"), "").unwrap();

        let project = Project::load(root).unwrap();
        let names: Vec<&str> = project.sources.iter().map(|s| s.qualified_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["appinventor.ai_test.HelloPurr.Screen1", "appinventor.ai_test.HelloPurr.Screen2"]
        );
        assert_eq!(project.sources[1].simple_name(), "Screen2");
        assert_eq!(project.assets_dir(), root.join("assets"));
        assert_eq!(project.build_dir(), root.join("build"));
    }

    #[test]
    fn test_missing_main_screen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(PROJECT_DIRECTORY)).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(
            root.join(PROJECT_DIRECTORY).join(PROPERTIES_FILE),
            "main=a.b.Screen1\nname=B\n",
        )
        .unwrap();

        assert!(matches!(Project::load(root), Err(CoreError::Project(_))));
    }
}
