//! Build Configuration
//!
//! Defines build targets and the per-run options.

use std::fmt;
use std::str::FromStr;

use aibuild_core::PipelineConfig;
use serde::{Deserialize, Serialize};

use crate::TaskError;

/// Build target (APK or AAB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    #[default]
    Apk,
    Aab,
}

impl BuildTarget {
    pub const ALL: &'static [BuildTarget] = &[BuildTarget::Apk, BuildTarget::Aab];

    /// Name used for the build folder and in build URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::Apk => "apk",
            BuildTarget::Aab => "aab",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apk" => Ok(BuildTarget::Apk),
            "aab" | "bundle" => Ok(BuildTarget::Aab),
            other => Err(TaskError::Configuration(format!("unknown build target: {}", other))),
        }
    }
}

/// Options for one build run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    pub target: BuildTarget,
    /// Build the live-testing companion instead of a standalone app
    pub companion: bool,
    /// Companion build meant for the emulator
    pub emulator: bool,
    /// Keep SMS and call permissions in companion builds
    pub dangerous_permissions: bool,
    pub target_sdk: u32,
    /// Floor for the computed minSdkVersion
    pub default_min_sdk: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default(), BuildTarget::default())
    }
}

impl BuildOptions {
    /// Options seeded from the pipeline section of the configuration file
    pub fn from_pipeline(config: &PipelineConfig, target: BuildTarget) -> Self {
        Self {
            target,
            companion: false,
            emulator: false,
            dangerous_permissions: false,
            target_sdk: config.target_sdk,
            default_min_sdk: config.default_min_sdk,
        }
    }

    pub fn with_target(mut self, target: BuildTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_companion(mut self, companion: bool) -> Self {
        self.companion = companion;
        self
    }

    pub fn with_emulator(mut self, emulator: bool) -> Self {
        self.emulator = emulator;
        self
    }

    pub fn with_dangerous_permissions(mut self, include: bool) -> Self {
        self.dangerous_permissions = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("apk".parse::<BuildTarget>().unwrap(), BuildTarget::Apk);
        assert_eq!("AAB".parse::<BuildTarget>().unwrap(), BuildTarget::Aab);
        assert!("ipa".parse::<BuildTarget>().is_err());
        assert_eq!(BuildTarget::Aab.to_string(), "aab");
    }

    #[test]
    fn test_options_from_pipeline() {
        let config = PipelineConfig {
            target_sdk: 33,
            default_min_sdk: 9,
            component_info: None,
        };
        let options = BuildOptions::from_pipeline(&config, BuildTarget::Aab).with_companion(true);
        assert_eq!(options.target, BuildTarget::Aab);
        assert_eq!(options.target_sdk, 33);
        assert_eq!(options.default_min_sdk, 9);
        assert!(options.companion);
        assert!(!options.emulator);
    }
}
