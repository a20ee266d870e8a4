//! Intent Filters
//!
//! Handles intent-filter, action, category, and data elements.

use serde::{Deserialize, Serialize};

pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const ACTION_NDEF_DISCOVERED: &str = "android.nfc.action.NDEF_DISCOVERED";
pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";
pub const CATEGORY_DEFAULT: &str = "android.intent.category.DEFAULT";
pub const CATEGORY_BROWSABLE: &str = "android.intent.category.BROWSABLE";

/// Intent filter for components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFilter {
    pub actions: Vec<String>,
    pub categories: Vec<String>,
    pub data: Vec<IntentData>,
}

impl IntentFilter {
    /// Filter with a bare MAIN action
    pub fn main() -> Self {
        Self {
            actions: vec![ACTION_MAIN.to_string()],
            ..Default::default()
        }
    }

    /// Create a launcher intent filter (MAIN + LAUNCHER)
    pub fn launcher() -> Self {
        Self {
            actions: vec![ACTION_MAIN.to_string()],
            categories: vec![CATEGORY_LAUNCHER.to_string()],
            ..Default::default()
        }
    }

    /// Create a VIEW intent filter for deep links
    pub fn deep_link(scheme: &str, host: &str) -> Self {
        Self {
            actions: vec![ACTION_VIEW.to_string()],
            categories: vec![CATEGORY_DEFAULT.to_string(), CATEGORY_BROWSABLE.to_string()],
            data: vec![IntentData {
                scheme: Some(scheme.to_string()),
                host: Some(host.to_string()),
                ..Default::default()
            }],
        }
    }

    /// NFC tags carrying plain text
    pub fn ndef_text() -> Self {
        Self {
            actions: vec![ACTION_NDEF_DISCOVERED.to_string()],
            categories: vec![CATEGORY_DEFAULT.to_string()],
            data: vec![IntentData {
                mime_type: Some("text/plain".to_string()),
                ..Default::default()
            }],
        }
    }

    /// Filter over a list of broadcast actions
    pub fn actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Check if this is a launcher intent filter
    pub fn is_launcher(&self) -> bool {
        self.actions.iter().any(|a| a == ACTION_MAIN)
            && self.categories.iter().any(|c| c == CATEGORY_LAUNCHER)
    }
}

/// Intent data specification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentData {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub mime_type: Option<String>,
}
