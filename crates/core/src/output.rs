//! Build result file
//!
//! The build server reports a finished build by writing
//! `build/<target>/build.out` into project storage.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Folder holding build outputs inside a project
pub const BUILD_FOLDER: &str = "build";

/// Name of the result file
pub const RESULT_FILE_NAME: &str = "build.out";

/// Values of the `result` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResultCode {
    Success = 0,
    Failure = 1,
    CodegenFailure = 2,
}

impl BuildResultCode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(BuildResultCode::Success),
            1 => Some(BuildResultCode::Failure),
            2 => Some(BuildResultCode::CodegenFailure),
            _ => None,
        }
    }
}

/// Contents of `build.out`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResultFile {
    pub result: i32,
    pub output: String,
    pub error: String,
}

impl BuildResultFile {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            result: BuildResultCode::Success as i32,
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            result: BuildResultCode::Failure as i32,
            output: output.into(),
            error: error.into(),
        }
    }

    pub fn code(&self) -> Option<BuildResultCode> {
        BuildResultCode::from_code(self.result)
    }

    pub fn is_success(&self) -> bool {
        self.code() == Some(BuildResultCode::Success)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Storage path of the result file for a target, e.g. `build/apk/build.out`
    pub fn storage_path(target: &str) -> String {
        format!("{}/{}/{}", BUILD_FOLDER, target, RESULT_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_path() {
        assert_eq!(BuildResultFile::storage_path("apk"), "build/apk/build.out");
        assert_eq!(BuildResultFile::storage_path("aab"), "build/aab/build.out");
    }

    #[test]
    fn test_parse_server_output() {
        let file = BuildResultFile::from_json(
            r#"{"result":2,"output":"compiling","error":"Screen1 has errors","extra":true}"#,
        )
        .unwrap();
        assert_eq!(file.code(), Some(BuildResultCode::CodegenFailure));
        assert!(!file.is_success());
        assert_eq!(file.error, "Screen1 has errors");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        assert!(BuildResultFile::from_json(r#"{"result":0,"output":""}"#).is_err());
    }
}
