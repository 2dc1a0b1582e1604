use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// UI-facing message for the "converted" case
pub const MSG_SET_CREATED: &str = "SET file created!";
/// UI-facing message when every expected artifact was already on disk
pub const MSG_SET_EXISTS: &str = "SET file already exists!";
/// Generic failure message attached ahead of the raw diagnostics
pub const MSG_CONVERSION_FAILED: &str = "Could not convert MFF file.";

/// One output file produced by a conversion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub name: String,
    pub task: String,
    pub run: i32,
}

/// Either a plain status line or the structured error list
/// `[generic message, raw error, stdout, stderr]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeMessage {
    Text(String),
    Error(Vec<String>),
}

/// Structured result of one conversion job, handed to the UI layer.
///
/// Field set mirrors the callback tuple consumers depend on:
/// `(success, message, artifacts, flags, outputDirectory)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub success: bool,
    pub message: OutcomeMessage,
    pub artifacts: Vec<Artifact>,
    pub flags: BTreeMap<String, i64>,
    pub output_directory: String,
}

impl ConversionOutcome {
    pub fn succeeded(
        message: &str,
        artifacts: Vec<Artifact>,
        flags: BTreeMap<String, i64>,
        output_directory: String,
    ) -> Self {
        Self {
            success: true,
            message: OutcomeMessage::Text(message.to_string()),
            artifacts,
            flags,
            output_directory,
        }
    }

    /// Failure outcome: empty artifact list, empty flags, empty output
    /// directory, regardless of how many artifacts succeeded.
    pub fn failed(generic: &str, raw_error: String, stdout: String, stderr: String) -> Self {
        Self {
            success: false,
            message: OutcomeMessage::Error(vec![generic.to_string(), raw_error, stdout, stderr]),
            artifacts: Vec::new(),
            flags: BTreeMap::new(),
            output_directory: String::new(),
        }
    }
}
