// Graph output structures for the man page toolchain.
// A grapher emits one `Def` per extracted definition, collected in an `Output`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies a definition within a source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefKey {
    #[serde(rename = "Repo", default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(rename = "CommitID", default, skip_serializing_if = "String::is_empty")]
    pub commit_id: String,
    #[serde(rename = "UnitType", default, skip_serializing_if = "String::is_empty")]
    pub unit_type: String,
    #[serde(rename = "Unit", default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Unique within `(unit_type, unit)`.
    #[serde(rename = "Path")]
    pub path: String,
}

/// A single extracted definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Def {
    #[serde(flatten)]
    pub key: DefKey,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Kind", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "DefStart")]
    pub def_start: u32,
    #[serde(rename = "DefEnd")]
    pub def_end: u32,
    #[serde(rename = "Exported", default, skip_serializing_if = "is_false")]
    pub exported: bool,
    /// Kind-specific attributes as an embedded JSON document.
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Def {
    /// Decodes the embedded `Data` document, if any.
    pub fn def_data(&self) -> serde_json::Result<Option<DefData>> {
        self.data
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }
}

/// Auxiliary attributes of a command def, serialized into `Def::data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefData {
    pub name: String,
    pub keyword: String,
    #[serde(rename = "Type")]
    pub type_name: String,
    pub kind: String,
    pub separator: String,
}

/// Everything a grapher produces for its input units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "Defs", default)]
    pub defs: Vec<Def>,
}

fn is_false(b: &bool) -> bool {
    !*b
}
