/// Source unit data model.
///
/// These records are the only thing exchanged between the scan, graph and
/// depresolve stages. They are serialized to JSON for stdin/stdout interchange
/// (this module, via serde) and to the binary tag-length-value format for
/// storage (see `domain::codec`). Both adapters work over the same types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::serde_bytes;

/// Identifies a source unit, or a reference to one, within a repository.
///
/// `(unit_type, name)` is unique within a repository. Together with `repo`
/// and `commit_id` it addresses a unit globally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Repository URI. Empty means "not specified", not "unknown".
    #[serde(rename = "Repo", default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(rename = "CommitID", default, skip_serializing_if = "String::is_empty")]
    pub commit_id: String,
    /// Unresolved version, informational only.
    #[serde(rename = "Version", default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Scanner-defined category, e.g. "ManPages".
    #[serde(rename = "Type", default, skip_serializing_if = "String::is_empty")]
    pub unit_type: String,
    /// Opaque identifier, unique among units of the same type.
    #[serde(rename = "Name", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Key {
    pub fn new(unit_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unit_type: unit_type.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The payload of a source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Repository-relative paths in enumeration order.
    #[serde(rename = "Files", default, deserialize_with = "nullable_vec")]
    pub files: Vec<String>,
    #[serde(rename = "Dir", default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
    /// Raw import keys, opaque to everything except the matching resolver.
    #[serde(
        rename = "Dependencies",
        default,
        deserialize_with = "nullable_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<Key>,
    /// Scanner-to-grapher handoff. `None` and `Some(vec![])` are distinct in
    /// the binary codec only.
    #[serde(
        rename = "Data",
        default,
        with = "serde_bytes::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Vec<u8>>,
    #[serde(rename = "Config", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) config: BTreeMap<String, String>,
    #[serde(
        rename = "Ops",
        default,
        with = "serde_bytes::map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub(crate) ops: BTreeMap<String, Vec<u8>>,
}

/// A `Key` plus an `Info`.
///
/// JSON flattens both halves into one object. The binary codec keeps them as
/// two sub-messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    #[serde(flatten)]
    pub key: Key,
    #[serde(flatten)]
    pub info: Info,
}

impl SourceUnit {
    pub fn new(key: Key, files: Vec<String>) -> Self {
        Self {
            key,
            info: Info {
                files,
                ..Info::default()
            },
        }
    }
}

/// A dependency edge: the key as the scanner declared it, and the fully
/// qualified key of the unit it resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(rename = "Raw")]
    pub raw: Key,
    #[serde(rename = "Resolved")]
    pub resolved: Key,
}

/// Accepts `null` wherever a sequence is expected.
fn nullable_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn man_unit() -> SourceUnit {
        SourceUnit::new(
            Key::new("ManPages", "man"),
            vec!["bar.1p.txt".to_string(), "foo.1p.txt".to_string()],
        )
    }

    #[test]
    fn test_source_unit_json_is_flat() {
        let value = serde_json::to_value(man_unit()).unwrap();
        assert_eq!(
            value,
            json!({
                "Type": "ManPages",
                "Name": "man",
                "Files": ["bar.1p.txt", "foo.1p.txt"],
            })
        );
    }

    #[test]
    fn test_empty_files_still_emitted() {
        let unit = SourceUnit::new(Key::new("ManPages", "man"), vec![]);
        let value = serde_json::to_value(unit).unwrap();
        assert_eq!(value["Files"], json!([]));
    }

    #[test]
    fn test_parse_full_unit() {
        let text = r#"{
            "Repo": "example.com/repo",
            "CommitID": "abc123",
            "Type": "ManPages",
            "Name": "man",
            "Files": ["a.1p.txt"],
            "Dir": "docs",
            "Dependencies": [{"Type": "ManPages", "Name": "other"}],
            "Data": "aGVsbG8=",
            "Config": {"b": "2", "a": "1"},
            "Ops": {"graph": "AQI="}
        }"#;
        let unit: SourceUnit = serde_json::from_str(text).unwrap();
        assert_eq!(unit.key.repo, "example.com/repo");
        assert_eq!(unit.key.commit_id, "abc123");
        assert_eq!(unit.info.dir, "docs");
        assert_eq!(unit.info.dependencies, vec![Key::new("ManPages", "other")]);
        assert_eq!(unit.info.data.as_deref(), Some(&b"hello"[..]));
        assert_eq!(unit.info.config.len(), 2);
        assert_eq!(unit.info.ops["graph"], vec![1, 2]);

        let again: SourceUnit =
            serde_json::from_str(&serde_json::to_string(&unit).unwrap()).unwrap();
        assert_eq!(again, unit);
    }

    #[test]
    fn test_null_sequences_and_missing_fields() {
        let unit: SourceUnit =
            serde_json::from_str(r#"{"Name": "man", "Files": null, "Dependencies": null}"#)
                .unwrap();
        assert!(unit.info.files.is_empty());
        assert!(unit.info.dependencies.is_empty());
        assert_eq!(unit.info.data, None);
    }

    #[test]
    fn test_json_normalizes_empty_data() {
        let mut unit = man_unit();
        unit.info.data = Some(Vec::new());
        let text = serde_json::to_string(&unit).unwrap();
        // Some(empty) encodes as "" and reads back as absent.
        let back: SourceUnit = serde_json::from_str(&text).unwrap();
        assert_eq!(back.info.data, None);
    }

    #[test]
    fn test_resolution_field_names() {
        let res = Resolution {
            raw: Key::new("ManPages", "ls"),
            resolved: Key {
                repo: "example.com/posix".to_string(),
                ..Key::new("ManPages", "ls")
            },
        };
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["Raw"]["Name"], "ls");
        assert_eq!(value["Resolved"]["Repo"], "example.com/posix");
    }
}
