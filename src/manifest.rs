//! The `file-tags` manifest: per-list-id metadata fetched as
//! `filetag.json` and kept alongside the trie for `lookup_domain_info`
//! (component D) and for deciding which lists a given list-id belongs to.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct TagRecord {
    pub value: u32,
    pub uname: String,
    pub vname: String,
    pub group: String,
    pub subg: String,
    pub url: String,
    pub show: u8,
    pub entries: u32,
}

/// Maps a decimal-string list-id (`"0"`, `"1"`, ...) to its record. Kept as
/// the raw string-keyed map the wire format uses; [`Manifest::get`] takes
/// the numeric id callers actually work with.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest(BTreeMap<String, TagRecord>);

impl Manifest {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, list_id: u32) -> Option<&TagRecord> {
        self.0.get(&list_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "0": {"value": 0, "uname": "easylist", "vname": "EasyList", "group": "ads", "subg": "", "url": "https://example.com/0", "show": 1, "entries": 1000},
        "42": {"value": 42, "uname": "oisd", "vname": "OISD", "group": "privacy", "subg": "big", "url": "https://example.com/42", "show": 0, "entries": 500000}
    }"#;

    #[test]
    fn parses_and_looks_up_by_numeric_id() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.len(), 2);
        let rec = manifest.get(42).unwrap();
        assert_eq!(rec.uname, "oisd");
        assert_eq!(rec.group, "privacy");
        assert!(manifest.get(7).is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Manifest::parse("{not json").is_err());
    }
}
