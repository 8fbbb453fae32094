//! Filename metadata extraction via ordered pattern rules.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One extraction rule: a named regex with the capture fields to lift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRule {
    /// Rule name, recorded under `_pattern` when the rule matches.
    pub name: String,
    /// Pattern with named capture groups.
    #[serde(with = "serde_regex")]
    pub pattern: Regex,
    /// Capture group names to copy into the metadata map.
    pub fields: Vec<String>,
}

impl MetadataRule {
    /// Builds a rule from a pattern string.
    pub fn new(name: &str, pattern: &str, fields: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            pattern: Regex::new(pattern)?,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        })
    }
}

/// Derives structured metadata from a filename.
///
/// Always includes `originalName` and the lowercased `extension`. Rules are
/// tried in order; the first match contributes its captured fields plus a
/// `_pattern` marker naming the rule, and no further rules are evaluated.
/// Unmatched capture fields are simply absent.
pub fn extract_metadata(filename: &str, rules: &[MetadataRule]) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("originalName".to_string(), filename.to_string());

    for rule in rules {
        if let Some(captures) = rule.pattern.captures(filename) {
            metadata.insert("_pattern".to_string(), rule.name.clone());
            for field in &rule.fields {
                if let Some(value) = captures.name(field) {
                    metadata.insert(field.clone(), value.as_str().to_string());
                }
            }
            break;
        }
    }

    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    metadata.insert("extension".to_string(), extension.to_lowercase());

    metadata
}

mod serde_regex {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(re: &Regex, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(re.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Regex, D::Error> {
        let s = String::deserialize(de)?;
        Regex::new(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_rule() -> MetadataRule {
        MetadataRule::new("video", r"^(?P<camera>\w+)-(?P<ts>\d+)", &["camera", "ts"]).unwrap()
    }

    #[test]
    fn matching_rule_contributes_fields() {
        let metadata = extract_metadata("gopro-12345.mp4", &[video_rule()]);
        assert_eq!(metadata.get("camera").unwrap(), "gopro");
        assert_eq!(metadata.get("ts").unwrap(), "12345");
        assert_eq!(metadata.get("_pattern").unwrap(), "video");
        assert_eq!(metadata.get("originalName").unwrap(), "gopro-12345.mp4");
        assert_eq!(metadata.get("extension").unwrap(), "mp4");
        assert_eq!(metadata.len(), 5);
    }

    #[test]
    fn no_match_yields_defaults_only() {
        let metadata = extract_metadata("holiday snap.jpeg", &[video_rule()]);
        assert_eq!(metadata.get("originalName").unwrap(), "holiday snap.jpeg");
        assert_eq!(metadata.get("extension").unwrap(), "jpeg");
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            MetadataRule::new("dated", r"^(?P<date>\d{4}-\d{2}-\d{2})", &["date"]).unwrap(),
            MetadataRule::new("anything", r"^(?P<stem>\w+)", &["stem"]).unwrap(),
        ];
        let metadata = extract_metadata("2024-06-01-hike.jpg", &rules);
        assert_eq!(metadata.get("_pattern").unwrap(), "dated");
        assert_eq!(metadata.get("date").unwrap(), "2024-06-01");
        assert!(!metadata.contains_key("stem"));
    }

    #[test]
    fn absent_capture_groups_are_omitted() {
        let rule = MetadataRule::new(
            "loose",
            r"^(?P<stem>[a-z]+)(?:_(?P<variant>\d+))?",
            &["stem", "variant"],
        )
        .unwrap();
        let metadata = extract_metadata("banner.png", &[rule]);
        assert_eq!(metadata.get("stem").unwrap(), "banner");
        assert!(!metadata.contains_key("variant"));
    }

    #[test]
    fn extension_is_lowercased() {
        let metadata = extract_metadata("REPORT.PDF", &[]);
        assert_eq!(metadata.get("extension").unwrap(), "pdf");
    }

    #[test]
    fn no_extension_yields_empty_string() {
        let metadata = extract_metadata("Makefile", &[]);
        assert_eq!(metadata.get("extension").unwrap(), "");
    }

    #[test]
    fn rules_roundtrip_through_serde() {
        let json = r#"{"name":"video","pattern":"^(?P<camera>\\w+)","fields":["camera"]}"#;
        let rule: MetadataRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.name, "video");
        let metadata = extract_metadata("gopro-1.mp4", &[rule]);
        assert_eq!(metadata.get("camera").unwrap(), "gopro");
    }
}
