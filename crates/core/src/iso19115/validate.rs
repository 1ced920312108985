//! Structural validation of ISO 19139 documents.
//!
//! Validation never fails: malformed input is reported through
//! `parse_error` and everything else through `missing` / `issues`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::BoundingBox;
use super::xml::{parse_timestamp, parse_tree, XmlElement, GMD_NS};

const ROOT: &str = "gmd:MD_Metadata";

/// Top-level elements every record must carry
const REQUIRED_TOP_LEVEL: &[&str] = &[
    "gmd:fileIdentifier",
    "gmd:language",
    "gmd:characterSet",
    "gmd:hierarchyLevel",
    "gmd:dateStamp",
    "gmd:metadataStandardName",
    "gmd:metadataStandardVersion",
    "gmd:identificationInfo",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub missing: Vec<String>,
    pub issues: Vec<String>,
    pub total_issues: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ValidationReport {
    fn finish(missing: Vec<String>, issues: Vec<String>, parse_error: Option<String>) -> Self {
        let total_issues = missing.len() + issues.len() + usize::from(parse_error.is_some());
        Self {
            valid: total_issues == 0,
            missing,
            issues,
            total_issues,
            parse_error,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("### ISO 19115 Validation\n\n");
        if self.valid {
            out.push_str("**Status:** valid (0 issues)\n");
            return out;
        }
        out.push_str(&format!(
            "**Status:** invalid ({} issue{})\n",
            self.total_issues,
            if self.total_issues == 1 { "" } else { "s" }
        ));
        if let Some(err) = &self.parse_error {
            out.push_str(&format!("\n**Parse error:** {}\n", err));
        }
        if !self.missing.is_empty() {
            out.push_str("\n**Missing elements:**\n");
            for name in &self.missing {
                out.push_str(&format!("- `{}`\n", name));
            }
        }
        if !self.issues.is_empty() {
            out.push_str("\n**Issues:**\n");
            for issue in &self.issues {
                out.push_str(&format!("- {}\n", issue));
            }
        }
        out
    }
}

/// Check presence of mandatory elements plus value-level rules
pub fn validate(bytes: &[u8]) -> ValidationReport {
    let root = match parse_tree(bytes) {
        Ok(root) => root,
        Err(err) => return ValidationReport::finish(Vec::new(), Vec::new(), Some(err)),
    };

    let mut missing = Vec::new();
    let mut issues = Vec::new();

    if root.name != ROOT {
        issues.push(format!("root element is <{}>, expected <{}>", root.name, ROOT));
    }
    match root.attribute("xmlns:gmd") {
        Some(ns) if ns == GMD_NS => {}
        Some(ns) => issues.push(format!("gmd namespace bound to '{}', expected '{}'", ns, GMD_NS)),
        None => issues.push("gmd namespace is not declared".to_string()),
    }

    for name in REQUIRED_TOP_LEVEL {
        match root.get(name) {
            None => missing.push(name.to_string()),
            Some(el) if *name != "gmd:identificationInfo" && el.code_value().is_none() => {
                issues.push(format!("{} is empty", name));
            }
            Some(_) => {}
        }
    }

    if let Some(raw) = root.get("gmd:dateStamp").and_then(|n| n.value()) {
        if parse_timestamp(raw).is_none() {
            issues.push(format!("dateStamp '{}' is not an ISO 8601 date or date-time", raw));
        }
    }

    if let Some(info) = root.get("gmd:identificationInfo") {
        check_identification(info, &mut missing, &mut issues);
    }

    ValidationReport::finish(missing, issues, None)
}

fn check_identification(info: &XmlElement, missing: &mut Vec<String>, issues: &mut Vec<String>) {
    match info.find("gmd:title") {
        None => missing.push("gmd:title".to_string()),
        Some(t) if t.value().is_none() => issues.push("gmd:title is empty".to_string()),
        Some(_) => {}
    }
    match info.find("gmd:abstract") {
        None => missing.push("gmd:abstract".to_string()),
        Some(a) if a.value().is_none() => issues.push("gmd:abstract is empty".to_string()),
        Some(_) => {}
    }

    let Some(extent) = info.find("gmd:extent") else {
        missing.push("gmd:extent".to_string());
        return;
    };

    match extent.find("gmd:EX_GeographicBoundingBox") {
        Some(bbox) => check_bbox(bbox, issues),
        None => issues.push("extent has no EX_GeographicBoundingBox".to_string()),
    }
    if let Some(period) = extent.find("gml:TimePeriod") {
        check_period(period, issues);
    }
}

fn check_bbox(bbox: &XmlElement, issues: &mut Vec<String>) {
    let mut read = |name: &str| -> Option<f64> {
        let Some(raw) = bbox.get(name).and_then(|n| n.value()) else {
            issues.push(format!("bounding box is missing {}", name));
            return None;
        };
        match raw.parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                issues.push(format!("{} '{}' is not a decimal number", name, raw));
                None
            }
        }
    };
    let west = read("gmd:westBoundLongitude");
    let east = read("gmd:eastBoundLongitude");
    let south = read("gmd:southBoundLatitude");
    let north = read("gmd:northBoundLatitude");

    if let (Some(west), Some(east), Some(south), Some(north)) = (west, east, south, north) {
        issues.extend(BoundingBox { west, east, south, north }.problems());
    }
}

fn check_period(period: &XmlElement, issues: &mut Vec<String>) {
    let mut read = |name: &str| -> Option<NaiveDate> {
        let raw = period.get(name).and_then(|n| n.value())?;
        match NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                issues.push(format!("{} '{}' is not an ISO 8601 date", name, raw));
                None
            }
        }
    };
    let begin = read("gml:beginPosition");
    let end = read("gml:endPosition");
    if let (Some(begin), Some(end)) = (begin, end) {
        if begin > end {
            issues.push(format!("temporal extent begins ({}) after it ends ({})", begin, end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso19115::builder::{FixedClock, FixedId, MetadataBuilder, MetadataParams};
    use crate::iso19115::record::TemporalExtent;
    use crate::iso19115::xml::serialize;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    fn scenario_xml() -> String {
        let mut params = MetadataParams::new(
            "T",
            "A",
            BoundingBox { west: -10.0, east: 10.0, south: -5.0, north: 5.0 },
        );
        params.keywords = vec!["k1".into(), "k2".into()];
        params.temporal_extent = Some(TemporalExtent {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        });
        let record = MetadataBuilder::new()
            .with_clock(Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap())))
            .with_ids(Arc::new(FixedId(Uuid::nil())))
            .build(&params)
            .unwrap();
        String::from_utf8(serialize(&record).unwrap()).unwrap()
    }

    #[test]
    fn test_built_record_is_valid() {
        let xml = scenario_xml();
        for needle in [
            "<gmd:westBoundLongitude>",
            "<gco:Decimal>-10.0</gco:Decimal>",
            "<gco:Decimal>10.0</gco:Decimal>",
            "<gco:Decimal>-5.0</gco:Decimal>",
            "<gco:Decimal>5.0</gco:Decimal>",
            "<gml:beginPosition>2024-01-01</gml:beginPosition>",
            "<gml:endPosition>2024-06-30</gml:endPosition>",
        ] {
            assert!(xml.contains(needle), "missing {}", needle);
        }

        let report = validate(xml.as_bytes());
        assert!(report.valid, "{:?}", report);
        assert_eq!(report.total_issues, 0);
    }

    #[test]
    fn test_missing_identification_info() {
        let xml = scenario_xml();
        let start = xml.find("<gmd:identificationInfo>").unwrap();
        let end_tag = "</gmd:identificationInfo>";
        let end = xml.find(end_tag).unwrap() + end_tag.len();
        let stripped = format!("{}{}", &xml[..start], &xml[end..]);

        let report = validate(stripped.as_bytes());
        assert!(!report.valid);
        assert!(report.missing.contains(&"gmd:identificationInfo".to_string()));
        assert!(report.total_issues >= 1);
    }

    #[test]
    fn test_value_rules() {
        let xml = scenario_xml()
            .replace("<gco:Decimal>-10.0</gco:Decimal>", "<gco:Decimal>-190.0</gco:Decimal>")
            .replace(
                "<gml:endPosition>2024-06-30</gml:endPosition>",
                "<gml:endPosition>2023-06-30</gml:endPosition>",
            );
        let report = validate(xml.as_bytes());
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("west bound")));
        assert!(report.issues.iter().any(|i| i.contains("begins")));
    }

    #[test]
    fn test_malformed_xml_reports_parse_error() {
        let report = validate(b"<gmd:MD_Metadata><gmd:fileIdentifier>");
        assert!(!report.valid);
        assert!(report.parse_error.is_some());
        assert_eq!(report.total_issues, 1);
        assert!(report.to_markdown().contains("Parse error"));
    }
}
