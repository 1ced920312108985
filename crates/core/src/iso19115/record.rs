//! ISO 19115:2003 record model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{TeamflowError, TeamflowResult};

/// `MD_ScopeCode` subset used for records produced here
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    #[default]
    Dataset,
    Series,
    Service,
}

impl HierarchyLevel {
    pub fn code(&self) -> &'static str {
        match self {
            HierarchyLevel::Dataset => "dataset",
            HierarchyLevel::Series => "series",
            HierarchyLevel::Service => "service",
        }
    }
}

impl FromStr for HierarchyLevel {
    type Err = TeamflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dataset" => Ok(HierarchyLevel::Dataset),
            "series" => Ok(HierarchyLevel::Series),
            "service" => Ok(HierarchyLevel::Service),
            other => Err(TeamflowError::InputInvalid(format!(
                "unsupported hierarchy level '{}'",
                other
            ))),
        }
    }
}

/// `MD_ProgressCode` subset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressStatus {
    #[default]
    Completed,
    OnGoing,
    Planned,
}

impl ProgressStatus {
    pub fn code(&self) -> &'static str {
        match self {
            ProgressStatus::Completed => "completed",
            ProgressStatus::OnGoing => "onGoing",
            ProgressStatus::Planned => "planned",
        }
    }

    /// Status of a resource covering `temporal` as seen on `today`
    pub fn derive(temporal: Option<&TemporalExtent>, today: NaiveDate) -> Self {
        match temporal {
            Some(t) if t.start > today => ProgressStatus::Planned,
            Some(t) if t.end >= today => ProgressStatus::OnGoing,
            _ => ProgressStatus::Completed,
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = TeamflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "completed" => Ok(ProgressStatus::Completed),
            "onGoing" => Ok(ProgressStatus::OnGoing),
            "planned" => Ok(ProgressStatus::Planned),
            other => Err(TeamflowError::InputInvalid(format!(
                "unsupported progress code '{}'",
                other
            ))),
        }
    }
}

/// `MD_SpatialRepresentationTypeCode`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SpatialRepresentationType {
    #[default]
    Vector,
    Grid,
    TextTable,
    Tin,
}

impl SpatialRepresentationType {
    pub fn code(&self) -> &'static str {
        match self {
            SpatialRepresentationType::Vector => "vector",
            SpatialRepresentationType::Grid => "grid",
            SpatialRepresentationType::TextTable => "textTable",
            SpatialRepresentationType::Tin => "tin",
        }
    }

    /// Map a loose data type label (`raster`, `shapefile`, `csv`, ...)
    pub fn from_data_type(data_type: &str) -> Self {
        let lower = data_type.trim().to_ascii_lowercase();
        if ["raster", "grid", "image", "imagery", "geotiff", "dem"]
            .iter()
            .any(|k| lower.contains(k))
        {
            SpatialRepresentationType::Grid
        } else if ["table", "csv", "tabular"].iter().any(|k| lower.contains(k)) {
            SpatialRepresentationType::TextTable
        } else if lower == "tin" {
            SpatialRepresentationType::Tin
        } else {
            SpatialRepresentationType::Vector
        }
    }
}

impl FromStr for SpatialRepresentationType {
    type Err = TeamflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "vector" => Ok(SpatialRepresentationType::Vector),
            "grid" => Ok(SpatialRepresentationType::Grid),
            "textTable" => Ok(SpatialRepresentationType::TextTable),
            "tin" => Ok(SpatialRepresentationType::Tin),
            other => Err(TeamflowError::InputInvalid(format!(
                "unsupported spatial representation type '{}'",
                other
            ))),
        }
    }
}

/// Responsible party
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub organisation: String,
    #[serde(default)]
    pub individual: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// `CI_RoleCode` value
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "pointOfContact".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataStandard {
    pub name: String,
    pub version: String,
}

impl Default for MetadataStandard {
    fn default() -> Self {
        Self {
            name: "ISO 19115:2003".to_string(),
            version: "2003".to_string(),
        }
    }
}

/// WGS84 bounding box in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Every violation, empty when the box is valid
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, value, limit) in [
            ("west", self.west, 180.0),
            ("east", self.east, 180.0),
            ("south", self.south, 90.0),
            ("north", self.north, 90.0),
        ] {
            if !value.is_finite() || value < -limit || value > limit {
                problems.push(format!("{} bound {} outside [-{}, {}]", name, value, limit, limit));
            }
        }
        if self.west > self.east {
            problems.push(format!("west ({}) is greater than east ({})", self.west, self.east));
        }
        if self.south > self.north {
            problems.push(format!(
                "south ({}) is greater than north ({})",
                self.south, self.north
            ));
        }
        problems
    }

    pub fn validate(&self) -> TeamflowResult<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(TeamflowError::InputInvalid(format!(
                "invalid bounding box: {}",
                problems.join("; ")
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemporalExtent {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TemporalExtent {
    pub fn validate(&self) -> TeamflowResult<()> {
        if self.start > self.end {
            return Err(TeamflowError::InputInvalid(format!(
                "temporal extent starts ({}) after it ends ({})",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extent {
    pub geographic_bbox: BoundingBox,
    #[serde(default)]
    pub temporal: Option<TemporalExtent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identification {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub purpose: String,
    pub status: ProgressStatus,
    pub keywords: BTreeSet<String>,
    pub constraints: Vec<String>,
    pub spatial_rep_type: SpatialRepresentationType,
    /// Ground distance in metres
    pub spatial_resolution: Option<f64>,
    pub language: String,
    pub character_set: String,
    /// `MD_TopicCategoryCode` value
    pub topic_category: String,
    /// Citation date
    pub citation_date: NaiveDate,
    pub extent: Extent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Distribution {
    pub format_name: String,
    pub format_version: String,
    #[serde(default)]
    pub online_resource: Option<String>,
}

impl Distribution {
    /// Conventional exchange format for a data type
    pub fn for_representation(rep: SpatialRepresentationType) -> Self {
        let (name, version) = match rep {
            SpatialRepresentationType::Grid => ("GeoTIFF", "1.1"),
            SpatialRepresentationType::TextTable => ("CSV", "RFC 4180"),
            SpatialRepresentationType::Vector | SpatialRepresentationType::Tin => {
                ("GeoPackage", "1.3")
            }
        };
        Self {
            format_name: name.to_string(),
            format_version: version.to_string(),
            online_resource: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataQuality {
    pub scope: HierarchyLevel,
    pub lineage: String,
}

/// Complete metadata record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsoRecord {
    pub file_identifier: Uuid,
    pub language: String,
    pub character_set: String,
    pub hierarchy_level: HierarchyLevel,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    pub date_stamp: DateTime<Utc>,
    pub metadata_standard: MetadataStandard,
    pub identification: Identification,
    #[serde(default)]
    pub distribution: Option<Distribution>,
    #[serde(default)]
    pub data_quality: Option<DataQuality>,
}

impl fmt::Display for IsoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.identification.title,
            self.hierarchy_level.code(),
            self.file_identifier
        )
    }
}
