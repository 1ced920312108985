//! Record builder. Output depends only on the parameters, the clock and the
//! id source, so fixing both makes serialization byte-identical.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use super::record::{
    BoundingBox, ContactInfo, DataQuality, Distribution, Extent, HierarchyLevel, Identification,
    IsoRecord, MetadataStandard, ProgressStatus, SpatialRepresentationType, TemporalExtent,
};
use crate::error::{TeamflowError, TeamflowResult};

pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_CHARACTER_SET: &str = "utf8";
const DEFAULT_TOPIC: &str = "geoscientificInformation";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedId(pub Uuid);

impl IdSource for FixedId {
    fn next_id(&self) -> Uuid {
        self.0
    }
}

/// Inputs to [`MetadataBuilder::build`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataParams {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub spatial_extent: BoundingBox,
    #[serde(default)]
    pub temporal_extent: Option<TemporalExtent>,
    /// Loose label such as `vector`, `raster`, `csv`
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    /// Ground resolution in metres
    #[serde(default)]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub lineage: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub hierarchy_level: Option<HierarchyLevel>,
    #[serde(default)]
    pub topic_category: Option<String>,
    #[serde(default)]
    pub online_resource: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl MetadataParams {
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            keywords: Vec::new(),
            spatial_extent: bbox,
            temporal_extent: None,
            data_type: None,
            contact: None,
            resolution: None,
            lineage: None,
            purpose: None,
            constraints: Vec::new(),
            hierarchy_level: None,
            topic_category: None,
            online_resource: None,
            language: None,
        }
    }
}

#[derive(Clone)]
pub struct MetadataBuilder {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIds),
        }
    }
}

impl std::fmt::Debug for MetadataBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataBuilder").finish_non_exhaustive()
    }
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Validate parameters and produce a record
    pub fn build(&self, params: &MetadataParams) -> TeamflowResult<IsoRecord> {
        let title = params.title.trim();
        let abstract_text = params.abstract_text.trim();
        if title.is_empty() {
            return Err(TeamflowError::InputInvalid("metadata title is required".to_string()));
        }
        if abstract_text.is_empty() {
            return Err(TeamflowError::InputInvalid(
                "metadata abstract is required".to_string(),
            ));
        }
        params.spatial_extent.validate()?;
        if let Some(temporal) = &params.temporal_extent {
            temporal.validate()?;
        }
        if let Some(resolution) = params.resolution {
            if !resolution.is_finite() || resolution <= 0.0 {
                return Err(TeamflowError::InputInvalid(format!(
                    "spatial resolution must be positive, got {}",
                    resolution
                )));
            }
        }

        // Second precision, matching gco:DateTime
        let now = self.clock.now();
        let now = DateTime::<Utc>::from_timestamp(now.timestamp(), 0).unwrap_or(now);

        let spatial_rep_type = params
            .data_type
            .as_deref()
            .map(SpatialRepresentationType::from_data_type)
            .unwrap_or_default();
        let hierarchy_level = params.hierarchy_level.unwrap_or_default();
        let language = params
            .language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();

        let keywords: BTreeSet<String> = params
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let constraints: Vec<String> = params
            .constraints
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let distribution = params.data_type.as_ref().map(|_| {
            let mut distribution = Distribution::for_representation(spatial_rep_type);
            distribution.online_resource = non_blank(params.online_resource.as_deref());
            distribution
        });

        let data_quality = params
            .lineage
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|lineage| DataQuality {
                scope: hierarchy_level,
                lineage: lineage.to_string(),
            });

        Ok(IsoRecord {
            file_identifier: self.ids.next_id(),
            language: language.clone(),
            character_set: DEFAULT_CHARACTER_SET.to_string(),
            hierarchy_level,
            contact: params.contact.clone(),
            date_stamp: now,
            metadata_standard: MetadataStandard::default(),
            identification: Identification {
                title: title.to_string(),
                abstract_text: abstract_text.to_string(),
                purpose: non_blank(params.purpose.as_deref())
                    .unwrap_or_else(|| format!("Describe the {} '{}'.", hierarchy_level.code(), title)),
                status: ProgressStatus::derive(params.temporal_extent.as_ref(), now.date_naive()),
                keywords,
                constraints,
                spatial_rep_type,
                spatial_resolution: params.resolution,
                language,
                character_set: DEFAULT_CHARACTER_SET.to_string(),
                topic_category: non_blank(params.topic_category.as_deref())
                    .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
                citation_date: now.date_naive(),
                extent: Extent {
                    geographic_bbox: params.spatial_extent,
                    temporal: params.temporal_extent,
                },
            },
            distribution,
            data_quality,
        })
    }
}

/// Trimmed value, `None` when blank
fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
