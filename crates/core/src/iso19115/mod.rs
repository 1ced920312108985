//! # ISO 19115 Metadata Engine
//!
//! Builds, serializes, parses and validates ISO 19115:2003 records in the
//! ISO 19139 XML encoding. Nothing here talks to an LLM; the geospatial
//! team's tool binding feeds it parameters extracted from agent output.

pub mod builder;
pub mod record;
pub mod validate;
pub mod xml;

pub use builder::{Clock, FixedClock, FixedId, IdSource, MetadataBuilder, MetadataParams, SystemClock};
pub use record::{
    BoundingBox, ContactInfo, DataQuality, Distribution, Extent, HierarchyLevel, Identification,
    IsoRecord, MetadataStandard, ProgressStatus, SpatialRepresentationType, TemporalExtent,
};
pub use validate::{validate, ValidationReport};
pub use xml::{parse, serialize};

use serde::Serialize;

use crate::error::{TeamflowError, TeamflowResult};

/// Result of a build → serialize → validate pass
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedMetadata {
    pub record: IsoRecord,
    pub xml: String,
    pub report: ValidationReport,
}

/// Run the whole engine over one set of parameters
pub fn generate(builder: &MetadataBuilder, params: &MetadataParams) -> TeamflowResult<GeneratedMetadata> {
    let record = builder.build(params)?;
    let bytes = serialize(&record)?;
    let report = validate(&bytes);
    let xml = String::from_utf8(bytes)
        .map_err(|e| TeamflowError::InternalInvariant(format!("serializer produced invalid UTF-8: {}", e)))?;
    Ok(GeneratedMetadata { record, xml, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_valid_document() {
        let params = MetadataParams::new(
            "Road network",
            "Centre lines of public roads",
            BoundingBox { west: -8.0, east: 2.0, south: 49.5, north: 61.0 },
        );
        let generated = generate(&MetadataBuilder::new(), &params).unwrap();
        assert!(generated.report.valid);
        assert!(generated.xml.contains("Road network"));
        assert_eq!(parse(generated.xml.as_bytes()).unwrap(), generated.record);
    }
}
