//! Geospatial Metadata team. The specialist emits build parameters as a
//! fenced JSON block; the runtime's metadata tools turn that block into an
//! ISO 19115 record and a validation report.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs, ToolHandle};
use super::prompts::first_task;

const PARAMS_SHAPE: &str = r#"```json
{
  "title": "...",
  "abstract": "...",
  "keywords": ["..."],
  "spatial_extent": {"west": -180.0, "east": 180.0, "south": -90.0, "north": 90.0},
  "temporal_extent": {"start": "YYYY-MM-DD", "end": "YYYY-MM-DD"},
  "data_type": "vector | raster | table",
  "resolution": 10.0,
  "lineage": "...",
  "contact": {"organisation": "...", "email": "..."}
}
```"#;

pub fn geospatial_metadata_team(_inputs: &TeamInputs) -> Team {
    let specialist = AgentSpec::new(
        "metadata_specialist",
        "Geospatial Metadata Specialist",
        "Describe the dataset in the request as a complete ISO 19115 metadata record",
        "A GIS data manager who has catalogued national spatial data infrastructure \
         holdings and knows the ISO 19115/19139 schemas by heart.",
    )
    .with_tools([ToolHandle::MetadataBuild, ToolHandle::MetadataValidate])
    .with_max_iterations(2);

    let instructions = format!(
        "Identify the dataset the user is describing and determine its title, \
         abstract, keywords, geographic bounding box in WGS84 decimal degrees, \
         temporal coverage, data type, resolution, lineage and point of contact. \
         Use the upstream research for anything the request does not state, and \
         mark estimated values as estimates.\n\n\
         Start your answer with exactly one fenced JSON block of this shape \
         (omit optional keys you cannot determine):\n\n{}\n\n\
         Then explain each value and any assumption behind it.",
        PARAMS_SHAPE
    );

    Team::new(
        "Geospatial Metadata",
        vec![specialist],
        vec![TaskSpec::new(
            "iso_record",
            "metadata_specialist",
            first_task(&instructions),
            "A fenced JSON block of metadata parameters followed by a rationale; the \
             generated ISO 19115 XML and validation report are appended automatically.",
        )
        .with_timeout(240)
        .with_output_file("iso19115.xml")],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_specialist_with_metadata_tools() {
        let team = geospatial_metadata_team(&TeamInputs::new("describe the national road network"));
        team.validate().unwrap();
        assert_eq!(team.roles(), vec!["Geospatial Metadata Specialist"]);
        let agent = &team.agents[0];
        assert!(agent.has_tool(ToolHandle::MetadataBuild));
        assert!(agent.has_tool(ToolHandle::MetadataValidate));
        assert!(team.tasks[0].description_template.contains("```json"));
    }
}
