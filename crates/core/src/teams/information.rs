//! Information Management team.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs};
use super::prompts::{first_task, follow_up};

pub fn information_management_team(_inputs: &TeamInputs) -> Team {
    let governance = AgentSpec::new(
        "info_governance",
        "Information Governance Specialist",
        "Define how information is classified, retained, shared and disposed of",
        "A records and information manager who has implemented retention \
         schedules and information asset registers.",
    );

    let metadata = AgentSpec::new(
        "metadata",
        "Metadata Specialist",
        "Design the metadata framework that makes information findable and trusted",
        "A metadata architect fluent in Dublin Core, DCAT and ISO 19115 who \
         designs pragmatic, maintainable schemas.",
    );

    let quality = AgentSpec::new(
        "data_quality",
        "Data Quality Specialist",
        "Specify how data quality is measured, monitored and improved",
        "A data quality lead who defines dimensions, rules and thresholds that \
         can be automated.",
    );

    Team::new(
        "Information Management",
        vec![governance, metadata, quality],
        vec![
            TaskSpec::new(
                "ig_framework",
                "info_governance",
                first_task(
                    "Produce the information governance framework: classification scheme, \
                     information asset register structure, retention and disposal rules, \
                     access and sharing policy, and accountable roles.",
                ),
                "An information governance framework with a classification table, \
                 retention schedule outline and role definitions.",
            ),
            TaskSpec::new(
                "metadata_framework",
                "metadata",
                follow_up(
                    "Design the metadata framework that supports the governance framework: \
                     the core metadata elements (mandatory and optional), controlled \
                     vocabularies, standards alignment and the capture workflow.",
                ),
                "A metadata framework: element table (name, definition, obligation, \
                 standard mapping), vocabularies and the capture and review process.",
            )
            .after(&["ig_framework"]),
            TaskSpec::new(
                "dq_framework",
                "data_quality",
                follow_up(
                    "Define the data quality framework: quality dimensions, measurable \
                     rules per dimension, thresholds, monitoring approach and the issue \
                     management process.",
                ),
                "A data quality framework: dimension and rule table with thresholds, \
                 monitoring design and remediation workflow.",
            )
            .after(&["ig_framework", "metadata_framework"]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_sequence() {
        let team = information_management_team(&TeamInputs::new("q"));
        team.validate().unwrap();
        assert_eq!(
            team.roles(),
            vec![
                "Information Governance Specialist",
                "Metadata Specialist",
                "Data Quality Specialist"
            ]
        );
    }
}
