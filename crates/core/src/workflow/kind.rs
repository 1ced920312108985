//! # Workflow Kinds
//!
//! Each kind maps to a fixed, ordered pipeline of teams. The cumulative
//! kinds (`three-team` .. `seven-team`) extend one another one team at a
//! time, so the fifth team of every pipeline from `five-team` up is
//! Tender Response.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TeamflowError;
use crate::teams::TeamKind;

/// Teams shared by the cumulative pipelines, in execution order
const CUMULATIVE: [TeamKind; 7] = [
    TeamKind::ResearchAnalysis,
    TeamKind::DataStrategy,
    TeamKind::ComplianceRisk,
    TeamKind::InformationManagement,
    TeamKind::TenderResponse,
    TeamKind::ProjectDelivery,
    TeamKind::TechnicalDocumentation,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    Standard,
    TwoTeamDataStrategy,
    ThreeTeam,
    FourTeam,
    FiveTeam,
    SixTeam,
    SevenTeam,
    Geospatial,
}

impl WorkflowKind {
    pub fn all() -> &'static [WorkflowKind] {
        &[
            WorkflowKind::Standard,
            WorkflowKind::TwoTeamDataStrategy,
            WorkflowKind::ThreeTeam,
            WorkflowKind::FourTeam,
            WorkflowKind::FiveTeam,
            WorkflowKind::SixTeam,
            WorkflowKind::SevenTeam,
            WorkflowKind::Geospatial,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Standard => "standard",
            WorkflowKind::TwoTeamDataStrategy => "two-team-data-strategy",
            WorkflowKind::ThreeTeam => "three-team",
            WorkflowKind::FourTeam => "four-team",
            WorkflowKind::FiveTeam => "five-team",
            WorkflowKind::SixTeam => "six-team",
            WorkflowKind::SevenTeam => "seven-team",
            WorkflowKind::Geospatial => "geospatial",
        }
    }

    /// Heading used in the composite report
    pub fn display_name(&self) -> &'static str {
        match self {
            WorkflowKind::Standard => "Standard Research",
            WorkflowKind::TwoTeamDataStrategy => "Data Strategy",
            WorkflowKind::ThreeTeam => "Three-Team Governance",
            WorkflowKind::FourTeam => "Four-Team Information Management",
            WorkflowKind::FiveTeam => "Five-Team Tender",
            WorkflowKind::SixTeam => "Six-Team Delivery",
            WorkflowKind::SevenTeam => "Seven-Team Full Lifecycle",
            WorkflowKind::Geospatial => "Geospatial Metadata",
        }
    }

    pub fn pipeline(&self) -> Vec<TeamKind> {
        match self {
            WorkflowKind::Standard => vec![TeamKind::Research, TeamKind::Analysis, TeamKind::Writing],
            WorkflowKind::TwoTeamDataStrategy => CUMULATIVE[..2].to_vec(),
            WorkflowKind::ThreeTeam => CUMULATIVE[..3].to_vec(),
            WorkflowKind::FourTeam => CUMULATIVE[..4].to_vec(),
            WorkflowKind::FiveTeam => CUMULATIVE[..5].to_vec(),
            WorkflowKind::SixTeam => CUMULATIVE[..6].to_vec(),
            WorkflowKind::SevenTeam => CUMULATIVE.to_vec(),
            WorkflowKind::Geospatial => vec![TeamKind::ResearchAnalysis, TeamKind::GeospatialMetadata],
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = TeamflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        WorkflowKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = WorkflowKind::all().iter().map(|k| k.as_str()).collect();
                TeamflowError::InputInvalid(format!(
                    "unknown workflow kind '{}' (expected one of: {})",
                    s.trim(),
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for kind in WorkflowKind::all() {
            assert_eq!(kind.as_str().parse::<WorkflowKind>().unwrap(), *kind);
        }
        assert_eq!("SEVEN_TEAM".parse::<WorkflowKind>().unwrap(), WorkflowKind::SevenTeam);
        assert!(matches!(
            "eight-team".parse::<WorkflowKind>(),
            Err(TeamflowError::InputInvalid(_))
        ));
    }

    #[test]
    fn test_pipelines() {
        let names = |k: WorkflowKind| k.pipeline().iter().map(|t| t.name()).collect::<Vec<_>>();
        assert_eq!(names(WorkflowKind::Standard), vec!["Research", "Analysis", "Writing"]);
        assert_eq!(
            names(WorkflowKind::TwoTeamDataStrategy),
            vec!["Research & Analysis", "Data Strategy"]
        );
        assert_eq!(WorkflowKind::SevenTeam.pipeline().len(), 7);
        assert_eq!(WorkflowKind::SevenTeam.pipeline()[4], TeamKind::TenderResponse);
        assert_eq!(
            names(WorkflowKind::Geospatial),
            vec!["Research & Analysis", "Geospatial Metadata"]
        );
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&WorkflowKind::TwoTeamDataStrategy).unwrap();
        assert_eq!(json, "\"two-team-data-strategy\"");
    }
}
