//! # Team Definitions
//!
//! Pure factories producing fresh [`Team`] specs from [`TeamInputs`].
//!
//! ## Catalog
//!
//! ```text
//! Research                   Research Specialist
//! Analysis                   Data Analyst
//! Writing                    Content Writer
//! Research & Analysis        Research Specialist → Data Analyst → Content Writer
//! Data Strategy              Governance → DCAM Templates → Tranche Guidance
//! Compliance & Risk          Compliance → Risk → Audit
//! Information Management     Info Governance → Metadata → Data Quality
//! Tender Response            Tender Analyst → Proposal Writer → Compliance Checker
//! Project Delivery           Data Engineer → Data Scientist → Data Architect → DevOps → PM
//! Technical Documentation    Data Modeler → Python → SQL → PySpark → Tech Writer
//! Geospatial Metadata        Geospatial Metadata Specialist
//! ```

pub mod compliance;
pub mod data_strategy;
pub mod definition;
pub mod delivery;
pub mod documentation;
pub mod geospatial;
pub mod information;
pub mod prompts;
pub mod research;
pub mod tender;

pub use definition::{slugify, AgentSpec, TaskSpec, Team, TeamInputs, ToolHandle};

use serde::{Deserialize, Serialize};

/// Team factory signature
pub type TeamFactory = fn(&TeamInputs) -> Team;

/// Every team in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TeamKind {
    Research,
    Analysis,
    Writing,
    ResearchAnalysis,
    DataStrategy,
    ComplianceRisk,
    InformationManagement,
    TenderResponse,
    ProjectDelivery,
    TechnicalDocumentation,
    GeospatialMetadata,
}

impl TeamKind {
    pub fn all() -> &'static [TeamKind] {
        &[
            TeamKind::Research,
            TeamKind::Analysis,
            TeamKind::Writing,
            TeamKind::ResearchAnalysis,
            TeamKind::DataStrategy,
            TeamKind::ComplianceRisk,
            TeamKind::InformationManagement,
            TeamKind::TenderResponse,
            TeamKind::ProjectDelivery,
            TeamKind::TechnicalDocumentation,
            TeamKind::GeospatialMetadata,
        ]
    }

    /// Display name, identical to the built team's `name`
    pub fn name(&self) -> &'static str {
        match self {
            TeamKind::Research => "Research",
            TeamKind::Analysis => "Analysis",
            TeamKind::Writing => "Writing",
            TeamKind::ResearchAnalysis => "Research & Analysis",
            TeamKind::DataStrategy => "Data Strategy",
            TeamKind::ComplianceRisk => "Compliance & Risk",
            TeamKind::InformationManagement => "Information Management",
            TeamKind::TenderResponse => "Tender Response",
            TeamKind::ProjectDelivery => "Project Delivery",
            TeamKind::TechnicalDocumentation => "Technical Documentation",
            TeamKind::GeospatialMetadata => "Geospatial Metadata",
        }
    }

    pub fn factory(&self) -> TeamFactory {
        match self {
            TeamKind::Research => research::research_team,
            TeamKind::Analysis => research::analysis_team,
            TeamKind::Writing => research::writing_team,
            TeamKind::ResearchAnalysis => research::research_analysis_team,
            TeamKind::DataStrategy => data_strategy::data_strategy_team,
            TeamKind::ComplianceRisk => compliance::compliance_risk_team,
            TeamKind::InformationManagement => information::information_management_team,
            TeamKind::TenderResponse => tender::tender_response_team,
            TeamKind::ProjectDelivery => delivery::project_delivery_team,
            TeamKind::TechnicalDocumentation => documentation::technical_documentation_team,
            TeamKind::GeospatialMetadata => geospatial::geospatial_metadata_team,
        }
    }

    pub fn build(&self, inputs: &TeamInputs) -> Team {
        (self.factory())(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_team_is_well_formed() {
        let inputs = TeamInputs::new("q");
        for kind in TeamKind::all() {
            let team = kind.build(&inputs);
            team.validate().unwrap_or_else(|e| panic!("{}: {}", kind.name(), e));
            assert_eq!(team.name, kind.name());
        }
    }

    #[test]
    fn test_factories_return_fresh_specs() {
        let inputs = TeamInputs::new("q");
        let mut a = TeamKind::ComplianceRisk.build(&inputs);
        let b = TeamKind::ComplianceRisk.build(&inputs);
        a.agents[0].goal.push_str(" (edited)");
        assert_ne!(a, b);
    }
}
