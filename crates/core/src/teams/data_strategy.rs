//! Data Strategy team: governance framework, DCAM capability templates and a
//! phased (tranche) implementation plan.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs, ToolHandle};
use super::prompts::{first_task, follow_up};

pub fn data_strategy_team(_inputs: &TeamInputs) -> Team {
    let governance = AgentSpec::new(
        "governance",
        "Data Governance Specialist",
        "Design a data governance framework fitted to the organisation in the request",
        "A chief-data-office veteran who has stood up governance councils, data \
         ownership models and policy catalogues in regulated organisations.",
    )
    .with_tools([ToolHandle::WebSearch, ToolHandle::MemoryRecall])
    .with_delegation(true);

    let dcam = AgentSpec::new(
        "dcam",
        "DCAM Templates Specialist",
        "Translate the governance framework into EDM Council DCAM capability templates",
        "A DCAM-certified assessor who maps every capability to concrete evidence, \
         owners and maturity scores.",
    );

    let tranche = AgentSpec::new(
        "tranche",
        "Tranche Guidance Specialist",
        "Sequence the work into deliverable tranches with clear entry and exit criteria",
        "A programme manager who plans data transformations in funded, \
         measurable increments.",
    );

    Team::new(
        "Data Strategy",
        vec![governance, dcam, tranche],
        vec![
            TaskSpec::new(
                "governance_framework",
                "governance",
                first_task(
                    "Design the data governance framework: principles, operating model, \
                     roles (owners, stewards, custodians), decision rights, policies and \
                     standards, and the forums that enforce them. Build on any upstream \
                     research rather than repeating it.",
                ),
                "A governance framework document: principles, operating model, RACI \
                 table of roles, policy catalogue and governance forums.",
            ),
            TaskSpec::new(
                "dcam_templates",
                "dcam",
                follow_up(
                    "Produce DCAM capability templates for the framework. For each DCAM \
                     component give the capability, the current-state questions, the \
                     evidence required, the accountable role and a target maturity level.",
                ),
                "A set of capability templates as Markdown tables, one per DCAM \
                 component, with evidence, owner and target maturity columns.",
            )
            .after(&["governance_framework"]),
            TaskSpec::new(
                "tranche_plan",
                "tranche",
                follow_up(
                    "Turn the framework and templates into a phased plan of tranches. \
                     Give each tranche objectives, scope, dependencies, effort, entry and \
                     exit criteria and the measures that prove it is done.",
                ),
                "A phased implementation plan: a tranche summary table followed by one \
                 section per tranche with objectives, deliverables, dependencies and \
                 success measures.",
            )
            .after(&["governance_framework", "dcam_templates"])
            .with_timeout(240),
        ],
    )
}
