//! Project Delivery team: five delivery artefacts, closed by the project
//! manager's plan.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs};
use super::prompts::{first_task, follow_up};

pub fn project_delivery_team(_inputs: &TeamInputs) -> Team {
    let agents = vec![
        AgentSpec::new(
            "data_engineer",
            "Data Engineer",
            "Design the ingestion and transformation pipelines",
            "A data engineer who builds reliable batch and streaming pipelines with \
             testing and observability from day one.",
        ),
        AgentSpec::new(
            "data_scientist",
            "Data Scientist",
            "Define the analytical and modelling work that delivers the outcomes",
            "A data scientist who starts from the decision to be supported and \
             chooses the simplest model that works.",
        ),
        AgentSpec::new(
            "data_architect",
            "Data Architect",
            "Define the target data architecture the pipelines and models live in",
            "An enterprise data architect who balances standards, cost and delivery speed.",
        ),
        AgentSpec::new(
            "devops",
            "DevOps Engineer",
            "Plan environments, CI/CD, infrastructure as code and operations",
            "A platform engineer who automates everything that happens twice.",
        ),
        AgentSpec::new(
            "project_manager",
            "Project Manager",
            "Assemble the delivery plan, milestones, resourcing and RAID log",
            "A delivery lead for data programmes who keeps scope, time and budget honest.",
        )
        .with_delegation(true),
    ];

    let tasks = vec![
        TaskSpec::new(
            "pipeline_design",
            "data_engineer",
            first_task(
                "Design the data pipelines: sources, ingestion pattern, transformation \
                 stages, storage layers, orchestration, testing and monitoring.",
            ),
            "A pipeline design document with a source inventory, stage-by-stage flow \
             and operational controls.",
        ),
        TaskSpec::new(
            "analytics_plan",
            "data_scientist",
            follow_up(
                "Define the analytics and modelling plan on top of the pipeline design: \
                 use cases, features, candidate methods, evaluation metrics and \
                 deployment approach.",
            ),
            "An analytics plan with use cases, method choices, metrics and a \
             model lifecycle.",
        )
        .after(&["pipeline_design"]),
        TaskSpec::new(
            "architecture",
            "data_architect",
            follow_up(
                "Define the target architecture that hosts the pipelines and models: \
                 components, data stores, integration, security and non-functional \
                 requirements.",
            ),
            "A target architecture description with a component table and \
             architecture decisions.",
        )
        .after(&["pipeline_design", "analytics_plan"]),
        TaskSpec::new(
            "devops_plan",
            "devops",
            follow_up(
                "Plan the environments, CI/CD pipelines, infrastructure as code, \
                 monitoring and release process for the architecture.",
            ),
            "A DevOps plan covering environments, pipelines, IaC, monitoring and \
             release management.",
        )
        .after(&["architecture"]),
        TaskSpec::new(
            "delivery_plan",
            "project_manager",
            follow_up(
                "Assemble the delivery plan from all previous artefacts: phases, \
                 milestones, team and skills, estimates, dependencies and a RAID log.",
            ),
            "A project delivery plan: phase and milestone table, resourcing, \
             estimates and a RAID log.",
        )
        .after(&["pipeline_design", "analytics_plan", "architecture", "devops_plan"])
        .with_timeout(240),
    ];

    Team::new("Project Delivery", agents, tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_artefacts() {
        let team = project_delivery_team(&TeamInputs::new("q"));
        team.validate().unwrap();
        assert_eq!(team.tasks.len(), 5);
        assert_eq!(
            team.roles(),
            vec![
                "Data Engineer",
                "Data Scientist",
                "Data Architect",
                "DevOps Engineer",
                "Project Manager"
            ]
        );
        assert_eq!(team.adjacency().unwrap()[4], vec![0, 1, 2, 3]);
    }
}
