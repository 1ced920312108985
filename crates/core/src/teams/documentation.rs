//! Technical Documentation team: data model and code artefacts, integrated
//! by the technical writer.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs};
use super::prompts::{first_task, follow_up};

pub fn technical_documentation_team(_inputs: &TeamInputs) -> Team {
    let agents = vec![
        AgentSpec::new(
            "data_modeler",
            "Data Modeler",
            "Produce the logical and physical data model",
            "A data modeller who normalises where it matters and documents every entity.",
        ),
        AgentSpec::new(
            "python_dev",
            "Python Developer",
            "Write the Python utilities and services the solution needs",
            "A Python engineer who writes typed, tested, documented code.",
        ),
        AgentSpec::new(
            "sql_dev",
            "SQL Developer",
            "Write the DDL, views and key queries for the data model",
            "A database developer fluent in ANSI SQL and Oracle/PostgreSQL dialects.",
        ),
        AgentSpec::new(
            "pyspark_dev",
            "PySpark Developer",
            "Write the distributed transformation jobs",
            "A big-data engineer who writes idiomatic, partition-aware PySpark.",
        ),
        AgentSpec::new(
            "tech_writer",
            "Technical Writer",
            "Integrate all artefacts into one coherent technical document",
            "A technical author who turns engineering output into documentation \
             people actually read.",
        ),
    ];

    let code_rules = "Put all code in fenced blocks with a language tag and explain \
                      each block in two or three sentences.";

    let tasks = vec![
        TaskSpec::new(
            "data_model",
            "data_modeler",
            first_task(
                "Produce the data model for the request: entities, attributes with \
                 types, keys, relationships and constraints.",
            ),
            "A data model: entity table, attribute tables and a relationship list.",
        ),
        TaskSpec::new(
            "python_code",
            "python_dev",
            follow_up(&format!(
                "Write the Python code that loads, validates and serves data for the \
                 model. {}",
                code_rules
            )),
            "Python modules with docstrings and tests for the core functions.",
        )
        .after(&["data_model"]),
        TaskSpec::new(
            "sql_code",
            "sql_dev",
            follow_up(&format!(
                "Write the SQL DDL for the model, plus views and the key analytical \
                 queries. {}",
                code_rules
            )),
            "SQL DDL, views and queries that match the data model exactly.",
        )
        .after(&["data_model"]),
        TaskSpec::new(
            "pyspark_code",
            "pyspark_dev",
            follow_up(&format!(
                "Write the PySpark jobs that transform source data into the model. {}",
                code_rules
            )),
            "PySpark jobs with schema definitions and partitioning notes.",
        )
        .after(&["data_model", "sql_code"]),
        TaskSpec::new(
            "integrated_docs",
            "tech_writer",
            follow_up(
                "Integrate the model and all code into a single technical document: \
                 overview, data model, components, code listings, deployment and \
                 operation.",
            ),
            "Integrated technical documentation in Markdown combining all artefacts.",
        )
        .after(&["data_model", "python_code", "sql_code", "pyspark_code"])
        .with_timeout(240),
    ];

    Team::new("Technical Documentation", agents, tasks)
}
