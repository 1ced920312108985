//! Research teams: the three single-stage teams of the standard pipeline
//! and the combined Research & Analysis team.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs, ToolHandle};
use super::prompts::{first_task, follow_up};

fn research_specialist() -> AgentSpec {
    AgentSpec::new(
        "researcher",
        "Research Specialist",
        "Gather accurate, current and well-sourced information on the user's request",
        "A senior research librarian turned analyst who triangulates every claim \
         across several sources and flags anything that cannot be verified.",
    )
    .with_tools([ToolHandle::WebSearch, ToolHandle::MemoryRecall])
}

fn data_analyst() -> AgentSpec {
    AgentSpec::new(
        "analyst",
        "Data Analyst",
        "Turn raw findings into structured insight, patterns and quantified conclusions",
        "A pragmatic analyst who separates evidence from opinion and always states \
         the confidence behind a conclusion.",
    )
}

fn content_writer() -> AgentSpec {
    AgentSpec::new(
        "writer",
        "Content Writer",
        "Produce a polished executive report that a decision maker can act on",
        "An experienced report writer for public-sector and enterprise audiences \
         who favours short sections, plain language and explicit recommendations.",
    )
}

const RESEARCH_INSTRUCTIONS: &str = "\
Research the user's request thoroughly. Use the research context and any \
reference document as primary material. Collect definitions, key facts, \
current developments, notable examples, statistics and open questions.";

const RESEARCH_OUTPUT: &str = "\
Raw research findings in Markdown: a bullet list of key facts with sources, \
notable examples, relevant figures and a short list of unresolved questions.";

const ANALYSIS_INSTRUCTIONS: &str = "\
Analyse the research findings. Identify the main themes, trends, trade-offs, \
risks and opportunities. Quantify where the evidence allows and note gaps.";

const ANALYSIS_OUTPUT: &str = "\
An analytical summary: key themes, comparison of options or positions, risks \
and opportunities, each with a confidence level.";

const WRITING_INSTRUCTIONS: &str = "\
Write the final report for the user from the research and analysis. Lead \
with an executive summary, then the detailed sections, then recommendations \
and next steps.";

const WRITING_OUTPUT: &str = "\
An executive report in Markdown with: Executive Summary, Background, Key \
Findings, Analysis, Recommendations and Next Steps.";

/// Standard pipeline stage 1
pub fn research_team(_inputs: &TeamInputs) -> Team {
    Team::new(
        "Research",
        vec![research_specialist()],
        vec![TaskSpec::new(
            "research",
            "researcher",
            first_task(RESEARCH_INSTRUCTIONS),
            RESEARCH_OUTPUT,
        )
        .with_output_file("research.md")],
    )
}

/// Standard pipeline stage 2
pub fn analysis_team(_inputs: &TeamInputs) -> Team {
    Team::new(
        "Analysis",
        vec![data_analyst()],
        vec![TaskSpec::new(
            "analysis",
            "analyst",
            first_task(ANALYSIS_INSTRUCTIONS),
            ANALYSIS_OUTPUT,
        )
        .with_output_file("analysis.md")],
    )
}

/// Standard pipeline stage 3
pub fn writing_team(_inputs: &TeamInputs) -> Team {
    Team::new(
        "Writing",
        vec![content_writer()],
        vec![TaskSpec::new(
            "report",
            "writer",
            first_task(WRITING_INSTRUCTIONS),
            WRITING_OUTPUT,
        )
        .with_timeout(240)
        .with_output_file("report.md")],
    )
}

/// Research Specialist → Data Analyst → Content Writer
pub fn research_analysis_team(_inputs: &TeamInputs) -> Team {
    Team::new(
        "Research & Analysis",
        vec![
            research_specialist().with_delegation(true),
            data_analyst(),
            content_writer(),
        ],
        vec![
            TaskSpec::new(
                "research",
                "researcher",
                first_task(RESEARCH_INSTRUCTIONS),
                RESEARCH_OUTPUT,
            ),
            TaskSpec::new(
                "analysis",
                "analyst",
                follow_up(ANALYSIS_INSTRUCTIONS),
                ANALYSIS_OUTPUT,
            )
            .after(&["research"]),
            TaskSpec::new(
                "report",
                "writer",
                follow_up(WRITING_INSTRUCTIONS),
                WRITING_OUTPUT,
            )
            .after(&["research", "analysis"])
            .with_timeout(240)
            .with_output_file("research_report.md"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_teams_are_single_role() {
        let inputs = TeamInputs::new("q");
        for (team, role, slug) in [
            (research_team(&inputs), "Research Specialist", "research"),
            (analysis_team(&inputs), "Data Analyst", "analysis"),
            (writing_team(&inputs), "Content Writer", "writing"),
        ] {
            team.validate().unwrap();
            assert_eq!(team.roles(), vec![role]);
            assert_eq!(team.slug, slug);
        }
    }

    #[test]
    fn test_research_analysis_roles() {
        let team = research_analysis_team(&TeamInputs::new("q"));
        team.validate().unwrap();
        assert_eq!(
            team.roles(),
            vec!["Research Specialist", "Data Analyst", "Content Writer"]
        );
        assert_eq!(team.adjacency().unwrap()[2], vec![0, 1]);
    }
}
