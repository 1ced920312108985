//! Prompt fragments shared by the team catalog.
//!
//! Task templates carry `{placeholders}` that the runtime resolves against
//! [`TeamInputs`](super::TeamInputs) when the task is submitted.

use super::definition::AgentSpec;

pub const QUERY: &str = "{query}";
pub const UPSTREAM_OUTPUT: &str = "{upstream_output}";
pub const CONVERSATION_HISTORY: &str = "{conversation_history}";
pub const DOCUMENT_CONTEXT: &str = "{document_context}";
pub const SEARCH_CONTEXT: &str = "{search_context}";

/// Inputs block for the first task of a team
pub const CONTEXT_BLOCK: &str = "\
USER REQUEST:
{query}

OUTPUT FROM PREVIOUS TEAMS:
{upstream_output}

RECENT CONVERSATION:
{conversation_history}

REFERENCE DOCUMENT:
{document_context}

RESEARCH CONTEXT (memory and web, gathered before this task):
{search_context}";

/// Formatting rules appended to every system prompt
pub const REPORT_RULES: &str = "\
Write in clear, professional British English using Markdown headings, \
bullet lists and tables where they help. Cite sources from the research \
context by URL when you rely on them. If information is missing, say so \
explicitly and state your assumptions instead of inventing facts.";

/// First task of a team: instructions followed by every input
pub fn first_task(instructions: &str) -> String {
    format!("{}\n\n{}", instructions.trim(), CONTEXT_BLOCK)
}

/// Later task: instructions plus the original request; upstream task
/// outputs are appended by the runtime
pub fn follow_up(instructions: &str) -> String {
    format!("{}\n\nUSER REQUEST:\n{}", instructions.trim(), QUERY)
}

/// System message for an agent
pub fn system_prompt(agent: &AgentSpec) -> String {
    let mut prompt = format!(
        "You are the {}.\n\nGOAL: {}\n\nBACKGROUND: {}",
        agent.role.trim(),
        agent.goal.trim(),
        agent.backstory.trim()
    );

    if agent.allow_delegation {
        prompt.push_str(
            "\n\nYou lead this team: you may restate sub-questions for your colleagues \
             in your answer, but you must still deliver the complete output yourself.",
        );
    }

    if !agent.tool_handles.is_empty() {
        let tools: Vec<&str> = agent.tool_handles.iter().map(|t| t.as_str()).collect();
        prompt.push_str(&format!(
            "\n\nTOOLS: results from {} are provided in the task input when available. \
             You cannot call tools yourself.",
            tools.join(", ")
        ));
    }

    prompt.push_str("\n\n");
    prompt.push_str(REPORT_RULES);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teams::definition::ToolHandle;

    #[test]
    fn test_first_task_carries_every_placeholder() {
        let text = first_task("Do the thing.");
        for placeholder in [
            QUERY,
            UPSTREAM_OUTPUT,
            CONVERSATION_HISTORY,
            DOCUMENT_CONTEXT,
            SEARCH_CONTEXT,
        ] {
            assert!(text.contains(placeholder), "missing {}", placeholder);
        }
    }

    #[test]
    fn test_system_prompt_mentions_tools_and_delegation() {
        let agent = AgentSpec::new("r", "Research Specialist", "Find facts", "Librarian")
            .with_tools([ToolHandle::WebSearch])
            .with_delegation(true);
        let prompt = system_prompt(&agent);
        assert!(prompt.starts_with("You are the Research Specialist."));
        assert!(prompt.contains("web_search"));
        assert!(prompt.contains("You lead this team"));
    }
}
