//! # Team Specs
//!
//! Immutable templates handed to the Agent Runtime. A [`Team`] owns its
//! agents and tasks; tasks name their upstream tasks explicitly and must
//! only reference tasks declared earlier, so declaration order is a valid
//! topological order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{TeamflowError, TeamflowResult};
use crate::gateway::ChatMessage;

/// Default per-task timeout
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 180;
/// Default team budget, replaced by `max_execution_time_secs` at run time
pub const DEFAULT_TEAM_BUDGET_SECS: u64 = 900;
/// Default team rate limit, replaced by `max_rpm` at run time
pub const DEFAULT_TEAM_RPM: u32 = 20;

/// Capabilities an agent may ask the runtime to bind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolHandle {
    WebSearch,
    MemoryRecall,
    MetadataBuild,
    MetadataValidate,
}

impl ToolHandle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolHandle::WebSearch => "web_search",
            ToolHandle::MemoryRecall => "memory_recall",
            ToolHandle::MetadataBuild => "metadata_build",
            ToolHandle::MetadataValidate => "metadata_validate",
        }
    }
}

/// Agent template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSpec {
    /// Key used by tasks to name their owner
    pub handle: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub tool_handles: BTreeSet<ToolHandle>,
    pub max_iterations: u32,
    pub allow_delegation: bool,
    /// Include the conversation tail as chat turns
    pub memory_enabled: bool,
}

impl AgentSpec {
    pub fn new(
        handle: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tool_handles: BTreeSet::new(),
            max_iterations: 3,
            allow_delegation: false,
            memory_enabled: true,
        }
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolHandle>) -> Self {
        self.tool_handles.extend(tools);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn has_tool(&self, tool: ToolHandle) -> bool {
        self.tool_handles.contains(&tool)
    }
}

/// Task template. `description_template` may use `{query}`,
/// `{upstream_output}`, `{conversation_history}`, `{document_context}` and
/// `{search_context}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub handle: String,
    pub description_template: String,
    /// Contract for the task's output
    pub expected_output: String,
    /// Owning agent's handle
    pub agent: String,
    /// Earlier tasks whose output this task receives, in order
    pub upstream: Vec<String>,
    pub timeout_secs: u64,
    pub output_file_hint: Option<String>,
}

impl TaskSpec {
    pub fn new(
        handle: impl Into<String>,
        agent: impl Into<String>,
        description_template: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            description_template: description_template.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            upstream: Vec::new(),
            timeout_secs: DEFAULT_TASK_TIMEOUT_SECS,
            output_file_hint: None,
        }
    }

    pub fn after(mut self, upstream: &[&str]) -> Self {
        self.upstream = upstream.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_output_file(mut self, hint: impl Into<String>) -> Self {
        self.output_file_hint = Some(hint.into());
        self
    }
}

/// A named, ordered set of agents and tasks executed as a unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub name: String,
    /// File-name stem used by the Output Archive
    pub slug: String,
    pub agents: Vec<AgentSpec>,
    pub tasks: Vec<TaskSpec>,
    pub overall_budget_secs: u64,
    /// 0 disables rate limiting
    pub rate_limit_rpm: u32,
}

impl Team {
    pub fn new(name: impl Into<String>, agents: Vec<AgentSpec>, tasks: Vec<TaskSpec>) -> Self {
        let name = name.into();
        Self {
            slug: slugify(&name),
            name,
            agents,
            tasks,
            overall_budget_secs: DEFAULT_TEAM_BUDGET_SECS,
            rate_limit_rpm: DEFAULT_TEAM_RPM,
        }
    }

    pub fn with_limits(mut self, budget_secs: u64, rate_limit_rpm: u32) -> Self {
        self.overall_budget_secs = budget_secs;
        self.rate_limit_rpm = rate_limit_rpm;
        self
    }

    pub fn agent(&self, handle: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.handle == handle)
    }

    /// Role names in agent order
    pub fn roles(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.role.as_str()).collect()
    }

    /// `adjacency[i]` lists the indices of the tasks task `i` depends on
    pub fn adjacency(&self) -> TeamflowResult<Vec<Vec<usize>>> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut adjacency = Vec::with_capacity(self.tasks.len());

        for (i, task) in self.tasks.iter().enumerate() {
            let mut deps = Vec::with_capacity(task.upstream.len());
            for upstream in &task.upstream {
                match index.get(upstream.as_str()) {
                    Some(&j) => deps.push(j),
                    None => {
                        return Err(TeamflowError::InternalInvariant(format!(
                            "team '{}': task '{}' references undeclared or later upstream '{}'",
                            self.name, task.handle, upstream
                        )))
                    }
                }
            }
            adjacency.push(deps);
            if index.insert(task.handle.as_str(), i).is_some() {
                return Err(TeamflowError::InternalInvariant(format!(
                    "team '{}': duplicate task handle '{}'",
                    self.name, task.handle
                )));
            }
        }

        Ok(adjacency)
    }

    /// Check structural invariants before execution
    pub fn validate(&self) -> TeamflowResult<()> {
        let invariant = |msg: String| Err(TeamflowError::InternalInvariant(msg));

        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return invariant("team without a name".to_string());
        }
        if self.agents.is_empty() || self.tasks.is_empty() {
            return invariant(format!("team '{}' has no agents or no tasks", self.name));
        }

        let mut handles = HashSet::new();
        for agent in &self.agents {
            if !handles.insert(agent.handle.as_str()) {
                return invariant(format!(
                    "team '{}': duplicate agent handle '{}'",
                    self.name, agent.handle
                ));
            }
            if agent.max_iterations == 0 {
                return invariant(format!(
                    "team '{}': agent '{}' allows zero iterations",
                    self.name, agent.role
                ));
            }
        }

        for task in &self.tasks {
            if !handles.contains(task.agent.as_str()) {
                return invariant(format!(
                    "team '{}': task '{}' owned by unknown agent '{}'",
                    self.name, task.handle, task.agent
                ));
            }
            if task.timeout_secs == 0 {
                return invariant(format!(
                    "team '{}': task '{}' has a zero timeout",
                    self.name, task.handle
                ));
            }
        }

        self.adjacency().map(|_| ())
    }
}

/// Values a team is materialized with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamInputs {
    pub query: String,
    /// Labeled outputs of every earlier team, or the no-output marker
    pub upstream_output: String,
    /// Most recent conversation turns only
    pub conversation_history: Vec<ChatMessage>,
    /// Possibly truncated, with a visible marker when it was
    pub document_context: String,
    /// Pre-search blob; empty in native-tools mode
    pub search_context: String,
}

impl TeamInputs {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Conversation tail rendered as `ROLE: content` lines
    pub fn history_text(&self) -> String {
        self.conversation_history
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_document(&self) -> bool {
        !self.document_context.trim().is_empty()
    }
}

/// `"Research & Analysis"` → `"research_analysis"`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_team() -> Team {
        Team::new(
            "Research & Analysis",
            vec![
                AgentSpec::new("researcher", "Research Specialist", "g", "b"),
                AgentSpec::new("analyst", "Data Analyst", "g", "b"),
            ],
            vec![
                TaskSpec::new("research", "researcher", "Research {query}", "findings"),
                TaskSpec::new("analysis", "analyst", "Analyse", "summary").after(&["research"]),
            ],
        )
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Research & Analysis"), "research_analysis");
        assert_eq!(slugify("  Tender Response!"), "tender_response");
        assert_eq!(slugify("Writing"), "writing");
    }

    #[test]
    fn test_valid_team_adjacency() {
        let team = sample_team();
        team.validate().unwrap();
        assert_eq!(team.adjacency().unwrap(), vec![vec![], vec![0]]);
        assert_eq!(team.slug, "research_analysis");
    }

    #[test]
    fn test_forward_reference_is_invariant_violation() {
        let mut team = sample_team();
        team.tasks[0].upstream = vec!["analysis".to_string()];
        let err = team.validate().unwrap_err();
        assert!(matches!(err, TeamflowError::InternalInvariant(_)));
    }

    #[test]
    fn test_unknown_agent_and_zero_iterations_rejected() {
        let mut team = sample_team();
        team.tasks[1].agent = "ghost".to_string();
        assert!(team.validate().is_err());

        let mut team = sample_team();
        team.agents[0].max_iterations = 0;
        assert!(team.validate().is_err());
    }

    #[test]
    fn test_history_text() {
        let inputs = TeamInputs {
            conversation_history: vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            ..TeamInputs::new("q")
        };
        assert_eq!(inputs.history_text(), "USER: hi\nASSISTANT: hello");
    }
}
