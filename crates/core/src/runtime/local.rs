//! In-process [`AgentRuntime`] over the [`LlmGateway`].
//!
//! Per task: render the template, append upstream task outputs and any
//! tool results, call the gateway under the task timeout, then apply
//! output tools. The team budget caps the sum of all tasks, including time
//! spent waiting for a rate-limit slot.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use super::rate_limit::RateLimiter;
use super::tools::ToolBindings;
use super::{AgentRuntime, TaskOutput, TeamOutcome};
use crate::config::ExecutionMode;
use crate::error::{TeamflowError, TeamflowResult};
use crate::gateway::{ChatMessage, GenerateOptions, LlmGateway};
use crate::teams::prompts::system_prompt;
use crate::teams::{Team, TeamInputs};

/// Substituted for an empty input
const EMPTY_INPUT: &str = "(none)";

fn placeholder<'a>(name: &str, inputs: &'a TeamInputs, history: &'a str) -> Option<&'a str> {
    let raw = match name {
        "query" => inputs.query.as_str(),
        "upstream_output" => inputs.upstream_output.as_str(),
        "conversation_history" => history,
        "document_context" => inputs.document_context.as_str(),
        "search_context" => inputs.search_context.as_str(),
        _ => return None,
    };
    Some(if raw.trim().is_empty() { EMPTY_INPUT } else { raw.trim() })
}

/// Resolve `{placeholders}` in one pass, so values containing braces are
/// never re-expanded. Unknown placeholders are left as written.
pub fn render_template(template: &str, inputs: &TeamInputs) -> String {
    let history = inputs.history_text();
    let mut out = String::with_capacity(template.len() + inputs.query.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after
            .find('}')
            .and_then(|close| placeholder(&after[..close], inputs, &history).map(|v| (close, v)))
        {
            Some((close, v)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn budget_exceeded(team: &Team, when: &str, task: &str) -> TeamflowError {
    TeamflowError::timeout(format!(
        "team '{}' exceeded its {}s budget {} task '{}'",
        team.name, team.overall_budget_secs, when, task
    ))
}

#[derive(Debug, Clone)]
pub struct LocalAgentRuntime {
    gateway: LlmGateway,
    options: GenerateOptions,
    tools: ToolBindings,
}

impl LocalAgentRuntime {
    pub fn new(gateway: LlmGateway, options: GenerateOptions) -> Self {
        Self {
            gateway,
            options,
            tools: ToolBindings::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolBindings) -> Self {
        self.tools = tools;
        self
    }

    async fn task_prompt(
        &self,
        team: &Team,
        index: usize,
        upstream: &[usize],
        done: &[TaskOutput],
        inputs: &TeamInputs,
        mode: ExecutionMode,
    ) -> String {
        let task = &team.tasks[index];
        let mut prompt = render_template(&task.description_template, inputs);

        for &j in upstream {
            let prior = &done[j];
            prompt.push_str(&format!(
                "\n\nOUTPUT OF TASK '{}' ({}):\n{}",
                prior.handle, prior.role, prior.output
            ));
        }

        if mode == ExecutionMode::NativeTools {
            if let Some(agent) = team.agent(&task.agent) {
                let tool_block = self.tools.gather(agent, &inputs.query).await;
                if !tool_block.is_empty() {
                    prompt.push_str("\n\n");
                    prompt.push_str(&tool_block);
                }
            }
        }

        prompt.push_str("\n\nEXPECTED OUTPUT:\n");
        prompt.push_str(task.expected_output.trim());
        prompt
    }
}

#[async_trait]
impl AgentRuntime for LocalAgentRuntime {
    #[tracing::instrument(skip_all, fields(team = %team.name))]
    async fn run_team(
        &self,
        team: &Team,
        inputs: &TeamInputs,
        mode: ExecutionMode,
    ) -> TeamflowResult<TeamOutcome> {
        team.validate()?;
        let adjacency = team.adjacency()?;
        let limiter = RateLimiter::per_minute(team.rate_limit_rpm);
        let budget = Duration::from_secs(team.overall_budget_secs);
        let team_started = Instant::now();
        let mut done: Vec<TaskOutput> = Vec::with_capacity(team.tasks.len());

        for (index, task) in team.tasks.iter().enumerate() {
            let agent = team.agent(&task.agent).ok_or_else(|| {
                TeamflowError::InternalInvariant(format!(
                    "team '{}': task '{}' has no agent '{}'",
                    team.name, task.handle, task.agent
                ))
            })?;

            let remaining = budget.saturating_sub(team_started.elapsed());
            if remaining.is_zero() {
                return Err(budget_exceeded(team, "before", &task.handle));
            }

            let prompt = self
                .task_prompt(team, index, &adjacency[index], &done, inputs, mode)
                .await;
            let mut messages = if agent.memory_enabled {
                inputs.conversation_history.clone()
            } else {
                Vec::new()
            };
            messages.push(ChatMessage::user(prompt));
            let system = system_prompt(agent);

            if tokio::time::timeout(remaining, limiter.acquire()).await.is_err() {
                return Err(budget_exceeded(team, "waiting for a rate-limit slot before", &task.handle));
            }
            let remaining = budget.saturating_sub(team_started.elapsed());
            if remaining.is_zero() {
                return Err(budget_exceeded(team, "before", &task.handle));
            }

            let task_limit = Duration::from_secs(task.timeout_secs);
            let limit = task_limit.min(remaining);
            let started = Instant::now();
            tracing::info!(task = %task.handle, role = %agent.role, "Task started");

            let output = match tokio::time::timeout(
                limit,
                self.gateway.generate(&system, messages, &self.options),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) if limit < task_limit => return Err(budget_exceeded(team, "during", &task.handle)),
                Err(_) => {
                    return Err(TeamflowError::timeout(format!(
                        "task '{}' of team '{}' after {}s",
                        task.handle, team.name, task.timeout_secs
                    )))
                }
            };

            let output = self.tools.post_process(agent, output);
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!(task = %task.handle, elapsed_ms, chars = output.len(), "Task completed");

            done.push(TaskOutput {
                handle: task.handle.clone(),
                role: agent.role.clone(),
                output,
                elapsed_ms,
            });
        }

        let output = done
            .last()
            .map(|t| t.output.clone())
            .ok_or_else(|| TeamflowError::InternalInvariant(format!("team '{}' has no tasks", team.name)))?;

        Ok(TeamOutcome {
            output,
            task_outputs: done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GenerationRequest, LlmBackend, RetryPolicy};
    use crate::teams::{AgentSpec, TaskSpec};
    use std::sync::{Arc, Mutex};

    /// Replies `reply-N` and records every request
    struct EchoBackend {
        seen: Mutex<Vec<GenerationRequest>>,
        delay: Duration,
    }

    impl EchoBackend {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                delay,
            })
        }
    }

    #[async_trait]
    impl LlmBackend for EchoBackend {
        fn describe(&self) -> String {
            "echo".to_string()
        }

        async fn complete(&self, request: &GenerationRequest) -> TeamflowResult<String> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut seen = self.seen.lock().unwrap();
            seen.push(request.clone());
            Ok(format!("reply-{}", seen.len()))
        }
    }

    fn runtime(backend: Arc<EchoBackend>) -> LocalAgentRuntime {
        let options = GenerateOptions {
            timeout: Duration::from_secs(5),
            ..GenerateOptions::default()
        };
        LocalAgentRuntime::new(LlmGateway::new(backend, RetryPolicy::none()), options)
    }

    fn two_task_team() -> Team {
        Team::new(
            "Pair",
            vec![
                AgentSpec::new("a", "Author", "write", "writer"),
                AgentSpec::new("r", "Reviewer", "review", "reviewer"),
            ],
            vec![
                TaskSpec::new("draft", "a", "Draft about {query}. Upstream: {upstream_output}", "A draft"),
                TaskSpec::new("review", "r", "Review the draft for {query}", "A review").after(&["draft"]),
            ],
        )
        .with_limits(60, 0)
    }

    #[test]
    fn test_render_template() {
        let inputs = TeamInputs {
            upstream_output: "   ".into(),
            ..TeamInputs::new("digital {twins}")
        };
        let text = render_template("Q={query} U={upstream_output} X={unknown} {", &inputs);
        assert_eq!(text, "Q=digital {twins} U=(none) X={unknown} {");
    }

    #[tokio::test]
    async fn test_tasks_run_in_order_with_upstream_outputs() {
        let backend = EchoBackend::new(Duration::ZERO);
        let inputs = TeamInputs {
            conversation_history: vec![ChatMessage::user("earlier"), ChatMessage::assistant("answer")],
            ..TeamInputs::new("bridges")
        };

        let outcome = runtime(backend.clone())
            .run_team(&two_task_team(), &inputs, ExecutionMode::PreSearch)
            .await
            .unwrap();

        assert_eq!(outcome.output, "reply-2");
        assert_eq!(outcome.task_outputs.len(), 2);

        let seen = backend.seen.lock().unwrap();
        let first = &seen[0].messages.last().unwrap().content;
        assert!(first.starts_with("Draft about bridges. Upstream: (none)"));
        assert!(first.contains("EXPECTED OUTPUT:\nA draft"));
        assert!(seen[0].system.starts_with("You are the Author."));
        assert_eq!(seen[0].messages.len(), 3);

        let second = &seen[1].messages.last().unwrap().content;
        assert!(second.contains("OUTPUT OF TASK 'draft' (Author):\nreply-1"));
    }

    #[tokio::test]
    async fn test_task_timeout() {
        let backend = EchoBackend::new(Duration::from_secs(3));
        let mut team = two_task_team();
        team.tasks[0].timeout_secs = 1;

        let err = runtime(backend)
            .run_team(&team, &TeamInputs::new("q"), ExecutionMode::PreSearch)
            .await
            .unwrap_err();
        assert!(matches!(err, TeamflowError::Timeout { .. }));
        assert!(err.to_string().contains("task 'draft'"));
    }

    #[tokio::test]
    async fn test_team_budget() {
        let backend = EchoBackend::new(Duration::from_millis(1500));
        let team = two_task_team().with_limits(2, 0);

        let err = runtime(backend)
            .run_team(&team, &TeamInputs::new("q"), ExecutionMode::PreSearch)
            .await
            .unwrap_err();
        assert!(matches!(err, TeamflowError::Timeout { .. }));
        assert!(err.to_string().contains("budget"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_wait_counts_against_budget() {
        let backend = EchoBackend::new(Duration::ZERO);
        let team = two_task_team().with_limits(5, 1);
        let started = Instant::now();

        let err = runtime(backend.clone())
            .run_team(&team, &TeamInputs::new("q"), ExecutionMode::PreSearch)
            .await
            .unwrap_err();

        assert!(matches!(err, TeamflowError::Timeout { .. }));
        assert!(err.to_string().contains("rate-limit slot before task 'review'"));
        assert!(started.elapsed() <= Duration::from_secs(6));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_team_is_invariant_violation() {
        let mut team = two_task_team();
        team.tasks[1].upstream = vec!["missing".into()];
        let err = runtime(EchoBackend::new(Duration::ZERO))
            .run_team(&team, &TeamInputs::new("q"), ExecutionMode::PreSearch)
            .await
            .unwrap_err();
        assert!(matches!(err, TeamflowError::InternalInvariant(_)));
    }
}
