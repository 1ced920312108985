//! # Workflow Orchestrator
//!
//! Runs a kind's team pipeline for one query:
//!
//! ```text
//! start run ─► pre-search (pre-search mode) ─► team 1 ─► archive ─► team 2 ─► …
//!                                                 │ error
//!                                                 ▼
//!                              failed run + partial composite (no memory append)
//! all teams ok ─► composite archived ─► memory append ─► ok
//! ```
//!
//! Each team sees the labeled outputs of every earlier team. Persistence is
//! best-effort: archive and memory failures are logged and never fail a run.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::context::{history_tail, stored_output, truncate_document, upstream_concat, TRUNCATION_MARKER};
use super::events::{emit, EventSender, WorkflowEvent, WorkflowEventKind};
use super::kind::WorkflowKind;
use super::run::{RunError, RunStatus, TeamOutput, WorkflowRun};
use crate::config::{ExecutionMode, TeamflowConfig};
use crate::error::{TeamflowError, TeamflowResult};
use crate::gateway::{ChatMessage, LlmGateway};
use crate::memory::{open_memory_store, MemoryEntry, MemoryProvider, MemoryStore};
use crate::runtime::{AgentRuntime, LocalAgentRuntime, ToolBindings};
use crate::search::{open_web_search, PreSearchManager, WebSearch};
use crate::state::{OutputArchive, TeamflowDb};
use crate::teams::TeamInputs;

/// Optional inputs of [`WorkflowOrchestrator::run_workflow`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRequest {
    pub conversation_history: Vec<ChatMessage>,
    pub document_context: Option<String>,
    /// Overrides the configured mode for this run
    pub mode: Option<ExecutionMode>,
    /// Outer deadline for the whole run
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub run_id: String,
    pub workflow_kind: WorkflowKind,
    pub status: RunStatus,
    pub composite_output: String,
    pub team_outputs: Vec<TeamOutput>,
    #[serde(default)]
    pub error: Option<RunError>,
}

impl WorkflowResponse {
    fn from_run(run: WorkflowRun) -> Self {
        Self {
            run_id: run.run_id,
            workflow_kind: run.workflow_kind,
            status: run.status,
            composite_output: run.composite_output.unwrap_or_default(),
            team_outputs: run.team_outputs,
            error: run.error,
        }
    }
}

/// Await `fut`, failing with `DeadlineExceeded` once `deadline` passes
async fn within_deadline<T, F>(deadline: Option<tokio::time::Instant>, operation: &str, fut: F) -> TeamflowResult<T>
where
    F: Future<Output = TeamflowResult<T>>,
{
    match deadline {
        None => fut.await,
        Some(at) => match tokio::time::timeout_at(at, fut).await {
            Ok(result) => result,
            Err(_) => Err(TeamflowError::deadline(operation)),
        },
    }
}

pub struct WorkflowOrchestrator {
    config: TeamflowConfig,
    runtime: Arc<dyn AgentRuntime>,
    presearch: PreSearchManager,
    memory: Option<Arc<dyn MemoryStore>>,
    archive: OutputArchive,
    events: Option<EventSender>,
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("mode", &self.config.mode)
            .field("memory", &self.memory.is_some())
            .field("archive", &self.archive.root())
            .finish_non_exhaustive()
    }
}

impl WorkflowOrchestrator {
    /// `memory` is consulted and written only when `config.memory_enabled`
    pub fn new(
        config: TeamflowConfig,
        runtime: Arc<dyn AgentRuntime>,
        web: Arc<dyn WebSearch>,
        memory: Option<Arc<dyn MemoryStore>>,
        archive: OutputArchive,
    ) -> Self {
        let memory = memory.filter(|_| config.memory_enabled);
        let presearch = PreSearchManager::new(memory.clone(), web, config.max_memory_results);
        Self {
            config,
            runtime,
            presearch,
            memory,
            archive,
            events: None,
        }
    }

    /// Wire every collaborator from configuration: memory store, web
    /// search, LLM gateway, local runtime and the archive under `runtime_dir`
    pub fn open(config: TeamflowConfig, runtime_dir: &Path) -> TeamflowResult<Self> {
        let memory = if config.memory_enabled {
            let db = match config.memory_provider {
                MemoryProvider::Sqlite => match TeamflowDb::open(runtime_dir) {
                    Ok(db) => Some(db),
                    Err(e) => {
                        tracing::warn!(error = %e, "Memory database unavailable");
                        None
                    }
                },
                MemoryProvider::InMemory => None,
            };
            Some(open_memory_store(&config, db.as_ref()))
        } else {
            None
        };

        let web = open_web_search(&config)?;
        let gateway = LlmGateway::from_settings(&config.llm, config.retry.clone())?;

        let mut tools = ToolBindings::new().with_web(Arc::clone(&web));
        if let Some(store) = &memory {
            tools = tools.with_memory(Arc::clone(store), config.max_memory_results);
        }
        let runtime = LocalAgentRuntime::new(gateway, config.llm.generate_options()).with_tools(tools);

        Ok(Self::new(
            config,
            Arc::new(runtime),
            web,
            memory,
            OutputArchive::in_runtime(runtime_dir),
        ))
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn config(&self) -> &TeamflowConfig {
        &self.config
    }

    pub fn archive(&self) -> &OutputArchive {
        &self.archive
    }

    pub fn memory(&self) -> Option<&Arc<dyn MemoryStore>> {
        self.memory.as_ref()
    }

    fn emit(&self, event: WorkflowEvent) {
        emit(self.events.as_ref(), event);
    }

    async fn persist_manifest(&self, run: &WorkflowRun) {
        if let Err(e) = self.archive.write_manifest(run).await {
            tracing::warn!(run_id = %run.run_id, error = %e, "Failed to write run manifest");
        }
    }

    async fn persist_team(&self, run: &WorkflowRun, team: &TeamOutput) {
        if let Err(e) = self.archive.write_team(&run.run_id, team).await {
            tracing::warn!(run_id = %run.run_id, team = %team.name, error = %e, "Failed to archive team output");
        }
        self.persist_manifest(run).await;
    }

    async fn persist_composite(&self, run: &WorkflowRun) {
        if let Some(composite) = &run.composite_output {
            if let Err(e) = self.archive.write_composite(&run.run_id, composite).await {
                tracing::warn!(run_id = %run.run_id, error = %e, "Failed to archive composite report");
            }
        }
        self.persist_manifest(run).await;
    }

    /// Run the kind's pipeline. Team failures yield `Ok` with status
    /// `failed`; only caller errors (empty query) and internal invariant
    /// violations return `Err`.
    #[tracing::instrument(
        skip(self, query, request),
        fields(kind = %kind, run_id = tracing::field::Empty, query_preview = %query.chars().take(50).collect::<String>())
    )]
    pub async fn run_workflow(
        &self,
        kind: WorkflowKind,
        query: &str,
        request: WorkflowRequest,
    ) -> TeamflowResult<WorkflowResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TeamflowError::InputInvalid("query must not be empty".to_string()));
        }

        let mode = request.mode.unwrap_or(self.config.mode);
        let deadline = request
            .deadline_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

        let mut run = WorkflowRun::start(kind, query);
        run.metadata.insert("mode".to_string(), mode.as_str().into());
        tracing::Span::current().record("run_id", run.run_id.as_str());
        tracing::info!(run_id = %run.run_id, mode = mode.as_str(), "Workflow started");
        self.emit(
            WorkflowEvent::new(WorkflowEventKind::RunStarted, &run.run_id)
                .with_data(serde_json::json!({ "kind": kind.as_str(), "query": query })),
        );
        self.persist_manifest(&run).await;

        let (document, truncated) = truncate_document(
            request.document_context.as_deref().unwrap_or_default(),
            self.config.document_context_limit,
        );
        if truncated {
            tracing::warn!(limit = self.config.document_context_limit, "Document context truncated");
            run.metadata.insert("document_truncated".to_string(), true.into());
        }
        let history = history_tail(&request.conversation_history, self.config.conversation_tail);

        let search_context = if mode == ExecutionMode::PreSearch {
            let search = within_deadline(deadline, "pre-search", async {
                Ok(self.presearch.search(query).await)
            })
            .await;
            match search {
                Ok(context) => {
                    self.emit(
                        WorkflowEvent::new(WorkflowEventKind::PreSearchCompleted, &run.run_id).with_data(
                            serde_json::json!({
                                "memory_chars": context.memory_results.len(),
                                "web_chars": context.web_results.len(),
                                "search_time_seconds": context.search_time_seconds,
                            }),
                        ),
                    );
                    context.combined_context
                }
                Err(err) => return self.fail(run, err, None, truncated).await,
            }
        } else {
            String::new()
        };

        for team_kind in kind.pipeline() {
            let inputs = TeamInputs {
                query: query.to_string(),
                upstream_output: upstream_concat(&run.team_outputs),
                conversation_history: history.clone(),
                document_context: document.clone(),
                search_context: search_context.clone(),
            };
            let team = team_kind
                .build(&inputs)
                .with_limits(self.config.max_execution_time_secs, self.config.max_rpm);

            let position = run.team_outputs.len() + 1;
            tracing::info!(team = %team.name, position, "Team started");
            self.emit(
                WorkflowEvent::new(WorkflowEventKind::TeamStarted, &run.run_id)
                    .with_team(&team.name)
                    .with_data(serde_json::json!({ "position": position })),
            );

            let started = Instant::now();
            let result = within_deadline(
                deadline,
                &format!("team '{}'", team.name),
                self.runtime.run_team(&team, &inputs, mode),
            )
            .await;

            match result {
                Ok(outcome) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    let recorded = run
                        .record_team(&team.name, &team.slug, stored_output(&outcome.output), elapsed_ms)?
                        .clone();
                    tracing::info!(team = %team.name, elapsed_ms, chars = recorded.output.len(), "Team completed");
                    self.persist_team(&run, &recorded).await;
                    self.emit(
                        WorkflowEvent::new(WorkflowEventKind::TeamCompleted, &run.run_id)
                            .with_team(&team.name)
                            .with_data(serde_json::json!({ "position": position, "elapsed_ms": elapsed_ms })),
                    );
                }
                Err(err) => {
                    tracing::error!(team = %team.name, error = %err, "Team failed");
                    self.emit(
                        WorkflowEvent::new(WorkflowEventKind::TeamFailed, &run.run_id)
                            .with_team(&team.name)
                            .with_data(serde_json::json!({ "code": err.kind().code() })),
                    );
                    return self.fail(run, err, Some(&team.name), truncated).await;
                }
            }
        }

        let composite = render_composite(&run, None, truncated, self.config.document_context_limit);
        run.complete(composite)?;
        self.persist_composite(&run).await;
        self.remember(&run).await;

        tracing::info!(run_id = %run.run_id, teams = run.team_outputs.len(), "Workflow completed");
        self.emit(
            WorkflowEvent::new(WorkflowEventKind::RunCompleted, &run.run_id)
                .with_data(serde_json::json!({ "teams": run.team_outputs.len() })),
        );
        Ok(WorkflowResponse::from_run(run))
    }

    async fn fail(
        &self,
        mut run: WorkflowRun,
        err: TeamflowError,
        team: Option<&str>,
        truncated: bool,
    ) -> TeamflowResult<WorkflowResponse> {
        let error = RunError::from_error(&err, team);
        let composite = render_composite(&run, Some(&error), truncated, self.config.document_context_limit);
        run.fail(error, composite)?;
        self.persist_composite(&run).await;

        tracing::warn!(run_id = %run.run_id, team = ?team, code = err.kind().code(), "Workflow failed");
        self.emit(
            WorkflowEvent::new(WorkflowEventKind::RunFailed, &run.run_id)
                .with_data(serde_json::json!({ "team": team, "code": err.kind().code() })),
        );
        Ok(WorkflowResponse::from_run(run))
    }

    /// Append the finished run to memory; failure only loses the record
    async fn remember(&self, run: &WorkflowRun) {
        let Some(memory) = &self.memory else {
            return;
        };
        let Some(composite) = &run.composite_output else {
            return;
        };
        let entry = MemoryEntry::new(run.query.clone(), composite.clone())
            .with_meta("workflow_kind", run.workflow_kind.as_str())
            .with_meta("run_id", run.run_id.clone())
            .with_meta("team_count", run.team_outputs.len() as u64);
        if let Err(e) = memory.append(entry).await {
            tracing::warn!(run_id = %run.run_id, error = %e, "Failed to append run to memory");
        }
    }
}

/// Labeled concatenation of the team outputs; failed runs add the failing
/// team and an error section
pub fn render_composite(
    run: &WorkflowRun,
    error: Option<&RunError>,
    document_truncated: bool,
    document_limit: usize,
) -> String {
    let mut out = format!(
        "# {} Report\n\n**Query:** {}\n**Run ID:** {}\n",
        run.workflow_kind.display_name(),
        run.query,
        run.run_id
    );

    match error {
        None => out.push_str(&format!("**Status:** ok ({} teams)\n", run.team_outputs.len())),
        Some(err) => {
            out.push_str(&format!("**Status:** FAILED ({})\n", err.code));
            match &err.team {
                Some(team) => out.push_str(&format!("**Failed team:** {} (last team executed)\n", team)),
                None => out.push_str("**Failed team:** none (failed before the first team)\n"),
            }
        }
    }

    if document_truncated {
        out.push_str(&format!(
            "\n> {}] The reference document exceeded the {}-character limit and was truncated \
             before it was passed to the teams.\n",
            TRUNCATION_MARKER, document_limit
        ));
    }

    for team in &run.team_outputs {
        out.push_str(&format!("\n## {}\n\n{}\n", team.name, team.output.trim_end()));
    }

    if let Some(err) = error {
        out.push_str(&format!("\n## ERROR\n\n{}: {}\n", err.code, err.message));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GenerationRequest, LlmBackend, RetryPolicy};
    use crate::memory::{InMemoryMemoryStore, RecallStrategy};
    use crate::search::DisabledSearch;
    use async_trait::async_trait;

    struct NamedBackend;

    #[async_trait]
    impl LlmBackend for NamedBackend {
        fn describe(&self) -> String {
            "named".to_string()
        }

        async fn complete(&self, request: &GenerationRequest) -> TeamflowResult<String> {
            let role = request
                .system
                .strip_prefix("You are the ")
                .and_then(|s| s.split('.').next())
                .unwrap_or("unknown");
            Ok(format!("output from {}", role))
        }
    }

    fn orchestrator(dir: &Path, memory: Arc<InMemoryMemoryStore>) -> WorkflowOrchestrator {
        let runtime = LocalAgentRuntime::new(
            LlmGateway::new(Arc::new(NamedBackend), RetryPolicy::none()),
            crate::gateway::GenerateOptions::default(),
        );
        let mut config = TeamflowConfig::default();
        config.max_rpm = 0;
        WorkflowOrchestrator::new(
            config,
            Arc::new(runtime),
            Arc::new(DisabledSearch),
            Some(memory),
            OutputArchive::in_runtime(dir),
        )
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(InMemoryMemoryStore::new(10, RecallStrategy::Recency));
        let err = orchestrator(dir.path(), memory)
            .run_workflow(WorkflowKind::Standard, "   ", WorkflowRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TeamflowError::InputInvalid(_)));
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(InMemoryMemoryStore::new(10, RecallStrategy::Recency));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let response = orchestrator(dir.path(), memory.clone())
            .with_events(tx)
            .run_workflow(WorkflowKind::Standard, "what is a digital twin", WorkflowRequest::default())
            .await
            .unwrap();
        assert_eq!(response.status, RunStatus::Ok);
        assert_eq!(response.team_outputs[2].output, "output from Content Writer");

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
        assert_eq!(kinds.first(), Some(&WorkflowEventKind::RunStarted));
        assert_eq!(kinds[1], WorkflowEventKind::PreSearchCompleted);
        assert_eq!(kinds.iter().filter(|k| **k == WorkflowEventKind::TeamCompleted).count(), 3);
        assert_eq!(kinds.last(), Some(&WorkflowEventKind::RunCompleted));
        assert_eq!(memory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_disabled_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(InMemoryMemoryStore::new(10, RecallStrategy::Recency));
        let mut orchestrator = orchestrator(dir.path(), memory.clone());
        orchestrator.config.memory_enabled = false;
        orchestrator.memory = None;

        let response = orchestrator
            .run_workflow(WorkflowKind::Standard, "q", WorkflowRequest::default())
            .await
            .unwrap();
        assert_eq!(response.status, RunStatus::Ok);
        assert_eq!(memory.count().await.unwrap(), 0);
    }

    #[test]
    fn test_composite_for_failed_run() {
        let mut run = WorkflowRun::start(WorkflowKind::ThreeTeam, "q");
        run.record_team("Research & Analysis", "research_analysis", "findings".into(), 1)
            .unwrap();
        let err = RunError::from_error(&TeamflowError::timeout("task 'x'"), Some("Data Strategy"));
        let text = render_composite(&run, Some(&err), false, 100);
        assert!(text.contains("**Status:** FAILED (TIMEOUT)"));
        assert!(text.contains("**Failed team:** Data Strategy (last team executed)"));
        assert!(text.contains("## Research & Analysis\n\nfindings"));
        assert!(text.contains("## ERROR"));
        assert!(!text.contains("## Data Strategy"));
    }
}
