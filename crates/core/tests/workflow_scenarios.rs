//! End-to-end runs of the orchestrator over the local runtime with a
//! scripted LLM backend and a fixed web search adapter.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use teamflow_core::config::TeamflowConfig;
use teamflow_core::error::{ErrorKind, TeamflowError, TeamflowResult};
use teamflow_core::gateway::{GenerateOptions, GenerationRequest, LlmBackend, LlmGateway, RetryPolicy};
use teamflow_core::memory::{InMemoryMemoryStore, MemoryEntry, MemoryStore, RecallStrategy};
use teamflow_core::runtime::LocalAgentRuntime;
use teamflow_core::search::WebSearch;
use teamflow_core::state::OutputArchive;
use teamflow_core::workflow::{RunStatus, WorkflowKind, WorkflowOrchestrator, WorkflowRequest};

const GEOSPATIAL_ANSWER: &str = "Parameters for the record:\n\
```json\n\
{\"title\": \"Coastal flood zones\", \"abstract\": \"Modelled 1-in-200 year flood extents.\", \
\"keywords\": [\"flood\", \"coast\"], \
\"spatial_extent\": {\"west\": -10.0, \"east\": 10.0, \"south\": -5.0, \"north\": 5.0}, \
\"temporal_extent\": {\"start\": \"2024-01-01\", \"end\": \"2024-06-30\"}, \
\"data_type\": \"vector\"}\n\
```";

/// Answers `output from <role>`; fails every call whose system prompt
/// belongs to `failing_role` and answers blank for `empty_role`
struct ScriptedBackend {
    failing_role: Option<&'static str>,
    empty_role: Option<&'static str>,
    delay: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    fn new() -> Arc<Self> {
        Self::build(None, Duration::ZERO)
    }

    fn build(failing_role: Option<&'static str>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            failing_role,
            empty_role: None,
            delay,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn answering_empty(role: &'static str) -> Arc<Self> {
        Arc::new(Self {
            failing_role: None,
            empty_role: Some(role),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn role_of(system: &str) -> &str {
    system
        .strip_prefix("You are the ")
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("unknown")
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn complete(&self, request: &GenerationRequest) -> TeamflowResult<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests.lock().unwrap().push(request.clone());

        let role = role_of(&request.system);
        if Some(role) == self.failing_role {
            return Err(TeamflowError::TransientUpstream(format!("{} backend overloaded", role)));
        }
        if Some(role) == self.empty_role {
            return Ok("  \n".to_string());
        }
        if role == "Geospatial Metadata Specialist" {
            return Ok(GEOSPATIAL_ANSWER.to_string());
        }
        Ok(format!("output from {}", role))
    }
}

struct FixedSearch;

#[async_trait]
impl WebSearch for FixedSearch {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, _query: &str) -> TeamflowResult<String> {
        Ok("W".to_string())
    }
}

fn test_config() -> TeamflowConfig {
    let mut config = TeamflowConfig::default();
    config.max_rpm = 0;
    config.memory_provider = teamflow_core::memory::MemoryProvider::InMemory;
    config
}

fn orchestrator(
    dir: &Path,
    config: TeamflowConfig,
    backend: Arc<ScriptedBackend>,
    memory: Arc<InMemoryMemoryStore>,
) -> WorkflowOrchestrator {
    let gateway = LlmGateway::new(backend, RetryPolicy::immediate(3));
    let options = GenerateOptions {
        timeout: Duration::from_secs(10),
        ..GenerateOptions::default()
    };
    WorkflowOrchestrator::new(
        config,
        Arc::new(LocalAgentRuntime::new(gateway, options)),
        Arc::new(FixedSearch),
        Some(memory),
        OutputArchive::in_runtime(dir),
    )
}

fn empty_memory() -> Arc<InMemoryMemoryStore> {
    Arc::new(InMemoryMemoryStore::new(50, RecallStrategy::Recency))
}

#[tokio::test]
async fn standard_workflow_archives_and_remembers() {
    let dir = tempfile::tempdir().unwrap();
    let memory = empty_memory();
    let backend = ScriptedBackend::new();
    let orchestrator = orchestrator(dir.path(), test_config(), backend.clone(), memory.clone());

    let response = orchestrator
        .run_workflow(WorkflowKind::Standard, "what is a digital twin", WorkflowRequest::default())
        .await
        .unwrap();

    assert_eq!(response.status, RunStatus::Ok);
    assert!(response.error.is_none());
    let names: Vec<&str> = response.team_outputs.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Research", "Analysis", "Writing"]);
    assert!(response.team_outputs.iter().all(|t| !t.output.is_empty()));

    let composite = &response.composite_output;
    let research = composite.find("## Research").unwrap();
    let analysis = composite.find("## Analysis").unwrap();
    let writing = composite.find("## Writing").unwrap();
    assert!(research < analysis && analysis < writing);

    let entries = memory.recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].query, "what is a digital twin");
    assert_eq!(entries[0].metadata["workflow_kind"], "standard");

    let run_dir = dir.path().join("outputs").join(&response.run_id);
    for file in ["01_research.md", "02_analysis.md", "03_writing.md", "workflow.json", "composite.md"] {
        assert!(run_dir.join(file).exists(), "missing {}", file);
    }

    // The web adapter's text reaches the first team through pre-search
    let first = backend.requests()[0].messages.last().unwrap().content.clone();
    assert!(first.contains("WEB RESULTS:\nW"));
}

#[tokio::test]
async fn empty_team_output_is_marked_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let memory = empty_memory();
    let backend = ScriptedBackend::answering_empty("Research Specialist");
    let orchestrator = orchestrator(dir.path(), test_config(), backend.clone(), memory.clone());

    let response = orchestrator
        .run_workflow(WorkflowKind::Standard, "what is a digital twin", WorkflowRequest::default())
        .await
        .unwrap();

    assert_eq!(response.status, RunStatus::Ok);
    assert_eq!(response.team_outputs.len(), 3);
    assert_eq!(response.team_outputs[0].output, "TEAM PRODUCED NO OUTPUT");
    assert_eq!(response.team_outputs[1].output, "output from Data Analyst");

    // Every blank attempt is retried before the team settles on no output
    let requests = backend.requests();
    let research_calls = requests
        .iter()
        .filter(|r| role_of(&r.system) == "Research Specialist")
        .count();
    assert_eq!(research_calls, 3);

    let analysis = requests
        .iter()
        .find(|r| role_of(&r.system) == "Data Analyst")
        .unwrap();
    let prompt = &analysis.messages.last().unwrap().content;
    assert!(prompt.contains("=== Research (team 1) ===\nUPSTREAM PRODUCED NO OUTPUT"));

    assert_eq!(memory.recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn prior_entry_reaches_presearch_context() {
    let dir = tempfile::tempdir().unwrap();
    let memory = empty_memory();
    memory.append(MemoryEntry::new("X", "Y")).await.unwrap();
    let backend = ScriptedBackend::new();
    let orchestrator = orchestrator(dir.path(), test_config(), backend.clone(), memory.clone());

    let response = orchestrator
        .run_workflow(WorkflowKind::TwoTeamDataStrategy, "data governance roadmap", WorkflowRequest::default())
        .await
        .unwrap();
    assert_eq!(response.status, RunStatus::Ok);
    assert_eq!(response.team_outputs.len(), 2);

    let prompt = backend.requests()[0].messages.last().unwrap().content.clone();
    let prior = prompt.find("PRIOR CONTEXT:").unwrap();
    let web = prompt.find("WEB RESULTS:").unwrap();
    assert!(prompt[prior..web].contains("A: Y"));
    assert_eq!(memory.count().await.unwrap(), 2);
}

#[tokio::test]
async fn fifth_team_failure_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let memory = empty_memory();
    let backend = ScriptedBackend::build(Some("Tender Analyst"), Duration::ZERO);
    let orchestrator = orchestrator(dir.path(), test_config(), backend.clone(), memory.clone());

    let response = orchestrator
        .run_workflow(WorkflowKind::SevenTeam, "bid for a national data platform", WorkflowRequest::default())
        .await
        .unwrap();

    assert_eq!(response.status, RunStatus::Failed);
    let error = response.error.as_ref().unwrap();
    assert_eq!(error.team.as_deref(), Some("Tender Response"));
    assert_eq!(error.kind, ErrorKind::TransientUpstream);

    let names: Vec<&str> = response.team_outputs.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Research & Analysis", "Data Strategy", "Compliance & Risk", "Information Management"]
    );
    assert!(response.composite_output.contains("Failed team:** Tender Response"));
    assert!(response.composite_output.contains("## ERROR"));
    assert!(!response.composite_output.contains("## Project Delivery"));
    assert_eq!(memory.count().await.unwrap(), 0);

    // Three attempts for the tender analyst, nothing after it
    let requests = backend.requests();
    let tender_calls = requests
        .iter()
        .filter(|r| role_of(&r.system) == "Tender Analyst")
        .count();
    assert_eq!(tender_calls, 3);
    assert_eq!(role_of(&requests.last().unwrap().system), "Tender Analyst");

    let archived = orchestrator.archive().read(&response.run_id).await.unwrap().unwrap();
    assert_eq!(archived.manifest.status, RunStatus::Failed);
    assert_eq!(archived.teams.len(), 4);
}

#[tokio::test]
async fn oversized_document_is_truncated_not_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.document_context_limit = 200;
    let backend = ScriptedBackend::new();
    let orchestrator = orchestrator(dir.path(), config, backend.clone(), empty_memory());

    let document = "Clause text about data retention.\n".repeat(100);
    let request = WorkflowRequest {
        document_context: Some(document),
        ..WorkflowRequest::default()
    };
    let response = orchestrator
        .run_workflow(WorkflowKind::Standard, "summarise the policy", request)
        .await
        .unwrap();

    assert_eq!(response.status, RunStatus::Ok);
    assert!(response.composite_output.contains("[DOCUMENT TRUNCATED"));
    let prompt = backend.requests()[0].messages.last().unwrap().content.clone();
    assert!(prompt.contains("[DOCUMENT TRUNCATED: showing the first"));
}

#[tokio::test]
async fn geospatial_workflow_embeds_valid_record() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(dir.path(), test_config(), ScriptedBackend::new(), empty_memory());

    let response = orchestrator
        .run_workflow(WorkflowKind::Geospatial, "metadata for coastal flood zones", WorkflowRequest::default())
        .await
        .unwrap();

    assert_eq!(response.status, RunStatus::Ok);
    let metadata = &response.team_outputs[1];
    assert_eq!(metadata.name, "Geospatial Metadata");
    assert!(metadata.output.contains("<gmd:westBoundLongitude>"));
    assert!(metadata.output.contains("-10.0"));
    assert!(metadata.output.contains("**Status:** valid"));
}

#[tokio::test]
async fn native_tools_mode_skips_presearch() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new();
    let orchestrator = orchestrator(dir.path(), test_config(), backend.clone(), empty_memory());

    let request = WorkflowRequest {
        mode: Some(teamflow_core::config::ExecutionMode::NativeTools),
        ..WorkflowRequest::default()
    };
    let response = orchestrator
        .run_workflow(WorkflowKind::Standard, "what is a digital twin", request)
        .await
        .unwrap();
    assert_eq!(response.status, RunStatus::Ok);

    let prompt = backend.requests()[0].messages.last().unwrap().content.clone();
    assert!(!prompt.contains("PRIOR CONTEXT:"));
    assert!(prompt.contains("TOOL RESULT (web_search):\nW"));
}

#[tokio::test]
async fn outer_deadline_fails_running_team() {
    let dir = tempfile::tempdir().unwrap();
    let memory = empty_memory();
    let backend = ScriptedBackend::build(None, Duration::from_millis(1500));
    let orchestrator = orchestrator(dir.path(), test_config(), backend, memory.clone());

    let request = WorkflowRequest {
        deadline_secs: Some(1),
        ..WorkflowRequest::default()
    };
    let response = orchestrator
        .run_workflow(WorkflowKind::Standard, "slow question", request)
        .await
        .unwrap();

    assert_eq!(response.status, RunStatus::Failed);
    let error = response.error.unwrap();
    assert_eq!(error.kind, ErrorKind::DeadlineExceeded);
    assert_eq!(error.team.as_deref(), Some("Research"));
    assert!(response.team_outputs.is_empty());
    assert_eq!(memory.count().await.unwrap(), 0);
}

#[tokio::test]
async fn archive_lists_runs_and_summarises() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(
        dir.path(),
        test_config(),
        ScriptedBackend::build(Some("Data Analyst"), Duration::ZERO),
        empty_memory(),
    );

    let failed = orchestrator
        .run_workflow(WorkflowKind::Standard, "first", WorkflowRequest::default())
        .await
        .unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.error.unwrap().team.as_deref(), Some("Analysis"));

    let runs = orchestrator.archive().list().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].query, "first");

    let summary = orchestrator.archive().summary().await.unwrap();
    assert_eq!(summary.total_runs, 1);
    assert_eq!(summary.by_status.get("failed"), Some(&1));
    assert_eq!(summary.by_kind.get("standard"), Some(&1));
}
