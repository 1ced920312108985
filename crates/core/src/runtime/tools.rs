//! # Tool Bindings
//!
//! Concrete adapters behind an agent's [`ToolHandle`]s. Models are never
//! trusted to call tools: retrieval tools run before the task (native-tools
//! mode) and metadata tools run over the task's output.

use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::iso19115::{self, MetadataBuilder, MetadataParams};
use crate::memory::MemoryStore;
use crate::search::WebSearch;
use crate::teams::{AgentSpec, ToolHandle};

fn json_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)```").ok())
        .as_ref()
}

/// First fenced JSON object in `text`; falls back to the outermost braces
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(captures) = json_block().and_then(|re| re.captures(text)) {
        if let Some(body) = captures.get(1) {
            let body = body.as_str().trim();
            if body.starts_with('{') {
                return Some(body);
            }
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Clone, Default)]
pub struct ToolBindings {
    web: Option<Arc<dyn WebSearch>>,
    memory: Option<Arc<dyn MemoryStore>>,
    memory_k: usize,
    metadata: MetadataBuilder,
}

impl std::fmt::Debug for ToolBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBindings")
            .field("web", &self.web.as_ref().map(|w| w.name().to_string()))
            .field("memory", &self.memory.is_some())
            .field("memory_k", &self.memory_k)
            .finish()
    }
}

impl ToolBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_web(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web = Some(web);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>, k: usize) -> Self {
        self.memory = Some(memory);
        self.memory_k = k;
        self
    }

    /// Run the agent's retrieval tools for `query`; returns a block to append
    /// to the task prompt, empty when the agent has none bound
    pub async fn gather(&self, agent: &AgentSpec, query: &str) -> String {
        let mut sections = Vec::new();

        if agent.has_tool(ToolHandle::WebSearch) {
            if let Some(web) = &self.web {
                let body = match web.search(query).await {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => "(no results)".to_string(),
                    Err(e) => {
                        tracing::warn!(agent = %agent.role, error = %e, "web_search tool failed");
                        format!("(tool failed: {})", e)
                    }
                };
                sections.push(format!("TOOL RESULT ({}):\n{}", ToolHandle::WebSearch.as_str(), body));
            }
        }

        if agent.has_tool(ToolHandle::MemoryRecall) {
            if let Some(memory) = &self.memory {
                let body = match memory.recall(query, self.memory_k).await {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => "(no prior entries)".to_string(),
                    Err(e) => {
                        tracing::warn!(agent = %agent.role, error = %e, "memory_recall tool failed");
                        format!("(tool failed: {})", e)
                    }
                };
                sections.push(format!("TOOL RESULT ({}):\n{}", ToolHandle::MemoryRecall.as_str(), body));
            }
        }

        sections.join("\n\n")
    }

    /// Apply output tools. For metadata agents the JSON parameter block is
    /// built into an ISO 19115 record; the XML and the validation report are
    /// appended. Problems are reported in the output, never raised.
    pub fn post_process(&self, agent: &AgentSpec, output: String) -> String {
        if !agent.has_tool(ToolHandle::MetadataBuild) {
            return output;
        }

        let appendix = match self.build_metadata(&output) {
            Ok(generated) => {
                let mut section = format!(
                    "## ISO 19115 Record\n\nFile identifier: `{}`\n\n```xml\n{}```",
                    generated.record.file_identifier, generated.xml
                );
                if agent.has_tool(ToolHandle::MetadataValidate) {
                    section.push_str("\n\n");
                    section.push_str(&generated.report.to_markdown());
                }
                tracing::info!(
                    title = %generated.record.identification.title,
                    valid = generated.report.valid,
                    "ISO 19115 record generated"
                );
                section
            }
            Err(reason) => {
                tracing::warn!(agent = %agent.role, reason = %reason, "No ISO 19115 record generated");
                format!("## ISO 19115 Record\n\nNo record was generated: {}", reason)
            }
        };

        format!("{}\n\n{}", output.trim_end(), appendix)
    }

    fn build_metadata(&self, output: &str) -> Result<iso19115::GeneratedMetadata, String> {
        let json = extract_json_block(output)
            .ok_or_else(|| "the answer contains no JSON parameter block".to_string())?;
        let params: MetadataParams =
            serde_json::from_str(json).map_err(|e| format!("invalid metadata parameters: {}", e))?;
        iso19115::generate(&self.metadata, &params).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TeamflowError, TeamflowResult};
    use crate::memory::{InMemoryMemoryStore, MemoryEntry, RecallStrategy};
    use async_trait::async_trait;

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

    struct BrokenSearch;

    #[async_trait]
    impl WebSearch for BrokenSearch {
        fn name(&self) -> &str {
            "broken"
        }
        async fn search(&self, _query: &str) -> TeamflowResult<String> {
            Err(TeamflowError::TransientUpstream("down".into()))
        }
    }

    fn metadata_agent() -> AgentSpec {
        AgentSpec::new("m", "Geospatial Metadata Specialist", "g", "b")
            .with_tools([ToolHandle::MetadataBuild, ToolHandle::MetadataValidate])
    }

    #[test]
    fn test_extract_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));
        assert_eq!(extract_json_block("inline {\"b\": 2} end"), Some("{\"b\": 2}"));
        assert_eq!(extract_json_block("no json here"), None);
    }

    #[test]
    fn test_metadata_output_gets_record_and_report() {
        let output = "```json\n{\"title\": \"Flood zones\", \"abstract\": \"Zones\", \
                      \"spatial_extent\": {\"west\": -10.0, \"east\": 10.0, \"south\": -5.0, \"north\": 5.0}}\n```\n\
                      Rationale follows.";
        let processed = ToolBindings::new().post_process(&metadata_agent(), output.to_string());
        assert!(processed.starts_with("```json"));
        assert!(processed.contains("## ISO 19115 Record"));
        assert!(processed.contains("<gmd:MD_Metadata"));
        assert!(processed.contains("**Status:** valid"));
    }

    #[test]
    fn test_metadata_failure_is_reported_not_raised() {
        let processed = ToolBindings::new().post_process(&metadata_agent(), "just prose".to_string());
        assert!(processed.contains("No record was generated"));

        let bad_bbox = "```json\n{\"title\": \"T\", \"abstract\": \"A\", \
                        \"spatial_extent\": {\"west\": 50.0, \"east\": 10.0, \"south\": 0.0, \"north\": 1.0}}\n```";
        let processed = ToolBindings::new().post_process(&metadata_agent(), bad_bbox.to_string());
        assert!(processed.contains("invalid bounding box"));
    }

    #[test]
    fn test_other_agents_untouched() {
        let agent = AgentSpec::new("w", "Content Writer", "g", "b");
        assert_eq!(ToolBindings::new().post_process(&agent, "text".into()), "text");
    }

    #[tokio::test]
    async fn test_gather_runs_declared_tools_only() {
        let memory = Arc::new(InMemoryMemoryStore::new(10, RecallStrategy::Recency));
        memory.append(MemoryEntry::new("earlier", "PRIOR ANSWER")).await.unwrap();
        let tools = ToolBindings::new()
            .with_web(Arc::new(FixedSearch))
            .with_memory(memory, 3);

        let researcher = AgentSpec::new("r", "Research Specialist", "g", "b")
            .with_tools([ToolHandle::WebSearch, ToolHandle::MemoryRecall]);
        let block = tools.gather(&researcher, "q").await;
        assert!(block.contains("TOOL RESULT (web_search):\nW"));
        assert!(block.contains("PRIOR ANSWER"));

        let writer = AgentSpec::new("w", "Content Writer", "g", "b");
        assert!(tools.gather(&writer, "q").await.is_empty());
    }

    #[tokio::test]
    async fn test_gather_reports_tool_failure() {
        let tools = ToolBindings::new().with_web(Arc::new(BrokenSearch));
        let agent = AgentSpec::new("r", "Research Specialist", "g", "b").with_tools([ToolHandle::WebSearch]);
        assert!(tools.gather(&agent, "q").await.contains("tool failed"));
    }
}
