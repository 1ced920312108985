//! # Teamflow Core
//!
//! The "Brain" of Teamflow - runs fixed pipelines of LLM agent teams over a
//! user query and keeps everything they produce.
//!
//! ## Architecture
//!
//! - `workflow/` - Workflow kinds, run state machine and the orchestrator
//! - `teams/` - Agent, task and team specs plus the team catalog
//! - `runtime/` - Executes one team against the LLM gateway
//! - `gateway/` - Local and cloud LLM backends with retry
//! - `search/` - Web search adapter and the pre-search manager
//! - `memory/` - Cross-run memory store (SQLite or in-process)
//! - `state/` - Runtime directory, SQLite handle and the output archive
//! - `iso19115/` - ISO 19115 record builder, XML codec and validator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use teamflow_core::config::TeamflowConfig;
//! use teamflow_core::workflow::{WorkflowKind, WorkflowOrchestrator, WorkflowRequest};
//!
//! let runtime_dir = teamflow_core::state::ensure_runtime_dir().await?;
//! let config = TeamflowConfig::load_with_env(&runtime_dir).await?;
//! let orchestrator = WorkflowOrchestrator::open(config, &runtime_dir)?;
//! let response = orchestrator
//!     .run_workflow(WorkflowKind::Standard, "What is a digital twin?", WorkflowRequest::default())
//!     .await?;
//! println!("{}", response.composite_output);
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod iso19115;
pub mod memory;
pub mod models;
pub mod runtime;
pub mod search;
pub mod state;
pub mod teams;
pub mod workflow;

pub use config::{ExecutionMode, TeamflowConfig};
pub use error::{ErrorKind, TeamflowError, TeamflowResult};
pub use workflow::{WorkflowKind, WorkflowOrchestrator, WorkflowRequest, WorkflowResponse};
