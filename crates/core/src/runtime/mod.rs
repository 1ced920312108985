//! # Agent Runtime
//!
//! Executes one team: tasks run sequentially in declared order, each task
//! receiving the outputs of its declared upstream tasks. The team's result
//! is the last task's output.

pub mod local;
pub mod rate_limit;
pub mod tools;

pub use local::LocalAgentRuntime;
pub use rate_limit::RateLimiter;
pub use tools::ToolBindings;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ExecutionMode;
use crate::error::TeamflowResult;
use crate::teams::{Team, TeamInputs};

/// Output of a single task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskOutput {
    pub handle: String,
    pub role: String,
    pub output: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamOutcome {
    /// The last task's output
    pub output: String,
    pub task_outputs: Vec<TaskOutput>,
}

/// Runs a materialized team to completion
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run_team(
        &self,
        team: &Team,
        inputs: &TeamInputs,
        mode: ExecutionMode,
    ) -> TeamflowResult<TeamOutcome>;
}
