//! # Workflow
//!
//! Workflow kinds, the run state machine, inter-team context passing,
//! lifecycle events and the orchestrator that ties them together.
//!
//! ```text
//! WorkflowKind ─► pipeline: [TeamKind]
//!                     │
//!   WorkflowOrchestrator::run_workflow
//!                     │
//!   WorkflowRun: running ─► ok | failed
//! ```

pub mod context;
pub mod events;
pub mod kind;
pub mod orchestrator;
pub mod run;

pub use events::{EventSender, WorkflowEvent, WorkflowEventKind};
pub use kind::WorkflowKind;
pub use orchestrator::{render_composite, WorkflowOrchestrator, WorkflowRequest, WorkflowResponse};
pub use run::{RunError, RunStatus, TeamOutput, WorkflowRun};
