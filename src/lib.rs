//! Skein - variable resolution and static validation for declarative pipelines

pub mod apply;
pub mod config;
pub mod error;
pub mod param;
pub mod pipeline;
pub mod resultrefs;
pub mod substitution;
pub mod task;
pub mod task_validation;

pub use apply::{
    apply_contexts, apply_parameters, apply_pipeline_task_contexts,
    apply_pipeline_task_state_context, apply_task_results, apply_task_results_to_pipeline_results,
    apply_workspaces,
};
pub use config::{ApiFields, ValidationContext};
pub use error::{FieldError, SkeinError};
pub use param::{Param, ParamSpec, ParamType, ParamValue, PropertySpec};
pub use pipeline::{
    CustomRunResult, PipelineResult, PipelineRun, PipelineRunResult, PipelineRunState,
    PipelineSpec, PipelineTask, ResolvedPipelineTask, TaskBody, TaskRef, WhenExpression,
    WhenOperator, WorkspaceBinding,
};
pub use resultrefs::{ResolvedResultRef, ResultRef};
pub use task::{Sidecar, Step, StepTemplate, TaskResult, TaskRunResult, TaskSpec};
pub use task_validation::Task;
