//! Pipeline-side data model
//!
//! A `PipelineSpec` arranges tasks (plus a `finally` section), declares the
//! parameters and workspaces runs must supply, and projects task results into
//! pipeline-level results. `PipelineRun` carries the run-scoped inputs and
//! identity the resolution passes substitute from.

use serde::{Deserialize, Serialize};

use crate::error::SkeinError;
use crate::param::{Param, ParamSpec, ParamValue};
use crate::task::TaskSpec;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<PipelineTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finally: Vec<PipelineTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<PipelineWorkspaceDeclaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<PipelineResult>,
}

impl PipelineSpec {
    /// Parse a spec from its YAML authoring format.
    pub fn from_yaml(yaml: &str) -> Result<Self, SkeinError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// One node in the pipeline graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    pub name: String,
    /// What the task runs: a reference to a task by name, or a spec embedded
    /// inline. Exactly one is present in well-formed input.
    #[serde(flatten)]
    pub body: Option<TaskBody>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrix: Vec<Param>,
    #[serde(default, rename = "when", skip_serializing_if = "Vec::is_empty")]
    pub when_expressions: Vec<WhenExpression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspacePipelineTaskBinding>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl PipelineTask {
    /// The embedded spec, when the task carries one inline.
    pub fn embedded_spec(&self) -> Option<&TaskSpec> {
        match &self.body {
            Some(TaskBody::Embedded { task_spec }) => Some(task_spec),
            _ => None,
        }
    }

    pub fn embedded_spec_mut(&mut self) -> Option<&mut TaskSpec> {
        match &mut self.body {
            Some(TaskBody::Embedded { task_spec }) => Some(task_spec),
            _ => None,
        }
    }
}

/// How a pipeline task names the work it runs. Serde resolves the union by
/// field presence: `taskRef` or `taskSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskBody {
    Reference {
        #[serde(rename = "taskRef")]
        task_ref: TaskRef,
    },
    Embedded {
        #[serde(rename = "taskSpec")]
        task_spec: TaskSpec,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,
}

/// A guard evaluated before the task runs: `input` compared against `values`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhenExpression {
    pub input: String,
    pub operator: WhenOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhenOperator {
    #[default]
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notin")]
    NotIn,
}

/// A workspace the pipeline expects the run to bind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineWorkspaceDeclaration {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

/// A pipeline task's claim on a declared pipeline workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePipelineTaskBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// A pipeline-level result projected from task results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: ParamValue,
}

/// A pipeline result with its references resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub name: String,
    pub value: ParamValue,
}

/// A result reported by a custom (non-task) run. Custom results are plain
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRunResult {
    pub name: String,
    pub value: String,
}

/// Run-scoped identity and inputs for one pipeline execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspaceBinding>,
}

/// A concrete workspace supplied by the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// A pipeline task joined with its runtime identity, as tracked while a run
/// is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPipelineTask {
    pub pipeline_task: PipelineTask,
    pub task_run_name: Option<String>,
}

impl ResolvedPipelineTask {
    pub fn new(pipeline_task: PipelineTask) -> Self {
        ResolvedPipelineTask {
            pipeline_task,
            task_run_name: None,
        }
    }
}

/// All tasks of one run, in graph order.
pub type PipelineRunState = Vec<ResolvedPipelineTask>;
