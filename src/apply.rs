//! Resolution passes
//!
//! Each pass rewrites one placeholder scope across a pipeline spec or run
//! state: run parameters, run/pipeline identity contexts, per-task contexts,
//! workspace bindings, task results, and finally the projection of task
//! results into declared pipeline results.
//!
//! Passes are pure and idempotent. A reference whose data is not available
//! yet simply has no replacement key and survives as literal text for a later
//! pass; only the pipeline-result projection checks that references actually
//! resolve. A user literal that happens to look like a placeholder is
//! indistinguishable from an unresolved reference and is left alone the same
//! way.

use std::collections::HashMap;

use tracing::debug;

use crate::config::ApiFields;
use crate::error::SkeinError;
use crate::param::{Param, ParamValue};
use crate::pipeline::{
    CustomRunResult, PipelineResult, PipelineRun, PipelineRunResult, PipelineRunState,
    PipelineSpec, PipelineTask, WhenExpression,
};
use crate::resultrefs::{self, PipelineResultRef, ResolvedResultRef, ResultAccessor};
use crate::substitution;
use crate::task::{Sidecar, Step, StepTemplate, TaskRunResult, TaskSpec};

type Strings = HashMap<String, String>;
type Arrays = HashMap<String, Vec<String>>;
type Objects = HashMap<String, HashMap<String, String>>;

/// Resolve `params.*` references from declared defaults overlaid by
/// run-supplied values.
///
/// Propagation into embedded task bodies (a step referencing a pipeline
/// parameter the body never declares) is gated on `api_fields` being alpha.
/// Per referenced name the most local binding wins: a task-level override,
/// then the body's own default, then the pipeline-resolved value.
pub fn apply_parameters(
    api_fields: ApiFields,
    spec: &PipelineSpec,
    run: &PipelineRun,
) -> PipelineSpec {
    let mut strings = Strings::new();
    let mut arrays = Arrays::new();
    let mut objects = Objects::new();

    for param_spec in &spec.params {
        let overridden = run.params.iter().any(|p| p.name == param_spec.name);
        if overridden {
            continue;
        }
        if let Some(default) = &param_spec.default {
            insert_param_replacements(&param_spec.name, default, &mut strings, &mut arrays, &mut objects);
        }
    }
    for param in &run.params {
        insert_param_replacements(&param.name, &param.value, &mut strings, &mut arrays, &mut objects);
    }
    debug!(
        strings = strings.len(),
        arrays = arrays.len(),
        objects = objects.len(),
        "applying parameter replacements"
    );
    apply_pipeline_replacements(spec, &strings, &arrays, &objects, api_fields)
}

/// Resolve `context.pipeline.*` and `context.pipelineRun.*` references.
/// Unset metadata substitutes the empty string.
pub fn apply_contexts(spec: &PipelineSpec, pipeline_name: &str, run: &PipelineRun) -> PipelineSpec {
    let strings: Strings = [
        ("context.pipeline.name".to_string(), pipeline_name.to_string()),
        ("context.pipelineRun.name".to_string(), run.name.clone()),
        ("context.pipelineRun.namespace".to_string(), run.namespace.clone()),
        ("context.pipelineRun.uid".to_string(), run.uid.clone()),
    ]
    .into();
    apply_pipeline_replacements(spec, &strings, &Arrays::new(), &Objects::new(), ApiFields::Stable)
}

/// Resolve `context.pipelineTask.retries` for one task: the configured retry
/// count as a decimal string, `"0"` when none is set.
pub fn apply_pipeline_task_contexts(task: &PipelineTask) -> PipelineTask {
    let strings: Strings = [(
        "context.pipelineTask.retries".to_string(),
        task.retries.to_string(),
    )]
    .into();
    let mut task = task.clone();
    for param in &mut task.params {
        param.value.apply_replacements(&strings, &Arrays::new(), &Objects::new());
    }
    for param in &mut task.matrix {
        param.value.apply_replacements(&strings, &Arrays::new(), &Objects::new());
    }
    task
}

/// Resolve `workspaces.<name>.bound` to `"true"` or `"false"` per declared
/// workspace, depending on whether the run binds it. An optional workspace
/// left unbound is not an error.
pub fn apply_workspaces(spec: &PipelineSpec, run: &PipelineRun) -> PipelineSpec {
    let mut strings = Strings::new();
    for declared in &spec.workspaces {
        let bound = run.workspaces.iter().any(|b| b.name == declared.name);
        strings.insert(
            format!("workspaces.{}.bound", declared.name),
            bound.to_string(),
        );
    }
    apply_pipeline_replacements(spec, &strings, &Arrays::new(), &Objects::new(), ApiFields::Stable)
}

/// Rewrite `tasks.<t>.results.<r>` references across the params, matrix, and
/// when-expressions of every task in `state`, using the values the producers
/// reported.
///
/// Bounds and key existence are deliberately not checked: a stale index or
/// unknown key produces no replacement entry and the literal text survives
/// for the caller to surface.
pub fn apply_task_results(state: &mut PipelineRunState, refs: &[ResolvedResultRef]) {
    let strings = resultrefs::string_replacements(refs);
    let arrays = resultrefs::array_replacements(refs);
    let objects = resultrefs::object_replacements(refs);
    debug!(refs = refs.len(), "applying task result replacements");
    for resolved in state.iter_mut() {
        apply_to_task_fields(&mut resolved.pipeline_task, &strings, &arrays, &objects);
    }
}

/// Rewrite `tasks.<name>.status` references from an execution-status map
/// keyed by those exact names.
pub fn apply_pipeline_task_state_context(state: &mut PipelineRunState, replacements: &Strings) {
    for resolved in state.iter_mut() {
        apply_to_task_fields(&mut resolved.pipeline_task, replacements, &Arrays::new(), &Objects::new());
    }
}

/// Project task results into the pipeline's declared results.
///
/// A declared result with no references at all is omitted silently. Every
/// reference must be a well-formed `tasks.<t>.results.<r>` expression that
/// resolves against the reported results; whole-result references consult
/// ordinary task results first and fall back to custom run results,
/// object-key references consult task results only. A result with any
/// unresolvable reference is omitted and its name recorded once, in
/// declaration order.
pub fn apply_task_results_to_pipeline_results(
    results: &[PipelineResult],
    task_run_results: &HashMap<String, Vec<TaskRunResult>>,
    custom_run_results: &HashMap<String, Vec<CustomRunResult>>,
) -> (Vec<PipelineRunResult>, Option<SkeinError>) {
    let mut resolved_results = Vec::new();
    let mut invalid: Vec<String> = Vec::new();
    let mut strings = Strings::new();
    let mut arrays = Arrays::new();
    let mut objects = Objects::new();

    for declared in results {
        let expressions = value_expressions(&declared.value);
        if expressions.is_empty() {
            debug!(result = %declared.name, "pipeline result has no references, omitting");
            continue;
        }
        let mut valid = true;
        for body in &expressions {
            if strings.contains_key(body) || arrays.contains_key(body) || objects.contains_key(body)
            {
                continue;
            }
            let resolved = resultrefs::parse_result_expression(body).and_then(|parsed| {
                resolve_result_expression(
                    body,
                    &parsed,
                    task_run_results,
                    custom_run_results,
                    &mut strings,
                    &mut arrays,
                    &mut objects,
                )
            });
            if resolved.is_none() {
                valid = false;
            }
        }
        if !valid {
            if !invalid.contains(&declared.name) {
                invalid.push(declared.name.clone());
            }
            continue;
        }
        let mut value = declared.value.clone();
        value.apply_replacements(&strings, &arrays, &objects);
        resolved_results.push(PipelineRunResult {
            name: declared.name.clone(),
            value,
        });
    }

    let err = if invalid.is_empty() {
        None
    } else {
        Some(SkeinError::InvalidPipelineResults { names: invalid })
    };
    (resolved_results, err)
}

fn resolve_result_expression(
    body: &str,
    parsed: &PipelineResultRef,
    task_run_results: &HashMap<String, Vec<TaskRunResult>>,
    custom_run_results: &HashMap<String, Vec<CustomRunResult>>,
    strings: &mut Strings,
    arrays: &mut Arrays,
    objects: &mut Objects,
) -> Option<()> {
    if let ResultAccessor::Key(key) = &parsed.accessor {
        let value = lookup_task_result(task_run_results, &parsed.pipeline_task, &parsed.result)?;
        let ParamValue::Object(entries) = value else {
            return None;
        };
        strings.insert(body.to_string(), entries.get(key)?.clone());
        return Some(());
    }

    if let Some(value) = lookup_task_result(task_run_results, &parsed.pipeline_task, &parsed.result)
    {
        match value {
            ParamValue::String(s) => {
                strings.insert(body.to_string(), s.clone());
            }
            ParamValue::Array(items) => match &parsed.accessor {
                ResultAccessor::Index(i) => {
                    let item = items.get(*i)?;
                    strings.insert(body.to_string(), item.clone());
                }
                _ => {
                    arrays.insert(trim_accessor(body).to_string(), items.clone());
                }
            },
            ParamValue::Object(entries) => {
                // An object has no positional elements to index into.
                if matches!(parsed.accessor, ResultAccessor::Index(_)) {
                    return None;
                }
                objects.insert(trim_accessor(body).to_string(), entries.clone());
            }
        }
        return Some(());
    }

    let found = custom_run_results
        .get(&parsed.pipeline_task)?
        .iter()
        .find(|r| r.name == parsed.result)?;
    strings.insert(body.to_string(), found.value.clone());
    Some(())
}

fn lookup_task_result<'a>(
    task_run_results: &'a HashMap<String, Vec<TaskRunResult>>,
    task: &str,
    result: &str,
) -> Option<&'a ParamValue> {
    task_run_results
        .get(task)?
        .iter()
        .find(|r| r.name == result)
        .map(|r| &r.value)
}

/// Drop a trailing `[N]` / `[*]` accessor from an expression body.
fn trim_accessor(body: &str) -> &str {
    match (body.rfind('['), body.ends_with(']')) {
        (Some(open), true) => &body[..open],
        _ => body,
    }
}

/// All `$(...)` bodies appearing anywhere in a value.
fn value_expressions(value: &ParamValue) -> Vec<String> {
    let mut out = Vec::new();
    let mut push_all = |s: &str| {
        out.extend(
            substitution::extract_expressions(s)
                .into_iter()
                .map(str::to_string),
        )
    };
    match value {
        ParamValue::String(s) => push_all(s),
        ParamValue::Array(items) => items.iter().for_each(|s| push_all(s)),
        ParamValue::Object(entries) => entries.values().for_each(|s| push_all(s)),
    }
    out
}

fn apply_pipeline_replacements(
    spec: &PipelineSpec,
    strings: &Strings,
    arrays: &Arrays,
    objects: &Objects,
    api_fields: ApiFields,
) -> PipelineSpec {
    let mut spec = spec.clone();
    for task in spec.tasks.iter_mut().chain(spec.finally.iter_mut()) {
        apply_to_task_fields(task, strings, arrays, objects);
        if api_fields.enables(ApiFields::Alpha) {
            propagate_into_embedded_spec(task, strings, arrays, objects);
        }
    }
    spec
}

fn apply_to_task_fields(task: &mut PipelineTask, strings: &Strings, arrays: &Arrays, objects: &Objects) {
    replace_param_values(&mut task.params, strings, arrays, objects);
    replace_param_values(&mut task.matrix, strings, arrays, objects);
    for when in &mut task.when_expressions {
        apply_when_replacements(when, strings, arrays);
    }
    for binding in &mut task.workspaces {
        if let Some(sub_path) = &mut binding.sub_path {
            *sub_path = substitution::apply_replacements(sub_path, strings);
        }
    }
}

fn replace_param_values(params: &mut [Param], strings: &Strings, arrays: &Arrays, objects: &Objects) {
    for param in params {
        param.value.apply_replacements(strings, arrays, objects);
    }
}

fn apply_when_replacements(when: &mut WhenExpression, strings: &Strings, arrays: &Arrays) {
    when.input = substitution::apply_replacements(&when.input, strings);
    let mut values = Vec::with_capacity(when.values.len());
    for value in &when.values {
        values.extend(substitution::apply_array_replacements(value, strings, arrays));
    }
    when.values = values;
}

/// Push pipeline-scope replacements into an embedded task body, shadowed per
/// parameter name by the body's own defaults and by task-level overrides.
fn propagate_into_embedded_spec(
    task: &mut PipelineTask,
    strings: &Strings,
    arrays: &Arrays,
    objects: &Objects,
) {
    let overrides = task.params.clone();
    let Some(task_spec) = task.embedded_spec_mut() else {
        return;
    };
    let mut strings = strings.clone();
    let mut arrays = arrays.clone();
    let mut objects = objects.clone();
    for declared in &task_spec.params {
        remove_param_replacements(&declared.name, &mut strings, &mut arrays, &mut objects);
        if let Some(default) = &declared.default {
            insert_param_replacements(&declared.name, default, &mut strings, &mut arrays, &mut objects);
        }
    }
    for param in &overrides {
        remove_param_replacements(&param.name, &mut strings, &mut arrays, &mut objects);
        insert_param_replacements(&param.name, &param.value, &mut strings, &mut arrays, &mut objects);
    }
    apply_task_spec_replacements(task_spec, &strings, &arrays);
}

/// The three interchangeable spellings of a parameter reference key.
fn param_patterns(name: &str) -> [String; 3] {
    [
        format!("params.{name}"),
        format!("params[\"{name}\"]"),
        format!("params['{name}']"),
    ]
}

fn insert_param_replacements(
    name: &str,
    value: &ParamValue,
    strings: &mut Strings,
    arrays: &mut Arrays,
    objects: &mut Objects,
) {
    let patterns = param_patterns(name);
    match value {
        ParamValue::String(s) => {
            for pattern in patterns {
                strings.insert(pattern, s.clone());
            }
        }
        ParamValue::Array(items) => {
            for pattern in &patterns {
                for (i, item) in items.iter().enumerate() {
                    strings.insert(format!("{pattern}[{i}]"), item.clone());
                }
            }
            for pattern in patterns {
                arrays.insert(pattern, items.clone());
            }
        }
        ParamValue::Object(entries) => {
            for (key, value) in entries {
                strings.insert(format!("params.{name}.{key}"), value.clone());
            }
            for pattern in patterns {
                objects.insert(pattern, entries.clone());
            }
        }
    }
}

/// Drop every replacement key derived from a parameter name, including
/// per-index and per-object-key entries.
fn remove_param_replacements(name: &str, strings: &mut Strings, arrays: &mut Arrays, objects: &mut Objects) {
    let patterns = param_patterns(name);
    let key_prefix = format!("params.{name}.");
    strings.retain(|key, _| {
        !patterns.iter().any(|p| key == p || key.starts_with(&format!("{p}[")))
            && !key.starts_with(&key_prefix)
    });
    arrays.retain(|key, _| !patterns.iter().any(|p| key == p));
    objects.retain(|key, _| !patterns.iter().any(|p| key == p));
}

fn apply_task_spec_replacements(spec: &mut TaskSpec, strings: &Strings, arrays: &Arrays) {
    for step in &mut spec.steps {
        apply_step_replacements(step, strings, arrays);
    }
    if let Some(template) = &mut spec.step_template {
        apply_step_template_replacements(template, strings, arrays);
    }
    for sidecar in &mut spec.sidecars {
        apply_sidecar_replacements(sidecar, strings, arrays);
    }
}

fn apply_step_replacements(step: &mut Step, strings: &Strings, arrays: &Arrays) {
    step.image = substitution::apply_replacements(&step.image, strings);
    step.script = substitution::apply_replacements(&step.script, strings);
    if let Some(dir) = &mut step.working_dir {
        *dir = substitution::apply_replacements(dir, strings);
    }
    apply_command_args(&mut step.command, &mut step.args, strings, arrays);
    for env in &mut step.env {
        env.value = substitution::apply_replacements(&env.value, strings);
    }
    for mount in &mut step.volume_mounts {
        mount.name = substitution::apply_replacements(&mount.name, strings);
        mount.mount_path = substitution::apply_replacements(&mount.mount_path, strings);
        if let Some(sub_path) = &mut mount.sub_path {
            *sub_path = substitution::apply_replacements(sub_path, strings);
        }
    }
}

fn apply_step_template_replacements(template: &mut StepTemplate, strings: &Strings, arrays: &Arrays) {
    if let Some(image) = &mut template.image {
        *image = substitution::apply_replacements(image, strings);
    }
    if let Some(dir) = &mut template.working_dir {
        *dir = substitution::apply_replacements(dir, strings);
    }
    apply_command_args(&mut template.command, &mut template.args, strings, arrays);
    for env in &mut template.env {
        env.value = substitution::apply_replacements(&env.value, strings);
    }
}

fn apply_sidecar_replacements(sidecar: &mut Sidecar, strings: &Strings, arrays: &Arrays) {
    sidecar.image = substitution::apply_replacements(&sidecar.image, strings);
    sidecar.script = substitution::apply_replacements(&sidecar.script, strings);
    apply_command_args(&mut sidecar.command, &mut sidecar.args, strings, arrays);
    for env in &mut sidecar.env {
        env.value = substitution::apply_replacements(&env.value, strings);
    }
}

fn apply_command_args(command: &mut Vec<String>, args: &mut Vec<String>, strings: &Strings, arrays: &Arrays) {
    for list in [command, args] {
        let mut next = Vec::with_capacity(list.len());
        for item in list.iter() {
            next.extend(substitution::apply_array_replacements(item, strings, arrays));
        }
        *list = next;
    }
}
