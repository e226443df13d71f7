//! Admission validation for task specifications
//!
//! Checks run in order from structural to referential, returning the first
//! error qualified with the path of the offending field. A spec validated
//! during deletion is skipped entirely; a spec that already went through
//! substitution skips the script variable checks, since resolved scripts may
//! legitimately contain text that looks like a reference.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use crate::config::{ApiFields, ValidationContext};
use crate::error::FieldError;
use crate::param::{ParamSpec, ParamType, ParamValue};
use crate::substitution;
use crate::task::{Sidecar, Step, StepTemplate, TaskResult, TaskSpec, Volume, WorkspaceDeclaration};

/// Parameter names usable in string and array declarations.
static PARAM_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][-a-zA-Z0-9_.]*$").expect("param name regex"));

/// Object parameter names and keys additionally exclude dots, which would be
/// ambiguous with key access.
static OBJECT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][-a-zA-Z0-9_]*$").expect("object name regex"));

static RESULT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("result name regex"));

static DNS_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("dns label regex"));

const RESULT_NAME_DETAILS: &str = "Name must consist of alphanumeric characters, '-', '_', and must start and end with an alphanumeric character (e.g. 'MyName',  or 'my-name',  or 'my_name', regex used for validation is '^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$')";

const STEP_NAME_DETAILS: &str = "Task step name must be a valid DNS Label, For more info refer to https://kubernetes.io/docs/concepts/overview/working-with-objects/names/#names";

const PARAM_NAME_DETAILS: &str = "String/Array Names: \nMust only contain alphanumeric characters, hyphens (-), underscores (_), and dots (.)\nMust begin with a letter or an underscore (_)";

const OBJECT_NAME_DETAILS: &str = "Object Names: \nMust only contain alphanumeric characters, hyphens (-), underscores (_) \nMust begin with a letter or an underscore (_)";

/// A named task definition as submitted for admission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub name: String,
    pub spec: TaskSpec,
}

impl Task {
    /// Validate the task. Deletion skips spec checks: the object is going
    /// away and may predate the current rules.
    pub fn validate(&self, ctx: &ValidationContext) -> Result<(), FieldError> {
        if ctx.within_delete {
            return Ok(());
        }
        self.spec.validate(ctx).map_err(|e| e.via_field("spec"))
    }
}

impl TaskSpec {
    pub fn validate(&self, ctx: &ValidationContext) -> Result<(), FieldError> {
        if self.steps.is_empty() {
            return Err(FieldError::missing_field("steps"));
        }
        validate_volumes(&self.volumes)?;
        validate_declared_workspaces(&self.workspaces, &self.steps, self.step_template.as_ref())?;
        validate_workspace_usages(ctx, self)?;
        validate_steps(ctx, &self.steps)?;
        validate_parameter_types(&self.params)?;
        validate_parameter_variables(ctx, self)?;
        validate_context_variables(ctx, &self.steps)?;
        validate_results(ctx, &self.results)?;
        Ok(())
    }
}

fn require_api_fields(
    ctx: &ValidationContext,
    required: ApiFields,
    feature: &str,
    path: impl Into<String>,
) -> Result<(), FieldError> {
    if ctx.api_fields.enables(required) {
        Ok(())
    } else {
        Err(FieldError::new(
            format!(
                "{feature} requires \"{required}\" feature gate enabled but it is \"{}\"",
                ctx.api_fields
            ),
            path,
        ))
    }
}

fn validate_volumes(volumes: &[Volume]) -> Result<(), FieldError> {
    let mut seen = HashSet::new();
    for (i, volume) in volumes.iter().enumerate() {
        if !seen.insert(volume.name.as_str()) {
            return Err(FieldError::new(
                format!("multiple volumes with same name \"{}\"", volume.name),
                format!("volumes[{i}].name"),
            ));
        }
    }
    Ok(())
}

/// Declared workspaces need unique names and mount paths, and must not
/// collide with any volume mount path already claimed by a step or the step
/// template.
fn validate_declared_workspaces(
    workspaces: &[WorkspaceDeclaration],
    steps: &[Step],
    step_template: Option<&StepTemplate>,
) -> Result<(), FieldError> {
    let mut mount_paths: HashSet<String> = HashSet::new();
    if let Some(template) = step_template {
        for mount in &template.volume_mounts {
            mount_paths.insert(clean_path(&mount.mount_path));
        }
    }
    for step in steps {
        for mount in &step.volume_mounts {
            mount_paths.insert(clean_path(&mount.mount_path));
        }
    }

    let mut names = HashSet::new();
    for (i, workspace) in workspaces.iter().enumerate() {
        if !names.insert(workspace.name.as_str()) {
            return Err(FieldError::new(
                format!("workspace name \"{}\" must be unique", workspace.name),
                format!("workspaces[{i}].name"),
            ));
        }
        let path = clean_path(&workspace.effective_mount_path());
        if !mount_paths.insert(path.clone()) {
            return Err(FieldError::new(
                format!("workspace mount path \"{path}\" must be unique"),
                format!("workspaces[{i}].mountpath"),
            ));
        }
    }
    Ok(())
}

/// Normalize a mount path for collision checks: trailing slashes don't make
/// a path distinct.
fn clean_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Step- and sidecar-scoped workspace usage is alpha surface and must name a
/// declared workspace.
fn validate_workspace_usages(ctx: &ValidationContext, spec: &TaskSpec) -> Result<(), FieldError> {
    let declared: HashSet<&str> = spec.workspaces.iter().map(|w| w.name.as_str()).collect();
    for (i, step) in spec.steps.iter().enumerate() {
        for (j, usage) in step.workspaces.iter().enumerate() {
            require_api_fields(
                ctx,
                ApiFields::Alpha,
                "step workspaces",
                format!("steps[{i}].workspaces[{j}]"),
            )?;
            if !declared.contains(usage.name.as_str()) {
                return Err(FieldError::new(
                    format!("undefined workspace \"{}\"", usage.name),
                    format!("steps[{i}].workspaces[{j}].name"),
                ));
            }
        }
    }
    for (i, sidecar) in spec.sidecars.iter().enumerate() {
        for (j, usage) in sidecar.workspaces.iter().enumerate() {
            require_api_fields(
                ctx,
                ApiFields::Alpha,
                "sidecar workspaces",
                format!("sidecars[{i}].workspaces[{j}]"),
            )?;
            if !declared.contains(usage.name.as_str()) {
                return Err(FieldError::new(
                    format!("undefined workspace \"{}\"", usage.name),
                    format!("sidecars[{i}].workspaces[{j}].name"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_steps(ctx: &ValidationContext, steps: &[Step]) -> Result<(), FieldError> {
    for (i, step) in steps.iter().enumerate() {
        let root = format!("steps[{i}]");
        if !step.script.is_empty() && !step.command.is_empty() {
            return Err(FieldError::new(
                "script cannot be used with command",
                format!("{root}.script"),
            ));
        }
        if step.script.trim_start().starts_with("#!win") {
            require_api_fields(
                ctx,
                ApiFields::Alpha,
                "windows script support",
                format!("{root}.script"),
            )?;
        }
        if let Some(name) = &step.name {
            if name.len() > 63 || !DNS_LABEL_RE.is_match(name) {
                return Err(FieldError::new(
                    format!("invalid value {name:?}"),
                    format!("{root}.name"),
                )
                .details(STEP_NAME_DETAILS));
            }
        }
        if let Some(timeout) = step.timeout_seconds {
            if timeout < 0 {
                return Err(FieldError::invalid_value(
                    format!("{timeout}s"),
                    format!("{root}.negative timeout"),
                ));
            }
        }
        for (j, mount) in step.volume_mounts.iter().enumerate() {
            if mount.mount_path.starts_with("/tekton/")
                && !mount.mount_path.starts_with("/tekton/home")
            {
                return Err(FieldError::new(
                    format!(
                        "volumeMount cannot be mounted under /tekton/ (volumeMount \"{}\" mounted at \"{}\")",
                        mount.name, mount.mount_path
                    ),
                    format!("{root}.volumeMounts[{j}].mountPath"),
                ));
            }
            if mount.name.starts_with("tekton-internal-") {
                return Err(FieldError::new(
                    format!(
                        "volumeMount name \"{}\" cannot start with \"tekton-internal-\"",
                        mount.name
                    ),
                    format!("{root}.volumeMounts[{j}].name"),
                ));
            }
        }
        if let Some(on_error) = &step.on_error {
            require_api_fields(ctx, ApiFields::Alpha, "step onError", "onError")?;
            if on_error != "continue" && on_error != "stopAndFail" {
                return Err(FieldError::invalid_value(on_error, "onError")
                    .details("Task step onError must be either continue or stopAndFail"));
            }
        }
        if step.stdout_config.is_some() {
            require_api_fields(
                ctx,
                ApiFields::Alpha,
                "step stdout stream support",
                format!("{root}.stdoutConfig"),
            )?;
        }
        if step.stderr_config.is_some() {
            require_api_fields(
                ctx,
                ApiFields::Alpha,
                "step stderr stream support",
                format!("{root}.stderrConfig"),
            )?;
        }
    }
    Ok(())
}

fn validate_parameter_types(params: &[ParamSpec]) -> Result<(), FieldError> {
    for param in params {
        let name = &param.name;
        let declared = match param.param_type.as_deref() {
            None => param.effective_type(),
            Some("string") => Some(ParamType::String),
            Some("array") => Some(ParamType::Array),
            Some("object") => Some(ParamType::Object),
            Some(other) => {
                return Err(FieldError::invalid_value(other, format!("params.{name}.type")));
            }
        };
        // With an unknown author intent nothing below applies.
        let Some(declared) = declared else { continue };

        if let Some(default) = &param.default {
            if default.param_type() != declared {
                return Err(FieldError::with_paths(
                    format!(
                        "\"{declared}\" type does not match default value's type: \"{}\"",
                        default.param_type()
                    ),
                    vec![
                        format!("params.{name}.type"),
                        format!("params.{name}.default.type"),
                    ],
                ));
            }
        }

        if declared == ParamType::Object {
            let Some(properties) = &param.properties else {
                return Err(FieldError::missing_field(format!("params.{name}.properties")));
            };
            let mut bad_types: Vec<&str> = properties
                .iter()
                .filter(|(_, spec)| {
                    !matches!(spec.property_type.as_deref(), None | Some("") | Some("string"))
                })
                .map(|(key, _)| key.as_str())
                .collect();
            bad_types.sort_unstable();
            if !bad_types.is_empty() {
                return Err(FieldError::new(
                    format!("The value type specified for these keys {bad_types:?} is invalid"),
                    format!("params.{name}.properties"),
                ));
            }
            if let Some(ParamValue::Object(default)) = &param.default {
                let mut missing: Vec<&str> = properties
                    .keys()
                    .filter(|key| !default.contains_key(*key))
                    .map(String::as_str)
                    .collect();
                missing.sort_unstable();
                if !missing.is_empty() {
                    return Err(FieldError::with_paths(
                        format!("Required key(s) {missing:?} are missing in the value provider."),
                        vec![format!("{name}.properties"), format!("{name}.default")],
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Names declared by the parameter list, bucketed by how step fields may
/// reference them.
struct DeclaredNames {
    /// Everything a reference may resolve to, including `object.key` forms.
    usable: HashSet<String>,
    /// Array and object names: never legal in a scalar-only field.
    non_scalar: HashSet<String>,
    /// Object names: never legal in array fields either.
    objects: HashSet<String>,
}

fn validate_parameter_variables(ctx: &ValidationContext, spec: &TaskSpec) -> Result<(), FieldError> {
    let params = &spec.params;

    let mut invalid_names: Vec<String> = Vec::new();
    let mut invalid_objects: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for param in params {
        if param.effective_type() == Some(ParamType::Object) {
            let mut bad_keys: Vec<String> = param
                .properties
                .iter()
                .flat_map(|props| props.keys())
                .filter(|key| !OBJECT_NAME_RE.is_match(key))
                .cloned()
                .collect();
            bad_keys.sort_unstable();
            if !OBJECT_NAME_RE.is_match(&param.name) || !bad_keys.is_empty() {
                invalid_objects.insert(param.name.clone(), bad_keys);
            }
        } else if !PARAM_NAME_RE.is_match(&param.name) {
            invalid_names.push(param.name.clone());
        }
    }
    if !invalid_names.is_empty() {
        invalid_names.sort_unstable();
        return Err(FieldError::new(
            format!(
                "The format of following array and string variable names is invalid: {invalid_names:?}"
            ),
            "params",
        )
        .details(PARAM_NAME_DETAILS));
    }
    if !invalid_objects.is_empty() {
        return Err(FieldError::new(
            format!("Object param name and key name format is invalid: {invalid_objects:?}"),
            "params",
        )
        .details(OBJECT_NAME_DETAILS));
    }

    let mut seen = HashSet::new();
    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(FieldError::new(
                "parameter appears more than once",
                format!("params[{}]", param.name),
            ));
        }
    }

    let mut declared = DeclaredNames {
        usable: HashSet::new(),
        non_scalar: HashSet::new(),
        objects: HashSet::new(),
    };
    for param in params {
        declared.usable.insert(param.name.clone());
        match param.effective_type() {
            Some(ParamType::Array) => {
                declared.non_scalar.insert(param.name.clone());
            }
            Some(ParamType::Object) => {
                declared.non_scalar.insert(param.name.clone());
                declared.objects.insert(param.name.clone());
                for key in param.properties.iter().flat_map(|props| props.keys()) {
                    declared.usable.insert(format!("{}.{key}", param.name));
                }
            }
            _ => {}
        }
    }

    for (i, step) in spec.steps.iter().enumerate() {
        validate_step_param_variables(ctx, step, &format!("steps[{i}]"), &declared)?;
    }
    for (i, sidecar) in spec.sidecars.iter().enumerate() {
        validate_sidecar_param_variables(ctx, sidecar, &format!("sidecars[{i}]"), &declared)?;
    }
    if let Some(template) = &spec.step_template {
        validate_template_param_variables(template, &declared)?;
    }
    Ok(())
}

/// A scalar-only field: references must exist and must not name an array or
/// object.
fn check_scalar(value: &str, path: String, declared: &DeclaredNames) -> Result<(), FieldError> {
    substitution::validate_variable(value, "params", &declared.usable)
        .map_err(|e| e.via_field(&path))?;
    substitution::validate_variable_prohibited(value, "params", &declared.non_scalar)
        .map_err(|e| e.via_field(&path))?;
    Ok(())
}

/// An array-capable field element: references must exist, objects are never
/// legal, and array references must stand alone so they can splice.
fn check_array_element(value: &str, path: String, declared: &DeclaredNames) -> Result<(), FieldError> {
    substitution::validate_variable(value, "params", &declared.usable)
        .map_err(|e| e.via_field(&path))?;
    substitution::validate_variable_prohibited(value, "params", &declared.objects)
        .map_err(|e| e.via_field(&path))?;
    substitution::validate_variable_isolated(value, "params", &declared.non_scalar)
        .map_err(|e| e.via_field(&path))?;
    Ok(())
}

fn validate_step_param_variables(
    ctx: &ValidationContext,
    step: &Step,
    root: &str,
    declared: &DeclaredNames,
) -> Result<(), FieldError> {
    check_scalar(&step.image, format!("{root}.image"), declared)?;
    if !ctx.within_substituted {
        check_scalar(&step.script, format!("{root}.script"), declared)?;
    }
    if let Some(dir) = &step.working_dir {
        check_scalar(dir, format!("{root}.workingDir"), declared)?;
    }
    for (j, value) in step.command.iter().enumerate() {
        check_array_element(value, format!("{root}.command[{j}]"), declared)?;
    }
    for (j, value) in step.args.iter().enumerate() {
        check_array_element(value, format!("{root}.args[{j}]"), declared)?;
    }
    for (j, env) in step.env.iter().enumerate() {
        check_scalar(&env.value, format!("{root}.env[{j}].value"), declared)?;
    }
    for (j, mount) in step.volume_mounts.iter().enumerate() {
        check_scalar(&mount.name, format!("{root}.volumeMount[{j}].name"), declared)?;
        check_scalar(&mount.mount_path, format!("{root}.volumeMount[{j}].mountPath"), declared)?;
        if let Some(sub_path) = &mount.sub_path {
            check_scalar(sub_path, format!("{root}.volumeMount[{j}].subPath"), declared)?;
        }
    }
    Ok(())
}

fn validate_sidecar_param_variables(
    ctx: &ValidationContext,
    sidecar: &Sidecar,
    root: &str,
    declared: &DeclaredNames,
) -> Result<(), FieldError> {
    check_scalar(&sidecar.image, format!("{root}.image"), declared)?;
    if !ctx.within_substituted {
        check_scalar(&sidecar.script, format!("{root}.script"), declared)?;
    }
    for (j, value) in sidecar.command.iter().enumerate() {
        check_array_element(value, format!("{root}.command[{j}]"), declared)?;
    }
    for (j, value) in sidecar.args.iter().enumerate() {
        check_array_element(value, format!("{root}.args[{j}]"), declared)?;
    }
    for (j, env) in sidecar.env.iter().enumerate() {
        check_scalar(&env.value, format!("{root}.env[{j}].value"), declared)?;
    }
    Ok(())
}

fn validate_template_param_variables(
    template: &StepTemplate,
    declared: &DeclaredNames,
) -> Result<(), FieldError> {
    if let Some(image) = &template.image {
        check_scalar(image, "stepTemplate.image".to_string(), declared)?;
    }
    if let Some(dir) = &template.working_dir {
        check_scalar(dir, "stepTemplate.workingDir".to_string(), declared)?;
    }
    for (j, value) in template.command.iter().enumerate() {
        check_array_element(value, format!("stepTemplate.command[{j}]"), declared)?;
    }
    for (j, value) in template.args.iter().enumerate() {
        check_array_element(value, format!("stepTemplate.args[{j}]"), declared)?;
    }
    for (j, env) in template.env.iter().enumerate() {
        check_scalar(&env.value, format!("stepTemplate.env[{j}].value"), declared)?;
    }
    Ok(())
}

/// References in the task-local context scopes must name a known key.
/// `context.taskRun` exposes name, namespace, and uid; `context.task`
/// exposes name and retry-count.
fn validate_context_variables(ctx: &ValidationContext, steps: &[Step]) -> Result<(), FieldError> {
    let task_run_names: HashSet<String> = ["name", "namespace", "uid"]
        .into_iter()
        .map(String::from)
        .collect();
    let task_names: HashSet<String> = ["name", "retry-count"]
        .into_iter()
        .map(String::from)
        .collect();
    for (i, step) in steps.iter().enumerate() {
        let root = format!("steps[{i}]");
        let mut values: Vec<(&str, String)> = vec![(step.image.as_str(), format!("{root}.image"))];
        if !ctx.within_substituted {
            values.push((step.script.as_str(), format!("{root}.script")));
        }
        if let Some(dir) = &step.working_dir {
            values.push((dir.as_str(), format!("{root}.workingDir")));
        }
        for (j, value) in step.command.iter().enumerate() {
            values.push((value.as_str(), format!("{root}.command[{j}]")));
        }
        for (j, value) in step.args.iter().enumerate() {
            values.push((value.as_str(), format!("{root}.args[{j}]")));
        }
        for (j, env) in step.env.iter().enumerate() {
            values.push((env.value.as_str(), format!("{root}.env[{j}].value")));
        }
        for (value, path) in values {
            substitution::validate_variable(value, "context.taskRun", &task_run_names)
                .map_err(|e| e.via_field(&path))?;
            substitution::validate_variable(value, "context.task", &task_names)
                .map_err(|e| e.via_field(&path))?;
        }
    }
    Ok(())
}

fn validate_results(ctx: &ValidationContext, results: &[TaskResult]) -> Result<(), FieldError> {
    for (i, result) in results.iter().enumerate() {
        if !RESULT_NAME_RE.is_match(&result.name) {
            return Err(FieldError::new(
                format!("invalid key name {:?}", result.name),
                format!("results[{i}].name"),
            )
            .details(RESULT_NAME_DETAILS));
        }
        match result.result_type.as_deref() {
            None | Some("string") => {}
            Some("array") | Some("object") => {
                require_api_fields(ctx, ApiFields::Alpha, "results type", format!("results[{i}].type"))?;
            }
            Some(other) => {
                return Err(FieldError::invalid_value(other, format!("results[{i}].type"))
                    .details("type must be string"));
            }
        }
    }
    Ok(())
}
