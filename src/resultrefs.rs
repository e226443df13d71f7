//! Task result references
//!
//! `tasks.<task>.results.<result>` references tie a consumer to a producer's
//! output. A `ResolvedResultRef` pairs such a reference with the value the
//! producer actually reported; sets of resolved refs compile down to the
//! replacement maps the substitution kernel consumes, covering the dotted and
//! both bracket-quoted spellings of the result name plus the per-index and
//! per-key derived keys.

use std::collections::HashMap;

use crate::param::ParamValue;

/// Scope prefix of task result references.
pub const RESULT_TASK_PART: &str = "tasks";
/// Path segment between task name and result name.
pub const RESULT_RESULT_PART: &str = "results";

/// A parsed reference to one task's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRef {
    pub pipeline_task: String,
    pub result: String,
}

impl ResultRef {
    pub fn new(pipeline_task: impl Into<String>, result: impl Into<String>) -> Self {
        ResultRef {
            pipeline_task: pipeline_task.into(),
            result: result.into(),
        }
    }

    /// The replacement-map keys this reference answers to, one per spelling.
    pub fn replace_targets(&self) -> [String; 3] {
        let ResultRef {
            pipeline_task: task,
            result,
        } = self;
        [
            format!("{RESULT_TASK_PART}.{task}.{RESULT_RESULT_PART}.{result}"),
            format!("{RESULT_TASK_PART}.{task}.{RESULT_RESULT_PART}[\"{result}\"]"),
            format!("{RESULT_TASK_PART}.{task}.{RESULT_RESULT_PART}['{result}']"),
        ]
    }
}

/// A result reference joined with the value its producer reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResultRef {
    pub value: ParamValue,
    pub result_reference: ResultRef,
    pub from_task_run: String,
}

/// String-valued replacement keys for a set of resolved refs. Array values
/// contribute per-index keys, object values per-key keys, string values the
/// bare reference.
pub fn string_replacements(refs: &[ResolvedResultRef]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for resolved in refs {
        let targets = resolved.result_reference.replace_targets();
        match &resolved.value {
            ParamValue::String(s) => {
                for target in &targets {
                    out.insert(target.clone(), s.clone());
                }
            }
            ParamValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    for target in &targets {
                        out.insert(format!("{target}[{i}]"), item.clone());
                    }
                }
            }
            ParamValue::Object(entries) => {
                for (key, value) in entries {
                    for target in &targets {
                        out.insert(format!("{target}.{key}"), value.clone());
                    }
                }
            }
        }
    }
    out
}

/// Whole-array replacement keys for array-valued refs.
pub fn array_replacements(refs: &[ResolvedResultRef]) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    for resolved in refs {
        if let ParamValue::Array(items) = &resolved.value {
            for target in resolved.result_reference.replace_targets() {
                out.insert(target, items.clone());
            }
        }
    }
    out
}

/// Whole-object replacement keys for object-valued refs.
pub fn object_replacements(refs: &[ResolvedResultRef]) -> HashMap<String, HashMap<String, String>> {
    let mut out = HashMap::new();
    for resolved in refs {
        if let ParamValue::Object(entries) = &resolved.value {
            for target in resolved.result_reference.replace_targets() {
                out.insert(target, entries.clone());
            }
        }
    }
    out
}

/// How a pipeline-result expression addresses the referenced result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultAccessor {
    /// The whole value.
    Whole,
    /// One array element.
    Index(usize),
    /// `[*]`, the whole value spliced or expanded.
    Star,
    /// One object key.
    Key(String),
}

/// A pipeline-result expression body, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResultRef {
    pub pipeline_task: String,
    pub result: String,
    pub accessor: ResultAccessor,
}

/// Parse an expression body found in a declared pipeline result value.
///
/// Accepts `tasks.<t>.results.<r>`, optionally suffixed `[N]` or `[*]`, and
/// `tasks.<t>.results.<r>.<key>` for one object key. Anything else (wrong
/// scope, too few or too many segments) is not a valid result reference.
pub fn parse_result_expression(body: &str) -> Option<PipelineResultRef> {
    let parts: Vec<&str> = body.split('.').collect();
    if parts.len() < 4 || parts[0] != RESULT_TASK_PART || parts[2] != RESULT_RESULT_PART {
        return None;
    }
    match parts.len() {
        4 => {
            let (result, accessor) = parse_accessor(parts[3])?;
            Some(PipelineResultRef {
                pipeline_task: parts[1].to_string(),
                result: result.to_string(),
                accessor,
            })
        }
        5 => {
            if parts[3].contains('[') || parts[4].contains('[') {
                return None;
            }
            Some(PipelineResultRef {
                pipeline_task: parts[1].to_string(),
                result: parts[3].to_string(),
                accessor: ResultAccessor::Key(parts[4].to_string()),
            })
        }
        _ => None,
    }
}

fn parse_accessor(segment: &str) -> Option<(&str, ResultAccessor)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, ResultAccessor::Whole));
    };
    let name = &segment[..open];
    let inner = segment[open..].strip_prefix('[')?.strip_suffix(']')?;
    if name.is_empty() {
        return None;
    }
    if inner == "*" {
        Some((name, ResultAccessor::Star))
    } else {
        inner.parse::<usize>().ok().map(|i| (name, ResultAccessor::Index(i)))
    }
}
