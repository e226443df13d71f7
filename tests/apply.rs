//! End-to-end coverage of the resolution passes over realistic specs.

use std::collections::HashMap;
use std::sync::Once;

use skein::apply::{
    apply_contexts, apply_parameters, apply_pipeline_task_contexts,
    apply_pipeline_task_state_context, apply_task_results, apply_task_results_to_pipeline_results,
    apply_workspaces,
};
use skein::param::{Param, ParamValue};
use skein::pipeline::{
    CustomRunResult, PipelineResult, PipelineRun, PipelineRunResult, PipelineRunState,
    PipelineSpec, PipelineTask, ResolvedPipelineTask,
};
use skein::resultrefs::{ResolvedResultRef, ResultRef};
use skein::task::TaskRunResult;
use skein::{ApiFields, SkeinError};

static TRACING: Once = Once::new();

/// Routes the passes' debug logs through RUST_LOG when a run wants them.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn spec(yaml: &str) -> PipelineSpec {
    init_tracing();
    PipelineSpec::from_yaml(yaml).expect("pipeline spec fixture")
}

fn task(yaml: &str) -> PipelineTask {
    init_tracing();
    serde_yaml::from_str(yaml).expect("pipeline task fixture")
}

fn run_with_params(params: Vec<Param>) -> PipelineRun {
    PipelineRun {
        params,
        ..Default::default()
    }
}

fn state_of(tasks: Vec<PipelineTask>) -> PipelineRunState {
    tasks.into_iter().map(ResolvedPipelineTask::new).collect()
}

fn resolved_ref(task: &str, result: &str, value: ParamValue) -> ResolvedResultRef {
    ResolvedResultRef {
        value,
        result_reference: ResultRef::new(task, result),
        from_task_run: format!("{task}-run"),
    }
}

// ---------------------------------------------------------------------------
// apply_parameters

#[test]
fn parameters_default_used_when_run_says_nothing() {
    let spec = spec(
        r#"
params:
  - name: first-param
    type: string
    default: default-value
tasks:
  - name: first-task
    params:
      - name: first-task-param
        value: $(params.first-param)
"#,
    );
    let run = PipelineRun::default();
    let applied = apply_parameters(ApiFields::Stable, &spec, &run);
    assert_eq!(
        applied.tasks[0].params[0].value,
        ParamValue::string("default-value")
    );
}

#[test]
fn parameters_run_value_overrides_default() {
    let spec = spec(
        r#"
params:
  - name: first-param
    type: string
    default: default-value
tasks:
  - name: first-task
    params:
      - name: a
        value: $(params.first-param)
      - name: b
        value: $(params["first-param"])
      - name: c
        value: $(params['first-param'])
"#,
    );
    let run = run_with_params(vec![Param::new("first-param", "run-value")]);
    let applied = apply_parameters(ApiFields::Stable, &spec, &run);
    for param in &applied.tasks[0].params {
        assert_eq!(param.value, ParamValue::string("run-value"), "{}", param.name);
    }
}

#[test]
fn parameters_array_splices_into_array_param() {
    let spec = spec(
        r#"
params:
  - name: items
    type: array
tasks:
  - name: first-task
    params:
      - name: joined
        value: ["firstelement", "$(params.items)"]
"#,
    );
    let run = run_with_params(vec![Param::new(
        "items",
        ParamValue::array(["a", "b", "c"]),
    )]);
    let applied = apply_parameters(ApiFields::Stable, &spec, &run);
    assert_eq!(
        applied.tasks[0].params[0].value,
        ParamValue::array(["firstelement", "a", "b", "c"])
    );
}

#[test]
fn parameters_array_index_resolves_to_element() {
    let spec = spec(
        r#"
params:
  - name: items
    type: array
    default: ["zero", "one", "two"]
tasks:
  - name: first-task
    params:
      - name: picked
        value: $(params.items[1])
"#,
    );
    let applied = apply_parameters(ApiFields::Stable, &spec, &PipelineRun::default());
    assert_eq!(applied.tasks[0].params[0].value, ParamValue::string("one"));
}

#[test]
fn parameters_object_minimal_reference_changes_type() {
    let spec = spec(
        r#"
params:
  - name: gitrepo
    type: object
    properties:
      url: {}
      branch: {}
tasks:
  - name: first-task
    params:
      - name: whole
        value: $(params.gitrepo[*])
      - name: one-key
        value: $(params.gitrepo.url)
"#,
    );
    let run = run_with_params(vec![Param::new(
        "gitrepo",
        ParamValue::object([("url", "https://example.com/repo"), ("branch", "main")]),
    )]);
    let applied = apply_parameters(ApiFields::Stable, &spec, &run);
    assert_eq!(
        applied.tasks[0].params[0].value,
        ParamValue::object([("url", "https://example.com/repo"), ("branch", "main")])
    );
    assert_eq!(
        applied.tasks[0].params[1].value,
        ParamValue::string("https://example.com/repo")
    );
}

#[test]
fn parameters_apply_to_when_matrix_and_workspace_subpath() {
    let spec = spec(
        r#"
params:
  - name: branch
    type: string
    default: main
  - name: flavors
    type: array
    default: ["debug", "release"]
tasks:
  - name: first-task
    when:
      - input: $(params.branch)
        operator: in
        values: ["$(params.flavors)"]
    matrix:
      - name: flavor
        value: ["$(params.flavors)"]
    workspaces:
      - name: source
        workspace: shared
        subPath: checkouts/$(params.branch)
"#,
    );
    let applied = apply_parameters(ApiFields::Stable, &spec, &PipelineRun::default());
    let task = &applied.tasks[0];
    assert_eq!(task.when_expressions[0].input, "main");
    assert_eq!(task.when_expressions[0].values, vec!["debug", "release"]);
    assert_eq!(
        task.matrix[0].value,
        ParamValue::array(["debug", "release"])
    );
    assert_eq!(
        task.workspaces[0].sub_path.as_deref(),
        Some("checkouts/main")
    );
}

#[test]
fn parameters_apply_to_finally_tasks() {
    let spec = spec(
        r#"
params:
  - name: first-param
    type: string
    default: default-value
finally:
  - name: cleanup
    params:
      - name: v
        value: $(params.first-param)
"#,
    );
    let applied = apply_parameters(ApiFields::Stable, &spec, &PipelineRun::default());
    assert_eq!(
        applied.finally[0].params[0].value,
        ParamValue::string("default-value")
    );
}

#[test]
fn parameters_propagate_into_embedded_spec_only_under_alpha() {
    let yaml = r#"
params:
  - name: HELLO
    type: string
    default: pipeline-default
tasks:
  - name: echo
    taskSpec:
      steps:
        - name: echo
          image: ubuntu
          script: echo $(params.HELLO)
"#;
    let run = run_with_params(vec![Param::new("HELLO", "from the run")]);

    let stable = apply_parameters(ApiFields::Stable, &spec(yaml), &run);
    let untouched = stable.tasks[0].embedded_spec().expect("embedded spec");
    assert_eq!(untouched.steps[0].script, "echo $(params.HELLO)");

    let alpha = apply_parameters(ApiFields::Alpha, &spec(yaml), &run);
    let resolved = alpha.tasks[0].embedded_spec().expect("embedded spec");
    assert_eq!(resolved.steps[0].script, "echo from the run");
}

#[test]
fn parameters_propagation_precedence_is_override_then_default_then_pipeline() {
    // The body declares its own default, so it shadows the pipeline value.
    let default_wins = r#"
params:
  - name: HELLO
    type: string
    default: pipeline-default
tasks:
  - name: echo
    taskSpec:
      params:
        - name: HELLO
          type: string
          default: body-default
      steps:
        - name: echo
          image: ubuntu
          script: echo $(params.HELLO)
"#;
    let run = run_with_params(vec![Param::new("HELLO", "pipeline-value")]);
    let applied = apply_parameters(ApiFields::Alpha, &spec(default_wins), &run);
    let body = applied.tasks[0].embedded_spec().expect("embedded spec");
    assert_eq!(body.steps[0].script, "echo body-default");

    // An explicit task-level override beats the body default too.
    let override_wins = r#"
params:
  - name: HELLO
    type: string
tasks:
  - name: echo
    params:
      - name: HELLO
        value: task-override
    taskSpec:
      params:
        - name: HELLO
          type: string
          default: body-default
      steps:
        - name: echo
          image: ubuntu
          script: echo $(params.HELLO)
"#;
    let applied = apply_parameters(ApiFields::Alpha, &spec(override_wins), &run);
    let body = applied.tasks[0].embedded_spec().expect("embedded spec");
    assert_eq!(body.steps[0].script, "echo task-override");
}

#[test]
fn parameters_pass_is_idempotent() {
    let spec = spec(
        r#"
params:
  - name: p
    type: string
    default: value
tasks:
  - name: t
    params:
      - name: v
        value: $(params.p) and $(params.missing)
"#,
    );
    let once = apply_parameters(ApiFields::Stable, &spec, &PipelineRun::default());
    let twice = apply_parameters(ApiFields::Stable, &once, &PipelineRun::default());
    assert_eq!(once, twice);
    assert_eq!(
        once.tasks[0].params[0].value,
        ParamValue::string("value and $(params.missing)")
    );
}

// ---------------------------------------------------------------------------
// apply_contexts / apply_pipeline_task_contexts / apply_workspaces

#[test]
fn contexts_resolve_pipeline_and_run_identity() {
    let spec = spec(
        r#"
tasks:
  - name: first-task
    params:
      - name: pipeline
        value: $(context.pipeline.name)
      - name: run
        value: $(context.pipelineRun.name)
      - name: namespace
        value: $(context.pipelineRun.namespace)
      - name: uid
        value: $(context.pipelineRun.uid)
"#,
    );
    let run: PipelineRun =
        serde_json::from_str(r#"{"name": "prName", "namespace": "prns", "uid": "prUid"}"#)
            .expect("run fixture");
    let applied = apply_contexts(&spec, "test-pipeline", &run);
    let values: Vec<&ParamValue> = applied.tasks[0].params.iter().map(|p| &p.value).collect();
    assert_eq!(values[0], &ParamValue::string("test-pipeline"));
    assert_eq!(values[1], &ParamValue::string("prName"));
    assert_eq!(values[2], &ParamValue::string("prns"));
    assert_eq!(values[3], &ParamValue::string("prUid"));
}

#[test]
fn contexts_unset_metadata_becomes_empty_string() {
    let spec = spec(
        r#"
tasks:
  - name: first-task
    params:
      - name: run
        value: $(context.pipelineRun.name)-suffix
"#,
    );
    let applied = apply_contexts(&spec, "", &PipelineRun::default());
    assert_eq!(
        applied.tasks[0].params[0].value,
        ParamValue::string("-suffix")
    );
}

#[test]
fn pipeline_task_context_resolves_retries() {
    let with_retries = task(
        r#"
name: retried
retries: 5
params:
  - name: retries
    value: $(context.pipelineTask.retries)
"#,
    );
    let applied = apply_pipeline_task_contexts(&with_retries);
    assert_eq!(applied.params[0].value, ParamValue::string("5"));

    let without = task(
        r#"
name: plain
params:
  - name: retries
    value: $(context.pipelineTask.retries)
"#,
    );
    let applied = apply_pipeline_task_contexts(&without);
    assert_eq!(applied.params[0].value, ParamValue::string("0"));
}

#[test]
fn workspaces_bound_flag_reflects_run_bindings() {
    let spec = spec(
        r#"
workspaces:
  - name: bound-ws
  - name: unbound-ws
    optional: true
tasks:
  - name: first-task
    params:
      - name: has-bound
        value: $(workspaces.bound-ws.bound)
      - name: has-unbound
        value: $(workspaces.unbound-ws.bound)
"#,
    );
    let run: PipelineRun = serde_yaml::from_str(
        r#"
workspaces:
  - name: bound-ws
"#,
    )
    .unwrap();
    let applied = apply_workspaces(&spec, &run);
    assert_eq!(applied.tasks[0].params[0].value, ParamValue::string("true"));
    assert_eq!(applied.tasks[0].params[1].value, ParamValue::string("false"));
}

// ---------------------------------------------------------------------------
// apply_task_results

#[test]
fn task_results_rewrite_params_when_and_matrix() {
    let mut state = state_of(vec![task(
        r#"
name: consumer
params:
  - name: from-result
    value: $(tasks.aTask.results.aResult)
matrix:
  - name: m
    value: ["$(tasks.aTask.results.aResult)"]
when:
  - input: $(tasks.aTask.results.aResult)
    operator: in
    values: ["$(tasks.aTask.results.aResult)"]
"#,
    )]);
    let refs = vec![resolved_ref("aTask", "aResult", ParamValue::string("aResultValue"))];
    apply_task_results(&mut state, &refs);
    let task = &state[0].pipeline_task;
    assert_eq!(task.params[0].value, ParamValue::string("aResultValue"));
    assert_eq!(task.matrix[0].value, ParamValue::array(["aResultValue"]));
    assert_eq!(task.when_expressions[0].input, "aResultValue");
    assert_eq!(task.when_expressions[0].values, vec!["aResultValue"]);
}

#[test]
fn task_results_out_of_range_index_stays_literal() {
    let mut state = state_of(vec![task(
        r#"
name: consumer
params:
  - name: third
    value: $(tasks.aTask.results.aResult[3])
"#,
    )]);
    let refs = vec![resolved_ref(
        "aTask",
        "aResult",
        ParamValue::array(["arrayResultOne", "arrayResultTwo"]),
    )];
    apply_task_results(&mut state, &refs);
    assert_eq!(
        state[0].pipeline_task.params[0].value,
        ParamValue::string("$(tasks.aTask.results.aResult[3])")
    );
}

#[test]
fn task_results_array_star_splices_and_indexes_resolve() {
    let mut state = state_of(vec![task(
        r#"
name: consumer
params:
  - name: whole
    value: ["$(tasks.aTask.results.aResult[*])"]
  - name: first
    value: $(tasks.aTask.results.aResult[0])
"#,
    )]);
    let refs = vec![resolved_ref(
        "aTask",
        "aResult",
        ParamValue::array(["one", "two"]),
    )];
    apply_task_results(&mut state, &refs);
    assert_eq!(
        state[0].pipeline_task.params[0].value,
        ParamValue::array(["one", "two"])
    );
    assert_eq!(
        state[0].pipeline_task.params[1].value,
        ParamValue::string("one")
    );
}

#[test]
fn task_results_object_star_and_key_access() {
    let mut state = state_of(vec![task(
        r#"
name: consumer
params:
  - name: whole
    value: $(tasks.aTask.results.resultName[*])
  - name: key
    value: $(tasks.aTask.results.resultName.commit)
"#,
    )]);
    let refs = vec![resolved_ref(
        "aTask",
        "resultName",
        ParamValue::object([("url", "abc.com"), ("commit", "af234")]),
    )];
    apply_task_results(&mut state, &refs);
    assert_eq!(
        state[0].pipeline_task.params[0].value,
        ParamValue::object([("url", "abc.com"), ("commit", "af234")])
    );
    assert_eq!(
        state[0].pipeline_task.params[1].value,
        ParamValue::string("af234")
    );
}

#[test]
fn task_results_bracket_quoted_name_with_dot() {
    let mut state = state_of(vec![PipelineTask {
        name: "consumer".into(),
        params: vec![Param::new(
            "picked",
            r#"$(tasks.aTask.results["a.Result"][1])"#,
        )],
        ..Default::default()
    }]);
    let refs = vec![resolved_ref(
        "aTask",
        "a.Result",
        ParamValue::array(["one", "two"]),
    )];
    apply_task_results(&mut state, &refs);
    assert_eq!(
        state[0].pipeline_task.params[0].value,
        ParamValue::string("two")
    );
}

#[test]
fn pipeline_task_state_context_resolves_status() {
    let mut state = state_of(vec![task(
        r#"
name: finally-check
when:
  - input: $(tasks.aTask.status)
    operator: in
    values: ["Failed"]
"#,
    )]);
    let replacements: HashMap<String, String> =
        [("tasks.aTask.status".to_string(), "Succeeded".to_string())].into();
    apply_pipeline_task_state_context(&mut state, &replacements);
    assert_eq!(state[0].pipeline_task.when_expressions[0].input, "Succeeded");
}

// ---------------------------------------------------------------------------
// apply_task_results_to_pipeline_results

fn task_results(entries: &[(&str, &str, ParamValue)]) -> HashMap<String, Vec<TaskRunResult>> {
    init_tracing();
    let mut out: HashMap<String, Vec<TaskRunResult>> = HashMap::new();
    for (task, name, value) in entries {
        out.entry(task.to_string())
            .or_default()
            .push(TaskRunResult::new(*name, value.clone()));
    }
    out
}

#[test]
fn pipeline_results_resolve_string_array_and_object_references() {
    let results = vec![
        PipelineResult {
            name: "pipeline-string".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.foo)"),
        },
        PipelineResult {
            name: "pipeline-array".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt2.results.bar[*])"),
        },
        PipelineResult {
            name: "pipeline-object".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt3.results.gitrepo[*])"),
        },
    ];
    let task_results = task_results(&[
        ("pt1", "foo", ParamValue::string("do")),
        ("pt2", "bar", ParamValue::array(["do", "rae"])),
        ("pt3", "gitrepo", ParamValue::object([("url", "abc.com")])),
    ]);
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &task_results, &HashMap::new());
    assert_eq!(err, None);
    assert_eq!(
        resolved,
        vec![
            PipelineRunResult {
                name: "pipeline-string".into(),
                value: ParamValue::string("do"),
            },
            PipelineRunResult {
                name: "pipeline-array".into(),
                value: ParamValue::array(["do", "rae"]),
            },
            PipelineRunResult {
                name: "pipeline-object".into(),
                value: ParamValue::object([("url", "abc.com")]),
            },
        ]
    );
}

#[test]
fn pipeline_results_embed_multiple_references_in_one_string() {
    let results = vec![PipelineResult {
        name: "pipeline-result-1".into(),
        description: None,
        value: ParamValue::string(
            "$(tasks.pt1.results.foo), $(tasks.pt2.results.baz), $(tasks.pt1.results.bar), $(tasks.pt2.results.baz), $(tasks.pt1.results.foo)",
        ),
    }];
    let task_results = task_results(&[
        ("pt1", "foo", ParamValue::string("do")),
        ("pt1", "bar", ParamValue::string("mi")),
        ("pt2", "baz", ParamValue::string("rae")),
    ]);
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &task_results, &HashMap::new());
    assert_eq!(err, None);
    assert_eq!(resolved[0].value, ParamValue::string("do, rae, mi, rae, do"));
}

#[test]
fn pipeline_results_index_and_object_key_access() {
    let results = vec![
        PipelineResult {
            name: "indexed".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.foo[1])"),
        },
        PipelineResult {
            name: "keyed".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt2.results.gitrepo.commit)"),
        },
    ];
    let task_results = task_results(&[
        ("pt1", "foo", ParamValue::array(["do", "rae", "mi"])),
        ("pt2", "gitrepo", ParamValue::object([("commit", "af234"), ("url", "abc.com")])),
    ]);
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &task_results, &HashMap::new());
    assert_eq!(err, None);
    assert_eq!(resolved[0].value, ParamValue::string("rae"));
    assert_eq!(resolved[1].value, ParamValue::string("af234"));
}

#[test]
fn pipeline_results_literal_value_is_omitted_silently() {
    let results = vec![PipelineResult {
        name: "static".into(),
        description: None,
        value: ParamValue::string("just a literal"),
    }];
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &HashMap::new(), &HashMap::new());
    assert_eq!(err, None);
    assert!(resolved.is_empty());
}

#[test]
fn pipeline_results_fall_back_to_custom_run_results() {
    let results = vec![PipelineResult {
        name: "from-custom".into(),
        description: None,
        value: ParamValue::string("$(tasks.customtask.results.foo)"),
    }];
    let custom: HashMap<String, Vec<CustomRunResult>> = [(
        "customtask".to_string(),
        vec![CustomRunResult {
            name: "foo".into(),
            value: "bar".into(),
        }],
    )]
    .into();
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &HashMap::new(), &custom);
    assert_eq!(err, None);
    assert_eq!(resolved[0].value, ParamValue::string("bar"));
}

#[test]
fn pipeline_results_prefer_task_results_over_custom_run_results() {
    let results = vec![PipelineResult {
        name: "shadowed".into(),
        description: None,
        value: ParamValue::string("$(tasks.pt1.results.foo)"),
    }];
    let task_results = task_results(&[("pt1", "foo", ParamValue::string("from-task"))]);
    let custom: HashMap<String, Vec<CustomRunResult>> = [(
        "pt1".to_string(),
        vec![CustomRunResult {
            name: "foo".into(),
            value: "from-custom".into(),
        }],
    )]
    .into();
    let (resolved, err) = apply_task_results_to_pipeline_results(&results, &task_results, &custom);
    assert_eq!(err, None);
    assert_eq!(resolved[0].value, ParamValue::string("from-task"));
}

#[test]
fn pipeline_results_unresolvable_references_are_collected() {
    let results = vec![
        PipelineResult {
            name: "good".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.foo)"),
        },
        PipelineResult {
            name: "missing-result".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.nope)"),
        },
        PipelineResult {
            name: "missing-task".into(),
            description: None,
            value: ParamValue::string("$(tasks.ghost.results.foo)"),
        },
        PipelineResult {
            name: "out-of-bounds".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.bar[4])"),
        },
        PipelineResult {
            name: "missing-key".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.gitrepo.branch)"),
        },
        PipelineResult {
            name: "malformed".into(),
            description: None,
            value: ParamValue::string("$(tasks.pt1.results.foo.bar.baz)"),
        },
    ];
    let task_results = task_results(&[
        ("pt1", "foo", ParamValue::string("do")),
        ("pt1", "bar", ParamValue::array(["do", "rae"])),
        ("pt1", "gitrepo", ParamValue::object([("url", "abc.com")])),
    ]);
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &task_results, &HashMap::new());
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "good");
    let err = err.expect("aggregate error");
    assert_eq!(
        err,
        SkeinError::InvalidPipelineResults {
            names: vec![
                "missing-result".into(),
                "missing-task".into(),
                "out-of-bounds".into(),
                "missing-key".into(),
                "malformed".into(),
            ],
        }
    );
    assert_eq!(
        err.to_string(),
        "invalid pipelineresults [missing-result,missing-task,out-of-bounds,missing-key,malformed], the referred results don't exist"
    );
}

#[test]
fn pipeline_results_index_accessor_on_object_result_is_invalid() {
    let results = vec![PipelineResult {
        name: "bad-index".into(),
        description: None,
        value: ParamValue::string("$(tasks.pt1.results.gitrepo[1])"),
    }];
    let task_results = task_results(&[("pt1", "gitrepo", ParamValue::object([("url", "abc.com")]))]);
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &task_results, &HashMap::new());
    assert!(resolved.is_empty());
    assert_eq!(
        err,
        Some(SkeinError::InvalidPipelineResults {
            names: vec!["bad-index".into()],
        })
    );
}

#[test]
fn pipeline_results_record_each_invalid_result_once() {
    let results = vec![PipelineResult {
        name: "doubly-bad".into(),
        description: None,
        value: ParamValue::string("$(tasks.ghost.results.a) $(tasks.ghost.results.b)"),
    }];
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &HashMap::new(), &HashMap::new());
    assert!(resolved.is_empty());
    assert_eq!(
        err,
        Some(SkeinError::InvalidPipelineResults {
            names: vec!["doubly-bad".into()],
        })
    );
}

#[test]
fn pipeline_results_array_template_splices_referenced_array() {
    let results = vec![PipelineResult {
        name: "combined".into(),
        description: None,
        value: ParamValue::array(["first", "$(tasks.pt1.results.bar[*])"]),
    }];
    let task_results = task_results(&[("pt1", "bar", ParamValue::array(["do", "rae"]))]);
    let (resolved, err) =
        apply_task_results_to_pipeline_results(&results, &task_results, &HashMap::new());
    assert_eq!(err, None);
    assert_eq!(resolved[0].value, ParamValue::array(["first", "do", "rae"]));
}
