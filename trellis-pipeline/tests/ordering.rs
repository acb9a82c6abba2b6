//! Registration, ordering and chain behavior of the pipeline.

mod common;

use async_trait::async_trait;
use common::{Log, TestHost, TestOptions, TestPartial, builder, entries, fragment};
use trellis_pipeline::{
    BuilderApply, BuilderArgs, BuilderHelper, FragmentHelper, HelperKind, Next, Pipeline,
    PipelineDiagnostic, PipelineError, PipelineState, Severity,
};

fn log() -> Log {
    Log::default()
}

#[tokio::test]
async fn test_fragments_then_builders_in_resolved_order() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());

    pipeline
        .ir()
        .register(fragment("validation").depends_on(["capability"]))
        .unwrap()
        .register(fragment("capability").depends_on(["collection"]))
        .unwrap()
        .register(fragment("meta"))
        .unwrap()
        .register(fragment("collection").depends_on(["meta"]))
        .unwrap();
    pipeline
        .builders()
        .register(builder("duplicate", "duplicate-1"))
        .unwrap()
        .register(builder("beta", "beta"))
        .unwrap()
        .register(builder("high", "high").priority(10))
        .unwrap()
        .register(builder("alpha", "alpha"))
        .unwrap()
        .register(builder("duplicate", "duplicate-2"))
        .unwrap();

    let result = pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "meta",
            "collection",
            "capability",
            "validation",
            "high",
            "alpha",
            "beta",
            "duplicate-1",
            "duplicate-2",
        ]
    );
    assert_eq!(
        result.step_keys(),
        vec![
            "meta",
            "collection",
            "capability",
            "validation",
            "high",
            "alpha",
            "beta",
            "duplicate",
            "duplicate",
        ]
    );
    assert_eq!(result.steps[0].id, "fragment:meta#2");
    assert_eq!(result.steps[7].id, "builder:duplicate#0");
    assert_eq!(result.steps[8].id, "builder:duplicate#4");
    assert_eq!(result.helpers.fragments.missing, Vec::<String>::new());
    assert_eq!(pipeline.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_cycle_fails_before_any_fragment_runs() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .ir()
        .register(fragment("free"))
        .unwrap()
        .register(fragment("a").depends_on(["b"]))
        .unwrap()
        .register(fragment("b").depends_on(["a"]))
        .unwrap();

    let error = pipeline.run(TestOptions::new(&log)).await.unwrap_err();

    assert!(entries(&log).is_empty());
    let Some(PipelineError::DependencyCycle { kind, keys }) = error.downcast_ref::<PipelineError>()
    else {
        panic!("expected a dependency cycle, got {error:?}");
    };
    assert_eq!(*kind, HelperKind::Fragment);
    assert_eq!(keys, &vec!["a".to_string(), "b".to_string()]);
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[test]
fn test_second_override_fails_at_registration() {
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .ir()
        .register(fragment("ir.meta").overriding().origin("core"))
        .unwrap();

    let error = pipeline
        .ir()
        .register(fragment("ir.meta").overriding().origin("plugin"))
        .err()
        .unwrap();

    assert!(matches!(
        &error,
        PipelineError::OverrideConflict { key, existing, incoming, .. }
            if key == "ir.meta" && existing == "core" && incoming == "plugin"
    ));
    assert!(matches!(
        &pipeline.diagnostics()[0],
        PipelineDiagnostic::Conflict { severity: Severity::Error, helpers, .. }
            if helpers == &["core".to_string(), "plugin".to_string()]
    ));
}

#[test]
fn test_override_next_to_extend_is_a_warning() {
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .builders()
        .register(builder("builder.ts", "a"))
        .unwrap()
        .register(builder("builder.ts", "b").overriding())
        .unwrap();

    assert_eq!(pipeline.diagnostics().len(), 1);
    assert_eq!(pipeline.diagnostics()[0].severity(), Severity::Warning);
    assert_eq!(pipeline.builder_plan().len(), 2);
}

#[test]
fn test_kind_mismatch_fails_on_every_surface() {
    let mut pipeline = Pipeline::new(TestHost::default());

    let error = pipeline.ir().register(builder("b", "b")).err().unwrap();
    assert!(matches!(
        error,
        PipelineError::SurfaceMismatch {
            expected: HelperKind::Fragment,
            found: HelperKind::Builder,
            ..
        }
    ));

    let error = pipeline.builders().register(fragment("f")).err().unwrap();
    assert!(matches!(
        error,
        PipelineError::SurfaceMismatch {
            expected: HelperKind::Builder,
            found: HelperKind::Fragment,
            ..
        }
    ));

    let error = pipeline
        .extensions()
        .register_helper(fragment("f"))
        .err()
        .unwrap();
    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::SurfaceMismatch {
            expected: HelperKind::Extension,
            ..
        })
    ));
}

#[tokio::test]
async fn test_use_helper_dispatches_by_kind() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline.use_helper(fragment("f")).unwrap();
    pipeline.use_helper(builder("b", "b")).unwrap();

    pipeline.run(TestOptions::new(&log)).await.unwrap();
    assert_eq!(entries(&log), vec!["f", "b"]);
}

struct CallsNextTwice;

#[async_trait]
impl BuilderApply<TestHost> for CallsNextTwice {
    async fn apply(
        &self,
        args: BuilderArgs<'_, TestHost>,
        next: &mut Next<'_, TestHost>,
    ) -> eyre::Result<()> {
        args.context.record("twice");
        next.run(&mut *args.artifact).await?;
        assert!(next.is_consumed());
        next.run(&mut *args.artifact).await
    }
}

#[tokio::test]
async fn test_next_only_advances_once() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .builders()
        .register(BuilderHelper::<TestHost>::new("first", CallsNextTwice).priority(1))
        .unwrap()
        .register(builder("second", "second"))
        .unwrap()
        .register(builder("third", "third"))
        .unwrap();

    let result = pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert_eq!(entries(&log), vec!["twice", "second", "third"]);
    assert_eq!(result.artifact.built, vec!["second", "third"]);
}

struct StopsChain;

#[async_trait]
impl BuilderApply<TestHost> for StopsChain {
    async fn apply(
        &self,
        args: BuilderArgs<'_, TestHost>,
        _next: &mut Next<'_, TestHost>,
    ) -> eyre::Result<()> {
        args.context.record("stop");
        Ok(())
    }
}

#[tokio::test]
async fn test_builder_without_next_short_circuits() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .builders()
        .register(builder("a.first", "first"))
        .unwrap()
        .register(BuilderHelper::<TestHost>::new("b.stop", StopsChain))
        .unwrap()
        .register(builder("c.skipped", "skipped"))
        .unwrap();

    let result = pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert_eq!(entries(&log), vec!["first", "stop"]);
    assert_eq!(result.helpers.builders.missing, vec!["c.skipped"]);
    assert!(result.diagnostics.iter().any(|d| matches!(
        d,
        PipelineDiagnostic::UnusedHelper { key, .. } if key == "c.skipped"
    )));
}

#[tokio::test]
async fn test_missing_dependency_is_reported_and_run_continues() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .ir()
        .register(fragment("ir.collection").depends_on(["ir.ghost"]))
        .unwrap();

    let result = pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert_eq!(entries(&log), vec!["ir.collection"]);
    assert!(matches!(
        &result.diagnostics[0],
        PipelineDiagnostic::MissingDependency { key, dependency, .. }
            if key == "ir.collection" && dependency == "ir.ghost"
    ));
}

#[tokio::test]
async fn test_assign_overwrites_fields_in_fragment_order() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .ir()
        .register(
            FragmentHelper::<TestHost>::from_fn("late", |mut args| {
                args.output.assign(TestPartial {
                    namespace: Some("late".into()),
                    version: None,
                });
                Ok(())
            })
            .depends_on(["early"]),
        )
        .unwrap()
        .register(FragmentHelper::<TestHost>::from_fn("early", |mut args| {
            args.output.assign(TestPartial {
                namespace: Some("early".into()),
                version: Some(3),
            });
            Ok(())
        }))
        .unwrap();

    let result = pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert_eq!(result.artifact.namespace, "late");
    assert_eq!(result.artifact.version, 3);
}

#[tokio::test]
async fn test_each_run_gets_fresh_context_and_run_id() {
    let log = log();
    let host = TestHost::default();
    let contexts = host.contexts.clone();
    let mut pipeline = Pipeline::new(host);
    pipeline.ir().register(fragment("f")).unwrap();

    let first = pipeline.run(TestOptions::new(&log)).await.unwrap();
    let second = pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert!(second.run_id > first.run_id);
    assert_eq!(contexts.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(entries(&log), vec!["f", "f"]);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Seen(Vec<String>);

#[tokio::test]
async fn test_side_table_is_shared_within_a_run_only() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .ir()
        .register(FragmentHelper::<TestHost>::from_fn("writer", |args| {
            args.run
                .side_table
                .with(|seen: &mut Seen| seen.0.push("writer".into()));
            Ok(())
        }))
        .unwrap();
    pipeline
        .builders()
        .register(BuilderHelper::<TestHost>::from_fn("reader", |args| {
            let seen = args.run.side_table.get::<Seen>().unwrap_or_default();
            args.context.record(seen.0.join(","));
            Ok(())
        }))
        .unwrap();

    pipeline.run(TestOptions::new(&log)).await.unwrap();
    pipeline.run(TestOptions::new(&log)).await.unwrap();

    assert_eq!(entries(&log), vec!["writer", "writer"]);
}

#[test]
fn test_plans_reflect_resolution() {
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline
        .ir()
        .register(fragment("b").depends_on(["a"]))
        .unwrap()
        .register(fragment("a"))
        .unwrap();
    pipeline
        .builders()
        .register(builder("z", "z"))
        .unwrap()
        .register(builder("y", "y").priority(5))
        .unwrap();

    let fragments: Vec<&str> = pipeline
        .fragment_plan()
        .unwrap()
        .into_iter()
        .map(|d| d.key.as_str())
        .collect();
    let builders: Vec<&str> = pipeline
        .builder_plan()
        .into_iter()
        .map(|d| d.key.as_str())
        .collect();

    assert_eq!(fragments, vec!["a", "b"]);
    assert_eq!(builders, vec!["y", "z"]);
}

#[tokio::test]
async fn test_registering_after_a_run_returns_to_idle() {
    let log = log();
    let mut pipeline = Pipeline::new(TestHost::default());
    pipeline.ir().register(fragment("first")).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);

    pipeline.run(TestOptions::new(&log)).await.unwrap();
    assert_eq!(pipeline.state(), PipelineState::Done);

    pipeline.ir().register(fragment("second")).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);

    pipeline.run(TestOptions::new(&log)).await.unwrap();
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(entries(&log), vec!["first", "first", "second"]);
}
