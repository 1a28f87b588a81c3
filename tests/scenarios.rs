// tests/scenarios.rs

//! End-to-end runs against an in-memory filesystem and a recording engine.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dobi::commands;
use dobi::errors::DobiError;
use dobi::exec::set_env_var;
use dobi::execenv::ExecEnv;
use dobi::fs::mock::MockFileSystem;
use dobi::fs::FileSystem;
use dobi::tasks::image::record::{self, ImageRecord};

use crate::common::builders::{container_name, test_context, ConfigBuilder};
use crate::common::fake_engine::{Call, FakeEngine};
use crate::common::{init_tracing, modified, order, with_timeout};

const WORK: &str = "/work";

fn compile_config() -> dobi::config::Config {
    ConfigBuilder::new(WORK)
        .with_project("app")
        .with_yaml(
            r#"
image=builder:
  image: app-dev
  context: .
  tags: [v1]

mount=src:
  bind: ./src
  path: /src

job=compile:
  use: builder
  mounts: [src]
  artifact: dist/out
  command: "go build -o dist/out ./..."
"#,
        )
        .build()
}

/// A project tree whose Dockerfile does not copy the mounted sources.
fn compile_project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/work/Dockerfile", "FROM golang:1.22\n");
    fs.add_file("/work/.dockerignore", "dist\nsrc\n");
    fs
}

/// Make the fake `compile` container write its artifact.
fn writes_artifact(engine: &FakeEngine, fs: &MockFileSystem) {
    let fs = fs.clone();
    let name = container_name("app", "compile");
    engine.on_run(move |spec| {
        if spec.name == name {
            fs.add_file("/work/dist/out", "binary");
        }
    });
}

#[tokio::test]
async fn build_then_run_reruns_only_what_changed() {
    init_tracing();
    let fs = compile_project();
    let engine = FakeEngine::new();
    writes_artifact(&engine, &fs);
    let tasks = vec!["compile".to_string()];

    // First run: everything does work.
    let mut ctx = test_context(compile_config(), &engine, Arc::new(fs.clone()));
    let reports = with_timeout(commands::run::run(&mut ctx, &tasks)).await.unwrap();
    assert_eq!(order(&reports), vec!["builder:build", "src:create", "compile:run"]);
    assert!(reports.iter().all(|r| r.modified), "{reports:?}");
    assert_eq!(engine.builds(), 1);
    assert!(fs.is_dir(Path::new("/work/src")));
    assert!(fs.exists(Path::new("/work/dist/out")));

    let compile = engine.created().pop().unwrap();
    assert_eq!(compile.name, "app-test-compile");
    assert_eq!(compile.image, "app-dev:v1");
    assert_eq!(compile.command, vec!["go", "build", "-o", "dist/out", "./..."]);
    assert_eq!(compile.binds, vec!["/work/src:/src:rw"]);

    // Nothing changed: a second run does no work at all.
    engine.clear_calls();
    let mut ctx = test_context(compile_config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &tasks).await.unwrap();
    assert!(reports.iter().all(|r| !r.modified), "{reports:?}");
    assert!(
        engine.calls().is_empty(),
        "fresh run touched the engine: {:?}",
        engine.calls()
    );

    // Artifact removed: only the job reruns.
    fs.remove_all(Path::new("/work/dist/out")).unwrap();
    let mut ctx = test_context(compile_config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &tasks).await.unwrap();
    let flags = modified(&reports);
    assert!(!flags["builder:build"]);
    assert!(!flags["src:create"]);
    assert!(flags["compile:run"]);
    assert_eq!(engine.builds(), 0);

    // A source newer than the artifact makes the job stale again.
    fs.add_file("/work/src/x.go", "package main");
    fs.set_modified("/work/src/x.go", fs.now() + Duration::from_secs(86_400));
    let mut ctx = test_context(compile_config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &tasks).await.unwrap();
    assert!(modified(&reports)["compile:run"]);
    assert_eq!(engine.builds(), 0);
}

#[tokio::test]
async fn context_change_rebuilds_and_reruns_dependents() {
    init_tracing();
    let fs = compile_project();
    fs.add_dir("/work/src");
    let engine = FakeEngine::new();
    writes_artifact(&engine, &fs);
    let tasks = vec!["compile".to_string()];

    let mut ctx = test_context(compile_config(), &engine, Arc::new(fs.clone()));
    commands::run::run(&mut ctx, &tasks).await.unwrap();
    assert_eq!(engine.builds(), 1);

    fs.add_file("/work/Dockerfile", "FROM golang:1.23\n");
    let mut ctx = test_context(compile_config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &tasks).await.unwrap();
    let flags = modified(&reports);
    assert!(flags["builder:build"]);
    assert!(!flags["src:create"]);
    assert!(flags["compile:run"]);
    assert_eq!(engine.builds(), 2);
}

#[tokio::test]
async fn alias_cycle_is_reported_in_visit_order() {
    init_tracing();
    let config = ConfigBuilder::new(WORK)
        .with_project("app")
        .with_yaml(
            r#"
alias=a:
  tasks: [b]
alias=b:
  tasks: [c]
alias=c:
  tasks: [a]
"#,
        )
        .build();
    let engine = FakeEngine::new();
    let mut ctx = test_context(config, &engine, Arc::new(MockFileSystem::new()));

    match commands::run::run(&mut ctx, &["a".to_string()]).await {
        Err(err @ DobiError::CyclicDependency(_)) => {
            assert_eq!(err.to_string(), "Invalid dependency cycle: a:run, b:run, c:run");
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn variables_resolve_into_the_job_container() {
    init_tracing();
    set_env_var("DOBI_SCENARIO_FOO", "bar");

    let env = ExecEnv::with_exec_id("app", "test", Path::new(WORK));
    assert_eq!(
        env.resolve("{env.DOBI_SCENARIO_FOO}-{env.DOBI_SCENARIO_MISSING:def}-{unique}")
            .unwrap(),
        "bar-def-app-test"
    );
    assert!(matches!(
        env.resolve("{env.DOBI_SCENARIO_MISSING}"),
        Err(DobiError::Resolve(_))
    ));

    let config = ConfigBuilder::new(WORK)
        .with_project("app")
        .with_yaml(
            r#"
image=base:
  image: alpine
  pull: once

job=show:
  use: base
  env:
    - "VERSION={env.DOBI_SCENARIO_FOO}-{env.DOBI_SCENARIO_MISSING:def}-{unique}"
"#,
        )
        .build();
    let engine = FakeEngine::new();
    let mut ctx = test_context(config, &engine, Arc::new(MockFileSystem::new()));
    commands::run::run(&mut ctx, &["show".to_string()]).await.unwrap();

    let spec = engine.created().pop().unwrap();
    assert!(
        spec.env.contains(&"VERSION=bar-def-app-test".to_string()),
        "{:?}",
        spec.env
    );
    assert_eq!(spec.image, "alpine:app-test");
}

#[tokio::test]
async fn capture_exports_trimmed_output() {
    init_tracing();
    let config = || {
        ConfigBuilder::new(WORK)
            .with_project("app")
            .with_yaml(
                r#"
image=base:
  image: alpine
  tags: ["3.19"]
  pull: once

job=id:
  use: base
  command: printf v123

env=cap:
  captures:
    - job: id
      variable: DOBI_SCENARIO_CAPTURED
"#,
            )
            .build()
    };
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();
    engine.set_stdout(&container_name("app", "id"), "v123\n");

    let mut ctx = test_context(config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &["cap".to_string()]).await.unwrap();
    assert_eq!(
        order(&reports),
        vec!["base:pull", "id:capture(DOBI_SCENARIO_CAPTURED)", "cap:set"]
    );
    assert!(modified(&reports)["id:capture(DOBI_SCENARIO_CAPTURED)"]);
    assert_eq!(std::env::var("DOBI_SCENARIO_CAPTURED").unwrap(), "v123");
    let spec = engine.created().pop().unwrap();
    assert!(!spec.tty && !spec.open_stdin);

    // Same output again: the job still runs but nothing changed.
    let mut ctx = test_context(config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &["cap".to_string()]).await.unwrap();
    assert!(reports.iter().all(|r| !r.modified), "{reports:?}");
    assert_eq!(engine.created().len(), 2);
    assert_eq!(engine.pulls(), 1);
}

#[tokio::test]
async fn captured_value_reaches_later_templates() {
    init_tracing();
    let config = ConfigBuilder::new(WORK)
        .with_project("app")
        .with_yaml(
            r#"
image=base:
  image: alpine
  pull: once

job=first:
  use: base
  env: ["A={env.DOBI_SCENARIO_LATE:dev}"]

job=id:
  use: base
  command: printf v123

env=cap:
  captures:
    - job: id
      variable: DOBI_SCENARIO_LATE

job=second:
  use: base
  env: ["B=v-{env.DOBI_SCENARIO_LATE:dev}"]

alias=all:
  tasks: [first, cap, second]
"#,
        )
        .build();
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();
    engine.set_stdout(&container_name("app", "id"), "v123\n");

    let mut ctx = test_context(config, &engine, Arc::new(fs));
    commands::run::run(&mut ctx, &["all".to_string()]).await.unwrap();

    let env_of = |resource: &str| {
        let name = container_name("app", resource);
        engine
            .created()
            .into_iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.env)
            .unwrap()
    };
    assert_eq!(env_of("first"), vec!["A=dev".to_string()]);
    assert_eq!(env_of("second"), vec!["B=v-v123".to_string()]);
}

#[tokio::test]
async fn non_zero_exit_stops_the_run_and_removes_the_container() {
    init_tracing();
    let config = ConfigBuilder::new(WORK)
        .with_project("app")
        .with_yaml(
            r#"
image=base:
  image: alpine
  pull: once

job=fail:
  use: base
  command: ["sh", "-c", "exit 7"]

job=after:
  use: base
  depends: [fail]
"#,
        )
        .build();
    let engine = FakeEngine::new();
    engine.set_exit_code(&container_name("app", "fail"), 7);
    let mut ctx = test_context(config, &engine, Arc::new(MockFileSystem::new()));

    match commands::run::run(&mut ctx, &["after".to_string()]).await {
        Err(DobiError::TaskFailed { task, source }) => {
            assert_eq!(task, "fail:run");
            match *source {
                DobiError::JobExitedNonZero { container, code } => {
                    assert_eq!(container, "app-test-fail");
                    assert_eq!(code, 7);
                }
                other => panic!("expected a non-zero exit, got {other:?}"),
            }
        }
        other => panic!("expected the run to fail, got {other:?}"),
    }

    let created = engine.created();
    assert_eq!(created.len(), 1, "downstream job must not start");
    assert_eq!(created[0].command, vec!["sh", "-c", "exit 7"]);
    assert!(engine.live_containers().is_empty());
    assert_eq!(
        engine.count(|c| matches!(c, Call::RemoveContainer { .. })),
        1
    );
}

#[tokio::test]
async fn pull_policy_skips_recent_pulls() {
    init_tracing();
    let config = || {
        ConfigBuilder::new(WORK)
            .with_project("app")
            .with_yaml(
                r#"
image=base:
  image: registry.example.com/team/base
  tags: [stable]
  pull: 24h
"#,
            )
            .build()
    };
    let fs = MockFileSystem::new();
    let path = record::record_path(Path::new(WORK), "registry.example.com/team/base:stable");
    assert!(path.ends_with("registry.example.com team base:stable"));
    let two_days_ago = SystemTime::now() - Duration::from_secs(2 * 86_400);
    record::write(
        &fs,
        &path,
        &ImageRecord {
            image_id: "sha256:old".to_string(),
            last_pull: Some(two_days_ago),
            modified: None,
        },
    )
    .unwrap();

    let engine = FakeEngine::new();
    let mut ctx = test_context(config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &["base".to_string()]).await.unwrap();
    assert_eq!(order(&reports), vec!["base:pull"]);
    assert!(reports[0].modified);
    assert_eq!(
        engine.calls(),
        vec![Call::Pull {
            repo: "registry.example.com/team/base".to_string(),
            tag: "stable".to_string(),
            authenticated: false,
        }]
    );

    let written = record::read(&fs, &path).unwrap().unwrap();
    assert_ne!(written.image_id, "sha256:old");
    assert!(written.last_pull.unwrap() > two_days_ago);

    let mut ctx = test_context(config(), &engine, Arc::new(fs.clone()));
    let reports = commands::run::run(&mut ctx, &["base".to_string()]).await.unwrap();
    assert!(!reports[0].modified);
    assert_eq!(engine.pulls(), 1);
}
