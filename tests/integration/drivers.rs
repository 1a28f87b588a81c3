// tests/integration/drivers.rs

use std::path::Path;
use std::sync::Arc;

use dobi::commands;
use dobi::config::Config;
use dobi::errors::{DobiError, Result};
use dobi::exec::{Settings, TaskReport};
use dobi::fs::mock::MockFileSystem;
use dobi::fs::FileSystem;
use dobi::tasks::image::record;

use crate::common::builders::{container_name, test_context, test_context_with, ConfigBuilder};
use crate::common::fake_engine::{Call, FakeEngine};
use crate::common::{init_tracing, modified, order};

fn project(yaml: &str) -> Config {
    ConfigBuilder::new("/work")
        .with_project("app")
        .with_yaml(yaml)
        .build()
}

async fn run(
    config: Config,
    engine: &FakeEngine,
    fs: &MockFileSystem,
    tasks: &[&str],
) -> Result<Vec<TaskReport>> {
    let mut ctx = test_context(config, engine, Arc::new(fs.clone()));
    let tasks: Vec<String> = tasks.iter().map(ToString::to_string).collect();
    commands::run::run(&mut ctx, &tasks).await
}

#[tokio::test]
async fn mount_creates_missing_file_once() {
    init_tracing();
    let config = || {
        project(
            r#"
mount=netrc:
  bind: home/.netrc
  path: /root/.netrc
  file: true
  mode: 0600
"#,
        )
    };
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();

    let reports = run(config(), &engine, &fs, &["netrc"]).await.unwrap();
    assert_eq!(order(&reports), vec!["netrc:create"]);
    assert!(reports[0].modified);
    assert!(fs.is_file(Path::new("/work/home/.netrc")));
    assert!(fs.is_dir(Path::new("/work/home")));

    let reports = run(config(), &engine, &fs, &["netrc"]).await.unwrap();
    assert!(!reports[0].modified);

    let reports = run(config(), &engine, &fs, &["netrc:rm"]).await.unwrap();
    assert!(!reports[0].modified);
    assert!(fs.exists(Path::new("/work/home/.netrc")));
}

#[tokio::test]
async fn env_sets_variables_from_files_and_entries() {
    init_tracing();
    let config = || {
        project(
            r#"
env=settings:
  files: [build.env]
  variables: ["DOBI_DRIVER_MODE=release"]
"#,
        )
    };
    let fs = MockFileSystem::new();
    fs.add_file("/work/build.env", "# target\nDOBI_DRIVER_GOOS=linux\n");
    let engine = FakeEngine::new();

    let reports = run(config(), &engine, &fs, &["settings"]).await.unwrap();
    assert!(modified(&reports)["settings:set"]);
    assert_eq!(std::env::var("DOBI_DRIVER_GOOS").unwrap(), "linux");
    assert_eq!(std::env::var("DOBI_DRIVER_MODE").unwrap(), "release");

    let reports = run(config(), &engine, &fs, &["settings"]).await.unwrap();
    assert!(!modified(&reports)["settings:set"]);

    fs.add_file("/work/build.env", "DOBI_DRIVER_GOOS=darwin\n");
    let reports = run(config(), &engine, &fs, &["settings"]).await.unwrap();
    assert!(modified(&reports)["settings:set"]);
    assert_eq!(std::env::var("DOBI_DRIVER_GOOS").unwrap(), "darwin");
}

#[tokio::test]
async fn env_file_errors_name_the_resource() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/work/bad.env", "NOT AN ASSIGNMENT\n");
    let engine = FakeEngine::new();
    let config = project(
        r#"
env=settings:
  files: [bad.env]
"#,
    );

    match run(config, &engine, &fs, &["settings"]).await {
        Err(DobiError::TaskFailed { task, source }) => {
            assert_eq!(task, "settings:set");
            match *source {
                DobiError::Config { path, .. } => assert_eq!(path, "settings.files"),
                other => panic!("expected a config error, got {other:?}"),
            }
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn service_is_created_then_scaled() {
    init_tracing();
    let config = |replicas: u64| {
        project(&format!(
            r#"
image=web-image:
  image: web
  tags: [v2]
  pull: once

service=web:
  use: web-image
  command: serve --port 80
  ports: ["8080:80"]
  replicas: {replicas}
"#
        ))
    };
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();
    let name = container_name("app", "web");

    let reports = run(config(2), &engine, &fs, &["web"]).await.unwrap();
    assert_eq!(order(&reports), vec!["web-image:pull", "web:run"]);
    assert!(modified(&reports)["web:run"]);
    assert_eq!(engine.service_replicas(&name), Some(2));

    let reports = run(config(2), &engine, &fs, &["web"]).await.unwrap();
    assert!(!modified(&reports)["web:run"]);

    let reports = run(config(3), &engine, &fs, &["web"]).await.unwrap();
    assert!(modified(&reports)["web:run"]);
    assert!(engine.calls().contains(&Call::UpdateService {
        name: name.clone(),
        replicas: 3,
    }));

    let reports = run(config(3), &engine, &fs, &["web:rm"]).await.unwrap();
    assert!(reports[0].modified);
    assert_eq!(engine.service_replicas(&name), None);

    let reports = run(config(3), &engine, &fs, &["web:rm"]).await.unwrap();
    assert!(!reports[0].modified);
}

#[tokio::test]
async fn push_tags_every_name_then_pushes() {
    init_tracing();
    let config = project(
        r#"
image=app:
  image: registry.example.com/app
  context: .
  tags: [v1, latest]
"#,
    );
    let fs = MockFileSystem::new();
    fs.add_file("/work/Dockerfile", "FROM scratch\n");
    let engine = FakeEngine::new();

    let reports = run(config, &engine, &fs, &["app:push"]).await.unwrap();
    assert_eq!(order(&reports), vec!["app:build", "app:tag", "app:push"]);
    assert!(reports.iter().all(|r| r.modified), "{reports:?}");

    let calls = engine.calls();
    assert!(calls.contains(&Call::Tag {
        source: "registry.example.com/app:v1".to_string(),
        repo: "registry.example.com/app".to_string(),
        tag: "latest".to_string(),
    }));
    assert_eq!(engine.count(|c| matches!(c, Call::Tag { .. })), 1);
    let pushed: Vec<&Call> = calls.iter().filter(|c| matches!(c, Call::Push { .. })).collect();
    assert_eq!(
        pushed,
        vec![
            &Call::Push {
                name: "registry.example.com/app:v1".to_string()
            },
            &Call::Push {
                name: "registry.example.com/app:latest".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn steps_synthesise_a_dockerfile() {
    init_tracing();
    let config = project(
        r#"
image=tools:
  image: tools
  steps:
    - FROM: golang:1.22
    - GO-BIN: github.com/example/lint/cmd/lint
"#,
    );
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();

    run(config, &engine, &fs, &["tools"]).await.unwrap();
    let dockerfile = fs
        .read_to_string(Path::new("/work/.dobi/Dockerfile.tools"))
        .unwrap();
    assert!(dockerfile.starts_with("FROM golang:1.22\n"), "{dockerfile}");
    assert!(dockerfile.contains("cp /go/bin/lint /usr/bin/"), "{dockerfile}");
    assert_eq!(engine.builds(), 1);
}

#[tokio::test]
async fn image_rm_removes_images_and_record() {
    init_tracing();
    let config = || {
        project(
            r#"
image=app:
  image: app
  context: .
  tags: [v1]
"#,
        )
    };
    let fs = MockFileSystem::new();
    fs.add_file("/work/Dockerfile", "FROM scratch\n");
    let engine = FakeEngine::new();

    run(config(), &engine, &fs, &["app"]).await.unwrap();
    let path = record::record_path(Path::new("/work"), "app:v1");
    assert!(fs.exists(&path));

    let reports = run(config(), &engine, &fs, &["app:rm"]).await.unwrap();
    assert!(reports[0].modified);
    assert!(!engine.has_image("app:v1"));
    assert!(!fs.exists(&path));
}

#[tokio::test]
async fn autoclean_removes_everything_but_aliases() {
    init_tracing();
    let config = || {
        project(
            r#"
image=base:
  image: alpine
  pull: once

job=compile:
  use: base
  artifact: dist/

alias=all:
  tasks: [compile]
"#,
        )
    };
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();
    let hook_fs = fs.clone();
    engine.on_run(move |_| hook_fs.add_file("/work/dist/out", "binary"));

    run(config(), &engine, &fs, &["all"]).await.unwrap();
    assert!(fs.exists(Path::new("/work/dist/out")));

    let mut ctx = test_context(config(), &engine, Arc::new(fs.clone()));
    let reports = commands::autoclean::run(&mut ctx).await.unwrap();
    assert_eq!(order(&reports), vec!["base:rm", "compile:rm"]);
    assert!(!fs.exists(Path::new("/work/dist")));
    assert!(!engine.has_image("alpine:app-test"));
}

#[tokio::test]
async fn named_and_default_actions_share_one_entry() {
    init_tracing();
    let config = project(
        r#"
image=base:
  image: alpine
  pull: once

job=compile:
  use: base
"#,
    );
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();

    let reports = run(config, &engine, &fs, &["compile", "compile:run", "base:pull"])
        .await
        .unwrap();
    assert_eq!(order(&reports), vec!["base:pull", "compile:run"]);
    assert_eq!(engine.created().len(), 1);
}

#[tokio::test]
async fn missing_default_task_is_a_config_error() {
    init_tracing();
    let config = project("mount=src:\n  bind: .\n  path: /src\n");
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();

    match run(config, &engine, &fs, &[]).await {
        Err(DobiError::Config { path, .. }) => assert_eq!(path, "meta.default"),
        other => panic!("expected a config error, got {other:?}"),
    }

    let config = ConfigBuilder::new("/work")
        .with_project("app")
        .with_default("src")
        .with_yaml("mount=src:\n  bind: .\n  path: /src\n")
        .build();
    let reports = run(config, &engine, &fs, &[]).await.unwrap();
    assert_eq!(order(&reports), vec!["src:create"]);
}

#[tokio::test]
async fn disabled_bind_mounts_leave_binds_empty() {
    init_tracing();
    let config = project(
        r#"
image=base:
  image: alpine
  pull: once

mount=src:
  bind: .
  path: /src

job=compile:
  use: base
  mounts: [src]
"#,
    );
    let fs = MockFileSystem::new();
    let engine = FakeEngine::new();
    let settings = Settings {
        bind_mount: false,
        ..Settings::default()
    };

    let mut ctx = test_context_with(config, &engine, Arc::new(fs.clone()), settings);
    commands::run::run(&mut ctx, &["compile".to_string()]).await.unwrap();
    let spec = engine.created().pop().unwrap();
    assert!(spec.binds.is_empty());
    assert_eq!(spec.name, "app-test-compile");
}

#[tokio::test]
async fn sources_matching_nothing_keep_the_job_stale() {
    init_tracing();
    let config = || {
        project(
            r#"
image=base:
  image: alpine
  pull: once

job=gen:
  use: base
  sources: ["src/*.go"]
  artifact: out.txt
"#,
        )
    };
    let fs = MockFileSystem::new();
    fs.add_dir("/work/src");
    let engine = FakeEngine::new();
    let hook_fs = fs.clone();
    engine.on_run(move |_| hook_fs.add_file("/work/out.txt", "generated"));

    for _ in 0..2 {
        let reports = run(config(), &engine, &fs, &["gen"]).await.unwrap();
        assert!(modified(&reports)["gen:run"], "{reports:?}");
    }
    assert_eq!(engine.created().len(), 2);

    fs.add_file("/work/src/main.go", "package main");
    let reports = run(config(), &engine, &fs, &["gen"]).await.unwrap();
    assert!(modified(&reports)["gen:run"]);

    let reports = run(config(), &engine, &fs, &["gen"]).await.unwrap();
    assert!(!modified(&reports)["gen:run"], "{reports:?}");
    assert_eq!(engine.created().len(), 3);
}
