// tests/integration/fs_abstraction.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dobi::commands;
use dobi::config::load_and_validate;
use dobi::fs::dockerignore::Excludes;
use dobi::fs::mock::MockFileSystem;
use dobi::fs::{last_modified, FileSystem, RealFileSystem, PathGlobs};
use dobi::tasks::image::record::{self, ImageRecord};

use crate::common::builders::test_context;
use crate::common::fake_engine::FakeEngine;
use crate::common::init_tracing;

#[test]
fn test_record_survives_real_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let path = record::record_path(dir.path(), "example.com/team/app:v1");
    let pulled = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    record::write(
        &RealFileSystem,
        &path,
        &ImageRecord {
            image_id: "sha256:abc".to_string(),
            last_pull: Some(pulled),
            modified: None,
        },
    )
    .unwrap();

    assert!(path.starts_with(dir.path().join(".dobi/images")));
    let entries: Vec<_> = fs::read_dir(dir.path().join(".dobi/images"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec!["example.com team app:v1"]);
    let read = record::read(&RealFileSystem, &path).unwrap().unwrap();
    assert_eq!(read.image_id, "sha256:abc");
    assert_eq!(read.last_pull, Some(pulled));
    assert!(read.modified.is_some());
}

#[test]
fn test_mock_and_real_agree_on_excludes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("dist")).unwrap();
    fs::write(root.join("src/main.go"), "package main").unwrap();
    fs::write(root.join("dist/out"), "binary").unwrap();

    let mock = MockFileSystem::new();
    mock.add_file(root.join("src/main.go"), "package main");
    let source_time = mock.now();
    mock.add_file(root.join("dist/out"), "binary");

    let excludes = Excludes::new(&["dist".to_string()]).unwrap();
    let newest = last_modified(&mock, root, &excludes, &[root]).unwrap();
    assert_eq!(newest, source_time);

    let real = last_modified(&RealFileSystem, root, &excludes, &[root]).unwrap();
    let source = RealFileSystem.modified(&root.join("src/main.go")).unwrap();
    assert!(real >= source);
}

#[test]
fn test_artifact_globs_expand() {
    let fs = MockFileSystem::new();
    fs.add_file("/work/dist/app-linux", "a");
    fs.add_file("/work/dist/app-darwin", "b");
    fs.add_file("/work/dist/notes.txt", "c");

    let globs: PathGlobs = serde_yaml::from_str("[\"dist/app-*\"]").unwrap();
    let paths = globs.paths(&fs, Path::new("/work")).unwrap();
    assert_eq!(
        paths,
        vec![
            Path::new("/work/dist/app-darwin").to_path_buf(),
            Path::new("/work/dist/app-linux").to_path_buf(),
        ]
    );
}

#[tokio::test]
async fn test_mount_created_on_disk_with_mode() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("dobi.yaml");
    fs::write(
        &config_path,
        r#"
meta:
  project: demo

mount=cache:
  bind: .cache/go
  path: /go/pkg

mount=token:
  bind: secrets/token
  path: /run/token
  file: true
  mode: "0600"
"#,
    )
    .unwrap();

    let config = load_and_validate(&config_path).unwrap();
    let engine = FakeEngine::new();
    let mut ctx = test_context(config, &engine, Arc::new(RealFileSystem));
    let reports = commands::run::run(&mut ctx, &["cache".to_string(), "token".to_string()])
        .await
        .unwrap();
    assert!(reports.iter().all(|r| r.modified));

    assert!(dir.path().join(".cache/go").is_dir());
    let token = dir.path().join("secrets/token");
    assert!(token.is_file());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&token).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
