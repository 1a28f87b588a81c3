// tests/integration/error_handling.rs

use std::io::Write;

use tempfile::{Builder, NamedTempFile};

use dobi::config::{load_and_validate, Resource};
use dobi::errors::DobiError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str, want_path: &str, want_message: &str) {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(err @ DobiError::Config { .. }) => {
            let DobiError::Config { path, message } = &err else {
                unreachable!()
            };
            assert_eq!(path, want_path, "{err}");
            assert!(message.contains(want_message), "{err}");
            assert_eq!(err.exit_code(), 1);
            assert!(err.to_string().starts_with(&format!("Error at {want_path}: ")));
        }
        Err(e) => panic!("Expected Config error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_job_with_unknown_image_is_reported_at_use() {
    expect_config_error(
        r#"
job=compile:
  use: builder
"#,
        "compile.use",
        "missing dependencies: builder",
    );
}

#[test]
fn test_job_mount_of_wrong_kind() {
    expect_config_error(
        r#"
image=builder:
  image: app
  context: .

job=compile:
  use: builder
  mounts: [builder]
"#,
        "compile.mounts[0]",
        "builder is not a mount resource",
    );
}

#[test]
fn test_unknown_resource_type() {
    let file = config_file("widget=thing:\n  size: 3\n");
    match load_and_validate(file.path()) {
        Err(DobiError::Config { path, .. }) => assert_eq!(path, "widget=thing"),
        Err(e) => panic!("Expected Config error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_field_is_rejected() {
    let file = config_file("mount=src:\n  bind: .\n  path: /src\n  colour: blue\n");
    match load_and_validate(file.path()) {
        Err(DobiError::Config { path, message }) => {
            assert_eq!(path, "src");
            assert!(message.contains("colour"), "{message}");
        }
        Err(e) => panic!("Expected Config error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_image_tag_in_name() {
    expect_config_error(
        "image=base:\n  image: alpine:3.19\n  pull: once\n",
        "base.image",
        "tags",
    );
}

#[test]
fn test_reserved_name() {
    expect_config_error(
        "mount=list:\n  bind: .\n  path: /src\n",
        "list",
        "reserved",
    );
}

#[test]
fn test_default_must_exist() {
    expect_config_error(
        "meta:\n  default: nothing\nmount=src:\n  bind: .\n  path: /src\n",
        "meta.default",
        "nothing",
    );
}

#[test]
fn test_invalid_yaml_is_a_yaml_error() {
    let file = config_file("job=compile: [unclosed\n");
    match load_and_validate(file.path()) {
        Err(err @ DobiError::Yaml(_)) => assert_eq!(err.exit_code(), 1),
        Err(e) => panic!("Expected Yaml error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dobi.yaml");
    match load_and_validate(&path) {
        Err(DobiError::Config { path: at, .. }) => assert_eq!(at, path.display().to_string()),
        Err(e) => panic!("Expected Config error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_toml_and_legacy_names_load() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[meta]
project = "demo"
default = "compile"

[builder]
image = "demo-dev"
context = "."

[compile]
use = "builder"
command = "make"
"#
    )
    .unwrap();

    let config = load_and_validate(file.path()).unwrap();
    assert_eq!(config.project, "demo");
    assert!(matches!(config.get("builder"), Some(Resource::Image(_))));
    assert!(matches!(config.get("compile"), Some(Resource::Job(_))));
    assert_eq!(config.work_dir, file.path().parent().unwrap());
}
