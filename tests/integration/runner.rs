// tests/integration/runner.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dobi::config::Resource;
use dobi::dag::{self, TaskName};
use dobi::errors::{DobiError, Result};
use dobi::exec::{run_tasks_with, ExecuteContext, Task};
use dobi::fs::mock::MockFileSystem;

use crate::common::builders::{test_context, ConfigBuilder};
use crate::common::fake_engine::FakeEngine;
use crate::common::init_tracing;

type Log = Arc<Mutex<Vec<String>>>;

struct Recording {
    name: TaskName,
    fail: bool,
    log: Log,
}

#[async_trait]
impl Task for Recording {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        format!("[recording {}]", self.name)
    }

    async fn run(&self, _ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        self.log.lock().unwrap().push(format!("run {}", self.name.resource()));
        if self.fail {
            return Err(DobiError::Other(anyhow::anyhow!("boom")));
        }
        Ok(true)
    }

    async fn stop(&self, _ctx: &mut ExecuteContext) -> Result<()> {
        self.log.lock().unwrap().push(format!("stop {}", self.name.resource()));
        Ok(())
    }
}

#[tokio::test]
async fn failing_task_is_stopped_with_the_ones_before_it() {
    init_tracing();
    let config = ConfigBuilder::new("/work")
        .with_project("app")
        .with_yaml(
            r#"
mount=first:
  bind: a
  path: /a

mount=second:
  bind: b
  path: /b

mount=third:
  bind: c
  path: /c
"#,
        )
        .build();
    let engine = FakeEngine::new();
    let mut ctx = test_context(config, &engine, Arc::new(MockFileSystem::new()));
    let roots: Vec<String> = ["first", "second", "third"].iter().map(ToString::to_string).collect();
    let plan = dag::collect(&ctx.config, &roots).unwrap();

    let log: Log = Arc::default();
    let build = |name: TaskName, _resource: Resource| -> Result<Box<dyn Task>> {
        let fail = name.resource() == "second";
        Ok(Box::new(Recording {
            name,
            fail,
            log: log.clone(),
        }))
    };

    match run_tasks_with(&mut ctx, &plan, build).await {
        Err(DobiError::TaskFailed { task, .. }) => assert_eq!(task, "second:create"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        *log.lock().unwrap(),
        vec!["run first", "run second", "stop second", "stop first"]
    );
}
