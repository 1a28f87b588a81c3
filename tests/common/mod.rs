#![allow(dead_code)]

pub use dobi_test_utils::builders;
pub use dobi_test_utils::fake_engine;
pub use dobi_test_utils::{init_tracing, with_timeout};

use std::collections::BTreeMap;

use dobi::exec::TaskReport;

/// `task -> modified` for a finished run.
pub fn modified(reports: &[TaskReport]) -> BTreeMap<String, bool> {
    reports
        .iter()
        .map(|r| (r.task.clone(), r.modified))
        .collect()
}

/// Task names in run order.
pub fn order(reports: &[TaskReport]) -> Vec<String> {
    reports.iter().map(|r| r.task.clone()).collect()
}
