// tests/integration/signals.rs

use std::sync::Arc;

use tokio::sync::mpsc;

use dobi::tasks::signals::{forward, interrupted, is_forwarding, ForwardingGuard};

use crate::common::fake_engine::{Call, FakeEngine};
use crate::common::{init_tracing, with_timeout};

fn kills(engine: &FakeEngine) -> Vec<(String, String)> {
    engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Kill { id, signal } => Some((id, signal)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn one_interrupt_sends_exactly_one_kill() {
    init_tracing();
    let engine = FakeEngine::new();
    let (tx, rx) = mpsc::channel(4);

    tx.send("SIGINT").await.unwrap();
    drop(tx);
    with_timeout(forward(Arc::new(engine.clone()), "c0001".to_string(), rx)).await;

    assert_eq!(kills(&engine), vec![("c0001".to_string(), "SIGINT".to_string())]);
    assert!(interrupted());
}

#[tokio::test]
async fn repeated_interrupt_escalates_to_kill() {
    init_tracing();
    let engine = FakeEngine::new();
    let (tx, rx) = mpsc::channel(4);

    tx.send("SIGTERM").await.unwrap();
    tx.send("SIGINT").await.unwrap();
    tx.send("SIGINT").await.unwrap();
    drop(tx);
    with_timeout(forward(Arc::new(engine.clone()), "job".to_string(), rx)).await;

    let signals: Vec<String> = kills(&engine).into_iter().map(|(_, s)| s).collect();
    assert_eq!(signals, vec!["SIGTERM", "SIGINT", "SIGKILL"]);
}

#[test]
fn guards_nest() {
    let outer = ForwardingGuard::acquire();
    let inner = ForwardingGuard::acquire();
    drop(inner);
    assert!(is_forwarding());
    drop(outer);
}
