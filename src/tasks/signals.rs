// src/tasks/signals.rs

//! Forward SIGINT/SIGTERM to running job containers.
//!
//! While a job container runs, interrupts received by this process are sent
//! on to the container instead of killing dobi. A second SIGINT escalates to
//! SIGKILL. The forwarder lives as long as its [`SignalForwarder`] handle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::Engine;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static ACTIVE: AtomicUsize = AtomicUsize::new(0);

/// Whether an interrupt was forwarded to a child during this process.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether some child currently owns interrupt handling. The top-level
/// Ctrl-C handler leaves signals alone while this is true.
pub fn is_forwarding() -> bool {
    ACTIVE.load(Ordering::SeqCst) > 0
}

/// Marks interrupts as owned by a running child until dropped.
#[derive(Debug)]
pub struct ForwardingGuard(());

impl ForwardingGuard {
    pub fn acquire() -> Self {
        ACTIVE.fetch_add(1, Ordering::SeqCst);
        ForwardingGuard(())
    }
}

impl Drop for ForwardingGuard {
    fn drop(&mut self) {
        ACTIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Signal to deliver to the container for the `count`-th received signal
/// (1-based).
pub fn forwarded_signal(received: &'static str, count: usize) -> &'static str {
    if received == "SIGINT" && count > 1 {
        "SIGKILL"
    } else {
        received
    }
}

/// Relay every signal name read from `signals` to `container` until the
/// channel closes.
pub async fn forward(
    engine: Arc<dyn Engine>,
    container: String,
    mut signals: mpsc::Receiver<&'static str>,
) {
    let mut interrupts = 0;
    while let Some(received) = signals.recv().await {
        set_interrupted();
        if received == "SIGINT" {
            interrupts += 1;
        }
        let signal = forwarded_signal(received, interrupts.max(1));
        info!(container = %container, signal, "forwarding signal to container");
        if let Err(err) = engine.kill_container(&container, signal).await {
            warn!(container = %container, signal, error = %err, "failed to forward signal");
        }
    }
}

/// Owns the OS signal listener and the relay task for one container.
pub struct SignalForwarder {
    listener: JoinHandle<()>,
    relay: JoinHandle<()>,
    _guard: ForwardingGuard,
}

impl SignalForwarder {
    pub fn spawn(engine: Arc<dyn Engine>, container: String) -> Self {
        let _guard = ForwardingGuard::acquire();
        let (tx, rx) = mpsc::channel(4);
        let listener = tokio::spawn(listen(tx));
        let relay = tokio::spawn(forward(engine, container, rx));
        Self {
            listener,
            relay,
            _guard,
        }
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        self.listener.abort();
        self.relay.abort();
    }
}

#[cfg(unix)]
async fn listen(tx: mpsc::Sender<&'static str>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(int), Ok(term)) => (int, term),
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "failed to install signal handlers");
                return;
            }
        };

    loop {
        let received = tokio::select! {
            Some(()) = sigint.recv() => "SIGINT",
            Some(()) = sigterm.recv() => "SIGTERM",
            else => break,
        };
        debug!(signal = received, "received signal");
        if tx.send(received).await.is_err() {
            break;
        }
    }
}

#[cfg(not(unix))]
async fn listen(tx: mpsc::Sender<&'static str>) {
    loop {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            return;
        }
        if tx.send("SIGINT").await.is_err() {
            return;
        }
    }
}
