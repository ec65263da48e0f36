//! Channel-backed tick source
//!
//! Bridges hosts that deliver trigger events over a tokio channel into the
//! [`TickSource`] contract. A single dispatch task drains the channel and
//! invokes subscribers one at a time, which keeps per-meter delivery
//! serialized as the contract requires.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use super::{TickHandler, TickSource};

/// Tick source fed by an unbounded tokio channel
///
/// `prev_age` is measured from the change before the most recent one, so a
/// handler running during dispatch observes the gap between the last two
/// ticks.
pub struct ChannelTickSource {
    handlers: RwLock<Vec<Arc<dyn TickHandler>>>,
    changes: Mutex<ChangeTimes>,
}

#[derive(Default)]
struct ChangeTimes {
    last: Option<Instant>,
    prev: Option<Instant>,
}

impl ChannelTickSource {
    /// Create the source and the sender used to feed it
    ///
    /// Spawns the dispatch task on the current tokio runtime; the task
    /// exits when every sender is dropped.
    pub fn spawn() -> (Arc<Self>, mpsc::UnboundedSender<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            handlers: RwLock::new(Vec::new()),
            changes: Mutex::new(ChangeTimes::default()),
        });

        let dispatch = Arc::clone(&source);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                dispatch.dispatch_one();
            }
            debug!("Tick channel closed, dispatch task exiting");
        });

        (source, tx)
    }

    fn dispatch_one(&self) {
        {
            let mut changes = self.changes.lock();
            changes.prev = changes.last;
            changes.last = Some(Instant::now());
        }

        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler.on_tick();
        }
    }
}

impl TickSource for ChannelTickSource {
    fn subscribe(&self, handler: Arc<dyn TickHandler>) {
        self.handlers.write().push(handler);
    }

    fn prev_age(&self) -> Option<f64> {
        let changes = self.changes.lock();
        changes.prev.map(|at| at.elapsed().as_secs_f64())
    }
}
