//! Debounced command queue for search-as-you-type.
//!
//! Queries submitted in quick succession are coalesced: only the last one is
//! dispatched, once no new query has arrived for the quiet period. Starting a
//! new dispatch aborts the previous one so a slow, stale search can never
//! finish after a newer one.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

enum Command {
    Query(String),
    Cancel,
}

/// Handle to a running debouncer task.
///
/// Dropping the handle stops the task and aborts any in-flight dispatch.
pub struct SearchDebouncer {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl SearchDebouncer {
    /// Spawns the debouncer on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F, Fut>(quiet: Duration, dispatch: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(quiet, rx, dispatch));
        Self { tx, task }
    }

    /// Queues `query`, restarting the quiet period.
    ///
    /// Returns `false` once the debouncer has been shut down.
    pub fn submit(&self, query: impl Into<String>) -> bool {
        self.tx.send(Command::Query(query.into())).is_ok()
    }

    /// Drops the pending query, if any, and aborts an in-flight dispatch.
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F, Fut>(quiet: Duration, mut rx: mpsc::UnboundedReceiver<Command>, dispatch: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut in_flight: Option<JoinHandle<()>> = None;
    let mut pending: Option<String> = None;

    loop {
        let command = match pending {
            None => rx.recv().await,
            Some(_) => {
                tokio::select! {
                    command = rx.recv() => command,
                    () = tokio::time::sleep(quiet) => {
                        if let Some(query) = pending.take() {
                            if let Some(previous) = in_flight.take() {
                                previous.abort();
                            }
                            tracing::debug!(query, "dispatching debounced search");
                            in_flight = Some(tokio::spawn(dispatch(query)));
                        }
                        continue;
                    }
                }
            }
        };

        match command {
            Some(Command::Query(query)) => pending = Some(query),
            Some(Command::Cancel) => {
                pending = None;
                if let Some(previous) = in_flight.take() {
                    previous.abort();
                }
            }
            None => break,
        }
    }

    if let Some(previous) = in_flight.take() {
        previous.abort();
    }
}
