// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced single-writer persistence.
//!
//! Mutators call [`SaveScheduler::schedule`] which only pushes a dirty signal
//! onto a channel. One background task owns all debounced writes: it waits
//! for the first signal, keeps absorbing signals until the debounce window
//! passes quietly (or the coalesce cap is hit), then asks the
//! [`SnapshotSink`] to write one full snapshot of each dirty document.
//!
//! A crash inside the debounce window loses that burst. Call
//! [`SaveScheduler::shutdown`] to flush before exit; [`SaveScheduler::destroy`]
//! stops the task without flushing.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ticketdesk_core::TicketdeskError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::documents::DocumentKind;

/// A burst is always written within this many debounce windows of its first
/// signal, even if signals keep arriving.
const MAX_COALESCE_WINDOWS: u32 = 10;

/// Documents waiting to be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtySet {
    pub staff: bool,
    pub tickets: bool,
}

impl DirtySet {
    pub fn mark(&mut self, kind: DocumentKind) {
        match kind {
            DocumentKind::Staff => self.staff = true,
            DocumentKind::Tickets => self.tickets = true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.staff && !self.tickets
    }

    pub fn merge(&mut self, other: DirtySet) {
        self.staff |= other.staff;
        self.tickets |= other.tickets;
    }

    fn take(&mut self) -> DirtySet {
        std::mem::take(self)
    }
}

/// Writes a snapshot of the requested documents.
#[async_trait]
pub trait SnapshotSink: Send + Sync + 'static {
    async fn flush(&self, dirty: DirtySet) -> Result<(), TicketdeskError>;
}

enum WriterMsg {
    Dirty(DocumentKind),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the background writer task.
pub struct SaveScheduler {
    tx: mpsc::UnboundedSender<WriterMsg>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveScheduler")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl SaveScheduler {
    /// Spawn the writer task on the current Tokio runtime.
    pub fn spawn<S: SnapshotSink>(sink: S, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_writer(sink, rx, debounce, cancel.clone()));

        Self {
            tx,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Mark a document dirty. Never blocks and never fails; once the writer
    /// has stopped, signals are dropped.
    pub fn schedule(&self, kind: DocumentKind) {
        if self.tx.send(WriterMsg::Dirty(kind)).is_err() {
            debug!(document = %kind, "save scheduled after writer stopped -- ignored");
        }
    }

    /// Flush anything pending, then stop the writer and wait for it.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriterMsg::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        self.join().await;
    }

    /// Stop the writer immediately. Pending writes are discarded.
    pub async fn destroy(&self) {
        self.cancel.cancel();
        self.join().await;
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed() && !self.cancel.is_cancelled()
    }

    async fn join(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "writer task ended abnormally");
        }
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_writer<S: SnapshotSink>(
    sink: S,
    mut rx: mpsc::UnboundedReceiver<WriterMsg>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    let mut pending = DirtySet::default();
    let max_wait = debounce * MAX_COALESCE_WINDOWS;

    loop {
        // Idle: wait for the first signal of a burst.
        let first = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => msg,
        };
        match first {
            Some(WriterMsg::Dirty(kind)) => pending.mark(kind),
            Some(WriterMsg::Shutdown(ack)) => {
                flush(&sink, &mut pending).await;
                let _ = ack.send(());
                break;
            }
            None => {
                flush(&sink, &mut pending).await;
                break;
            }
        }

        // Coalesce: re-arm the timer on every signal, up to the cap.
        let burst_started = Instant::now();
        let mut deadline = burst_started + debounce;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(?pending, "writer cancelled -- pending writes dropped");
                    return;
                }
                _ = tokio::time::sleep_until(deadline) => break,
                msg = rx.recv() => match msg {
                    Some(WriterMsg::Dirty(kind)) => {
                        pending.mark(kind);
                        deadline = (Instant::now() + debounce).min(burst_started + max_wait);
                    }
                    Some(WriterMsg::Shutdown(ack)) => {
                        flush(&sink, &mut pending).await;
                        let _ = ack.send(());
                        return;
                    }
                    None => {
                        flush(&sink, &mut pending).await;
                        return;
                    }
                },
            }
        }

        flush(&sink, &mut pending).await;
    }

    info!("persistence writer stopped");
}

async fn flush<S: SnapshotSink>(sink: &S, pending: &mut DirtySet) {
    if pending.is_empty() {
        return;
    }
    let dirty = pending.take();
    if let Err(e) = sink.flush(dirty).await {
        warn!(error = %e, ?dirty, "debounced save failed -- will retry with the next change");
        pending.merge(dirty);
    }
}
