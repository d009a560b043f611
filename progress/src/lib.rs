//! Aggregation of progress from concurrent subtasks into one stream.
//!
//! A [`ProgressCoordinator`] hands out [`TaskHandle`]s, one per subtask
//! (image fetch, kernel fetch, ...). Updates from every handle funnel into
//! a single channel in the order they are sent, and a final
//! [`ProgressEvent::Finished`] is emitted once every handle has been
//! dropped and the coordinator itself is closed.

use berth_core::ProgressEvent;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

struct Shared {
    sender: mpsc::UnboundedSender<ProgressEvent>,
    active_handles: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn maybe_finish(&self) {
        if self.closed.load(Ordering::SeqCst) && self.active_handles.load(Ordering::SeqCst) == 0 {
            let _ = self.sender.send(ProgressEvent::Finished);
        }
    }
}

pub struct ProgressCoordinator {
    shared: Arc<Shared>,
    next_task: AtomicU64,
}

impl ProgressCoordinator {
    /// Wraps an existing sink, such as the per-request progress channel of
    /// the RPC server.
    pub fn new(sink: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            shared: Arc::new(Shared {
                sender: sink,
                active_handles: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
            next_task: AtomicU64::new(1),
        }
    }

    /// Standalone coordinator with its own channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Allocates a handle for one subtask.
    pub fn task(&self) -> TaskHandle {
        self.shared.active_handles.fetch_add(1, Ordering::SeqCst);
        TaskHandle {
            id: self.next_task.fetch_add(1, Ordering::Relaxed),
            processed: AtomicU64::new(0),
            shared: self.shared.clone(),
        }
    }
}

impl Drop for ProgressCoordinator {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.maybe_finish();
    }
}

/// Reports progress for one subtask. Dropping the handle marks the
/// subtask complete.
pub struct TaskHandle {
    id: u64,
    processed: AtomicU64,
    shared: Arc<Shared>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Announces what the subtask is doing ("Fetching image", ...).
    pub fn describe(&self, description: &str) {
        let _ = self.shared.sender.send(ProgressEvent::Update {
            task: self.id,
            description: Some(description.to_string()),
            items_name: None,
            processed: None,
            total: None,
        });
    }

    /// Declares the unit being counted and the expected total.
    pub fn set_items(&self, items_name: &str, total: u64) {
        let _ = self.shared.sender.send(ProgressEvent::Update {
            task: self.id,
            description: None,
            items_name: Some(items_name.to_string()),
            processed: Some(self.processed.load(Ordering::Relaxed)),
            total: Some(total),
        });
    }

    /// Adds completed items to the subtask's counter.
    pub fn advance(&self, count: u64) {
        let processed = self.processed.fetch_add(count, Ordering::Relaxed) + count;
        let _ = self.shared.sender.send(ProgressEvent::Update {
            task: self.id,
            description: None,
            items_name: None,
            processed: Some(processed),
            total: None,
        });
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.shared.active_handles.fetch_sub(1, Ordering::SeqCst);
        self.shared.maybe_finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_updates_preserve_send_order() {
        let (coordinator, mut rx) = ProgressCoordinator::channel();
        let a = coordinator.task();
        let b = coordinator.task();

        a.describe("Fetching image");
        b.describe("Fetching kernel");
        a.advance(1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        match &events[0] {
            ProgressEvent::Update { task, description, .. } => {
                assert_eq!(*task, a.id());
                assert_eq!(description.as_deref(), Some("Fetching image"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[1] {
            ProgressEvent::Update { task, .. } => assert_eq!(*task, b.id()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_finished_after_all_handles_and_close() {
        let (coordinator, mut rx) = ProgressCoordinator::channel();
        let task = coordinator.task();
        task.advance(1);

        drop(task);
        assert!(
            !drain(&mut rx).contains(&ProgressEvent::Finished),
            "no finish while the coordinator is open"
        );

        drop(coordinator);
        assert!(drain(&mut rx).contains(&ProgressEvent::Finished));
    }

    #[tokio::test]
    async fn test_finished_when_handles_outlive_coordinator() {
        let (coordinator, mut rx) = ProgressCoordinator::channel();
        let task = coordinator.task();
        drop(coordinator);
        assert!(!drain(&mut rx).contains(&ProgressEvent::Finished));

        drop(task);
        assert!(drain(&mut rx).contains(&ProgressEvent::Finished));
    }

    #[tokio::test]
    async fn test_advance_accumulates() {
        let (coordinator, mut rx) = ProgressCoordinator::channel();
        let task = coordinator.task();
        task.advance(2);
        task.advance(3);

        let events = drain(&mut rx);
        match &events[1] {
            ProgressEvent::Update { processed, .. } => assert_eq!(*processed, Some(5)),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
