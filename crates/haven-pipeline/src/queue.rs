//! The bounded event queue.
//!
//! FIFO within the queue, no cross-camera ordering. At capacity the OLDEST
//! pending event is dropped (with a warning naming its camera and
//! timestamp) so fresh motion always gets a slot.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use haven_models::ProcessingEvent;

/// Bounded multi-producer queue drained by the worker pool.
pub struct EventQueue {
    inner: Mutex<VecDeque<ProcessingEvent>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue an event. Never blocks; at capacity the oldest pending
    /// event is dropped and logged.
    pub fn push(&self, event: ProcessingEvent) {
        if self.closed.load(Ordering::SeqCst) {
            warn!(camera = %event.camera_id(), "queue closed, event discarded");
            return;
        }

        {
            let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if queue.len() >= self.capacity {
                if let Some(dropped) = queue.pop_front() {
                    warn!(
                        camera = %dropped.camera_id(),
                        timestamp = %dropped.trigger.detected_at,
                        "queue full, dropping oldest pending event"
                    );
                    metrics::counter!("haven_queue_dropped_total").increment(1);
                }
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Await the next event. Returns `None` once the queue is closed and
    /// fully drained, which is how workers learn to stop.
    pub async fn pop(&self) -> Option<ProcessingEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the queue: producers are rejected, workers drain what is left
    /// and then see `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Remove and return everything still pending (shutdown accounting).
    pub fn drain(&self) -> Vec<ProcessingEvent> {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
