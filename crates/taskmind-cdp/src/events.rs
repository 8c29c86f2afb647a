//! Event fan-out to subscribers.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::protocol::Event;

/// Subscribe to every event.
pub(crate) const ALL_EVENTS: &str = "*";

struct Subscriber {
    id: u64,
    filter: String,
    tx: mpsc::UnboundedSender<Event>,
}

impl Subscriber {
    fn wants(&self, method: &str) -> bool {
        self.filter == ALL_EVENTS || self.filter == method
    }
}

/// Registered subscribers, fed by the session's single reader task.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    inner: Mutex<Vec<Subscriber>>,
}

impl Subscribers {
    pub(crate) fn subscribe(self: &Arc<Self>, filter: &str) -> EventStream {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().push(Subscriber {
            id,
            filter: filter.to_string(),
            tx,
        });
        EventStream {
            id,
            rx,
            registry: Arc::downgrade(self),
        }
    }

    /// Deliver to every matching subscriber, pruning the ones that went away.
    pub(crate) fn publish(&self, event: &Event) {
        self.inner.lock().retain(|sub| {
            if sub.wants(&event.method) {
                sub.tx.send(event.clone()).is_ok()
            } else {
                !sub.tx.is_closed()
            }
        });
    }

    fn remove(&self, id: u64) {
        self.inner.lock().retain(|sub| sub.id != id);
    }

    /// End every stream.
    pub(crate) fn close_all(&self) {
        self.inner.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Ordered stream of events matching one subscription.
///
/// Ends when the session closes or dies. Dropping the stream cancels the
/// subscription.
pub struct EventStream {
    id: u64,
    rx: mpsc::UnboundedReceiver<Event>,
    registry: Weak<Subscribers>,
}

impl EventStream {
    /// Next event, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Stop delivery. Events already queued are discarded.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
