//! Order-preserving hand-off between the network task and the consumer.

use tokio::sync::mpsc;

/// Producing end; cheap to clone, usable from any task.
#[derive(Debug)]
pub struct EventProducer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for EventProducer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventProducer<T> {
    /// Enqueue an item. Returns `false` once the consumer is gone.
    pub fn push(&self, item: impl Into<T>) -> bool {
        self.tx.send(item.into()).is_ok()
    }
}

/// Consuming end, owned by whoever owns the session state.
#[derive(Debug)]
pub struct EventQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventQueue<T> {
    /// Take everything queued so far without waiting.
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    /// Wait for the next item. `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

pub fn event_queue<T>() -> (EventProducer<T>, EventQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventProducer { tx }, EventQueue { rx })
}
