// Host-facing events
//
// ClientEvent/ClientEventQueue carry messages for whatever front end is attached.
// DeferredInit is the one-shot "host startup finished" signal.

use crate::models::FileChangeEvent;
use camino::Utf8PathBuf;
use tokio::sync::broadcast;

/// Messages for the client UI.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// Non-blocking warning bar
    ShowWarningBar { severe: bool, message: String },

    /// A batch of changes observed under a monitored root
    FilesChanged {
        root: Utf8PathBuf,
        changes: Vec<FileChangeEvent>,
    },
}

/// Accepts client events for downstream display.
pub trait ClientEventSink {
    fn enqueue(&self, event: ClientEvent);
}

/// Broadcast queue of client events.
///
/// Subscribers receive every event enqueued after they subscribed.
#[derive(Clone)]
pub struct ClientEventQueue {
    tx: broadcast::Sender<ClientEvent>,
}

impl ClientEventQueue {
    /// Create a queue buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

impl Default for ClientEventQueue {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ClientEventSink for ClientEventQueue {
    fn enqueue(&self, event: ClientEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.tx.send(event);
    }
}

/// One-shot, multi-subscriber signal fired once the host has finished starting up.
///
/// Handlers receive the target passed to [`fire`](Self::fire). Handlers
/// connected after the signal fired are never run.
pub struct DeferredInit<T> {
    fired: bool,
    handlers: Vec<Box<dyn FnOnce(&mut T)>>,
}

impl<T> DeferredInit<T> {
    pub fn new() -> Self {
        Self {
            fired: false,
            handlers: Vec::new(),
        }
    }

    pub fn connect(&mut self, handler: impl FnOnce(&mut T) + 'static) {
        if self.fired {
            tracing::warn!("Deferred init already fired; handler will not run");
            return;
        }
        self.handlers.push(Box::new(handler));
    }

    /// Run every connected handler in connection order.
    ///
    /// Returns `false` (and does nothing) if the signal already fired.
    pub fn fire(&mut self, target: &mut T) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;

        let handlers = std::mem::take(&mut self.handlers);
        tracing::debug!("Firing deferred init ({} handlers)", handlers.len());
        for handler in handlers {
            handler(target);
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn pending_handlers(&self) -> usize {
        self.handlers.len()
    }
}

impl<T> Default for DeferredInit<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_init_runs_handlers_once_in_order() {
        let mut signal = DeferredInit::<Vec<u32>>::new();
        signal.connect(|log| log.push(1));
        signal.connect(|log| log.push(2));

        let mut log = Vec::new();
        assert!(signal.fire(&mut log));
        assert!(!signal.fire(&mut log));

        assert_eq!(log, vec![1, 2]);
        assert!(signal.has_fired());
    }

    #[test]
    fn test_handler_connected_after_fire_is_dropped() {
        let mut signal = DeferredInit::<Vec<u32>>::new();
        let mut log = Vec::new();
        signal.fire(&mut log);

        signal.connect(|log| log.push(3));

        assert_eq!(signal.pending_handlers(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_queue_broadcasts_to_all_subscribers() {
        let queue = ClientEventQueue::default();
        let mut rx1 = queue.subscribe();
        let mut rx2 = queue.subscribe();

        let event = ClientEvent::ShowWarningBar {
            severe: false,
            message: "careful".to_string(),
        };
        queue.enqueue(event.clone());

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }

    #[test]
    fn test_enqueue_without_subscribers_is_harmless() {
        let queue = ClientEventQueue::default();
        queue.enqueue(ClientEvent::ShowWarningBar {
            severe: true,
            message: "nobody listens".to_string(),
        });
    }
}
