use std::sync::Arc;

use tokio::sync::watch;

/// Knowledge-base size shared between the chat view, the management view and
/// the surrounding shell.
#[derive(Debug, Clone)]
pub struct KnowledgeCounter {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for KnowledgeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeCounter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, total: u64) {
        self.tx.send_replace(total);
    }

    pub fn get(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}
