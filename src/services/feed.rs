use tokio::sync::broadcast;

use crate::models::events::{ChangeAction, ChangeEvent, Collection};

/// Fan-out of record-level changes to every connected subscriber.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        ChangeFeed { sender }
    }

    pub fn publish(&self, collection: Collection, id: &str, action: ChangeAction) {
        let event = ChangeEvent::new(collection, id, action);
        log::debug!("Change: {} {} {:?}", event.collection, event.id, event.action);

        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}
