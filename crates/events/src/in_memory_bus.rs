//! Process-local fan-out for kitchen events.

use std::sync::{Mutex, MutexGuard, PoisonError, mpsc};

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InMemoryBusError {
    /// Every subscriber had hung up; the message went nowhere.
    #[error("no live subscribers")]
    NoSubscribers,
}

struct Fanout<M> {
    senders: Vec<mpsc::Sender<M>>,
    published: u64,
}

/// Channel-per-subscriber bus.
///
/// Subscribers whose receiving end was dropped are forgotten on the next
/// publish. Publishing with nobody listening is not an error; publishing
/// when every remaining subscriber has gone away is.
pub struct InMemoryEventBus<M> {
    fanout: Mutex<Fanout<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn fanout(&self) -> MutexGuard<'_, Fanout<M>> {
        self.fanout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.fanout().senders.len()
    }

    /// Messages accepted since the bus was created, listened to or not.
    pub fn published(&self) -> u64 {
        self.fanout().published
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            fanout: Mutex::new(Fanout {
                senders: Vec::new(),
                published: 0,
            }),
        }
    }
}

impl<M> std::fmt::Debug for InMemoryEventBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fanout = self.fanout();
        f.debug_struct("InMemoryEventBus")
            .field("subscribers", &fanout.senders.len())
            .field("published", &fanout.published)
            .finish()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut fanout = self.fanout();
        fanout.published += 1;

        if fanout.senders.is_empty() {
            return Ok(());
        }
        fanout.senders.retain(|tx| tx.send(message.clone()).is_ok());
        if fanout.senders.is_empty() {
            return Err(InMemoryBusError::NoSubscribers);
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.fanout().senders.push(tx);
        Subscription::new(rx)
    }
}
