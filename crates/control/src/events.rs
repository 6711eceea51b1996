// In-process publish/subscribe for controller events

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use vpn_manager_common::Event;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(Uuid);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscriber {
    token: SubscriptionToken,
    handler: Handler,
}

/// Synchronous event broadcast to subscribers in subscription order
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(Uuid::new_v4());
        self.subscribers.lock().unwrap().push(Subscriber {
            token,
            handler: Arc::new(handler),
        });
        token
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.subscribers.lock().unwrap().retain(|s| s.token != token);
    }

    /// Deliver an event to all current subscribers, in the caller's execution
    /// context. The subscriber list is snapshotted first: a subscriber added
    /// during delivery does not see the in-flight event.
    pub fn publish(&self, event: &Event) {
        let handlers: Vec<Handler> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.handler.clone())
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}
