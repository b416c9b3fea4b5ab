//! Typed publish/subscribe bus for classified events.
//!
//! Subscribers register per [`EventKind`] and are invoked in registration
//! order on every emission of that kind. Subscriber failures are isolated:
//! an error or panic in one subscriber is logged and never reaches the
//! emitter or sibling subscribers, so a bug in one reflector cannot
//! silence another.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::runner::{ClassifiedEvent, EventKind};

/// Error type subscribers may return; absorbed and logged by the bus.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A consumer of classified events.
#[async_trait]
pub trait Subscriber: Send {
    /// Name used when logging faults from this subscriber.
    fn name(&self) -> &'static str;

    /// React to one event.
    ///
    /// # Errors
    ///
    /// Errors are absorbed by the bus and logged, never propagated.
    async fn handle(&mut self, event: &ClassifiedEvent) -> Result<(), HandlerError>;
}

/// Per-kind subscriber registry.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<Box<dyn Subscriber>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one event kind.
    pub fn subscribe(&mut self, kind: EventKind, subscriber: Box<dyn Subscriber>) {
        self.subscribers.entry(kind).or_default().push(subscriber);
    }

    /// Number of subscribers registered for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver one event to every subscriber of its kind, in registration
    /// order. Each invocation is isolated; faults are logged and skipped.
    pub async fn emit(&mut self, event: &ClassifiedEvent) {
        let Some(subscribers) = self.subscribers.get_mut(&event.kind()) else {
            return;
        };

        for subscriber in subscribers.iter_mut() {
            let outcome = AssertUnwindSafe(subscriber.handle(event))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(
                        subscriber = subscriber.name(),
                        kind = ?event.kind(),
                        %error,
                        "Subscriber failed handling event"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        subscriber = subscriber.name(),
                        kind = ?event.kind(),
                        "Subscriber panicked handling event"
                    );
                }
            }
        }
    }
}
