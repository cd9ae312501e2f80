//! ============================================================================
//! Error Channel - Process-wide broadcast of failure messages
//! ============================================================================
//! Stores never return their failures to callers. They turn them into a
//! single human-readable line and publish it here; views subscribe and show
//! whatever arrives.
//! ============================================================================

use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;

use crate::observable::{Broadcast, Subscription};
use crate::types::StoreError;

static GLOBAL: Lazy<Arc<ErrorChannel>> = Lazy::new(|| Arc::new(ErrorChannel::new()));

/// Broadcast channel of free-text failure messages
pub struct ErrorChannel {
    messages: Broadcast<String>,
}

impl ErrorChannel {
    /// Create a private channel (tests, embedded contexts)
    pub fn new() -> Self {
        Self {
            messages: Broadcast::new(),
        }
    }

    /// The process-wide channel, built on first use and never torn down
    pub fn global() -> Arc<ErrorChannel> {
        Arc::clone(&GLOBAL)
    }

    /// Deliver a message to the subscribers active right now.
    /// Without subscribers the message is dropped.
    pub fn publish(&self, message: impl Into<String>) {
        let message = message.into();
        let delivered = self.messages.publish(message.clone());
        warn!("{} (delivered to {} subscribers)", message, delivered);
    }

    /// Publish the display text of a store failure
    pub fn report(&self, error: &StoreError) {
        self.publish(error.to_string());
    }

    /// Receive every message published from now on
    pub fn subscribe(&self, handler: impl Fn(&String) + Send + Sync + 'static) -> Subscription {
        self.messages.subscribe(handler)
    }

    pub fn subscriber_count(&self) -> usize {
        self.messages.subscriber_count()
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}
