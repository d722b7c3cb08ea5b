//! Error notification channel.
//!
//! Dispatch can route failures to subscribers instead of returning them.
//! The hub is owned by the [`Client`](crate::client::Client) it was built
//! with; there is no process-wide channel.

use crate::base::error::ReqError;
use std::fmt;
use std::sync::{Arc, RwLock};

type Subscriber = Arc<dyn Fn(&ReqError) + Send + Sync>;

/// Subscriber list for routed errors.
///
/// Cloning hands out another handle to the same list. With at least one
/// subscriber attached, dispatch runs in channel mode: every error that
/// would be returned is delivered here and the caller receives the empty
/// status-0 response instead.
#[derive(Clone, Default)]
pub struct ErrorHub {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
}

impl ErrorHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a subscriber. Subscribers are invoked in registration order.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&ReqError) + Send + Sync + 'static,
    {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.push(Arc::new(subscriber));
    }

    pub fn has_subscribers(&self) -> bool {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !subscribers.is_empty()
    }

    /// Deliver an error to every subscriber.
    pub(crate) fn notify(&self, error: &ReqError) {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for subscriber in subscribers.iter() {
            subscriber(error);
        }
    }
}

impl fmt::Debug for ErrorHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .subscribers
            .read()
            .map(|subscribers| subscribers.len())
            .unwrap_or(0);
        f.debug_struct("ErrorHub").field("subscribers", &count).finish()
    }
}
