//! Topic membership
//!
//! A `Topic` holds the live subscribers of one topic name. The list is
//! logically a set: a connection id appears at most once, and removal uses
//! `swap_remove`, so order carries no meaning beyond join order until the
//! first departure.
//!
//! Callers synchronise access through the registry lock.

use std::sync::Arc;

use crate::client::Subscriber;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: Vec<Arc<Subscriber>>,
}

impl Topic {
    /// Create an empty topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Vec::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.subscribers.iter().any(|s| s.id == id)
    }

    /// Add a subscriber. Returns `false` if its connection id is already present.
    pub fn subscribe(&mut self, subscriber: Arc<Subscriber>) -> bool {
        if self.contains(&subscriber.id) {
            return false;
        }
        self.subscribers.push(subscriber);
        true
    }

    /// Remove the subscriber with connection id `id`.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        match self.subscribers.iter().position(|s| s.id == id) {
            Some(index) => {
                self.subscribers.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
