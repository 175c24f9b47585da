//! Topic registry
//!
//! The set of live subscribers keyed by topic. A topic key exists only while
//! it has at least one subscriber.
//!
//! One `RwLock` covers every topic: snapshots share the read side, joins and
//! departures take the write side. Guards never outlive a method call;
//! `snapshot` clones the `Arc` handles out so delivery runs unlocked.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::broker::topic::Topic;
use crate::client::Subscriber;

#[derive(Debug, Default)]
pub struct Registry {
    topics: RwLock<HashMap<String, Topic>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Topic>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Topic>> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `subscriber` under its topic, creating the topic if needed.
    /// Returns `false` if the same connection was already registered.
    pub fn subscribe(&self, subscriber: Arc<Subscriber>) -> bool {
        let mut topics = self.write();
        topics
            .entry(subscriber.topic.clone())
            .or_insert_with(|| Topic::new(&subscriber.topic))
            .subscribe(subscriber)
    }

    /// Remove `subscriber` from its topic, dropping the topic once empty.
    ///
    /// Returns the number of subscribers left in the topic, or `None` if the
    /// subscriber was not registered. Calling this twice is harmless.
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> Option<usize> {
        let mut topics = self.write();
        let topic = topics.get_mut(&subscriber.topic)?;
        if !topic.unsubscribe(&subscriber.id) {
            return None;
        }

        let remaining = topic.len();
        if topic.is_empty() {
            topics.remove(&subscriber.topic);
        }
        Some(remaining)
    }

    /// Live subscribers of `topic` at this instant.
    pub fn snapshot(&self, topic: &str) -> Vec<Arc<Subscriber>> {
        self.read()
            .get(topic)
            .map(|t| t.subscribers.clone())
            .unwrap_or_default()
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.read().contains_key(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.read().len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.read().get(topic).map_or(0, Topic::len)
    }
}
