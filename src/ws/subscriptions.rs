//! Subscription tracking.

use crate::shared::Topic;

/// Active topics in first-subscribe order, without duplicates.
///
/// Replayed on every successful connect and kept across a manual
/// disconnect/connect cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    topics: Vec<Topic>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the topic was already tracked.
    pub fn insert(&mut self, topic: Topic) -> bool {
        if self.contains(&topic) {
            return false;
        }
        tracing::debug!(topic = %topic, "Tracking subscription");
        self.topics.push(topic);
        true
    }

    /// Returns `false` if the topic was not tracked.
    pub fn remove(&mut self, topic: &Topic) -> bool {
        let before = self.topics.len();
        self.topics.retain(|t| t != topic);
        self.topics.len() != before
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    pub fn to_vec(&self) -> Vec<Topic> {
        self.topics.clone()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
