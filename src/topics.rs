//! Subscription registry and the derived topic set.
//!
//! [`SubscriptionTable`] owns every live subscription record; callers only
//! ever hold a [`RealtimeSubscription`](crate::RealtimeSubscription) handle.
//! The table keeps its [`ChannelSet`] equal to the union of topics over live
//! subscriptions at all times by re-deriving it on every mutation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::models::RealtimeEvent;

/// Callback invoked with each matching event for one subscription.
pub type EventCallback = Arc<dyn Fn(RealtimeEvent) + Send + Sync>;

/// The union of topics currently required by at least one live subscription.
///
/// Set semantics only: membership matters, order does not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSet(BTreeSet<String>);

impl ChannelSet {
    /// Whether no subscription requires any topic.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct topics in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `channel` is required by some live subscription.
    pub fn contains(&self, channel: &str) -> bool {
        self.0.contains(channel)
    }

    /// Whether any topic in `channels` is in this set.
    pub fn intersects(&self, channels: &BTreeSet<String>) -> bool {
        channels.iter().any(|c| self.0.contains(c))
    }

    /// Iterate topics in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

struct SubEntry {
    channels: BTreeSet<String>,
    callback: EventCallback,
}

/// Registry of live subscriptions keyed by a process-lifetime-unique id.
pub(crate) struct SubscriptionTable {
    subs: HashMap<u64, SubEntry>,
    next_id: u64,
    channels: ChannelSet,
}

impl SubscriptionTable {
    pub(crate) fn new() -> Self {
        Self {
            subs: HashMap::new(),
            next_id: 0,
            channels: ChannelSet::default(),
        }
    }

    /// Store a new subscription and fold its topics into the channel set.
    /// Returns the allocated id.
    pub(crate) fn register(&mut self, channels: BTreeSet<String>, callback: EventCallback) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.channels.0.extend(channels.iter().cloned());
        self.subs.insert(id, SubEntry { channels, callback });
        id
    }

    /// Remove a subscription and re-derive the channel set from the
    /// remaining records. A topic leaves the set only when no remaining
    /// subscription references it.
    ///
    /// Returns `false` if `id` was already removed.
    pub(crate) fn remove(&mut self, id: u64) -> bool {
        if self.subs.remove(&id).is_none() {
            return false;
        }
        self.channels = self
            .subs
            .values()
            .flat_map(|entry| entry.channels.iter().cloned())
            .collect();
        true
    }

    /// Current union of topics over live subscriptions.
    pub(crate) fn channel_set(&self) -> &ChannelSet {
        &self.channels
    }

    /// Callbacks of every live subscription whose topic set intersects
    /// `event_channels`. Shared topics yield one entry per subscription.
    pub(crate) fn matching(&self, event_channels: &BTreeSet<String>) -> Vec<(u64, EventCallback)> {
        self.subs
            .iter()
            .filter(|(_, entry)| entry.channels.iter().any(|c| event_channels.contains(c)))
            .map(|(id, entry)| (*id, entry.callback.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subs.len()
    }
}
