use std::collections::{BTreeMap, HashSet};

/// Number of co-members that also belong to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCount {
    pub channel_id: String,
    pub count: u32,
}

/// Channel id → number of the triggering channel's other members in it
///
/// Entries are only created by [`CoMembershipCounts::record_member`], so every
/// count is at least 1. Iteration is in channel id order, which is also the
/// tie-break used by [`CoMembershipCounts::ranked`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoMembershipCounts {
    counts: BTreeMap<String, u32>,
}

impl CoMembershipCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one member's channel memberships. A channel listed more than once
    /// for the same member is still counted once.
    pub fn record_member<I, S>(&mut self, channel_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: HashSet<String> = channel_ids.into_iter().map(Into::into).collect();
        for channel_id in unique {
            *self.counts.entry(channel_id).or_insert(0) += 1;
        }
    }

    pub fn get(&self, channel_id: &str) -> Option<u32> {
        self.counts.get(channel_id).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Drops every channel in `channel_ids`
    pub fn remove_all(&mut self, channel_ids: &HashSet<String>) {
        self.counts.retain(|id, _| !channel_ids.contains(id));
    }

    /// Entries sorted by descending count; equal counts keep channel id order
    pub fn ranked(&self) -> Vec<ChannelCount> {
        let mut ranked: Vec<ChannelCount> = self
            .counts
            .iter()
            .map(|(channel_id, count)| ChannelCount {
                channel_id: channel_id.clone(),
                count: *count,
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}
