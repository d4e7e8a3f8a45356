//! Key-sharded vote accumulator
//!
//! Keys are routed to a shard by hash, so partial accumulators built from
//! different sources can be merged shard-by-shard with plain integer
//! addition. The merge is commutative and associative: the final sums do
//! not depend on source order, on how sources were split across workers, or
//! on the shard count.

use crate::mask::{resolve, Label, VoteKey};
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct ShardedVotes {
    shards: Vec<HashMap<VoteKey, i64>>,
}

impl ShardedVotes {
    pub fn new(shard_count: usize) -> Self {
        Self {
            shards: vec![HashMap::new(); shard_count.max(1)],
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, key: &VoteKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    pub fn add(&mut self, key: VoteKey, vote: Label) {
        self.add_sum(key, vote.value());
    }

    pub fn add_sum(&mut self, key: VoteKey, sum: i64) {
        let shard = self.shard_for(&key);
        *self.shards[shard].entry(key).or_insert(0) += sum;
    }

    /// Fold a vote stream in; returns the number of votes consumed
    pub fn extend_votes<I>(&mut self, votes: I) -> usize
    where
        I: IntoIterator<Item = (VoteKey, Label)>,
    {
        let mut count = 0;
        for (key, vote) in votes {
            self.add(key, vote);
            count += 1;
        }
        count
    }

    /// Add another accumulator's sums into this one
    pub fn merge(mut self, other: ShardedVotes) -> Self {
        if other.shard_count() == self.shard_count() {
            for (target, shard) in self.shards.iter_mut().zip(other.shards) {
                for (key, sum) in shard {
                    *target.entry(key).or_insert(0) += sum;
                }
            }
        } else {
            for (key, sum) in other.shards.into_iter().flatten() {
                self.add_sum(key, sum);
            }
        }
        self
    }

    pub fn get(&self, key: &VoteKey) -> Option<i64> {
        self.shards[self.shard_for(key)].get(key).copied()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.shards.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(HashMap::is_empty)
    }

    /// Classes that received at least one vote
    pub fn classes(&self) -> BTreeSet<String> {
        self.shards
            .iter()
            .flat_map(|shard| shard.keys())
            .map(|key| key.class.to_string())
            .collect()
    }

    /// Flatten into a plain key → sum map
    pub fn into_sums(self) -> HashMap<VoteKey, i64> {
        self.shards.into_iter().flatten().collect()
    }

    /// Map every summed vote to its consensus label, shards in parallel
    pub fn resolve(self) -> Vec<(VoteKey, Label)> {
        self.shards
            .into_par_iter()
            .flat_map_iter(|shard| shard.into_iter().map(|(key, sum)| (key, resolve(sum))))
            .collect()
    }
}
