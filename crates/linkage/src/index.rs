//! Blocking index over voter records.
//!
//! Voters are bucketed by `(family, given initial)`. A lookup reads the exact
//! bucket plus the buckets of families within edit distance 1, found through a
//! deletion-variant map rather than a scan over every family.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::IndexConfig;
use crate::model::{PersonName, VoterRecord};
use crate::similarity::{deletion_variants, levenshtein};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub family: String,
    pub initial: Option<char>,
}

impl BlockKey {
    /// `None` when the name has no family to block on.
    pub fn of(name: &PersonName) -> Option<Self> {
        if name.family.is_empty() {
            return None;
        }
        Some(Self {
            family: name.family.to_lowercase(),
            initial: name.given.chars().next().and_then(|c| c.to_lowercase().next()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub voters: usize,
    pub buckets: usize,
    pub families: usize,
    /// Voters with no family name; kept out of every bucket.
    pub unblocked: usize,
}

pub struct CandidateIndex {
    voters: Vec<VoterRecord>,
    buckets: FxHashMap<BlockKey, Vec<usize>>,
    /// Family → initials present under it, sorted.
    initials: FxHashMap<String, Vec<Option<char>>>,
    /// Deletion variant → families producing it.
    variants: FxHashMap<String, Vec<String>>,
    max_extra_buckets: usize,
    unblocked: usize,
}

impl CandidateIndex {
    /// Build in one pass over the voter stream.
    pub fn build<I>(voters: I, config: &IndexConfig) -> Self
    where
        I: IntoIterator<Item = VoterRecord>,
    {
        let mut index = Self {
            voters: Vec::new(),
            buckets: FxHashMap::default(),
            initials: FxHashMap::default(),
            variants: FxHashMap::default(),
            max_extra_buckets: config.max_extra_buckets,
            unblocked: 0,
        };

        for voter in voters {
            let Some(key) = BlockKey::of(&voter.name) else {
                index.unblocked += 1;
                continue;
            };
            let slot = index.voters.len();
            index.voters.push(voter);

            let initials = index.initials.entry(key.family.clone()).or_default();
            if initials.is_empty() {
                for variant in deletion_variants(&key.family) {
                    index.variants.entry(variant).or_default().push(key.family.clone());
                }
            }
            if let Err(pos) = initials.binary_search(&key.initial) {
                initials.insert(pos, key.initial);
            }
            index.buckets.entry(key).or_default().push(slot);
        }

        let stats = index.stats();
        log::info!(
            "candidate index built: {} voters in {} buckets ({} families, {} unblocked)",
            stats.voters,
            stats.buckets,
            stats.families,
            stats.unblocked
        );
        index
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            voters: self.voters.len(),
            buckets: self.buckets.len(),
            families: self.initials.len(),
            unblocked: self.unblocked,
        }
    }

    /// Every indexed voter, in load order.
    pub fn voters(&self) -> &[VoterRecord] {
        &self.voters
    }

    /// Bucket keys consulted for `name`: the exact key first (if populated),
    /// then neighbours ordered by (distance, same initial first, family,
    /// initial), capped at `max_extra_buckets`.
    pub fn probe(&self, name: &PersonName) -> Vec<BlockKey> {
        let Some(key) = BlockKey::of(name) else {
            return Vec::new();
        };

        let mut neighbours: Vec<(usize, bool, &str, Option<char>)> = Vec::new();
        for family in self.neighbour_families(&key.family) {
            let distance = if family == key.family { 0 } else { 1 };
            for &initial in self.initials.get(family).map(Vec::as_slice).unwrap_or(&[]) {
                if distance == 0 && initial == key.initial {
                    continue;
                }
                neighbours.push((distance, initial != key.initial, family, initial));
            }
        }
        neighbours.sort();
        neighbours.truncate(self.max_extra_buckets);

        let mut keys = Vec::with_capacity(neighbours.len() + 1);
        if self.buckets.contains_key(&key) {
            keys.push(key);
        }
        keys.extend(neighbours.into_iter().map(|(_, _, family, initial)| BlockKey {
            family: family.to_string(),
            initial,
        }));
        keys
    }

    /// Candidate voters for `name`. Buckets are disjoint, so no voter
    /// appears twice.
    pub fn lookup(&self, name: &PersonName) -> Vec<&VoterRecord> {
        self.probe(name)
            .iter()
            .filter_map(|key| self.buckets.get(key))
            .flatten()
            .map(|&slot| &self.voters[slot])
            .collect()
    }

    /// Indexed families within edit distance 1 of `family`, including itself.
    fn neighbour_families(&self, family: &str) -> Vec<&str> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for variant in deletion_variants(family) {
            if let Some(families) = self.variants.get(&variant) {
                for f in families {
                    if levenshtein(f, family) <= 1 {
                        seen.insert(f.as_str());
                    }
                }
            }
        }
        let mut out: Vec<&str> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }
}
