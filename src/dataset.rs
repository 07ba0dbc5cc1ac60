//! Canonical in-memory form of the input sequences.
//!
//! Caller items are interned into dense ids assigned in ascending
//! `Ord` order, so a [`EventSet`] iterates its items in the caller's
//! item order and sorted-unique canonicalization falls out of the
//! representation. Sequence ids become dense indices the same way;
//! event labels were already replaced by ranks at configuration time.

use std::collections::{BTreeSet, HashMap};

use crate::element::EventSet;
use crate::error::SpadeError;
use crate::{Item, SequenceId};

/// Interned dataset: everything the mining phases need, plus the
/// tables to decode results back into caller types.
#[derive(Debug)]
pub struct Dataset<S, I> {
    /// Caller sequence ids, indexed by dense sid.
    pub sids: Vec<S>,
    /// Caller items, indexed by interned id; ascending by `Ord`.
    pub items: Vec<I>,
    /// Canonical itemsets per dense sid, indexed by event rank.
    pub events: Vec<Vec<EventSet>>,
}

impl<S: SequenceId, I: Item> Dataset<S, I> {
    /// Intern a configured input. `sequences` must already be sorted
    /// by sid with events in rank order; itemsets arrive raw and are
    /// canonicalized here. An empty itemset is a domain failure.
    pub fn build(sequences: &[(S, Vec<Vec<I>>)]) -> Result<Self, SpadeError> {
        let mut universe = BTreeSet::new();
        for (_, events) in sequences {
            for itemset in events {
                for item in itemset {
                    universe.insert(item.clone());
                }
            }
        }
        let items: Vec<I> = universe.into_iter().collect();
        let index: HashMap<&I, usize> = items
            .iter()
            .enumerate()
            .map(|(id, item)| (item, id))
            .collect();

        let mut sids = Vec::with_capacity(sequences.len());
        let mut events = Vec::with_capacity(sequences.len());
        for (sid, raw_events) in sequences {
            let mut ranked = Vec::with_capacity(raw_events.len());
            for (rank, itemset) in raw_events.iter().enumerate() {
                if itemset.is_empty() {
                    return Err(SpadeError::EmptyItemset {
                        sid: format!("{sid:?}"),
                        eid: rank,
                    });
                }
                let mut set = EventSet::new();
                for item in itemset {
                    set.insert(index[item]);
                }
                ranked.push(set);
            }
            sids.push(sid.clone());
            events.push(ranked);
        }
        Ok(Self { sids, items, events })
    }

    /// Number of distinct interned items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
