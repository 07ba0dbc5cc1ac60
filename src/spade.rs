//! Sequential PAttern Discovery using Equivalence classes, a.k.a.
//! Spade: a vertical data format-based sequential pattern method.
//!
//! Mining runs in three phases. Phase A builds vertical id-lists and
//! keeps the frequent single items. Phase B counts per-sequence item
//! pairs as a candidate filter, joins the surviving 1-elements into
//! frequent 2-elements, and builds the co-occurrence map. Phase C
//! enumerates longer patterns depth-first: elements sharing a
//! (k-1)-prefix form an equivalence class, and every ordered member
//! pair (the diagonal included) is joined to produce the next level.
//!
//! Ref: http://www.philippe-fournier-viger.com/spmf/SPADE.pdf

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::{debug, trace};

use crate::cmap::Cmap;
use crate::dataset::Dataset;
use crate::element::{Element, ElementPool, Pattern, Record};
use crate::error::SpadeError;
use crate::{EventLabel, Item, SequenceId};

/// Mining parameters.
#[derive(Debug, Clone)]
pub struct SpadeConfig {
    /// Minimum number of distinct sequences a pattern must occur in.
    /// Must be positive.
    pub min_support: usize,
    /// Cap on pattern length k (total item occurrences). `None` is
    /// unbounded; `Some(0)` is rejected.
    pub max_length: Option<usize>,
    /// Keep only maximal patterns: no returned pattern is a strict
    /// subsequence of another returned pattern.
    pub maximal: bool,
    /// Keep only the N longest patterns by `(length, size)`, ties
    /// broken by sequence order. `Some(0)` is rejected.
    pub top_n: Option<usize>,
    /// Order the output by ascending `(length, size, sequence)`.
    pub sort: bool,
}

impl Default for SpadeConfig {
    fn default() -> Self {
        Self {
            min_support: 1,
            max_length: None,
            maximal: false,
            top_n: None,
            sort: false,
        }
    }
}

/// One mined pattern, decoded back to caller types.
///
/// Each `(sid, eid_rank)` witness marks an occurrence of the pattern
/// ending at that event rank, so callers can recompute support and
/// per-sequence coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequentSequence<S, I> {
    /// The pattern: temporally ordered itemsets, each sorted-unique.
    pub sequence: Vec<Vec<I>>,
    /// Count of distinct sids in the id-list.
    pub support: usize,
    /// Witnesses, ordered by `(sid, eid_rank)`.
    pub id_list: Vec<(S, usize)>,
}

impl<S, I: fmt::Debug> fmt::Display for FrequentSequence<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, itemset) in self.sequence.iter().enumerate() {
            if idx > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{itemset:?}")?;
        }
        Ok(())
    }
}

/// The mining engine. Single-threaded and synchronous; one `execute`
/// call runs to completion and owns all intermediate state, so a
/// failed call never leaks into the next run.
#[derive(Debug)]
pub struct Spade<S: SequenceId, I: Item> {
    sequences: Vec<(S, Vec<Vec<I>>)>,
    config: SpadeConfig,
}

impl<S: SequenceId, I: Item> Spade<S, I> {
    pub fn new() -> Self {
        Self {
            sequences: Vec::new(),
            config: SpadeConfig::default(),
        }
    }

    /// Set the input sequences and parameters, replacing any previous
    /// state. Event labels are replaced by their ascending rank within
    /// each sequence; validation happens in [`execute`](Self::execute).
    pub fn configure<L: EventLabel>(
        &mut self,
        sequences: HashMap<S, HashMap<L, Vec<I>>>,
        config: SpadeConfig,
    ) {
        let mut rows: Vec<(S, Vec<Vec<I>>)> = sequences
            .into_iter()
            .map(|(sid, events)| {
                let mut labeled: Vec<(L, Vec<I>)> = events.into_iter().collect();
                labeled.sort_by(|a, b| a.0.cmp(&b.0));
                let ranked = labeled.into_iter().map(|(_, itemset)| itemset).collect();
                (sid, ranked)
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        self.sequences = rows;
        self.config = config;
    }

    /// Run the mining and return the frequent patterns.
    ///
    /// Errors are terminal for the call and discard all partial state;
    /// the engine stays reconfigurable afterwards.
    pub fn execute(&mut self) -> Result<Vec<FrequentSequence<S, I>>, SpadeError> {
        if self.config.min_support == 0 {
            return Err(SpadeError::InvalidMinSupport { given: 0 });
        }
        if self.config.max_length == Some(0) {
            return Err(SpadeError::InvalidMaxLength { given: 0 });
        }
        if self.config.top_n == Some(0) {
            return Err(SpadeError::InvalidTopN { given: 0 });
        }
        if self.sequences.is_empty() {
            return Err(SpadeError::EmptySequences);
        }

        let dataset = Dataset::build(&self.sequences)?;
        let mut mining = Mining::new(&self.config);

        let ones = mining.frequent_one_sequences(&dataset);
        debug!(frequent_items = ones.len(), "frequent 1-sequences generated");

        if self.config.max_length == Some(1) {
            mining.promote(ones)?;
        } else {
            let (ones, twos) = mining.frequent_two_sequences(&dataset, ones)?;
            mining.cmap = Some(Cmap::from_elements(twos.iter()));
            debug!(pairs = twos.len(), "frequent 2-sequences generated");

            mining.promote(ones)?;
            let run_dfs = !twos.is_empty() && self.config.max_length.map_or(true, |cap| cap > 2);
            if mining.maximal {
                if run_dfs {
                    mining.enumerate(twos)?;
                } else {
                    mining.promote(twos)?;
                }
            } else {
                mining.promote(twos.clone())?;
                if run_dfs {
                    mining.enumerate(twos)?;
                }
            }
        }

        let mut elements = std::mem::take(&mut mining.frequent).drain_sorted();
        if self.config.sort {
            elements.sort_by(|a, b| {
                (a.length(), a.size())
                    .cmp(&(b.length(), b.size()))
                    .then_with(|| a.sequence.cmp(&b.sequence))
            });
        }
        debug!(patterns = elements.len(), "mining complete");
        Ok(elements
            .into_iter()
            .map(|element| decode(element, &dataset))
            .collect())
    }
}

impl<S: SequenceId, I: Item> Default for Spade<S, I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-execution state: parameters, the co-occurrence map once built,
/// and the pool of frequent elements accumulated so far.
struct Mining {
    min_support: usize,
    max_length: Option<usize>,
    maximal: bool,
    top_n: Option<usize>,
    cmap: Option<Cmap>,
    frequent: ElementPool,
}

impl Mining {
    fn new(config: &SpadeConfig) -> Self {
        Self {
            min_support: config.min_support,
            max_length: config.max_length,
            maximal: config.maximal,
            top_n: config.top_n,
            cmap: None,
            frequent: ElementPool::new(),
        }
    }

    /// Phase A: vertical id-lists per item, pruned by support.
    /// Returned elements are ordered by item, which is sequence order.
    fn frequent_one_sequences<S: SequenceId, I: Item>(
        &self,
        dataset: &Dataset<S, I>,
    ) -> Vec<Element> {
        let mut lists: Vec<Vec<Record>> = vec![Vec::new(); dataset.item_count()];
        for (sid, events) in dataset.events.iter().enumerate() {
            for (rank, set) in events.iter().enumerate() {
                for item in set.iter() {
                    lists[item].push(Record::new(sid as u32, rank as u32));
                }
            }
        }

        let mut out = Vec::new();
        for (item, id_list) in lists.into_iter().enumerate() {
            if id_list.is_empty() {
                continue;
            }
            let element = Element::new(Pattern::singleton(item), id_list);
            if element.support() >= self.min_support {
                out.push(element);
            }
        }
        out
    }

    /// Phase B: join candidate item pairs into frequent 2-elements.
    ///
    /// Candidates come from counting unordered occurrence pairs of
    /// frequent items per sequence. The count only pre-filters; the
    /// join's support check is authoritative. In maximal mode the
    /// 1-elements covered by a retained 2-element are dropped here.
    fn frequent_two_sequences<S: SequenceId, I: Item>(
        &self,
        dataset: &Dataset<S, I>,
        ones: Vec<Element>,
    ) -> Result<(Vec<Element>, Vec<Element>), SpadeError> {
        let by_item: HashMap<usize, &Element> = ones
            .iter()
            .filter_map(|e| e.sequence.last_item().map(|item| (item, e)))
            .collect();

        let mut pair_counts: HashMap<(usize, usize), usize> = HashMap::new();
        for events in &dataset.events {
            let mut occurrences = Vec::new();
            for set in events {
                for item in set.iter() {
                    if by_item.contains_key(&item) {
                        occurrences.push(item);
                    }
                }
            }
            for i in 0..occurrences.len() {
                for j in i + 1..occurrences.len() {
                    let (x, y) = if occurrences[i] <= occurrences[j] {
                        (occurrences[i], occurrences[j])
                    } else {
                        (occurrences[j], occurrences[i])
                    };
                    *pair_counts.entry((x, y)).or_insert(0) += 1;
                }
            }
        }

        let mut candidates: Vec<(usize, usize)> = pair_counts
            .into_iter()
            .filter(|&(_, count)| count >= self.min_support)
            .map(|(pair, _)| pair)
            .collect();
        candidates.sort_unstable();

        let mut pool = ElementPool::new();
        for (x, y) in candidates {
            let (Some(first), Some(second)) = (by_item.get(&x).copied(), by_item.get(&y).copied())
            else {
                continue;
            };
            if let Some(joined) = first.join(second, None) {
                for element in joined.drain_sorted() {
                    if element.support() >= self.min_support {
                        pool.merge(element)?;
                    }
                }
            }
        }
        drop(by_item);
        let twos = pool.drain_sorted();

        let ones = if self.maximal {
            let mut covered = HashSet::new();
            for element in &twos {
                for set in element.sequence.itemsets() {
                    for item in set.iter() {
                        covered.insert(item);
                    }
                }
            }
            ones.into_iter()
                .filter(|e| {
                    e.sequence
                        .last_item()
                        .map_or(true, |item| !covered.contains(&item))
                })
                .collect()
        } else {
            ones
        };
        Ok((ones, twos))
    }

    /// Phase C: depth-first enumeration over equivalence classes.
    ///
    /// `elements` all share the same length k. Classes are visited in
    /// prefix order and members in sequence order, so the run is
    /// deterministic end to end. Each class joins every ordered member
    /// pair including the diagonal, prunes the merged results by
    /// support, and descends while more than one element survived and
    /// the next level stays under the length cap.
    fn enumerate(&mut self, elements: Vec<Element>) -> Result<(), SpadeError> {
        let Some(first) = elements.first() else {
            return Ok(());
        };
        let k = first.length();

        let mut classes: BTreeMap<Pattern, Vec<Element>> = BTreeMap::new();
        for element in elements {
            classes
                .entry(element.sequence.class_prefix())
                .or_default()
                .push(element);
        }

        for (prefix, mut members) in classes {
            members.sort_unstable_by(|a, b| a.sequence.cmp(&b.sequence));
            trace!(class = ?prefix, members = members.len(), "joining equivalence class");

            let mut inner = ElementPool::new();
            for i in 0..members.len() {
                for j in i..members.len() {
                    if let Some(pool) = members[i].join(&members[j], self.cmap.as_ref()) {
                        for element in pool.drain_sorted() {
                            inner.merge(element)?;
                        }
                    }
                }
            }
            let survivors: Vec<Element> = inner
                .drain_sorted()
                .into_iter()
                .filter(|e| e.support() >= self.min_support)
                .collect();

            if self.maximal {
                // members with no surviving extension are locally maximal
                let lone: Vec<Element> = members
                    .iter()
                    .filter(|m| !survivors.iter().any(|s| m.has_subsequence(s)))
                    .cloned()
                    .collect();
                self.promote(lone)?;
            } else {
                self.promote(survivors.clone())?;
            }

            let descend = survivors.len() > 1 && self.max_length.map_or(true, |cap| k + 1 != cap);
            if descend {
                self.enumerate(survivors)?;
            } else if self.maximal {
                self.promote(survivors)?;
            }
        }
        Ok(())
    }

    /// Add elements to the frequent pool. In maximal mode each
    /// insertion keeps the pool an antichain: subsumed candidates are
    /// skipped, pool entries subsumed by the newcomer are evicted.
    /// Top-N retention runs after every batch.
    fn promote(&mut self, elements: Vec<Element>) -> Result<(), SpadeError> {
        for element in elements {
            if self.maximal {
                let subsumed = self
                    .frequent
                    .iter()
                    .any(|p| p.sequence != element.sequence && element.has_subsequence(p));
                if subsumed {
                    continue;
                }
                let evicted: Vec<Pattern> = self
                    .frequent
                    .iter()
                    .filter(|p| p.sequence != element.sequence && p.has_subsequence(&element))
                    .map(|p| p.sequence.clone())
                    .collect();
                for key in &evicted {
                    self.frequent.remove(key);
                }
            }
            self.frequent.merge(element)?;
        }
        self.trim_top_n();
        Ok(())
    }

    /// Keep the N largest elements by `(length, size)`, ties broken by
    /// ascending sequence order. Streaming with a total comparator, so
    /// the surviving set does not depend on promotion order.
    fn trim_top_n(&mut self) {
        let Some(cap) = self.top_n else { return };
        if self.frequent.len() <= cap {
            return;
        }
        let mut elements = std::mem::take(&mut self.frequent).drain_sorted();
        elements.sort_by(|a, b| {
            (b.length(), b.size())
                .cmp(&(a.length(), a.size()))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        elements.truncate(cap);
        for element in elements {
            self.frequent.put(element);
        }
    }
}

fn decode<S: SequenceId, I: Item>(
    element: Element,
    dataset: &Dataset<S, I>,
) -> FrequentSequence<S, I> {
    let sequence = element
        .sequence
        .itemsets()
        .iter()
        .map(|set| set.iter().map(|id| dataset.items[id].clone()).collect())
        .collect();
    let support = element.support();
    let id_list = element
        .id_list
        .iter()
        .map(|record| (dataset.sids[record.sid as usize].clone(), record.eid as usize))
        .collect();
    FrequentSequence {
        sequence,
        support,
        id_list,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{FrequentSequence, Spade, SpadeConfig};
    use crate::error::{ErrorKind, SpadeError};

    fn dataset(rows: &[(u32, &[&[char]])]) -> HashMap<u32, HashMap<u32, Vec<char>>> {
        rows.iter()
            .map(|&(sid, events)| {
                let labeled = events
                    .iter()
                    .enumerate()
                    .map(|(idx, items)| (idx as u32 + 1, items.to_vec()))
                    .collect();
                (sid, labeled)
            })
            .collect()
    }

    fn mine(rows: &[(u32, &[&[char]])], config: SpadeConfig) -> Vec<FrequentSequence<u32, char>> {
        let mut spade = Spade::new();
        spade.configure(dataset(rows), config);
        spade.execute().expect("mining succeeds")
    }

    fn find<'a>(
        patterns: &'a [FrequentSequence<u32, char>],
        sequence: &[&[char]],
    ) -> Option<&'a FrequentSequence<u32, char>> {
        let wanted: Vec<Vec<char>> = sequence.iter().map(|items| items.to_vec()).collect();
        patterns.iter().find(|p| p.sequence == wanted)
    }

    #[test]
    fn rejects_zero_min_support() {
        let mut spade = Spade::new();
        spade.configure(
            dataset(&[(1, &[&['a']])]),
            SpadeConfig {
                min_support: 0,
                ..SpadeConfig::default()
            },
        );
        let err = spade.execute().expect_err("invalid support");
        assert_eq!(err, SpadeError::InvalidMinSupport { given: 0 });
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn rejects_empty_sequences() {
        let mut spade: Spade<u32, char> = Spade::new();
        spade.configure(
            HashMap::<u32, HashMap<u32, Vec<char>>>::new(),
            SpadeConfig::default(),
        );
        assert_eq!(
            spade.execute().expect_err("no input"),
            SpadeError::EmptySequences
        );
    }

    #[test]
    fn rejects_degenerate_bounds() {
        let mut spade = Spade::new();
        spade.configure(
            dataset(&[(1, &[&['a']])]),
            SpadeConfig {
                max_length: Some(0),
                ..SpadeConfig::default()
            },
        );
        assert_eq!(
            spade.execute().expect_err("bad cap"),
            SpadeError::InvalidMaxLength { given: 0 }
        );

        spade.configure(
            dataset(&[(1, &[&['a']])]),
            SpadeConfig {
                top_n: Some(0),
                ..SpadeConfig::default()
            },
        );
        assert_eq!(
            spade.execute().expect_err("bad top-n"),
            SpadeError::InvalidTopN { given: 0 }
        );
    }

    #[test]
    fn mines_singletons_only_under_length_cap_one() {
        let rows: &[(u32, &[&[char]])] = &[(1, &[&['a'], &['b']]), (2, &[&['a'], &['b']])];
        let patterns = mine(
            rows,
            SpadeConfig {
                min_support: 2,
                max_length: Some(1),
                ..SpadeConfig::default()
            },
        );
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|p| p.sequence.len() == 1));
        assert!(patterns.iter().all(|p| p.support == 2));
    }

    #[test]
    fn self_join_finds_repeated_item() {
        let rows: &[(u32, &[&[char]])] = &[(1, &[&['a'], &['a'], &['b']]), (2, &[&['a'], &['a']])];
        let patterns = mine(
            rows,
            SpadeConfig {
                min_support: 2,
                ..SpadeConfig::default()
            },
        );
        let repeat = find(&patterns, &[&['a'], &['a']]).expect("a -> a");
        assert_eq!(repeat.support, 2);
        assert_eq!(repeat.id_list, vec![(1, 1), (2, 1)]);
        assert!(find(&patterns, &[&['b']]).is_none());
    }

    #[test]
    fn witnesses_point_at_pattern_ends() {
        let rows: &[(u32, &[&[char]])] = &[(1, &[&['a'], &['c']]), (2, &[&['a'], &['b'], &['c']])];
        let patterns = mine(
            rows,
            SpadeConfig {
                min_support: 2,
                ..SpadeConfig::default()
            },
        );
        let ac = find(&patterns, &[&['a'], &['c']]).expect("a -> c");
        assert_eq!(ac.id_list, vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn reconfiguration_replaces_prior_state() {
        let mut spade = Spade::new();
        spade.configure(
            dataset(&[(1, &[&['a']]), (2, &[&['a']])]),
            SpadeConfig {
                min_support: 2,
                ..SpadeConfig::default()
            },
        );
        let first = spade.execute().expect("first run");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].sequence, vec![vec!['a']]);

        spade.configure(
            dataset(&[(1, &[&['b']]), (2, &[&['b']])]),
            SpadeConfig {
                min_support: 2,
                ..SpadeConfig::default()
            },
        );
        let second = spade.execute().expect("second run");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].sequence, vec![vec!['b']]);
    }

    #[test]
    fn failed_run_leaves_engine_reusable() {
        let mut spade = Spade::new();
        spade.configure(
            dataset(&[(1, &[&['a']])]),
            SpadeConfig {
                min_support: 0,
                ..SpadeConfig::default()
            },
        );
        assert!(spade.execute().is_err());

        spade.configure(dataset(&[(1, &[&['a']])]), SpadeConfig::default());
        let patterns = spade.execute().expect("engine recovered");
        assert_eq!(patterns.len(), 1);
    }

    #[test]
    fn event_labels_only_contribute_order() {
        // labels 10/20 and 1/2 rank identically
        let mut sparse: HashMap<u32, HashMap<u32, Vec<char>>> = HashMap::new();
        sparse.insert(1, HashMap::from([(10, vec!['a']), (20, vec!['b'])]));
        sparse.insert(2, HashMap::from([(1, vec!['a']), (2, vec!['b'])]));

        let mut spade = Spade::new();
        spade.configure(
            sparse,
            SpadeConfig {
                min_support: 2,
                ..SpadeConfig::default()
            },
        );
        let patterns = spade.execute().expect("mining succeeds");
        let ab = find(&patterns, &[&['a'], &['b']]).expect("a -> b");
        assert_eq!(ab.id_list, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn display_uses_arrow_notation() {
        let rows: &[(u32, &[&[char]])] = &[(1, &[&['a', 'b'], &['c']])];
        let patterns = mine(
            rows,
            SpadeConfig {
                min_support: 1,
                ..SpadeConfig::default()
            },
        );
        let abc = find(&patterns, &[&['a', 'b'], &['c']]).expect("ab -> c");
        assert_eq!(format!("{abc}"), "['a', 'b'] -> ['c']");
    }
}
