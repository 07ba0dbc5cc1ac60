//! Candidate patterns and their vertical id-lists.
//!
//! An [`Element`] pairs a sequence pattern with the set of `(sid, eid)`
//! witnesses at which the pattern ends. Joining two elements of the
//! same equivalence class is the central operation of the miner: the
//! pair's last-itemset difference decides which extensions are formed,
//! and the sid-matched witness pairs decide which of them are real.

use std::cmp::Ordering;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use bit_set::BitSet;

use crate::cmap::Cmap;
use crate::error::SpadeError;

/// Canonical itemset: interned item ids, iterated in ascending order.
pub type EventSet = BitSet;

/// One witness: the pattern ends at event rank `eid` of sequence `sid`.
///
/// Both fields are dense indices assigned by the engine; the caller's
/// own sequence ids and event labels are restored on output.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct Record {
    pub sid: u32,
    pub eid: u32,
}

impl Record {
    pub fn new(sid: u32, eid: u32) -> Self {
        Self { sid, eid }
    }
}

/// A sequence pattern: a temporally ordered list of canonical itemsets.
///
/// The structural hash is computed once at construction and feeds
/// `Hash`; equality always compares the full structure, so a hash
/// collision costs a comparison, never a wrong merge.
#[derive(Clone)]
pub struct Pattern {
    itemsets: Vec<EventSet>,
    hash: u64,
}

fn structural_hash(itemsets: &[EventSet]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for set in itemsets {
        for item in set.iter() {
            hasher.write_usize(item);
        }
        // itemset boundary; item ids are dense and never reach MAX
        hasher.write_usize(usize::MAX);
    }
    hasher.finish()
}

impl Pattern {
    pub fn new(itemsets: Vec<EventSet>) -> Self {
        let hash = structural_hash(&itemsets);
        Self { itemsets, hash }
    }

    pub fn singleton(item: usize) -> Self {
        let mut set = EventSet::new();
        set.insert(item);
        Self::new(vec![set])
    }

    pub fn itemsets(&self) -> &[EventSet] {
        &self.itemsets
    }

    /// Pattern length k: total item occurrences across all itemsets.
    pub fn length(&self) -> usize {
        self.itemsets.iter().map(EventSet::len).sum()
    }

    /// Number of itemsets.
    pub fn size(&self) -> usize {
        self.itemsets.len()
    }

    /// Largest item of the terminal itemset — the generating item.
    pub fn last_item(&self) -> Option<usize> {
        self.itemsets.last().and_then(|set| set.iter().max())
    }

    /// New pattern with `item` added to the terminal itemset.
    pub fn with_event_item(&self, item: usize) -> Self {
        let mut itemsets = self.itemsets.clone();
        if let Some(last) = itemsets.last_mut() {
            last.insert(item);
        }
        Self::new(itemsets)
    }

    /// New pattern with `{item}` appended as a fresh itemset.
    pub fn with_sequence_item(&self, item: usize) -> Self {
        let mut itemsets = self.itemsets.clone();
        let mut set = EventSet::new();
        set.insert(item);
        itemsets.push(set);
        Self::new(itemsets)
    }

    /// The (k-1)-prefix: this pattern minus the generating item of its
    /// terminal itemset. Patterns sharing this key form an equivalence
    /// class.
    pub fn class_prefix(&self) -> Self {
        let mut itemsets = self.itemsets.clone();
        if let Some(last) = itemsets.last_mut() {
            if let Some(item) = last.iter().max() {
                last.remove(item);
            }
            if last.is_empty() {
                itemsets.pop();
            }
        }
        Self::new(itemsets)
    }

    /// Standard subsequence relation: a strictly increasing map of this
    /// pattern's itemsets into supersets of `other`'s itemsets.
    pub fn is_subsequence_of(&self, other: &Pattern) -> bool {
        let mut pos = 0;
        for needle in &self.itemsets {
            let mut found = false;
            while pos < other.itemsets.len() {
                let idx = pos;
                pos += 1;
                if needle.is_subset(&other.itemsets[idx]) {
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }

    /// How two sibling patterns differ in their last itemset.
    ///
    /// Returns the generating item of each side, or `None` where a side
    /// contributes no extension:
    ///
    /// * equal sequences: both sides regenerate the shared terminal
    ///   item, so self-joins can form repeats like `(a) -> (a)`;
    /// * equal sizes with each terminal holding exactly one fresh item:
    ///   both sides generate;
    /// * sizes differing by one, where the longer side's terminal is a
    ///   fresh singleton and the shorter side's terminal holds exactly
    ///   one item over the longer side's aligned itemset: only the
    ///   longer side generates;
    /// * anything else: `(None, None)`, the pair does not join.
    pub fn equivalence_relation(&self, other: &Pattern) -> (Option<usize>, Option<usize>) {
        if self == other {
            let item = self.last_item();
            return (item, item);
        }
        let sa = self.size();
        let sb = other.size();
        if sa == 0 || sb == 0 {
            return (None, None);
        }
        if sa == sb {
            if self.itemsets[..sa - 1] != other.itemsets[..sa - 1] {
                return (None, None);
            }
            let last_a = &self.itemsets[sa - 1];
            let last_b = &other.itemsets[sa - 1];
            match (
                single_difference(last_a, last_b),
                single_difference(last_b, last_a),
            ) {
                (Some(fresh_a), Some(fresh_b)) => (Some(fresh_a), Some(fresh_b)),
                _ => (None, None),
            }
        } else if sa == sb + 1 {
            (one_sided(self, other), None)
        } else if sb == sa + 1 {
            (None, one_sided(other, self))
        } else {
            (None, None)
        }
    }
}

/// The sole item of `a \ b`, if that difference is a singleton.
fn single_difference(a: &EventSet, b: &EventSet) -> Option<usize> {
    let mut diff = a.iter().filter(|item| !b.contains(*item));
    match (diff.next(), diff.next()) {
        (Some(item), None) => Some(item),
        _ => None,
    }
}

/// One-sided sibling check: `longer` has exactly one itemset more than
/// `shorter`. Returns `longer`'s generating item when the shapes line
/// up (shared itemsets equal, `shorter`'s terminal one item over the
/// aligned itemset, `longer`'s terminal a singleton).
fn one_sided(longer: &Pattern, shorter: &Pattern) -> Option<usize> {
    let hinge = shorter.size() - 1;
    if longer.itemsets()[..hinge] != shorter.itemsets()[..hinge] {
        return None;
    }
    let aligned = &longer.itemsets()[hinge];
    let base = &shorter.itemsets()[hinge];
    if !aligned.is_subset(base) || single_difference(base, aligned).is_none() {
        return None;
    }
    let terminal = &longer.itemsets()[longer.size() - 1];
    if terminal.len() != 1 {
        return None;
    }
    terminal.iter().next()
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.itemsets == other.itemsets
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for Pattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pattern {
    /// Lexicographic over itemsets, each compared as its ascending
    /// item list. This is the "sequence order" used for tie-breaks.
    fn cmp(&self, other: &Self) -> Ordering {
        let mut a = self.itemsets.iter();
        let mut b = other.itemsets.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) => {
                    let ord = x.iter().cmp(y.iter());
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, set) in self.itemsets.iter().enumerate() {
            if idx > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{set:?}")?;
        }
        Ok(())
    }
}

/// A candidate pattern with its id-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub sequence: Pattern,
    /// Witnesses, sorted by `(sid, eid)` and duplicate-free.
    pub id_list: Vec<Record>,
}

impl Element {
    pub fn new(sequence: Pattern, mut id_list: Vec<Record>) -> Self {
        id_list.sort_unstable();
        id_list.dedup();
        Self { sequence, id_list }
    }

    pub fn with_witness(sequence: Pattern, record: Record) -> Self {
        Self {
            sequence,
            id_list: vec![record],
        }
    }

    /// Pattern length k.
    pub fn length(&self) -> usize {
        self.sequence.length()
    }

    /// Number of itemsets in the pattern.
    pub fn size(&self) -> usize {
        self.sequence.size()
    }

    /// Count of distinct sids in the id-list.
    pub fn support(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for record in &self.id_list {
            if last != Some(record.sid) {
                count += 1;
                last = Some(record.sid);
            }
        }
        count
    }

    /// Insert a single witness, keeping the id-list sorted and unique.
    pub fn add_witness(&mut self, record: Record) {
        if let Err(pos) = self.id_list.binary_search(&record) {
            self.id_list.insert(pos, record);
        }
    }

    /// Merge `other`'s witnesses into this element. No-op unless the
    /// sequences are equal.
    pub fn union_in_place(&mut self, other: &Element) {
        if self.sequence != other.sequence {
            return;
        }
        let mut merged = Vec::with_capacity(self.id_list.len() + other.id_list.len());
        let (mut i, mut j) = (0, 0);
        while i < self.id_list.len() && j < other.id_list.len() {
            match self.id_list[i].cmp(&other.id_list[j]) {
                Ordering::Less => {
                    merged.push(self.id_list[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(other.id_list[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push(self.id_list[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.id_list[i..]);
        merged.extend_from_slice(&other.id_list[j..]);
        self.id_list = merged;
    }

    /// Sibling analysis over the sequences; see
    /// [`Pattern::equivalence_relation`].
    pub fn equivalence_relation(&self, other: &Element) -> (Option<usize>, Option<usize>) {
        self.sequence.equivalence_relation(&other.sequence)
    }

    /// This element's pattern with `item` added to the terminal itemset.
    pub fn event_atom_union(&self, item: usize) -> Pattern {
        self.sequence.with_event_item(item)
    }

    /// This element's pattern with `{item}` appended as a new itemset.
    pub fn sequence_atom_union(&self, item: usize) -> Pattern {
        self.sequence.with_sequence_item(item)
    }

    /// Whether this element's pattern is a subsequence of `other`'s.
    pub fn has_subsequence(&self, other: &Element) -> bool {
        self.sequence.is_subsequence_of(&other.sequence)
    }

    /// Temporal join of two equivalence-class siblings.
    ///
    /// Returns `None` when the pair is not a sibling pair. Otherwise
    /// every sid-matched witness pair `(p, q)` is classified by event
    /// rank:
    ///
    /// * `p.eid < q.eid` — append the right generator after self;
    /// * `p.eid > q.eid` — append the left generator after other;
    /// * equal ranks with distinct generators — event-extend self.
    ///
    /// Candidate atoms are formed once up front and vetoed by the
    /// co-occurrence map when one is supplied; witnesses accumulate in
    /// a local pool that the caller drains immediately.
    pub fn join(&self, other: &Element, cmap: Option<&Cmap>) -> Option<ElementPool> {
        let (left, right) = self.equivalence_relation(other);
        if left.is_none() && right.is_none() {
            return None;
        }

        let follows = |base: &Element, item: usize| match (cmap, base.sequence.last_item()) {
            (Some(map), Some(prev)) => map.follows(prev, item),
            _ => true,
        };

        let forward = right
            .filter(|&item| follows(self, item))
            .map(|item| self.sequence_atom_union(item));
        let backward = left
            .filter(|&item| follows(other, item))
            .map(|item| other.sequence_atom_union(item));
        let event = match (left, right) {
            (Some(xi), Some(xj)) if xi != xj => cmap
                .map_or(true, |map| map.coincides(xi, xj))
                .then(|| self.event_atom_union(xj)),
            _ => None,
        };

        let mut pool = ElementPool::new();
        let a = &self.id_list;
        let b = &other.id_list;
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if a[i].sid < b[j].sid {
                i += 1;
                continue;
            }
            if a[i].sid > b[j].sid {
                j += 1;
                continue;
            }
            let sid = a[i].sid;
            let run_a = i;
            while i < a.len() && a[i].sid == sid {
                i += 1;
            }
            let run_b = j;
            while j < b.len() && b[j].sid == sid {
                j += 1;
            }
            for p in &a[run_a..i] {
                for q in &b[run_b..j] {
                    if p.eid < q.eid {
                        if let Some(atom) = &forward {
                            pool.add_witness(atom, Record::new(sid, q.eid));
                        }
                    } else if p.eid > q.eid {
                        if let Some(atom) = &backward {
                            pool.add_witness(atom, Record::new(sid, p.eid));
                        }
                    } else if let Some(atom) = &event {
                        pool.add_witness(atom, Record::new(sid, p.eid));
                    }
                }
            }
        }
        Some(pool)
    }
}

/// Keyed collection of elements with insert-or-merge semantics.
///
/// Keys are never mutated after insertion; duplicate avoidance during
/// joins relies solely on [`merge`](ElementPool::merge).
#[derive(Debug, Default)]
pub struct ElementPool {
    map: HashMap<Pattern, Element>,
}

impl ElementPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &Pattern) -> Option<&Element> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &Pattern) -> bool {
        self.map.contains_key(key)
    }

    /// Insert, replacing any previous element with the same key.
    pub fn put(&mut self, element: Element) {
        self.map.insert(element.sequence.clone(), element);
    }

    /// Remove the element with this key, if present.
    pub fn remove(&mut self, key: &Pattern) -> Option<Element> {
        self.map.remove(key)
    }

    /// Insert-or-merge: absent keys insert, present keys union their
    /// id-lists. A stored element whose sequence disagrees with its key
    /// is an internal invariant violation and aborts the mining call.
    pub fn merge(&mut self, element: Element) -> Result<(), SpadeError> {
        match self.map.entry(element.sequence.clone()) {
            Entry::Occupied(mut slot) => {
                if slot.key() != &slot.get().sequence {
                    return Err(SpadeError::PoolKeyMismatch {
                        key: format!("{:?}", slot.key()),
                        element: format!("{:?}", slot.get().sequence),
                    });
                }
                slot.get_mut().union_in_place(&element);
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(element);
                Ok(())
            }
        }
    }

    /// Record a single witness for `pattern`, inserting the element on
    /// first sight. Used by `join`, where the key always matches.
    pub fn add_witness(&mut self, pattern: &Pattern, record: Record) {
        match self.map.get_mut(pattern) {
            Some(element) => element.add_witness(record),
            None => {
                self.map
                    .insert(pattern.clone(), Element::with_witness(pattern.clone(), record));
            }
        }
    }

    /// Iterate elements in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.map.values()
    }

    /// Consume the pool, returning its elements in sequence order.
    pub fn drain_sorted(self) -> Vec<Element> {
        let mut elements: Vec<Element> = self.map.into_values().collect();
        elements.sort_unstable_by(|a, b| a.sequence.cmp(&b.sequence));
        elements
    }
}
