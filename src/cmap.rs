//! Co-occurrence map built from the frequent 2-sequences.
//!
//! The map is a pure pruning aid for equivalence-class joins: an
//! extension whose two last items never co-occur frequently cannot be
//! frequent either, so the join skips forming it. Results must be
//! identical with or without the map.

use std::collections::HashMap;

use crate::element::{Element, EventSet};

/// Item co-occurrence tables, immutable once built.
///
/// `by_event` is symmetric (two items sharing an event); `by_sequence`
/// is directional (`next` observed strictly after `prev`).
#[derive(Debug, Default)]
pub struct Cmap {
    by_event: HashMap<usize, EventSet>,
    by_sequence: HashMap<usize, EventSet>,
}

impl Cmap {
    /// Build the map from the retained frequent 2-elements. A size-1
    /// element contributes both directions of an event co-occurrence;
    /// a size-2 element contributes one "follows" edge.
    pub fn from_elements<'a>(elements: impl Iterator<Item = &'a Element>) -> Self {
        let mut map = Self::default();
        for element in elements {
            let itemsets = element.sequence.itemsets();
            match itemsets {
                [pair] => {
                    let mut items = pair.iter();
                    if let (Some(a), Some(b)) = (items.next(), items.next()) {
                        map.by_event.entry(a).or_insert_with(EventSet::new).insert(b);
                        map.by_event.entry(b).or_insert_with(EventSet::new).insert(a);
                    }
                }
                [first, second] => {
                    if let (Some(a), Some(b)) = (first.iter().next(), second.iter().next()) {
                        map.by_sequence
                            .entry(a)
                            .or_insert_with(EventSet::new)
                            .insert(b);
                    }
                }
                _ => {}
            }
        }
        map
    }

    /// Whether `a` and `b` frequently share an event.
    pub fn coincides(&self, a: usize, b: usize) -> bool {
        self.by_event.get(&a).is_some_and(|set| set.contains(b))
    }

    /// Whether `next` frequently occurs strictly after `prev`.
    pub fn follows(&self, prev: usize, next: usize) -> bool {
        self.by_sequence
            .get(&prev)
            .is_some_and(|set| set.contains(next))
    }
}

#[cfg(test)]
mod tests {
    use super::Cmap;
    use crate::element::{Element, EventSet, Pattern, Record};

    fn set(items: &[usize]) -> EventSet {
        let mut out = EventSet::new();
        for &item in items {
            out.insert(item);
        }
        out
    }

    fn two_element(itemsets: &[&[usize]]) -> Element {
        Element::new(
            Pattern::new(itemsets.iter().map(|items| set(items)).collect()),
            vec![Record::new(0, 1)],
        )
    }

    #[test]
    fn event_pairs_are_symmetric() {
        let elements = [two_element(&[&[0, 1]])];
        let cmap = Cmap::from_elements(elements.iter());
        assert!(cmap.coincides(0, 1));
        assert!(cmap.coincides(1, 0));
        assert!(!cmap.follows(0, 1));
    }

    #[test]
    fn sequence_pairs_are_directional() {
        let elements = [two_element(&[&[0], &[1]])];
        let cmap = Cmap::from_elements(elements.iter());
        assert!(cmap.follows(0, 1));
        assert!(!cmap.follows(1, 0));
        assert!(!cmap.coincides(0, 1));
    }

    #[test]
    fn unknown_items_never_qualify() {
        let cmap = Cmap::from_elements(std::iter::empty::<&Element>());
        assert!(!cmap.coincides(5, 6));
        assert!(!cmap.follows(5, 6));
    }
}
