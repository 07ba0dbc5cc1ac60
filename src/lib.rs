//! Frequent sequential pattern mining over vertical id-lists.
//!
//! This crate implements a miner from the SPADE family (Sequential
//! PAttern Discovery using Equivalence classes): input sequences are
//! turned into per-item vertical id-lists, frequent 1- and 2-sequences
//! are generated from those lists, and longer patterns are enumerated
//! depth-first by joining siblings inside equivalence classes.
//!
//! Ref: http://www.philippe-fournier-viger.com/spmf/SPADE.pdf
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use spade_miner::{Spade, SpadeConfig};
//!
//! let mut sequences: HashMap<u32, HashMap<u32, Vec<char>>> = HashMap::new();
//! sequences.insert(1, HashMap::from([(1, vec!['a', 'b']), (2, vec!['c'])]));
//! sequences.insert(2, HashMap::from([(1, vec!['a']), (2, vec!['b', 'c'])]));
//!
//! let mut spade = Spade::new();
//! spade.configure(sequences, SpadeConfig { min_support: 2, ..SpadeConfig::default() });
//! let patterns = spade.execute().unwrap();
//! assert!(patterns.iter().any(|p| p.sequence == vec![vec!['a']]));
//! ```

use std::fmt;
use std::hash::Hash;

pub mod cmap;
pub mod dataset;
pub mod element;
pub mod error;
pub mod spade;

pub use cmap::Cmap;
pub use element::{Element, ElementPool, EventSet, Pattern, Record};
pub use error::{ErrorKind, SpadeError};
pub use spade::{FrequentSequence, Spade, SpadeConfig};

/// Bound alias for the atomic symbols being mined.
///
/// Blanket-implemented; any ordered, hashable, cloneable type works
/// (integers, `char`, short strings, ...).
pub trait Item: Clone + Ord + Hash + fmt::Debug {}

impl<T: Clone + Ord + Hash + fmt::Debug> Item for T {}

/// Bound alias for caller-side sequence identifiers.
pub trait SequenceId: Clone + Ord + Hash + fmt::Debug {}

impl<T: Clone + Ord + Hash + fmt::Debug> SequenceId for T {}

/// Bound alias for caller-side event labels. Labels are replaced by
/// their ascending rank within each sequence and never stored.
pub trait EventLabel: Ord {}

impl<T: Ord> EventLabel for T {}
