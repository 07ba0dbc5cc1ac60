//! Error types for the mining engine.
//!
//! Every failure aborts the running `execute` call; there is no retry
//! or partial output. [`ErrorKind`] is the machine-readable tag,
//! the `Display` impl carries the human-readable description.

/// Failure category, per the engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The engine was configured with unusable parameters.
    Configuration,
    /// The input data violates the data model.
    Domain,
    /// An internal guard failed. Always a bug.
    Invariant,
}

/// Error returned by [`Spade::execute`](crate::Spade::execute).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpadeError {
    /// No input sequences were configured, or the map was empty.
    #[error("no input sequences configured")]
    EmptySequences,

    /// `min_support` must be at least 1.
    #[error("minimum support must be positive, got {given}")]
    InvalidMinSupport {
        /// The rejected value.
        given: usize,
    },

    /// `max_length`, when set, must be at least 1.
    #[error("maximum pattern length must be at least 1, got {given}")]
    InvalidMaxLength {
        /// The rejected value.
        given: usize,
    },

    /// `top_n`, when set, must be at least 1.
    #[error("top-n must be at least 1, got {given}")]
    InvalidTopN {
        /// The rejected value.
        given: usize,
    },

    /// An input event carried an empty itemset.
    #[error("empty itemset at sequence {sid}, event rank {eid}")]
    EmptyItemset {
        /// Caller sequence id, rendered with `Debug`.
        sid: String,
        /// 0-based event rank within that sequence.
        eid: usize,
    },

    /// A pool entry's stored sequence disagreed with its key.
    #[error("element pool key mismatch: key {key} holds element {element}")]
    PoolKeyMismatch {
        /// The offending key, rendered.
        key: String,
        /// The stored element's sequence, rendered.
        element: String,
    },
}

impl SpadeError {
    /// The failure category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptySequences
            | Self::InvalidMinSupport { .. }
            | Self::InvalidMaxLength { .. }
            | Self::InvalidTopN { .. } => ErrorKind::Configuration,
            Self::EmptyItemset { .. } => ErrorKind::Domain,
            Self::PoolKeyMismatch { .. } => ErrorKind::Invariant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, SpadeError};

    #[test]
    fn kinds_match_taxonomy() {
        assert_eq!(SpadeError::EmptySequences.kind(), ErrorKind::Configuration);
        assert_eq!(
            SpadeError::InvalidMinSupport { given: 0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            SpadeError::InvalidMaxLength { given: 0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            SpadeError::InvalidTopN { given: 0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            SpadeError::EmptyItemset {
                sid: "1".into(),
                eid: 0
            }
            .kind(),
            ErrorKind::Domain
        );
        assert_eq!(
            SpadeError::PoolKeyMismatch {
                key: "(a)".into(),
                element: "(b)".into()
            }
            .kind(),
            ErrorKind::Invariant
        );
    }

    #[test]
    fn messages_carry_context() {
        let err = SpadeError::InvalidMinSupport { given: 0 };
        assert!(err.to_string().contains("got 0"));

        let err = SpadeError::EmptyItemset {
            sid: "7".into(),
            eid: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));
    }
}
