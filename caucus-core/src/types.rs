//! Strongly-typed identifiers for Caucus entities.
//!
//! A node address and an election-attempt counter are both small integers;
//! wrapping each in its own type keeps them from being swapped silently.

use std::fmt;

/// Generates a typed u64 wrapper with a display prefix.
macro_rules! id_type {
    ($(#[$attr:meta])* $name:ident, $prefix:literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw u64 value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw u64 value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the next ID in sequence.
            ///
            /// # Panics
            /// Panics if the ID would overflow.
            #[must_use]
            pub const fn next(self) -> Self {
                assert!(self.0 < u64::MAX, "ID overflow");
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({})"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a simulated node; ids are the address space
    /// for mailbox routing.
    NodeId,
    "node"
);

id_type!(
    /// Identifier for one election attempt; tags candidacy delay timers so
    /// firings from cancelled attempts are ignored.
    AttemptId,
    "attempt"
);
