//! Per-keyspace set membership dedupe
//!
//! Named keyspaces (`domain:passive`, `route:active`, `cert:passive`,...)
//! are created lazily on first use and live for the lifetime of a run. Two
//! interchangeable backends sit behind the same `seen_and_mark` contract so
//! the sink never needs to know which one a given space uses.

mod bloom;

use std::collections::{HashMap, HashSet};

pub use bloom::BloomFilter;

/// Backend selection for a single named keyspace.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Exact hash-set membership. The default; zero false positives.
    Exact,
    /// Bloom filter sized for `expected_items` at `false_positive_rate`.
    /// Never select this for a certificate keyspace: a
    /// missed-dedupe there silently drops distinct certificates.
    Bloom {
        expected_items: usize,
        false_positive_rate: f64,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Exact
    }
}

enum Keyspace {
    Exact(HashSet<String>),
    Bloom(BloomFilter),
}

impl Keyspace {
    fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Exact => Keyspace::Exact(HashSet::new()),
            Strategy::Bloom {
                expected_items,
                false_positive_rate,
            } => Keyspace::Bloom(BloomFilter::new(expected_items, false_positive_rate)),
        }
    }

    fn seen_and_mark(&mut self, key: &str) -> bool {
        match self {
            Keyspace::Exact(set) => !set.insert(key.to_string()),
            Keyspace::Bloom(filter) => filter.check_and_insert(key.as_bytes()),
        }
    }
}

/// Registry of named dedupe keyspaces, each independently backed by an
/// exact set or a Bloom filter.
///
/// Invariant: once a key is inserted into a keyspace it never yields "new"
/// (`false`) again; every space is monotonically growing within a run.
pub struct Dedupe {
    default_strategy: Strategy,
    overrides: HashMap<String, Strategy>,
    spaces: HashMap<String, Keyspace>,
}

impl Dedupe {
    /// Construct a registry where every keyspace defaults to exact
    /// matching unless overridden via [`Dedupe::with_strategy_for`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_strategy: Strategy::Exact,
            overrides: HashMap::new(),
            spaces: HashMap::new(),
        }
    }

    /// Construct a registry with a non-default strategy applied to every
    /// keyspace that doesn't get a more specific override.
    #[must_use]
    pub fn with_default_strategy(default_strategy: Strategy) -> Self {
        Self {
            default_strategy,
            overrides: HashMap::new(),
            spaces: HashMap::new(),
        }
    }

    /// Pin a specific keyspace name to a strategy regardless of the
    /// registry's default. Certificate keyspaces should always be pinned
    /// to `Strategy::Exact`.
    pub fn with_strategy_for(mut self, space: impl Into<String>, strategy: Strategy) -> Self {
        self.overrides.insert(space.into(), strategy);
        self
    }

    /// `seen_and_mark(space, key)`: insert `key` into the named `space`,
    /// returning whether it was already (probably, for Bloom spaces)
    /// present.
    pub fn seen_and_mark(&mut self, space: &str, key: &str) -> bool {
        let strategy = *self.overrides.get(space).unwrap_or(&self.default_strategy);
        let keyspace = self
        .spaces
        .entry(space.to_string())
        .or_insert_with(|| Keyspace::new(strategy));
        keyspace.seen_and_mark(key)
    }
}

impl Default for Dedupe {
    fn default() -> Self {
        Self::new()
    }
}
