//! # Branch Names
//!
//! Generates names for the branches that carry automated updates.
//!
//! A name is the configured prefix followed by [`BRANCH_SUFFIX_LENGTH`] letters
//! drawn from [`BRANCH_SUFFIX_CHARSET`]. Names are not checked against existing
//! branches; with 52^5 possible suffixes a collision is unlikely but possible.

use crate::constants::{BRANCH_SUFFIX_CHARSET, BRANCH_SUFFIX_LENGTH};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Produces a fresh branch name from a prefix.
///
/// Implementations are shared across concurrent pipelines, so they must be
/// `Send + Sync`.
pub trait NameGenerator: Send + Sync {
    fn prefixed_name(&self, prefix: &str) -> String;
}

/// Pseudo-random generator backed by a seeded [`StdRng`].
///
/// Not cryptographically meaningful, it only needs to avoid obvious clashes.
#[derive(Debug)]
pub struct RandomNameGenerator {
    rng: Mutex<StdRng>,
}

impl RandomNameGenerator {
    /// Seed from the operating system's entropy source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator, mostly useful in tests.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator for RandomNameGenerator {
    // TODO: cap the total length, hosts reject very long ref names.
    fn prefixed_name(&self, prefix: &str) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let suffix: String = (0..BRANCH_SUFFIX_LENGTH)
            .map(|_| char::from(BRANCH_SUFFIX_CHARSET[rng.gen_range(0..BRANCH_SUFFIX_CHARSET.len())]))
            .collect();
        format!("{prefix}{suffix}")
    }
}

/// Always appends the same suffix. Lets tests predict branch names.
#[derive(Debug, Clone)]
pub struct StaticNameGenerator {
    suffix: String,
}

impl StaticNameGenerator {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl NameGenerator for StaticNameGenerator {
    fn prefixed_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.suffix)
    }
}
