//! Room slug generation.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Produces candidate room slugs. Uniqueness is the caller's problem.
pub trait NameGenerator: Send + Sync + 'static {
    fn next_name(&self) -> String;
}

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "eager", "fancy", "gentle", "happy", "jolly", "kind", "lively", "mellow",
    "nimble", "proud", "quiet", "rapid", "shy", "witty",
];

const COLORS: &[&str] = &[
    "amber", "azure", "coral", "crimson", "golden", "ivory", "jade", "lilac", "olive", "pearl",
    "ruby", "rusty", "silver", "teal", "violet", "white",
];

const ANIMALS: &[&str] = &[
    "badger", "bison", "crane", "ferret", "gecko", "heron", "ibex", "lynx", "marten", "otter",
    "owl", "panda", "quail", "raven", "walrus", "yak",
];

/// `adjective-color-animal` slugs, e.g. `"calm-jade-otter"`.
pub struct WordNames {
    rng: Mutex<StdRng>,
}

impl WordNames {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence, for tests and simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for WordNames {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator for WordNames {
    fn next_name(&self) -> String {
        let mut guard = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let rng: &mut StdRng = &mut guard;
        let adjective = pick(ADJECTIVES, rng);
        let color = pick(COLORS, rng);
        let animal = pick(ANIMALS, rng);
        format!("{adjective}-{color}-{animal}")
    }
}

fn pick(words: &[&'static str], rng: &mut StdRng) -> &'static str {
    words.choose(rng).copied().unwrap_or("room")
}
