//! Shared random source for simulated figures.

use std::sync::Mutex;

use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Random source shared by the analytics services.
///
/// Seed it in tests so simulated values are reproducible.
pub struct Simulation {
    rng: Mutex<StdRng>,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Run `f` with exclusive access to the generator.
    pub fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| {
            warn!("Simulation RNG mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        f(&mut rng)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
