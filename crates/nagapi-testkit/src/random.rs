//! Seeded random data generation
//!
//! Provides reproducible random data generation for tests.
//! Using the same seed produces identical sequences of random data,
//! making tests deterministic and failures reproducible.
//!
//! # Example
//!
//! ```rust
//! use nagapi_testkit::random::PseudoGenerator;
//!
//! let mut rng1 = PseudoGenerator::new(42);
//! let mut rng2 = PseudoGenerator::new(42);
//!
//! // Same seed produces same output
//! assert_eq!(rng1.random_host_name(), rng2.random_host_name());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mock::MockService;

const NAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Plugin output alphabet, including the characters that must be escaped
/// before text reaches the command pipe
const TEXT_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 -_.,:=%/|;\n";

const SERVICE_NAMES: &[&str] = &[
    "HTTP", "HTTPS", "SSH", "PING", "Disk Usage", "Load", "Memory", "PGSQL", "DNS", "NTP",
];

/// Seeded pseudo-random generator for reproducible test data
#[derive(Debug)]
pub struct PseudoGenerator {
    rng: StdRng,
    seed: u64,
}

impl PseudoGenerator {
    /// Create a new generator with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Get the seed used to create this generator
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a random u64
    pub fn random_u64(&mut self) -> u64 {
        self.rng.random()
    }

    /// Generate a random usize in the given range
    pub fn random_range(&mut self, range: std::ops::Range<usize>) -> usize {
        self.rng.random_range(range)
    }

    /// Generate a host name like `host-k3x9q2`
    pub fn random_host_name(&mut self) -> String {
        format!("host-{}", self.random_token(6))
    }

    /// Pick a service description, suffixed to keep it unique within a host
    pub fn random_service_name(&mut self) -> String {
        let base = SERVICE_NAMES[self.rng.random_range(0..SERVICE_NAMES.len())];
        format!("{} {}", base, self.random_token(3))
    }

    /// Generate free text of `len` characters, possibly containing `;` and newlines
    pub fn random_text(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| TEXT_CHARS[self.rng.random_range(0..TEXT_CHARS.len())] as char)
            .collect()
    }

    /// Generate a service state code (0..=3)
    pub fn random_state(&mut self) -> u8 {
        self.rng.random_range(0..4)
    }

    /// Generate a service with random state and single-line output
    pub fn random_service(&mut self, host: &str) -> MockService {
        let state = self.random_state();
        let output = self.random_text(40).replace('\n', " ");
        MockService::new(host, self.random_service_name())
            .with_state(state)
            .with_output(output)
    }

    fn random_token(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| NAME_CHARS[self.rng.random_range(0..NAME_CHARS.len())] as char)
            .collect()
    }
}

/// Create multiple pseudo-random generators from a single seed
///
/// This is useful when you need multiple independent random streams
/// that are still reproducible from a single seed.
///
/// # Example
///
/// ```rust
/// use nagapi_testkit::random::pseudo_generators;
///
/// let rngs = pseudo_generators(42, 5);
/// assert_eq!(rngs.len(), 5);
/// ```
pub fn pseudo_generators(seed: u64, count: usize) -> Vec<PseudoGenerator> {
    let mut master_rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| PseudoGenerator::new(master_rng.random()))
        .collect()
}

/// Generate a random seed (for when you don't care about reproducibility)
pub fn random_seed() -> u64 {
    rand::random()
}
