// Key Generation Configuration
// Retry bounds and optional self-test switch

/// Upper bound for one of the retry loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Loop until success; assumes a healthy entropy source.
    Unbounded,
    /// Give up after this many attempts.
    Bounded(usize),
}

impl RetryPolicy {
    /// Whether attempt number `attempt` (1-based) may still run.
    pub fn allows(&self, attempt: usize) -> bool {
        match *self {
            RetryPolicy::Unbounded => true,
            RetryPolicy::Bounded(max) => attempt <= max,
        }
    }
}

/// Configuration for key generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyGenConfig {
    /// Fresh prime searches after a too-low private exponent.
    pub weak_key_retries: RetryPolicy,
    /// Whole-vector redraws inside the X9.31 candidate generator.
    pub x931_retries: RetryPolicy,
    /// Fresh X9.31 candidates per prime in the software prime search.
    pub prime_search_retries: RetryPolicy,
    /// Run the pairwise consistency test after the keys are stamped valid.
    pub self_test: bool,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            weak_key_retries: RetryPolicy::Bounded(64),
            x931_retries: RetryPolicy::Bounded(1024),
            prime_search_retries: RetryPolicy::Bounded(256),
            self_test: true,
        }
    }
}

impl KeyGenConfig {
    /// All loops unbounded.
    pub fn unbounded() -> Self {
        Self {
            weak_key_retries: RetryPolicy::Unbounded,
            x931_retries: RetryPolicy::Unbounded,
            prime_search_retries: RetryPolicy::Unbounded,
            ..Self::default()
        }
    }

    pub fn with_weak_key_retries(mut self, policy: RetryPolicy) -> Self {
        self.weak_key_retries = policy;
        self
    }

    pub fn with_x931_retries(mut self, policy: RetryPolicy) -> Self {
        self.x931_retries = policy;
        self
    }

    pub fn with_prime_search_retries(mut self, policy: RetryPolicy) -> Self {
        self.prime_search_retries = policy;
        self
    }

    pub fn with_self_test(mut self, enabled: bool) -> Self {
        self.self_test = enabled;
        self
    }
}
