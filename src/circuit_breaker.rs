use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Breaker guarding the existing-lead queries.
pub type LeadStoreBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Consecutive failures that open the breaker.
pub const FAILURE_THRESHOLD: u32 = 5;

/// Creates the circuit breaker wrapped around lead storage reads.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// While OPEN, duplicate checks that need the database fail fast with
/// `503 Service Unavailable` instead of queueing on a dead pool. Checks that
/// carry their own existing set never touch it.
///
/// The returned machine is cheap to clone; clones share state.
pub fn create_lead_store_circuit_breaker() -> LeadStoreBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(FAILURE_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
