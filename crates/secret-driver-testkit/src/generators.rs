//! Proptest generators for property-based testing.

use proptest::prelude::*;
use rand::Rng;

use secret_driver_core::{AccessMode, Principal};

use crate::fixtures::{Step, ALICE, BOB, MALLORY};

/// Generate one of the fixture principals.
pub fn principal() -> impl Strategy<Value = Principal> {
    prop_oneof![Just(ALICE), Just(BOB), Just(MALLORY)]
}

/// Generate any access mode, including the rejected read-write mode.
pub fn access_mode() -> impl Strategy<Value = AccessMode> {
    prop_oneof![
        Just(AccessMode::ReadOnly),
        Just(AccessMode::WriteOnly),
        Just(AccessMode::ReadWrite),
    ]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a single step.
///
/// Writes and reads are sized up to `max_len`.
pub fn step(max_len: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (principal(), access_mode()).prop_map(|(p, mode)| Step::Open(p, mode)),
        3 => (principal(), payload(max_len)).prop_map(|(p, bytes)| Step::Write(p, bytes)),
        3 => (principal(), 0..=max_len).prop_map(|(p, len)| Step::Read(p, len)),
        1 => (principal(), principal()).prop_map(|(p, grantee)| Step::Grant(p, grantee)),
        2 => principal().prop_map(Step::Close),
    ]
}

/// Generate a sequence of up to `max_steps` steps.
pub fn steps(max_steps: usize, max_len: usize) -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(step(max_len), 0..=max_steps)
}

/// Random secret content with no NUL bytes.
pub fn random_secret(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(1..=u8::MAX)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_secret_has_no_nul() {
        let secret = random_secret(512);
        assert_eq!(secret.len(), 512);
        assert!(secret.iter().all(|b| *b != 0));
    }

    proptest! {
        #[test]
        fn test_steps_bounded(steps in steps(16, 64)) {
            prop_assert!(steps.len() <= 16);
            for step in &steps {
                match step {
                    Step::Write(_, bytes) => prop_assert!(bytes.len() <= 64),
                    Step::Read(_, len) => prop_assert!(*len <= 64),
                    _ => {}
                }
            }
        }
    }
}
