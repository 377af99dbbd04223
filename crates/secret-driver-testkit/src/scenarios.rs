//! Scripted scenarios with known replies.
//!
//! Each scenario is a session against a fresh driver together with the reply
//! expected for every step and the owner left behind at the end.

use secret_driver::{DriverConfig, Reply, EBADF};
use secret_driver_core::{AccessMode, AccessPolicy, Principal, EACCES, ENOSPC, SECRET_CAPACITY};

use crate::fixtures::{Step, TestFixture, ALICE, BOB, MALLORY};

/// A scripted session.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Human-readable name.
    pub name: &'static str,
    /// Driver configuration.
    pub config: DriverConfig,
    /// Steps paired with their expected replies.
    pub steps: Vec<(Step, Reply)>,
    /// Owner expected after the last step.
    pub final_owner: Option<Principal>,
    /// Whether the device must be back at its baseline.
    pub ends_at_baseline: bool,
}

const DENIED: Reply = Reply::Error { errno: EACCES };
const BUSY: Reply = Reply::Error { errno: ENOSPC };
const NOT_OPEN: Reply = Reply::Error { errno: EBADF };

fn strict() -> DriverConfig {
    let policy = AccessPolicy::strict();
    DriverConfig {
        unowned_read: policy.unowned_read,
        grant_policy: policy.grant,
        ..DriverConfig::default()
    }
}

/// Get all scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    use AccessMode::*;

    vec![
        Scenario {
            name: "read after write wipes on last close",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Write(ALICE, b"hello world".to_vec()), Reply::Transferred(11)),
                (Step::Close(ALICE), Reply::Ok),
                (Step::Open(ALICE, ReadOnly), Reply::Ok),
                (Step::Read(ALICE, 11), Reply::Transferred(11)),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: None,
            ends_at_baseline: true,
        },
        Scenario {
            name: "write-only session retains the secret",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Write(ALICE, b"x".to_vec()), Reply::Transferred(1)),
                (Step::Close(ALICE), Reply::Ok),
                (Step::Open(BOB, ReadOnly), DENIED),
            ],
            final_owner: Some(ALICE),
            ends_at_baseline: false,
        },
        Scenario {
            name: "grant hands the secret to another uid",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Write(ALICE, b"hello world".to_vec()), Reply::Transferred(11)),
                (Step::Grant(ALICE, BOB), Reply::Ok),
                (Step::Close(ALICE), Reply::Ok),
                (Step::Open(BOB, ReadOnly), Reply::Ok),
                (Step::Open(ALICE, ReadOnly), DENIED),
                (Step::Read(BOB, 64), Reply::Transferred(11)),
                (Step::Close(BOB), Reply::Ok),
            ],
            final_owner: None,
            ends_at_baseline: true,
        },
        Scenario {
            name: "read-write is always rejected",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, ReadWrite), DENIED),
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Open(ALICE, ReadWrite), DENIED),
                (Step::Open(BOB, ReadWrite), DENIED),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: Some(ALICE),
            ends_at_baseline: false,
        },
        Scenario {
            name: "second writer is rejected",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Open(BOB, WriteOnly), DENIED),
                (Step::Open(ALICE, WriteOnly), BUSY),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: Some(ALICE),
            ends_at_baseline: false,
        },
        Scenario {
            name: "oversized write truncates to capacity",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (
                    Step::Write(ALICE, vec![0x5a; SECRET_CAPACITY + 5]),
                    Reply::Transferred(SECRET_CAPACITY),
                ),
                (Step::Write(ALICE, b"more".to_vec()), Reply::Transferred(0)),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: Some(ALICE),
            ends_at_baseline: false,
        },
        Scenario {
            name: "unowned read claims and wipes",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, ReadOnly), Reply::Ok),
                (Step::Read(ALICE, 8), Reply::Transferred(0)),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: None,
            ends_at_baseline: true,
        },
        Scenario {
            name: "strict policy denies unowned read",
            config: strict(),
            steps: vec![(Step::Open(ALICE, ReadOnly), DENIED)],
            final_owner: None,
            ends_at_baseline: true,
        },
        Scenario {
            name: "strict policy rejects grant from non-owner",
            config: strict(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Grant(MALLORY, MALLORY), NOT_OPEN),
                (Step::Grant(ALICE, BOB), Reply::Ok),
                // Still holds a handle, but no longer owns the claim.
                (Step::Grant(ALICE, ALICE), DENIED),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: Some(BOB),
            ends_at_baseline: false,
        },
        Scenario {
            name: "stranger cannot drain or close",
            config: DriverConfig::default(),
            steps: vec![
                (Step::Open(ALICE, WriteOnly), Reply::Ok),
                (Step::Write(ALICE, b"hello world".to_vec()), Reply::Transferred(11)),
                (Step::Close(ALICE), Reply::Ok),
                (Step::Open(MALLORY, ReadOnly), DENIED),
                (Step::Read(MALLORY, 64), NOT_OPEN),
                (Step::Write(MALLORY, b"junk".to_vec()), NOT_OPEN),
                (Step::Open(ALICE, ReadOnly), Reply::Ok),
                (Step::Close(MALLORY), NOT_OPEN),
                (Step::Close(MALLORY), NOT_OPEN),
                (Step::Read(ALICE, 64), Reply::Transferred(11)),
                (Step::Close(ALICE), Reply::Ok),
            ],
            final_owner: None,
            ends_at_baseline: true,
        },
    ]
}

/// Run a scenario on a fresh fixture.
///
/// Returns a description of the first divergence, if any.
pub fn run_scenario(scenario: &Scenario) -> Result<(), String> {
    let mut fixture = TestFixture::with_config(scenario.config.clone());

    for (i, (step, expected)) in scenario.steps.iter().enumerate() {
        let actual = fixture.apply(step);
        if actual != *expected {
            return Err(format!(
                "step {i} {step:?}: expected {expected:?}, got {actual:?}"
            ));
        }
    }

    let state = fixture.state();
    if state.owner() != scenario.final_owner {
        return Err(format!(
            "final owner: expected {:?}, got {:?}",
            scenario.final_owner,
            state.owner()
        ));
    }
    if state.is_baseline() != scenario.ends_at_baseline {
        return Err(format!(
            "baseline: expected {}, got {}",
            scenario.ends_at_baseline,
            state.is_baseline()
        ));
    }
    Ok(())
}

/// Run every scenario, returning `(name, passed, detail)` per scenario.
pub fn verify_all_scenarios() -> Vec<(String, bool, String)> {
    all_scenarios()
        .iter()
        .map(|scenario| match run_scenario(scenario) {
            Ok(()) => (scenario.name.to_string(), true, String::new()),
            Err(detail) => (scenario.name.to_string(), false, detail),
        })
        .collect()
}
