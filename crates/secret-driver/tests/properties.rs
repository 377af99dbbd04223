//! Property tests over random request sequences.

use proptest::prelude::*;

use secret_driver::{DriverConfig, Reply, EBADF};
use secret_driver_core::{AccessMode, EACCES, ENOSPC, ENOTTY, GRANT_REQUEST};
use secret_driver_testkit::generators::{payload, principal, steps};
use secret_driver_testkit::{Step, TestFixture, ALICE};

const SMALL: usize = 64;

fn small_fixture() -> TestFixture {
    TestFixture::with_config(DriverConfig {
        capacity: SMALL,
        ..DriverConfig::default()
    })
}

proptest! {
    #[test]
    fn test_single_owner(steps in steps(40, 24)) {
        let mut fixture = small_fixture();

        for step in &steps {
            let unheld = match step {
                Step::Read(p, _) => !fixture.holds(*p, AccessMode::ReadOnly),
                Step::Write(p, _) => !fixture.holds(*p, AccessMode::WriteOnly),
                Step::Close(p) | Step::Grant(p, _) => !fixture.holds_any(*p),
                Step::Open(..) => false,
            };
            let snapshot = fixture.state().snapshot();
            let before = fixture.state().owner();
            let reply = fixture.apply(step);
            let after = fixture.state().owner();

            // No handle, no effect.
            if unheld {
                prop_assert_eq!(reply, Reply::Error { errno: EBADF }, "{:?}", step);
                prop_assert_eq!(fixture.state().snapshot(), snapshot);
            }

            if let (Step::Open(p, _), Some(owner)) = (step, before) {
                if *p != owner {
                    prop_assert!(
                        matches!(reply.errno(), Some(EACCES) | Some(ENOSPC)),
                        "{:?} by non-owner returned {:?}", step, reply
                    );
                }
            }

            // Ownership moves only by claim, grant, or wipe.
            if before.is_some() && after != before {
                let granted = matches!(step, Step::Grant(..)) && reply.is_ok();
                let wiped = matches!(step, Step::Close(_)) && after.is_none();
                prop_assert!(granted || wiped, "owner changed on {:?}", step);
            }
        }
    }

    #[test]
    fn test_cursors_ordered_and_monotonic(steps in steps(40, 24)) {
        let mut fixture = small_fixture();
        let mut last = (0usize, 0usize);

        for step in &steps {
            fixture.apply(step);
            let buffer = fixture.state().buffer();
            let now = (buffer.read_cursor(), buffer.write_cursor());

            prop_assert!(now.0 <= now.1);
            prop_assert!(now.1 <= buffer.capacity());

            if fixture.state().is_baseline() {
                prop_assert_eq!(now, (0, 0));
            } else {
                prop_assert!(now.0 >= last.0 && now.1 >= last.1, "{:?} -> {:?}", last, now);
            }
            last = now;
        }
    }

    #[test]
    fn test_oversized_write_truncates(k in 1usize..256) {
        let mut fixture = small_fixture();
        fixture.open(ALICE, AccessMode::WriteOnly);

        let reply = fixture.write(ALICE, &vec![7u8; SMALL + k]);
        prop_assert_eq!(reply, Reply::Transferred(SMALL));
        prop_assert_eq!(fixture.state().buffer().write_cursor(), SMALL);
        prop_assert_eq!(fixture.write(ALICE, &[1]), Reply::Transferred(0));
    }

    #[test]
    fn test_read_write_always_rejected(steps in steps(16, 16), p in principal()) {
        let mut fixture = small_fixture();
        fixture.run(&steps);

        let before = fixture.state().snapshot();
        let reply = fixture.open(p, AccessMode::ReadWrite);
        prop_assert_eq!(reply, Reply::Error { errno: EACCES });
        prop_assert_eq!(fixture.state().snapshot(), before);
    }

    #[test]
    fn test_bad_control_leaves_state(
        request in any::<u32>().prop_filter("not grant", |r| *r != GRANT_REQUEST),
        short in payload(3),
        p in principal(),
    ) {
        let mut fixture = small_fixture();
        fixture.open(ALICE, AccessMode::WriteOnly);
        fixture.write(ALICE, b"keep");
        let before = fixture.state().snapshot();

        let unknown = fixture.control(p, request, &[0, 0, 0, 0]);
        prop_assert_eq!(unknown, Reply::Error { errno: ENOTTY });

        let malformed = fixture.control(ALICE, GRANT_REQUEST, &short);
        prop_assert_eq!(malformed, Reply::Error { errno: ENOTTY });

        prop_assert_eq!(fixture.state().snapshot(), before);
    }
}
