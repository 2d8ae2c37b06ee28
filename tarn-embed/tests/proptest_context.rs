// tarn-embed - Property-based tests for execution contexts
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for globals sharing and isolation.
//!
//! Tests the following properties:
//! - Sequential calls through a shared context accumulate in the program
//! - Isolated contexts never write to the handle they were copied from

mod common;

use common::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn shared_calls_accumulate(start in -1_000i64..1_000, calls in 0usize..20) {
        let program = run(counter_program());
        program.set("counter", start)?;
        let inc = program.get("inc").unwrap();
        let ctx = program.context()?;
        for _ in 0..calls {
            ctx.call(&inc, &[])?;
        }
        prop_assert_eq!(program.get_as::<i64>("counter"), Some(start + calls as i64));
    }

    #[test]
    fn isolated_calls_leave_the_source_alone(
        start in -1_000i64..1_000,
        plan in prop::collection::vec((any::<bool>(), 0usize..5), 1..8),
    ) {
        let program = run(counter_program());
        program.set("counter", start)?;
        let inc = program.get("inc").unwrap();
        let shared = program.context()?;

        // Each step either calls through a fresh isolated copy or through
        // the shared context.
        let mut expected = start;
        for (isolated, calls) in plan {
            let ctx = if isolated { shared.with_isolated_globals() } else { shared.clone() };
            for _ in 0..calls {
                ctx.call(&inc, &[])?;
            }
            if !isolated {
                expected += calls as i64;
            }
            prop_assert_eq!(program.get_as::<i64>("counter"), Some(expected));
        }
    }
}
