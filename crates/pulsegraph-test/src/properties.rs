//! Property tests - memoization, satisfaction and propagation on random graphs

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use pulsegraph_core::{ComputedCell, FreshnessRule, Graph};

use crate::random_dag::{DagConfig, RandomDag};

proptest! {
    #[test]
    fn prop_same_tick_is_memoized(seed in any::<u64>(), t in -1000i64..1000) {
        let mut dag = RandomDag::generate(&DagConfig::small(seed)).unwrap();
        let sink = dag.sink().unwrap();

        let first = *dag.graph.refresh(sink, t).unwrap();
        dag.reset_counts();
        let second = *dag.graph.refresh(sink, t).unwrap();

        prop_assert_eq!(first, second);
        prop_assert!(dag.compute_counts().iter().all(|c| *c == 0));
    }

    #[test]
    fn prop_earlier_tick_recomputes(seed in any::<u64>(), t in 1i64..1000, back in 1i64..100) {
        let mut dag = RandomDag::generate(&DagConfig::small(seed)).unwrap();
        let sink = dag.sink().unwrap();
        let earlier = t - back;

        dag.graph.refresh(sink, t).unwrap();
        prop_assert_eq!(dag.graph.policy(sink).unwrap().last_satisfied(), Some(t));

        dag.graph.refresh(sink, earlier).unwrap();
        prop_assert_eq!(dag.graph.policy(sink).unwrap().last_satisfied(), Some(earlier));
        prop_assert_eq!(dag.compute_counts().last().copied(), Some(2));
    }

    #[test]
    fn prop_each_reachable_cell_computes_once_per_tick(
        seed in any::<u64>(),
        ticks in proptest::collection::btree_set(-100i64..100, 1..8),
    ) {
        let mut dag = RandomDag::generate(&DagConfig::small(seed)).unwrap();
        let sink = dag.sink().unwrap();
        let reachable = dag.reachable_from(sink).unwrap();

        for t in &ticks {
            dag.graph.refresh(sink, *t).unwrap();
            dag.graph.refresh(sink, *t).unwrap();
        }

        for (i, count) in dag.compute_counts().into_iter().enumerate() {
            let expected = if reachable.contains(&i) { ticks.len() as u64 } else { 0 };
            prop_assert_eq!(count, expected);
        }
        prop_assert_eq!(*dag.graph.value(sink).unwrap(), dag.expected_value(sink).unwrap());
    }

    #[test]
    fn prop_flag_driven_computes_once_per_set(flags in proptest::collection::vec(any::<bool>(), 1..20)) {
        let calls = Rc::new(Cell::new(0u32));
        let mut graph = Graph::new();
        let counter = Rc::clone(&calls);
        let event = graph.add_cell(
            ComputedCell::<u32>::new("event")
                .with_rule(FreshnessRule::FlagDriven)
                .with_function(move |value, _, _| {
                    counter.set(counter.get() + 1);
                    *value = counter.get();
                    Ok(())
                }),
        );

        for (t, flag) in flags.iter().enumerate() {
            if *flag {
                graph.set_ready(event, true).unwrap();
            }
            graph.refresh(event, t as i64).unwrap();
            graph.refresh(event, t as i64).unwrap();
            prop_assert!(!graph.is_ready(event).unwrap());
        }

        let expected = flags.iter().filter(|f| **f).count() as u32;
        prop_assert_eq!(calls.get(), expected);
    }

    #[test]
    fn prop_always_fresh_computes_once(ticks in proptest::collection::vec(-50i64..50, 1..20)) {
        let calls = Rc::new(Cell::new(0u32));
        let mut graph = Graph::new();
        let counter = Rc::clone(&calls);
        let gain = graph.add_cell(
            ComputedCell::<u32>::new("gain")
                .with_rule(FreshnessRule::AlwaysFresh)
                .with_function(move |_, _, _| {
                    counter.set(counter.get() + 1);
                    Ok(())
                }),
        );

        for t in ticks {
            graph.refresh(gain, t).unwrap();
        }
        prop_assert_eq!(calls.get(), 1);
    }
}
