use proptest::prelude::*;
use srcplan_domain::enable_stanzas;
use srcplan_types::description::{
    Benchmark, CondBranch, CondTree, Condition, OptionalStanza, PackageDescription, TestSuite,
};

fn arb_stanzas() -> impl Strategy<Value = Vec<OptionalStanza>> {
    prop::collection::vec(
        prop_oneof![
            Just(OptionalStanza::TestStanzas),
            Just(OptionalStanza::BenchStanzas),
        ],
        0..3,
    )
}

fn arb_description() -> impl Strategy<Value = PackageDescription> {
    (
        prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 0..4),
        prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 0..4),
    )
        .prop_map(|(tests, benches)| {
            let mut desc = PackageDescription::new("demo-1.0".parse().unwrap());
            for (name, enabled) in tests {
                let suite = TestSuite {
                    main_is: format!("{name}.hs"),
                    enabled,
                };
                let mut tree = CondTree::leaf(suite.clone(), vec![]);
                tree.branches.push(CondBranch {
                    condition: Condition::Lit(enabled),
                    then_tree: CondTree::leaf(suite, vec![]),
                    else_tree: None,
                });
                desc.test_suites.insert(name, tree);
            }
            for (name, enabled) in benches {
                let bench = Benchmark {
                    main_is: format!("{name}.hs"),
                    enabled,
                };
                desc.benchmarks.insert(name, CondTree::leaf(bench, vec![]));
            }
            desc
        })
}

proptest! {
    #[test]
    fn enabling_is_idempotent(stanzas in arb_stanzas(), desc in arb_description()) {
        let once = enable_stanzas(&stanzas, desc);
        let twice = enable_stanzas(&stanzas, once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn enabled_tracks_listed_stanzas(stanzas in arb_stanzas(), desc in arb_description()) {
        let tests = stanzas.contains(&OptionalStanza::TestStanzas);
        let benches = stanzas.contains(&OptionalStanza::BenchStanzas);
        let out = enable_stanzas(&stanzas, desc);

        for tree in out.test_suites.values() {
            prop_assert!(tree.all_data().iter().all(|s| s.enabled == tests));
        }
        for tree in out.benchmarks.values() {
            prop_assert!(tree.all_data().iter().all(|b| b.enabled == benches));
        }
    }

    #[test]
    fn only_enabled_flags_change(stanzas in arb_stanzas(), desc in arb_description()) {
        let out = enable_stanzas(&stanzas, desc.clone());
        prop_assert_eq!(
            out.test_suites.keys().collect::<Vec<_>>(),
            desc.test_suites.keys().collect::<Vec<_>>()
        );
        for (name, tree) in &out.test_suites {
            let before = &desc.test_suites[name];
            prop_assert_eq!(&tree.constraints, &before.constraints);
            prop_assert_eq!(tree.branches.len(), before.branches.len());
            prop_assert_eq!(&tree.data.main_is, &before.data.main_is);
        }
    }
}
