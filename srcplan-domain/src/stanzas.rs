use srcplan_types::description::{Benchmark, OptionalStanza, PackageDescription, TestSuite};

/// Marks every test suite and benchmark enabled iff its stanza is listed.
///
/// Only the `enabled` flags change; conditions, constraints and every other
/// field are kept. Applying the same stanzas twice changes nothing more.
pub fn enable_stanzas(
    stanzas: &[OptionalStanza],
    mut desc: PackageDescription,
) -> PackageDescription {
    let tests = stanzas.contains(&OptionalStanza::TestStanzas);
    let benchmarks = stanzas.contains(&OptionalStanza::BenchStanzas);

    desc.test_suites = desc
        .test_suites
        .into_iter()
        .map(|(name, tree)| {
            let tree = tree.map_data(&mut |suite: TestSuite| TestSuite {
                enabled: tests,
                ..suite
            });
            (name, tree)
        })
        .collect();

    desc.benchmarks = desc
        .benchmarks
        .into_iter()
        .map(|(name, tree)| {
            let tree = tree.map_data(&mut |bench: Benchmark| Benchmark {
                enabled: benchmarks,
                ..bench
            });
            (name, tree)
        })
        .collect();

    desc
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcplan_types::description::{CondBranch, CondTree, Condition, FlagName};

    fn desc() -> PackageDescription {
        let mut d = PackageDescription::new("foo-1.0".parse().unwrap());
        d.test_suites.insert(
            "unit".to_string(),
            CondTree {
                data: TestSuite {
                    main_is: "Main.hs".to_string(),
                    enabled: false,
                },
                constraints: vec![],
                branches: vec![CondBranch {
                    condition: Condition::Flag(FlagName::new("slow")),
                    then_tree: CondTree::leaf(TestSuite::default(), vec![]),
                    else_tree: None,
                }],
            },
        );
        d.benchmarks.insert(
            "speed".to_string(),
            CondTree::leaf(
                Benchmark {
                    main_is: "Bench.hs".to_string(),
                    enabled: true,
                },
                vec![],
            ),
        );
        d
    }

    #[test]
    fn tests_only_enables_test_suites() {
        let out = enable_stanzas(&[OptionalStanza::TestStanzas], desc());
        assert!(out.test_suites["unit"].all_data().iter().all(|t| t.enabled));
        assert!(out.benchmarks["speed"].all_data().iter().all(|b| !b.enabled));
    }

    #[test]
    fn other_fields_survive() {
        let out = enable_stanzas(&[OptionalStanza::BenchStanzas], desc());
        assert_eq!(out.test_suites["unit"].data.main_is, "Main.hs");
        assert_eq!(out.benchmarks["speed"].data.main_is, "Bench.hs");
        assert_eq!(
            out.test_suites["unit"].branches[0].condition,
            Condition::Flag(FlagName::new("slow"))
        );
    }
}
