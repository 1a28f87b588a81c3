// tests/property/ordering.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use proptest::prelude::*;

use dobi::config::{AliasConfig, Config, Resource};
use dobi::dag::collect;
use dobi::errors::DobiError;

use crate::common::builders::ConfigBuilder;

/// `alias_i.tasks` lists the aliases in `edges[i]`.
fn alias_config(edges: &[BTreeSet<usize>]) -> Config {
    let mut builder = ConfigBuilder::new("/work").with_project("prop");
    for (i, deps) in edges.iter().enumerate() {
        builder = builder.with_resource(
            &format!("alias_{i}"),
            Resource::Alias(AliasConfig {
                tasks: deps.iter().map(|d| format!("alias_{d}")).collect(),
                ..Default::default()
            }),
        );
    }
    builder.build()
}

/// Acyclic graphs: node `i` only points at nodes below it.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..n), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            deps.into_iter().map(|d| d % i).collect()
                        }
                    })
                    .collect()
            },
        )
    })
}

/// Arbitrary graphs, cycles and self-loops included.
fn graph_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(0..n, 0..3), n).prop_map(|raw| {
            raw.into_iter()
                .map(|deps| deps.into_iter().collect::<BTreeSet<usize>>())
                .collect()
        })
    })
}

fn reaches_cycle(edges: &[BTreeSet<usize>], roots: &[usize]) -> bool {
    // 0 = unvisited, 1 = on the current path, 2 = done.
    fn visit(node: usize, edges: &[BTreeSet<usize>], state: &mut [u8]) -> bool {
        match state[node] {
            1 => return true,
            2 => return false,
            _ => {}
        }
        state[node] = 1;
        for &next in &edges[node] {
            if visit(next, edges, state) {
                return true;
            }
        }
        state[node] = 2;
        false
    }
    let mut state = vec![0u8; edges.len()];
    roots.iter().any(|&r| visit(r, edges, &mut state))
}

proptest! {
    #[test]
    fn every_task_follows_its_dependencies(
        edges in dag_strategy(12),
        root_picks in proptest::collection::vec(any::<usize>(), 1..4),
    ) {
        let config = alias_config(&edges);
        let roots: Vec<String> = root_picks
            .iter()
            .map(|r| format!("alias_{}", r % edges.len()))
            .collect();

        let plan = collect(&config, &roots).unwrap();
        let position: HashMap<String, usize> = plan
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.to_string(), i))
            .collect();
        prop_assert_eq!(position.len(), plan.len(), "duplicate entries in {:?}", plan);

        for (i, task) in plan.iter().enumerate() {
            for dep in &task.deps {
                let at = position.get(&dep.to_string());
                prop_assert!(at.is_some_and(|&p| p < i), "{} runs before {}", task.name, dep);
            }
        }
        for root in &roots {
            let name = format!("{root}:run");
            prop_assert!(position.contains_key(&name), "missing root {}", name);
        }
    }

    #[test]
    fn cycles_are_reported_iff_reachable(
        edges in graph_strategy(8),
        root in any::<usize>(),
    ) {
        let root = root % edges.len();
        let config = alias_config(&edges);
        let result = collect(&config, &[format!("alias_{root}")]);

        match (reaches_cycle(&edges, &[root]), result) {
            (true, Err(DobiError::CyclicDependency(names))) => {
                prop_assert!(!names.is_empty());
                let unique: BTreeSet<&String> = names.iter().collect();
                prop_assert_eq!(unique.len(), names.len());
            }
            (false, Ok(plan)) => prop_assert!(!plan.is_empty()),
            (expected, other) => {
                prop_assert!(false, "cycle expected: {}, got {:?}", expected, other);
            }
        }
    }

    #[test]
    fn default_action_names_collapse(edges in dag_strategy(6)) {
        let config = alias_config(&edges);
        let last = edges.len() - 1;
        let plain = collect(&config, &[format!("alias_{last}")]).unwrap();
        let explicit = collect(
            &config,
            &[format!("alias_{last}:run"), format!("alias_{last}")],
        )
        .unwrap();
        prop_assert_eq!(plain, explicit);
    }
}

#[test]
fn diamond_runs_shared_dependency_once() {
    let mut edges = vec![BTreeSet::new(); 4];
    edges[1].insert(0);
    edges[2].insert(0);
    edges[3].extend([1, 2]);
    let plan = collect(&alias_config(&edges), &["alias_3".to_string()]).unwrap();
    let names: Vec<String> = plan.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["alias_0:run", "alias_1:run", "alias_2:run", "alias_3:run"]);

    let by_name: BTreeMap<String, Vec<String>> = plan
        .iter()
        .map(|t| (t.name.to_string(), t.deps.iter().map(ToString::to_string).collect()))
        .collect();
    assert_eq!(by_name["alias_3:run"], vec!["alias_1:run", "alias_2:run"]);
}
