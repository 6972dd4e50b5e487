//! Property-based tests using proptest

use hydronet::*;
use proptest::prelude::*;

/// Build a random DAG: nodes N0..Nk with edges only from lower to higher
/// indices, so the graph is acyclic by construction.
fn random_dag(nodes: usize, edge_prob: f64) -> Network {
    let mut net = Network::new();
    for i in 0..nodes {
        net.add_component(&format!("N{i}"), "").unwrap();
    }
    for i in 0..nodes {
        for j in (i + 1)..nodes {
            if rand::random::<f64>() < edge_prob {
                net.add_connection(&format!("N{i}"), &format!("N{j}")).unwrap();
            }
        }
    }
    net
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn test_sinks_have_order_one(
        nodes in 2usize..20,
        edge_prob in 0.1f64..0.5
    ) {
        let net = random_dag(nodes, edge_prob);
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze(&net);

        prop_assert_eq!(net.has_cycle(), None);
        for sink in net.sink_nodes() {
            prop_assert_eq!(analyzer.order(sink), Some(1), "sink {} must be order 1", sink);
        }
    }

    #[test]
    fn test_order_follows_child_rule(
        nodes in 2usize..20,
        edge_prob in 0.1f64..0.5
    ) {
        let net = random_dag(nodes, edge_prob);
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze(&net);

        for component in net.iter() {
            let order = analyzer.order(&component.id).unwrap();
            let children: Vec<u32> = component
                .outgoing
                .iter()
                .map(|c| analyzer.order(c).unwrap())
                .collect();
            if children.is_empty() {
                prop_assert_eq!(order, 1);
            } else {
                let max = *children.iter().max().unwrap();
                let attained = children.iter().filter(|&&o| o == max).count();
                let expected = if attained > 1 { max + 1 } else { max };
                prop_assert_eq!(
                    order, expected,
                    "node {} with children {:?}", component.id, children
                );
            }
        }
    }

    #[test]
    fn test_max_order_zero_iff_empty(
        nodes in 0usize..10
    ) {
        let net = random_dag(nodes, 0.3);
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze(&net);
        prop_assert_eq!(analyzer.max_order() == 0, net.is_empty());
    }

    #[test]
    fn test_all_paths_end_where_asked(
        nodes in 2usize..12,
        edge_prob in 0.2f64..0.6
    ) {
        let net = random_dag(nodes, edge_prob);
        let start = "N0";
        let end = format!("N{}", nodes - 1);

        for path in net.all_paths(start, Some(&end)) {
            prop_assert_eq!(path.first().map(String::as_str), Some(start));
            prop_assert_eq!(path.last().map(String::as_str), Some(end.as_str()));
            // simple path: no repeated node
            let mut seen = std::collections::HashSet::new();
            prop_assert!(path.iter().all(|id| seen.insert(id.clone())));
        }

        // without an end, every path terminates at a sink
        for path in net.all_paths(start, None) {
            let last = path.last().unwrap();
            prop_assert!(net.children(last).is_empty());
        }
    }

    #[test]
    fn test_validator_is_idempotent_on_random_graphs(
        nodes in 1usize..12,
        edge_prob in 0.1f64..0.5
    ) {
        let mut net = random_dag(nodes, edge_prob);
        StrahlerAnalyzer::new().analyze_and_apply(&mut net);

        let engine = ValidationEngine::with_defaults();
        let assembler = BlockAssembler::new();
        let first = engine.validate(&net, &assembler);
        let second = engine.validate(&net, &assembler);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_detected_partition_is_disjoint(
        basins in 1usize..5,
        devices in 1usize..4,
        fields in 1usize..3
    ) {
        // a forest of basins: MC -> ZT -> F, repeated
        let mut net = Network::new();
        for b in 0..basins {
            let canal = format!("MC{b}");
            net.add_component(&canal, "").unwrap();
            for d in 0..devices {
                let gate = format!("ZT{b}_{d}");
                net.add_component(&gate, "").unwrap();
                net.add_connection(&canal, &gate).unwrap();
                for f in 0..fields {
                    let field = format!("F{b}_{d}_{f}");
                    net.add_component(&field, "").unwrap();
                    net.add_connection(&gate, &field).unwrap();
                }
            }
        }

        let mut asm = BlockAssembler::new();
        asm.detect_blocks(&mut net).unwrap();
        prop_assert_eq!(asm.blocks().count(), basins);

        // no component appears in two blocks
        let blocks: Vec<&Block> = asm.blocks().collect();
        for a in &blocks {
            for b in &blocks {
                if a.id != b.id {
                    prop_assert!(a.components.is_disjoint(&b.components));
                }
            }
        }

        // everything in a basin landed in that basin's block
        for b in 0..basins {
            let owner = asm.component_block(&format!("MC{b}")).unwrap();
            for d in 0..devices {
                prop_assert_eq!(asm.component_block(&format!("ZT{b}_{d}")), Some(owner));
            }
        }
    }

    #[test]
    fn test_assignment_preserves_single_ownership(
        moves in prop::collection::vec((0usize..4, 0usize..3), 1..20)
    ) {
        let mut net = Network::new();
        for i in 0..4 {
            net.add_component(&format!("ZT{i}"), "").unwrap();
        }
        let mut asm = BlockAssembler::new();
        let block_ids: Vec<String> = (0..3).map(|_| asm.create_block(None)).collect();

        for (comp, block) in moves {
            let comp_id = format!("ZT{comp}");
            asm.assign_component(&mut net, &comp_id, &block_ids[block]).unwrap();

            // after every move, each component is owned by at most one block
            for i in 0..4 {
                let id = format!("ZT{i}");
                let owners = asm
                    .blocks()
                    .filter(|b| b.components.contains(&id))
                    .count();
                prop_assert!(owners <= 1, "{} owned by {} blocks", id, owners);
                // the reverse map agrees with block contents
                if let Some(owner) = asm.component_block(&id) {
                    prop_assert!(asm.block(owner).unwrap().components.contains(&id));
                }
            }
        }
    }
}
