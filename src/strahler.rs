//! Strahler order computation
//!
//! Assigns every component an integer hierarchy order based purely on
//! topology: sinks are order 1, and a node's order grows only where
//! multiple branches of equal maximal order converge. No component type
//! or root assumption enters the computation.
//!
//! The reduction is memoized and driven by an explicit work-stack, so
//! recursion depth never tracks graph size. A node re-entered while still
//! on the active path contributes order 0 and is not memoized at that
//! point — a defensive fallback that lets the pass finish on corrupt
//! (cyclic) input. The validator's cycle check is the authoritative
//! signal; orders computed over a cycle must not be trusted.

use crate::network::Network;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Computes and holds per-component Strahler orders.
#[derive(Debug, Default)]
pub struct StrahlerAnalyzer {
    orders: FxHashMap<String, u32>,
}

struct Frame {
    id: String,
    next_child: usize,
    child_orders: Vec<u32>,
}

impl StrahlerAnalyzer {
    /// Create an analyzer with no computed orders
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute orders for every component in the network.
    ///
    /// The pass is seeded from every node (not only sources), so isolated
    /// and mid-graph components receive an order too. Previous results are
    /// discarded; there is no incremental update.
    pub fn analyze(&mut self, net: &Network) -> &FxHashMap<String, u32> {
        self.orders.clear();
        let mut on_path: FxHashSet<String> = FxHashSet::default();
        for id in net.ids() {
            if !self.orders.contains_key(id) {
                self.reduce_from(net, id, &mut on_path);
            }
        }
        &self.orders
    }

    /// Compute orders and store them on the network's components
    pub fn analyze_and_apply(&mut self, net: &mut Network) {
        self.analyze(net);
        self.apply_orders(net);
    }

    /// Write the computed orders back onto the components
    pub fn apply_orders(&self, net: &mut Network) {
        let ids: Vec<String> = net.ids().to_vec();
        for id in ids {
            let order = self.orders.get(&id).copied();
            if let Some(component) = net.get_mut(&id) {
                component.order = order;
            }
        }
    }

    /// The computed order of one component
    pub fn order(&self, id: &str) -> Option<u32> {
        self.orders.get(id).copied()
    }

    /// All computed orders
    pub fn orders(&self) -> &FxHashMap<String, u32> {
        &self.orders
    }

    /// Group component ids by computed order, ids sorted within each level
    pub fn levels_by_order(&self) -> BTreeMap<u32, Vec<String>> {
        let mut levels: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (id, &order) in &self.orders {
            levels.entry(order).or_default().push(id.clone());
        }
        for ids in levels.values_mut() {
            ids.sort();
        }
        levels
    }

    /// The maximum assigned order, or 0 if nothing was computed
    pub fn max_order(&self) -> u32 {
        self.orders.values().max().copied().unwrap_or(0)
    }

    /// Memoized post-order reduction from one seed, on an explicit stack.
    fn reduce_from(&mut self, net: &Network, start: &str, on_path: &mut FxHashSet<String>) {
        let mut stack = vec![Frame {
            id: start.to_string(),
            next_child: 0,
            child_orders: Vec::new(),
        }];
        on_path.insert(start.to_string());

        while let Some(frame) = stack.last_mut() {
            let children = net.children(&frame.id);
            if frame.next_child < children.len() {
                let child = children[frame.next_child].as_str();
                frame.next_child += 1;
                if let Some(&order) = self.orders.get(child) {
                    frame.child_orders.push(order);
                } else if on_path.contains(child) {
                    // cycle fallback: contributes 0, child stays unmemoized
                    frame.child_orders.push(0);
                } else {
                    on_path.insert(child.to_string());
                    stack.push(Frame {
                        id: child.to_string(),
                        next_child: 0,
                        child_orders: Vec::new(),
                    });
                }
            } else if let Some(done) = stack.pop() {
                on_path.remove(&done.id);
                let order = order_from_children(&done.child_orders);
                self.orders.insert(done.id, order);
            }
        }
    }
}

/// The Strahler reduction rule.
///
/// Sinks are 1. Otherwise the order is the maximum child order `m`,
/// incremented to `m + 1` only when more than one child attains `m`.
fn order_from_children(child_orders: &[u32]) -> u32 {
    let Some(&max) = child_orders.iter().max() else {
        return 1;
    };
    let attained = child_orders.iter().filter(|&&o| o == max).count();
    if attained > 1 {
        max + 1
    } else {
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    fn analyze(net: &Network) -> StrahlerAnalyzer {
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze(net);
        analyzer
    }

    #[test]
    fn test_chain_has_uniform_order() {
        // A -> B -> C: no branching, everything stays at 1
        let net = Network::from_definitions(
            &[("DP1", ""), ("DP2", ""), ("DP3", "")],
            &[("DP1", "DP2"), ("DP2", "DP3")],
        )
        .unwrap();
        let analyzer = analyze(&net);
        assert_eq!(analyzer.order("DP1"), Some(1));
        assert_eq!(analyzer.order("DP2"), Some(1));
        assert_eq!(analyzer.order("DP3"), Some(1));
    }

    #[test]
    fn test_fork_increments_order() {
        // R -> {X, Y}: two children of equal order 1 push R to 2
        let net = Network::from_definitions(
            &[("MC1", ""), ("F1", ""), ("F2", "")],
            &[("MC1", "F1"), ("MC1", "F2")],
        )
        .unwrap();
        let analyzer = analyze(&net);
        assert_eq!(analyzer.order("F1"), Some(1));
        assert_eq!(analyzer.order("F2"), Some(1));
        assert_eq!(analyzer.order("MC1"), Some(2));
    }

    #[test]
    fn test_unique_max_child_keeps_order() {
        // R feeds a branching subtree (order 2) and a lone leaf (order 1):
        // the maximum is unique, so R stays at 2
        let net = Network::from_definitions(
            &[("MC1", ""), ("DP1", ""), ("F1", ""), ("F2", ""), ("F3", "")],
            &[
                ("MC1", "DP1"),
                ("MC1", "F3"),
                ("DP1", "F1"),
                ("DP1", "F2"),
            ],
        )
        .unwrap();
        let analyzer = analyze(&net);
        assert_eq!(analyzer.order("DP1"), Some(2));
        assert_eq!(analyzer.order("MC1"), Some(2));
    }

    #[test]
    fn test_two_equal_subtrees_increment() {
        // two order-2 subtrees converge on the root -> order 3
        let net = Network::from_definitions(
            &[
                ("MC1", ""),
                ("DP1", ""),
                ("DP2", ""),
                ("F1", ""),
                ("F2", ""),
                ("F3", ""),
                ("F4", ""),
            ],
            &[
                ("MC1", "DP1"),
                ("MC1", "DP2"),
                ("DP1", "F1"),
                ("DP1", "F2"),
                ("DP2", "F3"),
                ("DP2", "F4"),
            ],
        )
        .unwrap();
        let analyzer = analyze(&net);
        assert_eq!(analyzer.order("MC1"), Some(3));
    }

    #[test]
    fn test_every_node_receives_an_order() {
        // SW1 is isolated; DP2 is mid-graph and unreachable from DP1
        let net = Network::from_definitions(
            &[("DP1", ""), ("F1", ""), ("SW1", ""), ("DP2", ""), ("F2", "")],
            &[("DP1", "F1"), ("DP2", "F2")],
        )
        .unwrap();
        let analyzer = analyze(&net);
        for id in ["DP1", "F1", "SW1", "DP2", "F2"] {
            assert!(analyzer.order(id).is_some(), "{id} missing an order");
        }
        assert_eq!(analyzer.order("SW1"), Some(1));
    }

    #[test]
    fn test_cycle_fallback_terminates() {
        let net = Network::from_definitions(
            &[("DP1", ""), ("DP2", ""), ("DP3", "")],
            &[("DP1", "DP2"), ("DP2", "DP3"), ("DP3", "DP1")],
        )
        .unwrap();
        let analyzer = analyze(&net);
        // the pass completes; orders over a cycle are degraded, not trusted
        assert_eq!(analyzer.orders().len(), 3);
    }

    #[test]
    fn test_max_order_zero_iff_empty() {
        let empty = Network::new();
        assert_eq!(analyze(&empty).max_order(), 0);

        let mut net = Network::new();
        net.add_component("F1", "").unwrap();
        assert_eq!(analyze(&net).max_order(), 1);
    }

    #[test]
    fn test_levels_by_order_groups_and_sorts() {
        let net = Network::from_definitions(
            &[("MC1", ""), ("F2", ""), ("F1", "")],
            &[("MC1", "F1"), ("MC1", "F2")],
        )
        .unwrap();
        let analyzer = analyze(&net);
        let levels = analyzer.levels_by_order();
        assert_eq!(levels[&1], vec!["F1".to_string(), "F2".to_string()]);
        assert_eq!(levels[&2], vec!["MC1".to_string()]);
        assert_eq!(analyzer.max_order(), 2);
    }

    #[test]
    fn test_apply_orders_writes_components() {
        let mut net = Network::from_definitions(
            &[("MC1", ""), ("F1", ""), ("F2", "")],
            &[("MC1", "F1"), ("MC1", "F2")],
        )
        .unwrap();
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze_and_apply(&mut net);
        assert_eq!(net.get("MC1").unwrap().order, Some(2));
        assert_eq!(net.get("F1").unwrap().order, Some(1));
    }

    #[test]
    fn test_reanalysis_discards_stale_orders() {
        let mut net = Network::from_definitions(&[("DP1", ""), ("F1", "")], &[("DP1", "F1")])
            .unwrap();
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze(&net);
        assert_eq!(analyzer.order("DP1"), Some(1));

        net.add_component("F2", "").unwrap();
        net.add_connection("DP1", "F2").unwrap();
        analyzer.analyze(&net);
        assert_eq!(analyzer.order("DP1"), Some(2));
    }
}
