//! Irrigation network graph model
//!
//! This module provides the [`Network`] container that owns all components
//! and their directed connections. Edges are implicit: each component keeps
//! ordered outgoing and incoming id lists, mirrored on both endpoints.
//!
//! The model is purely structural — hierarchy orders are computed by the
//! Strahler analyzer and blocks by the assembler; any structural edit here
//! invalidates those downstream results and requires a recompute.

use crate::errors::{NetworkError, Result};
use crate::types::{ComponentType, PrefixPolicy};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A node in the irrigation network
#[derive(Debug, Clone)]
pub struct Component {
    /// Unique component id (also encodes the type prefix)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Type derived from the id prefix at construction
    pub component_type: ComponentType,
    /// Outgoing connection targets, in insertion order
    pub outgoing: Vec<String>,
    /// Incoming connection sources, in insertion order
    pub incoming: Vec<String>,
    /// Hierarchy order assigned by the Strahler analyzer
    pub order: Option<u32>,
    /// Externally supplied order override
    pub manual_order: Option<u32>,
    /// Owning block, if assigned
    pub block_id: Option<String>,
}

impl Component {
    /// Create a new unconnected component
    pub fn new(id: impl Into<String>, label: impl Into<String>, policy: PrefixPolicy) -> Self {
        let id = id.into();
        let component_type = ComponentType::from_id_with_policy(&id, policy);
        Self {
            id,
            label: label.into(),
            component_type,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            order: None,
            manual_order: None,
            block_id: None,
        }
    }

    /// Check if the component has no connections at all
    pub fn is_disconnected(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }

    /// Check if the component is a source (no incoming connections)
    pub fn is_source(&self) -> bool {
        self.incoming.is_empty()
    }

    /// Check if the component is a sink (no outgoing connections)
    pub fn is_sink(&self) -> bool {
        self.outgoing.is_empty()
    }
}

/// Read-only component snapshot for presentation callers
#[derive(Debug, Clone, Serialize)]
pub struct ComponentDetail {
    pub id: String,
    pub label: String,
    pub component_type: ComponentType,
    pub order: Option<u32>,
    pub manual_order: Option<u32>,
    pub block_id: Option<String>,
    pub incoming: Vec<String>,
    pub outgoing: Vec<String>,
}

/// The irrigation network graph
///
/// Owns components in a hash map plus an insertion-order id list, so all
/// enumerations (sources, sinks, analysis seeds) are deterministic.
#[derive(Debug, Default, Clone)]
pub struct Network {
    components: FxHashMap<String, Component>,
    ids: Vec<String>,
    policy: PrefixPolicy,
}

impl Network {
    /// Create an empty network with the default (strict) prefix policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty network with an explicit prefix policy
    pub fn with_policy(policy: PrefixPolicy) -> Self {
        Self {
            components: FxHashMap::default(),
            ids: Vec::new(),
            policy,
        }
    }

    /// Build a network from ingestion lists: component definitions first,
    /// then edges referencing only already-defined ids.
    pub fn from_definitions(components: &[(&str, &str)], edges: &[(&str, &str)]) -> Result<Self> {
        let mut net = Self::new();
        for (id, label) in components {
            net.add_component(id, label)?;
        }
        for (source, target) in edges {
            net.add_connection(source, target)?;
        }
        Ok(net)
    }

    /// The prefix policy this network types components with
    pub fn policy(&self) -> PrefixPolicy {
        self.policy
    }

    /// Add a new component to the network
    pub fn add_component(&mut self, id: &str, label: &str) -> Result<()> {
        if self.components.contains_key(id) {
            return Err(NetworkError::duplicate_id(id));
        }
        self.components
            .insert(id.to_string(), Component::new(id, label, self.policy));
        self.ids.push(id.to_string());
        Ok(())
    }

    /// Add a directed connection between two existing components.
    ///
    /// Both adjacency lists are updated together. Re-adding an existing
    /// connection is a no-op; self-loops are rejected.
    pub fn add_connection(&mut self, source: &str, target: &str) -> Result<()> {
        if source == target {
            return Err(NetworkError::self_reference(source));
        }
        if !self.components.contains_key(source) {
            return Err(NetworkError::unknown_component(source));
        }
        if !self.components.contains_key(target) {
            return Err(NetworkError::unknown_component(target));
        }

        if let Some(src) = self.components.get_mut(source) {
            if !src.outgoing.iter().any(|t| t == target) {
                src.outgoing.push(target.to_string());
            }
        }
        if let Some(tgt) = self.components.get_mut(target) {
            if !tgt.incoming.iter().any(|s| s == source) {
                tgt.incoming.push(source.to_string());
            }
        }
        Ok(())
    }

    /// Get a component by id
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Get a mutable component by id
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.get_mut(id)
    }

    /// Check if a component id exists
    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Outgoing connection targets of a component, empty if the id is unknown
    pub fn children(&self, id: &str) -> &[String] {
        self.components
            .get(id)
            .map(|c| c.outgoing.as_slice())
            .unwrap_or(&[])
    }

    /// Incoming connection sources of a component, empty if the id is unknown
    pub fn parents(&self, id: &str) -> &[String] {
        self.components
            .get(id)
            .map(|c| c.incoming.as_slice())
            .unwrap_or(&[])
    }

    /// Components with no incoming connections, in insertion order
    pub fn source_nodes(&self) -> Vec<&str> {
        self.iter()
            .filter(|c| c.is_source())
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Components with no outgoing connections, in insertion order
    pub fn sink_nodes(&self) -> Vec<&str> {
        self.iter()
            .filter(|c| c.is_sink())
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Check if a component has no connections in either direction
    pub fn is_disconnected(&self, id: &str) -> bool {
        self.components
            .get(id)
            .map(|c| c.is_disconnected())
            .unwrap_or(false)
    }

    /// Enumerate all simple paths from `start`.
    ///
    /// With `end` given, paths terminate exactly at `end`; otherwise they
    /// terminate at any sink. The visited set is per-path, so branching in
    /// dense graphs yields exponentially many paths — callers needing scale
    /// must bound branching or depth.
    pub fn all_paths(&self, start: &str, end: Option<&str>) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        if !self.components.contains_key(start) {
            return paths;
        }

        // Explicit work-stack of (current node, path so far) frames; the
        // path doubles as the per-path visited set.
        let mut stack: Vec<(String, Vec<String>)> =
            vec![(start.to_string(), vec![start.to_string()])];

        while let Some((current, path)) = stack.pop() {
            if let Some(end_id) = end {
                if current == end_id {
                    paths.push(path);
                    continue;
                }
            }
            let outgoing = self.children(&current);
            if outgoing.is_empty() {
                if end.is_none() {
                    paths.push(path);
                }
                continue;
            }
            // reversed so the first child is explored first (stack order)
            for next in outgoing.iter().rev() {
                if !path.iter().any(|p| p == next) {
                    let mut extended = path.clone();
                    extended.push(next.clone());
                    stack.push((next.clone(), extended));
                }
            }
        }
        paths
    }

    /// Detect a cycle via DFS with an explicit recursion-stack set.
    ///
    /// Returns an id belonging to the first detected cycle, or `None`.
    pub fn has_cycle(&self) -> Option<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Visiting,
            Done,
        }

        let mut state: FxHashMap<&str, State> = FxHashMap::default();

        for id in &self.ids {
            if state.contains_key(id.as_str()) {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(id.as_str(), 0)];
            state.insert(id.as_str(), State::Visiting);

            while let Some(&mut (node, ref mut child_idx)) = stack.last_mut() {
                let children = self.children(node);
                if *child_idx < children.len() {
                    let child = children[*child_idx].as_str();
                    *child_idx += 1;
                    match state.get(child) {
                        Some(State::Visiting) => return Some(child.to_string()),
                        Some(State::Done) => {}
                        None => {
                            state.insert(child, State::Visiting);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    stack.pop();
                    state.insert(node, State::Done);
                }
            }
        }
        None
    }

    /// Set a component's manual order override
    pub fn set_manual_order(&mut self, id: &str, order: u32) -> Result<()> {
        match self.components.get_mut(id) {
            Some(component) => {
                component.manual_order = Some(order);
                Ok(())
            }
            None => Err(NetworkError::unknown_component(id)),
        }
    }

    /// Read-only snapshot of one component for presentation callers
    pub fn component_detail(&self, id: &str) -> Option<ComponentDetail> {
        self.components.get(id).map(|c| ComponentDetail {
            id: c.id.clone(),
            label: c.label.clone(),
            component_type: c.component_type,
            order: c.order,
            manual_order: c.manual_order,
            block_id: c.block_id.clone(),
            incoming: c.incoming.clone(),
            outgoing: c.outgoing.clone(),
        })
    }

    /// Iterate components in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.ids.iter().filter_map(|id| self.components.get(id))
    }

    /// Component ids in insertion order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the network has no components
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Total number of directed connections
    pub fn connection_count(&self) -> usize {
        self.iter().map(|c| c.outgoing.len()).sum()
    }
}
