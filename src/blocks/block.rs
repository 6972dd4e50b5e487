//! Block and joint data types

use crate::types::{ComponentType, JointType};
use rustc_hash::{FxHashMap, FxHashSet};

/// A recorded connection point between components.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Unique joint id
    pub id: String,
    /// Internal (within one block) or confluence (across blocks)
    pub joint_type: JointType,
    /// Upstream component ids, in detection order
    pub upstream: Vec<String>,
    /// Downstream component ids, in detection order
    pub downstream: Vec<String>,
    /// Hierarchy level, once assigned
    pub level: Option<u32>,
}

impl Joint {
    /// Create a new joint
    pub fn new(
        id: impl Into<String>,
        joint_type: JointType,
        upstream: Vec<String>,
        downstream: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            joint_type,
            upstream,
            downstream,
            level: None,
        }
    }

    /// Check if this joint crosses a block boundary
    pub fn is_confluence(&self) -> bool {
        self.joint_type == JointType::Confluence
    }
}

/// A sub-basin of the network, anchored at one distribution canal.
///
/// Component ownership is mutually exclusive across blocks; the assembler
/// maintains that invariant. A block has at most one parent, so the block
/// graph is a forest and hierarchy propagation terminates by construction.
#[derive(Debug, Clone)]
pub struct Block {
    /// Unique block id
    pub id: String,
    /// Owned component ids
    pub components: FxHashSet<String>,
    /// Joints attached to this block, both kinds
    pub joints: FxHashMap<String, Joint>,
    /// Computed hierarchy level
    pub level: Option<u32>,
    /// Externally supplied order override
    pub manual_order: Option<u32>,
    /// Parent block, if any
    pub parent: Option<String>,
    /// Child block ids
    pub children: FxHashSet<String>,
    /// The canal component anchoring the block
    pub distribution_canal: Option<String>,
}

impl Block {
    /// Create an empty block
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            components: FxHashSet::default(),
            joints: FxHashMap::default(),
            level: None,
            manual_order: None,
            parent: None,
            children: FxHashSet::default(),
            distribution_canal: None,
        }
    }

    /// Add a component to the block.
    ///
    /// The first canal-typed component becomes the distribution canal.
    pub fn add_component(&mut self, component_id: &str, component_type: ComponentType) {
        self.components.insert(component_id.to_string());
        if component_type.is_canal() && self.distribution_canal.is_none() {
            self.distribution_canal = Some(component_id.to_string());
        }
    }

    /// Remove a component; clears the canal anchor if it was the anchor
    pub fn remove_component(&mut self, component_id: &str) -> bool {
        if !self.components.remove(component_id) {
            return false;
        }
        if self.distribution_canal.as_deref() == Some(component_id) {
            self.distribution_canal = None;
        }
        true
    }

    /// Check if a component belongs to this block
    pub fn owns(&self, component_id: &str) -> bool {
        self.components.contains(component_id)
    }

    /// Attach a joint
    pub fn add_joint(&mut self, joint: Joint) {
        self.joints.insert(joint.id.clone(), joint);
    }

    /// Detach and return a joint
    pub fn remove_joint(&mut self, joint_id: &str) -> Option<Joint> {
        self.joints.remove(joint_id)
    }

    /// Joints internal to the block
    pub fn internal_joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.values().filter(|j| !j.is_confluence())
    }

    /// Joints crossing into this block from other blocks
    pub fn confluence_joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.values().filter(|j| j.is_confluence())
    }

    /// Check if any confluence joint is attached
    pub fn has_confluences(&self) -> bool {
        self.joints.values().any(|j| j.is_confluence())
    }

    /// The level used for propagation: manual order wins over computed
    pub fn effective_level(&self) -> Option<u32> {
        self.manual_order.or(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_canal_becomes_anchor() {
        let mut block = Block::new("B1");
        block.add_component("ZT1", ComponentType::Gate);
        assert_eq!(block.distribution_canal, None);

        block.add_component("MC1", ComponentType::Canal);
        assert_eq!(block.distribution_canal.as_deref(), Some("MC1"));

        // a second canal does not displace the anchor
        block.add_component("MC2", ComponentType::Canal);
        assert_eq!(block.distribution_canal.as_deref(), Some("MC1"));
    }

    #[test]
    fn test_remove_component_clears_anchor() {
        let mut block = Block::new("B1");
        block.add_component("MC1", ComponentType::Canal);
        assert!(block.remove_component("MC1"));
        assert_eq!(block.distribution_canal, None);
        assert!(!block.remove_component("MC1"));
    }

    #[test]
    fn test_joint_split_by_kind() {
        let mut block = Block::new("B1");
        block.add_joint(Joint::new(
            "J1",
            JointType::Internal,
            vec!["MC1".into()],
            vec!["ZT1".into()],
        ));
        block.add_joint(Joint::new(
            "J2",
            JointType::Confluence,
            vec!["F9".into()],
            vec!["MC1".into()],
        ));

        assert_eq!(block.internal_joints().count(), 1);
        assert_eq!(block.confluence_joints().count(), 1);
        assert!(block.has_confluences());

        let removed = block.remove_joint("J2").unwrap();
        assert!(removed.is_confluence());
        assert!(!block.has_confluences());
    }

    #[test]
    fn test_effective_level_prefers_manual_order() {
        let mut block = Block::new("B1");
        assert_eq!(block.effective_level(), None);
        block.level = Some(2);
        assert_eq!(block.effective_level(), Some(2));
        block.manual_order = Some(5);
        assert_eq!(block.effective_level(), Some(5));
    }
}
