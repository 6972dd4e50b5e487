//! Block detection, confluence detection, and hierarchy computation

use crate::blocks::block::{Block, Joint};
use crate::errors::{NetworkError, Result};
use crate::network::Network;
use crate::types::{ComponentType, JointType};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Partitions the network into blocks and maintains the block hierarchy.
///
/// Owns the blocks, the component→block map, and the monotonic id
/// generators for blocks and joints. Component ownership is exclusive:
/// assigning a component to a block detaches it from any previous owner.
#[derive(Debug, Default)]
pub struct BlockAssembler {
    blocks: FxHashMap<String, Block>,
    block_ids: Vec<String>,
    component_to_block: FxHashMap<String, String>,
    next_block_id: u64,
    next_joint_id: u64,
}

impl BlockAssembler {
    /// Create an assembler with no blocks
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Block lifecycle ────────────────────────────────────────────────

    /// Create a new block with a generated id, returning the id
    pub fn create_block(&mut self, manual_order: Option<u32>) -> String {
        self.next_block_id += 1;
        let id = format!("B{}", self.next_block_id);
        let mut block = Block::new(&id);
        block.manual_order = manual_order;
        self.blocks.insert(id.clone(), block);
        self.block_ids.push(id.clone());
        id
    }

    /// Create a block under an explicit id; fails on a duplicate id
    pub fn create_block_with_id(&mut self, id: &str, manual_order: Option<u32>) -> Result<()> {
        if self.blocks.contains_key(id) {
            return Err(NetworkError::duplicate_id(id));
        }
        let mut block = Block::new(id);
        block.manual_order = manual_order;
        self.blocks.insert(id.to_string(), block);
        self.block_ids.push(id.to_string());
        Ok(())
    }

    /// Delete a block: detaches it from its parent, orphans its children,
    /// and releases its components back to unassigned. Children and
    /// components themselves are kept, not cascade-deleted.
    pub fn delete_block(&mut self, net: &mut Network, block_id: &str) -> bool {
        let Some(block) = self.blocks.remove(block_id) else {
            return false;
        };
        self.block_ids.retain(|id| id != block_id);

        if let Some(parent_id) = &block.parent {
            if let Some(parent) = self.blocks.get_mut(parent_id) {
                parent.children.remove(block_id);
            }
        }
        for child_id in &block.children {
            if let Some(child) = self.blocks.get_mut(child_id) {
                child.parent = None;
            }
        }
        for component_id in &block.components {
            self.component_to_block.remove(component_id);
            if let Some(component) = net.get_mut(component_id) {
                component.block_id = None;
            }
        }
        true
    }

    // ─── Assignment ─────────────────────────────────────────────────────

    /// Assign a component to a block, detaching it from any prior owner.
    pub fn assign_component(
        &mut self,
        net: &mut Network,
        component_id: &str,
        block_id: &str,
    ) -> Result<()> {
        let component_type = match net.get(component_id) {
            Some(c) => c.component_type,
            None => return Err(NetworkError::unknown_component(component_id)),
        };
        if !self.blocks.contains_key(block_id) {
            return Err(NetworkError::unknown_block(block_id));
        }

        if let Some(old_block_id) = self.component_to_block.get(component_id).cloned() {
            if old_block_id != block_id {
                if let Some(old_block) = self.blocks.get_mut(&old_block_id) {
                    old_block.remove_component(component_id);
                }
            }
        }

        if let Some(block) = self.blocks.get_mut(block_id) {
            block.add_component(component_id, component_type);
        }
        self.component_to_block
            .insert(component_id.to_string(), block_id.to_string());
        if let Some(component) = net.get_mut(component_id) {
            component.block_id = Some(block_id.to_string());
        }
        Ok(())
    }

    /// Set a block's manual order override
    pub fn set_block_manual_order(&mut self, block_id: &str, order: u32) -> Result<()> {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.manual_order = Some(order);
                Ok(())
            }
            None => Err(NetworkError::unknown_block(block_id)),
        }
    }

    /// Create a joint attached to a block, returning the joint id
    pub fn create_joint(
        &mut self,
        block_id: &str,
        joint_type: JointType,
        upstream: Vec<String>,
        downstream: Vec<String>,
    ) -> Result<String> {
        if !self.blocks.contains_key(block_id) {
            return Err(NetworkError::unknown_block(block_id));
        }
        self.next_joint_id += 1;
        let id = format!("J{}", self.next_joint_id);
        let joint = Joint::new(&id, joint_type, upstream, downstream);
        if let Some(block) = self.blocks.get_mut(block_id) {
            block.add_joint(joint);
        }
        Ok(id)
    }

    // ─── Detection ──────────────────────────────────────────────────────

    /// Partition the network into blocks, one per root canal.
    ///
    /// Each canal-typed source seeds a block. The walk absorbs the canal's
    /// directly connected control devices (gates and smart meters), then
    /// the fields fed by the canal or by an absorbed device — a field only
    /// if every one of its inbound edges comes from inside the block. An
    /// internal joint is recorded per absorption. Canal- and
    /// distribution-point-typed children are boundaries into the trunk
    /// network between sub-basins and stay unassigned here.
    ///
    /// Components already owned by a block are left where they are, and a
    /// seed canal that already owns a block walks again from that block,
    /// so the pass is safe to re-run after structural edits.
    pub fn detect_blocks(&mut self, net: &mut Network) -> Result<()> {
        let seeds: Vec<String> = net
            .iter()
            .filter(|c| c.component_type.is_canal() && c.is_source())
            .map(|c| c.id.clone())
            .collect();

        for seed in seeds {
            let block_id = match self.component_to_block.get(&seed).cloned() {
                Some(existing) => existing,
                None => {
                    let id = self.create_block(None);
                    self.assign_component(net, &seed, &id)?;
                    id
                }
            };

            let mut devices: Vec<String> = Vec::new();
            for child in net.children(&seed).to_vec() {
                let child_type = self.component_type_of(net, &child);
                if let Some(owner) = self.component_to_block.get(&child) {
                    // already-absorbed devices still continue the walk so
                    // their newly added fields are picked up on a re-run
                    if owner == &block_id && child_type.is_control() {
                        devices.push(child);
                    }
                    continue;
                }
                match child_type {
                    ComponentType::Gate | ComponentType::SmartWater => {
                        self.assign_component(net, &child, &block_id)?;
                        self.create_joint(
                            &block_id,
                            JointType::Internal,
                            vec![seed.clone()],
                            vec![child.clone()],
                        )?;
                        devices.push(child);
                    }
                    ComponentType::Field => {
                        self.try_absorb_field(net, &block_id, &seed, &child)?;
                    }
                    _ => {}
                }
            }

            for device in devices {
                for child in net.children(&device).to_vec() {
                    if self.component_to_block.contains_key(&child) {
                        continue;
                    }
                    if self.component_type_of(net, &child) == ComponentType::Field {
                        self.try_absorb_field(net, &block_id, &device, &child)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Absorb a field into a block when every inbound edge is in-block.
    fn try_absorb_field(
        &mut self,
        net: &mut Network,
        block_id: &str,
        upstream: &str,
        field_id: &str,
    ) -> Result<()> {
        let all_inside = net.parents(field_id).iter().all(|p| {
            self.component_to_block
                .get(p)
                .map_or(false, |b| b == block_id)
        });
        if all_inside {
            self.assign_component(net, field_id, block_id)?;
            self.create_joint(
                block_id,
                JointType::Internal,
                vec![upstream.to_string()],
                vec![field_id.to_string()],
            )?;
        }
        Ok(())
    }

    /// Detect cross-block confluences.
    ///
    /// For every block-owned component with more than one incoming edge,
    /// all upstream sources living in a different block are grouped into
    /// one confluence joint attached to the receiving block. Previously
    /// detected confluence joints are dropped first, so the pass is a
    /// fresh recompute.
    pub fn detect_confluences(&mut self, net: &Network) -> Result<()> {
        for block in self.blocks.values_mut() {
            let stale: Vec<String> = block
                .confluence_joints()
                .map(|j| j.id.clone())
                .collect();
            for joint_id in stale {
                block.remove_joint(&joint_id);
            }
        }

        let mut detected: Vec<(String, Vec<String>, String)> = Vec::new();
        for component in net.iter() {
            if component.incoming.len() < 2 {
                continue;
            }
            let Some(block_id) = self.component_to_block.get(&component.id) else {
                continue;
            };
            let external: Vec<String> = component
                .incoming
                .iter()
                .filter(|source| {
                    self.component_to_block
                        .get(*source)
                        .map_or(false, |b| b != block_id)
                })
                .cloned()
                .collect();
            if !external.is_empty() {
                detected.push((block_id.clone(), external, component.id.clone()));
            }
        }

        for (block_id, upstream, downstream) in detected {
            self.create_joint(
                &block_id,
                JointType::Confluence,
                upstream,
                vec![downstream],
            )?;
        }
        Ok(())
    }

    // ─── Hierarchy ──────────────────────────────────────────────────────

    /// Recompute every block's hierarchy level.
    ///
    /// Manual orders become levels directly. Field-owning blocks without
    /// a manual order seed at level 1. Blocks receiving confluences take
    /// `max(effective upstream level) + 1`, propagated to a fixpoint as
    /// upstream levels settle. Anything still unset is resolved from the
    /// block tree: `max(child levels) + 1`, post-order, which terminates
    /// because each block has at most one parent.
    pub fn compute_hierarchy(&mut self, net: &Network) {
        for block in self.blocks.values_mut() {
            block.level = block.manual_order;
        }

        let block_ids = self.block_ids.clone();
        for block_id in &block_ids {
            let owns_field = self
                .blocks
                .get(block_id)
                .map_or(false, |b| b.manual_order.is_none() && self.owns_field(net, b));
            if owns_field {
                if let Some(block) = self.blocks.get_mut(block_id) {
                    block.level = Some(1);
                }
            }
        }

        // confluence propagation, bounded by the block count
        let mut changed = true;
        let mut rounds = 0;
        while changed && rounds <= block_ids.len() {
            changed = false;
            rounds += 1;
            for block_id in &block_ids {
                let candidate = {
                    let Some(block) = self.blocks.get(block_id) else {
                        continue;
                    };
                    if block.manual_order.is_some() {
                        continue;
                    }
                    self.upstream_confluence_level(block).map(|m| m + 1)
                };
                let Some(candidate) = candidate else { continue };
                if let Some(block) = self.blocks.get_mut(block_id) {
                    if block.level.map_or(true, |l| candidate > l) {
                        block.level = Some(candidate);
                        changed = true;
                    }
                }
            }
        }

        let roots: Vec<String> = block_ids
            .iter()
            .filter(|id| self.blocks.get(*id).map_or(false, |b| b.parent.is_none()))
            .cloned()
            .collect();
        for root in roots {
            self.resolve_tree_levels(&root, false);
        }

        // joints inherit the level of the block they sit in
        for block in self.blocks.values_mut() {
            if let Some(level) = block.effective_level() {
                for joint in block.joints.values_mut() {
                    joint.level = Some(level);
                }
            }
        }
    }

    /// Maximum effective level among distinct blocks feeding this block's
    /// confluence joints, excluding the block itself.
    fn upstream_confluence_level(&self, block: &Block) -> Option<u32> {
        let mut upstream_blocks: FxHashSet<&String> = FxHashSet::default();
        for joint in block.confluence_joints() {
            for source in &joint.upstream {
                if let Some(up_block) = self.component_to_block.get(source) {
                    if up_block != &block.id {
                        upstream_blocks.insert(up_block);
                    }
                }
            }
        }
        upstream_blocks
            .into_iter()
            .filter_map(|id| self.blocks.get(id).and_then(|b| b.effective_level()))
            .max()
    }

    fn component_type_of(&self, net: &Network, id: &str) -> ComponentType {
        net.get(id)
            .map_or(ComponentType::Unknown, |c| c.component_type)
    }

    fn owns_field(&self, net: &Network, block: &Block) -> bool {
        block.components.iter().any(|id| {
            net.get(id)
                .map_or(false, |c| c.component_type == ComponentType::Field)
        })
    }

    /// Post-order level resolution over one tree of blocks.
    ///
    /// With `overwrite` false, only unset levels are filled (final pass of
    /// [`compute_hierarchy`]); with `overwrite` true, the whole subtree is
    /// recomputed from manual orders and child levels (scoped recompute
    /// after a relationship edit).
    fn resolve_tree_levels(&mut self, root: &str, overwrite: bool) {
        let mut stack: Vec<(String, usize, Vec<String>)> =
            vec![(root.to_string(), 0, self.children_of(root))];

        while let Some(frame) = stack.last_mut() {
            if frame.1 < frame.2.len() {
                let child = frame.2[frame.1].clone();
                frame.1 += 1;
                let grandchildren = self.children_of(&child);
                stack.push((child, 0, grandchildren));
            } else {
                let (block_id, _, children) = match stack.pop() {
                    Some(frame) => frame,
                    None => break,
                };
                let resolved = {
                    let Some(block) = self.blocks.get(&block_id) else {
                        continue;
                    };
                    if let Some(manual) = block.manual_order {
                        Some(manual)
                    } else if !overwrite && block.level.is_some() {
                        block.level
                    } else {
                        let max_child = children
                            .iter()
                            .filter_map(|c| self.blocks.get(c).and_then(|b| b.effective_level()))
                            .max();
                        Some(max_child.unwrap_or(0) + 1)
                    }
                };
                if let Some(block) = self.blocks.get_mut(&block_id) {
                    block.level = resolved;
                }
            }
        }
    }

    fn children_of(&self, block_id: &str) -> Vec<String> {
        self.blocks
            .get(block_id)
            .map(|b| b.children.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ─── Tree edits ─────────────────────────────────────────────────────

    /// Establish a parent/child relationship between two blocks.
    ///
    /// Self-parenting and any reparenting that would close a cycle are
    /// rejected; the child is detached from its previous parent first, so
    /// every block keeps at most one parent. Levels are recomputed along
    /// the affected subtree and ancestor chain.
    pub fn set_block_relationship(&mut self, parent_id: &str, child_id: &str) -> Result<()> {
        if parent_id == child_id {
            return Err(NetworkError::self_reference(child_id));
        }
        if !self.blocks.contains_key(parent_id) {
            return Err(NetworkError::unknown_block(parent_id));
        }
        if !self.blocks.contains_key(child_id) {
            return Err(NetworkError::unknown_block(child_id));
        }

        // the child must not already be an ancestor of the parent
        let mut cursor = self.parent_of(parent_id);
        while let Some(ancestor) = cursor {
            if ancestor == child_id {
                return Err(NetworkError::self_reference(child_id));
            }
            cursor = self.parent_of(&ancestor);
        }

        if let Some(old_parent_id) = self.parent_of(child_id) {
            if let Some(old_parent) = self.blocks.get_mut(&old_parent_id) {
                old_parent.children.remove(child_id);
            }
        }
        if let Some(parent) = self.blocks.get_mut(parent_id) {
            parent.children.insert(child_id.to_string());
        }
        if let Some(child) = self.blocks.get_mut(child_id) {
            child.parent = Some(parent_id.to_string());
        }

        self.recalculate_chain(child_id);
        Ok(())
    }

    fn parent_of(&self, block_id: &str) -> Option<String> {
        self.blocks.get(block_id).and_then(|b| b.parent.clone())
    }

    /// Recompute levels for a block's subtree, then up its ancestor chain.
    fn recalculate_chain(&mut self, block_id: &str) {
        self.resolve_tree_levels(block_id, true);
        let mut cursor = self.parent_of(block_id);
        while let Some(ancestor_id) = cursor {
            let level = {
                let Some(block) = self.blocks.get(&ancestor_id) else {
                    break;
                };
                match block.manual_order {
                    Some(manual) => Some(manual),
                    None => {
                        let max_child = block
                            .children
                            .iter()
                            .filter_map(|c| self.blocks.get(c).and_then(|b| b.effective_level()))
                            .max();
                        Some(max_child.unwrap_or(0) + 1)
                    }
                }
            };
            if let Some(block) = self.blocks.get_mut(&ancestor_id) {
                block.level = level;
            }
            cursor = self.parent_of(&ancestor_id);
        }
    }

    // ─── Read access ────────────────────────────────────────────────────

    /// Get a block by id
    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.get(block_id)
    }

    /// Iterate blocks in creation order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.block_ids.iter().filter_map(|id| self.blocks.get(id))
    }

    /// The block owning a component, if any
    pub fn component_block(&self, component_id: &str) -> Option<&str> {
        self.component_to_block
            .get(component_id)
            .map(|s| s.as_str())
    }

    /// Blocks grouped by effective level, block ids in creation order
    pub fn block_hierarchy(&self) -> BTreeMap<u32, Vec<String>> {
        let mut hierarchy: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for block in self.blocks() {
            if let Some(level) = block.effective_level() {
                hierarchy.entry(level).or_default().push(block.id.clone());
            }
        }
        hierarchy
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.block_ids.len()
    }

    /// Check if no blocks exist
    pub fn is_empty(&self) -> bool {
        self.block_ids.is_empty()
    }
}
