//! Block partitioning and confluence detection
//!
//! A block is a sub-basin of the network rooted at one distribution canal.
//! The assembler partitions components into non-overlapping blocks, records
//! joints where water passes between components (internal within a block,
//! confluence across block boundaries), and computes a per-block hierarchy
//! level blending manual overrides with propagation through confluences and
//! the block parent/child tree.

pub mod assembler;
pub mod block;

pub use assembler::BlockAssembler;
pub use block::{Block, Joint};
