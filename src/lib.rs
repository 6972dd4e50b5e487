//! # hydronet
//!
//! An in-memory irrigation network hierarchy and validation engine.
//!
//! The crate models a directed irrigation distribution network (canals,
//! distribution points, gates, smart water meters, fields) as a graph,
//! derives a Strahler-style hierarchy order per component, partitions the
//! network into sub-basin blocks joined by confluences, and validates the
//! whole structure against domain rules.
//!
//! ## Features
//!
//! - **Typed components**: component kinds derived from a fixed id-prefix
//!   table, with an explicit policy for unknown prefixes
//! - **Strahler ordering**: memoized, stack-driven order computation that
//!   survives (but flags) cyclic input
//! - **Block assembly**: sub-basin detection per root canal, internal and
//!   cross-block confluence joints, manual-override-aware hierarchy levels
//! - **Rule-based validation**: a pluggable engine that runs every check
//!   and reports errors and warnings without short-circuiting
//!
//! ## Quick start
//!
//! ```rust
//! use hydronet::{Network, NetworkAnalyzer};
//!
//! let mut net = Network::from_definitions(
//!     &[("MC1", "Main canal"), ("ZT1", "Gate"), ("F1", "Field")],
//!     &[("MC1", "ZT1"), ("ZT1", "F1")],
//! ).unwrap();
//!
//! let mut analyzer = NetworkAnalyzer::new();
//! analyzer.run(&mut net).unwrap();
//!
//! assert_eq!(net.get("F1").unwrap().order, Some(1));
//! ```

pub mod analyzer;
pub mod blocks;
pub mod errors;
pub mod network;
pub mod strahler;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use analyzer::{AnalysisStep, NetworkAnalyzer};
pub use blocks::{Block, BlockAssembler, Joint};
pub use errors::{NetworkError, Result};
pub use network::{Component, ComponentDetail, Network};
pub use strahler::StrahlerAnalyzer;
pub use types::{ComponentType, JointType, PrefixPolicy};
pub use validation::{
    Finding, FindingCode, NetworkRule, Severity, ValidationContext, ValidationDiagnostic,
    ValidationEngine, ValidationReport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
