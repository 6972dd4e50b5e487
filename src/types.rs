//! Core types for hydronet
//!
//! This module defines the closed component and joint type enums, and the
//! id-prefix table that derives a component's type from its id.

use serde::{Deserialize, Serialize};

// ============================================================================
// Component types
// ============================================================================

/// The kind of a network component, derived from its id prefix.
///
/// The prefix table is fixed: `MC` → canal, `DP` → distribution point,
/// `ZT` → gate, `SW` → smart water meter, `F` → field. Anything else maps
/// to [`ComponentType::Unknown`] under the default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Canal,
    DistributionPoint,
    Gate,
    SmartWater,
    Field,
    Unknown,
}

impl ComponentType {
    /// Derive the type from a component id using the default (strict) policy.
    pub fn from_id(id: &str) -> Self {
        Self::from_id_with_policy(id, PrefixPolicy::Strict)
    }

    /// Derive the type from a component id under an explicit prefix policy.
    ///
    /// The prefix is the leading run of ASCII alphabetic characters, matched
    /// exactly against the table ("F1_2" → `F` → field, "MC1" → `MC` → canal).
    pub fn from_id_with_policy(id: &str, policy: PrefixPolicy) -> Self {
        let prefix: String = id.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        match prefix.as_str() {
            "MC" => ComponentType::Canal,
            "DP" => ComponentType::DistributionPoint,
            "ZT" => ComponentType::Gate,
            "SW" => ComponentType::SmartWater,
            "F" => ComponentType::Field,
            _ => match policy {
                PrefixPolicy::Strict => ComponentType::Unknown,
                PrefixPolicy::LegacyCanal => ComponentType::Canal,
            },
        }
    }

    /// Check if this type is a flow control device (gate or smart meter)
    pub fn is_control(&self) -> bool {
        matches!(self, ComponentType::Gate | ComponentType::SmartWater)
    }

    /// Check if this type is a canal
    pub fn is_canal(&self) -> bool {
        matches!(self, ComponentType::Canal)
    }

    /// Stable snake_case name, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Canal => "canal",
            ComponentType::DistributionPoint => "distribution_point",
            ComponentType::Gate => "gate",
            ComponentType::SmartWater => "smart_water",
            ComponentType::Field => "field",
            ComponentType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Prefix policy
// ============================================================================

/// How unrecognized id prefixes are typed.
///
/// A legacy model variant silently defaulted unrecognized prefixes to
/// `canal`; the canonical behavior falls back to `unknown`. Both are kept
/// as an explicit choice rather than guessing which was intended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixPolicy {
    /// Unrecognized prefixes map to [`ComponentType::Unknown`]
    #[default]
    Strict,
    /// Unrecognized prefixes map to [`ComponentType::Canal`] (legacy behavior)
    LegacyCanal,
}

// ============================================================================
// Joint types
// ============================================================================

/// The kind of a joint between components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    /// Connection within one block
    Internal,
    /// Connection crossing a block boundary
    Confluence,
}

impl std::fmt::Display for JointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointType::Internal => f.write_str("internal"),
            JointType::Confluence => f.write_str("confluence"),
        }
    }
}
