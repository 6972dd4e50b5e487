//! Validation engine for irrigation networks.
//!
//! The engine runs all registered [`NetworkRule`]s against a network and
//! its block partition and collects every finding into a
//! [`ValidationReport`] — it never short-circuits on the first error, so
//! callers see all problems at once. Findings are plain data: structural
//! problems are reported, never raised, and the engine returns best-effort
//! results even on degraded (cyclic) input.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use hydronet::validation::ValidationEngine;
//!
//! let engine = ValidationEngine::with_defaults();
//! let report = engine.validate(&network, &assembler);
//! if report.has_errors() {
//!     for err in report.errors() {
//!         eprintln!("{err}");
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::BlockAssembler;
use crate::network::Network;
use crate::strahler::StrahlerAnalyzer;
use crate::types::ComponentType;

// ─── Finding codes ──────────────────────────────────────────────────────────

/// Stable codes for programmatic matching of findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    Disconnected,
    NoSourceNodes,
    NoSinkNodes,
    CycleDetected,
    StaleOrder,
    InvalidHierarchyEdge,
    ForbiddenConnection,
    CardinalityViolation,
    TypeMismatch,
    UnreachableField,
    NoControlPoint,
    MissingDistributionCanal,
    InconsistentAssignment,
    InconsistentTree,
    NoFields,
    MissingLevel,
    InvalidBlockHierarchy,
}

impl FindingCode {
    /// Stable snake_case name, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCode::Disconnected => "disconnected",
            FindingCode::NoSourceNodes => "no_source_nodes",
            FindingCode::NoSinkNodes => "no_sink_nodes",
            FindingCode::CycleDetected => "cycle_detected",
            FindingCode::StaleOrder => "stale_order",
            FindingCode::InvalidHierarchyEdge => "invalid_hierarchy_edge",
            FindingCode::ForbiddenConnection => "forbidden_connection",
            FindingCode::CardinalityViolation => "cardinality_violation",
            FindingCode::TypeMismatch => "type_mismatch",
            FindingCode::UnreachableField => "unreachable_field",
            FindingCode::NoControlPoint => "no_control_point",
            FindingCode::MissingDistributionCanal => "missing_distribution_canal",
            FindingCode::InconsistentAssignment => "inconsistent_assignment",
            FindingCode::InconsistentTree => "inconsistent_tree",
            FindingCode::NoFields => "no_fields",
            FindingCode::MissingLevel => "missing_level",
            FindingCode::InvalidBlockHierarchy => "invalid_block_hierarchy",
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Finding ────────────────────────────────────────────────────────────────

/// A single validation finding.
///
/// # Display format
///
/// ```text
/// [cardinality_violation] SW3: smart water meter should have exactly one input
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {subject}: {message}")]
pub struct Finding {
    /// Stable code for programmatic matching.
    pub code: FindingCode,

    /// The component, edge, or block the finding is about.
    pub subject: String,

    /// Human-readable description of the problem.
    pub message: String,

    /// Optional suggestion for how to fix the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Finding {
    /// Create a new finding.
    pub fn new(code: FindingCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            subject: subject.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a hint suggesting how to fix the problem.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ─── Severity ───────────────────────────────────────────────────────────────

/// Whether a finding blocks further action or is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

// ─── Diagnostic ─────────────────────────────────────────────────────────────

/// A [`Finding`] tagged with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub finding: Finding,
}

impl ValidationDiagnostic {
    pub fn error(finding: Finding) -> Self {
        Self {
            severity: Severity::Error,
            finding,
        }
    }

    pub fn warning(finding: Finding) -> Self {
        Self {
            severity: Severity::Warning,
            finding,
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Collected findings from running all validation rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    /// Iterate over error-severity findings.
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.finding)
    }

    /// Iterate over warning-severity findings.
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.finding)
    }

    /// Returns `true` if any finding is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` if there are no errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Total number of findings (errors + warnings).
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns `true` if there are no findings at all.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Check whether any finding carries the given code.
    pub fn has_code(&self, code: FindingCode) -> bool {
        self.diagnostics.iter().any(|d| d.finding.code == code)
    }
}

// ─── Rule trait ─────────────────────────────────────────────────────────────

/// Everything a rule may inspect: the graph and the block partition.
pub struct ValidationContext<'a> {
    pub network: &'a Network,
    pub assembler: &'a BlockAssembler,
}

/// A single validation rule.
///
/// Rules are stateless and must be `Send + Sync` so a long-lived engine
/// can be shared across threads.
pub trait NetworkRule: Send + Sync {
    /// Short, stable identifier for this rule (e.g., `"topology"`).
    fn name(&self) -> &str;

    /// Inspect the context and return any findings.
    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic>;
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs a set of [`NetworkRule`]s and collects all findings.
pub struct ValidationEngine {
    rules: Vec<Box<dyn NetworkRule>>,
}

impl ValidationEngine {
    /// Create an empty engine with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create an engine pre-loaded with the default rule set.
    ///
    /// Topology runs first: the cycle check is the authoritative signal,
    /// and later checks may be unreliable on a cyclic graph. Every rule
    /// still runs unconditionally.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(TopologyRule));
        engine.add_rule(Box::new(HierarchyRule));
        engine.add_rule(Box::new(ConnectionTypeRule));
        engine.add_rule(Box::new(CardinalityRule));
        engine.add_rule(Box::new(TypeMismatchRule));
        engine.add_rule(Box::new(FieldReachabilityRule));
        engine.add_rule(Box::new(BlockStructureRule));
        engine.add_rule(Box::new(BlockHierarchyRule));
        engine
    }

    /// Register an additional rule.
    pub fn add_rule(&mut self, rule: Box<dyn NetworkRule>) {
        self.rules.push(rule);
    }

    /// Run all rules and return the collected report.
    pub fn validate(&self, network: &Network, assembler: &BlockAssembler) -> ValidationReport {
        let ctx = ValidationContext { network, assembler };
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            report.diagnostics.extend(rule.validate(&ctx));
        }
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Concrete rules
// ═══════════════════════════════════════════════════════════════════════════

// ─── 1. Topology: connectivity, sources/sinks, cycles ───────────────────────

struct TopologyRule;

impl NetworkRule for TopologyRule {
    fn name(&self) -> &str {
        "topology"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let net = ctx.network;
        let mut out = Vec::new();

        if let Some(member) = net.has_cycle() {
            out.push(ValidationDiagnostic::error(
                Finding::new(
                    FindingCode::CycleDetected,
                    &member,
                    format!("cycle detected involving component {member}"),
                )
                .with_hint("Remove the back edge; the network must be acyclic"),
            ));
        }

        for component in net.iter() {
            if component.is_disconnected() {
                out.push(ValidationDiagnostic::error(Finding::new(
                    FindingCode::Disconnected,
                    &component.id,
                    format!("component {} is disconnected from the network", component.id),
                )));
            }
        }

        if !net.is_empty() {
            if net.source_nodes().is_empty() {
                out.push(ValidationDiagnostic::error(Finding::new(
                    FindingCode::NoSourceNodes,
                    "network",
                    "network has no source nodes",
                )));
            }
            if net.sink_nodes().is_empty() {
                out.push(ValidationDiagnostic::error(Finding::new(
                    FindingCode::NoSinkNodes,
                    "network",
                    "network has no sink nodes",
                )));
            }
        }

        out
    }
}

// ─── 2. Hierarchy: stored orders vs fresh Strahler, edge monotonicity ───────

struct HierarchyRule;

impl NetworkRule for HierarchyRule {
    fn name(&self) -> &str {
        "hierarchy"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let net = ctx.network;
        let mut analyzer = StrahlerAnalyzer::new();
        analyzer.analyze(net);
        let mut out = Vec::new();

        for component in net.iter() {
            let fresh = analyzer.order(&component.id);
            if component.order != fresh {
                let stored = match component.order {
                    Some(order) => order.to_string(),
                    None => "unset".to_string(),
                };
                let expected = match fresh {
                    Some(order) => order.to_string(),
                    None => "unset".to_string(),
                };
                out.push(ValidationDiagnostic::error(
                    Finding::new(
                        FindingCode::StaleOrder,
                        &component.id,
                        format!(
                            "stored order {stored} does not match recomputed Strahler order {expected}"
                        ),
                    )
                    .with_hint("Re-run the Strahler analysis after structural edits"),
                ));
            }
        }

        for component in net.iter() {
            let source_order = analyzer.order(&component.id);
            for target in &component.outgoing {
                let target_order = analyzer.order(target);
                if let (Some(s), Some(t)) = (source_order, target_order) {
                    if t <= s {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::InvalidHierarchyEdge,
                            format!("{} -> {}", component.id, target),
                            format!(
                                "invalid hierarchy: {} (order {s}) connects to {} (order {t})",
                                component.id, target
                            ),
                        )));
                    }
                }
            }
        }

        out
    }
}

// ─── 3. Connection-type matrix ──────────────────────────────────────────────

/// The allowed target types per source type.
fn allowed_targets(source: ComponentType) -> Option<&'static [ComponentType]> {
    match source {
        ComponentType::Canal => Some(&[
            ComponentType::DistributionPoint,
            ComponentType::SmartWater,
            ComponentType::Gate,
        ]),
        ComponentType::DistributionPoint => Some(&[
            ComponentType::Canal,
            ComponentType::SmartWater,
            ComponentType::Gate,
            ComponentType::Field,
        ]),
        ComponentType::SmartWater => Some(&[ComponentType::Field]),
        ComponentType::Gate => Some(&[ComponentType::Field]),
        ComponentType::Field => Some(&[]),
        ComponentType::Unknown => None,
    }
}

struct ConnectionTypeRule;

impl NetworkRule for ConnectionTypeRule {
    fn name(&self) -> &str {
        "connection_types"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let net = ctx.network;
        let mut out = Vec::new();

        for component in net.iter() {
            let Some(allowed) = allowed_targets(component.component_type) else {
                continue;
            };
            for target in &component.outgoing {
                let target_type = match net.get(target) {
                    Some(t) => t.component_type,
                    None => continue,
                };
                if !allowed.contains(&target_type) {
                    out.push(ValidationDiagnostic::error(Finding::new(
                        FindingCode::ForbiddenConnection,
                        format!("{} -> {}", component.id, target),
                        format!(
                            "invalid connection: {} ({}) to {} ({})",
                            component.id, component.component_type, target, target_type
                        ),
                    )));
                }
            }
        }

        out
    }
}

// ─── 4. Cardinality rules by type ───────────────────────────────────────────

struct CardinalityRule;

impl NetworkRule for CardinalityRule {
    fn name(&self) -> &str {
        "cardinality"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let net = ctx.network;
        let mut out = Vec::new();

        for component in net.iter() {
            let id = &component.id;
            let ins = component.incoming.len();
            let outs = component.outgoing.len();
            match component.component_type {
                ComponentType::SmartWater => {
                    if ins != 1 {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::CardinalityViolation,
                            id,
                            format!("smart water meter {id} should have exactly one input"),
                        )));
                    }
                    if outs != 1 {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::CardinalityViolation,
                            id,
                            format!("smart water meter {id} should have exactly one output"),
                        )));
                    }
                }
                ComponentType::Gate => {
                    if ins != 1 {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::CardinalityViolation,
                            id,
                            format!("gate {id} should have exactly one input"),
                        )));
                    }
                }
                ComponentType::Field => {
                    if ins != 1 {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::CardinalityViolation,
                            id,
                            format!("field {id} should have exactly one input"),
                        )));
                    }
                    if outs != 0 {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::CardinalityViolation,
                            id,
                            format!("field {id} should not have any outputs"),
                        )));
                    }
                }
                _ => {}
            }
        }

        out
    }
}

// ─── 5. Id/type cross-check ─────────────────────────────────────────────────

struct TypeMismatchRule;

impl NetworkRule for TypeMismatchRule {
    fn name(&self) -> &str {
        "type_mismatch"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let mut out = Vec::new();
        for component in ctx.network.iter() {
            let canonical = ComponentType::from_id(&component.id);
            if component.component_type != canonical {
                out.push(ValidationDiagnostic::error(
                    Finding::new(
                        FindingCode::TypeMismatch,
                        &component.id,
                        format!(
                            "component {} has type {}, expected {} from its id prefix",
                            component.id, component.component_type, canonical
                        ),
                    )
                    .with_hint("Rename the component or fix the prefix policy"),
                ));
            }
        }
        out
    }
}

// ─── 6. Field reachability and control coverage ─────────────────────────────

struct FieldReachabilityRule;

impl NetworkRule for FieldReachabilityRule {
    fn name(&self) -> &str {
        "field_reachability"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let net = ctx.network;
        let sources: Vec<String> = net
            .source_nodes()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut out = Vec::new();

        for component in net.iter() {
            if component.component_type != ComponentType::Field {
                continue;
            }
            let field_id = &component.id;

            let mut reachable = false;
            let mut controlled = false;
            'sources: for source in &sources {
                for path in net.all_paths(source, Some(field_id)) {
                    reachable = true;
                    let has_control = path
                        .iter()
                        .any(|id| net.get(id).map_or(false, |c| c.component_type.is_control()));
                    if has_control {
                        controlled = true;
                        break 'sources;
                    }
                }
            }

            if !reachable {
                out.push(ValidationDiagnostic::error(Finding::new(
                    FindingCode::UnreachableField,
                    field_id,
                    format!("no path from any source reaches field {field_id}"),
                )));
            } else if !controlled {
                out.push(ValidationDiagnostic::warning(
                    Finding::new(
                        FindingCode::NoControlPoint,
                        field_id,
                        format!(
                            "field {field_id} has no control point (smart water or gate) in its irrigation path"
                        ),
                    )
                    .with_hint("Route the field through a gate or smart water meter"),
                ));
            }
        }

        out
    }
}

// ─── 7. Block structure ─────────────────────────────────────────────────────

struct BlockStructureRule;

impl NetworkRule for BlockStructureRule {
    fn name(&self) -> &str {
        "block_structure"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let net = ctx.network;
        let asm = ctx.assembler;
        let mut out = Vec::new();

        for block in asm.blocks() {
            if block.distribution_canal.is_none() {
                out.push(ValidationDiagnostic::error(Finding::new(
                    FindingCode::MissingDistributionCanal,
                    &block.id,
                    format!("block {} has no distribution canal", block.id),
                )));
            }

            for component_id in &block.components {
                if !net.contains(component_id) {
                    out.push(ValidationDiagnostic::error(Finding::new(
                        FindingCode::InconsistentAssignment,
                        &block.id,
                        format!(
                            "block {} references non-existent component {component_id}",
                            block.id
                        ),
                    )));
                } else if asm.component_block(component_id) != Some(block.id.as_str()) {
                    out.push(ValidationDiagnostic::error(Finding::new(
                        FindingCode::InconsistentAssignment,
                        component_id,
                        format!("component {component_id} has inconsistent block assignment"),
                    )));
                }
            }

            if let Some(parent_id) = &block.parent {
                match asm.block(parent_id) {
                    None => out.push(ValidationDiagnostic::error(Finding::new(
                        FindingCode::InconsistentTree,
                        &block.id,
                        format!("block {} references non-existent parent {parent_id}", block.id),
                    ))),
                    Some(parent) if !parent.children.contains(&block.id) => {
                        out.push(ValidationDiagnostic::error(Finding::new(
                            FindingCode::InconsistentTree,
                            &block.id,
                            format!(
                                "inconsistent parent-child relationship between {parent_id} and {}",
                                block.id
                            ),
                        )))
                    }
                    _ => {}
                }
            }
            for child_id in &block.children {
                if asm.block(child_id).is_none() {
                    out.push(ValidationDiagnostic::error(Finding::new(
                        FindingCode::InconsistentTree,
                        &block.id,
                        format!("block {} references non-existent child {child_id}", block.id),
                    )));
                }
            }

            let owns_field = block.components.iter().any(|id| {
                net.get(id)
                    .map_or(false, |c| c.component_type == ComponentType::Field)
            });
            if !owns_field {
                out.push(ValidationDiagnostic::warning(Finding::new(
                    FindingCode::NoFields,
                    &block.id,
                    format!("block {} has no fields", block.id),
                )));
            }
        }

        out
    }
}

// ─── 8. Block hierarchy levels ──────────────────────────────────────────────

struct BlockHierarchyRule;

impl NetworkRule for BlockHierarchyRule {
    fn name(&self) -> &str {
        "block_hierarchy"
    }

    fn validate(&self, ctx: &ValidationContext) -> Vec<ValidationDiagnostic> {
        let asm = ctx.assembler;
        let mut out = Vec::new();

        for block in asm.blocks() {
            let Some(level) = block.effective_level() else {
                out.push(ValidationDiagnostic::error(
                    Finding::new(
                        FindingCode::MissingLevel,
                        &block.id,
                        format!("block {} has no computed hierarchy level", block.id),
                    )
                    .with_hint("Run the hierarchy computation after assembling blocks"),
                ));
                continue;
            };

            // every distinct upstream block feeding a confluence must sit
            // strictly below this block
            let mut seen: Vec<&str> = Vec::new();
            for joint in block.confluence_joints() {
                for source in &joint.upstream {
                    let Some(up_id) = asm.component_block(source) else {
                        continue;
                    };
                    if up_id == block.id || seen.contains(&up_id) {
                        continue;
                    }
                    seen.push(up_id);
                    if let Some(up_level) =
                        asm.block(up_id).and_then(|b| b.effective_level())
                    {
                        if up_level >= level {
                            out.push(ValidationDiagnostic::error(Finding::new(
                                FindingCode::InvalidBlockHierarchy,
                                &block.id,
                                format!(
                                    "invalid hierarchy: block {up_id} (level {up_level}) feeds into block {} (level {level})",
                                    block.id
                                ),
                            )));
                        }
                    }
                }
            }
        }

        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════
