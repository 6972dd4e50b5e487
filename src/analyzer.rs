//! Stepped end-to-end analysis
//!
//! [`NetworkAnalyzer`] drives the full pass sequence — census, Strahler
//! ordering, block detection, confluence detection, hierarchy computation,
//! validation — and records each stage as a titled [`AnalysisStep`] a
//! presentation layer can display. Results are never patched
//! incrementally: after any structural edit, call [`NetworkAnalyzer::run`]
//! again.

use crate::blocks::BlockAssembler;
use crate::errors::Result;
use crate::network::Network;
use crate::strahler::StrahlerAnalyzer;
use crate::types::ComponentType;
use crate::validation::{ValidationEngine, ValidationReport};
use serde::Serialize;
use std::collections::BTreeMap;

/// One recorded stage of an analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStep {
    pub number: usize,
    pub title: String,
    pub details: Vec<String>,
}

/// Runs the whole analysis pipeline over a network.
///
/// Owns the Strahler analyzer, the block assembler, and the validation
/// engine it drives; their read accessors stay available after a run.
pub struct NetworkAnalyzer {
    strahler: StrahlerAnalyzer,
    assembler: BlockAssembler,
    engine: ValidationEngine,
    steps: Vec<AnalysisStep>,
    report: Option<ValidationReport>,
}

impl Default for NetworkAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkAnalyzer {
    /// Create an analyzer with the default validation rules
    pub fn new() -> Self {
        Self {
            strahler: StrahlerAnalyzer::new(),
            assembler: BlockAssembler::new(),
            engine: ValidationEngine::with_defaults(),
            steps: Vec::new(),
            report: None,
        }
    }

    /// Run the full pass sequence, recording one step per stage.
    pub fn run(&mut self, net: &mut Network) -> Result<()> {
        self.steps.clear();

        // 1. component census, in display order
        let census = self.component_census(net);
        self.push_step("Component census", census);

        // 2. connection count
        let count = net.connection_count();
        self.push_step("Connection count", vec![format!("{count} connections")]);

        // 3. Strahler ordering
        self.strahler.analyze_and_apply(net);
        let orders = self
            .strahler
            .levels_by_order()
            .into_iter()
            .map(|(order, ids)| format!("order {order}: {}", ids.join(", ")))
            .collect();
        self.push_step("Strahler ordering", orders);

        // 4. block detection
        self.assembler.detect_blocks(net)?;
        let blocks = self
            .assembler
            .blocks()
            .map(|b| {
                let canal = b.distribution_canal.as_deref().unwrap_or("-");
                format!("{}: canal {canal}, {} components", b.id, b.components.len())
            })
            .collect();
        self.push_step("Block detection", blocks);

        // 5. confluence detection
        self.assembler.detect_confluences(net)?;
        let confluences = self
            .assembler
            .blocks()
            .flat_map(|b| {
                b.confluence_joints()
                    .map(|j| {
                        format!(
                            "{}: {} -> {} ({})",
                            j.id,
                            j.upstream.join(", "),
                            j.downstream.join(", "),
                            b.id
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        self.push_step("Confluence detection", confluences);

        // 6. hierarchy computation
        self.assembler.compute_hierarchy(net);
        let hierarchy = self
            .assembler
            .block_hierarchy()
            .into_iter()
            .map(|(level, ids)| format!("level {level}: {}", ids.join(", ")))
            .collect();
        self.push_step("Hierarchy computation", hierarchy);

        // 7. validation
        let report = self.engine.validate(net, &self.assembler);
        let summary = vec![format!(
            "{} errors, {} warnings",
            report.errors().count(),
            report.warnings().count()
        )];
        self.report = Some(report);
        self.push_step("Validation", summary);

        Ok(())
    }

    fn push_step(&mut self, title: &str, details: Vec<String>) {
        self.steps.push(AnalysisStep {
            number: self.steps.len() + 1,
            title: title.to_string(),
            details,
        });
    }

    fn component_census(&self, net: &Network) -> Vec<String> {
        let display_order = [
            ComponentType::DistributionPoint,
            ComponentType::Canal,
            ComponentType::Gate,
            ComponentType::SmartWater,
            ComponentType::Field,
            ComponentType::Unknown,
        ];
        let mut by_type: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
        for component in net.iter() {
            by_type
                .entry(component.component_type.as_str())
                .or_default()
                .push(component.id.as_str());
        }
        display_order
            .iter()
            .filter_map(|ty| {
                by_type.get(ty.as_str()).map(|ids| {
                    let mut sorted = ids.clone();
                    sorted.sort_unstable();
                    format!("{ty}: {}", sorted.join(", "))
                })
            })
            .collect()
    }

    /// The recorded steps of the last run
    pub fn steps(&self) -> &[AnalysisStep] {
        &self.steps
    }

    /// The validation report of the last run, if any
    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    /// Component ids grouped by Strahler order
    pub fn levels_by_order(&self) -> BTreeMap<u32, Vec<String>> {
        self.strahler.levels_by_order()
    }

    /// Blocks grouped by hierarchy level
    pub fn block_hierarchy(&self) -> BTreeMap<u32, Vec<String>> {
        self.assembler.block_hierarchy()
    }

    /// The block assembler, for structural edit commands
    pub fn assembler(&self) -> &BlockAssembler {
        &self.assembler
    }

    /// Mutable access to the assembler for edit commands; results are
    /// stale until the next [`run`](Self::run)
    pub fn assembler_mut(&mut self) -> &mut BlockAssembler {
        &mut self.assembler
    }

    /// The Strahler analyzer state of the last run
    pub fn strahler(&self) -> &StrahlerAnalyzer {
        &self.strahler
    }
}
