//! The analysis engine: one full rebuild of every output per run.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Name change subsystem    (segments both roles, name events)
//!   2. Ownership subsystem      (sponsor transitions per originator)
//!   3. Oscillation subsystem    (reads the segments from step 1)
//!   4. Crosswalk subsystem      (reads the oscillations from step 3)
//!   5. Id space subsystem
//!
//! RULES:
//!   - Observations are loaded once, up front. A schema error aborts
//!     the run before any subsystem executes.
//!   - Data-quality findings are output, never errors.
//!   - Outputs are recomputed from scratch; nothing is updated in place.

use crate::{
    config::AnalysisConfig,
    crosswalk_subsystem::CrosswalkSubsystem,
    error::IdentityResult,
    event::sort_events,
    id_space_subsystem::IdSpaceSubsystem,
    name_change_subsystem::NameChangeSubsystem,
    observation::{AnalysisInput, ObservationSource},
    oscillation_subsystem::OscillationSubsystem,
    ownership_subsystem::OwnershipSubsystem,
    report::AnalysisReport,
    store::IdentityStore,
    subsystem::IdentitySubsystem,
    types::RunId,
};

pub struct IdentityEngine {
    pub run_id: RunId,
    pub config: AnalysisConfig,
    subsystems: Vec<Box<dyn IdentitySubsystem>>,
}

impl IdentityEngine {
    pub fn new(run_id: RunId, config: AnalysisConfig) -> Self {
        Self {
            run_id,
            config,
            subsystems: Vec::new(),
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, config: AnalysisConfig) -> Self {
        let mode = config.oscillation_mode;
        let mut engine = IdentityEngine::new(run_id, config);

        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(Box::new(NameChangeSubsystem::new()));
        engine.register(Box::new(OwnershipSubsystem::new()));
        engine.register(Box::new(OscillationSubsystem::new(mode)));
        engine.register(Box::new(CrosswalkSubsystem::new()));
        engine.register(Box::new(IdSpaceSubsystem::new()));
        engine
    }

    /// Wired engine with a fresh run id and default config.
    pub fn build_default() -> Self {
        Self::build(new_run_id(), AnalysisConfig::default())
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, subsystem: Box<dyn IdentitySubsystem>) {
        self.subsystems.push(subsystem);
    }

    pub fn subsystem_names(&self) -> Vec<&'static str> {
        self.subsystems.iter().map(|s| s.name()).collect()
    }

    /// Run every subsystem over already-loaded observations.
    pub fn analyze(&mut self, input: &AnalysisInput) -> IdentityResult<AnalysisReport> {
        let mut report = AnalysisReport::new(self.run_id.clone());
        for subsystem in &mut self.subsystems {
            log::debug!("Running subsystem '{}'", subsystem.name());
            subsystem.run(input, &mut report)?;
        }
        sort_events(&mut report.events);

        let summary = report.summary();
        log::info!(
            "Run {}: {} events, {} crosswalk rows, {} anomalies",
            self.run_id,
            summary.events,
            summary.crosswalk_rows,
            summary.anomaly_count()
        );
        Ok(report)
    }

    /// Load from a source, then analyze.
    pub fn run(&mut self, source: &dyn ObservationSource) -> IdentityResult<AnalysisReport> {
        let input = AnalysisInput::load(source)?;
        self.analyze(&input)
    }

    /// Load from the store's source table, analyze, and persist the outputs
    /// under this run's id.
    pub fn run_with_store(&mut self, store: &IdentityStore) -> IdentityResult<AnalysisReport> {
        let input = {
            let source = store.source(&self.config.source);
            AnalysisInput::load(&source)?
        };
        let report = self.analyze(&input)?;
        let config_json = serde_json::to_string(&self.config)?;
        store.save_run(&report, env!("CARGO_PKG_VERSION"), &config_json)?;
        Ok(report)
    }

    /// Look up a registered subsystem by concrete type.
    pub fn subsystem<T: 'static>(&self) -> Option<&T> {
        self.subsystems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }
}

pub fn new_run_id() -> RunId {
    uuid::Uuid::new_v4().to_string()
}
