//! Subsystem trait.
//!
//! RULE: Every analysis stage implements IdentitySubsystem.
//! The engine calls run() on each registered subsystem once per
//! analysis, in registration order. Execution order is fixed and
//! documented in engine.rs.

use crate::{error::IdentityResult, observation::AnalysisInput, report::AnalysisReport};
use std::any::Any;

/// The contract every analysis stage must fulfill.
pub trait IdentitySubsystem {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per run by the engine.
    ///
    /// - `input`:  the observations loaded for this run (read-only)
    /// - `report`: everything earlier subsystems produced this run;
    ///             this subsystem appends its own output to it
    fn run(&mut self, input: &AnalysisInput, report: &mut AnalysisReport) -> IdentityResult<()>;

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}
