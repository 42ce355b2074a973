//! Institution identity resolution for FHA single-family and HECM snapshots.
//!
//! Longitudinal (number, name, period) observations for originators and
//! sponsors go in; a crosswalk, a mapping error table, a typed event log of
//! renames and ownership transitions, and oscillation records come out.

pub mod config;
pub mod crosswalk_subsystem;
pub mod engine;
pub mod error;
pub mod event;
pub mod export;
pub mod id_space_subsystem;
pub mod name_change_subsystem;
pub mod name_generator;
pub mod observation;
pub mod oscillation_subsystem;
pub mod ownership_subsystem;
pub mod report;
pub mod rng;
pub mod segmenter;
pub mod store;
pub mod subsystem;
pub mod synthetic;
pub mod types;
