//! Deterministic preflight assessment of extracted contract documents.
//!
//! [`quality::run_preflight`] decides whether the extracted text is trustworthy;
//! [`engine::PreflightEngine`] adds the readiness domains, contract
//! classification and the calibrated health score on top of that verdict.

pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod health;
pub mod quality;
pub mod readiness;
pub mod resolver;
pub mod rules;
pub mod runtime;
pub mod telemetry;
mod text;

pub use engine::{PreflightEngine, PreflightReport};
pub use quality::{run_preflight, GateColor, GateReport, PageRecord};
