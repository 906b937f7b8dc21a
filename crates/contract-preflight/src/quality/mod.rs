//! Text-quality gate: page readability, corruption detection, and the RED/YELLOW/GREEN verdict.

mod corruption;
mod gate;
mod mode;
mod page;

pub use corruption::{
    compute_text_metrics, extract_corruption_samples, CorruptionIssue, CorruptionSample,
    TextMetrics,
};
pub use gate::{
    compute_gate, run_preflight, DecisionTraceEntry, GateColor, GateReport, GateResult,
    PreflightMetrics, TraceOutcome, TraceValue,
};
pub use mode::{classify_document, classify_page, PageMode};
pub use page::{PageClassification, PageRecord};
