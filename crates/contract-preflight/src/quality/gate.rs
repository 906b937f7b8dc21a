use super::corruption::{compute_text_metrics, extract_corruption_samples, CorruptionSample};
use super::mode::{classify_document, classify_page, PageMode};
use super::page::{PageClassification, PageRecord};
use crate::text::round_to;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

const GATE_RED_REPLACEMENT_RATIO: f64 = 0.05;
const GATE_RED_CONTROL_RATIO: f64 = 0.03;
const GATE_RED_MOJIBAKE_RATIO: f64 = 0.02;
const GATE_YELLOW_AVG_CHARS: f64 = 30.0;
const GATE_YELLOW_SPARSE_RATIO: f64 = 0.80;
const GATE_YELLOW_SPARSE_CHARS: usize = 10;
const GATE_YELLOW_MOJIBAKE_RATIO: f64 = 0.005;

/// Traffic-light verdict on whether the extracted text can be trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateColor {
    Red,
    Yellow,
    Green,
}

impl GateColor {
    pub const fn label(self) -> &'static str {
        match self {
            GateColor::Red => "RED",
            GateColor::Yellow => "YELLOW",
            GateColor::Green => "GREEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceOutcome {
    Pass,
    Fail,
}

/// Observed value or threshold recorded in the decision trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceValue {
    Number(f64),
    Label(String),
}

/// One evaluated gate predicate, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTraceEntry {
    pub rule: String,
    pub value: TraceValue,
    pub threshold: TraceValue,
    pub result: TraceOutcome,
    pub level: GateColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub color: GateColor,
    pub reasons: Vec<String>,
    pub decision_trace: Vec<DecisionTraceEntry>,
}

/// Evaluates RED predicates, then YELLOW predicates only when nothing RED fired.
pub fn compute_gate(
    doc_mode: PageMode,
    replacement_char_ratio: f64,
    control_char_ratio: f64,
    avg_chars_per_page: f64,
    page_char_counts: &[usize],
    mojibake_ratio: f64,
) -> GateResult {
    let mut reasons = Vec::new();
    let mut trace = Vec::new();

    let red_checks = [
        (
            "replacement_char_ratio",
            "replacement_char_ratio_exceeded",
            replacement_char_ratio,
            GATE_RED_REPLACEMENT_RATIO,
        ),
        (
            "control_char_ratio",
            "control_char_ratio_exceeded",
            control_char_ratio,
            GATE_RED_CONTROL_RATIO,
        ),
        (
            "mojibake_ratio",
            "mojibake_ratio_exceeded",
            mojibake_ratio,
            GATE_RED_MOJIBAKE_RATIO,
        ),
    ];

    for (metric, reason, value, threshold) in red_checks {
        let fired = value > threshold;
        trace.push(DecisionTraceEntry {
            rule: format!("{metric} > {threshold:.2}"),
            value: TraceValue::Number(round_to(value, 6)),
            threshold: TraceValue::Number(threshold),
            result: outcome(fired),
            level: GateColor::Red,
        });
        if fired {
            reasons.push(format!("{reason}:{value:.4}>{threshold:.4}"));
        }
    }

    if !reasons.is_empty() {
        return GateResult {
            color: GateColor::Red,
            reasons,
            decision_trace: trace,
        };
    }

    let mixed = doc_mode == PageMode::Mixed;
    trace.push(DecisionTraceEntry {
        rule: "doc_mode == MIXED".to_string(),
        value: TraceValue::Label(doc_mode.label().to_string()),
        threshold: TraceValue::Label(PageMode::Mixed.label().to_string()),
        result: outcome(mixed),
        level: GateColor::Yellow,
    });
    if mixed {
        reasons.push("doc_mode_mixed".to_string());
    }

    let thin = avg_chars_per_page < GATE_YELLOW_AVG_CHARS;
    trace.push(DecisionTraceEntry {
        rule: format!("avg_chars_per_page < {GATE_YELLOW_AVG_CHARS:.0}"),
        value: TraceValue::Number(round_to(avg_chars_per_page, 2)),
        threshold: TraceValue::Number(GATE_YELLOW_AVG_CHARS),
        result: outcome(thin),
        level: GateColor::Yellow,
    });
    if thin {
        reasons.push(format!(
            "avg_chars_per_page_low:{avg_chars_per_page:.1}<{GATE_YELLOW_AVG_CHARS:.0}"
        ));
    }

    let sparse_ratio = if page_char_counts.is_empty() {
        0.0
    } else {
        let sparse = page_char_counts
            .iter()
            .filter(|count| **count < GATE_YELLOW_SPARSE_CHARS)
            .count();
        sparse as f64 / page_char_counts.len() as f64
    };
    let sparse = sparse_ratio > GATE_YELLOW_SPARSE_RATIO;
    trace.push(DecisionTraceEntry {
        rule: format!(
            ">{:.0}% pages have <{GATE_YELLOW_SPARSE_CHARS} chars",
            GATE_YELLOW_SPARSE_RATIO * 100.0
        ),
        value: TraceValue::Number(round_to(sparse_ratio, 4)),
        threshold: TraceValue::Number(GATE_YELLOW_SPARSE_RATIO),
        result: outcome(sparse),
        level: GateColor::Yellow,
    });
    if sparse {
        reasons.push(format!(
            "sparse_pages_exceeded:{sparse_ratio:.2}>{GATE_YELLOW_SPARSE_RATIO:.2}"
        ));
    }

    let garbled = mojibake_ratio > GATE_YELLOW_MOJIBAKE_RATIO;
    trace.push(DecisionTraceEntry {
        rule: format!("mojibake_ratio > {GATE_YELLOW_MOJIBAKE_RATIO:.3}"),
        value: TraceValue::Number(round_to(mojibake_ratio, 6)),
        threshold: TraceValue::Number(GATE_YELLOW_MOJIBAKE_RATIO),
        result: outcome(garbled),
        level: GateColor::Yellow,
    });
    if garbled {
        reasons.push(format!(
            "mojibake_ratio_elevated:{mojibake_ratio:.4}>{GATE_YELLOW_MOJIBAKE_RATIO:.4}"
        ));
    }

    if !reasons.is_empty() {
        return GateResult {
            color: GateColor::Yellow,
            reasons,
            decision_trace: trace,
        };
    }

    GateResult {
        color: GateColor::Green,
        reasons: vec!["all_checks_passed".to_string()],
        decision_trace: trace,
    }
}

fn outcome(fired: bool) -> TraceOutcome {
    if fired {
        TraceOutcome::Fail
    } else {
        TraceOutcome::Pass
    }
}

/// Aggregate counters reported alongside the gate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightMetrics {
    pub total_pages: usize,
    pub total_chars: usize,
    pub avg_chars_per_page: f64,
    pub replacement_char_ratio: f64,
    pub control_char_ratio: f64,
    pub mojibake_ratio: f64,
    pub searchable_pages: usize,
    pub scanned_pages: usize,
    pub mixed_pages: usize,
}

/// Gate-only preflight output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateReport {
    pub doc_mode: PageMode,
    pub gate_color: GateColor,
    pub gate_reasons: Vec<String>,
    pub decision_trace: Vec<DecisionTraceEntry>,
    pub corruption_samples: Vec<CorruptionSample>,
    pub page_classifications: Vec<PageClassification>,
    /// Absent for zero pages; serialized as `{}` in that case.
    #[serde(serialize_with = "serialize_metrics")]
    pub metrics: Option<PreflightMetrics>,
}

impl GateReport {
    fn no_pages() -> Self {
        Self {
            doc_mode: PageMode::Mixed,
            gate_color: GateColor::Red,
            gate_reasons: vec!["no_pages".to_string()],
            decision_trace: Vec::new(),
            corruption_samples: Vec::new(),
            page_classifications: Vec::new(),
            metrics: None,
        }
    }
}

fn serialize_metrics<S>(metrics: &Option<PreflightMetrics>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match metrics {
        Some(metrics) => metrics.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Classifies every page in input order and evaluates the quality gate.
pub fn run_preflight(pages: &[PageRecord]) -> GateReport {
    if pages.is_empty() {
        return GateReport::no_pages();
    }

    let page_classifications: Vec<PageClassification> = pages
        .iter()
        .map(|page| {
            let char_count = page.effective_char_count();
            PageClassification {
                page: page.page,
                mode: classify_page(char_count, page.image_coverage_ratio),
                char_count,
                image_coverage_ratio: page.image_coverage_ratio,
            }
        })
        .collect();

    let page_modes: Vec<PageMode> = page_classifications.iter().map(|page| page.mode).collect();
    let page_char_counts: Vec<usize> = page_classifications
        .iter()
        .map(|page| page.char_count)
        .collect();
    let pages_text: Vec<&str> = pages.iter().map(|page| page.text.as_str()).collect();

    let doc_mode = classify_document(&page_modes);
    let text_metrics = compute_text_metrics(&pages_text);
    let total_chars: usize = page_char_counts.iter().sum();
    let avg_chars = total_chars as f64 / page_char_counts.len() as f64;

    let gate = compute_gate(
        doc_mode,
        text_metrics.replacement_char_ratio,
        text_metrics.control_char_ratio,
        avg_chars,
        &page_char_counts,
        text_metrics.mojibake_ratio,
    );

    let count_mode = |mode: PageMode| page_modes.iter().filter(|m| **m == mode).count();
    let metrics = PreflightMetrics {
        total_pages: pages.len(),
        total_chars,
        avg_chars_per_page: round_to(avg_chars, 2),
        replacement_char_ratio: round_to(text_metrics.replacement_char_ratio, 6),
        control_char_ratio: round_to(text_metrics.control_char_ratio, 6),
        mojibake_ratio: round_to(text_metrics.mojibake_ratio, 6),
        searchable_pages: count_mode(PageMode::Searchable),
        scanned_pages: count_mode(PageMode::Scanned),
        mixed_pages: count_mode(PageMode::Mixed),
    };

    GateReport {
        doc_mode,
        gate_color: gate.color,
        gate_reasons: gate.reasons,
        decision_trace: gate.decision_trace,
        corruption_samples: extract_corruption_samples(&pages_text),
        page_classifications,
        metrics: Some(metrics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_short_circuits_yellow() {
        let gate = compute_gate(PageMode::Mixed, 0.06, 0.0, 5.0, &[1, 2, 3], 0.0);
        assert_eq!(gate.color, GateColor::Red);
        assert_eq!(gate.reasons, vec!["replacement_char_ratio_exceeded:0.0600>0.0500"]);
        assert!(gate
            .decision_trace
            .iter()
            .all(|entry| entry.level == GateColor::Red));
    }

    #[test]
    fn every_red_reason_is_reported() {
        let gate = compute_gate(PageMode::Searchable, 0.2, 0.04, 400.0, &[400], 0.03);
        assert_eq!(gate.color, GateColor::Red);
        assert_eq!(gate.reasons.len(), 3);
        assert!(gate.reasons[1].starts_with("control_char_ratio_exceeded:"));
        assert!(gate.reasons[2].starts_with("mojibake_ratio_exceeded:"));
    }

    #[test]
    fn yellow_collects_all_soft_reasons() {
        let gate = compute_gate(PageMode::Mixed, 0.0, 0.0, 4.0, &[2, 3, 8, 9, 4], 0.01);
        assert_eq!(gate.color, GateColor::Yellow);
        assert_eq!(
            gate.reasons,
            vec![
                "doc_mode_mixed".to_string(),
                "avg_chars_per_page_low:4.0<30".to_string(),
                "sparse_pages_exceeded:1.00>0.80".to_string(),
                "mojibake_ratio_elevated:0.0100>0.0050".to_string(),
            ]
        );
        assert_eq!(gate.decision_trace.len(), 7);
    }

    #[test]
    fn clean_input_is_green() {
        let gate = compute_gate(PageMode::Searchable, 0.0, 0.0, 1200.0, &[1200], 0.0);
        assert_eq!(gate.color, GateColor::Green);
        assert_eq!(gate.reasons, vec!["all_checks_passed"]);
    }

    #[test]
    fn no_pages_is_terminal_red() {
        let report = run_preflight(&[]);
        assert_eq!(report.gate_color, GateColor::Red);
        assert_eq!(report.gate_reasons, vec!["no_pages"]);
        assert_eq!(report.doc_mode, PageMode::Mixed);

        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["metrics"], serde_json::json!({}));
        assert_eq!(json["page_classifications"], serde_json::json!([]));
    }

    #[test]
    fn single_clean_page_is_green() {
        let page = PageRecord::new(
            1,
            "This agreement is made between the parties for distribution of recordings.",
        );
        let report = run_preflight(&[page]);
        assert_eq!(report.doc_mode, PageMode::Searchable);
        assert_eq!(report.page_classifications[0].mode, PageMode::Searchable);
        assert_eq!(report.gate_color, GateColor::Green);
        let metrics = report.metrics.expect("metrics present");
        assert_eq!(metrics.total_pages, 1);
        assert_eq!(metrics.searchable_pages, 1);
    }

    #[test]
    fn replacement_run_flips_green_to_red() {
        let prose = "The licensee shall account to the licensor for all revenue received \
                     from the exploitation of the masters in the territory during the term. ";
        let clean = PageRecord::new(1, prose.repeat(2));
        assert_eq!(run_preflight(&[clean]).gate_color, GateColor::Green);

        let corrupted = PageRecord::new(1, format!("{prose}{}{prose}", "\u{fffd}".repeat(20)));
        let report = run_preflight(&[corrupted]);
        assert_eq!(report.gate_color, GateColor::Red);
        assert!(report
            .gate_reasons
            .iter()
            .all(|reason| reason.contains("exceeded")));
    }
}
