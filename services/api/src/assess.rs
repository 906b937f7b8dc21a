use crate::infra::{build_engine, read_json_file};
use clap::Args;
use contract_preflight::config::AppConfig;
use contract_preflight::entity::EntityStory;
use contract_preflight::error::AppError;
use contract_preflight::quality::PageRecord;
use contract_preflight::readiness::DomainResult;
use contract_preflight::PreflightReport;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// JSON array of extracted pages ({page, text, char_count?, image_coverage_ratio?})
    #[arg(long)]
    pub(crate) pages: PathBuf,
    /// Pre-resolved entity story; skips account resolution when given
    #[arg(long)]
    pub(crate) entity_story: Option<PathBuf>,
    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = build_engine(&config.preflight);

    let pages: Vec<PageRecord> = read_json_file(&args.pages)?;
    let story: Option<EntityStory> = args
        .entity_story
        .as_deref()
        .map(|path| read_json_file(path))
        .transpose()?;

    let report = engine.assess(&pages, story);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }
    Ok(())
}

fn render_report(report: &PreflightReport) {
    let gate = &report.gate;
    println!("Contract preflight");
    println!(
        "- Gate: {} ({}) | {}",
        gate.gate_color.label(),
        gate.doc_mode.label(),
        gate.gate_reasons.join(", ")
    );
    if let Some(metrics) = &gate.metrics {
        println!(
            "- {} pages | {:.1} avg chars | replacement {:.4} | control {:.4} | mojibake {:.4}",
            metrics.total_pages,
            metrics.avg_chars_per_page,
            metrics.replacement_char_ratio,
            metrics.control_char_ratio,
            metrics.mojibake_ratio
        );
    }
    if !gate.corruption_samples.is_empty() {
        println!("- {} corruption samples captured", gate.corruption_samples.len());
    }

    if let Some(story) = &report.entity_story {
        println!("\nEntities");
        match &story.legal_entity_account {
            Some(legal) => println!("- Legal entity: {} ({})", legal.name, legal.match_status.as_str()),
            None => println!("- Legal entity: unresolved"),
        }
        for party in &story.counterparties {
            println!("- Counterparty: {} ({})", party.name, party.match_status.as_str());
        }
        for action in &story.analyst_actions {
            println!("  * {action}");
        }
    }

    let domains = [
        ("Opportunity spine", &report.opportunity_spine),
        ("Schedule structure", &report.schedule_structure),
        ("Financials", &report.financials_readiness),
        ("Add-ons", &report.addons_readiness),
    ];
    for (title, domain) in domains {
        if let Some(domain) = domain {
            render_domain(title, domain);
        }
    }

    if let Some(classification) = &report.contract_classification {
        println!(
            "\nCategory: {} (rules {})",
            classification.contract_category.as_deref().unwrap_or("unclassified"),
            classification.category_rule_version
        );
        if let Some(flavor) = &classification.termination_flavor_label {
            println!("- Termination flavor: {flavor}");
        }
    }

    if let Some(health) = &report.health_score {
        println!(
            "\nHealth: {:.3} calibrated ({}) | raw {:.3} | penalty {:.2} | {}",
            health.calibrated_score,
            health.band,
            health.raw_score,
            health.gate_penalty,
            health.calibration_version
        );
    }
}

fn render_domain(title: &str, domain: &DomainResult) {
    println!("\n{title}: {}", domain.status.label());
    for check in &domain.checks {
        println!(
            "  - {}: {} ({:.2}) {}",
            check.label,
            check.status.label(),
            check.confidence,
            check.value.as_deref().unwrap_or("-")
        );
    }
}
