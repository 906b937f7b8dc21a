//! The combined preflight pipeline.
//!
//! Order matters: the spine reads the entity story, the schedule reads the
//! spine's contract type, financials read both, and health reads everything.

use crate::config::PreflightConfig;
use crate::entity::{build_entity_story, extract_candidate_headers, EntityStory, EntityStoryPolicy};
use crate::health::{HealthInputs, HealthScoreResult, HealthScorer, SectionWeights};
use crate::quality::{run_preflight, GateReport, PageRecord};
use crate::readiness::{
    build_addons_readiness, build_financials_readiness, build_opportunity_spine,
    build_schedule_structure, CheckCode, DomainResult,
};
use crate::resolver::{match_accounts, AccountIndexError, AccountMatchRow, AccountResolver, CsvAccountIndex};
use crate::rules::{ContractClassification, ContractRules};
use crate::runtime::ConfigCache;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_EXTRACTED_TEXT_CHARS: usize = 50_000;

/// Gate verdict plus every readiness domain for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreflightReport {
    #[serde(flatten)]
    pub gate: GateReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_match: Option<Vec<AccountMatchRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_story: Option<EntityStory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_spine: Option<DomainResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_structure: Option<DomainResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_classification: Option<ContractClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financials_readiness: Option<DomainResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons_readiness: Option<DomainResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<HealthScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_signal_headers: Option<Vec<String>>,
}

impl PreflightReport {
    fn gate_only(gate: GateReport) -> Self {
        Self {
            gate,
            account_match: None,
            entity_story: None,
            opportunity_spine: None,
            schedule_structure: None,
            contract_classification: None,
            financials_readiness: None,
            addons_readiness: None,
            health_score: None,
            extracted_text: None,
            extracted_headers: None,
            low_signal_headers: None,
        }
    }
}

/// Rules, scoring settings and an optional account index, shared across runs.
#[derive(Clone)]
pub struct PreflightEngine {
    rules: Arc<ContractRules>,
    scorer: HealthScorer,
    resolver: Option<Arc<dyn AccountResolver>>,
    policy: EntityStoryPolicy,
}

impl fmt::Debug for PreflightEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreflightEngine")
            .field("rules_version", &self.rules.version)
            .field("calibration_version", &self.scorer.calibration().version())
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Bundled rules, identity calibration and no resolver.
impl Default for PreflightEngine {
    fn default() -> Self {
        Self::new(ConfigCache::global().contract_rules(None), HealthScorer::default())
    }
}

impl PreflightEngine {
    pub fn new(rules: Arc<ContractRules>, scorer: HealthScorer) -> Self {
        Self {
            rules,
            scorer,
            resolver: None,
            policy: EntityStoryPolicy::default(),
        }
    }

    /// Builds an engine from configured documents. An unreadable account CSV
    /// is logged and the engine runs without a resolver.
    pub fn from_config(config: &PreflightConfig, cache: &ConfigCache) -> Self {
        let rules = cache.contract_rules(config.contract_rules_path.as_deref());
        let scorer = HealthScorer::new(SectionWeights::default(), cache.calibration(config));
        let mut engine = Self::new(rules, scorer)
            .with_policy(EntityStoryPolicy::default().with_aliases(&config.house_aliases));

        if let Some(path) = config.account_csv.as_deref() {
            if let Err(err) = engine.load_accounts(path) {
                warn!(error = %err, path = %path.display(), "account index unavailable; resolution disabled");
            }
        }
        engine
    }

    /// Loads a CSV account index and installs it as the resolver.
    pub fn load_accounts(&mut self, path: &Path) -> Result<usize, AccountIndexError> {
        let index = CsvAccountIndex::from_path(path)?;
        let accounts = index.len();
        self.resolver = Some(Arc::new(index));
        Ok(accounts)
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn AccountResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_policy(mut self, policy: EntityStoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rules(&self) -> &ContractRules {
        &self.rules
    }

    pub fn scorer(&self) -> &HealthScorer {
        &self.scorer
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn gate(&self, pages: &[PageRecord]) -> GateReport {
        run_preflight(pages)
    }

    /// Runs the full pipeline. A supplied `story` skips account resolution.
    pub fn assess(&self, pages: &[PageRecord], story: Option<EntityStory>) -> PreflightReport {
        let gate = run_preflight(pages);
        info!(
            pages = pages.len(),
            doc_mode = gate.doc_mode.label(),
            gate_color = gate.gate_color.label(),
            "preflight assessed"
        );
        if pages.is_empty() {
            return PreflightReport::gate_only(gate);
        }

        let full_text = pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let (headers, low_signal) = extract_candidate_headers(&full_text);

        let (account_match, story) = match story {
            Some(story) => (Vec::new(), story),
            None => self.resolve_story(&full_text, &headers),
        };

        let spine = build_opportunity_spine(&full_text, Some(&story));
        let schedule = build_schedule_structure(&full_text, Some(&story), &spine, &self.rules);
        let classification = self
            .rules
            .classify_contract(spine.value_of(CheckCode::OppContractType), &full_text);
        let financials = build_financials_readiness(&full_text, &spine, &schedule);
        let addons = build_addons_readiness(&full_text, &spine);

        let health = self.scorer.score(HealthInputs {
            gate_color: gate.gate_color,
            opportunity_spine: Some(&spine),
            schedule_structure: Some(&schedule),
            financials_readiness: Some(&financials),
            addons_readiness: Some(&addons),
            entity_story: Some(&story),
        });

        PreflightReport {
            gate,
            account_match: Some(account_match),
            entity_story: Some(story),
            opportunity_spine: Some(spine),
            schedule_structure: Some(schedule),
            contract_classification: Some(classification),
            financials_readiness: Some(financials),
            addons_readiness: Some(addons),
            health_score: Some(health),
            extracted_text: Some(full_text.chars().take(MAX_EXTRACTED_TEXT_CHARS).collect()),
            extracted_headers: Some(headers),
            low_signal_headers: Some(low_signal),
        }
    }

    fn resolve_story(&self, text: &str, headers: &[String]) -> (Vec<AccountMatchRow>, EntityStory) {
        match self.resolver.as_deref() {
            Some(resolver) => {
                let rows = match_accounts(resolver, text, headers);
                let story = build_entity_story(&rows, text, &self.policy);
                (rows, story)
            }
            None => (Vec::new(), EntityStory::without_resolver(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Calibration;
    use crate::quality::GateColor;
    use crate::readiness::CheckStatus;
    use crate::resolver::{AccountCandidate, Classification, MatchTier, Resolution};
    use crate::runtime::InMemoryConfigSource;

    const E2E_TEXT: &str = "Distribution Agreement\nEffective date: January 1, 2024.\nTerritory: Worldwide.\nTerm of 3 years.";

    struct HouseResolver;

    impl AccountResolver for HouseResolver {
        fn resolve(&self, query: &str) -> Resolution {
            let account_type = match query {
                "Harbor House Music" => "Division",
                "Acme Records Ltd" => "Label",
                _ => return Resolution::not_found("no index entry", "fixed"),
            };
            Resolution {
                classification: Classification::Matched,
                score: 1.0,
                candidates: vec![AccountCandidate {
                    account_name: query.to_string(),
                    account_type: account_type.to_string(),
                    account_id: format!("acct-{}", query.len()),
                    legal_entity_id: String::new(),
                    artist_name: String::new(),
                    company_name: String::new(),
                    legal_name: String::new(),
                    score: 1.0,
                    match_tier: MatchTier::Exact,
                }],
                explanation: "fixed".to_string(),
                provider: "fixed".to_string(),
            }
        }
    }

    fn engine() -> PreflightEngine {
        let cache = ConfigCache::new(InMemoryConfigSource::new());
        PreflightEngine::from_config(&PreflightConfig::default(), &cache)
    }

    fn e2e_page() -> PageRecord {
        PageRecord::new(1, E2E_TEXT).with_char_count(100)
    }

    #[test]
    fn empty_pages_report_gate_only() {
        let report = engine().assess(&[], None);
        assert_eq!(report.gate.gate_color, GateColor::Red);
        assert_eq!(report.gate.gate_reasons, vec!["no_pages"]);
        assert!(report.opportunity_spine.is_none());

        let json = serde_json::to_value(&report).expect("report serializes");
        assert!(json.get("schedule_structure").is_none());
        assert_eq!(json["metrics"], serde_json::json!({}));
    }

    #[test]
    fn distribution_page_runs_every_domain() {
        let report = engine().assess(&[e2e_page()], None);

        let spine = report.opportunity_spine.as_ref().expect("spine present");
        assert_eq!(spine.checks.len(), 6);
        assert!(matches!(spine.status, CheckStatus::Pass | CheckStatus::Review));
        assert_eq!(
            spine.check(CheckCode::OppContractType).map(|check| check.status),
            Some(CheckStatus::Pass)
        );

        let json = serde_json::to_value(&report).expect("report serializes");
        assert!(json.get("schedule_structure").is_some());
        assert_eq!(json["gate_color"], "GREEN");
        assert_eq!(
            json["contract_classification"]["contract_category"],
            "Distribution"
        );
        assert!(report.entity_story.as_ref().is_some_and(|story| story.resolver_unavailable));
    }

    #[test]
    fn supplied_story_skips_resolution() {
        let engine = engine().with_resolver(Arc::new(HouseResolver));
        let report = engine.assess(&[e2e_page()], Some(EntityStory::default()));
        assert_eq!(report.account_match.as_deref(), Some(&[][..]));
        let spine = report.opportunity_spine.expect("spine present");
        assert_eq!(spine.status, CheckStatus::Fail);
    }

    #[test]
    fn resolver_feeds_entity_story() {
        let engine = engine().with_resolver(Arc::new(HouseResolver));
        let text = format!("{E2E_TEXT}\nCompany Name: Harbor House Music\nAccount Name: Acme Records Ltd\n");
        let report = engine.assess(&[PageRecord::new(1, text)], None);

        let story = report.entity_story.expect("story present");
        assert_eq!(
            story.legal_entity_account.map(|entity| entity.name),
            Some("Harbor House Music".to_string())
        );
        assert_eq!(story.counterparties.len(), 1);
        let health = report.health_score.expect("health present");
        assert_eq!(health.section_scores.entity_resolution, 1.0);
    }

    #[test]
    fn missing_account_csv_leaves_engine_without_resolver() {
        let cache = ConfigCache::new(InMemoryConfigSource::new());
        let config = PreflightConfig {
            account_csv: Some("does/not/exist.csv".into()),
            ..PreflightConfig::default()
        };
        let mut engine = PreflightEngine::from_config(&config, &cache);
        assert!(!engine.has_resolver());
        assert!(engine.load_accounts(Path::new("does/not/exist.csv")).is_err());
    }

    #[test]
    fn default_engine_uses_bundled_rules() {
        let engine = PreflightEngine::default();
        assert_eq!(engine.rules().version, "1.0");
        assert!(!engine.has_resolver());

        let report = engine.assess(&[e2e_page()], None);
        let classification = report.contract_classification.expect("classification present");
        assert_eq!(classification.contract_category.as_deref(), Some("Distribution"));
    }

    #[test]
    fn calibration_flows_into_health() {
        let engine = PreflightEngine::new(
            Arc::new(ContractRules::default()),
            HealthScorer::new(
                SectionWeights::default(),
                Calibration::default().with_fallback_version("env_v2"),
            ),
        );
        let report = engine.assess(&[e2e_page()], None);
        assert_eq!(report.health_score.expect("health present").calibration_version, "env_v2");
    }
}
