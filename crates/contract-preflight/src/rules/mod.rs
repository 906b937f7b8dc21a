//! Contract category and termination-flavor classification.
//!
//! Every label comes from a versioned rules document; nothing here invents a
//! category or schedule type the document does not list. A copy of the v1
//! document is compiled in and used whenever no override is configured.

use crate::text::{score_keywords, TextZones, ZoneWeights};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUNDLED_RULES: &str = include_str!("../../data/preflight_contract_rules.v1.json");
const UNKNOWN_VERSION: &str = "unknown";

/// Termination flavors weigh zone position more heavily than extraction does.
const FLAVOR_WEIGHTS: ZoneWeights = ZoneWeights {
    title: 0.50,
    preamble: 0.30,
    body: 0.15,
    corroboration: 0.05,
};

fn unknown_version() -> String {
    UNKNOWN_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorRule {
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: String,
    #[serde(default)]
    pub expected_schedule_types: Vec<String>,
    #[serde(default)]
    pub subtypes_allowed: Vec<String>,
    #[serde(default)]
    pub termination_flavors: BTreeMap<String, FlavorRule>,
}

/// Parsed rules document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRules {
    #[serde(rename = "_version", default = "unknown_version")]
    pub version: String,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryRule>,
    #[serde(default)]
    pub schedule_type_priority: Vec<String>,
    #[serde(default)]
    pub schema_locked_schedule_types: Vec<String>,
    #[serde(default)]
    pub schema_locked_subtypes: Vec<String>,
}

impl Default for ContractRules {
    fn default() -> Self {
        Self {
            version: unknown_version(),
            categories: BTreeMap::new(),
            schedule_type_priority: Vec::new(),
            schema_locked_schedule_types: Vec::new(),
            schema_locked_subtypes: Vec::new(),
        }
    }
}

/// Deterministic classification of one contract against the rules document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractClassification {
    pub contract_category: Option<String>,
    pub expected_schedule_types: Vec<String>,
    pub termination_flavor: Option<String>,
    pub termination_flavor_label: Option<String>,
    pub termination_flavor_evidence: Vec<String>,
    pub category_rule_version: String,
    pub subtypes_allowed: Vec<String>,
}

impl ContractClassification {
    fn unclassified(version: &str) -> Self {
        Self {
            contract_category: None,
            expected_schedule_types: Vec::new(),
            termination_flavor: None,
            termination_flavor_label: None,
            termination_flavor_evidence: Vec::new(),
            category_rule_version: version.to_string(),
            subtypes_allowed: Vec::new(),
        }
    }
}

impl ContractRules {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The compiled-in v1 document.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_RULES)
    }

    fn category(&self, contract_type: &str) -> Option<&CategoryRule> {
        self.categories.get(contract_type.trim().to_lowercase().as_str())
    }

    pub fn expected_schedule_types(&self, contract_type: &str) -> &[String] {
        self.category(contract_type)
            .map_or(&[][..], |category| category.expected_schedule_types.as_slice())
    }

    /// Schedule types from most to least specific.
    pub fn schedule_type_priority(&self) -> &[String] {
        &self.schedule_type_priority
    }

    pub fn schema_locked_schedule_types(&self) -> &[String] {
        &self.schema_locked_schedule_types
    }

    pub fn schema_locked_subtypes(&self) -> &[String] {
        &self.schema_locked_subtypes
    }

    /// Unknown types, empty subtypes and categories without an allow list accept anything.
    pub fn is_subtype_allowed(&self, contract_type: Option<&str>, subtype: Option<&str>) -> bool {
        let (Some(contract_type), Some(subtype)) = (contract_type, subtype) else {
            return true;
        };
        if contract_type.trim().is_empty() || subtype.is_empty() {
            return true;
        }
        match self.category(contract_type) {
            Some(category) if !category.subtypes_allowed.is_empty() => category
                .subtypes_allowed
                .iter()
                .any(|allowed| allowed == subtype),
            _ => true,
        }
    }

    pub fn classify_contract(&self, contract_type: Option<&str>, text: &str) -> ContractClassification {
        let mut result = ContractClassification::unclassified(&self.version);
        let Some(contract_type) = contract_type.filter(|kind| !kind.trim().is_empty()) else {
            return result;
        };
        let Some(category) = self.category(contract_type) else {
            return result;
        };

        result.contract_category = Some(category.label.clone());
        result.expected_schedule_types = category.expected_schedule_types.clone();
        result.subtypes_allowed = category.subtypes_allowed.clone();

        if contract_type.trim().eq_ignore_ascii_case("termination") && !text.is_empty() {
            if let Some((key, flavor, evidence)) = detect_termination_flavor(category, text) {
                result.termination_flavor = Some(key);
                result.termination_flavor_label = Some(flavor.label.clone());
                result.termination_flavor_evidence = evidence;
            }
        }
        result
    }
}

/// Highest zone-weighted flavor; ties resolve to the lexically first key.
fn detect_termination_flavor<'a>(
    category: &'a CategoryRule,
    text: &str,
) -> Option<(String, &'a FlavorRule, Vec<String>)> {
    let zones = TextZones::new(text);
    let mut best: Option<(&String, &FlavorRule, f64, Vec<String>)> = None;

    for (key, flavor) in &category.termination_flavors {
        let lowered: Vec<String> = flavor.keywords.iter().map(|kw| kw.to_lowercase()).collect();
        let keywords: Vec<&str> = lowered.iter().map(String::as_str).collect();
        let Some(scored) = score_keywords(&zones, &keywords, FLAVOR_WEIGHTS) else {
            continue;
        };
        // Keys iterate in order, so a strict comparison keeps the first on ties.
        if best.as_ref().map_or(true, |(_, _, score, _)| scored.score > *score) {
            best = Some((key, flavor, scored.score, scored.hits));
        }
    }

    best.map(|(key, flavor, _, hits)| (key.clone(), flavor, hits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ContractRules {
        ContractRules::bundled().expect("bundled rules parse")
    }

    #[test]
    fn bundled_rules_carry_every_category() {
        let rules = rules();
        assert_eq!(rules.version, "1.0");
        for key in [
            "distribution",
            "license",
            "recording",
            "publishing",
            "management",
            "service",
            "amendment",
            "termination",
        ] {
            assert!(rules.categories.contains_key(key), "missing category {key}");
        }
        assert!(!rules.schedule_type_priority().is_empty());
        assert!(rules
            .schema_locked_subtypes()
            .iter()
            .any(|subtype| subtype == "Distribution"));
        assert!(rules
            .schema_locked_schedule_types()
            .iter()
            .any(|kind| kind == "termination_schedule"));
    }

    #[test]
    fn classifies_distribution() {
        let classification = rules().classify_contract(
            Some("distribution"),
            "Distribution Agreement for digital distribution and sync licensing.",
        );
        assert_eq!(classification.contract_category.as_deref(), Some("Distribution"));
        assert!(classification
            .expected_schedule_types
            .iter()
            .any(|kind| kind == "distro_sync_existing_masters"));
        assert!(classification.termination_flavor.is_none());
        assert_eq!(classification.category_rule_version, "1.0");
    }

    #[test]
    fn detects_mutual_termination() {
        let classification = rules().classify_contract(
            Some("termination"),
            "Termination Agreement. The parties mutually agree to terminate.",
        );
        assert_eq!(classification.contract_category.as_deref(), Some("Termination"));
        assert_eq!(classification.termination_flavor.as_deref(), Some("mutual"));
        assert_eq!(
            classification.termination_flavor_label.as_deref(),
            Some("Mutual Termination")
        );
        assert_eq!(
            classification.termination_flavor_evidence,
            vec!["title: mutually agree".to_string()]
        );
    }

    #[test]
    fn unknown_type_is_unclassified() {
        let rules = rules();
        let classification = rules.classify_contract(Some("lease"), "Lease Agreement");
        assert!(classification.contract_category.is_none());
        assert!(classification.expected_schedule_types.is_empty());
        assert_eq!(classification.category_rule_version, "1.0");
        assert!(rules.classify_contract(None, "anything").contract_category.is_none());
        assert!(rules.expected_schedule_types("lease").is_empty());
    }

    #[test]
    fn subtype_allow_lists() {
        let rules = rules();
        assert!(rules.is_subtype_allowed(Some("distribution"), Some("Sync")));
        assert!(!rules.is_subtype_allowed(Some("distribution"), Some("Pub Admin")));
        assert!(!rules.is_subtype_allowed(Some("license"), Some("CMA")));
        assert!(rules.is_subtype_allowed(Some("lease"), Some("Anything")));
        assert!(rules.is_subtype_allowed(Some("distribution"), None));
        assert!(rules.is_subtype_allowed(Some("management"), Some("Anything")));
    }

    #[test]
    fn missing_fields_default() {
        let rules = ContractRules::from_json("{}").expect("empty document parses");
        assert_eq!(rules.version, "unknown");
        assert!(rules.categories.is_empty());
    }
}
