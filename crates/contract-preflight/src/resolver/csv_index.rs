use super::{AccountCandidate, AccountResolver, Classification, MatchTier, Resolution};
use crate::text::round_to;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

const PROVIDER: &str = "csv_account_index_v1";
const FUZZY_THRESHOLD: f64 = 0.6;
const MATCHED_CUTOFF: f64 = 0.85;
const MAX_CANDIDATES: usize = 5;

static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern compiles"));

#[derive(Debug, thiserror::Error)]
pub enum AccountIndexError {
    #[error("failed to read account index: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid account index CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    #[serde(rename = "Account Name", default, deserialize_with = "trimmed")]
    account_name: String,
    #[serde(rename = "Artist Name (pka or dba)", default, deserialize_with = "trimmed")]
    artist_name: String,
    #[serde(rename = "Company Name", default, deserialize_with = "trimmed")]
    company_name: String,
    #[serde(rename = "Legal Name", default, deserialize_with = "trimmed")]
    legal_name: String,
    #[serde(rename = "Type", default, deserialize_with = "trimmed")]
    account_type: String,
    #[serde(rename = "Account ID", default, deserialize_with = "trimmed")]
    account_id: String,
    #[serde(rename = "Legal Entity ID", alias = "LE ID", default, deserialize_with = "trimmed")]
    legal_entity_id: String,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|raw| raw.trim().to_string()).unwrap_or_default())
}

#[derive(Debug)]
struct AccountRecord {
    row: AccountRow,
    normalized_names: Vec<String>,
    token_sets: Vec<BTreeSet<String>>,
}

impl AccountRecord {
    fn new(row: AccountRow) -> Self {
        let normalized_names: BTreeSet<String> = [
            &row.account_name,
            &row.artist_name,
            &row.company_name,
            &row.legal_name,
        ]
        .into_iter()
        .map(|name| normalize(name))
        .filter(|name| !name.is_empty())
        .collect();
        let token_sets = normalized_names.iter().map(|name| tokenize(name)).collect();

        Self {
            row,
            normalized_names: normalized_names.into_iter().collect(),
            token_sets,
        }
    }

    fn raw_names(&self) -> [&str; 4] {
        [
            self.row.account_name.as_str(),
            self.row.artist_name.as_str(),
            self.row.company_name.as_str(),
            self.row.legal_name.as_str(),
        ]
    }

    fn display_name(&self) -> &str {
        self.raw_names()
            .into_iter()
            .find(|name| !name.is_empty())
            .unwrap_or(self.row.account_id.as_str())
    }

    fn key(&self) -> String {
        if self.row.account_id.is_empty() {
            self.display_name().to_string()
        } else {
            self.row.account_id.clone()
        }
    }

    fn candidate(&self, score: f64, tier: MatchTier) -> AccountCandidate {
        AccountCandidate {
            account_name: self.row.account_name.clone(),
            account_type: self.row.account_type.clone(),
            account_id: self.row.account_id.clone(),
            legal_entity_id: self.row.legal_entity_id.clone(),
            artist_name: self.row.artist_name.clone(),
            company_name: self.row.company_name.clone(),
            legal_name: self.row.legal_name.clone(),
            score: round_to(score, 4),
            match_tier: tier,
        }
    }
}

/// Lowercases, maps punctuation to spaces, and collapses whitespace.
pub(crate) fn normalize(value: &str) -> String {
    let lowered = value.to_lowercase();
    let spaced = PUNCT_RE.replace_all(&lowered, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tokenize(normalized: &str) -> BTreeSet<String> {
    normalized.split_whitespace().map(str::to_string).collect()
}

fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    let union = left.union(right).count();
    shared as f64 / union as f64
}

fn edit_distance(left: &[char], right: &[char]) -> usize {
    if left.is_empty() {
        return right.len();
    }
    let mut previous: Vec<usize> = (0..=right.len()).collect();
    for (i, lc) in left.iter().enumerate() {
        let mut current = vec![i + 1; right.len() + 1];
        for (j, rc) in right.iter().enumerate() {
            let cost = usize::from(lc != rc);
            current[j + 1] = (current[j] + 1).min(previous[j + 1] + 1).min(previous[j] + cost);
        }
        previous = current;
    }
    previous[right.len()]
}

fn edit_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let longest = left.len().max(right.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(&left, &right) as f64 / longest as f64
}

/// In-memory account index keyed by every normalized name variant of a row.
#[derive(Debug, Default)]
pub struct CsvAccountIndex {
    records: Vec<AccountRecord>,
    exact: HashMap<String, Vec<usize>>,
    names: Vec<String>,
}

impl CsvAccountIndex {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AccountIndexError> {
        let file = std::fs::File::open(path.as_ref())?;
        let index = Self::from_reader(file)?;
        info!(
            path = %path.as_ref().display(),
            accounts = index.len(),
            "account index loaded"
        );
        Ok(index)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AccountIndexError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut index = Self::default();
        let mut seen_names: HashSet<String> = HashSet::new();

        for row in csv_reader.deserialize::<AccountRow>() {
            let record = AccountRecord::new(row?);
            let position = index.records.len();
            for name in &record.normalized_names {
                index.exact.entry(name.clone()).or_default().push(position);
            }
            for name in record.raw_names() {
                if !name.is_empty() && seen_names.insert(name.to_lowercase()) {
                    index.names.push(name.to_string());
                }
            }
            index.records.push(record);
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn score(&self, query: &str) -> HashMap<String, (f64, MatchTier, usize)> {
        let mut scored: HashMap<String, (f64, MatchTier, usize)> = HashMap::new();

        if let Some(positions) = self.exact.get(query) {
            for &position in positions {
                scored.insert(self.records[position].key(), (1.0, MatchTier::Exact, position));
            }
            return scored;
        }

        let query_tokens = tokenize(query);
        for (position, record) in self.records.iter().enumerate() {
            let mut best: Option<(f64, MatchTier)> = None;
            for tokens in &record.token_sets {
                let overlap = jaccard(&query_tokens, tokens);
                if overlap > best.map_or(0.0, |(score, _)| score) {
                    best = Some((overlap, MatchTier::TokenOverlap));
                }
            }
            for name in &record.normalized_names {
                let ratio = edit_ratio(query, name);
                if ratio > best.map_or(0.0, |(score, _)| score) {
                    best = Some((ratio, MatchTier::EditDistance));
                }
            }
            let Some((score, tier)) = best.filter(|(score, _)| *score >= FUZZY_THRESHOLD) else {
                continue;
            };
            let key = record.key();
            if scored.get(&key).map_or(true, |(existing, _, _)| *existing < score) {
                scored.insert(key, (score, tier, position));
            }
        }
        scored
    }
}

impl AccountResolver for CsvAccountIndex {
    fn known_names(&self) -> &[String] {
        &self.names
    }

    fn resolve(&self, query: &str) -> Resolution {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Resolution::not_found("Empty query", PROVIDER);
        }

        let mut candidates: Vec<AccountCandidate> = self
            .score(&normalized)
            .into_values()
            .map(|(score, tier, position)| self.records[position].candidate(score, tier))
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.account_name.cmp(&b.account_name))
        });
        candidates.truncate(MAX_CANDIDATES);

        let Some(top) = candidates.first() else {
            debug!(query, "no account match");
            return Resolution::not_found(format!("No matches found for '{query}'"), PROVIDER);
        };

        let classification = if top.score >= MATCHED_CUTOFF {
            Classification::Matched
        } else {
            Classification::Ambiguous
        };
        let explanation = format!(
            "Top match: {} (score={}, tier={})",
            top.account_name,
            top.score,
            top.match_tier.as_str()
        );
        debug!(query, score = top.score, ?classification, "account resolved");

        Resolution {
            classification,
            score: top.score,
            candidates,
            explanation,
            provider: PROVIDER.to_string(),
        }
    }
}
