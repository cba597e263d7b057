//! Hygiene scoring
//!
//! Pure functions from findings to scores. Nothing is cached between calls:
//! a score is always recomputed from the finding set it is given.

use crate::model::{Category, Finding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-penalty decay applied to the overall page score
const DECAY_BASE: f64 = 0.95;

/// Multiplier used for a severity or category missing from the tables
const FALLBACK_WEIGHT: f64 = 1.0;

/// Severity and category weight tables
///
/// Deserializes from a `[scoring]` table with optional `severity-weights`
/// and `category-weights` sub-tables; keys that are not given keep their
/// default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct ScoreWeights {
    pub severity_weights: BTreeMap<Severity, f64>,
    pub category_weights: BTreeMap<Category, f64>,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let severity_weights = BTreeMap::from([
            (Severity::Critical, 15.0),
            (Severity::High, 8.0),
            (Severity::Medium, 3.0),
            (Severity::Low, 1.0),
            (Severity::Info, 0.0),
        ]);
        let category_weights = BTreeMap::from([
            (Category::Security, 1.5),
            (Category::Functional, 1.2),
            (Category::Performance, 1.0),
            (Category::Accessibility, 1.0),
            (Category::Ui, 0.8),
            (Category::Seo, 0.8),
            (Category::Content, 0.5),
        ]);
        Self {
            severity_weights,
            category_weights,
        }
    }
}

impl ScoreWeights {
    pub fn severity_weight(&self, severity: Severity) -> f64 {
        self.severity_weights
            .get(&severity)
            .copied()
            .unwrap_or(FALLBACK_WEIGHT)
    }

    pub fn category_weight(&self, category: Category) -> f64 {
        self.category_weights
            .get(&category)
            .copied()
            .unwrap_or(FALLBACK_WEIGHT)
    }

    /// Penalty contributed by one finding
    pub fn penalty(&self, finding: &Finding) -> f64 {
        self.severity_weight(finding.severity) * self.category_weight(finding.category)
    }
}

/// On-disk shape of [`ScoreWeights`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawWeights {
    #[serde(default)]
    severity_weights: BTreeMap<String, f64>,
    #[serde(default)]
    category_weights: BTreeMap<String, f64>,
}

impl TryFrom<RawWeights> for ScoreWeights {
    type Error = String;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        let mut weights = ScoreWeights::default();
        for (key, value) in raw.severity_weights {
            weights.severity_weights.insert(key.parse()?, value);
        }
        for (key, value) in raw.category_weights {
            weights.category_weights.insert(key.parse()?, value);
        }
        Ok(weights)
    }
}

impl From<ScoreWeights> for RawWeights {
    fn from(weights: ScoreWeights) -> Self {
        Self {
            severity_weights: weights
                .severity_weights
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            category_weights: weights
                .category_weights
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Score of one page or one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0 to 100
    pub overall: f64,
    /// Every category, 0 to 100
    pub categories: BTreeMap<Category, f64>,
    /// Non-false-positive findings by severity
    pub counts: BTreeMap<Severity, usize>,
}

impl ScoreResult {
    /// A perfect score with every category at 100
    pub fn perfect() -> Self {
        Self {
            overall: 100.0,
            categories: Category::ALL.iter().map(|c| (*c, 100.0)).collect(),
            counts: BTreeMap::new(),
        }
    }

    pub fn category(&self, category: Category) -> f64 {
        self.categories.get(&category).copied().unwrap_or(100.0)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }
}

/// Computes page and job scores from findings
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    weights: ScoreWeights,
}

impl ScoreEngine {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Scores one page's findings
    ///
    /// Each category starts at 100 and loses each of its penalties, floored
    /// at 0. The overall score decays as `100 * 0.95^total_penalty`; a page
    /// with no penalty scores exactly 100.
    pub fn score_page(&self, findings: &[Finding]) -> ScoreResult {
        let mut result = ScoreResult::perfect();
        let mut total_penalty = 0.0;

        for finding in findings.iter().filter(|f| !f.is_false_positive) {
            let penalty = self.weights.penalty(finding);
            total_penalty += penalty;

            let score = result.categories.entry(finding.category).or_insert(100.0);
            *score = (*score - penalty).max(0.0);

            *result.counts.entry(finding.severity).or_insert(0) += 1;
        }

        if total_penalty > 0.0 {
            result.overall = (100.0 * DECAY_BASE.powf(total_penalty)).clamp(0.0, 100.0);
        }

        result
    }

    /// Aggregates page scores into a job score
    ///
    /// Overall and per-category scores are arithmetic means; severity
    /// counts are summed. No pages means a perfect score.
    pub fn score_job(&self, pages: &[ScoreResult]) -> ScoreResult {
        if pages.is_empty() {
            return ScoreResult::perfect();
        }

        let n = pages.len() as f64;
        let overall = pages.iter().map(|p| p.overall).sum::<f64>() / n;

        let categories = Category::ALL
            .iter()
            .map(|cat| {
                let sum: f64 = pages.iter().map(|p| p.category(*cat)).sum();
                (*cat, sum / n)
            })
            .collect();

        let mut counts = BTreeMap::new();
        for page in pages {
            for (severity, count) in &page.counts {
                *counts.entry(*severity).or_insert(0) += count;
            }
        }

        ScoreResult {
            overall,
            categories,
            counts,
        }
    }
}
