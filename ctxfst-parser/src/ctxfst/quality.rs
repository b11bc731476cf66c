//! Retrieval quality heuristics
//!
//! Checks run over assembled, declared records before they are handed to a vector
//! store. They look for things that make retrieval worse rather than things that make a
//! document invalid:
//!
//! - context quality: missing, too short, too long, or just a copy of the content opener
//! - semantic similarity: pairs of chunks whose keywords overlap so much that retrieval
//!   will confuse them
//! - tag overlap: tags present nearly everywhere, chunks with identical tag sets
//! - id naming: ids outside the grammar, category prefixes used only once
//!
//! Similarity is keyword Jaccard similarity (words of three or more ASCII letters,
//! lowercased), a cheap stand-in for embedding distance.

use crate::ctxfst::ast::identifier::{category, is_valid_identifier};
use crate::ctxfst::ast::{DiagnosticSeverity, ResolvedChunkRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::str::FromStr;

static KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("keyword pattern is a valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    SemanticSimilarity,
    ContextQuality,
    TagOverlap,
    IdNaming,
    Structure,
}

impl IssueCategory {
    pub fn title(&self) -> &'static str {
        match self {
            IssueCategory::SemanticSimilarity => "Semantic Similarity",
            IssueCategory::ContextQuality => "Context Quality",
            IssueCategory::TagOverlap => "Tag Overlap",
            IssueCategory::IdNaming => "ID Naming",
            IssueCategory::Structure => "Structure",
        }
    }
}

/// How much of each issue to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// Problems only
    #[default]
    Diagnose,
    /// Problems and suggestions
    Suggest,
    /// Problems, suggestions and proposed preamble patches
    Fix,
}

impl QualityLevel {
    fn shows_suggestions(self) -> bool {
        matches!(self, QualityLevel::Suggest | QualityLevel::Fix)
    }

    fn shows_fixes(self) -> bool {
        self == QualityLevel::Fix
    }
}

impl FromStr for QualityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diagnose" => Ok(QualityLevel::Diagnose),
            "suggest" => Ok(QualityLevel::Suggest),
            "fix" => Ok(QualityLevel::Fix),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    pub category: IssueCategory,
    pub severity: DiagnosticSeverity,
    pub chunk_ids: Vec<String>,
    pub message: String,
    pub suggestion: String,
    /// Proposed preamble field values, keyed by field name
    pub fix: BTreeMap<String, String>,
}

impl QualityIssue {
    fn new(
        category: IssueCategory,
        severity: DiagnosticSeverity,
        chunk_ids: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            chunk_ids,
            message: message.into(),
            suggestion: String::new(),
            fix: BTreeMap::new(),
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    fn with_fix(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fix.insert(field.to_string(), value.into());
        self
    }
}

/// Tunable limits, the `[diagnose]` section of the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub similarity: f64,
    pub min_context_words: usize,
    pub max_context_words: usize,
    pub optimal_min_words: usize,
    pub optimal_max_words: usize,
    /// Words of content compared against the context
    pub opener_words: usize,
    pub opener_overlap: f64,
    /// Share of chunks a tag must appear in to count as ubiquitous
    pub ubiquitous_tag_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            similarity: 0.6,
            min_context_words: 8,
            max_context_words: 50,
            optimal_min_words: 12,
            optimal_max_words: 30,
            opener_words: 15,
            opener_overlap: 0.7,
            ubiquitous_tag_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityStats {
    pub chunk_count: usize,
    pub avg_context_words: f64,
    pub unique_tags: usize,
    pub categories: Vec<String>,
    pub issues_by_severity: SeverityCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub stats: QualityStats,
    pub issues: Vec<QualityIssue>,
}

fn keywords(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    KEYWORD
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.union(b).count();
    shared as f64 / union as f64
}

fn context_of(record: &ResolvedChunkRecord) -> &str {
    record.context().unwrap_or("")
}

fn check_semantic_similarity(
    records: &[&ResolvedChunkRecord],
    thresholds: &QualityThresholds,
) -> Vec<QualityIssue> {
    let tokens: Vec<HashSet<String>> = records
        .iter()
        .map(|r| keywords(&format!("{} {}", context_of(r), r.content)))
        .collect();

    let mut issues = Vec::new();
    for (i, a) in records.iter().enumerate() {
        for (j, b) in records.iter().enumerate().skip(i + 1) {
            let similarity = jaccard(&tokens[i], &tokens[j]);
            if similarity < thresholds.similarity {
                continue;
            }
            let shared: BTreeSet<&String> = tokens[i].intersection(&tokens[j]).collect();
            let shared: Vec<&str> = shared.into_iter().take(10).map(String::as_str).collect();
            issues.push(
                QualityIssue::new(
                    IssueCategory::SemanticSimilarity,
                    DiagnosticSeverity::Warning,
                    vec![a.id.clone(), b.id.clone()],
                    format!(
                        "Chunks may confuse retrieval (similarity: {:.0}%). Shared keywords: {}",
                        similarity * 100.0,
                        shared.join(", ")
                    ),
                )
                .suggest(format!(
                    "Differentiate contexts: emphasize what makes '{}' unique vs '{}'. Consider different use cases or examples.",
                    a.id, b.id
                )),
            );
        }
    }
    issues
}

fn check_context_quality(
    records: &[&ResolvedChunkRecord],
    thresholds: &QualityThresholds,
) -> Vec<QualityIssue> {
    let optimal = format!(
        "recommend {}-{}",
        thresholds.optimal_min_words, thresholds.optimal_max_words
    );
    let mut issues = Vec::new();

    for record in records {
        let context = context_of(record);
        let words = context.split_whitespace().count();
        let ids = vec![record.id.clone()];

        if words == 0 {
            issues.push(
                QualityIssue::new(
                    IssueCategory::ContextQuality,
                    DiagnosticSeverity::Error,
                    ids,
                    "Context is empty",
                )
                .suggest("Add a 15-25 word description that explains what this chunk covers and how it differs from other chunks.")
                .with_fix(
                    "context",
                    format!("[TODO: Describe the purpose and unique aspects of {}]", record.id),
                ),
            );
            continue;
        }

        if words < thresholds.min_context_words {
            issues.push(
                QualityIssue::new(
                    IssueCategory::ContextQuality,
                    DiagnosticSeverity::Warning,
                    ids.clone(),
                    format!("Context too short ({} words, {})", words, optimal),
                )
                .suggest("Expand context with: what topic this covers, who would search for it, and what makes it distinct from similar chunks."),
            );
        }

        if words > thresholds.max_context_words {
            issues.push(
                QualityIssue::new(
                    IssueCategory::ContextQuality,
                    DiagnosticSeverity::Information,
                    ids.clone(),
                    format!("Context may be too verbose ({} words, {})", words, optimal),
                )
                .suggest("Consider condensing to key differentiating information only."),
            );
        }

        if !record.content.is_empty() {
            let opener: Vec<&str> = record
                .content
                .split_whitespace()
                .take(thresholds.opener_words)
                .collect();
            let context_tokens = keywords(context);
            let opener_tokens = keywords(&opener.join(" "));
            if jaccard(&context_tokens, &opener_tokens) > thresholds.opener_overlap {
                issues.push(
                    QualityIssue::new(
                        IssueCategory::ContextQuality,
                        DiagnosticSeverity::Warning,
                        ids,
                        "Context appears to just repeat the content opening",
                    )
                    .suggest("Rewrite context to explain the chunk's role in the document rather than summarizing its content."),
                );
            }
        }
    }

    issues
}

fn check_tag_overlap(
    records: &[&ResolvedChunkRecord],
    thresholds: &QualityThresholds,
) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if records.len() < 2 {
        return issues;
    }

    // Tag counts, in first-seen order
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut tag_sets: Vec<(BTreeSet<&str>, Vec<String>)> = Vec::new();

    for record in records {
        let tags: BTreeSet<&str> = record.tags().iter().map(String::as_str).collect();
        for &tag in &tags {
            let count = counts.entry(tag).or_insert(0);
            if *count == 0 {
                order.push(tag);
            }
            *count += 1;
        }
        match tag_sets.iter_mut().find(|(set, _)| *set == tags) {
            Some((_, ids)) => ids.push(record.id.clone()),
            None => tag_sets.push((tags, vec![record.id.clone()])),
        }
    }

    let threshold = records.len() as f64 * thresholds.ubiquitous_tag_ratio;
    let ubiquitous: Vec<&str> = order
        .into_iter()
        .filter(|tag| counts[tag] as f64 >= threshold)
        .collect();

    if ubiquitous.len() > 1 {
        issues.push(
            QualityIssue::new(
                IssueCategory::TagOverlap,
                DiagnosticSeverity::Information,
                records.iter().map(|r| r.id.clone()).collect(),
                format!(
                    "Tags appear in most chunks, reducing filtering effectiveness: {}",
                    ubiquitous.join(", ")
                ),
            )
            .suggest("Consider using more specific sub-tags or adding differentiating tags to enable precise filtering."),
        );
    }

    for (tags, ids) in tag_sets {
        if ids.len() > 1 && !tags.is_empty() {
            let tags: Vec<&str> = tags.into_iter().collect();
            issues.push(
                QualityIssue::new(
                    IssueCategory::TagOverlap,
                    DiagnosticSeverity::Warning,
                    ids,
                    format!("Identical tags: [{}]", tags.join(", ")),
                )
                .suggest("Add differentiating tags to each chunk based on their specific focus (e.g., level:beginner vs level:advanced, or use:api vs use:cli)."),
            );
        }
    }

    issues
}

fn check_id_naming(records: &[&ResolvedChunkRecord]) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let mut categories: Vec<(&str, usize)> = Vec::new();

    for record in records {
        if !is_valid_identifier(&record.id) {
            issues.push(
                QualityIssue::new(
                    IssueCategory::IdNaming,
                    DiagnosticSeverity::Warning,
                    vec![record.id.clone()],
                    "ID format should be 'category:topic-name' (lowercase, kebab-case)",
                )
                .suggest("Rename to follow pattern, e.g., 'skill:python-async'"),
            );
            continue;
        }
        if let Some(prefix) = category(&record.id) {
            match categories.iter_mut().find(|(name, _)| *name == prefix) {
                Some((_, count)) => *count += 1,
                None => categories.push((prefix, 1)),
            }
        }
    }

    let singletons: Vec<&str> = categories
        .iter()
        .filter(|(_, count)| *count == 1)
        .map(|(name, _)| *name)
        .collect();

    if categories.len() > 1 && !singletons.is_empty() && singletons.len() < categories.len() {
        issues.push(
            QualityIssue::new(
                IssueCategory::IdNaming,
                DiagnosticSeverity::Information,
                records
                    .iter()
                    .filter(|r| category(&r.id).is_some_and(|c| singletons.contains(&c)))
                    .map(|r| r.id.clone())
                    .collect(),
                format!("Uncommon category prefixes: {}", singletons.join(", ")),
            )
            .suggest("Consider grouping related chunks under the same category prefix for better organization."),
        );
    }

    issues
}

fn count_severities(issues: &[QualityIssue]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for issue in issues {
        match issue.severity {
            DiagnosticSeverity::Error => counts.error += 1,
            DiagnosticSeverity::Warning => counts.warning += 1,
            DiagnosticSeverity::Information => counts.info += 1,
        }
    }
    counts
}

/// Run every quality check over the declared records of one document
pub fn analyze(
    records: &[ResolvedChunkRecord],
    source: Option<&str>,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let declared: Vec<&ResolvedChunkRecord> = records.iter().filter(|r| r.is_declared()).collect();

    if declared.is_empty() {
        let issues = vec![QualityIssue::new(
            IssueCategory::Structure,
            DiagnosticSeverity::Error,
            Vec::new(),
            "No valid chunks found in document",
        )];
        return QualityReport {
            source: source.map(str::to_string),
            stats: QualityStats {
                chunk_count: 0,
                avg_context_words: 0.0,
                unique_tags: 0,
                categories: Vec::new(),
                issues_by_severity: count_severities(&issues),
            },
            issues,
        };
    }

    let mut issues = Vec::new();
    issues.extend(check_semantic_similarity(&declared, thresholds));
    issues.extend(check_context_quality(&declared, thresholds));
    issues.extend(check_tag_overlap(&declared, thresholds));
    issues.extend(check_id_naming(&declared));

    let total_words: usize = declared
        .iter()
        .map(|r| context_of(r).split_whitespace().count())
        .sum();
    let unique_tags: HashSet<&str> = declared
        .iter()
        .flat_map(|r| r.tags().iter().map(String::as_str))
        .collect();
    let categories: BTreeSet<&str> = declared.iter().filter_map(|r| category(&r.id)).collect();

    tracing::debug!(chunks = declared.len(), issues = issues.len(), "quality analysis done");

    QualityReport {
        source: source.map(str::to_string),
        stats: QualityStats {
            chunk_count: declared.len(),
            avg_context_words: total_words as f64 / declared.len() as f64,
            unique_tags: unique_tags.len(),
            categories: categories.into_iter().map(str::to_string).collect(),
            issues_by_severity: count_severities(&issues),
        },
        issues,
    }
}

impl QualityReport {
    pub fn has_errors(&self) -> bool {
        self.stats.issues_by_severity.error > 0
    }

    /// Proposed preamble patches, merged per chunk id
    pub fn fixes(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut fixes: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for issue in self.issues.iter().filter(|i| !i.fix.is_empty()) {
            for id in &issue.chunk_ids {
                fixes
                    .entry(id.clone())
                    .or_default()
                    .extend(issue.fix.clone());
            }
        }
        fixes
    }

    /// JSON view with suggestion and fix fields filtered by `level`
    pub fn to_json_value(&self, level: QualityLevel) -> serde_json::Value {
        let issues: Vec<serde_json::Value> = self
            .issues
            .iter()
            .map(|issue| {
                let mut value = serde_json::json!({
                    "category": issue.category,
                    "severity": issue.severity,
                    "chunk_ids": issue.chunk_ids,
                    "message": issue.message,
                });
                if level.shows_suggestions() {
                    value["suggestion"] = serde_json::json!(issue.suggestion);
                }
                if level.shows_fixes() && !issue.fix.is_empty() {
                    value["fix"] = serde_json::json!(issue.fix);
                }
                value
            })
            .collect();

        serde_json::json!({
            "source": self.source,
            "stats": self.stats,
            "issues": issues,
        })
    }

    /// Human-readable report
    pub fn render_text(&self, level: QualityLevel) -> String {
        let mut lines = vec![
            self.source.clone().unwrap_or_else(|| "<input>".to_string()),
            format!(
                "   Chunks: {} | Tags: {} | Categories: {}",
                self.stats.chunk_count,
                self.stats.unique_tags,
                self.stats.categories.join(", ")
            ),
            String::new(),
        ];

        if self.issues.is_empty() {
            lines.push("No issues found".to_string());
            return lines.join("\n");
        }

        let mut categories: Vec<IssueCategory> = Vec::new();
        for issue in &self.issues {
            if !categories.contains(&issue.category) {
                categories.push(issue.category);
            }
        }

        for category in categories {
            lines.push(category.title().to_string());
            lines.push("-".repeat(40));
            for issue in self.issues.iter().filter(|i| i.category == category) {
                let chunks = if issue.chunk_ids.is_empty() {
                    "document".to_string()
                } else {
                    issue.chunk_ids.join(", ")
                };
                lines.push(format!("  {} [{}]", issue.severity, chunks));
                lines.push(format!("     {}", issue.message));
                if level.shows_suggestions() && !issue.suggestion.is_empty() {
                    lines.push(format!("     suggestion: {}", issue.suggestion));
                }
                if level.shows_fixes() && !issue.fix.is_empty() {
                    let fix = serde_json::to_string(&issue.fix).unwrap_or_default();
                    lines.push(format!("     fix: {}", fix));
                }
                lines.push(String::new());
            }
        }

        let counts = self.stats.issues_by_severity;
        lines.push("=".repeat(50));
        lines.push(format!(
            "Summary: {} error(s), {} warning(s), {} info",
            counts.error, counts.warning, counts.info
        ));
        lines.join("\n")
    }
}
