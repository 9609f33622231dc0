//! Result file parsing and Markdown rendering.
//!
//! The reporter never fails on a result file. A missing file, an unreadable
//! one, malformed JSON and a report without the expected categories all
//! render as empty cells; [`ResultStatus`] keeps them apart in the logs so
//! "never ran" and "ran but produced garbage" can still be told apart.

use crate::pages::{result_file_name, PageRegistry};
use crate::types::{Category, FormFactor};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Cell text for a score that is not available
pub const NO_RESULT: &str = "—";

/// A category score as an integer percentage, 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(u8);

impl Score {
    /// Convert Lighthouse's 0..1 fraction: `round(fraction * 100)`, clamped.
    pub fn from_fraction(fraction: f64) -> Self {
        Self((fraction * 100.0).round().clamp(0.0, 100.0) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four category scores in column order; `None` is "no result", never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditScores {
    scores: [Option<Score>; 4],
}

impl AuditScores {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> Option<Score> {
        self.scores[category as usize]
    }

    pub fn set(&mut self, category: Category, score: Option<Score>) {
        self.scores[category as usize] = score;
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<Score>> + '_ {
        self.scores.iter().copied()
    }
}

/// Why a result file did or did not yield scores
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStatus {
    Loaded,
    /// No file: the audit never ran or failed before writing
    Missing,
    Unreadable(String),
    Malformed(String),
    /// Valid JSON without some of the four category objects
    IncompleteCategories(Vec<Category>),
}

impl ResultStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Missing => write!(f, "missing"),
            Self::Unreadable(e) => write!(f, "unreadable: {}", e),
            Self::Malformed(e) => write!(f, "malformed JSON: {}", e),
            Self::IncompleteCategories(missing) => {
                let ids: Vec<&str> = missing.iter().map(|c| c.id()).collect();
                write!(f, "missing categories: {}", ids.join(", "))
            }
        }
    }
}

/// Scores read from one result file, and how the read went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditResult {
    pub scores: AuditScores,
    pub status: ResultStatus,
}

impl AuditResult {
    fn empty(status: ResultStatus) -> Self {
        Self {
            scores: AuditScores::none(),
            status,
        }
    }
}

/// The slice of Lighthouse's JSON report lhaudit reads.
///
/// Category objects stay untyped so one odd `score` (a string, an object)
/// costs only its own cell instead of the whole file.
#[derive(Debug, Deserialize)]
struct LighthouseReport {
    #[serde(default)]
    categories: HashMap<String, Value>,
}

impl LighthouseReport {
    fn score(&self, category: Category) -> Option<Score> {
        self.categories
            .get(category.id())
            .and_then(|c| c.get("score"))
            .and_then(Value::as_f64)
            .map(Score::from_fraction)
    }
}

/// Read one result file. Never fails; problems are reported through the status.
pub fn load_result(path: &Path) -> AuditResult {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no result file at {}", path.display());
            return AuditResult::empty(ResultStatus::Missing);
        }
        Err(e) => {
            let status = ResultStatus::Unreadable(e.to_string());
            warn!("{}: {}", path.display(), status);
            return AuditResult::empty(status);
        }
    };

    let result = parse_result(&content);
    if !result.status.is_loaded() {
        warn!("{}: {}", path.display(), result.status);
    }
    result
}

/// Parse the text of a Lighthouse JSON report.
///
/// All-or-nothing per file: unless every category key is present, all
/// four cells come back empty. A present category whose score is null or
/// not a number leaves just that cell empty.
pub fn parse_result(content: &str) -> AuditResult {
    let report: LighthouseReport = match serde_json::from_str(content) {
        Ok(report) => report,
        Err(e) => return AuditResult::empty(ResultStatus::Malformed(e.to_string())),
    };

    let missing: Vec<Category> = Category::all()
        .into_iter()
        .filter(|c| !report.categories.contains_key(c.id()))
        .collect();
    if !missing.is_empty() {
        return AuditResult::empty(ResultStatus::IncompleteCategories(missing));
    }

    let mut scores = AuditScores::none();
    for category in Category::all() {
        scores.set(category, report.score(category));
    }

    AuditResult {
        scores,
        status: ResultStatus::Loaded,
    }
}

/// One table row: a page and both of its audits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub label: String,
    pub url: String,
    pub desktop: AuditResult,
    pub mobile: AuditResult,
}

impl ReportRow {
    pub fn result(&self, form_factor: FormFactor) -> &AuditResult {
        match form_factor {
            FormFactor::Desktop => &self.desktop,
            FormFactor::Mobile => &self.mobile,
        }
    }
}

/// Read every page's result files from `dir`, in registry order
pub fn build_report(registry: &PageRegistry, base_url: &str, dir: &Path) -> Vec<ReportRow> {
    registry
        .iter()
        .map(|page| ReportRow {
            label: page.label.clone(),
            url: page.url(base_url),
            desktop: load_result(&dir.join(result_file_name(page, FormFactor::Desktop))),
            mobile: load_result(&dir.join(result_file_name(page, FormFactor::Mobile))),
        })
        .collect()
}

/// Render rows as a Markdown pipe table
pub fn render_markdown(rows: &[ReportRow]) -> String {
    let mut header = vec!["Page".to_string(), "URL".to_string()];
    for form_factor in FormFactor::all() {
        for category in Category::all() {
            header.push(format!("{} {}", form_factor.title(), category.short_label()));
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header);
    push_row(&mut out, &vec!["---".to_string(); header.len()]);

    for row in rows {
        let mut cells = vec![escape_cell(&row.label), escape_cell(&row.url)];
        for form_factor in FormFactor::all() {
            cells.extend(row.result(form_factor).scores.iter().map(|score| {
                score
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| NO_RESULT.to_string())
            }));
        }
        push_row(&mut out, &cells);
    }
    out
}

fn push_row(out: &mut String, cells: &[String]) {
    out.push_str("| ");
    out.push_str(&cells.join(" | "));
    out.push_str(" |\n");
}

/// A cell must stay on one line and must not close itself early
fn escape_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}
