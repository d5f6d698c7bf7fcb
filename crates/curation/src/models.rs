use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Reason recorded when the oracle said nothing about an item.
pub const NO_JUDGMENT: &str = "no judgment returned";

/// Reason recorded for selections beyond the configured cap.
pub const CAP_EXCEEDED: &str = "selection cap exceeded";

/// An article as handed over by a collector, before it is numbered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub press: String,
}

impl RawArticle {
    pub fn new(
        content: impl Into<String>,
        url: impl Into<String>,
        date: impl Into<String>,
        press: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
            date: date.into(),
            press: press.into(),
        }
    }
}

/// One collected article, numbered once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub original_index: usize,
    pub content: String,
    pub url: String,
    pub date: String,
    pub press: String,
}

impl NewsItem {
    pub fn title(&self) -> &str {
        &self.content
    }
}

/// An item dropped before triage because its outlet is not trusted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub index: usize,
    pub title: String,
    pub reason: String,
}

/// A triage verdict on one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judged {
    pub index: usize,
    pub title: String,
    pub press: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageLabel {
    Exclude,
    Borderline,
    Retain,
}

impl TriageLabel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "exclude" | "excluded" | "drop" | "제외" => Some(Self::Exclude),
            "borderline" | "hold" | "보류" => Some(Self::Borderline),
            "retain" | "retained" | "keep" | "유지" => Some(Self::Retain),
            _ => None,
        }
    }
}

/// A cluster of articles covering the same event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub indices: BTreeSet<usize>,
    pub selected_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" | "상" => Some(Self::High),
            "medium" | "mid" | "중" => Some(Self::Medium),
            "low" | "하" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        };
        f.write_str(label)
    }
}

/// A representative that made the final cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selected {
    pub index: usize,
    pub title: String,
    pub date: String,
    pub url: String,
    pub press: String,
    pub reason: String,
    pub keywords: Vec<String>,
    pub affiliates: Vec<String>,
    pub importance: Importance,
}

/// A representative that did not make the final cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotSelected {
    pub index: usize,
    pub title: String,
    pub importance: Option<Importance>,
    pub reason: String,
}

/// Position of a run in its linear lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Collected,
    Canonicalized,
    Triaged,
    Grouped,
    Scored,
    Final,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Collected => Some(Stage::Canonicalized),
            Stage::Canonicalized => Some(Stage::Triaged),
            Stage::Triaged => Some(Stage::Grouped),
            Stage::Grouped => Some(Stage::Scored),
            Stage::Scored => Some(Stage::Final),
            Stage::Final => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Collected => "collected",
            Stage::Canonicalized => "canonicalized",
            Stage::Triaged => "triaged",
            Stage::Grouped => "grouped",
            Stage::Scored => "scored",
            Stage::Final => "final",
        };
        f.write_str(name)
    }
}

/// Non-fatal degradations a run can go through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SourceMismatch,
    OracleUnavailable,
    MalformedResponse,
    InvalidReference,
    CapacityExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    pub detail: String,
}

/// What was asked of the oracle during a stage and what came back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleExchange {
    pub stage: Stage,
    pub system_prompt: String,
    pub user_prompt: String,
    pub response: Option<String>,
    pub error: Option<String>,
}
