use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::models::{
    Diagnostic, DiagnosticKind, Group, Judged, NewsItem, NotSelected, OracleExchange, RawArticle,
    Rejection, Selected, Stage,
};

/// Everything one keyword run has produced so far.
///
/// Stages only append: each one commits its own lists and advances `stage`,
/// leaving whatever earlier stages recorded untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub keyword: String,
    pub stage: Stage,
    pub started_at: String,
    pub finished_at: Option<String>,
    /// Collector output as numbered, never edited afterwards
    pub collected: Vec<NewsItem>,
    /// Trusted-outlet items with canonical press names
    pub working: Vec<NewsItem>,
    pub press_rejected: Vec<Rejection>,
    pub excluded: Vec<Judged>,
    pub borderline: Vec<Judged>,
    pub retained: Vec<Judged>,
    pub grouped: Vec<Group>,
    pub final_selection: Vec<Selected>,
    pub not_selected: Vec<NotSelected>,
    pub exchanges: Vec<OracleExchange>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineState {
    /// Number the collector's articles 1..=n and start a run.
    pub fn collected(keyword: impl Into<String>, articles: Vec<RawArticle>) -> Self {
        let collected = articles
            .into_iter()
            .enumerate()
            .map(|(i, article)| NewsItem {
                original_index: i + 1,
                content: article.content,
                url: article.url,
                date: article.date,
                press: article.press,
            })
            .collect();

        Self {
            keyword: keyword.into(),
            stage: Stage::Collected,
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            collected,
            working: Vec::new(),
            press_rejected: Vec::new(),
            excluded: Vec::new(),
            borderline: Vec::new(),
            retained: Vec::new(),
            grouped: Vec::new(),
            final_selection: Vec::new(),
            not_selected: Vec::new(),
            exchanges: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Fail unless the run sits exactly at `expected`.
    pub(crate) fn expect_stage(&self, expected: Stage) -> Result<()> {
        if self.stage != expected {
            bail!(
                "stage out of order for '{}': expected {}, found {}",
                self.keyword,
                expected,
                self.stage
            );
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self) -> Result<()> {
        match self.stage.next() {
            Some(next) => {
                debug!(keyword = %self.keyword, from = %self.stage, to = %next, "Stage advanced");
                self.stage = next;
                if next == Stage::Final {
                    self.finished_at = Some(chrono::Utc::now().to_rfc3339());
                }
                Ok(())
            }
            None => bail!("run for '{}' is already final", self.keyword),
        }
    }

    pub(crate) fn record(&mut self, stage: Stage, kind: DiagnosticKind, detail: impl Into<String>) {
        let detail = detail.into();
        match kind {
            DiagnosticKind::SourceMismatch | DiagnosticKind::InvalidReference => {
                debug!(keyword = %self.keyword, %stage, ?kind, %detail, "Degraded")
            }
            _ => warn!(keyword = %self.keyword, %stage, ?kind, %detail, "Degraded"),
        }
        self.diagnostics.push(Diagnostic {
            stage,
            kind,
            detail,
        });
    }

    pub fn is_final(&self) -> bool {
        self.stage == Stage::Final
    }

    pub fn working_item(&self, index: usize) -> Option<&NewsItem> {
        self.working.iter().find(|item| item.original_index == index)
    }

    pub fn working_indices(&self) -> BTreeSet<usize> {
        self.working.iter().map(|item| item.original_index).collect()
    }

    /// Items handed to the grouper: retained and borderline, by index.
    pub fn grouping_candidates(&self) -> Vec<&NewsItem> {
        let wanted: BTreeSet<usize> = self
            .retained
            .iter()
            .chain(self.borderline.iter())
            .map(|j| j.index)
            .collect();
        self.working
            .iter()
            .filter(|item| wanted.contains(&item.original_index))
            .collect()
    }

    /// Representatives handed to the importance selector, in group order.
    pub fn representatives(&self) -> Vec<&NewsItem> {
        self.grouped
            .iter()
            .filter_map(|group| self.working_item(group.selected_index))
            .collect()
    }

    /// Check the cross-stage invariants for every stage reached so far.
    pub fn validate(&self) -> Result<()> {
        let collected: BTreeSet<usize> = self.collected.iter().map(|i| i.original_index).collect();
        if collected.len() != self.collected.len() {
            bail!("duplicate original_index in collected items");
        }

        if self.stage >= Stage::Canonicalized {
            let working = self.working_indices();
            if !working.is_subset(&collected) {
                bail!("working set contains indices that were never collected");
            }
            for rejection in &self.press_rejected {
                if working.contains(&rejection.index) {
                    bail!("index {} is both trusted and rejected", rejection.index);
                }
            }
        }

        if self.stage >= Stage::Triaged {
            let mut seen = BTreeSet::new();
            for judged in self
                .excluded
                .iter()
                .chain(self.borderline.iter())
                .chain(self.retained.iter())
            {
                if !seen.insert(judged.index) {
                    bail!("index {} appears in more than one triage list", judged.index);
                }
            }
            if seen != self.working_indices() {
                bail!("triage lists do not cover the working set exactly");
            }
        }

        if self.stage >= Stage::Grouped {
            let expected: BTreeSet<usize> = self
                .grouping_candidates()
                .iter()
                .map(|item| item.original_index)
                .collect();
            let mut seen = BTreeSet::new();
            for group in &self.grouped {
                if !group.indices.contains(&group.selected_index) {
                    bail!(
                        "representative {} is not a member of its group",
                        group.selected_index
                    );
                }
                for &index in &group.indices {
                    if !seen.insert(index) {
                        bail!("index {} appears in more than one group", index);
                    }
                }
            }
            if seen != expected {
                bail!("groups do not partition the retained and borderline items");
            }
        }

        if self.stage >= Stage::Scored {
            let representatives: BTreeSet<usize> =
                self.grouped.iter().map(|g| g.selected_index).collect();
            let mut seen = BTreeSet::new();
            for index in self
                .final_selection
                .iter()
                .map(|s| s.index)
                .chain(self.not_selected.iter().map(|n| n.index))
            {
                if !representatives.contains(&index) {
                    bail!("index {} was scored but is not a representative", index);
                }
                if !seen.insert(index) {
                    bail!("index {} was scored twice", index);
                }
            }
            if seen != representatives {
                bail!("some representatives were never scored");
            }
        }

        Ok(())
    }
}
