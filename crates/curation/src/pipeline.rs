use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

use crate::collector::Collector;
use crate::grouping::group;
use crate::importance::score;
use crate::models::{RawArticle, Stage};
use crate::oracle::Oracle;
use crate::policy::CurationPolicy;
use crate::press::filter_trusted;
use crate::state::PipelineState;
use crate::triage::triage;

pub const DEFAULT_CONCURRENCY: usize = 2;

/// Drives keyword runs through every stage with one oracle and one policy.
///
/// Cloning is cheap; clones share the oracle client and the policy.
#[derive(Clone)]
pub struct Pipeline {
    oracle: Arc<dyn Oracle>,
    policy: Arc<CurationPolicy>,
}

impl Pipeline {
    pub fn new(oracle: Arc<dyn Oracle>, policy: impl Into<Arc<CurationPolicy>>) -> Self {
        Self {
            oracle,
            policy: policy.into(),
        }
    }

    pub fn policy(&self) -> &CurationPolicy {
        &self.policy
    }

    /// Run the stage that follows `state.stage` and return the new stage.
    pub async fn step(&self, state: &mut PipelineState) -> Result<Stage> {
        let oracle = self.oracle.as_ref();
        match state.stage {
            Stage::Collected => filter_trusted(state, &self.policy.trusted_press)?,
            Stage::Canonicalized => triage(state, oracle, &self.policy).await?,
            Stage::Triaged => group(state, oracle, &self.policy).await?,
            Stage::Grouped => score(state, oracle, &self.policy).await?,
            Stage::Scored => {
                if let Err(e) = state.validate() {
                    error!(keyword = %state.keyword, error = %e, "Run finished with inconsistent state");
                }
                state.advance()?;
            }
            Stage::Final => bail!("run for '{}' is already final", state.keyword),
        }
        Ok(state.stage)
    }

    /// Step until the run is final.
    pub async fn drive(&self, state: &mut PipelineState) -> Result<()> {
        while !state.is_final() {
            self.step(state).await?;
        }
        info!(
            keyword = %state.keyword,
            collected = state.collected.len(),
            selected = state.final_selection.len(),
            degraded = state.diagnostics.len(),
            "Run complete"
        );
        Ok(())
    }

    pub async fn run(&self, keyword: &str, articles: Vec<RawArticle>) -> Result<PipelineState> {
        let mut state = PipelineState::collected(keyword, articles);
        self.drive(&mut state).await?;
        Ok(state)
    }

    pub async fn collect_and_run(
        &self,
        collector: &dyn Collector,
        keyword: &str,
        max_results: usize,
    ) -> Result<PipelineState> {
        let articles = collector.collect(keyword, max_results).await;
        self.run(keyword, articles).await
    }

    /// Run several keywords, at most `concurrency` at a time. Results come back
    /// in keyword order.
    pub async fn run_many(
        &self,
        collector: &dyn Collector,
        keywords: &[String],
        max_results: usize,
        concurrency: usize,
    ) -> Vec<(String, Result<PipelineState>)> {
        stream::iter(keywords)
            .map(|keyword| async move {
                let result = self.collect_and_run(collector, keyword, max_results).await;
                (keyword.clone(), result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosticKind, NO_JUDGMENT};
    use crate::oracle::scripted::ScriptedOracle;
    use async_trait::async_trait;

    fn articles() -> Vec<RawArticle> {
        vec![
            RawArticle::new("LG전자 2분기 실적 발표", "u1", "2025-10-14", "한국경제"),
            RawArticle::new("LG전자 실적, 시장 기대 상회", "u2", "2025-10-14", "연합뉴스"),
            RawArticle::new("LG트윈스 우승", "u3", "2025-10-13", "스포츠매체"),
            RawArticle::new("LG화학 지분 매각 검토", "u4", "2025-10-12", "매일경제"),
        ]
    }

    const TRIAGE: &str = r#"{"judgments": [
        {"index": 1, "label": "retain", "reason": "실적"},
        {"index": 2, "label": "retain", "reason": "실적"},
        {"index": 4, "label": "retain", "reason": "지분 거래"}
    ]}"#;
    const GROUPING: &str = r#"{"groups": [{"indices": [1, 2], "selected_index": 1, "reason": "같은 실적 기사"}]}"#;
    const IMPORTANCE: &str = r#"{"final_selection": [
        {"index": 4, "importance": "high", "reason": "M&A", "keywords": ["지분"], "affiliates": ["LG화학"]}
    ], "not_selected": [{"index": 1, "importance": "medium", "reason": "일반 실적"}]}"#;

    fn pipeline(oracle: Arc<ScriptedOracle>) -> Pipeline {
        Pipeline::new(oracle, CurationPolicy::default())
    }

    #[tokio::test]
    async fn test_run_reaches_final() {
        let oracle = Arc::new(ScriptedOracle::replying(&[TRIAGE, GROUPING, IMPORTANCE]));
        let state = pipeline(oracle.clone()).run("LG", articles()).await.unwrap();

        assert!(state.is_final());
        assert_eq!(oracle.calls(), 3);
        assert_eq!(state.press_rejected.len(), 1);
        assert_eq!(state.grouped.len(), 2);
        assert_eq!(state.final_selection[0].index, 4);
        assert_eq!(state.final_selection[0].affiliates, vec!["LG화학"]);
        assert_eq!(state.not_selected[0].index, 1);
        assert_eq!(state.exchanges.len(), 3);
        state.validate().unwrap();
    }

    #[tokio::test]
    async fn test_run_with_dead_oracle_still_finishes() {
        let oracle = Arc::new(ScriptedOracle::replying(&[]));
        let state = pipeline(oracle).run("LG", articles()).await.unwrap();

        assert!(state.is_final());
        assert_eq!(state.retained.len(), 3);
        assert_eq!(state.grouped.len(), 3);
        assert!(state.final_selection.is_empty());
        assert!(state.not_selected.iter().all(|n| n.reason == NO_JUDGMENT));
        let unavailable = state
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::OracleUnavailable)
            .count();
        assert_eq!(unavailable, 3);
        state.validate().unwrap();
    }

    #[tokio::test]
    async fn test_no_trusted_articles_is_empty_result() {
        let oracle = Arc::new(ScriptedOracle::replying(&[]));
        let raw = vec![RawArticle::new("기사", "u", "", "개인블로그")];
        let state = pipeline(oracle.clone()).run("LG", raw).await.unwrap();

        assert!(state.is_final());
        assert!(state.working.is_empty());
        assert!(state.final_selection.is_empty());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_step_resumes_from_stage_boundary() {
        let oracle = Arc::new(ScriptedOracle::replying(&[TRIAGE, GROUPING, IMPORTANCE]));
        let pipeline = pipeline(oracle);
        let mut state = PipelineState::collected("LG", articles());

        assert_eq!(pipeline.step(&mut state).await.unwrap(), Stage::Canonicalized);
        assert_eq!(pipeline.step(&mut state).await.unwrap(), Stage::Triaged);
        state.validate().unwrap();

        pipeline.drive(&mut state).await.unwrap();
        assert!(state.is_final());
        assert!(pipeline.step(&mut state).await.is_err());
    }

    struct FixedCollector;

    #[async_trait]
    impl Collector for FixedCollector {
        async fn collect(&self, keyword: &str, max_results: usize) -> Vec<RawArticle> {
            let mut list = vec![RawArticle::new(format!("{} 기사", keyword), "u", "", "뉴시스")];
            list.truncate(max_results);
            list
        }
    }

    #[tokio::test]
    async fn test_run_many_keeps_keyword_order() {
        let oracle = Arc::new(ScriptedOracle::replying(&[]));
        let keywords = vec!["삼성".to_string(), "SK".to_string(), "LG".to_string()];

        let results = pipeline(oracle)
            .run_many(&FixedCollector, &keywords, 10, 2)
            .await;

        let order: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(order, vec!["삼성", "SK", "LG"]);
        for (keyword, result) in &results {
            let state = result.as_ref().unwrap();
            assert_eq!(&state.keyword, keyword);
            assert_eq!(state.working.len(), 1);
            assert!(state.is_final());
        }
    }
}
