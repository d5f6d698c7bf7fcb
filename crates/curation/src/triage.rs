use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::criteria::Criteria;
use crate::lenient;
use crate::models::{DiagnosticKind, Judged, NewsItem, Stage, TriageLabel, NO_JUDGMENT};
use crate::oracle::{consult, Oracle};
use crate::policy::CurationPolicy;
use crate::state::PipelineState;

#[derive(Debug, Deserialize)]
pub struct TriageResponse {
    pub judgments: Vec<RawJudgment>,
}

#[derive(Debug, Deserialize)]
pub struct RawJudgment {
    #[serde(default, deserialize_with = "lenient::index")]
    pub index: Option<usize>,
    #[serde(default, alias = "decision", deserialize_with = "lenient::text")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub reason: String,
}

/// The working set split three ways, plus what the oracle got wrong
#[derive(Debug, Default)]
pub struct TriageOutcome {
    pub excluded: Vec<Judged>,
    pub borderline: Vec<Judged>,
    pub retained: Vec<Judged>,
    pub invalid: Vec<String>,
}

pub fn build_prompt(items: &[NewsItem], exclusion_criteria: &str) -> String {
    let news_list = items
        .iter()
        .map(|item| format!("{}. {} ({})", item.original_index, item.content, item.press))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"아래 뉴스 목록을 제외 기준에 따라 제외(exclude), 보류(borderline), 유지(retain) 중 하나로 분류하세요.

[제외 기준]
{}

[분류 기준]
- exclude: 제외 기준에 명확히 해당하는 뉴스
- borderline: 제외 기준에 일부 해당하지만 회계법인 관점에서 판단이 애매한 뉴스
- retain: 제외 기준에 해당하지 않는 뉴스

[뉴스 목록]
{}

[응답 형식]
다음과 같은 JSON 형식으로 응답해주세요:

{{
  "judgments": [
    {{"index": 1, "label": "exclude", "reason": "제외 사유"}},
    {{"index": 2, "label": "borderline", "reason": "보류 사유"}},
    {{"index": 3, "label": "retain", "reason": "유지 사유"}}
  ]
}}

목록의 모든 인덱스가 정확히 한 번씩 포함되어야 합니다."#,
        exclusion_criteria, news_list
    )
}

/// Turn the oracle's judgments into a partition of `items`.
///
/// Unknown indices are dropped, the first readable label for an index wins,
/// and anything left without a label is retained.
pub fn apply(items: &[NewsItem], judgments: &[RawJudgment]) -> TriageOutcome {
    let submitted: BTreeMap<usize, &NewsItem> =
        items.iter().map(|item| (item.original_index, item)).collect();
    let mut verdicts: BTreeMap<usize, (TriageLabel, String)> = BTreeMap::new();
    let mut outcome = TriageOutcome::default();

    for judgment in judgments {
        let Some(index) = judgment.index else {
            outcome.invalid.push("judgment without a readable index".to_string());
            continue;
        };
        if !submitted.contains_key(&index) {
            outcome.invalid.push(format!("#{} was not submitted", index));
            continue;
        }
        let Some(label) = TriageLabel::parse(&judgment.label) else {
            continue;
        };
        verdicts
            .entry(index)
            .or_insert_with(|| (label, judgment.reason.clone()));
    }

    for (index, item) in submitted {
        let (label, reason) = verdicts
            .remove(&index)
            .unwrap_or_else(|| (TriageLabel::Retain, NO_JUDGMENT.to_string()));
        let judged = Judged {
            index,
            title: item.content.clone(),
            press: item.press.clone(),
            reason,
        };
        match label {
            TriageLabel::Exclude => outcome.excluded.push(judged),
            TriageLabel::Borderline => outcome.borderline.push(judged),
            TriageLabel::Retain => outcome.retained.push(judged),
        }
    }

    outcome
}

/// Classify the working set into excluded, borderline and retained.
pub async fn triage(
    state: &mut PipelineState,
    oracle: &dyn Oracle,
    policy: &CurationPolicy,
) -> Result<()> {
    state.expect_stage(Stage::Canonicalized)?;

    let judgments = if state.working.is_empty() {
        Vec::new()
    } else {
        let criteria = Criteria::for_company(policy, &state.keyword);
        let prompt = build_prompt(&state.working, &criteria.exclusion);
        consult::<TriageResponse>(oracle, Stage::Triaged, &policy.prompts.triage, prompt)
            .await
            .settle(state)
            .map(|response| response.judgments)
            .unwrap_or_default()
    };

    let outcome = apply(&state.working, &judgments);
    for detail in &outcome.invalid {
        state.record(Stage::Triaged, DiagnosticKind::InvalidReference, detail.clone());
    }

    info!(
        keyword = %state.keyword,
        excluded = outcome.excluded.len(),
        borderline = outcome.borderline.len(),
        retained = outcome.retained.len(),
        "Triage complete"
    );

    state.excluded = outcome.excluded;
    state.borderline = outcome.borderline;
    state.retained = outcome.retained;
    state.advance()
}
