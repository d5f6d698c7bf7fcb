use anyhow::Result;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::criteria::Criteria;
use crate::lenient;
use crate::models::{
    DiagnosticKind, Importance, NewsItem, NotSelected, Selected, Stage, CAP_EXCEEDED, NO_JUDGMENT,
};
use crate::oracle::{consult, Oracle};
use crate::policy::CurationPolicy;
use crate::state::PipelineState;

/// The oracle's verdict. Either list may be missing, but not both.
#[derive(Debug, Default, Deserialize)]
#[serde(try_from = "ImportanceReply")]
pub struct ImportanceResponse {
    pub final_selection: Vec<RawPick>,
    pub not_selected: Vec<RawPick>,
}

#[derive(Debug, Deserialize)]
struct ImportanceReply {
    #[serde(default, alias = "selected_news")]
    final_selection: Option<Vec<RawPick>>,
    #[serde(default, alias = "not_selected_news")]
    not_selected: Option<Vec<RawPick>>,
}

impl TryFrom<ImportanceReply> for ImportanceResponse {
    type Error = String;

    fn try_from(reply: ImportanceReply) -> Result<Self, Self::Error> {
        if reply.final_selection.is_none() && reply.not_selected.is_none() {
            return Err("neither final_selection nor not_selected present".to_string());
        }
        Ok(Self {
            final_selection: reply.final_selection.unwrap_or_default(),
            not_selected: reply.not_selected.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPick {
    #[serde(default, deserialize_with = "lenient::index")]
    pub index: Option<usize>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub importance: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub affiliates: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SelectionOutcome {
    pub final_selection: Vec<Selected>,
    pub not_selected: Vec<NotSelected>,
    pub invalid: Vec<String>,
    pub overflow: Vec<usize>,
}

pub fn build_prompt(
    representatives: &[&NewsItem],
    selection_criteria: &str,
    cap: usize,
) -> String {
    let news_list = representatives
        .iter()
        .map(|item| {
            format!(
                "{}. {} ({}, {})",
                item.original_index, item.content, item.press, item.date
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"아래 뉴스 중 선정 기준에 따라 회계법인 관점에서 중요한 뉴스를 최대 {cap}개까지 선정하세요.

[선정 기준]
{criteria}

[뉴스 목록]
{news_list}

[응답 형식]
다음과 같은 JSON 형식으로 응답해주세요:

{{
  "final_selection": [
    {{
      "index": 1,
      "title": "뉴스 제목",
      "importance": "high",
      "reason": "선정 사유",
      "keywords": ["키워드1", "키워드2"],
      "affiliates": ["관련 계열사"]
    }}
  ],
  "not_selected": [
    {{"index": 2, "title": "뉴스 제목", "importance": "low", "reason": "미선정 사유"}}
  ]
}}

importance는 high 또는 medium으로 표기하고, 선정되지 않은 모든 뉴스는 not_selected에 사유와 함께 포함해주세요."#,
        cap = cap,
        criteria = selection_criteria,
        news_list = news_list
    )
}

/// Selected items are recorded as high or medium, nothing lower.
fn selected_importance(raw: &str) -> Importance {
    match Importance::parse(raw) {
        Some(Importance::High) => Importance::High,
        _ => Importance::Medium,
    }
}

/// The representative a pick refers to, if it is one and not yet placed.
fn place<'a>(
    pick: &RawPick,
    by_index: &BTreeMap<usize, &'a NewsItem>,
    placed: &mut BTreeSet<usize>,
    invalid: &mut Vec<String>,
) -> Option<&'a NewsItem> {
    let Some(index) = pick.index else {
        invalid.push("pick without a readable index".to_string());
        return None;
    };
    let Some(item) = by_index.get(&index).copied() else {
        invalid.push(format!("#{} is not a representative", index));
        return None;
    };
    placed.insert(index).then_some(item)
}

/// Place every representative in exactly one of the two lists.
///
/// `final_selection` is read before `not_selected`, so an index named in both
/// keeps its selection. Picks past `cap` are demoted in the oracle's order.
pub fn select(
    representatives: &[&NewsItem],
    response: ImportanceResponse,
    cap: usize,
) -> SelectionOutcome {
    let by_index: BTreeMap<usize, &NewsItem> = representatives
        .iter()
        .map(|item| (item.original_index, *item))
        .collect();
    let mut placed: BTreeSet<usize> = BTreeSet::new();
    let mut outcome = SelectionOutcome::default();

    for pick in &response.final_selection {
        let Some(item) = place(pick, &by_index, &mut placed, &mut outcome.invalid) else {
            continue;
        };
        if outcome.final_selection.len() < cap {
            outcome.final_selection.push(Selected {
                index: item.original_index,
                title: item.content.clone(),
                date: item.date.clone(),
                url: item.url.clone(),
                press: item.press.clone(),
                reason: pick.reason.clone(),
                keywords: pick.keywords.clone(),
                affiliates: pick.affiliates.clone(),
                importance: selected_importance(&pick.importance),
            });
        } else {
            outcome.overflow.push(item.original_index);
            outcome.not_selected.push(NotSelected {
                index: item.original_index,
                title: item.content.clone(),
                importance: Importance::parse(&pick.importance),
                reason: CAP_EXCEEDED.to_string(),
            });
        }
    }

    for pick in &response.not_selected {
        let Some(item) = place(pick, &by_index, &mut placed, &mut outcome.invalid) else {
            continue;
        };
        outcome.not_selected.push(NotSelected {
            index: item.original_index,
            title: item.content.clone(),
            importance: Importance::parse(&pick.importance),
            reason: pick.reason.clone(),
        });
    }

    for item in representatives {
        if !placed.contains(&item.original_index) {
            outcome.not_selected.push(NotSelected {
                index: item.original_index,
                title: item.content.clone(),
                importance: None,
                reason: NO_JUDGMENT.to_string(),
            });
        }
    }

    outcome
}

/// Score the representatives and keep at most `policy.selection_cap` of them.
pub async fn score(
    state: &mut PipelineState,
    oracle: &dyn Oracle,
    policy: &CurationPolicy,
) -> Result<()> {
    state.expect_stage(Stage::Grouped)?;

    let representatives: Vec<NewsItem> = state.representatives().into_iter().cloned().collect();
    let refs: Vec<&NewsItem> = representatives.iter().collect();
    let cap = policy.selection_cap.max(1);

    let response = if refs.is_empty() {
        None
    } else {
        let criteria = Criteria::for_company(policy, &state.keyword);
        let prompt = build_prompt(&refs, &criteria.selection, cap);
        consult::<ImportanceResponse>(oracle, Stage::Scored, &policy.prompts.importance, prompt)
            .await
            .settle(state)
    };

    let outcome = select(&refs, response.unwrap_or_default(), cap);

    for detail in &outcome.invalid {
        state.record(Stage::Scored, DiagnosticKind::InvalidReference, detail.clone());
    }
    if !outcome.overflow.is_empty() {
        state.record(
            Stage::Scored,
            DiagnosticKind::CapacityExceeded,
            format!(
                "{} selections over the cap of {}: {:?}",
                outcome.overflow.len(),
                cap,
                outcome.overflow
            ),
        );
    }

    info!(
        keyword = %state.keyword,
        representatives = refs.len(),
        selected = outcome.final_selection.len(),
        "Importance scoring complete"
    );

    state.final_selection = outcome.final_selection;
    state.not_selected = outcome.not_selected;
    state.advance()
}
