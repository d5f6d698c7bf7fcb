use anyhow::Result;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::criteria::Criteria;
use crate::dates::parse_published;
use crate::lenient;
use crate::models::{DiagnosticKind, Group, NewsItem, Stage};
use crate::oracle::{consult, Oracle};
use crate::policy::CurationPolicy;
use crate::state::PipelineState;

const SINGLETON_REASON: &str = "no duplicates reported";
const FALLBACK_REASON: &str = "representative chosen by fallback ranking";

#[derive(Debug, Deserialize)]
pub struct GroupingResponse {
    pub groups: Vec<ProposedGroup>,
}

#[derive(Debug, Deserialize)]
pub struct ProposedGroup {
    #[serde(default, alias = "news_indices", deserialize_with = "lenient::indices")]
    pub indices: Vec<Option<usize>>,
    #[serde(default, alias = "representative", deserialize_with = "lenient::index")]
    pub selected_index: Option<usize>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct GroupingOutcome {
    pub groups: Vec<Group>,
    pub invalid: Vec<String>,
}

pub fn build_prompt(items: &[&NewsItem], duplicate_handling: &str) -> String {
    let news_list = items
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
        r#"아래 뉴스 목록에서 같은 사안을 다루는 기사들을 그룹으로 묶고, 그룹마다 대표 기사 1개를 선택하세요.

[중복 처리 기준]
{}

[뉴스 목록]
{}

[응답 형식]
다음과 같은 JSON 형식으로 응답해주세요:

{{
  "groups": [
    {{"indices": [1, 3], "selected_index": 3, "reason": "대표 기사 선정 사유"}},
    {{"indices": [2], "selected_index": 2, "reason": "단독 기사"}}
  ]
}}

각 인덱스는 하나의 그룹에만 포함되어야 하며, selected_index는 해당 그룹의 인덱스 중 하나여야 합니다."#,
        duplicate_handling, news_list
    )
}

/// Order candidates best-first: outlet tier, then most recent readable date,
/// then longer content, then lowest index.
fn rank(a: &NewsItem, b: &NewsItem, policy: &CurationPolicy) -> Ordering {
    policy
        .tier_rank(&a.press)
        .cmp(&policy.tier_rank(&b.press))
        .then_with(|| match (parse_published(&a.date), parse_published(&b.date)) {
            (Some(da), Some(db)) => db.cmp(&da),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.content.chars().count().cmp(&a.content.chars().count()))
        .then_with(|| a.original_index.cmp(&b.original_index))
}

/// Pick a representative without the oracle.
pub fn fallback_representative(candidates: &[&NewsItem], policy: &CurationPolicy) -> Option<usize> {
    candidates
        .iter()
        .min_by(|a, b| rank(a, b, policy))
        .map(|item| item.original_index)
}

/// Build a partition of `items` from the oracle's proposals.
///
/// Proposals are read in order; an index already claimed by an earlier group
/// stays there, and indices no proposal mentions become singletons.
pub fn partition(
    items: &[&NewsItem],
    proposals: &[ProposedGroup],
    policy: &CurationPolicy,
) -> GroupingOutcome {
    let by_index: BTreeMap<usize, &NewsItem> = items
        .iter()
        .map(|item| (item.original_index, *item))
        .collect();
    let mut claimed: BTreeSet<usize> = BTreeSet::new();
    let mut outcome = GroupingOutcome::default();

    for proposal in proposals {
        let mut members = BTreeSet::new();
        for index in &proposal.indices {
            match index {
                None => outcome
                    .invalid
                    .push("group member without a readable index".to_string()),
                Some(index) if !by_index.contains_key(index) => outcome
                    .invalid
                    .push(format!("#{} was not submitted", index)),
                Some(index) if claimed.contains(index) => {
                    debug!(index, "Index already claimed by an earlier group")
                }
                Some(index) => {
                    claimed.insert(*index);
                    members.insert(*index);
                }
            }
        }

        if members.is_empty() {
            continue;
        }

        let named = proposal.selected_index.filter(|s| members.contains(s));
        if let Some(s) = proposal.selected_index {
            if named.is_none() && !by_index.contains_key(&s) {
                outcome
                    .invalid
                    .push(format!("representative #{} was not submitted", s));
            }
        }

        let (selected_index, reason) = match named {
            Some(s) => (s, proposal.reason.clone()),
            None => {
                let candidates: Vec<&NewsItem> = members
                    .iter()
                    .filter_map(|i| by_index.get(i).copied())
                    .collect();
                let Some(chosen) = fallback_representative(&candidates, policy) else {
                    continue;
                };
                let reason = if proposal.reason.trim().is_empty() {
                    FALLBACK_REASON.to_string()
                } else {
                    format!("{} ({})", proposal.reason, FALLBACK_REASON)
                };
                (chosen, reason)
            }
        };

        outcome.groups.push(Group {
            indices: members,
            selected_index,
            reason,
        });
    }

    for &index in by_index.keys() {
        if !claimed.contains(&index) {
            outcome.groups.push(Group {
                indices: BTreeSet::from([index]),
                selected_index: index,
                reason: SINGLETON_REASON.to_string(),
            });
        }
    }

    outcome
}

/// Cluster retained and borderline items and pick a representative for each.
pub async fn group(
    state: &mut PipelineState,
    oracle: &dyn Oracle,
    policy: &CurationPolicy,
) -> Result<()> {
    state.expect_stage(Stage::Triaged)?;

    let candidates: Vec<NewsItem> = state.grouping_candidates().into_iter().cloned().collect();
    let refs: Vec<&NewsItem> = candidates.iter().collect();

    let proposals = if refs.len() < 2 {
        Vec::new()
    } else {
        let criteria = Criteria::for_company(policy, &state.keyword);
        let prompt = build_prompt(&refs, &criteria.duplicate_handling);
        consult::<GroupingResponse>(oracle, Stage::Grouped, &policy.prompts.grouping, prompt)
            .await
            .settle(state)
            .map(|response| response.groups)
            .unwrap_or_default()
    };

    let outcome = partition(&refs, &proposals, policy);
    for detail in &outcome.invalid {
        state.record(Stage::Grouped, DiagnosticKind::InvalidReference, detail.clone());
    }

    info!(
        keyword = %state.keyword,
        candidates = refs.len(),
        groups = outcome.groups.len(),
        "Grouping complete"
    );

    state.grouped = outcome.groups;
    state.advance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(index: usize, press: &str, date: &str, content: &str) -> NewsItem {
        NewsItem {
            original_index: index,
            content: content.to_string(),
            url: String::new(),
            date: date.to_string(),
            press: press.to_string(),
        }
    }

    fn proposal(indices: &[usize], selected: Option<usize>) -> ProposedGroup {
        ProposedGroup {
            indices: indices.iter().map(|&i| Some(i)).collect(),
            selected_index: selected,
            reason: "같은 사안".to_string(),
        }
    }

    fn sample() -> Vec<NewsItem> {
        (1..=6)
            .map(|i| item(i, "연합뉴스", "", &format!("기사 {}", i)))
            .collect()
    }

    // ==================== Partition Tests ====================

    #[test]
    fn test_contested_index_stays_in_first_group() {
        let items = sample();
        let refs: Vec<&NewsItem> = items.iter().collect();
        let outcome = partition(
            &refs,
            &[proposal(&[1, 4], Some(1)), proposal(&[4, 5], Some(5))],
            &CurationPolicy::default(),
        );

        assert_eq!(outcome.groups[0].indices, BTreeSet::from([1, 4]));
        assert_eq!(outcome.groups[1].indices, BTreeSet::from([5]));
        assert_eq!(outcome.groups[1].selected_index, 5);
    }

    #[test]
    fn test_unmentioned_indices_become_singletons() {
        let items = sample();
        let refs: Vec<&NewsItem> = items.iter().collect();
        let outcome = partition(&refs, &[proposal(&[2, 3], Some(2))], &CurationPolicy::default());

        let singletons: Vec<usize> = outcome.groups[1..].iter().map(|g| g.selected_index).collect();
        assert_eq!(singletons, vec![1, 4, 5, 6]);
        assert!(outcome.groups[1..]
            .iter()
            .all(|g| g.indices.len() == 1 && g.reason == SINGLETON_REASON));
    }

    #[test]
    fn test_hallucinated_indices_are_dropped() {
        let items = sample();
        let refs: Vec<&NewsItem> = items.iter().collect();
        let outcome = partition(&refs, &[proposal(&[1, 99], Some(99))], &CurationPolicy::default());

        assert_eq!(outcome.groups[0].indices, BTreeSet::from([1]));
        assert_eq!(outcome.groups[0].selected_index, 1);
        assert_eq!(outcome.invalid.len(), 2);
    }

    #[test]
    fn test_representative_outside_group_uses_fallback() {
        let items = vec![
            item(1, "연합뉴스", "", "짧은 기사"),
            item(2, "한국경제", "", "짧은 기사"),
            item(3, "조선일보", "", "기사"),
        ];
        let refs: Vec<&NewsItem> = items.iter().collect();
        let outcome = partition(&refs, &[proposal(&[1, 2], Some(3))], &CurationPolicy::default());

        assert_eq!(outcome.groups[0].selected_index, 2);
        assert!(outcome.groups[0].reason.contains(FALLBACK_REASON));
        // 3 was submitted, so naming it is not a hallucination
        assert!(outcome.invalid.is_empty());
        assert_eq!(outcome.groups[1].indices, BTreeSet::from([3]));
    }

    #[test]
    fn test_group_emptied_by_earlier_claims_is_dropped() {
        let items = sample();
        let refs: Vec<&NewsItem> = items.iter().collect();
        let outcome = partition(
            &refs,
            &[proposal(&[1, 2], Some(1)), proposal(&[2, 1], Some(2))],
            &CurationPolicy::default(),
        );
        assert_eq!(outcome.groups[0].indices, BTreeSet::from([1, 2]));
        assert_eq!(outcome.groups.len(), 1 + 4);
    }

    // ==================== Fallback Ladder Tests ====================

    #[test]
    fn test_fallback_prefers_higher_tier() {
        let items = vec![
            item(1, "연합뉴스", "2025-10-14 10:00", "아주 긴 기사 본문입니다"),
            item(2, "매일경제", "2025-10-13", "짧음"),
            item(3, "동아일보", "2025-10-15", "기사"),
        ];
        let refs: Vec<&NewsItem> = items.iter().collect();
        assert_eq!(fallback_representative(&refs, &CurationPolicy::default()), Some(2));
    }

    #[test]
    fn test_fallback_prefers_recent_then_parseable() {
        let items = vec![
            item(1, "한국경제", "어제", "기사"),
            item(2, "매일경제", "Mon, 13 Oct 2025 09:00:00 GMT", "기사"),
            item(3, "조선비즈", "2025-10-14", "기사"),
        ];
        let refs: Vec<&NewsItem> = items.iter().collect();
        assert_eq!(fallback_representative(&refs, &CurationPolicy::default()), Some(3));

        let undated: Vec<&NewsItem> = vec![&items[0], &items[1]];
        assert_eq!(fallback_representative(&undated, &CurationPolicy::default()), Some(2));
    }

    #[test]
    fn test_fallback_prefers_longer_content_then_lowest_index() {
        let items = vec![
            item(4, "뉴시스", "", "기사"),
            item(2, "뉴스핌", "", "더 자세한 기사"),
            item(7, "뉴시스", "", "더 자세한 기사"),
        ];
        let refs: Vec<&NewsItem> = items.iter().collect();
        assert_eq!(fallback_representative(&refs, &CurationPolicy::default()), Some(2));
    }

    #[test]
    fn test_fallback_is_order_independent() {
        let items = vec![
            item(1, "머니투데이", "", "같은 길이"),
            item(2, "이데일리", "", "같은 길이"),
            item(3, "아시아경제", "", "같은 길이"),
        ];
        let policy = CurationPolicy::default();
        let forward: Vec<&NewsItem> = items.iter().collect();
        let backward: Vec<&NewsItem> = items.iter().rev().collect();
        assert_eq!(fallback_representative(&forward, &policy), Some(1));
        assert_eq!(fallback_representative(&backward, &policy), Some(1));
    }

    proptest! {
        #[test]
        fn prop_partition_covers_input_exactly(
            n in 1usize..15,
            raw in proptest::collection::vec(
                (proptest::collection::vec(0usize..20, 0..6), proptest::option::of(0usize..20)),
                0..8,
            ),
        ) {
            let items: Vec<NewsItem> = (1..=n)
                .map(|i| item(i, "연합뉴스", "", "기사"))
                .collect();
            let refs: Vec<&NewsItem> = items.iter().collect();
            let proposals: Vec<ProposedGroup> = raw
                .iter()
                .map(|(indices, selected)| proposal(indices, *selected))
                .collect();

            let outcome = partition(&refs, &proposals, &CurationPolicy::default());

            let mut seen = BTreeSet::new();
            for group in &outcome.groups {
                prop_assert!(group.indices.contains(&group.selected_index));
                for &index in &group.indices {
                    prop_assert!(seen.insert(index));
                }
            }
            let expected: BTreeSet<usize> = (1..=n).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
