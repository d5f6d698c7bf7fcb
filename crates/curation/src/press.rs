use anyhow::Result;
use tracing::info;

use crate::models::{DiagnosticKind, Rejection, Stage};
use crate::policy::PressOutlet;
use crate::state::PipelineState;

/// Lowercase and keep only letters and digits, so "Chosun.com " and
/// "chosun com" compare equal.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolve a raw source string to a canonical outlet name.
///
/// An alias matches when its normalized form occurs inside the normalized raw
/// string. Among matches the longest alias wins, then the outlet declared first.
pub fn canonicalize<'a>(raw: &str, outlets: &'a [PressOutlet]) -> Option<&'a str> {
    let haystack = normalize(raw);
    if haystack.is_empty() {
        return None;
    }

    let mut best: Option<(usize, &'a str)> = None;
    for outlet in outlets {
        let longest = outlet
            .aliases
            .iter()
            .chain(std::iter::once(&outlet.name))
            .map(|alias| normalize(alias))
            .filter(|alias| !alias.is_empty() && haystack.contains(alias.as_str()))
            .map(|alias| alias.chars().count())
            .max();

        if let Some(len) = longest {
            // strictly longer only, so earlier outlets keep ties
            if best.map_or(true, |(best_len, _)| len > best_len) {
                best = Some((len, outlet.name.as_str()));
            }
        }
    }

    best.map(|(_, name)| name)
}

/// Keep only articles from trusted outlets, with their canonical press name.
pub fn filter_trusted(state: &mut PipelineState, outlets: &[PressOutlet]) -> Result<()> {
    state.expect_stage(Stage::Collected)?;

    let mut working = Vec::new();
    let mut rejected = Vec::new();
    for item in &state.collected {
        match canonicalize(&item.press, outlets) {
            Some(name) => {
                let mut trusted = item.clone();
                trusted.press = name.to_string();
                working.push(trusted);
            }
            None => rejected.push(Rejection {
                index: item.original_index,
                title: item.content.clone(),
                reason: format!("untrusted press: {}", item.press),
            }),
        }
    }

    info!(
        keyword = %state.keyword,
        kept = working.len(),
        dropped = rejected.len(),
        "Press canonicalized"
    );

    for rejection in &rejected {
        state.record(
            Stage::Canonicalized,
            DiagnosticKind::SourceMismatch,
            format!("#{} {}", rejection.index, rejection.reason),
        );
    }
    state.working = working;
    state.press_rejected = rejected;
    state.advance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawArticle;
    use crate::policy::CurationPolicy;

    fn outlets() -> Vec<PressOutlet> {
        CurationPolicy::default().trusted_press
    }

    #[test]
    fn test_normalize_strips_case_space_punctuation() {
        assert_eq!(normalize(" Chosun.com "), "chosuncom");
        assert_eq!(normalize("SBS Biz"), "sbsbiz");
        assert_eq!(normalize("한국 경제!"), "한국경제");
    }

    #[test]
    fn test_canonicalize_exact_name() {
        assert_eq!(canonicalize("한국경제", &outlets()), Some("한국경제"));
        assert_eq!(canonicalize("연합뉴스", &outlets()), Some("연합뉴스"));
    }

    #[test]
    fn test_canonicalize_domain_alias() {
        assert_eq!(canonicalize("www.hankyung.com", &outlets()), Some("한국경제"));
        assert_eq!(canonicalize("YNA.co.kr", &outlets()), Some("연합뉴스"));
    }

    #[test]
    fn test_canonicalize_unknown() {
        assert_eq!(canonicalize("동네소식", &outlets()), None);
        assert_eq!(canonicalize("", &outlets()), None);
        assert_eq!(canonicalize("...", &outlets()), None);
    }

    #[test]
    fn test_short_names_do_not_capture_other_outlets() {
        assert_eq!(canonicalize("대한경제", &outlets()), None);
        assert_eq!(canonicalize("MTN", &outlets()), None);
        assert_eq!(canonicalize("mk.co.kr", &outlets()), Some("매일경제"));
        assert_eq!(canonicalize("news.mt.co.kr", &outlets()), Some("머니투데이"));
        assert_eq!(canonicalize("한경닷컴", &outlets()), Some("한국경제"));
    }

    #[test]
    fn test_canonicalize_longer_alias_wins() {
        // "biz.chosun.com" contains both chosun (조선일보) and bizchosuncom (조선비즈)
        assert_eq!(canonicalize("biz.chosun.com", &outlets()), Some("조선비즈"));
        // "magazine.hankyung.com" beats plain hankyung
        assert_eq!(
            canonicalize("magazine.hankyung.com", &outlets()),
            Some("매거진한경")
        );
    }

    #[test]
    fn test_canonicalize_tie_goes_to_first_declared() {
        let table = vec![
            PressOutlet::new("First", &["alpha"]),
            PressOutlet::new("Second", &["gamma"]),
        ];
        assert_eq!(canonicalize("alpha gamma", &table), Some("First"));
        assert_eq!(canonicalize("gamma alpha", &table), Some("First"));
    }

    #[test]
    fn test_filter_trusted_keeps_three_of_five() {
        let articles = vec![
            RawArticle::new("삼성전자 3분기 실적", "u1", "", "한국경제"),
            RawArticle::new("삼성 지분 매각", "u2", "", "동네소식"),
            RawArticle::new("삼성 M&A", "u3", "", "연합뉴스"),
            RawArticle::new("삼성 신제품", "u4", "", "블로그뉴스"),
            RawArticle::new("삼성 감사의견", "u5", "", "hankyung.com"),
        ];
        let mut state = PipelineState::collected("삼성", articles);

        filter_trusted(&mut state, &outlets()).unwrap();

        let kept: Vec<usize> = state.working.iter().map(|i| i.original_index).collect();
        assert_eq!(kept, vec![1, 3, 5]);
        assert_eq!(state.working[2].press, "한국경제");
        let dropped: Vec<usize> = state.press_rejected.iter().map(|r| r.index).collect();
        assert_eq!(dropped, vec![2, 4]);
        assert_eq!(state.stage, Stage::Canonicalized);
        // collector output is left as it was
        assert_eq!(state.collected[4].press, "hankyung.com");
        state.validate().unwrap();
    }

    #[test]
    fn test_filter_trusted_out_of_order() {
        let mut state = PipelineState::collected("삼성", Vec::new());
        filter_trusted(&mut state, &outlets()).unwrap();
        assert!(filter_trusted(&mut state, &outlets()).is_err());
    }
}
