use std::collections::BTreeMap;

use crate::policy::CurationPolicy;

/// Base block followed verbatim by the company's addendum, if it has one.
pub fn compose(base: &str, addenda: &BTreeMap<String, String>, company: &str) -> String {
    match addenda.get(company) {
        Some(addendum) => format!("{}{}", base, addendum),
        None => base.to_string(),
    }
}

/// The three criteria blocks as they apply to one company
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub exclusion: String,
    pub duplicate_handling: String,
    pub selection: String,
}

impl Criteria {
    pub fn for_company(policy: &CurationPolicy, company: &str) -> Self {
        Self {
            exclusion: compose(&policy.exclusion_criteria, &policy.exclusion_addenda, company),
            duplicate_handling: compose(
                &policy.duplicate_handling,
                &policy.duplicate_addenda,
                company,
            ),
            selection: compose(&policy.selection_criteria, &policy.selection_addenda, company),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_appends_addendum() {
        let mut addenda = BTreeMap::new();
        addenda.insert("롯데".to_string(), "\n- 롯데카드".to_string());
        assert_eq!(compose("base", &addenda, "롯데"), "base\n- 롯데카드");
    }

    #[test]
    fn test_compose_without_addendum_is_base() {
        assert_eq!(compose("base", &BTreeMap::new(), "삼성"), "base");
    }

    #[test]
    fn test_for_company_uses_each_addenda_table() {
        let policy = CurationPolicy::default();
        let lotte = Criteria::for_company(&policy, "롯데");
        assert!(lotte.exclusion.starts_with(&policy.exclusion_criteria));
        assert!(lotte.exclusion.contains("롯데손해보험"));
        assert_eq!(lotte.selection, policy.selection_criteria);

        let cj = Criteria::for_company(&policy, "CJ");
        assert_eq!(cj.exclusion, policy.exclusion_criteria);
        assert!(cj.selection.contains("스튜디오드래곤"));
        assert_eq!(cj.duplicate_handling, policy.duplicate_handling);
    }
}
