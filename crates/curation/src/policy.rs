use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::defaults;

/// A trusted outlet and the raw source strings that identify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressOutlet {
    pub name: String,
    pub aliases: Vec<String>,
}

impl PressOutlet {
    pub fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A rung of the outlet ranking used when picking representatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressTier {
    pub name: String,
    pub outlets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyCategory {
    pub name: String,
    #[serde(default = "enabled")]
    pub active: bool,
    pub companies: Vec<String>,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPrompts {
    pub triage: String,
    pub grouping: String,
    pub importance: String,
}

impl Default for SystemPrompts {
    fn default() -> Self {
        Self {
            triage: defaults::TRIAGE_SYSTEM_PROMPT.to_string(),
            grouping: defaults::GROUPING_SYSTEM_PROMPT.to_string(),
            importance: defaults::IMPORTANCE_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Everything a run needs to know besides the articles themselves.
///
/// Built once and shared read-only by every keyword run, so a run never sees
/// the tables change under it. Fields missing from a policy file keep their
/// built-in values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationPolicy {
    pub trusted_press: Vec<PressOutlet>,
    /// Trade outlets merged in only on request
    pub additional_press: Vec<PressOutlet>,
    /// Highest rank first; outlets not listed rank below every tier
    pub press_tiers: Vec<PressTier>,
    pub exclusion_criteria: String,
    pub duplicate_handling: String,
    pub selection_criteria: String,
    pub exclusion_addenda: BTreeMap<String, String>,
    pub duplicate_addenda: BTreeMap<String, String>,
    pub selection_addenda: BTreeMap<String, String>,
    pub prompts: SystemPrompts,
    pub selection_cap: usize,
    pub categories: Vec<CompanyCategory>,
    pub search_terms: BTreeMap<String, Vec<String>>,
}

impl Default for CurationPolicy {
    fn default() -> Self {
        Self {
            trusted_press: defaults::trusted_press(),
            additional_press: defaults::additional_press(),
            press_tiers: defaults::press_tiers(),
            exclusion_criteria: defaults::EXCLUSION_CRITERIA.to_string(),
            duplicate_handling: defaults::DUPLICATE_HANDLING.to_string(),
            selection_criteria: defaults::SELECTION_CRITERIA.to_string(),
            exclusion_addenda: defaults::exclusion_addenda(),
            duplicate_addenda: BTreeMap::new(),
            selection_addenda: defaults::selection_addenda(),
            prompts: SystemPrompts::default(),
            selection_cap: defaults::SELECTION_CAP,
            categories: defaults::categories(),
            search_terms: defaults::search_terms(),
        }
    }
}

impl CurationPolicy {
    /// Load a policy override file (JSON)
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file: {}", path.display()))?;

        let policy: CurationPolicy = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse policy JSON from {}. Check the file against the documented fields.",
                path.display()
            )
        })?;

        if policy.selection_cap == 0 {
            anyhow::bail!("selection_cap in {} must be at least 1", path.display());
        }

        Ok(policy)
    }

    pub fn with_selection_cap(mut self, cap: usize) -> Self {
        self.selection_cap = cap.max(1);
        self
    }

    /// Fold the additional outlets into the trusted table, after the
    /// existing entries so declaration-order ties keep favoring the core list.
    pub fn with_additional_press(mut self) -> Self {
        let extra = std::mem::take(&mut self.additional_press);
        for outlet in extra {
            if !self.trusted_press.iter().any(|o| o.name == outlet.name) {
                self.trusted_press.push(outlet);
            }
        }
        self
    }

    /// Companies of an active category, or `None` if no such category is active.
    pub fn companies_in(&self, category: &str) -> Option<Vec<String>> {
        self.categories
            .iter()
            .find(|c| c.active && c.name.eq_ignore_ascii_case(category))
            .map(|c| c.companies.clone())
    }

    /// Companies of every active category, in declaration order.
    pub fn active_companies(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| c.active)
            .flat_map(|c| c.companies.iter().cloned())
            .collect()
    }

    /// Search terms for a company; a company without an entry searches for itself.
    pub fn search_terms_for(&self, company: &str) -> Vec<String> {
        match self.search_terms.get(company) {
            Some(terms) if !terms.is_empty() => terms.clone(),
            _ => vec![company.to_string()],
        }
    }

    /// Position of a canonical outlet in the tier table; unlisted outlets
    /// share the rank just below the last tier.
    pub fn tier_rank(&self, press: &str) -> usize {
        self.press_tiers
            .iter()
            .position(|tier| tier.outlets.iter().any(|o| o == press))
            .unwrap_or(self.press_tiers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers_rank_economic_dailies_first() {
        let policy = CurationPolicy::default();
        assert_eq!(policy.tier_rank("한국경제"), 0);
        assert_eq!(policy.tier_rank("조선일보"), 1);
        assert_eq!(policy.tier_rank("연합뉴스"), 2);
        assert_eq!(policy.tier_rank("머니투데이"), 3);
        assert_eq!(policy.tier_rank("unknown"), 3);
    }

    #[test]
    fn test_default_cap_is_three() {
        assert_eq!(CurationPolicy::default().selection_cap, 3);
    }

    #[test]
    fn test_with_additional_press_appends_without_duplicates() {
        let base = CurationPolicy::default();
        let trusted = base.trusted_press.len();
        let extra = base.additional_press.len();
        let merged = base.with_additional_press();
        assert_eq!(merged.trusted_press.len(), trusted + extra);
        assert!(merged.additional_press.is_empty());
        assert!(merged.trusted_press.iter().any(|o| o.name == "철강금속신문"));
    }

    #[test]
    fn test_search_terms_fall_back_to_company() {
        let policy = CurationPolicy::default();
        assert!(policy.search_terms_for("삼성").contains(&"삼성전자".to_string()));
        assert_eq!(policy.search_terms_for("네이버"), vec!["네이버".to_string()]);
    }

    #[test]
    fn test_companies_in_category() {
        let policy = CurationPolicy::default();
        let growth = policy.companies_in("growth").unwrap();
        assert!(growth.contains(&"CJ".to_string()));
        assert!(policy.companies_in("Nope").is_none());
    }

    #[test]
    fn test_inactive_category_is_skipped() {
        let mut policy = CurationPolicy::default();
        policy.categories[0].active = false;
        let name = policy.categories[0].name.clone();
        assert!(policy.companies_in(&name).is_none());
        assert!(!policy.active_companies().contains(&"삼성".to_string()));
    }

    #[test]
    fn test_load_partial_policy_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        fs::write(&path, r#"{"selection_cap": 5}"#).unwrap();

        let policy = CurationPolicy::load(&path).unwrap();
        assert_eq!(policy.selection_cap, 5);
        assert_eq!(policy.trusted_press, CurationPolicy::default().trusted_press);
    }

    #[test]
    fn test_load_rejects_zero_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        fs::write(&path, r#"{"selection_cap": 0}"#).unwrap();
        assert!(CurationPolicy::load(&path).is_err());
    }
}
