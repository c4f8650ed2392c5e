/// Rule-based holder classification
///
/// Rules come from configuration and are checked before any upstream lookup:
/// known program ids are classified locally, burn and lock addresses feed the
/// supply breakdown.
use crate::config::HolderConfig;
use crate::types::HolderClass;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ClassificationRules {
    known_programs: HashSet<String>,
    burn_addresses: HashSet<String>,
    locked_addresses: HashSet<String>,
}

impl ClassificationRules {
    pub fn from_config(config: &HolderConfig) -> Self {
        Self {
            known_programs: config.known_program_ids.iter().cloned().collect(),
            burn_addresses: config.burn_addresses.iter().cloned().collect(),
            locked_addresses: config.locked_addresses.iter().cloned().collect(),
        }
    }

    /// Class decided without an upstream lookup, if any
    pub fn local_class(&self, owner: &str) -> Option<HolderClass> {
        self.known_programs
            .contains(owner)
            .then_some(HolderClass::Program)
    }

    pub fn is_burn(&self, owner: &str) -> bool {
        self.burn_addresses.contains(owner)
    }

    pub fn is_locked(&self, owner: &str) -> bool {
        self.locked_addresses.contains(owner)
    }

    /// Owners that still need an upstream lookup, in input order
    pub fn needs_lookup<'a>(&self, owners: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        owners
            .into_iter()
            .filter(|owner| self.local_class(owner).is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ClassificationRules {
        ClassificationRules::from_config(&HolderConfig {
            known_program_ids: vec!["AMM".to_string()],
            burn_addresses: vec!["BURN".to_string()],
            locked_addresses: vec!["VAULT".to_string()],
            ..HolderConfig::default()
        })
    }

    #[test]
    fn test_rules() {
        let rules = rules();
        assert_eq!(rules.local_class("AMM"), Some(HolderClass::Program));
        assert_eq!(rules.local_class("wallet"), None);
        assert!(rules.is_burn("BURN"));
        assert!(rules.is_locked("VAULT"));
        assert!(!rules.is_locked("BURN"));
    }

    #[test]
    fn test_needs_lookup_skips_known_programs() {
        let owners = vec!["wallet".to_string(), "AMM".to_string(), "VAULT".to_string()];
        assert_eq!(rules().needs_lookup(&owners), vec!["wallet", "VAULT"]);
    }
}
