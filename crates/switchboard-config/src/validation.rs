// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: positive intervals, a single
//! root department per company, slugs unique within a company, and agents
//! pointing at departments that exist.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::diagnostic::ConfigError;
use crate::model::SwitchboardConfig;

const AGENT_STATUSES: [&str; 3] = ["ONLINE", "BUSY", "OFFLINE"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of failing fast.
pub fn validate_config(config: &SwitchboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.dispatch.sweep_interval_secs < 1 {
        fail(format!(
            "dispatch.sweep_interval_secs must be at least 1, got {}",
            config.dispatch.sweep_interval_secs
        ));
    }

    if config.dispatch.admin_timeout_minutes < 1 {
        fail(format!(
            "dispatch.admin_timeout_minutes must be at least 1, got {}",
            config.dispatch.admin_timeout_minutes
        ));
    }

    if config.dispatch.fallback_slug.trim().is_empty() {
        fail("dispatch.fallback_slug must not be empty".to_string());
    }

    // company -> number of root departments
    let mut roots: BTreeMap<&str, usize> = BTreeMap::new();
    let mut slugs = HashSet::new();
    let mut ids = HashSet::new();
    let mut dept_company: HashMap<&str, &str> = HashMap::new();

    for (i, dept) in config.departments.iter().enumerate() {
        if dept.id.trim().is_empty() {
            fail(format!("departments[{i}].id must not be empty"));
        }
        if dept.slug.trim().is_empty() {
            fail(format!("departments[{i}].slug must not be empty"));
        }
        if !ids.insert(dept.id.as_str()) {
            fail(format!("duplicate department id `{}` in [[departments]]", dept.id));
        }
        if !slugs.insert((dept.company.as_str(), dept.slug.to_lowercase())) {
            fail(format!(
                "duplicate department slug `{}` for company `{}`",
                dept.slug, dept.company
            ));
        }
        if dept.response_timeout_minutes < 1 {
            fail(format!(
                "departments[{i}].response_timeout_minutes must be at least 1, got {}",
                dept.response_timeout_minutes
            ));
        }
        *roots.entry(dept.company.as_str()).or_default() += usize::from(dept.root);
        dept_company.insert(dept.id.as_str(), dept.company.as_str());
    }

    for (company, count) in &roots {
        if *count != 1 {
            fail(format!(
                "company `{company}` must have exactly one root department, found {count}"
            ));
        }
    }

    let mut agent_ids = HashSet::new();
    for (i, agent) in config.agents.iter().enumerate() {
        if agent.id.trim().is_empty() {
            fail(format!("agents[{i}].id must not be empty"));
        }
        if !agent_ids.insert(agent.id.as_str()) {
            fail(format!("duplicate agent id `{}` in [[agents]]", agent.id));
        }
        if !AGENT_STATUSES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(agent.status.trim()))
        {
            fail(format!(
                "agents[{i}].status `{}` must be one of ONLINE, BUSY, OFFLINE",
                agent.status
            ));
        }
        if let Some(dept) = &agent.department {
            match dept_company.get(dept.as_str()) {
                None => fail(format!(
                    "agent `{}` references unknown department `{dept}`",
                    agent.id
                )),
                Some(company) if *company != agent.company => fail(format!(
                    "agent `{}` of company `{}` references department `{dept}` of company `{company}`",
                    agent.id, agent.company
                )),
                Some(_) => {}
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentSeed, DepartmentSeed};

    fn dept(id: &str, company: &str, slug: &str, root: bool) -> DepartmentSeed {
        DepartmentSeed {
            id: id.to_string(),
            company: company.to_string(),
            slug: slug.to_string(),
            name: None,
            response_timeout_minutes: 10,
            root,
            position: 0,
        }
    }

    fn agent(id: &str, company: &str, department: &str) -> AgentSeed {
        AgentSeed {
            id: id.to_string(),
            company: company.to_string(),
            department: Some(department.to_string()),
            name: id.to_uppercase(),
            active: true,
            status: "online".to_string(),
        }
    }

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SwitchboardConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SwitchboardConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn zero_intervals_fail_together() {
        let mut config = SwitchboardConfig::default();
        config.dispatch.sweep_interval_secs = 0;
        config.dispatch.admin_timeout_minutes = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error(&errors, "sweep_interval_secs"));
        assert!(has_error(&errors, "admin_timeout_minutes"));
    }

    #[test]
    fn seeded_directory_passes() {
        let mut config = SwitchboardConfig::default();
        config.departments = vec![
            dept("acme-root", "acme", "other", true),
            dept("acme-sales", "acme", "comercial", false),
            dept("zeta-root", "zeta", "other", true),
        ];
        config.agents = vec![agent("ana", "acme", "acme-sales"), agent("zed", "zeta", "zeta-root")];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn company_without_root_fails() {
        let mut config = SwitchboardConfig::default();
        config.departments = vec![dept("acme-sales", "acme", "comercial", false)];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "exactly one root department, found 0"));
    }

    #[test]
    fn two_roots_fail() {
        let mut config = SwitchboardConfig::default();
        config.departments = vec![
            dept("a", "acme", "other", true),
            dept("b", "acme", "help", true),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "found 2"));
    }

    #[test]
    fn slug_uniqueness_is_per_company_and_case_insensitive() {
        let mut config = SwitchboardConfig::default();
        config.departments = vec![
            dept("a", "acme", "other", true),
            dept("b", "acme", "Sales", false),
            dept("c", "acme", "sales", false),
            dept("d", "zeta", "sales", true),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(has_error(&errors, "duplicate department slug `sales`"));
    }

    #[test]
    fn non_positive_department_timeout_fails() {
        let mut config = SwitchboardConfig::default();
        let mut root = dept("a", "acme", "other", true);
        root.response_timeout_minutes = 0;
        config.departments = vec![root];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "response_timeout_minutes"));
    }

    #[test]
    fn agent_department_must_exist_in_same_company() {
        let mut config = SwitchboardConfig::default();
        config.departments = vec![
            dept("acme-root", "acme", "other", true),
            dept("zeta-root", "zeta", "other", true),
        ];
        config.agents = vec![
            agent("ana", "acme", "missing"),
            agent("bob", "acme", "zeta-root"),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "unknown department `missing`"));
        assert!(has_error(&errors, "of company `zeta`"));
    }

    #[test]
    fn bad_agent_status_fails() {
        let mut config = SwitchboardConfig::default();
        config.departments = vec![dept("r", "acme", "other", true)];
        let mut a = agent("ana", "acme", "r");
        a.status = "away".to_string();
        config.agents = vec![a];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "ONLINE, BUSY, OFFLINE"));
    }

    #[test]
    fn agents_deny_unknown_fields() {
        let toml_str = r#"
[[agents]]
id = "ana"
company = "acme"
name = "Ana"
skills = ["x"]
"#;
        assert!(toml::from_str::<SwitchboardConfig>(toml_str).is_err());
    }

    #[test]
    fn department_seed_defaults() {
        let toml_str = r#"
[[departments]]
id = "acme-root"
company = "acme"
slug = "other"
root = true
"#;
        let config: SwitchboardConfig = toml::from_str(toml_str).unwrap();
        let d = &config.departments[0];
        assert_eq!(d.response_timeout_minutes, 10);
        assert_eq!(d.position, 0);
        assert!(d.name.is_none());
    }
}
