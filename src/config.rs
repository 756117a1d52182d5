use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::categorize::CategoryRule;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub general: General,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct General {
    pub jira_instance: String,
    pub jira_token: String,
    pub jira_project: String,
    pub jira_closed_states: Vec<String>,
    pub jira_open_states: Vec<String>,
    #[serde(default)]
    pub jira_labels: Vec<String>,
    #[serde(default)]
    pub jira_components: Vec<String>,
    #[serde(default)]
    pub url_field: Option<String>,
}

/// One `[[categories]]` entry. Declaration order is significant: it decides
/// column order in the image report and section order in the HTML report.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryEntry {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub general: General,
    pub rules: Vec<CategoryRule>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let file = parse_config(&content)?;
        let rules = compile_rules(&file.categories)?;
        Ok(Self {
            general: file.general,
            rules,
        })
    }

    /// The configured URL-source field, treating an empty string as unset.
    pub fn url_field(&self) -> Option<&str> {
        self.general.url_field.as_deref().filter(|f| !f.is_empty())
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    let general = &config.general;
    if general.jira_instance.is_empty() {
        return Err(Error::ConfigValidation(
            "jira_instance must not be empty".to_string(),
        ));
    }
    if general.jira_token.is_empty() {
        return Err(Error::ConfigValidation(
            "jira_token must not be empty".to_string(),
        ));
    }
    if general.jira_project.is_empty() {
        return Err(Error::ConfigValidation(
            "jira_project must not be empty".to_string(),
        ));
    }
    if general.jira_closed_states.is_empty() {
        return Err(Error::ConfigValidation(
            "jira_closed_states must not be empty".to_string(),
        ));
    }
    if general.jira_open_states.is_empty() {
        return Err(Error::ConfigValidation(
            "jira_open_states must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Compile category patterns, preserving declaration order.
/// A malformed pattern is a fatal configuration error.
pub fn compile_rules(entries: &[CategoryEntry]) -> Result<Vec<CategoryRule>> {
    entries
        .iter()
        .map(|entry| {
            let pattern = Regex::new(&entry.pattern).map_err(|e| {
                Error::ConfigValidation(format!(
                    "invalid pattern '{}' for category '{}': {e}",
                    entry.pattern, entry.name
                ))
            })?;
            Ok(CategoryRule {
                name: entry.name.clone(),
                pattern,
            })
        })
        .collect()
}
