use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::General;
use crate::error::{Error, Result};

const SEARCH_PATH: &str = "/rest/api/2/search";
const PAGE_SIZE: u64 = 100;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// A Jira issue reduced to what the reports need. The raw field map is kept
/// so the configured URL field can be read without knowing its name ahead
/// of time.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    pub labels: Vec<String>,
    pub fields: serde_json::Map<String, Value>,
    pub permalink: String,
}

impl Ticket {
    /// Text value of a raw Jira field, if present and textual.
    pub fn field_text(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.as_str()
    }
}

// ---------------------------------------------------------------------------
// Client abstraction (for testability)
// ---------------------------------------------------------------------------

pub trait JiraApi {
    fn search(&self, body: &Value) -> Result<Value>;
}

struct DefaultJiraApi {
    base_url: String,
    token: String,
}

impl JiraApi for DefaultJiraApi {
    fn search(&self, body: &Value) -> Result<Value> {
        let url = format!("{}{SEARCH_PATH}", self.base_url);

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 1..=MAX_RETRIES {
            match ureq::post(&url)
                .set("Authorization", &format!("Bearer {}", self.token))
                .set("Content-Type", "application/json")
                .send_json(body)
            {
                Ok(response) => {
                    let json: Value = response.into_json().map_err(|e| {
                        Error::Jira(format!("failed to parse Jira response: {e}"))
                    })?;
                    return Ok(json);
                }
                Err(ref e) if attempt < MAX_RETRIES && is_retryable(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        backoff_ms,
                        "retrying Jira API after transient error"
                    );
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(e) => {
                    return Err(Error::Jira(format!("Jira API request failed: {e}")));
                }
            }
        }
        unreachable!()
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport/network errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Search response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total: u64,
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

// ---------------------------------------------------------------------------
// JiraClient
// ---------------------------------------------------------------------------

pub struct JiraClient {
    instance: String,
    project: String,
    url_field: Option<String>,
    client: Box<dyn JiraApi>,
}

impl JiraClient {
    pub fn new(general: &General) -> Self {
        let instance = general.jira_instance.trim_end_matches('/').to_string();
        Self {
            instance: instance.clone(),
            project: general.jira_project.clone(),
            url_field: general
                .url_field
                .clone()
                .filter(|field| !field.is_empty()),
            client: Box::new(DefaultJiraApi {
                base_url: instance,
                token: general.jira_token.clone(),
            }),
        }
    }

    #[cfg(test)]
    fn with_client(
        instance: &str,
        project: &str,
        url_field: Option<&str>,
        client: Box<dyn JiraApi>,
    ) -> Self {
        Self {
            instance: instance.to_string(),
            project: project.to_string(),
            url_field: url_field.map(str::to_string),
            client,
        }
    }

    /// Retrieve issues with the provided labels in the provided states,
    /// optionally limited to an inclusive updated-date range.
    pub fn get_issues(
        &self,
        labels: &[String],
        components: &[String],
        states: &[String],
        updated_since: Option<NaiveDate>,
        updated_till: Option<NaiveDate>,
    ) -> Result<Vec<Ticket>> {
        let jql = build_jql(
            &self.project,
            labels,
            components,
            states,
            updated_since,
            updated_till,
        );
        debug!(%jql, "searching Jira");

        let mut fields = vec!["summary".to_string(), "labels".to_string()];
        if let Some(field) = &self.url_field {
            fields.push(field.clone());
        }

        let mut tickets = Vec::new();
        let mut start_at = 0u64;
        loop {
            let body = json!({
                "jql": jql,
                "startAt": start_at,
                "maxResults": PAGE_SIZE,
                "fields": fields,
            });
            let raw = self.client.search(&body)?;
            let page: SearchResponse = serde_json::from_value(raw)
                .map_err(|e| Error::Jira(format!("unexpected Jira search payload: {e}")))?;

            let fetched = page.issues.len() as u64;
            for issue in page.issues {
                tickets.push(self.parse_issue(issue));
            }

            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }
        Ok(tickets)
    }

    fn parse_issue(&self, raw: RawIssue) -> Ticket {
        let summary = raw
            .fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let labels = raw
            .fields
            .get("labels")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let permalink = format!("{}/browse/{}", self.instance, raw.key);
        Ticket {
            key: raw.key,
            summary,
            labels,
            fields: raw.fields,
            permalink,
        }
    }
}

/// Build the JQL search query: project and status-set membership, optional
/// label/component set membership, optional inclusive updated-date range.
pub fn build_jql(
    project: &str,
    labels: &[String],
    components: &[String],
    states: &[String],
    updated_since: Option<NaiveDate>,
    updated_till: Option<NaiveDate>,
) -> String {
    let states_comma = quoted_comma_list(states);
    let mut jql = format!("project = {project} AND status in ({states_comma})");

    if !labels.is_empty() {
        let labels_comma = quoted_comma_list(labels);
        jql.push_str(&format!(" AND labels in ({labels_comma})"));
    }

    if !components.is_empty() {
        let components_comma = quoted_comma_list(components);
        jql.push_str(&format!(" AND component in ({components_comma})"));
    }

    if let (Some(since), Some(till)) = (updated_since, updated_till) {
        jql.push_str(&format!(
            " AND updatedDate >= {} AND updatedDate <= {}",
            since.format("%Y-%m-%d"),
            till.format("%Y-%m-%d")
        ));
    }

    jql
}

fn quoted_comma_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
