use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info};

use crate::jira::Ticket;

// This HTTP regex was obtained from
// https://stackoverflow.com/questions/3809401/what-is-a-good-regular-expression-to-match-a-url
static HTTP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)",
    )
    .unwrap()
});

/// A category as declared in the config: display name plus compiled
/// label-matching pattern.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub name: String,
    pub pattern: Regex,
}

impl CategoryRule {
    /// A label matches when the pattern matches at the start of the label.
    fn matches(&self, label: &str) -> bool {
        self.pattern.find(label).is_some_and(|m| m.start() == 0)
    }
}

/// Bucket identity: a configured category or the no-label fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryKey {
    Named(String),
    Uncategorized,
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Named(name) => f.write_str(name),
            CategoryKey::Uncategorized => f.write_str("Uncategorized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

/// The parts of a ticket the reports link to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub key: String,
    pub url: String,
}

/// Issues keyed by trimmed summary, in insertion order.
pub type IssueMap = IndexMap<String, IssueRef>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBucket {
    pub open: IssueMap,
    pub closed: IssueMap,
}

/// The merged report: one bucket per non-empty category, in declared rule
/// order, with `Uncategorized` last.
pub type CategorizedReport = IndexMap<CategoryKey, CategoryBucket>;

/// A closed ticket whose labels matched no configured pattern. Left out of
/// the report but kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTicket {
    pub key: String,
    pub summary: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CategorizeOutcome {
    pub buckets: IndexMap<CategoryKey, IssueMap>,
    pub skipped: Vec<SkippedTicket>,
}

/// Sort tickets into category buckets.
///
/// Each label is tested against the patterns in declaration order and the
/// first match wins; a ticket lands in several categories when several of
/// its labels match distinct patterns. Tickets without labels go to
/// `Uncategorized`. Closed tickets matching nothing are tracked in
/// `skipped`.
pub fn categorize(
    tickets: &[Ticket],
    state: IssueState,
    rules: &[CategoryRule],
    url_field: Option<&str>,
) -> CategorizeOutcome {
    let mut outcome = CategorizeOutcome::default();

    for ticket in tickets {
        let url = derive_url(ticket, url_field);
        let summary = ticket.summary.trim().to_string();
        let issue = IssueRef {
            key: ticket.key.clone(),
            url,
        };

        let mut added = false;
        if ticket.labels.is_empty() {
            outcome
                .buckets
                .entry(CategoryKey::Uncategorized)
                .or_default()
                .insert(summary.clone(), issue.clone());
            added = true;
        } else {
            for label in &ticket.labels {
                if let Some(rule) = rules.iter().find(|rule| rule.matches(label)) {
                    outcome
                        .buckets
                        .entry(CategoryKey::Named(rule.name.clone()))
                        .or_default()
                        .insert(summary.clone(), issue.clone());
                    added = true;
                }
            }
        }

        if !added && state == IssueState::Closed {
            outcome.skipped.push(SkippedTicket {
                key: ticket.key.clone(),
                summary: ticket.summary.clone(),
                labels: ticket.labels.clone(),
            });
        }
    }

    if !outcome.skipped.is_empty() {
        debug!("the following closed issues were not added to the report (no matching category labels):");
        for skipped in &outcome.skipped {
            debug!(
                key = %skipped.key,
                labels = ?skipped.labels,
                "  skipped: {}",
                skipped.summary
            );
        }
    }

    outcome
}

/// Derive the link target for a ticket: the first http(s) URL found in the
/// configured field, or the ticket permalink when no field is configured.
/// A missing or non-text field degrades to an empty URL.
fn derive_url(ticket: &Ticket, url_field: Option<&str>) -> String {
    let Some(field) = url_field else {
        return ticket.permalink.clone();
    };
    match ticket.field_text(field) {
        Some(value) => HTTP_REGEX
            .find(value)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        None => {
            debug!("couldn't retrieve the url from {}", ticket.summary);
            String::new()
        }
    }
}

/// Merge open and closed outcomes into the final report, keyed in declared
/// rule order with `Uncategorized` last. Empty categories are dropped.
pub fn merge_outcomes(
    open: CategorizeOutcome,
    closed: CategorizeOutcome,
    rules: &[CategoryRule],
) -> CategorizedReport {
    let mut open_buckets = open.buckets;
    let mut closed_buckets = closed.buckets;
    let mut report = CategorizedReport::new();
    let mut issue_count = 0;

    let keys = rules
        .iter()
        .map(|rule| CategoryKey::Named(rule.name.clone()))
        .chain(std::iter::once(CategoryKey::Uncategorized));

    for key in keys {
        let open_issues = open_buckets.shift_remove(&key).unwrap_or_default();
        let closed_issues = closed_buckets.shift_remove(&key).unwrap_or_default();
        if open_issues.is_empty() && closed_issues.is_empty() {
            continue;
        }
        info!(
            category = %key,
            open = open_issues.len(),
            closed = closed_issues.len(),
            "category totals"
        );
        issue_count += open_issues.len() + closed_issues.len();
        report.insert(
            key,
            CategoryBucket {
                open: open_issues,
                closed: closed_issues,
            },
        );
    }

    info!("total issues processed: {issue_count}");
    report
}
