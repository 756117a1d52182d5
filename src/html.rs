use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::categorize::{CategorizedReport, IssueMap};
use crate::error::Result;

const REPORT_TEMPLATE: &str = include_str!("templates/report.html");

#[derive(Debug, Serialize)]
struct ReportContext {
    categories: Vec<CategoryContext>,
}

#[derive(Debug, Serialize)]
struct CategoryContext {
    name: String,
    has_open: bool,
    open: Vec<IssueContext>,
    has_closed: bool,
    closed: Vec<IssueContext>,
}

#[derive(Debug, Serialize)]
struct IssueContext {
    key: String,
    summary: String,
    url: String,
    browse_url: String,
}

/// Render the per-category open/closed issue lists as HTML. Ticket keys
/// link to the tracker's browse URL, summaries link to the derived URL.
pub fn render_report(report: &CategorizedReport, jira_instance: &str) -> Result<String> {
    let mut engine = upon::Engine::new();
    engine.add_template("report", REPORT_TEMPLATE)?;

    let context = build_context(report, jira_instance);
    let html = engine.template("report").render(&context).to_string()?;
    Ok(html)
}

pub fn write_report(report: &CategorizedReport, jira_instance: &str, output: &Path) -> Result<()> {
    let html = render_report(report, jira_instance)?;
    std::fs::write(output, html)?;
    info!("HTML report written to {}", output.display());
    Ok(())
}

fn build_context(report: &CategorizedReport, jira_instance: &str) -> ReportContext {
    let instance = jira_instance.trim_end_matches('/');
    ReportContext {
        categories: report
            .iter()
            .map(|(key, bucket)| CategoryContext {
                name: key.to_string(),
                has_open: !bucket.open.is_empty(),
                open: issue_contexts(&bucket.open, instance),
                has_closed: !bucket.closed.is_empty(),
                closed: issue_contexts(&bucket.closed, instance),
            })
            .collect(),
    }
}

fn issue_contexts(issues: &IssueMap, instance: &str) -> Vec<IssueContext> {
    issues
        .iter()
        .map(|(summary, issue)| IssueContext {
            key: issue.key.clone(),
            summary: summary.clone(),
            url: issue.url.clone(),
            browse_url: format!("{instance}/browse/{}", issue.key),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::categorize::{CategoryBucket, CategoryKey, IssueRef};

    fn issue_map(entries: &[(&str, &str, &str)]) -> IssueMap {
        entries
            .iter()
            .map(|(summary, key, url)| {
                (
                    summary.to_string(),
                    IssueRef {
                        key: key.to_string(),
                        url: url.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_render_category_with_open_and_closed() {
        let mut report: CategorizedReport = IndexMap::new();
        report.insert(
            CategoryKey::Named("Bugs".to_string()),
            CategoryBucket {
                open: issue_map(&[("open bug", "PROJ-1", "https://ci.example.com/1")]),
                closed: issue_map(&[("closed bug", "PROJ-2", "https://ci.example.com/2")]),
            },
        );

        let html = render_report(&report, "https://issues.example.com").unwrap();
        let expected = "<h1>Bugs</h1>\n\
                        <ul>\n\
                        \t<li>Open:</li>\n\
                        \t<ul>\n\
                        \t\t<li><a href=\"https://issues.example.com/browse/PROJ-1\">PROJ-1</a> - <a href=\"https://ci.example.com/1\">open bug</a></li>\n\
                        \t</ul>\n\
                        \t<li>Closed:</li>\n\
                        \t<ul>\n\
                        \t\t<li><a href=\"https://issues.example.com/browse/PROJ-2\">PROJ-2</a> - <a href=\"https://ci.example.com/2\">closed bug</a></li>\n\
                        \t</ul>\n\
                        </ul>\n\n";
        assert_eq!(html, expected);
    }

    #[test]
    fn test_render_omits_empty_sublists() {
        let mut report: CategorizedReport = IndexMap::new();
        report.insert(
            CategoryKey::Named("Docs".to_string()),
            CategoryBucket {
                open: IssueMap::new(),
                closed: issue_map(&[("doc fix", "PROJ-3", "")]),
            },
        );

        let html = render_report(&report, "https://issues.example.com").unwrap();
        assert!(!html.contains("<li>Open:</li>"));
        assert!(html.contains("<li>Closed:</li>"));
    }

    #[test]
    fn test_render_uncategorized_heading() {
        let mut report: CategorizedReport = IndexMap::new();
        report.insert(
            CategoryKey::Uncategorized,
            CategoryBucket {
                open: issue_map(&[("stray", "PROJ-4", "")]),
                closed: IssueMap::new(),
            },
        );

        let html = render_report(&report, "https://issues.example.com").unwrap();
        assert!(html.starts_with("<h1>Uncategorized</h1>\n"));
    }

    #[test]
    fn test_render_preserves_category_order() {
        let mut report: CategorizedReport = IndexMap::new();
        report.insert(
            CategoryKey::Named("Bugs".to_string()),
            CategoryBucket {
                open: IssueMap::new(),
                closed: issue_map(&[("b", "PROJ-1", "")]),
            },
        );
        report.insert(
            CategoryKey::Named("Docs".to_string()),
            CategoryBucket {
                open: IssueMap::new(),
                closed: issue_map(&[("d", "PROJ-2", "")]),
            },
        );

        let html = render_report(&report, "https://issues.example.com").unwrap();
        let bugs_at = html.find("<h1>Bugs</h1>").unwrap();
        let docs_at = html.find("<h1>Docs</h1>").unwrap();
        assert!(bugs_at < docs_at);
    }

    #[test]
    fn test_render_trims_instance_trailing_slash() {
        let mut report: CategorizedReport = IndexMap::new();
        report.insert(
            CategoryKey::Named("Bugs".to_string()),
            CategoryBucket {
                open: IssueMap::new(),
                closed: issue_map(&[("b", "PROJ-1", "")]),
            },
        );

        let html = render_report(&report, "https://issues.example.com/").unwrap();
        assert!(html.contains("href=\"https://issues.example.com/browse/PROJ-1\""));
    }

    #[test]
    fn test_render_empty_report() {
        let report = CategorizedReport::new();
        let html = render_report(&report, "https://issues.example.com").unwrap();
        assert_eq!(html, "");
    }
}
