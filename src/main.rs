use std::path::Path;

use chrono::{Days, NaiveDate, Utc};
use clap::Parser;
use tracing::info;

use jreport::categorize::{self, IssueState};
use jreport::cli::{Cli, Command, GenerateReportArgs};
use jreport::config::Config;
use jreport::error::{Error, Result};
use jreport::html;
use jreport::jira::JiraClient;
use jreport::render;

const TEMPLATE_DIR: &str = "img";

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        cli.log_level.as_level()
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Command::GenerateReport(args) => generate_report(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn generate_report(args: &GenerateReportArgs) -> Result<()> {
    let till = match &args.till {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
            Error::ConfigValidation(format!(
                "invalid --till date '{raw}': {e} (expected YYYY-MM-DD)"
            ))
        })?,
        None => Utc::now().date_naive(),
    };
    let since = till.checked_sub_days(Days::new(args.days_ago)).ok_or_else(|| {
        Error::ConfigValidation(format!("--days-ago {} is out of range", args.days_ago))
    })?;

    info!("generating report for period {since} to {till}");

    let config = Config::load(Path::new(&args.config))?;
    info!("loaded configuration from {}", args.config);

    let general = &config.general;
    let jira = JiraClient::new(general);

    info!(
        "retrieving closed issues with states: {}",
        general.jira_closed_states.join(", ")
    );
    let closed = jira.get_issues(
        &general.jira_labels,
        &general.jira_components,
        &general.jira_closed_states,
        Some(since),
        Some(till),
    )?;
    info!("retrieved {} closed issues", closed.len());

    info!(
        "retrieving open issues with states: {}",
        general.jira_open_states.join(", ")
    );
    let open = jira.get_issues(
        &general.jira_labels,
        &general.jira_components,
        &general.jira_open_states,
        None,
        None,
    )?;
    info!("retrieved {} open issues", open.len());

    info!("processing closed issues");
    let closed_outcome =
        categorize::categorize(&closed, IssueState::Closed, &config.rules, config.url_field());
    info!("processing open issues");
    let open_outcome =
        categorize::categorize(&open, IssueState::Open, &config.rules, config.url_field());

    let report = categorize::merge_outcomes(open_outcome, closed_outcome, &config.rules);

    info!("generating HTML report to {}", args.html_output);
    html::write_report(&report, &general.jira_instance, Path::new(&args.html_output))?;
    info!("HTML report generated successfully");

    info!("generating image report to {}", args.image_output);
    render::render_image_report(
        &report,
        &config.rules,
        Path::new(&args.image_output),
        Path::new(TEMPLATE_DIR),
    )?;
    info!("image report generated successfully");

    Ok(())
}
