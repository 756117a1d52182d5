use clap::{Args, Parser, Subcommand, ValueEnum};

/// jreport — weekly Jira report generator
#[derive(Parser, Debug, Clone)]
#[command(name = "jreport", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print verbose (debug) messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set the logging level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch issues from Jira and generate HTML and image reports
    GenerateReport(GenerateReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateReportArgs {
    /// How many days ago to look for closed issues
    #[arg(long, default_value_t = 7)]
    pub days_ago: u64,

    /// Show results till this date, in YYYY-MM-DD format (default: today)
    #[arg(long)]
    pub till: Option<String>,

    /// Path to configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Output HTML file to write to
    #[arg(long, default_value = "report.html")]
    pub html_output: String,

    /// Output image file to write to
    #[arg(long, default_value = "report.png")]
    pub image_output: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
