use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Generate, store and report on test cases")]
pub struct Cli {
    /// Path to the saved test cases (":memory:" for a throwaway store)
    #[clap(long)]
    pub store: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the current settings
    Show,

    /// Change one or more settings
    Set {
        /// Webhook that generates test cases (empty string clears it)
        #[clap(long)]
        webhook_url: Option<String>,

        /// Default location of the saved test cases
        #[clap(long)]
        store_path: Option<String>,

        /// Seconds to wait for the webhook before giving up
        #[clap(long)]
        timeout_secs: Option<u64>,

        /// Milliseconds between progress updates
        #[clap(long)]
        poll_interval_ms: Option<u64>,

        /// Drop incoming test cases whose ticket or id was already saved
        #[clap(long)]
        dedupe: Option<bool>,

        /// Number of modules shown in the module chart
        #[clap(long)]
        top_modules: Option<usize>,
    },

    /// Print the path to the settings file
    Path,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the webhook to generate test cases and save them
    Generate {
        /// Operating system under test
        #[clap(long)]
        os: Option<String>,

        /// Sheet or link reference
        #[clap(long)]
        sheet: Option<String>,

        /// Ticket reference
        #[clap(long)]
        ticket_id: Option<String>,

        /// Module under test
        #[clap(long)]
        module: Option<String>,

        /// Short summary
        #[clap(long)]
        summary: Option<String>,

        /// Acceptance criteria or user story
        #[clap(long)]
        ac: Option<String>,

        /// Longer description
        #[clap(long)]
        desc: Option<String>,

        /// What to generate: tc (test cases) or ts (test scenarios)
        #[clap(long)]
        kind: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,

        /// Drop incoming test cases whose ticket or id was already saved
        #[clap(long)]
        dedupe: bool,

        /// Webhook URL for this call only
        #[clap(long)]
        webhook_url: Option<String>,

        /// Also write the generated test cases to this CSV file
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List saved test cases
    List,

    /// Summarize saved test cases or an uploaded sheet
    Report {
        /// Report on this CSV sheet instead of the saved test cases
        #[clap(long)]
        csv: Option<PathBuf>,

        /// Only include these modules (repeatable)
        #[clap(long)]
        module: Vec<String>,

        /// Only include these statuses (repeatable)
        #[clap(long)]
        status: Vec<String>,

        /// Only include these test case types (repeatable)
        #[clap(long)]
        r#type: Vec<String>,

        /// Number of modules in the module chart
        #[clap(long)]
        top: Option<usize>,

        /// Output format (text, json)
        #[clap(long, default_value = "text")]
        format: String,
    },

    /// Export saved test cases as CSV
    Export {
        /// Output file (defaults to stdout)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Settings management
    #[clap(subcommand)]
    Config(ConfigCommand),
}
