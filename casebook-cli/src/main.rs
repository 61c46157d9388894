mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde_json::json;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use casebook_core::{
    build_charts, export_csv, export_csv_file, get_config_path, open_store, submit_and_save,
    stored_id, CaseStore, Chart, Counts, Dedupe, Report, ReportInput, ReportOptions, ReportSource,
    Selection, Settings, Status, SubmissionKind, SubmissionOptions, SubmissionRequest, TestCase,
    WebhookClient, WebhookResponse,
};

use crate::cli::{Cli, Command, ConfigCommand};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Effective settings plus the store they select
fn load_store(cli_store: Option<&Path>) -> Result<(Settings, Box<dyn CaseStore>)> {
    let settings = Settings::load_default()?;
    let store = open_store(&settings.resolve_store_path(cli_store));
    Ok((settings, store))
}

fn run(cli: Cli) -> Result<()> {
    let cli_store = cli.store.as_deref();

    match cli.command {
        Command::Generate {
            os,
            sheet,
            ticket_id,
            module,
            summary,
            ac,
            desc,
            kind,
            interactive,
            dedupe,
            webhook_url,
            output,
        } => {
            // Default to interactive mode if no specific arguments are provided
            let should_be_interactive = interactive
                || (os.is_none()
                    && sheet.is_none()
                    && ticket_id.is_none()
                    && module.is_none()
                    && summary.is_none()
                    && ac.is_none()
                    && desc.is_none());

            let (settings, store) = load_store(cli_store)?;
            let request = if should_be_interactive {
                crate::prompts::prompt_submission()?
            } else {
                SubmissionRequest {
                    os: os.unwrap_or_default(),
                    sheet: sheet.unwrap_or_default(),
                    ticket_id: ticket_id.unwrap_or_default(),
                    module: module.unwrap_or_default(),
                    summary: summary.unwrap_or_default(),
                    ac: ac.unwrap_or_default(),
                    desc: desc.unwrap_or_default(),
                    kind: parse_kind(kind.as_deref())?,
                }
            };

            let mut options = SubmissionOptions::from(&settings);
            if dedupe {
                options.dedupe = Dedupe::ByKey;
            }
            let url = webhook_url.or_else(|| settings.webhook_url.clone());
            generate(
                store.as_ref(),
                url,
                request,
                &settings,
                &options,
                output.as_deref(),
            )?;
        }
        Command::List => {
            let (_, store) = load_store(cli_store)?;
            list_cases(store.as_ref());
        }
        Command::Report {
            csv,
            module,
            status,
            r#type,
            top,
            format,
        } => {
            let (settings, store) = load_store(cli_store)?;
            let mut selection = Selection::all();
            if !module.is_empty() {
                selection = selection.with_modules(module);
            }
            if !status.is_empty() {
                selection = selection.with_statuses(status);
            }
            if !r#type.is_empty() {
                selection = selection.with_types(r#type);
            }
            let options = ReportOptions {
                selection,
                top_modules: top.unwrap_or(settings.top_modules),
            };
            show_report(store.as_ref(), csv.as_deref(), &options, &format)?;
        }
        Command::Export { output } => {
            let (_, store) = load_store(cli_store)?;
            export_cases(store.as_ref(), output.as_deref())?;
        }
        Command::Config(config_cmd) => {
            handle_config_command(&config_cmd)?;
        }
    }

    Ok(())
}

fn parse_kind(kind: Option<&str>) -> Result<SubmissionKind> {
    match kind {
        None => Ok(SubmissionKind::default()),
        Some(s) => SubmissionKind::from_str(s)
            .with_context(|| format!("Invalid kind '{}'. Use 'tc' or 'ts'.", s)),
    }
}

fn generate(
    store: &dyn CaseStore,
    url: Option<String>,
    request: SubmissionRequest,
    settings: &Settings,
    options: &SubmissionOptions,
    output: Option<&Path>,
) -> Result<()> {
    let url = url.filter(|u| !u.trim().is_empty()).context(
        "No webhook URL configured. Use 'casebook config set --webhook-url URL' or set CASEBOOK_WEBHOOK_URL.",
    )?;
    let client = WebhookClient::with_timeout(url, settings.timeout())?;

    let outcome = submit_and_save(store, Arc::new(client), request, options, |percent| {
        eprint!("\r{} {:>3}%", "Waiting for webhook...".cyan(), percent);
        let _ = io::stderr().flush();
    });
    eprintln!();
    let outcome = outcome?;

    println!("{} Submission successful.", "✓".green());

    match &outcome.response {
        WebhookResponse::Json(value) => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        WebhookResponse::Text(text) => {
            println!("{}", text);
            println!("{}", "Response is not JSON; nothing was saved.".yellow());
        }
    }

    match &outcome.saved {
        Some(Ok(result)) => {
            let ids: Vec<String> = result.saved.iter().filter_map(stored_id).collect();
            println!(
                "{} Saved {} test case(s) to {} ({} total)",
                "✓".green(),
                result.saved.len(),
                store.location(),
                result.total
            );
            if !ids.is_empty() {
                println!("  {}: {}", "IDs".cyan(), ids.join(", "));
            }
            if result.dropped > 0 {
                println!(
                    "  {} duplicate(s) dropped",
                    result.dropped.to_string().yellow()
                );
            }
            if result.pruned > 0 {
                println!(
                    "  {} previously saved duplicate(s) removed",
                    result.pruned.to_string().yellow()
                );
            }
        }
        Some(Err(e)) => {
            println!(
                "{} Failed to save response to {}: {}",
                "✗".red(),
                store.location(),
                e
            );
        }
        None => {}
    }

    if let Some(path) = output {
        if outcome.records.is_empty() {
            println!("{}", "No test cases in the response; no CSV written.".yellow());
        } else {
            export_csv_file(&outcome.records, path)?;
            println!(
                "{} Wrote {} test case(s) to {}",
                "✓".green(),
                outcome.records.len(),
                path.display()
            );
        }
    }

    Ok(())
}

fn colored_status(status: &Status) -> colored::ColoredString {
    match status {
        Status::Pass => status.as_str().green(),
        Status::Fail => status.as_str().red(),
        Status::NotTested => status.as_str().yellow(),
        Status::Other(s) => s.as_str().normal(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn list_cases(store: &dyn CaseStore) {
    let records = match store.try_load() {
        Ok(Some(records)) => records,
        Ok(None) => {
            println!("{}", "No saved test cases yet.".yellow());
            return;
        }
        Err(e) => {
            println!(
                "{} {}",
                "Error while loading saved test cases:".yellow(),
                e
            );
            return;
        }
    };

    if records.is_empty() {
        println!("{}", "No saved test cases yet.".yellow());
        return;
    }

    println!(
        "{:<10} | {:<20} | {:<12} | {:<10} | {:<50}",
        "ID", "Module", "Type", "Status", "Summary"
    );
    println!("{}", "-".repeat(112));

    for case in records.iter().map(TestCase::from_record) {
        println!(
            "{:<10} | {:<20} | {:<12} | {:<10} | {:<50}",
            case.id.as_deref().unwrap_or("-"),
            truncate(&case.module, 20),
            truncate(case.type_key(), 12),
            colored_status(&case.status),
            truncate(case.summary.as_deref().unwrap_or(""), 50)
        );
    }

    println!("\n{} test case(s) in {}", records.len(), store.location());
}

fn show_report(
    store: &dyn CaseStore,
    csv: Option<&Path>,
    options: &ReportOptions,
    format: &str,
) -> Result<()> {
    let input = match ReportInput::load(store, csv)? {
        Some(input) => input,
        None => {
            println!(
                "{}",
                "No saved test cases yet. Generate some or pass --csv FILE.".yellow()
            );
            return Ok(());
        }
    };

    let report = Report::build(&input, options);
    let charts = build_charts(&report);

    match format.to_lowercase().as_str() {
        "json" => {
            let doc = json!({ "report": report, "charts": charts });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        "text" => print_report(&report, &charts),
        _ => anyhow::bail!("Invalid format. Use 'text' or 'json'."),
    }

    Ok(())
}

fn print_counts(title: &str, counts: &Counts) {
    println!("\n{}", title.blue().bold());
    for entry in counts.most_common() {
        println!("  {:<30} {:>6}", entry.value, entry.count);
    }
}

fn print_report(report: &Report, charts: &[Chart]) {
    let source = match &report.source {
        ReportSource::Store(location) => format!("saved test cases ({})", location),
        ReportSource::Upload(location) => format!("uploaded sheet ({})", location),
    };
    println!("{}: {}", "Source".cyan(), source);
    println!("{}: {}", "Rows matched".cyan(), report.matched_rows);
    println!(
        "{}: {}",
        "Total unique test cases".cyan(),
        report.unique_cases.to_string().bold()
    );

    if report.is_empty() {
        println!("{}", "No test cases match the current filters.".yellow());
        return;
    }

    let p = report.polarity;
    println!("\n{}", "Positive vs Negative".blue().bold());
    println!(
        "  {} {}   {} {}   {} {}",
        "Positive:".green(),
        p.positive,
        "Negative:".red(),
        p.negative,
        "Other:".normal(),
        p.other
    );

    print_counts("Status", &report.statuses);
    print_counts("Test Case Type", &report.types);

    println!(
        "\n{}",
        format!("Top {} Modules", report.top_modules.len()).blue().bold()
    );
    let widest = report.top_modules.first().map_or(1, |e| e.count.max(1));
    for entry in &report.top_modules {
        let bar = "#".repeat((entry.count * 40).div_ceil(widest));
        println!(
            "  {:<24} {:>5} {}",
            truncate(&entry.value, 24),
            entry.count,
            bar.cyan()
        );
    }

    if !report.heatmap.is_empty() {
        println!("\n{}", "Module vs Status".blue().bold());
        for cell in &report.heatmap {
            println!(
                "  {:<24} {:<14} {:>5}",
                truncate(&cell.module, 24),
                colored_status(&Status::normalize(&cell.status)),
                cell.count
            );
        }
    }

    println!("\n{}", "Pass/Fail over time".blue().bold());
    if report.timeline.is_empty() {
        println!("  {}", "No date columns found.".yellow());
    } else {
        println!("  {:<12} {:>6} {:>6} {:>6}", "Date", "Pass", "Fail", "Other");
        for point in &report.timeline {
            println!(
                "  {:<12} {:>6} {:>6} {:>6}",
                point.date.format("%Y-%m-%d"),
                point.pass,
                point.fail,
                point.other
            );
        }
    }

    let empty: Vec<&str> = charts
        .iter()
        .filter(|c| c.is_empty())
        .map(|c| c.title.as_str())
        .collect();
    if !empty.is_empty() {
        println!("\n{} {}", "No chart data for:".yellow(), empty.join(", "));
    }
}

fn export_cases(store: &dyn CaseStore, output: Option<&Path>) -> Result<()> {
    let records = match store.try_load()? {
        Some(records) if !records.is_empty() => records,
        _ => {
            println!("{}", "No saved test cases to export.".yellow());
            return Ok(());
        }
    };

    match output {
        Some(path) => {
            export_csv_file(&records, path)?;
            println!(
                "{} Exported {} test case(s) to {}",
                "✓".green(),
                records.len(),
                path.display()
            );
        }
        None => {
            let bytes = export_csv(&records).context("Failed to serialize records as CSV")?;
            io::stdout().write_all(&bytes)?;
        }
    }

    Ok(())
}

fn handle_config_command(cmd: &ConfigCommand) -> Result<()> {
    let config_path = get_config_path()?;

    match cmd {
        ConfigCommand::Show => {
            // Effective values, environment overrides included
            let settings = Settings::load_default()?;
            println!("{}", "Settings:".blue().bold());
            println!();
            println!(
                "{}: {}",
                "Webhook URL".cyan(),
                settings.webhook_url.as_deref().unwrap_or("(not set)")
            );
            println!("{}: {}", "Store path".cyan(), settings.store_path);
            println!("{}: {}s", "Timeout".cyan(), settings.timeout_secs);
            println!("{}: {}ms", "Poll interval".cyan(), settings.poll_interval_ms);
            println!("{}: {}", "Dedupe".cyan(), settings.dedupe);
            println!("{}: {}", "Top modules".cyan(), settings.top_modules);
        }
        ConfigCommand::Set {
            webhook_url,
            store_path,
            timeout_secs,
            poll_interval_ms,
            dedupe,
            top_modules,
        } => {
            // Only the file's own values are written back, never overrides
            let mut settings = Settings::load(&config_path)?;

            if let Some(url) = webhook_url {
                settings.webhook_url = Some(url.clone()).filter(|u| !u.trim().is_empty());
            }
            if let Some(path) = store_path {
                settings.store_path = path.clone();
            }
            if let Some(secs) = timeout_secs {
                settings.timeout_secs = *secs;
            }
            if let Some(ms) = poll_interval_ms {
                settings.poll_interval_ms = *ms;
            }
            if let Some(dedupe) = dedupe {
                settings.dedupe = *dedupe;
            }
            if let Some(top) = top_modules {
                settings.top_modules = *top;
            }

            settings.save(&config_path)?;
            println!(
                "{} Settings saved to {}",
                "✓".green(),
                config_path.display()
            );
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
