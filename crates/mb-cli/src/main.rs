//! MoJuBlock CLI
//!
//! Manages the blocklists and site state, evaluates pages, and runs the
//! daily background updater.

mod config;
mod daemon;
mod fetch;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mb_core::url::{extract_host, normalize_host};
use mb_core::{BlockReason, Blocker, Clock, FileStore, PageContent, SystemClock};

use crate::config::Config;
use crate::daemon::{run_daemon, DaemonOptions};
use crate::fetch::{HttpFetcher, HttpReportSink};

#[derive(Parser)]
#[command(name = "mojublock")]
#[command(about = "MoJuBlock blocklist manager and page checker")]
struct Cli {
    /// Config file (default: <config dir>/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding persisted state
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Override the URL blocklist endpoint
    #[arg(long, global = true)]
    url_list: Option<String>,

    /// Override the keyword blocklist endpoint
    #[arg(long, global = true)]
    word_list: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both blocklists and replace the stored snapshot
    Refresh,

    /// Evaluate a page against the current blocklists
    Check {
        /// Hostname of the page
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        host: Option<String>,

        /// Full page URL (hostname is extracted)
        #[arg(long)]
        url: Option<String>,

        /// Page title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Page text
        #[arg(long, default_value = "", conflicts_with = "text_file")]
        text: String,

        /// Read page text from a file
        #[arg(long)]
        text_file: Option<PathBuf>,
    },

    /// Exempt a site from keyword blocking
    Ignore {
        host: String,
    },

    /// Remove a site's exemption
    Unignore {
        host: String,
    },

    /// List active exemptions (expired ones are purged)
    Ignored,

    /// Purge expired exemptions
    Sweep,

    /// Report a link
    Report {
        host: String,

        #[arg(short, long, default_value = "")]
        title: String,

        /// Why it was blocked: url or word
        #[arg(short, long, default_value = "word", value_parser = parse_reason)]
        reason: BlockReason,
    },

    /// List stored reports
    Reports {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show blocklist and site-state counters
    Stats,

    /// Refresh on a schedule until interrupted
    Daemon,
}

fn parse_reason(s: &str) -> Result<BlockReason, String> {
    BlockReason::parse(s).ok_or_else(|| format!("unknown reason '{}', expected url or word", s))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("MOJUBLOCK_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    // Also installs the bridge that forwards mb-core's `log` records.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.state_dir {
        config.state_dir = Some(dir);
    }
    if let Some(url_list) = cli.url_list {
        config.url_blacklist_endpoint = url_list;
    }
    if let Some(word_list) = cli.word_list {
        config.word_blacklist_endpoint = word_list;
    }

    let state_dir = config.state_dir()?;
    let store = FileStore::open(&state_dir)
        .map_err(|e| format!("Failed to open state directory '{}': {}", state_dir.display(), e))?;
    let mut blocker = Blocker::with_options(Arc::new(store), Arc::new(SystemClock), config.blocker_options());

    if let Some(endpoint) = &config.report_endpoint {
        let sink = HttpReportSink::new(endpoint.clone(), config.fetch_timeout())?;
        blocker = blocker.with_report_sink(Arc::new(sink));
    }

    match cli.command {
        Commands::Refresh => cmd_refresh(&blocker, &config),
        Commands::Check {
            host,
            url,
            title,
            text,
            text_file,
        } => cmd_check(&blocker, host, url, title, text, text_file),
        Commands::Ignore { host } => cmd_ignore(&blocker, &host),
        Commands::Unignore { host } => cmd_unignore(&blocker, &host),
        Commands::Ignored => cmd_ignored(&blocker),
        Commands::Sweep => cmd_sweep(&blocker),
        Commands::Report { host, title, reason } => cmd_report(&blocker, &host, &title, reason),
        Commands::Reports { json } => cmd_reports(&blocker, json),
        Commands::Stats => cmd_stats(&blocker),
        Commands::Daemon => {
            let fetcher = HttpFetcher::new(config.fetch_timeout())?;
            run_daemon(
                Arc::new(blocker),
                Arc::new(fetcher),
                DaemonOptions {
                    sources: config.sources(),
                    interval: config.refresh_interval(),
                },
            )
        }
    }
}

fn client_context() -> String {
    format!("mojublock-cli/{}", env!("CARGO_PKG_VERSION"))
}

fn cmd_refresh(blocker: &Blocker, config: &Config) -> Result<(), String> {
    let fetcher = HttpFetcher::new(config.fetch_timeout())?;
    let report = blocker
        .refresh_lists(&fetcher, &config.sources())
        .map_err(|e| format!("Refresh failed: {}", e))?;

    println!("Blocklists updated");
    println!("  URLs:     {} ({} lines)", report.url_stats.entries, report.url_stats.lines);
    println!("  Words:    {} ({} lines)", report.word_stats.entries, report.word_stats.lines);
    if report.rejected_patterns > 0 {
        println!("  Rejected: {} keyword pattern(s)", report.rejected_patterns);
    }
    Ok(())
}

fn cmd_check(
    blocker: &Blocker,
    host: Option<String>,
    url: Option<String>,
    title: String,
    text: String,
    text_file: Option<PathBuf>,
) -> Result<(), String> {
    let hostname = match (host, url) {
        (Some(host), _) => normalize_host(&host),
        (None, Some(url)) => extract_host(&url)
            .map(normalize_host)
            .ok_or_else(|| format!("Could not extract a hostname from '{}'", url))?,
        (None, None) => return Err("Pass --host or --url".to_string()),
    };

    let page_text = match text_file {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?,
        None => text,
    };

    let page = PageContent::new(hostname, title, page_text);
    let verdict = blocker
        .evaluate(&page)
        .map_err(|e| format!("Evaluation failed: {}", e))?;

    match verdict.reason {
        Some(reason) => {
            println!("BLOCKED ({reason}): {}", page.hostname);
            if let Some(message) = verdict.message(&page.hostname) {
                println!("  {message}");
            }
            if verdict.can_ignore() {
                println!("  Run `mojublock ignore {}` to allow it for 7 days", page.hostname);
            }
        }
        None => println!("allowed: {}", page.hostname),
    }
    Ok(())
}

fn cmd_ignore(blocker: &Blocker, host: &str) -> Result<(), String> {
    let host = normalize_host(host);
    let expiry = blocker
        .ignore_site(&host)
        .map_err(|e| format!("Failed to ignore '{}': {}", host, e))?;
    let remaining = expiry.saturating_sub(SystemClock.now_ms());
    println!("{} ignored for {}", host, format_remaining(remaining));
    Ok(())
}

fn cmd_unignore(blocker: &Blocker, host: &str) -> Result<(), String> {
    let host = normalize_host(host);
    let removed = blocker
        .remove_ignored(&host)
        .map_err(|e| format!("Failed to remove '{}': {}", host, e))?;
    if removed {
        println!("{} is no longer ignored", host);
    } else {
        println!("{} was not ignored", host);
    }
    Ok(())
}

fn cmd_ignored(blocker: &Blocker) -> Result<(), String> {
    let entries = blocker
        .list_ignored()
        .map_err(|e| format!("Failed to read ignored sites: {}", e))?;
    if entries.is_empty() {
        println!("No ignored sites");
        return Ok(());
    }

    let now = SystemClock.now_ms();
    for entry in entries {
        println!(
            "  {:<40} expires in {}",
            entry.hostname,
            format_remaining(entry.expiry.saturating_sub(now))
        );
    }
    Ok(())
}

fn cmd_sweep(blocker: &Blocker) -> Result<(), String> {
    let purged = blocker
        .sweep_ignored()
        .map_err(|e| format!("Sweep failed: {}", e))?;
    println!("Purged {} expired entr{}", purged, if purged == 1 { "y" } else { "ies" });
    Ok(())
}

fn cmd_report(blocker: &Blocker, host: &str, title: &str, reason: BlockReason) -> Result<(), String> {
    let host = normalize_host(host);
    blocker
        .report_link(&host, title, reason, &client_context())
        .map_err(|e| format!("Failed to record report: {}", e))?;
    println!("Reported {} ({})", host, reason);
    Ok(())
}

fn cmd_reports(blocker: &Blocker, json: bool) -> Result<(), String> {
    let reports = blocker
        .reports()
        .list()
        .map_err(|e| format!("Failed to read reports: {}", e))?;

    if json {
        let out = serde_json::to_string_pretty(&reports)
            .map_err(|e| format!("Failed to serialize JSON: {}", e))?;
        println!("{out}");
        return Ok(());
    }

    if reports.is_empty() {
        println!("No reports");
        return Ok(());
    }
    let now = SystemClock.now_ms();
    for report in reports {
        println!(
            "  [{}] {:<40} {:?} ({} ago)",
            report.reason,
            report.hostname,
            report.title,
            format_remaining(now.saturating_sub(report.timestamp))
        );
    }
    Ok(())
}

fn cmd_stats(blocker: &Blocker) -> Result<(), String> {
    let stats = blocker
        .stats()
        .map_err(|e| format!("Failed to read state: {}", e))?;

    println!("Blocklists:");
    println!("  URLs:        {}", stats.url_count);
    println!("  Words:       {}", stats.word_count);
    if stats.rejected_patterns > 0 {
        println!("  Rejected:    {}", stats.rejected_patterns);
    }
    match stats.last_update_time {
        Some(ts) => println!(
            "  Updated:     {} ago",
            format_remaining(SystemClock.now_ms().saturating_sub(ts))
        ),
        None => println!("  Updated:     never"),
    }
    println!();
    println!("Site state:");
    println!("  Ignored:     {}", stats.ignored_count);
    println!("  Reports:     {}", stats.report_count);
    Ok(())
}

/// Coarse "3d 4h" / "12m" rendering of a millisecond span.
fn format_remaining(ms: u64) -> String {
    let minutes = ms / 60_000;
    let (days, hours, mins) = (minutes / 1440, (minutes / 60) % 24, minutes % 60);
    match (days, hours) {
        (0, 0) => format!("{}m", mins),
        (0, _) => format!("{}h {}m", hours, mins),
        _ => format!("{}d {}h", days, hours),
    }
}
