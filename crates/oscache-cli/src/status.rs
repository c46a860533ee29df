//! `oscache status` — fetch the feed and report the current outage state.
//!
//! Shows the feed state with its notification style and the outages inside
//! the configured display window. An unreadable feed is reported as the
//! `error` state rather than a command failure.

use std::path::Path;

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde_json::json;

use oscache_core::config::{Config, OutageState};
use oscache_core::utils::{format_unix, unix_now};
use oscache_feed::{check_feed, source_for_url, FeedStatus, OutageParser, Scope};

use crate::helpers;

/// Run the status command.
pub async fn run(config_path: &Path, as_json: bool, verbose: bool) -> Result<()> {
    let config = helpers::load(config_path)?;
    let now = unix_now();
    let status = fetch_status(&config, now).await;

    if as_json {
        let value = status_json(&config, &status);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_status(&config, &status, verbose);
    }
    Ok(())
}

async fn fetch_status(config: &Config, now: i64) -> FeedStatus {
    let source = match source_for_url(&config.sources.feed_url, config.sources.url_timeout) {
        Ok(source) => source,
        Err(e) => return FeedStatus::error(e.to_string()),
    };
    let parser = match OutageParser::from_config(&config.parsing) {
        Ok(parser) => parser,
        Err(e) => return FeedStatus::error(format!("invalid resolved pattern: {e}")),
    };
    check_feed(source.as_ref(), &parser, now, Scope::from_config(&config.parsing)).await
}

fn status_json(config: &Config, status: &FeedStatus) -> serde_json::Value {
    let style = config.states.style(status.state);
    json!({
        "state": status.state.as_str(),
        "icon": style.icon,
        "timeout_ms": style.timeout_ms,
        "urgency": style.urgency.as_str(),
        "error": status.error,
        "website_url": config.sources.website_url,
        "outages": status
            .outages
            .iter()
            .map(|c| {
                let mut value = json!(c.outage);
                value["state"] = json!(c.state.as_str());
                value
            })
            .collect::<Vec<_>>(),
    })
}

fn colored_state(state: OutageState) -> ColoredString {
    let name = state.as_str();
    match state {
        OutageState::Active | OutageState::Error => name.red().bold(),
        OutageState::Scheduled => name.yellow(),
        OutageState::Default => name.normal(),
        OutageState::Completed | OutageState::None => name.green(),
    }
}

fn print_status(config: &Config, status: &FeedStatus, verbose: bool) {
    helpers::print_heading("Outage Status");

    let style = config.states.style(status.state);
    println!("  {:<12} {}", "State:".bold(), colored_state(status.state));
    println!(
        "  {:<12} {} | timeout: {}ms | {}",
        "Style:".bold(),
        style.icon,
        style.timeout_ms,
        style.urgency.as_str().dimmed()
    );
    println!("  {:<12} {}", "Feed:".bold(), config.sources.feed_url);
    println!("  {:<12} {}", "Website:".bold(), config.sources.website_url);

    if let Some(err) = &status.error {
        println!();
        println!("  {} {}", "✗".red(), err);
        println!();
        return;
    }

    println!();
    if status.outages.is_empty() {
        println!("  {}", "No outages in scope.".dimmed());
        println!();
        return;
    }

    println!(
        "  {:<11} {:<17} {:<17} {}",
        "State".bold(),
        "Start".bold(),
        "End".bold(),
        "Title".bold(),
    );
    println!("  {}", "─".repeat(72));
    for c in &status.outages {
        let end = c
            .outage
            .end_time
            .map(format_unix)
            .unwrap_or_else(|| "—".to_string());
        println!(
            "  {:<11} {:<17} {:<17} {}",
            colored_state(c.state),
            format_unix(c.outage.start_time),
            end,
            c.outage.title
        );
        if verbose {
            if !c.outage.link.is_empty() {
                println!("  {:<47} {}", "", c.outage.link.dimmed());
            }
            for line in c.outage.description.lines().filter(|l| !l.trim().is_empty()) {
                println!("  {:<47} {}", "", line.dimmed());
            }
        }
    }
    println!();
}
