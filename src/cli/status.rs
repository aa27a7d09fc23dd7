use crate::cli::run::require_config_path;
use crate::config::parse::load_config;
use crate::spool::Spool;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Print the state of the on-disk spool.
pub fn status(config_path: Option<PathBuf>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = require_config_path(config_path);
    let config = load_config(&config_path)?;
    let spool = Spool::open_existing(&config.spool)?;
    let status = spool.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let now = Utc::now();
    println!("Spool:     {}", status.path);
    println!("Batches:   {} / {}", status.queued, status.capacity);
    println!("Oldest:    {}", describe_age(status.oldest_batch, now));
    println!("Newest:    {}", describe_age(status.newest_batch, now));
    println!(
        "Retention: {}s (swept every {}s)",
        config.spool.retention_seconds, config.spool.sweep_interval_seconds
    );
    Ok(())
}

/// Delete expired batches once and report how many went.
pub fn purge(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = require_config_path(config_path);
    let config = load_config(&config_path)?;
    let spool = Spool::open_existing(&config.spool)?;

    let report = spool.sweeper().sweep_once();
    println!(
        "Scanned {} batch files, removed {} expired, {} could not be removed",
        report.scanned, report.expired, report.failed
    );
    Ok(())
}

fn describe_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match created {
        None => "-".to_string(),
        Some(created) => {
            let age = (now - created).num_seconds().max(0);
            format!("{} ({} ago)", created.to_rfc3339(), format_seconds(age))
        }
    }
}

fn format_seconds(secs: i64) -> String {
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(5), "5s");
        assert_eq!(format_seconds(125), "2m5s");
        assert_eq!(format_seconds(7_320), "2h2m");
    }

    #[test]
    fn test_describe_age() {
        let now = Utc.with_ymd_and_hms(2026, 1, 28, 12, 0, 0).unwrap();
        assert_eq!(describe_age(None, now), "-");

        let created = now - chrono::Duration::seconds(90);
        assert!(describe_age(Some(created), now).ends_with("(1m30s ago)"));
    }
}
