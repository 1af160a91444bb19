//! `normalize` command: show events after heuristic field extraction.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use rollcall_core::{LevelPolicy, NormalizedEvent, normalize_event};

use super::report::load_events;

pub fn run(events_path: &Path, json: bool, policy: LevelPolicy) -> Result<()> {
    let raw_events = load_events(events_path)?;
    let received_at = Utc::now();
    let normalized: Vec<NormalizedEvent> = raw_events
        .iter()
        .map(|raw| normalize_event(raw, received_at, policy))
        .collect();

    if json {
        for event in &normalized {
            println!("{}", serde_json::to_string(event)?);
        }
    } else {
        for event in &normalized {
            println!("{}", format_event(event));
        }
        println!("{} event(s)", normalized.len());
    }
    Ok(())
}

pub fn format_event(event: &NormalizedEvent) -> String {
    let level = event.level.as_ref().map_or("-", |level| level.as_str());
    let host = event.host.as_deref().unwrap_or("-");
    let app = event.app.as_deref().unwrap_or("-");
    format!(
        "{}  {:<7}{:<16}{:<16}{}",
        event.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        level,
        host,
        app,
        event.message,
    )
}
