use poolside_core::models::{DqCodeCatalog, Event, Heat, Swimmer};
use poolside_core::JudgeSession;

use crate::error::CliError;

pub fn format_event_lines(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| format!("{:>3}  {:<40}  id {}", event.number, event.name, event.id))
        .collect()
}

pub fn format_heat_lines(heats: &[Heat]) -> Vec<String> {
    heats
        .iter()
        .map(|heat| format!("Heat {:<3}  id {}", heat.number, heat.id))
        .collect()
}

pub fn format_swimmer_lines(swimmers: &[Swimmer]) -> Vec<String> {
    swimmers
        .iter()
        .map(|swimmer| {
            format!(
                "Lane {:<2}  {:<28}  {:<8}  id {}",
                swimmer.lane, swimmer.name, swimmer.team, swimmer.id
            )
        })
        .collect()
}

pub fn format_code_lines(catalog: &DqCodeCatalog) -> Vec<String> {
    let mut lines = Vec::new();
    for (category, codes) in catalog.categories() {
        lines.push(format!("{category}:"));
        lines.extend(
            codes
                .iter()
                .map(|code| format!("  {:<5} {}", code.code, code.description)),
        );
    }
    lines
}

fn print_lines(lines: Vec<String>, empty: &str) {
    if lines.is_empty() {
        println!("{empty}");
    }
    for line in lines {
        println!("{line}");
    }
}

pub async fn run_events(session: &JudgeSession) -> Result<(), CliError> {
    let events = session.store().list_events().await?;
    print_lines(
        format_event_lines(&events),
        "No events loaded. Run `poolside snapshot import <path>` or `poolside snapshot demo`.",
    );
    Ok(())
}

pub async fn run_heats(session: &JudgeSession, event_id: i64) -> Result<(), CliError> {
    let heats = session.store().list_heats_by_event(event_id).await?;
    print_lines(format_heat_lines(&heats), "No heats for this event.");
    Ok(())
}

pub async fn run_swimmers(session: &JudgeSession, heat_id: i64) -> Result<(), CliError> {
    let swimmers = session.store().list_swimmers_by_heat(heat_id).await?;
    print_lines(format_swimmer_lines(&swimmers), "No swimmers in this heat.");
    Ok(())
}

pub fn run_codes(session: &JudgeSession) {
    match session.code_catalog() {
        Some(catalog) => print_lines(format_code_lines(catalog), "Code catalog is empty."),
        None => println!("No DQ code catalog configured; any code is accepted locally."),
    }
}
