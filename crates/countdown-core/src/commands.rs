use std::io;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::agenda::{Agenda, UpsertOutcome};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{format_project_datetime, parse_date_expr};
use crate::display::project;
use crate::lifecycle::{DonePolicy, ResetUnit};
use crate::query::{Query, Segment};
use crate::render::Renderer;
use crate::ticker::Ticker;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "info", "done", "delete", "reset", "search", "watch", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(agenda, cfg, renderer, inv))]
pub fn dispatch(
    agenda: &mut Agenda,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(
        command,
        filter = ?inv.filter_terms,
        args = ?inv.command_args,
        "dispatching command"
    );

    match command {
        "add" => cmd_add(agenda, &inv.command_args, now),
        "list" => cmd_list(agenda, renderer, &inv.filter_terms, &inv.command_args, now),
        "info" => cmd_info(agenda, renderer, &inv.command_args, now),
        "done" => cmd_done(agenda, &inv.filter_terms, &inv.command_args, now),
        "delete" => cmd_delete(agenda, &inv.filter_terms, &inv.command_args, now),
        "reset" => cmd_reset(agenda, &inv.filter_terms, &inv.command_args, now),
        "search" => cmd_search(agenda, renderer, &inv.command_args, now),
        "watch" => cmd_watch(agenda, cfg, renderer, &inv.filter_terms, &inv.command_args),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Builds the view query from the words around a command: segment words
/// select a state, everything else is matched against event names.
fn build_query(terms: &[String]) -> Query {
    let mut segment = Segment::All;
    let mut text_parts: Vec<&str> = Vec::new();

    for term in terms {
        if let Some(parsed) = Segment::parse(term) {
            segment = parsed;
        } else {
            text_parts.push(term.as_str());
        }
    }

    let text = text_parts.join(" ");
    if text.trim().is_empty() {
        Query::from_segment(segment)
    } else {
        Query::search(&text, segment)
    }
}

fn parse_position(args: &[String], command: &str) -> anyhow::Result<usize> {
    let token = args
        .first()
        .ok_or_else(|| anyhow!("{command}: an event position is required"))?;
    let position: usize = token
        .parse()
        .with_context(|| format!("{command}: invalid position: {token}"))?;
    if position == 0 {
        return Err(anyhow!("{command}: positions start at 1"));
    }
    Ok(position - 1)
}

#[instrument(skip(agenda, args, now))]
fn cmd_add(
    agenda: &mut Agenda,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let mut name: Option<&str> = None;
    let mut description_parts: Vec<&str> = Vec::new();
    let mut due = None;

    for arg in args {
        if let Some(expr) = arg.strip_prefix("due:") {
            due = Some(parse_date_expr(expr, now)?);
            continue;
        }
        if name.is_none() {
            name = Some(arg.as_str());
        } else {
            description_parts.push(arg.as_str());
        }
    }

    let name = name.ok_or_else(|| anyhow!("add: an event name is required"))?;
    let due = due.ok_or_else(|| anyhow!("add: a due: date is required"))?;
    let description = description_parts.join(" ");

    if due <= now {
        warn!(due = %due, "selected due date is not in the future");
        println!("Warning: the due date is not in the future.");
    }

    let outcome = agenda.upsert(name, &description, due, DonePolicy::Preserve, now)?;
    match outcome {
        UpsertOutcome::Created(_) => println!("Created event '{name}'."),
        UpsertOutcome::Updated(_) => println!("Updated event '{name}'."),
    }
    Ok(())
}

#[instrument(skip(agenda, renderer, filter_terms, args, now))]
fn cmd_list(
    agenda: &mut Agenda,
    renderer: &mut Renderer,
    filter_terms: &[String],
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let mut terms = filter_terms.to_vec();
    terms.extend_from_slice(args);

    agenda.reload(build_query(&terms), now);
    let rows = project(agenda.events(), now);
    renderer.print_event_table(&rows)?;
    Ok(())
}

#[instrument(skip(agenda, renderer, args, now))]
fn cmd_info(
    agenda: &mut Agenda,
    renderer: &mut Renderer,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command info");

    agenda.reload(Query::default(), now);
    let position = parse_position(args, "info")?;
    let event = agenda
        .get(position)
        .ok_or_else(|| anyhow!("info: no event at position {}", position + 1))?;

    renderer.print_event_info(event, now)?;
    Ok(())
}

#[instrument(skip(agenda, filter_terms, args, now))]
fn cmd_done(
    agenda: &mut Agenda,
    filter_terms: &[String],
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command done");

    agenda.reload(build_query(filter_terms), now);
    let position = parse_position(args, "done")?;
    let event = agenda.mark_done(position, now)?;

    println!("Marked '{}' done.", event.name);
    Ok(())
}

#[instrument(skip(agenda, filter_terms, args, now))]
fn cmd_delete(
    agenda: &mut Agenda,
    filter_terms: &[String],
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command delete");

    agenda.reload(build_query(filter_terms), now);
    let position = parse_position(args, "delete")?;
    let event = agenda.delete(position, now)?;

    println!("Removed event '{}'.", event.name);
    Ok(())
}

#[instrument(skip(agenda, filter_terms, args, now))]
fn cmd_reset(
    agenda: &mut Agenda,
    filter_terms: &[String],
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command reset");

    agenda.reload(build_query(filter_terms), now);
    let position = parse_position(args, "reset")?;
    let unit = args
        .get(1)
        .ok_or_else(|| anyhow!("reset: a unit is required (day, month or year)"))
        .and_then(|word| {
            ResetUnit::parse(word).ok_or_else(|| anyhow!("reset: unknown unit: {word}"))
        })?;

    let event = agenda.reschedule(position, unit, now)?;
    println!(
        "Re-set '{}' to {}.",
        event.name,
        format_project_datetime(event.due)
    );
    Ok(())
}

#[instrument(skip(agenda, renderer, args, now))]
fn cmd_search(
    agenda: &mut Agenda,
    renderer: &mut Renderer,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command search");

    let mut segment = Segment::All;
    let mut text_parts: Vec<&str> = Vec::new();
    for arg in args {
        if let Some(parsed) = Segment::parse(arg) {
            segment = parsed;
        } else {
            text_parts.push(arg.as_str());
        }
    }

    // an empty search clears the name filter and snaps back to All
    agenda.reload(Query::search(&text_parts.join(" "), segment), now);
    let rows = project(agenda.events(), now);
    renderer.print_event_table(&rows)?;
    Ok(())
}

#[instrument(skip(agenda, cfg, renderer, filter_terms, args))]
fn cmd_watch(
    agenda: &mut Agenda,
    cfg: &Config,
    renderer: &mut Renderer,
    filter_terms: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    info!("command watch");

    let seconds = cfg
        .get("refresh.seconds")
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1)
        .max(1);

    let mut terms = filter_terms.to_vec();
    terms.extend_from_slice(args);
    let query = build_query(&terms);

    let mut ticker = Ticker::start(Duration::from_secs(seconds));

    // Enter stops the view; the reader thread only raises the signal
    let stop = ticker.stop_signal();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
        stop.raise();
    });

    println!("Watching events (refresh every {seconds}s); press Enter to stop.");

    while let Some(_tick) = ticker.wait() {
        if !ticker.is_running() {
            break;
        }
        let now = Utc::now();
        agenda.reload(query.clone(), now);
        let rows = project(agenda.events(), now);
        renderer.clear_screen();
        renderer.print_event_table(&rows)?;
    }

    ticker.stop();
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: countdown [filter] <command> [args]");
    println!();
    println!("filters: all | passed | done, plus free text matched against names");
    println!();
    println!("commands:");
    println!("  add <name> [description...] due:<date>   create or update an event");
    println!("  list                                     show events with time left");
    println!("  info <position>                          show one event in full");
    println!("  done <position>                          mark an event done");
    println!("  delete <position>                        remove an event");
    println!("  reset <position> <day|month|year>        push the due date forward");
    println!("  search <text> [all|passed|done]          find events by name");
    println!("  watch                                    live view, refreshed every second");
    println!("  version                                  print the version");
    println!();
    println!("dates: now, today, tomorrow, 3:23pm, +2d/+3h/+45m, 2026-12-24, 2026-12-24T18:30");
    Ok(())
}
