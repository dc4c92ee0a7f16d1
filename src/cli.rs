// File: ./src/cli.rs
//! Command-line surface: argument parsing, help text and result tables.
use crate::model::EventRecord;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use std::path::PathBuf;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Parse {
        transcript: PathBuf,
        since: Option<NaiveDate>,
        remote: bool,
        save: bool,
    },
    Export {
        events: PathBuf,
        calendar: PathBuf,
        force: bool,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub root: Option<PathBuf>,
    pub verbose: bool,
    pub command: Command,
}

/// Parses everything after the binary name.
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut root = None;
    let mut verbose = false;
    let mut since = None;
    let mut remote = false;
    let mut save = true;
    let mut force = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => {
                return Ok(CliArgs {
                    root,
                    verbose,
                    command: Command::Help,
                });
            }
            "-r" | "--root" => {
                let path = iter.next().ok_or_else(|| anyhow!("--root needs a path"))?;
                root = Some(PathBuf::from(path));
            }
            "-v" | "--verbose" => verbose = true,
            "--since" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--since needs a date"))?;
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| anyhow!("Invalid --since date '{}', expected YYYY-MM-DD", raw))?;
                since = Some(date);
            }
            "--remote" => remote = true,
            "--no-save" => save = false,
            "--force" => force = true,
            flag if flag.starts_with('-') => bail!("Unknown option '{}'", flag),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        [] => Command::Help,
        ["parse", transcript] => Command::Parse {
            transcript: PathBuf::from(*transcript),
            since,
            remote,
            save,
        },
        ["export", events, calendar] => Command::Export {
            events: PathBuf::from(*events),
            calendar: PathBuf::from(*calendar),
            force,
        },
        ["parse", ..] => bail!("Usage: quizscout parse <chat.txt>"),
        ["export", ..] => bail!("Usage: quizscout export <events.json> <calendar.ics>"),
        [other, ..] => bail!("Unknown command '{}'", other),
    };

    Ok(CliArgs {
        root,
        verbose,
        command,
    })
}

pub fn print_help(binary_name: &str) {
    println!(
        "QuizScout v{} - Find quiz announcements in exported chat transcripts",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!(
        "    {} [OPTIONS] parse <chat.txt> [--since <YYYY-MM-DD>] [--remote] [--no-save]",
        binary_name
    );
    println!(
        "    {} [OPTIONS] export <events.json> <calendar.ics> [--force]",
        binary_name
    );
    println!("    {} --help", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -v, --verbose         Log which rule found each field.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("PARSE COMMAND:");
    println!("    --since <date>        Ignore messages posted before this date.");
    println!("    --remote              Also ask the remote model (needs an API key).");
    println!("    --no-save             Print the events without writing JSON files.");
    println!();
    println!("EXPORT COMMAND:");
    println!("    --force               Add events even if they are already in the calendar.");
    println!();
    println!("CONFIGURATION:");
    println!("    config.toml in the config directory (see --root). The API key can also");
    println!("    be given through the GEMINI_API_KEY environment variable.");
}

fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(w)))
}

/// Renders records as an aligned text table. Wide characters count double.
pub fn events_table(events: &[EventRecord]) -> String {
    const HEADERS: [&str; 5] = ["TITLE", "DATE", "TIME", "VENUE", "LINK"];

    let rows: Vec<[String; 5]> = events
        .iter()
        .map(|e| {
            [
                e.title.clone(),
                e.date_string(),
                e.time_string(),
                e.venue.clone(),
                e.registration_link.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(UnicodeWidthStr::width);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let line = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| pad(c, w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(HEADERS)];
    out.extend(
        rows.iter()
            .map(|r| line([&r[0], &r[1], &r[2], &r[3], &r[4]])),
    );
    out.join("\n")
}

pub fn print_events(heading: &str, events: &[EventRecord]) {
    println!("{} ({}):", heading, events.len());
    if events.is_empty() {
        println!("  none");
    } else {
        println!("{}", events_table(events));
    }
    println!();
}
