use anyhow::{Context, Result};
use quizscout::calendar::{self, ExportOptions, IcsCalendar};
use quizscout::cli::{self, CliArgs, Command};
use quizscout::client::GeminiClient;
use quizscout::config::Config;
use quizscout::context::{AppContext, StandardContext};
use quizscout::model::{Normalizer, RuleAnalyzer};
use quizscout::pipeline::{Pipeline, PipelineOptions};
use quizscout::storage::LocalStorage;
use simplelog::{
    ColorChoice, CombinedLogger, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::env;
use std::fs;
use std::sync::Arc;

fn init_logging(verbose: bool, config: &Config) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = &config.log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        loggers.push(WriteLogger::new(
            LevelFilter::Debug,
            simplelog::Config::default(),
            file,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let CliArgs {
        root,
        verbose,
        command,
    } = cli::parse_args(&args)?;

    if command == Command::Help {
        cli::print_help("quizscout");
        return Ok(());
    }

    let ctx = StandardContext::new(root);
    let config = Config::load_or_default(&ctx)?;
    init_logging(verbose, &config)?;

    match command {
        Command::Parse {
            transcript,
            since,
            remote,
            save,
        } => run_parse(&ctx, &config, &transcript, since, remote, save).await,
        Command::Export {
            events,
            calendar,
            force,
        } => run_export(&config, &events, &calendar, force),
        Command::Help => Ok(()),
    }
}

async fn run_parse(
    ctx: &dyn AppContext,
    config: &Config,
    transcript: &std::path::Path,
    since: Option<chrono::NaiveDate>,
    remote: bool,
    save: bool,
) -> Result<()> {
    let text = fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read transcript {:?}", transcript))?;
    let now = chrono::Local::now().naive_local();

    let mut options = PipelineOptions::from_config(config);
    options.since = since;
    let mut pipeline = Pipeline::new(Arc::new(RuleAnalyzer)).with_options(options);

    let use_remote = remote || config.remote.enabled;
    if use_remote {
        let key = config.remote.resolved_api_key().with_context(|| {
            format!(
                "Remote extraction needs an API key: set [remote] api_key or {}",
                quizscout::config::API_KEY_ENV
            )
        })?;
        pipeline = pipeline.with_remote(Arc::new(GeminiClient::new(&config.remote, key)?));
    }

    let report = pipeline.run(&text, now).await;

    cli::print_events("Local events", &report.local_events);
    if use_remote {
        cli::print_events("Remote events", &report.remote_events);
        if report.remote_failures > 0 {
            log::warn!(
                "Remote extraction failed for {} message(s)",
                report.remote_failures
            );
        }
    }

    if save {
        let path = LocalStorage::save_local_events(ctx, &report.local_events)?;
        log::info!("Saved local events to {:?}", path);
        if use_remote {
            let path = LocalStorage::save_remote_events(ctx, &report.remote_events)?;
            log::info!("Saved remote events to {:?}", path);
        }
    }
    Ok(())
}

fn run_export(
    config: &Config,
    events: &std::path::Path,
    calendar_path: &std::path::Path,
    force: bool,
) -> Result<()> {
    let raw = LocalStorage::load_raw(events)?;
    let normalizer = Normalizer::new(chrono::Local::now().naive_local())
        .with_default_time(config.fallback_time());
    let (records, skipped) = calendar::records_for_export(&raw, &normalizer);

    let mut sink = IcsCalendar::open(calendar_path)?;
    let summary = calendar::export(
        &mut sink,
        &records,
        &ExportOptions::from_config(&config.calendar, force),
    )?;
    println!(
        "Added {} event(s) to {:?} ({} duplicate, {} skipped)",
        summary.added,
        calendar_path,
        summary.duplicates,
        skipped
    );
    Ok(())
}
