//! CLI entrypoint for dialogos
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod simulate;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use dialogos_application::{
    NoSessionEventLogger, PurgeSessionsUseCase, SessionEventLogger, SessionStore,
};
use dialogos_domain::{
    GroupConfiguration, GroupRotation, Participant, assign, balance_roles, seat_group, shuffle_groups,
    validate_configuration,
};
use dialogos_infrastructure::{
    ConfigLoader, FileConfig, FileSessionStore, InMemorySessionStore, JsonlSessionLogger,
};
use dialogos_presentation::{
    Cli, Command, ConsoleFormatter, GroupArgs, OutputFormat, PlanArgs, SimulateArgs, StoreArgs,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use simulate::{SimulationSettings, Simulator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    if cli.show_config {
        for line in ConfigLoader::describe_sources() {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("failed to load configuration: {}", e))?
    };
    config.validate().context("invalid configuration")?;
    info!("Starting dialogos");

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Plan(args) => plan(&args, &config, cli.output),
        Command::Validate(args) => validate(&args, &config, cli.output),
        Command::Simulate(args) => simulate(&args, &config, cli.output).await,
        Command::Purge(args) => purge(&args, &config).await,
        Command::Sessions(args) => sessions(&args, cli.output).await,
    }
}

/// Set up stderr logging by verbosity, plus an optional plain-text log file.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// `[groups]` from the configuration with command-line overrides on top
fn group_configuration(args: &GroupArgs, config: &FileConfig) -> GroupConfiguration {
    let mut groups = config.groups.to_group_configuration();
    if let Some(size) = args.group_size {
        groups.group_size = size;
    }
    if let Some(strategy) = args.observer_strategy {
        groups.observer_strategy = strategy;
    }
    if let Some(rotation) = args.group_rotation {
        groups.group_rotation = rotation;
    }
    if args.max_groups.is_some() {
        groups.max_groups = args.max_groups;
    }
    if args.manual_roles {
        groups.auto_assign_roles = false;
    }
    groups
}

fn event_logger(explicit: Option<&PathBuf>, config: &FileConfig) -> Arc<dyn SessionEventLogger> {
    let path = explicit.or(config.logging.event_log.as_ref());
    match path.and_then(JsonlSessionLogger::new) {
        Some(logger) => {
            info!("Writing session events to {}", logger.path().display());
            Arc::new(logger)
        }
        None => {
            if let Some(path) = path {
                warn!("Session events will not be recorded; could not open {}", path.display());
            }
            Arc::new(NoSessionEventLogger)
        }
    }
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn plan(args: &PlanArgs, config: &FileConfig, output: OutputFormat) -> Result<()> {
    let groups_config = group_configuration(&args.groups, config);
    let roster: Vec<Participant> = (1..=args.groups.participants)
        .map(|i| Participant::new(format!("p{}", i), format!("Participant {}", i)))
        .collect();

    let mut groups = assign(&roster, &groups_config, args.five.unwrap_or_default())?;
    if args.shuffle {
        shuffle_groups(&mut groups, &mut rng(args.seed));
        if groups_config.auto_assign_roles {
            groups.iter_mut().for_each(seat_group);
        }
        if groups_config.group_rotation == GroupRotation::Balanced {
            balance_roles(&mut groups);
        }
    }

    let text = match output {
        OutputFormat::Full => ConsoleFormatter::format_plan(&groups, &groups_config),
        OutputFormat::Json => ConsoleFormatter::format_plan_json(&groups),
    };
    println!("{}", text);
    Ok(())
}

fn validate(args: &GroupArgs, config: &FileConfig, output: OutputFormat) -> Result<()> {
    let groups_config = group_configuration(args, config);
    let report = validate_configuration(args.participants, &groups_config);

    let text = match output {
        OutputFormat::Full => ConsoleFormatter::format_validation(args.participants, &report),
        OutputFormat::Json => ConsoleFormatter::format_validation_json(&report),
    };
    println!("{}", text);

    if !report.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

async fn open_store(dir: Option<&PathBuf>) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match dir {
        Some(dir) => Arc::new(
            FileSessionStore::open(dir)
                .await
                .with_context(|| format!("cannot open session store at {}", dir.display()))?,
        ),
        None => Arc::new(InMemorySessionStore::new()),
    };
    Ok(store)
}

async fn simulate(args: &SimulateArgs, config: &FileConfig, output: OutputFormat) -> Result<()> {
    let store = open_store(args.store_dir.as_ref()).await?;
    let logger = event_logger(args.event_log.as_ref(), config);
    let simulator = Simulator::new(store, config.to_engine_config(), logger, args.seed);

    let settings = SimulationSettings {
        participants: args.groups.participants,
        mode: args.mode,
        variant: args.variant,
        groups: group_configuration(&args.groups, config),
        five: args.five,
        cycles: args.cycles,
        free_dialogue: args.free_dialogue,
    };
    let report = simulator.run(&settings).await?;

    match output {
        OutputFormat::Full => {
            for step in &report.steps {
                print!("{}", ConsoleFormatter::format_step(&step.scope, &step.change));
            }
            for (verb, outcome) in &report.aggregates {
                print!("{}", ConsoleFormatter::format_aggregate(verb, outcome));
            }
            if !report.progress.is_empty() {
                print!("{}", ConsoleFormatter::format_progress(&report.progress));
            }
            println!("{}", ConsoleFormatter::format_session(&report.session));
            println!("Observer received {} update(s)", report.observed_updates);
        }
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_session_json(&report.session)),
    }
    Ok(())
}

async fn purge(args: &StoreArgs, config: &FileConfig) -> Result<()> {
    let store = open_store(Some(&args.store_dir)).await?;
    let purge = PurgeSessionsUseCase::new(store, config.to_engine_config())
        .with_event_logger(event_logger(None, config));

    let removed = purge.purge_completed(Utc::now()).await?;
    println!("Purged {} expired session(s)", removed);
    Ok(())
}

async fn sessions(args: &StoreArgs, output: OutputFormat) -> Result<()> {
    let store = open_store(Some(&args.store_dir)).await?;
    let mut sessions = store.list().await?;
    sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let text = match output {
        OutputFormat::Full => ConsoleFormatter::format_session_list(&sessions),
        OutputFormat::Json => ConsoleFormatter::format_session_list_json(&sessions),
    };
    print!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogos_domain::{GroupSize, ObserverStrategy};

    fn args(participants: usize) -> GroupArgs {
        GroupArgs {
            participants,
            group_size: None,
            observer_strategy: None,
            group_rotation: None,
            max_groups: None,
            manual_roles: false,
        }
    }

    #[test]
    fn test_group_configuration_defaults_to_file_config() {
        let mut config = FileConfig::default();
        config.groups.group_size = GroupSize::Three;
        config.groups.max_groups = Some(3);

        let groups = group_configuration(&args(9), &config);
        assert_eq!(groups.group_size, GroupSize::Three);
        assert_eq!(groups.max_groups, Some(3));
        assert!(groups.auto_assign_roles);
    }

    #[test]
    fn test_command_line_overrides_file_config() {
        let mut config = FileConfig::default();
        config.groups.max_groups = Some(3);
        let mut overrides = args(9);
        overrides.group_size = Some(GroupSize::Four);
        overrides.observer_strategy = Some(ObserverStrategy::Central);
        overrides.max_groups = Some(5);
        overrides.manual_roles = true;

        let groups = group_configuration(&overrides, &config);
        assert_eq!(groups.group_size, GroupSize::Four);
        assert_eq!(groups.observer_strategy, ObserverStrategy::Central);
        assert_eq!(groups.max_groups, Some(5));
        assert!(!groups.auto_assign_roles);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;
        let a: u64 = rng(Some(11)).r#gen();
        let b: u64 = rng(Some(11)).r#gen();
        assert_eq!(a, b);
    }
}
