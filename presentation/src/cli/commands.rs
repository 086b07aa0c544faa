//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use dialogos_domain::{
    FivePersonChoice, GroupMode, GroupRotation, GroupSize, ObserverStrategy, SessionVariant,
};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Formatted, colored console output
    Full,
    /// JSON output
    Json,
}

/// CLI arguments for dialogos
#[derive(Parser, Debug)]
#[command(name = "dialogos")]
#[command(author, version, about = "Structured-dialogue practice sessions: groups, roles and rounds")]
#[command(long_about = r#"
Dialogos plans and runs structured-dialogue practice sessions.

Participants hold one role each (speaker, listener, scribe, observer) and
rotate through them round by round. Larger rosters are split into groups
of two to four that progress independently.

Configuration files are loaded from (in priority order):
1. --config <path>       Explicit config file
2. ./dialogos.toml       Project-level config
3. ~/.config/dialogos/config.toml   Global config

Example:
  dialogos plan 11 --group-size 3
  dialogos validate 3 --group-size 4
  dialogos simulate 4 --cycles 2
  dialogos simulate 9 --mode multi --event-log events.jsonl
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write diagnostic logs to this file in addition to stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Partition a roster into groups and show the initial roles
    Plan(PlanArgs),

    /// Check whether a roster size fits a group configuration
    Validate(GroupArgs),

    /// Run a complete session against a session store and print each step
    Simulate(SimulateArgs),

    /// Delete completed sessions older than the retention period
    Purge(StoreArgs),

    /// List the sessions in a session store
    Sessions(StoreArgs),
}

/// Group configuration overrides shared by several commands.
///
/// Unset fields fall back to the `[groups]` section of the configuration.
#[derive(Args, Debug, Clone)]
pub struct GroupArgs {
    /// Number of participants, host included
    pub participants: usize,

    /// Preferred group size: 3, 4 or mixed
    #[arg(long, value_name = "SIZE")]
    pub group_size: Option<GroupSize>,

    /// How observers are placed across groups: distribute or central
    #[arg(long, value_name = "STRATEGY")]
    pub observer_strategy: Option<ObserverStrategy>,

    /// How groups are reshuffled: random, balanced or manual
    #[arg(long, value_name = "ROTATION")]
    pub group_rotation: Option<GroupRotation>,

    /// Upper bound on the number of groups
    #[arg(long, value_name = "N")]
    pub max_groups: Option<u32>,

    /// Keep participants' own roles instead of seating them
    #[arg(long)]
    pub manual_roles: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub groups: GroupArgs,

    /// Five participants: split into 2+3, or stay together
    #[arg(long, value_name = "CHOICE")]
    pub five: Option<FivePersonChoice>,

    /// Shuffle membership after assignment
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for the shuffle
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub groups: GroupArgs,

    /// single: one dialogue for everyone; multi: independent groups
    #[arg(long, default_value = "single")]
    pub mode: GroupMode,

    /// Phase vocabulary: online or in-person
    #[arg(long, default_value = "online")]
    pub variant: SessionVariant,

    /// Five participants: split into 2+3, or stay together
    #[arg(long, value_name = "CHOICE")]
    pub five: Option<FivePersonChoice>,

    /// Number of full round cycles before ending
    #[arg(long, default_value_t = 1)]
    pub cycles: u32,

    /// Open free dialogue before ending
    #[arg(long)]
    pub free_dialogue: bool,

    /// Persist sessions in this directory instead of memory
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Append session events to this JSONL file
    #[arg(long, value_name = "PATH")]
    pub event_log: Option<PathBuf>,

    /// Seed for shuffles
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Directory of the JSON session store
    #[arg(long, value_name = "DIR")]
    pub store_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "dialogos", "plan", "8", "--group-size", "3", "--five", "together", "-o", "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Some(Command::Plan(args)) => {
                assert_eq!(args.groups.participants, 8);
                assert_eq!(args.groups.group_size, Some(GroupSize::Three));
                assert_eq!(args.five, Some(FivePersonChoice::Together));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["dialogos", "-vv", "simulate", "4"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Simulate(args)) => {
                assert_eq!(args.mode, GroupMode::Single);
                assert_eq!(args.variant, SessionVariant::Online);
                assert_eq!(args.cycles, 1);
                assert!(args.store_dir.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_group_size() {
        assert!(Cli::try_parse_from(["dialogos", "validate", "6", "--group-size", "5"]).is_err());
    }
}
