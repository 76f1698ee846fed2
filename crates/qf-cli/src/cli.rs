//! Command line definition

use crate::output::View;
use clap::{value_parser, Arg, ArgAction, Command};
use qf_model::ExecutionId;
use std::path::PathBuf;

fn input_args() -> [Arg; 2] {
    [
        Arg::new("input")
            .long("input")
            .short('i')
            .value_name("KEY=VALUE")
            .action(ArgAction::Append)
            .help("Agent input; VALUE is parsed as JSON when valid, @path reads a file, otherwise taken as a string"),
        Arg::new("inputs-file")
            .long("inputs-file")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .help("JSON object of agent inputs, applied before --input"),
    ]
}

fn execution_id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_name("EXECUTION_ID")
        .value_parser(|s: &str| s.parse::<ExecutionId>())
        .help("Execution identifier")
}

/// Full `qf` command tree
#[must_use]
pub fn command() -> Command {
    Command::new("qf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("QualityForce testing agent orchestrator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("results-dir")
                .long("results-dir")
                .global(true)
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Result store directory (overrides config)"),
        )
        .arg(
            Arg::new("max-agents")
                .long("max-agents")
                .global(true)
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Concurrency slots (overrides config)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("Per-execution timeout in seconds (overrides config)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at info level unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("agents")
                .about("List available agents")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run one agent and wait for it to finish")
                .arg(
                    Arg::new("agent")
                        .long("agent")
                        .short('a')
                        .required(true)
                        .value_name("AGENT_TYPE")
                        .help("Agent type to run"),
                )
                .args(input_args()),
        )
        .subcommand(
            Command::new("batch")
                .about("Run several agents with the same inputs")
                .arg(
                    Arg::new("agent")
                        .long("agent")
                        .short('a')
                        .required(true)
                        .value_name("AGENT_TYPE")
                        .action(ArgAction::Append)
                        .help("Agent type; repeat for each batch member"),
                )
                .args(input_args())
                .arg(
                    Arg::new("sequential")
                        .long("sequential")
                        .action(ArgAction::SetTrue)
                        .help("Run members one after another"),
                )
                .arg(
                    Arg::new("stop-on-failure")
                        .long("stop-on-failure")
                        .action(ArgAction::SetTrue)
                        .help("With --sequential, stop after the first failed member"),
                ),
        )
        .subcommand(
            Command::new("result")
                .about("Show a stored execution")
                .arg(execution_id_arg())
                .arg(
                    Arg::new("view")
                        .long("view")
                        .value_parser(value_parser!(View))
                        .default_value("full")
                        .help("Part of the record to show"),
                ),
        )
        .subcommand(Command::new("list").about("List stored executions"))
        .subcommand(
            Command::new("delete")
                .about("Delete a stored execution")
                .arg(execution_id_arg()),
        )
        .subcommand(Command::new("stats").about("Show result store usage"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn global_overrides_after_subcommand() {
        let matches = command()
            .try_get_matches_from(["qf", "run", "-a", "unit_testing", "--max-agents", "3", "-i", "x=1"])
            .unwrap();
        assert_eq!(matches.get_one::<usize>("max-agents"), Some(&3));
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(sub.get_many::<String>("input").unwrap().count(), 1);
    }

    #[test]
    fn result_rejects_malformed_id() {
        let err = command()
            .try_get_matches_from(["qf", "result", "not-an-id"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
