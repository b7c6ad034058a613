//! graphrun CLI entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: load `graphrun.toml` (when given) and apply
//!    command-line overrides on top of it.
//! 2. **Wire observability**: install the `tracing-subscriber` stack, optionally
//!    exporting spans over OTLP. All spans and structured events emitted by the
//!    `workflow` and `tools` crates flow through it.
//! 3. **Construct the registry**: bind the reference tools into a
//!    [`workflow::ToolRegistry`] and inject it into a [`workflow::GraphEngine`].
//! 4. **Dispatch** the selected command and translate its failure into a
//!    stable exit code (see [`exit_codes`]).

mod commands;
mod config;
mod exit_codes;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use workflow::{GraphEngine, ToolRegistry};

use crate::commands::StateSource;
use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "graphrun", version, about = "Run tool-driven graph workflows")]
struct Cli {
    /// Path to a `graphrun.toml` configuration file.
    #[arg(long, global = true, env = "GRAPHRUN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a graph and print its run record as JSON.
    Run {
        /// Graph definition file (JSON).
        #[arg(long)]
        graph: PathBuf,
        /// Initial state file (JSON object).
        #[arg(long, conflicts_with = "state_json")]
        state: Option<PathBuf>,
        /// Initial state as an inline JSON object.
        #[arg(long)]
        state_json: Option<String>,
        /// Print each step as a JSON line as soon as it completes.
        #[arg(long)]
        stream: bool,
        /// Override `[engine].max_steps`.
        #[arg(long)]
        max_steps: Option<u32>,
    },
    /// Check graph structure and that every node's tool is registered.
    Validate {
        /// Graph definition file (JSON).
        #[arg(long)]
        graph: PathBuf,
    },
    /// List the registered tool names.
    Tools,
    /// Print the code-review example graph definition.
    Example {
        /// Quality score at which the review loop stops.
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = exit_codes::for_usage_error(&err);
            if let Err(print_err) = err.print() {
                eprintln!("error: {print_err}");
            }
            return ExitCode::from(code as u8);
        }
    };

    let config = match CliConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return fail(&err),
    };
    let telemetry = match telemetry::init(&config.logging) {
        Ok(telemetry) => telemetry,
        Err(err) => return fail(&err),
    };

    let result = dispatch(cli.command, config);
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::from(exit_codes::OK as u8),
        Err(err) => fail(&err),
    }
}

fn fail(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {err:#}");
    ExitCode::from(exit_codes::for_error(err) as u8)
}

fn dispatch(command: Command, mut config: CliConfig) -> Result<()> {
    let mut registry = ToolRegistry::new();
    tools::register_code_review_tools(&mut registry)?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Command::Run {
            graph,
            state,
            state_json,
            stream,
            max_steps,
        } => {
            if let Some(max_steps) = max_steps {
                config.engine.max_steps = max_steps;
            }
            let graph = commands::load_graph(&graph)?;
            let source = match (&state, &state_json) {
                (Some(path), _) => StateSource::File(path),
                (None, Some(raw)) => StateSource::Inline(raw),
                (None, None) => StateSource::Empty,
            };
            let engine = GraphEngine::with_config(Arc::new(registry), config.engine);
            let record = commands::run(&engine, &graph, source, stream, &mut stdout)?;
            tracing::info!(
                run_id = %record.run_id(),
                graph_id = %record.graph_id(),
                halt = ?record.halt(),
                steps = record.log().len(),
                "Run finished"
            );
            Ok(())
        }
        Command::Validate { graph } => {
            let graph = commands::load_graph(&graph)?;
            commands::validate(&graph, &registry, &mut stdout)
        }
        Command::Tools => commands::list_tools(&registry, &mut stdout),
        Command::Example { threshold } => commands::example(threshold, &mut stdout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "graphrun",
            "run",
            "--graph",
            "g.json",
            "--state-json",
            "{}",
            "--stream",
            "--max-steps",
            "7",
        ])
        .unwrap();

        match cli.command {
            Command::Run { graph, state, state_json, stream, max_steps } => {
                assert_eq!(graph, PathBuf::from("g.json"));
                assert!(state.is_none());
                assert_eq!(state_json.as_deref(), Some("{}"));
                assert!(stream);
                assert_eq!(max_steps, Some(7));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn usage_errors_exit_as_invalid() {
        let err = Cli::try_parse_from(["graphrun", "run"]).err().unwrap();
        assert_eq!(exit_codes::for_usage_error(&err), exit_codes::INVALID);

        let err = Cli::try_parse_from(["graphrun", "--no-such-flag", "tools"]).err().unwrap();
        assert_eq!(exit_codes::for_usage_error(&err), exit_codes::INVALID);
    }

    #[test]
    fn help_and_version_exit_ok() {
        let err = Cli::try_parse_from(["graphrun", "--help"]).err().unwrap();
        assert_eq!(exit_codes::for_usage_error(&err), exit_codes::OK);

        let err = Cli::try_parse_from(["graphrun", "--version"]).err().unwrap();
        assert_eq!(exit_codes::for_usage_error(&err), exit_codes::OK);
    }

    #[test]
    fn state_sources_are_exclusive() {
        let result = Cli::try_parse_from([
            "graphrun",
            "run",
            "--graph",
            "g.json",
            "--state",
            "s.json",
            "--state-json",
            "{}",
        ]);
        assert!(result.is_err());
    }
}
