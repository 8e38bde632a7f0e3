//! pfish runner - runs operation type tests through pfish
//!
//! With no subcommand, discovers every `*/operation_types/*/definition.json`
//! under the current directory and runs the test definitions in order.

use clap::Parser;
use pfish_runner::cli;
use pfish_runner::commands::{Commands, GlobalArgs};
use pfish_runner::common::logging;

#[derive(Parser)]
#[command(name = "pfish-runner", about = "Run operation type tests through pfish")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.args.verbose);

    let command = cli.command.unwrap_or(Commands::Run);
    if let Err(e) = cli::dispatch(command, &cli.args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
