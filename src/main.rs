use clap::Parser;
use std::process;

use taskboard::cli::commands::{Cli, Commands};
use taskboard::cli::{self, Context};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli_args = Cli::parse();
    let json_output = cli_args.json;

    let ctx = match Context::load(cli_args.home.as_deref(), json_output) {
        Ok(ctx) => ctx,
        Err(e) => {
            cli::report_error(&e, json_output);
            process::exit(1);
        }
    };

    let exit_code = match cli_args.command {
        Commands::Init => cli::init::run(&ctx),
        Commands::Task(cmd) => cli::task::run(cmd, &ctx),
        Commands::Search { query } => cli::search::run(&query, &ctx),
        Commands::Stats => cli::stats::run(&ctx),
        Commands::Sync {
            dry_run,
            sources,
            every,
        } => cli::sync::run(dry_run, &sources, every, &ctx),
        Commands::Maint(cmd) => cli::maint::run(cmd, &ctx),
        Commands::Notify { title, status } => cli::notify::run_notify(&title, &status, &ctx),
        Commands::Watch { interval } => cli::notify::run_watch(interval, &ctx),
    };

    process::exit(exit_code);
}
