mod cli;
mod commands;
mod output;
mod ui;

use anyhow::Result;
use clap_complete::generate;
use cli::{Cli, Command};
use mgmtkit::{Config, Resolver, Verb};
use std::io;
use std::process::ExitCode;

/// Global context for one invocation
pub struct Context {
    pub config: Config,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = match cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are reported through clap as well
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Command::Completions { shell } = &cli.command {
        let mut cmd = cli::command();
        generate(*shell, &mut cmd, "rmqadmin", &mut io::stdout());
        return Ok(());
    }

    let resolution = Resolver::new().resolve(cli.partial_config())?;
    for warning in &resolution.warnings {
        ui::warn(warning);
    }
    let ctx = Context {
        quiet: resolution.config.quiet,
        config: resolution.config,
    };

    match &cli.command {
        Command::List(args) => commands::listing::run(&ctx, Verb::List, args),
        Command::Show(args) => commands::listing::run(&ctx, Verb::Show, args),
        Command::Declare(args) => commands::resource::run(&ctx, Verb::Declare, args),
        Command::Delete(args) => commands::resource::run(&ctx, Verb::Delete, args),
        Command::Close(args) => commands::resource::run(&ctx, Verb::Close, args),
        Command::Purge(args) => commands::resource::run(&ctx, Verb::Purge, args),
        Command::Publish(args) => commands::message::publish(&ctx, args),
        Command::Get(args) => commands::message::get(&ctx, args),
        Command::Completions { .. } => Ok(()),
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<mgmtkit::Error>() {
        Some(e) => {
            let category = e.category();
            ui::error(&format!("{category}: {e}"));
            ui::hint(category.advice());
        }
        None => ui::error(&format!("{err:#}")),
    }
}
