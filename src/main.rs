use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod editor;
mod formats;
mod model;
mod pipeline;
mod store;
mod timeline;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let mut cfg = config::Config::load(args.config.as_deref())?;
    if let Some(path) = args.store {
        cfg.store.path = path;
    }
    config::init_tracing(&cfg.logging, args.log_level.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "subtl starting");

    match args.command {
        cli::Command::Convert(cmd) => pipeline::run_convert(cmd, &cfg),
        cli::Command::Active(cmd) => pipeline::run_active(cmd, &cfg),
        cli::Command::Time(cmd) => pipeline::run_time(cmd),
        cli::Command::Project(cmd) => pipeline::run_project(cmd, &cfg),
        cli::Command::Subs(cmd) => pipeline::run_subs(cmd, &cfg),
        cli::Command::PrintDefaultConfig => {
            let s = cfg.to_toml_pretty()?;
            print!("{s}");
            Ok(())
        }
    }
}
