use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use parlor_cli::commands::{employees, machines, sessions, stats};
use parlor_cli::{Cli, Commands, Config, EmployeeAction, MachineAction, SessionAction};

/// Load config and open the facade, ensuring the parent directory exists.
fn open_facade(config_path: Option<&Path>) -> Result<parlor_db::Facade> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let core = config.core_config()?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let ledger = parlor_db::Ledger::open(&config.database_path, core)
        .context("failed to open database")?;
    Ok(parlor_db::Facade::new(ledger))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Employee { action }) => {
            let mut facade = open_facade(cli.config.as_deref())?;
            match action {
                EmployeeAction::Add { name } => employees::add(&mut facade, name)?,
                EmployeeAction::Rename { id, name } => employees::rename(&mut facade, id, name)?,
                EmployeeAction::List { json } => employees::list(&facade, *json)?,
            }
        }
        Some(Commands::Machine { action }) => {
            let mut facade = open_facade(cli.config.as_deref())?;
            match action {
                MachineAction::Add { name } => machines::add(&mut facade, name)?,
                MachineAction::Retire { id } => machines::retire(&mut facade, id)?,
                MachineAction::Restore { id } => machines::restore(&mut facade, id)?,
                MachineAction::List { json } => machines::list(&facade, *json)?,
            }
        }
        Some(Commands::Session { action }) => {
            let mut facade = open_facade(cli.config.as_deref())?;
            match action {
                SessionAction::Open {
                    employee,
                    machine,
                    at,
                } => sessions::open(&mut facade, employee, machine, *at)?,
                SessionAction::Close { id, at } => sessions::close(&mut facade, id, *at)?,
                SessionAction::Amend { id, start, end } => {
                    sessions::amend(&mut facade, id, *start, *end)?;
                }
                SessionAction::Show { id } => sessions::show(&facade, id)?,
                SessionAction::List {
                    from,
                    to,
                    employee,
                    machine,
                    status,
                    json,
                } => sessions::list(
                    &facade,
                    *from,
                    *to,
                    employee.as_deref(),
                    machine.as_deref(),
                    (*status).map(Into::into),
                    *json,
                )?,
                SessionAction::Delete { id } => sessions::delete(&mut facade, id)?,
            }
        }
        Some(Commands::Stats { from, to, by, json }) => {
            let facade = open_facade(cli.config.as_deref())?;
            stats::run(&facade, *from, *to, (*by).into(), *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
