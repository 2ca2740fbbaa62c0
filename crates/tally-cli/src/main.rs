//! Tally CLI
//!
//! Command-line interface for tally - daily expense tracking.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tally_core::{Client, Config, Ledger};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Tally - Daily expense tracking")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        /// Full name
        #[arg(long)]
        name: String,
        /// Password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        /// Password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show or update your profile
    Profile {
        /// New full name
        #[arg(long)]
        name: Option<String>,
        /// New email
        #[arg(long)]
        email: Option<String>,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage expenses
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },
    /// Manage and use quick expenses
    Quick {
        #[command(subcommand)]
        command: QuickCommands,
    },
    /// Show totals and category breakdown
    Summary,
    /// Generate a text expense report
    Report {
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories
    #[command(alias = "ls")]
    List,
    /// Add a category
    Add {
        name: String,
        #[arg(long, default_value = tally_core::ledger::DEFAULT_ICON)]
        icon: String,
        #[arg(long, default_value = tally_core::ledger::DEFAULT_COLOR)]
        color: String,
    },
    /// Delete a category that has no expenses
    #[command(alias = "rm")]
    Delete {
        /// Category ID (or prefix) or name
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ExpenseCommands {
    /// List expenses, newest first
    #[command(alias = "ls")]
    List,
    /// Record an expense
    Add {
        amount: Decimal,
        #[arg(short, long)]
        note: Option<String>,
        /// Category ID (or prefix) or name; defaults to the first category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Delete an expense
    #[command(alias = "rm")]
    Delete {
        /// Expense ID (or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum QuickCommands {
    /// List quick expenses
    #[command(alias = "ls")]
    List,
    /// Add a quick expense template
    Add {
        name: String,
        amount: Decimal,
        /// Category ID (or prefix) or name
        #[arg(short, long)]
        category: String,
    },
    /// Record an expense from a quick expense
    Use {
        /// Quick expense ID (or prefix) or name
        id: String,
    },
    /// Delete a quick expense template
    #[command(alias = "rm")]
    Delete {
        /// Quick expense ID (or prefix) or name
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, namespace, currency_symbol, utc_offset, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);
    let output = output.with_locale(config.currency_symbol.clone(), config.offset()?);

    let client = Client::with_file_store(&config.data_dir, config.storage_keys());
    let report = client.initialize().await;
    for failure in &report.failures {
        warn!("Starting without {}: {}", failure.collection, failure.error);
        if !output.is_quiet() {
            eprintln!("⚠ Could not load {}. Continuing without it.", failure.collection);
            if let Some(hint) = failure.error.recovery_suggestion() {
                eprintln!("  {}", hint);
            }
        }
    }
    let ledger = Ledger::new(client);

    let result = match cli.command {
        Commands::Signup {
            email,
            name,
            password,
        } => commands::auth::sign_up(&ledger, email, name, password, &output).await,
        Commands::Login { email, password } => {
            commands::auth::login(&ledger, email, password, &output).await
        }
        Commands::Logout => commands::auth::logout(&ledger, &output).await,
        Commands::Whoami => commands::auth::whoami(&ledger, &output).await,
        Commands::Profile { name, email } => {
            commands::auth::profile(&ledger, name, email, &output).await
        }
        Commands::Category { command } => handle_category_command(command, &ledger, &output).await,
        Commands::Expense { command } => handle_expense_command(command, &ledger, &output).await,
        Commands::Quick { command } => handle_quick_command(command, &ledger, &output).await,
        Commands::Summary => commands::report::summary(&ledger, &config, &output).await,
        Commands::Report { output: path } => {
            commands::report::report(&ledger, &config, path, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<tally_core::Error>() {
            Some(error) => {
                output.error(error);
                std::process::exit(1);
            }
            None => Err(e),
        },
    }
}

async fn handle_category_command(
    command: CategoryCommands,
    ledger: &Ledger,
    output: &Output,
) -> Result<()> {
    match command {
        CategoryCommands::List => commands::category::list(ledger, output).await,
        CategoryCommands::Add { name, icon, color } => {
            commands::category::add(ledger, name, icon, color, output).await
        }
        CategoryCommands::Delete { id, yes } => {
            commands::category::delete(ledger, id, yes, output).await
        }
    }
}

async fn handle_expense_command(
    command: ExpenseCommands,
    ledger: &Ledger,
    output: &Output,
) -> Result<()> {
    match command {
        ExpenseCommands::List => commands::expense::list(ledger, output).await,
        ExpenseCommands::Add {
            amount,
            note,
            category,
        } => commands::expense::add(ledger, amount, note, category, output).await,
        ExpenseCommands::Delete { id, yes } => {
            commands::expense::delete(ledger, id, yes, output).await
        }
    }
}

async fn handle_quick_command(
    command: QuickCommands,
    ledger: &Ledger,
    output: &Output,
) -> Result<()> {
    match command {
        QuickCommands::List => commands::quick::list(ledger, output).await,
        QuickCommands::Add {
            name,
            amount,
            category,
        } => commands::quick::add(ledger, name, amount, category, output).await,
        QuickCommands::Use { id } => commands::quick::use_template(ledger, id, output).await,
        QuickCommands::Delete { id } => commands::quick::delete(ledger, id, output).await,
    }
}

/// Install the tracing subscriber
///
/// Logs go to `log_file` when configured, otherwise stderr. `RUST_LOG`
/// replaces the configured level entirely.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tally_core={},tally_cli={}",
            config.log_level, config.log_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match &config.log_file {
        Some(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = builder.with_ansi(false).with_writer(file).try_init();
            info!("Logging to {:?}", path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
