mod budget;
mod cli;
mod db;
mod error;
mod exporter;
mod fmt;
mod importer;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod recurrence;
mod reports;
mod settings;
mod store;

use clap::Parser;

use cli::{
    BudgetCommands, CategoryCommands, Cli, Commands, EntryCommands, ExportCommands,
    ProfileCommands, ReportCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        // Bare `saldo` opens the dashboard.
        None => cli::dashboard::run(),
        Some(command) => match command {
            Commands::Init { data_dir } => cli::init::run(data_dir),
            Commands::Profile { command } => match command {
                ProfileCommands::Add { name } => cli::profile::add(&name),
                ProfileCommands::Use { name } => cli::profile::switch(&name),
                ProfileCommands::List => cli::profile::list(),
            },
            Commands::Entry { command } => match command {
                EntryCommands::Add {
                    description,
                    amount,
                    kind,
                    category,
                    date,
                    recurring,
                    frequency,
                } => cli::entries::add(
                    &description,
                    amount,
                    &kind,
                    category.as_deref(),
                    date.as_deref(),
                    recurring,
                    frequency.as_deref(),
                ),
                EntryCommands::List {
                    month,
                    year,
                    kind,
                    category,
                    limit,
                } => cli::entries::list(month, year, kind, category, limit),
                EntryCommands::Edit {
                    id,
                    description,
                    amount,
                    kind,
                    category,
                    date,
                    recurring,
                    frequency,
                } => cli::entries::edit(id, description, amount, kind, category, date, recurring, frequency),
                EntryCommands::Delete { id } => cli::entries::delete(id),
            },
            Commands::Category { command } => match command {
                CategoryCommands::Add { name, kind, color } => {
                    cli::categories::add(&name, &kind, color.as_deref())
                }
                CategoryCommands::List => cli::categories::list(),
                CategoryCommands::Edit { id, name, color } => {
                    cli::categories::edit(id, name.as_deref(), color.as_deref())
                }
                CategoryCommands::Delete { id } => cli::categories::delete(id),
            },
            Commands::Budget { command } => match command {
                BudgetCommands::Set { category, limit, month } => {
                    cli::budgets::set(&category, limit, &month)
                }
                BudgetCommands::List { month } => cli::budgets::list(&month),
                BudgetCommands::Copy { from, to } => cli::budgets::copy(&from, &to),
                BudgetCommands::Remove { id } => cli::budgets::remove(id),
            },
            Commands::Dashboard => cli::dashboard::run(),
            Commands::Report { command } => match command {
                ReportCommands::Annual { year } => cli::report::annual(year),
                ReportCommands::Evolution { month } => cli::report::evolution(&month),
                ReportCommands::Compare { month } => cli::report::compare(&month),
            },
            Commands::Import { file } => cli::import::run(&file),
            Commands::Export { command } => match command {
                ExportCommands::Csv { year, output } => cli::export::csv(year, output),
                #[cfg(feature = "xlsx")]
                ExportCommands::Xlsx { year, output } => cli::export::xlsx(year, output),
                #[cfg(feature = "pdf")]
                ExportCommands::Pdf { year, output } => cli::export::pdf(year, output),
            },
            Commands::Demo => cli::demo::run(),
            Commands::Status => cli::status::run(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
