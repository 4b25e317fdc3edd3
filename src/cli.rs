//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::{self, SharedStore};
use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::ledger::DayOutcome;
use crate::domain::record::{
    BankOperation, BankOperationKind, DailyRecord, NewRecord, local_timestamp,
};
use crate::domain::settings::UserSettings;
use crate::ports::config_port::ConfigPort;
use crate::ports::export_port::ExportPort;
use crate::ports::journal_store::JournalStore;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Parser, Debug)]
#[command(name = "tradeflow", about = "Trading journal and bankroll projection")]
pub struct Cli {
    /// INI configuration file; without one the JSON store at data/database.json is used
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save the starting bank and daily targets
    Setup {
        #[arg(long)]
        initial_bank: f64,
        /// Daily entry target, percent of the bank
        #[arg(long, default_value_t = 5.0)]
        entry_target: f64,
        /// Daily profit target, percent of the bank
        #[arg(long, default_value_t = 10.0)]
        profit_target: f64,
    },
    /// Log the result of a trading day
    Log {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Signed result; negative for a losing day
        #[arg(long, allow_hyphen_values = true)]
        result: f64,
        #[arg(long, default_value_t = 0)]
        entries: u32,
        #[arg(long, default_value_t = 0)]
        wins: u32,
        #[arg(long, default_value_t = 0)]
        losses: u32,
    },
    /// Add money to the bank
    Deposit { value: f64 },
    /// Take money out of the bank
    Withdraw { value: f64 },
    /// Delete a record by id
    Delete { id: String },
    /// Erase the settings and every record
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Show the current bank, win rate and daily targets
    Status,
    /// List records, newest first
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the 90-day compound projection
    Project {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the net result of every recorded day
    Calendar,
    /// Write the records to a CSV file
    Export { output: PathBuf },
    /// Append records from a CSV file written by `export`
    Import { input: PathBuf },
    /// Start the web server
    Serve {
        /// Overrides [web] listen
        #[arg(short, long)]
        listen: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { listen } => run_serve(cli.config.as_deref(), listen.as_deref()),
        command => open_store_at(cli.config.as_deref())
            .and_then(|store| execute(command, store.as_ref(), &mut io::stdout().lock())),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradeflowError> {
    FileConfigAdapter::from_file(path).map_err(|e| TradeflowError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Store named by the config file, or the default JSON store without one.
pub fn open_store_at(config_path: Option<&Path>) -> Result<SharedStore, TradeflowError> {
    match config_path {
        Some(path) => adapters::open_store(&load_config(path)?),
        None => adapters::open_store(&FileConfigAdapter::empty()),
    }
}

/// Run every command except `serve` against `store`, writing human output to `out`.
pub fn execute(
    command: Command,
    store: &dyn JournalStore,
    out: &mut dyn Write,
) -> Result<(), TradeflowError> {
    match command {
        Command::Setup {
            initial_bank,
            entry_target,
            profit_target,
        } => {
            store.save_settings(&UserSettings {
                initial_bank,
                daily_entry_target: entry_target,
                daily_profit_target: profit_target,
            })?;
            writeln!(out, "Settings saved.")?;
            write!(out, "{}", format_status(&store.load()?))?;
        }
        Command::Log {
            date,
            result,
            entries,
            wins,
            losses,
        } => {
            require_settings(store)?;
            let day = date.unwrap_or_else(|| Local::now().date_naive());
            let at = local_timestamp(day).ok_or_else(|| {
                TradeflowError::invalid_record(format!("{day} has no local noon"))
            })?;
            let record = NewRecord::trade(at, result, entries, wins, losses).into_record()?;
            store.insert_record(&record)?;
            writeln!(out, "Logged {} for {day} ({}).", signed(result), record.id)?;
        }
        Command::Deposit { value } => {
            bank_operation(store, BankOperationKind::Deposit, value, out)?;
        }
        Command::Withdraw { value } => {
            bank_operation(store, BankOperationKind::Withdrawal, value, out)?;
        }
        Command::Delete { id } => {
            store.delete_record(&id)?;
            writeln!(out, "Deleted record {id}.")?;
        }
        Command::Reset { yes } => {
            if !yes {
                return Err(TradeflowError::ConfirmationRequired { action: "reset" });
            }
            store.reset()?;
            writeln!(out, "Journal reset.")?;
        }
        Command::Status => {
            let doc = store.load()?;
            if doc.settings.is_none() {
                return Err(TradeflowError::SettingsMissing);
            }
            write!(out, "{}", format_status(&doc))?;
        }
        Command::History { limit } => {
            write!(out, "{}", format_history(&store.load()?, limit))?;
        }
        Command::Project { limit } => {
            let doc = store.load()?;
            write!(out, "{}", format_projection(&doc, Local::now().date_naive(), limit)?)?;
        }
        Command::Calendar => {
            write!(out, "{}", format_calendar(&store.load()?))?;
        }
        Command::Export { output } => {
            let records = store.records()?;
            CsvAdapter::new().write_file(&records, &output)?;
            writeln!(out, "Exported {} records to {}.", records.len(), output.display())?;
        }
        Command::Import { input } => {
            let file = std::fs::File::open(&input)?;
            let records = CsvAdapter::new().read_from(file)?;
            check_import(&store.load()?, &records)?;
            for (committed, record) in records.iter().enumerate() {
                store.insert_record(record).map_err(|e| TradeflowError::Storage {
                    reason: format!(
                        "import stopped after {committed} of {} records: {e}",
                        records.len()
                    ),
                })?;
            }
            writeln!(out, "Imported {} records from {}.", records.len(), input.display())?;
        }
        Command::Serve { .. } => {
            return Err(TradeflowError::ConfigInvalid {
                section: "web".into(),
                key: "listen".into(),
                reason: "serve needs its own runtime; start it through `run`".into(),
            });
        }
    }
    Ok(())
}

/// Apply the whole batch to a copy of the journal so a bad row rejects the import before any write.
fn check_import(current: &JournalDocument, records: &[DailyRecord]) -> Result<(), TradeflowError> {
    let mut staged = current.clone();
    for (row, record) in records.iter().enumerate() {
        staged.insert_record(record.clone()).map_err(|e| match e {
            TradeflowError::InvalidRecord { reason } => {
                TradeflowError::invalid_record(format!("row {}: {reason}", row + 1))
            }
            other => {
                warn!(row = row + 1, error = %other, "import rejected; nothing written");
                other
            }
        })?;
    }
    Ok(())
}

fn require_settings(store: &dyn JournalStore) -> Result<UserSettings, TradeflowError> {
    store.settings()?.ok_or(TradeflowError::SettingsMissing)
}

fn bank_operation(
    store: &dyn JournalStore,
    kind: BankOperationKind,
    value: f64,
    out: &mut dyn Write,
) -> Result<(), TradeflowError> {
    require_settings(store)?;
    let record = BankOperation { kind, value }.into_record(Local::now().fixed_offset())?;
    store.insert_record(&record)?;
    let doc = store.load()?;
    writeln!(
        out,
        "Recorded {} of {value:.2}. Current bank: {:.2}",
        record.kind,
        doc.current_bank()
    )?;
    Ok(())
}

fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

pub fn format_status(doc: &JournalDocument) -> String {
    let Some(summary) = doc.summary() else {
        return "No settings configured; run `tradeflow setup` first.\n".to_string();
    };
    format!(
        "Current bank:        {:.2}\n\
         Win rate:            {:.1}%\n\
         Daily entry target:  {:.1}% ({:.2})\n\
         Daily profit target: {:.1}% ({:.2})\n\
         Records:             {}\n",
        summary.current_bank,
        summary.win_rate,
        summary.daily_entry_target,
        summary.daily_entry_value,
        summary.daily_profit_target,
        summary.daily_profit_value,
        summary.record_count,
    )
}

pub fn format_history(doc: &JournalDocument, limit: Option<usize>) -> String {
    let history = doc.history();
    if history.is_empty() {
        return "No records.\n".to_string();
    }

    let dash = || "-".to_string();
    let mut s = format!(
        "{:<10}  {:<10}  {:>12}  {:>7}  {:>4}  {:>6}  {}\n",
        "Date", "Type", "Result", "Entries", "Wins", "Losses", "Id"
    );
    for r in history.into_iter().take(limit.unwrap_or(usize::MAX)) {
        s.push_str(&format!(
            "{:<10}  {:<10}  {:>12}  {:>7}  {:>4}  {:>6}  {}\n",
            r.calendar_day(),
            r.kind.as_str(),
            signed(r.return_value),
            r.entries.map(|v| v.to_string()).unwrap_or_else(dash),
            r.wins.map(|v| v.to_string()).unwrap_or_else(dash),
            r.losses.map(|v| v.to_string()).unwrap_or_else(dash),
            r.id,
        ));
    }
    s
}

pub fn format_projection(
    doc: &JournalDocument,
    today: NaiveDate,
    limit: Option<usize>,
) -> Result<String, TradeflowError> {
    let projection = doc
        .projection(today)
        .ok_or(TradeflowError::SettingsMissing)?;

    let mut s = format!(
        "Projection from {:.2} at {:.1}% per day\n{:>3}  {:<10}  {:>14}  {:>16}\n",
        projection.start_balance(),
        projection.daily_rate() * 100.0,
        "Day",
        "Date",
        "Daily profit",
        "Projected bank"
    );
    for day in projection.iter().take(limit.unwrap_or(usize::MAX)) {
        s.push_str(&format!(
            "{:>3}  {:<10}  {:>14.2}  {:>16.2}\n",
            day.day, day.date, day.daily_profit, day.projected_bank
        ));
    }
    Ok(s)
}

pub fn format_calendar(doc: &JournalDocument) -> String {
    let days = doc.calendar();
    if days.is_empty() {
        return "No records.\n".to_string();
    }
    let mut s = String::new();
    for day in &days {
        let outcome = match day.outcome {
            DayOutcome::Gain => "gain",
            DayOutcome::Loss => "loss",
        };
        s.push_str(&format!("{}  {:>12}  {outcome}\n", day.date, signed(day.net)));
    }
    s
}

/// `--listen`, then `[web] listen`, then the default address.
pub fn resolve_listen(listen: Option<&str>, config: &dyn ConfigPort) -> String {
    listen
        .map(str::to_string)
        .or_else(|| config.get_string("web", "listen"))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string())
}

fn run_serve(config_path: Option<&Path>, listen: Option<&str>) -> Result<(), TradeflowError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, serve};
        use std::net::SocketAddr;

        let config = match config_path {
            Some(path) => load_config(path)?,
            None => FileConfigAdapter::empty(),
        };
        let store = adapters::open_store(&config)?;

        let listen = resolve_listen(listen, &config);
        let addr: SocketAddr = listen.parse().map_err(|e| TradeflowError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("'{listen}': {e}"),
        })?;

        eprintln!("Starting web server on http://{addr}");

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(serve(AppState::new(store), addr))
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (config_path, listen);
        Err(TradeflowError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "built without the 'web' feature".into(),
        })
    }
}
