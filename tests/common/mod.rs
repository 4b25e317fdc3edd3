#![allow(dead_code)]

use chrono::{DateTime, FixedOffset};
use std::io::Write;
use tradeflow::domain::record::{BankOperation, BankOperationKind, DailyRecord, NewRecord};
use tradeflow::domain::settings::UserSettings;

pub fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

pub fn trade(date: &str, value: f64, entries: u32, wins: u32, losses: u32) -> DailyRecord {
    NewRecord::trade(ts(date), value, entries, wins, losses)
        .into_record()
        .unwrap()
}

pub fn deposit(date: &str, value: f64) -> DailyRecord {
    BankOperation {
        kind: BankOperationKind::Deposit,
        value,
    }
    .into_record(ts(date))
    .unwrap()
}

pub fn withdrawal(date: &str, value: f64) -> DailyRecord {
    BankOperation {
        kind: BankOperationKind::Withdrawal,
        value,
    }
    .into_record(ts(date))
    .unwrap()
}

pub fn settings(initial_bank: f64, entry_target: f64, profit_target: f64) -> UserSettings {
    UserSettings {
        initial_bank,
        daily_entry_target: entry_target,
        daily_profit_target: profit_target,
    }
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
