//! Ledger entries: trade results and bank operations.

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::TradeflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Trade,
    Deposit,
    Withdrawal,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Trade => "trade",
            RecordKind::Deposit => "deposit",
            RecordKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = TradeflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trade" => Ok(RecordKind::Trade),
            "deposit" => Ok(RecordKind::Deposit),
            "withdrawal" => Ok(RecordKind::Withdrawal),
            other => Err(TradeflowError::invalid_record(format!(
                "unknown record type '{other}'"
            ))),
        }
    }
}

/// Noon on `day` in the local timezone, the timestamp given to records entered by date only.
pub fn local_timestamp(day: NaiveDate) -> Option<DateTime<FixedOffset>> {
    day.and_hms_opt(12, 0, 0)?
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: String,
    pub date: DateTime<FixedOffset>,
    /// Signed change to the bank: gains and deposits are positive.
    pub return_value: f64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub losses: Option<u32>,
}

impl DailyRecord {
    /// Calendar day of the record in the offset it was recorded with.
    pub fn calendar_day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    pub fn is_trade(&self) -> bool {
        self.kind == RecordKind::Trade
    }

    /// Win percentage of this record alone; zero for bank operations.
    pub fn win_rate(&self) -> f64 {
        if !self.is_trade() {
            return 0.0;
        }
        let entries = self.entries.unwrap_or(0);
        if entries == 0 {
            return 0.0;
        }
        f64::from(self.wins.unwrap_or(0)) / f64::from(entries) * 100.0
    }

    pub fn validate(&self) -> Result<(), TradeflowError> {
        if self.id.trim().is_empty() {
            return Err(TradeflowError::invalid_record("id must not be empty"));
        }
        if !self.return_value.is_finite() {
            return Err(TradeflowError::invalid_record("returnValue must be a finite number"));
        }

        match self.kind {
            RecordKind::Trade => {
                let entries = u64::from(self.entries.unwrap_or(0));
                let wins = u64::from(self.wins.unwrap_or(0));
                let losses = u64::from(self.losses.unwrap_or(0));
                if wins + losses > entries {
                    return Err(TradeflowError::invalid_record(format!(
                        "wins ({wins}) plus losses ({losses}) exceed entries ({entries})"
                    )));
                }
            }
            RecordKind::Deposit | RecordKind::Withdrawal => {
                if self.entries.is_some() || self.wins.is_some() || self.losses.is_some() {
                    return Err(TradeflowError::invalid_record(format!(
                        "{} records do not carry entries, wins or losses",
                        self.kind
                    )));
                }
                if self.kind == RecordKind::Deposit && self.return_value <= 0.0 {
                    return Err(TradeflowError::invalid_record(
                        "deposit returnValue must be positive",
                    ));
                }
                if self.kind == RecordKind::Withdrawal && self.return_value >= 0.0 {
                    return Err(TradeflowError::invalid_record(
                        "withdrawal returnValue must be negative",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Record payload before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub date: DateTime<FixedOffset>,
    pub return_value: f64,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: RecordKind,
    #[serde(default)]
    pub entries: Option<u32>,
    #[serde(default)]
    pub wins: Option<u32>,
    #[serde(default)]
    pub losses: Option<u32>,
}

fn default_kind() -> RecordKind {
    RecordKind::Trade
}

impl NewRecord {
    pub fn trade(
        date: DateTime<FixedOffset>,
        return_value: f64,
        entries: u32,
        wins: u32,
        losses: u32,
    ) -> Self {
        Self {
            id: None,
            date,
            return_value,
            kind: RecordKind::Trade,
            entries: Some(entries),
            wins: Some(wins),
            losses: Some(losses),
        }
    }

    /// Assign an id (a fresh UUID unless one was supplied) and validate.
    pub fn into_record(self) -> Result<DailyRecord, TradeflowError> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let record = DailyRecord {
            id,
            date: self.date,
            return_value: self.return_value,
            kind: self.kind,
            entries: self.entries,
            wins: self.wins,
            losses: self.losses,
        };
        record.validate()?;
        Ok(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankOperationKind {
    Deposit,
    Withdrawal,
}

/// A deposit or withdrawal expressed as a positive amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankOperation {
    #[serde(rename = "type")]
    pub kind: BankOperationKind,
    pub value: f64,
}

impl BankOperation {
    pub fn into_record(self, date: DateTime<FixedOffset>) -> Result<DailyRecord, TradeflowError> {
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(TradeflowError::invalid_record(
                "operation value must be positive",
            ));
        }
        let (kind, return_value) = match self.kind {
            BankOperationKind::Deposit => (RecordKind::Deposit, self.value),
            BankOperationKind::Withdrawal => (RecordKind::Withdrawal, -self.value),
        };
        NewRecord {
            id: None,
            date,
            return_value,
            kind,
            entries: None,
            wins: None,
            losses: None,
        }
        .into_record()
    }
}
