//! Bankroll arithmetic over the record list.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::record::DailyRecord;
use super::settings::UserSettings;

/// `initial_bank + Σ return_value`; zero when no settings exist yet.
pub fn current_bank(settings: Option<&UserSettings>, records: &[DailyRecord]) -> f64 {
    match settings {
        Some(s) => s.initial_bank + records.iter().map(|r| r.return_value).sum::<f64>(),
        None => 0.0,
    }
}

/// Percentage of winning entries across trade records.
pub fn win_rate(records: &[DailyRecord]) -> f64 {
    let (wins, entries) = records
        .iter()
        .filter(|r| r.is_trade())
        .fold((0u64, 0u64), |(w, e), r| {
            (
                w + u64::from(r.wins.unwrap_or(0)),
                e + u64::from(r.entries.unwrap_or(0)),
            )
        });

    if entries > 0 {
        wins as f64 / entries as f64 * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankPoint {
    pub date: NaiveDate,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankEvolution {
    pub initial_bank: f64,
    pub points: Vec<BankPoint>,
}

impl BankEvolution {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn balances(&self) -> impl Iterator<Item = f64> + '_ {
        std::iter::once(self.initial_bank).chain(self.points.iter().map(|p| p.balance))
    }
}

/// Running balance after each record, oldest first.
pub fn bank_evolution(settings: &UserSettings, records: &[DailyRecord]) -> BankEvolution {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let mut balance = settings.initial_bank;
    let points = sorted
        .into_iter()
        .map(|r| {
            balance += r.return_value;
            BankPoint {
                date: r.calendar_day(),
                balance,
            }
        })
        .collect();

    BankEvolution {
        initial_bank: settings.initial_bank,
        points,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOutcome {
    Gain,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub net: f64,
    pub outcome: DayOutcome,
}

/// Net result per calendar day; a day with net ≥ 0 counts as a gain.
pub fn calendar(records: &[DailyRecord]) -> Vec<CalendarDay> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        *by_day.entry(r.calendar_day()).or_insert(0.0) += r.return_value;
    }

    by_day
        .into_iter()
        .map(|(date, net)| CalendarDay {
            date,
            net,
            outcome: if net >= 0.0 {
                DayOutcome::Gain
            } else {
                DayOutcome::Loss
            },
        })
        .collect()
}

/// Headline figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub current_bank: f64,
    pub win_rate: f64,
    pub daily_entry_target: f64,
    pub daily_entry_value: f64,
    pub daily_profit_target: f64,
    pub daily_profit_value: f64,
    pub record_count: usize,
}

impl Summary {
    pub fn compute(settings: &UserSettings, records: &[DailyRecord]) -> Self {
        let bank = current_bank(Some(settings), records);
        Summary {
            current_bank: bank,
            win_rate: win_rate(records),
            daily_entry_target: settings.daily_entry_target,
            daily_entry_value: settings.daily_entry_value(bank),
            daily_profit_target: settings.daily_profit_target,
            daily_profit_value: settings.daily_profit_value(bank),
            record_count: records.len(),
        }
    }
}
