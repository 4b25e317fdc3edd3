//! The persisted journal document and its invariant-preserving mutations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::TradeflowError;
use super::ledger::{self, BankEvolution, CalendarDay, Summary};
use super::projection::Projection;
use super::record::DailyRecord;
use super::settings::UserSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalDocument {
    #[serde(default)]
    pub settings: Option<UserSettings>,
    #[serde(default)]
    pub records: Vec<DailyRecord>,
}

impl JournalDocument {
    pub fn new(settings: Option<UserSettings>, records: Vec<DailyRecord>) -> Self {
        Self { settings, records }
    }

    pub fn record(&self, id: &str) -> Option<&DailyRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The trade record already booked for `day`, ignoring `except_id`.
    pub fn trade_on(&self, day: NaiveDate, except_id: Option<&str>) -> Option<&DailyRecord> {
        self.records
            .iter()
            .filter(|r| except_id != Some(r.id.as_str()))
            .find(|r| r.is_trade() && r.calendar_day() == day)
    }

    pub fn save_settings(&mut self, settings: UserSettings) -> Result<(), TradeflowError> {
        settings.validate()?;
        self.settings = Some(settings);
        Ok(())
    }

    /// Append a record, rejecting a second trade on the same calendar day.
    pub fn insert_record(&mut self, record: DailyRecord) -> Result<(), TradeflowError> {
        record.validate()?;
        if self.record(&record.id).is_some() {
            return Err(TradeflowError::DuplicateId { id: record.id });
        }
        if record.is_trade() && self.trade_on(record.calendar_day(), None).is_some() {
            return Err(TradeflowError::DuplicateTrade {
                date: record.calendar_day(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Replace the record with the same id in place.
    pub fn replace_record(&mut self, record: DailyRecord) -> Result<(), TradeflowError> {
        record.validate()?;
        let index = self
            .records
            .iter()
            .position(|r| r.id == record.id)
            .ok_or_else(|| TradeflowError::RecordNotFound {
                id: record.id.clone(),
            })?;
        if record.is_trade()
            && self
                .trade_on(record.calendar_day(), Some(&record.id))
                .is_some()
        {
            return Err(TradeflowError::DuplicateTrade {
                date: record.calendar_day(),
            });
        }
        self.records[index] = record;
        Ok(())
    }

    pub fn delete_record(&mut self, id: &str) -> Result<DailyRecord, TradeflowError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| TradeflowError::RecordNotFound { id: id.to_string() })?;
        Ok(self.records.remove(index))
    }

    pub fn reset(&mut self) {
        self.settings = None;
        self.records.clear();
    }

    pub fn current_bank(&self) -> f64 {
        ledger::current_bank(self.settings.as_ref(), &self.records)
    }

    pub fn win_rate(&self) -> f64 {
        ledger::win_rate(&self.records)
    }

    pub fn summary(&self) -> Option<Summary> {
        self.settings
            .as_ref()
            .map(|s| Summary::compute(s, &self.records))
    }

    pub fn projection(&self, today: NaiveDate) -> Option<Projection> {
        self.settings
            .as_ref()
            .map(|s| Projection::new(self.current_bank(), s.daily_profit_rate(), today))
    }

    pub fn bank_evolution(&self) -> Option<BankEvolution> {
        self.settings
            .as_ref()
            .map(|s| ledger::bank_evolution(s, &self.records))
    }

    pub fn calendar(&self) -> Vec<CalendarDay> {
        ledger::calendar(&self.records)
    }

    /// Records newest first, as shown in the history table.
    pub fn history(&self) -> Vec<&DailyRecord> {
        let mut sorted: Vec<&DailyRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{BankOperation, BankOperationKind, NewRecord};
    use chrono::{DateTime, FixedOffset};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn trade(date: &str, value: f64) -> DailyRecord {
        NewRecord::trade(ts(date), value, 2, 1, 1).into_record().unwrap()
    }

    fn doc() -> JournalDocument {
        let mut d = JournalDocument::default();
        d.save_settings(UserSettings::default()).unwrap();
        d
    }

    #[test]
    fn second_trade_same_day_is_rejected() {
        let mut d = doc();
        d.insert_record(trade("2024-05-01T09:00:00Z", 10.0)).unwrap();
        let err = d
            .insert_record(trade("2024-05-01T17:00:00Z", 20.0))
            .unwrap_err();
        match err {
            TradeflowError::DuplicateTrade { date } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            }
            other => panic!("expected DuplicateTrade, got {other}"),
        }
        assert_eq!(d.records.len(), 1);
    }

    #[test]
    fn bank_operation_same_day_as_trade_is_allowed() {
        let mut d = doc();
        d.insert_record(trade("2024-05-01T09:00:00Z", 10.0)).unwrap();
        let dep = BankOperation {
            kind: BankOperationKind::Deposit,
            value: 50.0,
        }
        .into_record(ts("2024-05-01T12:00:00Z"))
        .unwrap();
        let wd = BankOperation {
            kind: BankOperationKind::Withdrawal,
            value: 5.0,
        }
        .into_record(ts("2024-05-01T13:00:00Z"))
        .unwrap();
        d.insert_record(dep).unwrap();
        d.insert_record(wd).unwrap();
        assert_eq!(d.records.len(), 3);
        assert_eq!(d.current_bank(), 1055.0);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut d = doc();
        let a = trade("2024-05-01T09:00:00Z", 10.0);
        let mut b = trade("2024-05-02T09:00:00Z", 10.0);
        b.id = a.id.clone();
        d.insert_record(a).unwrap();
        assert!(matches!(
            d.insert_record(b),
            Err(TradeflowError::DuplicateId { .. })
        ));
    }

    #[test]
    fn delete_removes_exactly_one() {
        let mut d = doc();
        let a = trade("2024-05-01T09:00:00Z", 200.0);
        let b = trade("2024-05-02T09:00:00Z", -50.0);
        let a_id = a.id.clone();
        d.insert_record(a).unwrap();
        d.insert_record(b).unwrap();
        assert_eq!(d.current_bank(), 1150.0);

        let removed = d.delete_record(&a_id).unwrap();
        assert_eq!(removed.id, a_id);
        assert_eq!(d.records.len(), 1);
        assert_eq!(d.current_bank(), 950.0);
        assert!(matches!(
            d.delete_record(&a_id),
            Err(TradeflowError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn replace_keeps_position_and_checks_day() {
        let mut d = doc();
        let a = trade("2024-05-01T09:00:00Z", 10.0);
        let b = trade("2024-05-02T09:00:00Z", 20.0);
        d.insert_record(a.clone()).unwrap();
        d.insert_record(b.clone()).unwrap();

        // editing a trade on its own day is fine
        let mut edited = a.clone();
        edited.return_value = 99.0;
        d.replace_record(edited).unwrap();
        assert_eq!(d.records[0].return_value, 99.0);

        // moving it onto b's day is not
        let mut moved = a.clone();
        moved.date = ts("2024-05-02T20:00:00Z");
        assert!(matches!(
            d.replace_record(moved),
            Err(TradeflowError::DuplicateTrade { .. })
        ));

        let mut ghost = b;
        ghost.id = "missing".into();
        assert!(matches!(
            d.replace_record(ghost),
            Err(TradeflowError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let mut d = doc();
        d.insert_record(trade("2024-05-01T09:00:00Z", 10.0)).unwrap();
        d.reset();
        assert_eq!(d, JournalDocument::default());
        assert_eq!(d.current_bank(), 0.0);
        assert!(d.summary().is_none());
        assert!(d.projection(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).is_none());
    }

    #[test]
    fn projection_starts_from_current_bank() {
        let mut d = doc();
        d.insert_record(trade("2024-05-01T09:00:00Z", 0.0)).unwrap();
        let p = d
            .projection(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
            .unwrap();
        let first = p.iter().next().unwrap();
        assert!((first.daily_profit - 100.0).abs() < 1e-9);
    }

    #[test]
    fn history_is_newest_first() {
        let mut d = doc();
        d.insert_record(trade("2024-05-01T09:00:00Z", 1.0)).unwrap();
        d.insert_record(trade("2024-05-03T09:00:00Z", 3.0)).unwrap();
        d.insert_record(trade("2024-05-02T09:00:00Z", 2.0)).unwrap();
        let values: Vec<f64> = d.history().iter().map(|r| r.return_value).collect();
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn empty_document_json_shape() {
        let json = serde_json::to_string(&JournalDocument::default()).unwrap();
        assert_eq!(json, r#"{"settings":null,"records":[]}"#);
        let parsed: JournalDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, JournalDocument::default());
    }

    #[test]
    fn invalid_settings_not_saved() {
        let mut d = JournalDocument::default();
        let bad = UserSettings {
            daily_profit_target: 0.0,
            ..UserSettings::default()
        };
        assert!(d.save_settings(bad).is_err());
        assert!(d.settings.is_none());
    }
}
