//! Persistence port for the journal document.

use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::record::DailyRecord;
use crate::domain::settings::UserSettings;

/// A backend holding one user's settings and records.
///
/// Implementations must reject a second `trade` record on the same calendar
/// day inside the same critical section as the write, so the check cannot race
/// with a concurrent insert.
pub trait JournalStore {
    /// The whole document. A missing or unreadable document loads as empty.
    fn load(&self) -> Result<JournalDocument, TradeflowError>;

    fn save_settings(&self, settings: &UserSettings) -> Result<(), TradeflowError>;

    /// Fails with `DuplicateTrade` or `DuplicateId` without writing anything.
    fn insert_record(&self, record: &DailyRecord) -> Result<(), TradeflowError>;

    /// Fails with `RecordNotFound` when no record has `record.id`.
    fn replace_record(&self, record: &DailyRecord) -> Result<(), TradeflowError>;

    /// Fails with `RecordNotFound` when no record has `id`.
    fn delete_record(&self, id: &str) -> Result<(), TradeflowError>;

    /// Remove the settings and every record.
    fn reset(&self) -> Result<(), TradeflowError>;

    fn settings(&self) -> Result<Option<UserSettings>, TradeflowError> {
        Ok(self.load()?.settings)
    }

    fn records(&self) -> Result<Vec<DailyRecord>, TradeflowError> {
        Ok(self.load()?.records)
    }

    fn record(&self, id: &str) -> Result<Option<DailyRecord>, TradeflowError> {
        Ok(self.load()?.records.into_iter().find(|r| r.id == id))
    }
}
