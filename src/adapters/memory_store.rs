//! In-process store; nothing survives a restart.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::record::DailyRecord;
use crate::domain::settings::UserSettings;
use crate::ports::journal_store::JournalStore;

#[derive(Default)]
pub struct MemoryStore {
    doc: RwLock<JournalDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: JournalDocument) -> Self {
        Self {
            doc: RwLock::new(doc),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, JournalDocument>, TradeflowError> {
        self.doc.read().map_err(|_| TradeflowError::Storage {
            reason: "journal lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, JournalDocument>, TradeflowError> {
        self.doc.write().map_err(|_| TradeflowError::Storage {
            reason: "journal lock poisoned".into(),
        })
    }
}

impl JournalStore for MemoryStore {
    fn load(&self) -> Result<JournalDocument, TradeflowError> {
        Ok(self.read()?.clone())
    }

    fn save_settings(&self, settings: &UserSettings) -> Result<(), TradeflowError> {
        self.write()?.save_settings(*settings)
    }

    fn insert_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        self.write()?.insert_record(record.clone())
    }

    fn replace_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        self.write()?.replace_record(record.clone())
    }

    fn delete_record(&self, id: &str) -> Result<(), TradeflowError> {
        self.write()?.delete_record(id).map(|_| ())
    }

    fn reset(&self) -> Result<(), TradeflowError> {
        self.write()?.reset();
        Ok(())
    }

    fn settings(&self) -> Result<Option<UserSettings>, TradeflowError> {
        Ok(self.read()?.settings)
    }

    fn record(&self, id: &str) -> Result<Option<DailyRecord>, TradeflowError> {
        Ok(self.read()?.record(id).cloned())
    }
}
