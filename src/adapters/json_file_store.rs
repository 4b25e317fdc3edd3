//! Single JSON document on disk: `{ "settings": ..., "records": [...] }`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::{debug, warn};

use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::record::DailyRecord;
use crate::domain::settings::UserSettings;
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_store::JournalStore;

pub const DEFAULT_JSON_PATH: &str = "data/database.json";

enum Loaded {
    Document(JournalDocument),
    Corrupt(serde_json::Error),
}

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let path = config
            .get_string("storage", "path")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_JSON_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Loaded, TradeflowError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Loaded::Document(JournalDocument::default()));
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Loaded::Document(JournalDocument::default()));
        }

        Ok(match serde_json::from_str(&content) {
            Ok(doc) => Loaded::Document(doc),
            Err(e) => Loaded::Corrupt(e),
        })
    }

    fn read(&self) -> Result<JournalDocument, TradeflowError> {
        match self.read_raw()? {
            Loaded::Document(doc) => Ok(doc),
            Loaded::Corrupt(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "journal document is unreadable; starting from an empty journal"
                );
                Ok(JournalDocument::default())
            }
        }
    }

    /// Move an unreadable document to `<path>.corrupt-<timestamp>` and return the new path.
    fn set_aside(&self) -> Result<PathBuf, TradeflowError> {
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(
            ".corrupt-{}",
            Local::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        let backup = PathBuf::from(backup);
        fs::rename(&self.path, &backup).map_err(|e| TradeflowError::Storage {
            reason: format!(
                "cannot move unreadable journal {} aside: {e}",
                self.path.display()
            ),
        })?;
        Ok(backup)
    }

    /// Write through a sibling temp file so readers never see a half-written document.
    fn write(&self, doc: &JournalDocument) -> Result<(), TradeflowError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), records = doc.records.len(), "journal written");
        Ok(())
    }

    fn update<T>(
        &self,
        mutate: impl FnOnce(&mut JournalDocument) -> Result<T, TradeflowError>,
    ) -> Result<T, TradeflowError> {
        let _guard = self.write_lock.lock().map_err(|_| TradeflowError::Storage {
            reason: "journal lock poisoned".into(),
        })?;
        let mut doc = match self.read_raw()? {
            Loaded::Document(doc) => doc,
            Loaded::Corrupt(e) => {
                let mut scratch = JournalDocument::default();
                let out = mutate(&mut scratch)?;
                let backup = self.set_aside()?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "unreadable journal moved aside before writing"
                );
                self.write(&scratch)?;
                return Ok(out);
            }
        };
        let out = mutate(&mut doc)?;
        self.write(&doc)?;
        Ok(out)
    }
}

impl JournalStore for JsonFileStore {
    fn load(&self) -> Result<JournalDocument, TradeflowError> {
        self.read()
    }

    fn save_settings(&self, settings: &UserSettings) -> Result<(), TradeflowError> {
        self.update(|doc| doc.save_settings(*settings))
    }

    fn insert_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        self.update(|doc| doc.insert_record(record.clone()))
    }

    fn replace_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        self.update(|doc| doc.replace_record(record.clone()))
    }

    fn delete_record(&self, id: &str) -> Result<(), TradeflowError> {
        self.update(|doc| doc.delete_record(id).map(|_| ()))
    }

    fn reset(&self) -> Result<(), TradeflowError> {
        self.update(|doc| {
            doc.reset();
            Ok(())
        })
    }
}
