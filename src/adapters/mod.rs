//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_file_store;
pub mod memory_store;
#[cfg(feature = "postgres")]
pub mod postgres_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
#[cfg(feature = "web")]
pub mod web;

use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::domain::error::TradeflowError;
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_store::JournalStore;

/// A store shared between request handlers.
pub type SharedStore = Arc<dyn JournalStore + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Json,
    Memory,
    Sqlite,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = TradeflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(TradeflowError::ConfigInvalid {
                section: "storage".into(),
                key: "backend".into(),
                reason: format!("unknown backend '{other}'"),
            }),
        }
    }
}

#[cfg(not(all(feature = "sqlite", feature = "postgres")))]
fn not_compiled(backend: &str) -> TradeflowError {
    TradeflowError::ConfigInvalid {
        section: "storage".into(),
        key: "backend".into(),
        reason: format!("built without the '{backend}' feature"),
    }
}

/// Open the backend named by `[storage] backend` (default `json`).
pub fn open_store(config: &dyn ConfigPort) -> Result<SharedStore, TradeflowError> {
    let backend = match config.get_string("storage", "backend") {
        Some(name) if !name.trim().is_empty() => name.parse()?,
        _ => StorageBackend::Json,
    };

    let store: SharedStore = match backend {
        StorageBackend::Json => {
            let store = json_file_store::JsonFileStore::from_config(config);
            info!(path = %store.path().display(), "using JSON document store");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            info!("using in-memory store");
            Arc::new(memory_store::MemoryStore::new())
        }
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => {
            info!("using SQLite store");
            Arc::new(sqlite_store::SqliteStore::from_config(config)?)
        }
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => return Err(not_compiled("sqlite")),
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres => {
            info!("using PostgreSQL store");
            Arc::new(postgres_store::PostgresStore::from_config(config)?)
        }
        #[cfg(not(feature = "postgres"))]
        StorageBackend::Postgres => return Err(not_compiled("postgres")),
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use file_config_adapter::FileConfigAdapter;

    #[test]
    fn backend_names_parse() {
        assert_eq!("JSON".parse::<StorageBackend>().unwrap(), StorageBackend::Json);
        assert_eq!(
            "postgresql".parse::<StorageBackend>().unwrap(),
            StorageBackend::Postgres
        );
        assert!(matches!(
            "mongo".parse::<StorageBackend>(),
            Err(TradeflowError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn memory_backend_opens() {
        let cfg = FileConfigAdapter::from_string("[storage]\nbackend = memory\n").unwrap();
        let store = open_store(&cfg).unwrap();
        assert!(store.load().unwrap().records.is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_backend_requires_path() {
        let cfg = FileConfigAdapter::from_string("[storage]\nbackend = sqlite\n").unwrap();
        assert!(matches!(
            open_store(&cfg),
            Err(TradeflowError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let cfg = FileConfigAdapter::from_string("[storage]\nbackend = redis\n").unwrap();
        assert!(open_store(&cfg).is_err());
    }
}
