//! SQLite journal store.

use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::record::{DailyRecord, RecordKind};
use crate::domain::settings::UserSettings;
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_store::JournalStore;
use chrono::DateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;

const RECORD_COLUMNS: &str = "id, date, return_value, kind, entries, wins, losses";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> TradeflowError {
    TradeflowError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> TradeflowError {
    TradeflowError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn trade_day(record: &DailyRecord) -> Option<String> {
    record
        .is_trade()
        .then(|| record.calendar_day().format("%Y-%m-%d").to_string())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DailyRecord> {
    let date_str: String = row.get(1)?;
    let date = DateTime::parse_from_rfc3339(&date_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let kind_str: String = row.get(3)?;
    let kind: RecordKind = kind_str.parse().map_err(|e: TradeflowError| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DailyRecord {
        id: row.get(0)?,
        date,
        return_value: row.get(2)?,
        kind,
        entries: row.get(4)?,
        wins: row.get(5)?,
        losses: row.get(6)?,
    })
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeflowError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        if let Some(parent) = std::path::Path::new(&db_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Single-connection in-memory database; each connection would otherwise see its own.
    pub fn in_memory() -> Result<Self, TradeflowError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TradeflowError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), TradeflowError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                initial_bank REAL NOT NULL,
                daily_entry_target REAL NOT NULL,
                daily_profit_target REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                date TEXT NOT NULL,
                return_value REAL NOT NULL,
                kind TEXT NOT NULL,
                entries INTEGER,
                wins INTEGER,
                losses INTEGER,
                trade_day TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_records_trade_day
                ON records(trade_day) WHERE trade_day IS NOT NULL;",
        )
        .map_err(query_err)?;
        Ok(())
    }
}

impl JournalStore for SqliteStore {
    fn load(&self) -> Result<JournalDocument, TradeflowError> {
        let settings = self.settings()?;
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY seq ASC"))
            .map_err(query_err)?;
        let rows = stmt.query_map([], record_from_row).map_err(query_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_err)?);
        }

        Ok(JournalDocument::new(settings, records))
    }

    fn settings(&self) -> Result<Option<UserSettings>, TradeflowError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT initial_bank, daily_entry_target, daily_profit_target FROM settings WHERE id = 1",
            [],
            |row| {
                Ok(UserSettings {
                    initial_bank: row.get(0)?,
                    daily_entry_target: row.get(1)?,
                    daily_profit_target: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    fn record(&self, id: &str) -> Result<Option<DailyRecord>, TradeflowError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
            params![id],
            record_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn save_settings(&self, settings: &UserSettings) -> Result<(), TradeflowError> {
        settings.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (id, initial_bank, daily_entry_target, daily_profit_target)
             VALUES (1, ?1, ?2, ?3)",
            params![
                settings.initial_bank,
                settings.daily_entry_target,
                settings.daily_profit_target
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn insert_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        record.validate()?;
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let id_taken: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE id = ?1)",
                params![record.id],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        if id_taken {
            return Err(TradeflowError::DuplicateId {
                id: record.id.clone(),
            });
        }

        let day = trade_day(record);
        if let Some(day) = &day {
            let day_taken: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM records WHERE trade_day = ?1)",
                    params![day],
                    |row| row.get(0),
                )
                .map_err(query_err)?;
            if day_taken {
                return Err(TradeflowError::DuplicateTrade {
                    date: record.calendar_day(),
                });
            }
        }

        tx.execute(
            "INSERT INTO records (id, date, return_value, kind, entries, wins, losses, trade_day)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.date.to_rfc3339(),
                record.return_value,
                record.kind.as_str(),
                record.entries,
                record.wins,
                record.losses,
                day
            ],
        )
        .map_err(query_err)?;

        tx.commit().map_err(query_err)?;
        debug!(id = %record.id, kind = %record.kind, "record inserted");
        Ok(())
    }

    fn replace_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        record.validate()?;
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let day = trade_day(record);
        if let Some(day) = &day {
            let day_taken: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM records WHERE trade_day = ?1 AND id != ?2)",
                    params![day, record.id],
                    |row| row.get(0),
                )
                .map_err(query_err)?;
            if day_taken {
                return Err(TradeflowError::DuplicateTrade {
                    date: record.calendar_day(),
                });
            }
        }

        let changed = tx
            .execute(
                "UPDATE records
                 SET date = ?2, return_value = ?3, kind = ?4, entries = ?5, wins = ?6,
                     losses = ?7, trade_day = ?8
                 WHERE id = ?1",
                params![
                    record.id,
                    record.date.to_rfc3339(),
                    record.return_value,
                    record.kind.as_str(),
                    record.entries,
                    record.wins,
                    record.losses,
                    day
                ],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(TradeflowError::RecordNotFound {
                id: record.id.clone(),
            });
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn delete_record(&self, id: &str) -> Result<(), TradeflowError> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])
            .map_err(query_err)?;
        if changed == 0 {
            return Err(TradeflowError::RecordNotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn reset(&self) -> Result<(), TradeflowError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        tx.execute_batch("DELETE FROM records; DELETE FROM settings;")
            .map_err(query_err)?;
        tx.commit().map_err(query_err)?;
        Ok(())
    }
}
