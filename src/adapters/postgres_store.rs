//! PostgreSQL journal store.

use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::record::{DailyRecord, RecordKind};
use crate::domain::settings::UserSettings;
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_store::JournalStore;
use chrono::{DateTime, NaiveDate};
use postgres::types::ToSql;
use postgres::{NoTls, Row, Transaction};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use tracing::debug;

type Manager = PostgresConnectionManager<NoTls>;

const RECORD_COLUMNS: &str = "id, date, return_value, kind, entries, wins, losses";

pub struct PostgresStore {
    pool: Pool<Manager>,
}

fn db_err(e: impl std::fmt::Display) -> TradeflowError {
    TradeflowError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: postgres::Error) -> TradeflowError {
    TradeflowError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn count_to_sql(count: Option<u32>) -> Option<i64> {
    count.map(i64::from)
}

fn count_from_sql(value: Option<i64>, column: &str) -> Result<Option<u32>, TradeflowError> {
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| TradeflowError::DatabaseQuery {
                reason: format!("{column} out of range: {v}"),
            })
        })
        .transpose()
}

fn record_from_row(row: &Row) -> Result<DailyRecord, TradeflowError> {
    let date_str: String = row.get(1);
    let date = DateTime::parse_from_rfc3339(&date_str).map_err(|e| TradeflowError::DatabaseQuery {
        reason: format!("bad date '{date_str}': {e}"),
    })?;
    let kind: RecordKind = row.get::<_, String>(3).parse()?;

    Ok(DailyRecord {
        id: row.get(0),
        date,
        return_value: row.get(2),
        kind,
        entries: count_from_sql(row.get(4), "entries")?,
        wins: count_from_sql(row.get(5), "wins")?,
        losses: count_from_sql(row.get(6), "losses")?,
    })
}

fn trade_day(record: &DailyRecord) -> Option<NaiveDate> {
    record.is_trade().then(|| record.calendar_day())
}

/// Serialize trade-day checks against concurrent writers for the rest of `tx`.
fn lock_records(tx: &mut Transaction<'_>) -> Result<(), TradeflowError> {
    tx.batch_execute("LOCK TABLE tradeflow_records IN SHARE ROW EXCLUSIVE MODE")
        .map_err(query_err)
}

fn day_taken(
    tx: &mut Transaction<'_>,
    day: NaiveDate,
    except_id: &str,
) -> Result<bool, TradeflowError> {
    let row = tx
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM tradeflow_records WHERE trade_day = $1 AND id <> $2)",
            &[&day, &except_id],
        )
        .map_err(query_err)?;
    Ok(row.get(0))
}

impl PostgresStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeflowError> {
        // [postgres] connection_string first, then [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TradeflowError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;
        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| TradeflowError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, TradeflowError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), TradeflowError> {
        let mut client = self.conn()?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS tradeflow_settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    initial_bank DOUBLE PRECISION NOT NULL,
                    daily_entry_target DOUBLE PRECISION NOT NULL,
                    daily_profit_target DOUBLE PRECISION NOT NULL
                );
                CREATE TABLE IF NOT EXISTS tradeflow_records (
                    seq BIGSERIAL PRIMARY KEY,
                    id TEXT NOT NULL UNIQUE,
                    date TEXT NOT NULL,
                    return_value DOUBLE PRECISION NOT NULL,
                    kind TEXT NOT NULL,
                    entries BIGINT CHECK (entries >= 0),
                    wins BIGINT CHECK (wins >= 0),
                    losses BIGINT CHECK (losses >= 0),
                    trade_day DATE
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_tradeflow_records_trade_day
                    ON tradeflow_records(trade_day) WHERE trade_day IS NOT NULL;",
            )
            .map_err(query_err)
    }
}

impl JournalStore for PostgresStore {
    fn load(&self) -> Result<JournalDocument, TradeflowError> {
        let settings = self.settings()?;
        let mut client = self.conn()?;
        let rows = client
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM tradeflow_records ORDER BY seq ASC"),
                &[],
            )
            .map_err(query_err)?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JournalDocument::new(settings, records))
    }

    fn settings(&self) -> Result<Option<UserSettings>, TradeflowError> {
        let mut client = self.conn()?;
        let row = client
            .query_opt(
                "SELECT initial_bank, daily_entry_target, daily_profit_target
                 FROM tradeflow_settings WHERE id = 1",
                &[],
            )
            .map_err(query_err)?;

        Ok(row.map(|row| UserSettings {
            initial_bank: row.get(0),
            daily_entry_target: row.get(1),
            daily_profit_target: row.get(2),
        }))
    }

    fn record(&self, id: &str) -> Result<Option<DailyRecord>, TradeflowError> {
        let mut client = self.conn()?;
        let row = client
            .query_opt(
                &format!("SELECT {RECORD_COLUMNS} FROM tradeflow_records WHERE id = $1"),
                &[&id],
            )
            .map_err(query_err)?;
        row.as_ref().map(record_from_row).transpose()
    }

    fn save_settings(&self, settings: &UserSettings) -> Result<(), TradeflowError> {
        settings.validate()?;
        let mut client = self.conn()?;
        client
            .execute(
                "INSERT INTO tradeflow_settings (id, initial_bank, daily_entry_target, daily_profit_target)
                 VALUES (1, $1, $2, $3)
                 ON CONFLICT (id) DO UPDATE SET
                     initial_bank = EXCLUDED.initial_bank,
                     daily_entry_target = EXCLUDED.daily_entry_target,
                     daily_profit_target = EXCLUDED.daily_profit_target",
                &[
                    &settings.initial_bank,
                    &settings.daily_entry_target,
                    &settings.daily_profit_target,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn insert_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        record.validate()?;
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;
        lock_records(&mut tx)?;

        let id_taken: bool = tx
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM tradeflow_records WHERE id = $1)",
                &[&record.id],
            )
            .map_err(query_err)?
            .get(0);
        if id_taken {
            return Err(TradeflowError::DuplicateId {
                id: record.id.clone(),
            });
        }

        let day = trade_day(record);
        if let Some(day) = day {
            if day_taken(&mut tx, day, &record.id)? {
                return Err(TradeflowError::DuplicateTrade { date: day });
            }
        }

        let date = record.date.to_rfc3339();
        let kind = record.kind.as_str();
        let (entries, wins, losses) = (
            count_to_sql(record.entries),
            count_to_sql(record.wins),
            count_to_sql(record.losses),
        );
        let params: &[&(dyn ToSql + Sync)] = &[
            &record.id,
            &date,
            &record.return_value,
            &kind,
            &entries,
            &wins,
            &losses,
            &day,
        ];
        tx.execute(
            "INSERT INTO tradeflow_records
                 (id, date, return_value, kind, entries, wins, losses, trade_day)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            params,
        )
        .map_err(query_err)?;

        tx.commit().map_err(query_err)?;
        debug!(id = %record.id, kind = %record.kind, "record inserted");
        Ok(())
    }

    fn replace_record(&self, record: &DailyRecord) -> Result<(), TradeflowError> {
        record.validate()?;
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;
        lock_records(&mut tx)?;

        let day = trade_day(record);
        if let Some(day) = day {
            if day_taken(&mut tx, day, &record.id)? {
                return Err(TradeflowError::DuplicateTrade { date: day });
            }
        }

        let date = record.date.to_rfc3339();
        let kind = record.kind.as_str();
        let (entries, wins, losses) = (
            count_to_sql(record.entries),
            count_to_sql(record.wins),
            count_to_sql(record.losses),
        );
        let params: &[&(dyn ToSql + Sync)] = &[
            &record.id,
            &date,
            &record.return_value,
            &kind,
            &entries,
            &wins,
            &losses,
            &day,
        ];
        let changed = tx
            .execute(
                "UPDATE tradeflow_records
                 SET date = $2, return_value = $3, kind = $4, entries = $5, wins = $6,
                     losses = $7, trade_day = $8
                 WHERE id = $1",
                params,
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(TradeflowError::RecordNotFound {
                id: record.id.clone(),
            });
        }

        tx.commit().map_err(query_err)
    }

    fn delete_record(&self, id: &str) -> Result<(), TradeflowError> {
        let mut client = self.conn()?;
        let changed = client
            .execute("DELETE FROM tradeflow_records WHERE id = $1", &[&id])
            .map_err(query_err)?;
        if changed == 0 {
            return Err(TradeflowError::RecordNotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn reset(&self) -> Result<(), TradeflowError> {
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;
        tx.batch_execute("DELETE FROM tradeflow_records; DELETE FROM tradeflow_settings;")
            .map_err(query_err)?;
        tx.commit().map_err(query_err)
    }
}
