//! CSV export and import of the record history.

use crate::domain::error::TradeflowError;
use crate::domain::record::{DailyRecord, NewRecord, RecordKind};
use crate::ports::export_port::ExportPort;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// One CSV line. Column order is the header order.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(default)]
    id: String,
    date: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    kind: RecordKind,
    return_value: f64,
    entries: Option<u32>,
    wins: Option<u32>,
    losses: Option<u32>,
}

impl From<&DailyRecord> for CsvRow {
    fn from(r: &DailyRecord) -> Self {
        Self {
            id: r.id.clone(),
            date: r.date,
            kind: r.kind,
            return_value: r.return_value,
            entries: r.entries,
            wins: r.wins,
            losses: r.losses,
        }
    }
}

fn csv_err(e: csv::Error) -> TradeflowError {
    TradeflowError::Storage {
        reason: format!("CSV error: {e}"),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvAdapter;

impl CsvAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse records written by [`ExportPort::write_to`]. Rows without an id get a fresh one.
    pub fn read_from(&self, input: impl Read) -> Result<Vec<DailyRecord>, TradeflowError> {
        let mut rdr = csv::Reader::from_reader(input);
        let mut records = Vec::new();

        for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| {
                if e.is_io_error() {
                    csv_err(e)
                } else {
                    TradeflowError::invalid_record(format!("row {}: {e}", line + 1))
                }
            })?;
            let record = NewRecord {
                id: Some(row.id),
                date: row.date,
                return_value: row.return_value,
                kind: row.kind,
                entries: row.entries,
                wins: row.wins,
                losses: row.losses,
            }
            .into_record()
            .map_err(|e| TradeflowError::invalid_record(format!("row {}: {e}", line + 1)))?;
            records.push(record);
        }

        Ok(records)
    }
}

impl ExportPort for CsvAdapter {
    fn write_to(&self, records: &[DailyRecord], out: &mut dyn Write) -> Result<(), TradeflowError> {
        let mut wtr = csv::Writer::from_writer(out);
        for record in records {
            wtr.serialize(CsvRow::from(record)).map_err(csv_err)?;
        }
        // serialize() only writes the header with the first row
        if records.is_empty() {
            wtr.write_record([
                "id",
                "date",
                "type",
                "return_value",
                "entries",
                "wins",
                "losses",
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{BankOperation, BankOperationKind};
    use tempfile::TempDir;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn sample() -> Vec<DailyRecord> {
        let mut trade = NewRecord::trade(ts("2024-05-01T10:00:00-03:00"), -12.5, 4, 1, 3);
        trade.id = Some("t1".into());
        let deposit = BankOperation {
            kind: BankOperationKind::Deposit,
            value: 100.0,
        }
        .into_record(ts("2024-05-02T09:00:00Z"))
        .unwrap();
        vec![trade.into_record().unwrap(), deposit]
    }

    fn export(records: &[DailyRecord]) -> String {
        let mut buf = Vec::new();
        CsvAdapter::new().write_to(records, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn export_writes_header_and_rows() {
        let text = export(&sample());
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,date,type,return_value,entries,wins,losses"
        );
        assert_eq!(
            lines.next().unwrap(),
            "t1,2024-05-01T10:00:00-03:00,trade,-12.5,4,1,3"
        );
        let deposit = lines.next().unwrap();
        assert!(deposit.ends_with(",deposit,100.0,,,"), "got {deposit}");
        assert!(lines.next().is_none());
    }

    #[test]
    fn export_of_nothing_is_just_a_header() {
        assert_eq!(export(&[]), "id,date,type,return_value,entries,wins,losses\n");
    }

    #[test]
    fn import_reads_exported_file() {
        let records = sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        CsvAdapter::new().write_file(&records, &path).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let imported = CsvAdapter::new().read_from(file).unwrap();
        assert_eq!(imported, records);
    }

    #[test]
    fn import_assigns_missing_ids() {
        let text = "id,date,type,return_value,entries,wins,losses\n\
                    ,2024-05-01T10:00:00Z,trade,5,1,1,0\n";
        let imported = CsvAdapter::new().read_from(text.as_bytes()).unwrap();
        assert_eq!(imported.len(), 1);
        assert!(!imported[0].id.is_empty());
    }

    #[test]
    fn import_rejects_invalid_rows() {
        let text = "id,date,type,return_value,entries,wins,losses\n\
                    a,2024-05-01T10:00:00Z,withdrawal,5,,,\n";
        let err = CsvAdapter::new().read_from(text.as_bytes()).unwrap_err();
        match err {
            TradeflowError::InvalidRecord { reason } => assert!(reason.starts_with("row 1")),
            other => panic!("expected InvalidRecord, got {other}"),
        }
    }

    #[test]
    fn import_reports_malformed_rows_as_invalid() {
        let text = "id,date,type,return_value,entries,wins,losses\n\
                    a,2024-05-01T10:00:00Z,trade,5,1,1,0\n\
                    b,2024-05-02,trade,5,1,1,0\n";
        match CsvAdapter::new().read_from(text.as_bytes()).unwrap_err() {
            TradeflowError::InvalidRecord { reason } => assert!(reason.starts_with("row 2")),
            other => panic!("expected InvalidRecord, got {other}"),
        }

        let text = "id,date,type,return_value,entries,wins,losses\n\
                    a,2024-05-01T10:00:00Z,transfer,5,,,\n";
        assert!(matches!(
            CsvAdapter::new().read_from(text.as_bytes()),
            Err(TradeflowError::InvalidRecord { .. })
        ));
    }
}
