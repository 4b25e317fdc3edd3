//! Record export port trait.

use std::io::Write;
use std::path::Path;

use crate::domain::error::TradeflowError;
use crate::domain::record::DailyRecord;

/// Port for writing the record history in an interchange format.
pub trait ExportPort {
    fn write_to(&self, records: &[DailyRecord], out: &mut dyn Write) -> Result<(), TradeflowError>;

    /// Default implementation: creates the file and delegates to `write_to`.
    fn write_file(&self, records: &[DailyRecord], path: &Path) -> Result<(), TradeflowError> {
        let mut file = std::fs::File::create(path)?;
        self.write_to(records, &mut file)?;
        file.flush()?;
        Ok(())
    }
}
