//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// Configuration with no keys set; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::TradeflowError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[storage]
backend = sqlite
path = data/database.json

[sqlite]
path = /var/lib/tradeflow/journal.db
pool_size = 8

[web]
listen = 0.0.0.0:8080
"#;

    #[test]
    fn reads_storage_and_web_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("storage", "backend"), Some("sqlite".to_string()));
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/var/lib/tradeflow/journal.db".to_string())
        );
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 8);
        assert_eq!(adapter.get_string("web", "listen"), Some("0.0.0.0:8080".to_string()));
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string("[storage]\n").unwrap();
        assert_eq!(adapter.get_string("storage", "backend"), None);
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 4);
        assert_eq!(adapter.get_string("web", "listen"), None);
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter = FileConfigAdapter::from_string("[sqlite]\npool_size = lots\n").unwrap();
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 4);
    }

    #[test]
    fn section_names_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[Storage]\nBackend = json\n").unwrap();
        assert_eq!(adapter.get_string("storage", "backend"), Some("json".to_string()));
    }

    #[test]
    fn require_string_reports_missing_key() {
        let adapter = FileConfigAdapter::from_string("[sqlite]\npath =\n").unwrap();
        match adapter.require_string("sqlite", "path") {
            Err(TradeflowError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_has_no_keys() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("storage", "backend"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[storage]\nbackend = memory\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("storage", "backend"), Some("memory".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        assert!(FileConfigAdapter::from_file("/nonexistent/path/tradeflow.ini").is_err());
    }
}
