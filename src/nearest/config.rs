use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use nearest_stop::MatcherConfig;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub matcher: MatcherConfig,
    pub columns: ColumnConfig,
}

/// Where to find the id and coordinates in the input files.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: String,
    pub lon: String,
    pub lat: String,
    pub delimiter: char,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            lon: "lon".to_string(),
            lat: "lat".to_string(),
            delimiter: ',',
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearest_stop::IndexKind;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[matcher]
index = "brute_force"
parallel = false

[columns]
id = "stop_id"
lon = "stop_lon"
lat = "stop_lat"
delimiter = ";"
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.matcher.index, IndexKind::BruteForce);
        assert!(!config.matcher.parallel);
        assert_eq!(config.columns.id, "stop_id");
        assert_eq!(config.columns.delimiter, ';');
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.matcher, MatcherConfig::default());
        assert_eq!(config.columns.lat, "lat");
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load_from_file("/nonexistent/matcher.toml").is_err());
    }
}
