//! Delimited point-file loading.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use nearest_stop::{GeoPoint, PointSet};

use crate::config::ColumnConfig;

/// One input row: its id and location.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub id: String,
    pub location: GeoPoint,
}

/// Load id/lon/lat records from a delimited file, gzip if it ends in `.gz`.
///
/// Rows whose coordinates do not parse to finite numbers are skipped with a warning.
pub fn load_points(path: &Path, columns: &ColumnConfig) -> Result<Vec<PointRecord>> {
    info!("Loading points from {}", path.display());

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let delimiter = u8::try_from(columns.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .context("Delimiter must be a single ASCII character")?;

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("Column '{}' not found in {}", name, path.display()))
    };
    let id_idx = find(&columns.id)?;
    let lon_idx = find(&columns.lon)?;
    let lat_idx = find(&columns.lat)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in csv_reader.records().enumerate() {
        let record = result?;
        let coords = (
            record.get(lon_idx).map(|v| v.trim().parse::<f64>()),
            record.get(lat_idx).map(|v| v.trim().parse::<f64>()),
        );

        match coords {
            (Some(Ok(lon)), Some(Ok(lat))) if lon.is_finite() && lat.is_finite() => {
                records.push(PointRecord {
                    id: record.get(id_idx).unwrap_or_default().to_string(),
                    location: GeoPoint::new(lon, lat),
                })
            }
            _ => {
                // +2: header row and 1-based numbering
                warn!("Skipping row {} of {}: bad coordinates", line + 2, path.display());
                skipped += 1;
            }
        }
    }

    info!(
        "Loaded {} points from {} ({} skipped)",
        records.len(),
        path.display(),
        skipped
    );
    Ok(records)
}

/// Locations of `records`, in order.
pub fn to_point_set(records: &[PointRecord]) -> PointSet {
    records.iter().map(|r| r.location).collect()
}
