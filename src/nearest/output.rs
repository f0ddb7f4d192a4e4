//! Writing joined query/candidate rows.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

use nearest_stop::join::Joined;

use crate::records::PointRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// One query record with one of its nearest candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow<'a> {
    pub query_id: &'a str,
    pub lon: f64,
    pub lat: f64,
    /// 1 for the closest candidate
    pub rank: usize,
    pub candidate_id: &'a str,
    pub candidate_lon: f64,
    pub candidate_lat: f64,
    pub distance_m: f64,
}

impl<'a> OutputRow<'a> {
    pub fn new(
        query: &'a PointRecord,
        candidate: &'a PointRecord,
        rank: usize,
        distance_m: f64,
    ) -> Self {
        Self {
            query_id: &query.id,
            lon: query.location.lon,
            lat: query.location.lat,
            rank,
            candidate_id: &candidate.id,
            candidate_lon: candidate.location.lon,
            candidate_lat: candidate.location.lat,
            distance_m,
        }
    }

    pub fn from_joined(joined: &Joined<'a, PointRecord, PointRecord>) -> Self {
        Self::new(
            joined.query,
            joined.candidate,
            1,
            joined.distance_m.unwrap_or(f64::NAN),
        )
    }
}

pub fn write_rows<W: Write>(writer: W, rows: &[OutputRow<'_>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            for row in rows {
                csv_writer.serialize(row)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
