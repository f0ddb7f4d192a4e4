//! Error types for nearest-neighbor matching.

use thiserror::Error;

/// Errors raised before any index is built or queried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// The candidate set has no points, so no index can be built.
    #[error("candidate set is empty; cannot build a spatial index")]
    EmptyCandidateSet,

    /// Requested neighbor count outside `1..=candidates`.
    #[error("invalid neighbor count k={k}: must be between 1 and {candidates}")]
    InvalidK { k: usize, candidates: usize },

    /// A raw input row did not hold exactly two coordinates.
    #[error("row {row} has {len} coordinates, expected 2 (lon, lat)")]
    DimensionMismatch { row: usize, len: usize },

    /// Coordinate outside [-180, 180] x [-90, 90]. Only raised when validation is enabled.
    #[error("point {index} is out of range: lon={lon}, lat={lat}")]
    CoordinateRange { index: usize, lon: f64, lat: f64 },

    /// NaN or infinite coordinate at this position of the input.
    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// A single lookup point that is non-finite, or out of range under validation.
    #[error("invalid lookup point: lon={lon}, lat={lat}")]
    InvalidLookupPoint { lon: f64, lat: f64 },

    /// Match results cannot be joined back onto a record list of a different length.
    #[error("cannot join {results} results onto {records} records")]
    LengthMismatch { results: usize, records: usize },
}

pub type Result<T> = std::result::Result<T, MatchError>;
