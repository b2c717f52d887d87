//! Error types for geoinv

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoinvError {
    // Resolution errors
    #[error("No valid data found for {date}")]
    NoDataFound { date: NaiveDate },

    #[error("No assets found for tile '{tile}' on {date}")]
    AssetNotFound { tile: String, date: NaiveDate },

    #[error("Tile '{tile}' rejected on {date}: {reason}")]
    TileRejected {
        tile: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("Could not parse asset filename '{name}': {reason}")]
    UnrecognizedAsset { name: String, reason: String },

    // Temporal errors
    #[error("Invalid date range '{input}': {reason}")]
    InvalidDateRange { input: String, reason: String },

    #[error("Invalid day-of-year range '{input}': {reason}")]
    InvalidDayRange { input: String, reason: String },

    // Product errors
    #[error("No products requested")]
    NoProductsRequested,

    #[error("Unknown product '{name}'. Available: {available}")]
    UnknownProduct { name: String, available: String },

    #[error("Tile '{tile}' has no '{product}' product")]
    MissingProduct { tile: String, product: String },

    // Assembly errors
    #[error("Projection of {path} ({found}) does not match {expected}; inputs must be warped")]
    ProjectionMismatch {
        expected: String,
        found: String,
        path: PathBuf,
    },

    #[error("Invalid region file {path}: {reason}")]
    InvalidRegion { path: PathBuf, reason: String },

    // Fetch errors
    #[error("Fetch failed: {reason}")]
    FetchFailed { reason: String },

    // Dataset errors
    #[error("Unknown dataset '{name}'. Available: {available}")]
    UnknownDataset { name: String, available: String },

    // Engine errors
    #[error("{tool} exited with status {status}: {stderr}")]
    EngineFailure {
        tool: String,
        status: i32,
        stderr: String,
    },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeoinvError>;
