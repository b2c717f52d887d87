//! Dataset drivers for geoinv
//!
//! Each driver supplies a [`geoinv_core::Dataset`] implementation: the
//! archive layout, filename parsing and product generation for one data
//! source. The registry maps dataset names to drivers and validates
//! their declarations up front.

pub mod aerosol;
pub mod climatology;
pub mod registry;

pub use aerosol::{AerosolDataset, AerosolRepository};
pub use climatology::{
    process_daily_lta, process_lta, process_lta_all, sample_aot, ClimatologyReport, DEFAULT_AOT,
};
pub use registry::{default_registry, DriverRegistry};
