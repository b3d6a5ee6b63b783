//! Core layer - time sampling, headers and sample addressing.
//!
//! This module provides:
//! - [`TimeSampling`] - Sample index to time mapping
//! - [`MetaData`] - Key-value metadata storage
//! - [`PropertyHeader`] - Name, kind and extent of a named property
//! - [`SampleTimeResolver`] - Query time to bracketing samples plus alpha

mod time_sampling;
mod metadata;
mod header;
mod sample;

pub use time_sampling::{TimeSampling, TimeSamplingType};
pub use metadata::MetaData;
pub use header::{PropertyHeader, PropertyType};
pub use sample::{resolve_sample_info, Cardinality, Resolved, SampleTimeResolver, TimeSampleInfo};
