//! Utility types and functions shared by the points engine.
//!
//! This module contains fundamental types used throughout the library:
//! - [`PlainOldDataType`] - Enum of archived primitive kinds
//! - [`DataType`] - POD + extent (components per element)
//! - [`HostScalar`] - Conversion between archived PODs and host doubles
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus quaternion/bounds helpers

mod pod;
mod data_type;
mod error;
mod math;
mod trace;

pub use pod::*;
pub use data_type::*;
pub use error::*;
pub use math::*;
pub use trace::init_tracing;
