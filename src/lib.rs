//! # Alembic Points
//!
//! Typed synchronization of particle data between a live, per-frame
//! attribute store and time-sampled Alembic Points archives.
//!
//! Fixed channels (ids, positions, velocities, widths, color, age, mass,
//! orientation) travel through dedicated typed paths. Every other per-element
//! attribute is discovered at runtime and moved by a marshaller picked from
//! its archived kind and extent.
//!
//! ## Modules
//!
//! - [`util`] - POD kinds, DataType, errors, math helpers, logging setup
//! - [`core`] - Time sampling, property headers, sample time resolution
//! - [`archive`] - Columnar Points objects and the archive seams
//! - [`store`] - Host attribute store seam and an in-memory particle store
//! - [`props`] - Type dispatch, marshallers, the generic property set
//! - [`points`] - Frame export/import, instancing, options
//!
//! ## Example
//!
//! ```ignore
//! use alembic_points::prelude::*;
//!
//! let mut points = PointsObject::new("particleShape1");
//! let mut exporter = PointsExporter::new(ExportOptions::default());
//! for (frame, store) in frames.iter().enumerate() {
//!     exporter.export_frame(frame as f64 / 24.0, store, None, &mut points)?;
//! }
//!
//! let mut importer = PointsImporter::new("particleShape1", ImportOptions::default());
//! let report = importer.import_frame(0.5, &points, &mut live_store)?;
//! ```

pub mod util;
pub mod core;
pub mod archive;
pub mod store;
pub mod props;
pub mod points;

// Re-export commonly used types
pub use util::{init_tracing, DataType, Error, PlainOldDataType, Result};
pub use points::{FrameReport, PointsExporter, PointsImporter};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{DataType, Error, PlainOldDataType, Result};
    pub use crate::core::{TimeSampleInfo, TimeSampling};
    pub use crate::archive::{Archive, PointsObject, PointsSample, PointsSink, PointsSource};
    pub use crate::store::{AttributeArray, AttributeStore, ParticleStore};
    pub use crate::props::PropertySetAdapter;
    pub use crate::points::{
        finalize_instancing, resolve_time, ExportOptions, FrameReport, ImportOptions,
        InstancingRegistry, PointsExporter, PointsImporter,
    };
}
