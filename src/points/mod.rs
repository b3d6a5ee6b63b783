//! Points sample codec: per-frame export and import of particle data.
//!
//! - [`PointsExporter`] - store state to one archived sample per frame
//! - [`PointsImporter`] - archived samples back into the store, with
//!   velocity extrapolation and orientation integration
//! - [`instancing`] - instancer capture, rewire and the instancing registry
//! - [`config`] - export and import options

pub mod config;
pub mod instancing;
mod export;
mod import;

pub use config::{ExportOptions, Extrapolation, ImportOptions};
pub use export::PointsExporter;
pub use import::{resolve_time, PointsImporter};
pub use instancing::{
    build_instancer_rewire, finalize_instancing, pick_instancer, InstanceCorrelationTable,
    InstanceRecord, InstancerRewire, InstancerSource, InstancerState, InstancingRegistry, Release,
};

use tracing::warn;

/// Outcome of one export or import call.
///
/// Per-property and per-channel trouble never fails a frame; it lands here
/// instead, already logged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub warnings: Vec<String>,
    /// True when an import reused the previous result.
    pub cached: bool,
    /// Elements exported, or live elements after import.
    pub element_count: usize,
}

impl FrameReport {
    /// Log and record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Record warnings that were already logged.
    pub fn extend(&mut self, warnings: impl IntoIterator<Item = String>) {
        self.warnings.extend(warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
