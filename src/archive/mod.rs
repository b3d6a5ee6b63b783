//! Columnar, time-sampled archive side.
//!
//! The engine talks to archived objects through two seams:
//! - [`PointsSource`] - read samples and named properties (import)
//! - [`PointsSink`] - append samples and property values (export)
//!
//! [`PointsObject`] implements both in memory with Ogawa's property layout,
//! and [`Archive`] resolves object identifiers to Points objects.

mod property;
mod points;

pub use property::{ArraySample, ArrayProperty, SampleData};
pub use points::{PointsObject, PointsSample, EMPTY_SENTINEL_ID, POINTS_SCHEMA};

use crate::core::{PropertyHeader, TimeSampling};
use crate::util::{Chrono, Error, Result};

/// Names of the fixed side channels in a Points object's generic property
/// compound. Existing archives depend on them byte for byte.
pub mod channel {
    pub const COLOR: &str = ".color";
    pub const AGE: &str = ".age";
    pub const MASS: &str = ".mass";
    pub const SHAPE_INSTANCE_ID: &str = ".shapeinstanceid";
    pub const ORIENTATION: &str = ".orientation";
    pub const ANGULAR_VELOCITY: &str = ".angularvelocity";
    pub const INSTANCE_NAMES: &str = ".instancenames";
    pub const SCALE: &str = ".scale";
    pub const SHAPE_TYPE: &str = ".shapetype";

    /// Every reserved name. Generic discovery skips these.
    pub const RESERVED: [&str; 9] = [
        COLOR,
        AGE,
        MASS,
        SHAPE_INSTANCE_ID,
        ORIENTATION,
        ANGULAR_VELOCITY,
        INSTANCE_NAMES,
        SCALE,
        SHAPE_TYPE,
    ];

    /// True for reserved side-channel names.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED.contains(&name)
    }
}

/// Read access to one archived Points object.
pub trait PointsSource {
    /// Object name.
    fn name(&self) -> &str;

    /// Mapping from sample index to time.
    fn time_sampling(&self) -> &TimeSampling;

    /// Number of archived samples.
    fn num_samples(&self) -> usize;

    /// Fixed channels (positions, ids, velocities, widths, bounds) at `index`.
    fn get_sample(&self, index: usize) -> Result<PointsSample>;

    /// Headers of every property in the generic property compound.
    fn property_headers(&self) -> Vec<&PropertyHeader>;

    /// Property by name from the generic property compound.
    fn property(&self, name: &str) -> Option<&ArrayProperty>;
}

/// Write access to one archived Points object.
pub trait PointsSink {
    /// Append the fixed channels of one frame recorded at `time`.
    /// Returns the new sample index.
    fn append_sample(&mut self, time: Chrono, sample: &PointsSample) -> Result<usize>;

    /// Get or create a generic property. An existing property must carry the
    /// same data type and shape.
    fn property_mut(&mut self, header: PropertyHeader) -> Result<&mut ArrayProperty>;
}

/// An archived object with a schema other than Points.
#[derive(Clone, Debug)]
pub struct ForeignObject {
    pub name: String,
    pub schema: String,
}

#[derive(Debug)]
enum ArchivedObject {
    Points(PointsObject),
    Foreign(ForeignObject),
}

impl ArchivedObject {
    fn name(&self) -> &str {
        match self {
            Self::Points(points) => points.name(),
            Self::Foreign(other) => &other.name,
        }
    }
}

/// In-memory archive: a flat set of named objects.
#[derive(Debug, Default)]
pub struct Archive {
    name: String,
    objects: Vec<ArchivedObject>,
}

impl Archive {
    /// Create an empty archive.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), objects: Vec::new() }
    }

    /// Get the archive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a Points object, replacing any object of the same name.
    pub fn add_points(&mut self, points: PointsObject) {
        self.insert(ArchivedObject::Points(points));
    }

    /// Add a placeholder for an object of another schema.
    pub fn add_foreign(&mut self, name: &str, schema: &str) {
        self.insert(ArchivedObject::Foreign(ForeignObject {
            name: normalize_identifier(name).to_string(),
            schema: schema.to_string(),
        }));
    }

    /// Names of all objects.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(ArchivedObject::name)
    }

    /// Resolve `identifier` to a Points object.
    pub fn points(&self, identifier: &str) -> Result<&PointsObject> {
        match self.find(identifier)? {
            ArchivedObject::Points(points) => Ok(points),
            ArchivedObject::Foreign(other) => Err(schema_mismatch(other)),
        }
    }

    /// Resolve `identifier` to a mutable Points object.
    pub fn points_mut(&mut self, identifier: &str) -> Result<&mut PointsObject> {
        let key = normalize_identifier(identifier);
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.name() == key)
            .ok_or_else(|| Error::ObjectNotFound(identifier.to_string()))?;
        match object {
            ArchivedObject::Points(points) => Ok(points),
            ArchivedObject::Foreign(other) => Err(schema_mismatch(other)),
        }
    }

    fn find(&self, identifier: &str) -> Result<&ArchivedObject> {
        let key = normalize_identifier(identifier);
        self.objects
            .iter()
            .find(|o| o.name() == key)
            .ok_or_else(|| Error::ObjectNotFound(identifier.to_string()))
    }

    fn insert(&mut self, object: ArchivedObject) {
        match self.objects.iter_mut().find(|o| o.name() == object.name()) {
            Some(slot) => *slot = object,
            None => self.objects.push(object),
        }
    }
}

fn normalize_identifier(identifier: &str) -> &str {
    identifier.trim_start_matches('/')
}

fn schema_mismatch(other: &ForeignObject) -> Error {
    Error::SchemaMismatch {
        object: other.name.clone(),
        expected: POINTS_SCHEMA.to_string(),
        actual: other.schema.clone(),
    }
}
