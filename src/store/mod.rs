//! Host attribute store side.
//!
//! The live simulation keeps one row per element and one column per named
//! attribute. Columns use host-native storage: 32-bit ints for ids, doubles
//! for scalars and double vectors for 2/3-component channels.

mod particles;

pub use particles::ParticleStore;

use crate::util::{DMat4, DVec3, DataType, Error, Result};

/// Names of the fixed per-element channels the host always understands.
pub mod channel {
    pub const ID: &str = "particleId";
    pub const POSITION: &str = "position";
    pub const VELOCITY: &str = "velocity";
    pub const RADIUS: &str = "radiusPP";
    pub const AGE: &str = "agePP";
    pub const MASS: &str = "massPP";
    pub const RGB: &str = "rgbPP";
    pub const OPACITY: &str = "opacityPP";
    pub const SHAPE_INSTANCE_ID: &str = "shapeInstanceIdPP";
    pub const ORIENTATION: &str = "orientationPP";

    /// Every fixed channel. Generic discovery skips these.
    pub const ALL: [&str; 10] = [
        ID,
        POSITION,
        VELOCITY,
        RADIUS,
        AGE,
        MASS,
        RGB,
        OPACITY,
        SHAPE_INSTANCE_ID,
        ORIENTATION,
    ];

    /// True for fixed channel names.
    pub fn is_fixed(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Host storage kind of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Int,
    Double,
    Vector,
}

impl AttributeKind {
    /// Storage used for a declared data type: scalars become doubles,
    /// 2 and 3 component channels become vectors.
    pub fn for_data_type(data_type: DataType) -> Self {
        if data_type.extent <= 1 {
            Self::Double
        } else {
            Self::Vector
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "intArray",
            Self::Double => "doubleArray",
            Self::Vector => "vectorArray",
        }
    }
}

/// One column of per-element values.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeArray {
    Int(Vec<i32>),
    Double(Vec<f64>),
    Vector(Vec<DVec3>),
}

impl AttributeArray {
    /// Column of `len` zero values.
    pub fn zeroed(kind: AttributeKind, len: usize) -> Self {
        match kind {
            AttributeKind::Int => Self::Int(vec![0; len]),
            AttributeKind::Double => Self::Double(vec![0.0; len]),
            AttributeKind::Vector => Self::Vector(vec![DVec3::ZERO; len]),
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Int(_) => AttributeKind::Int,
            Self::Double(_) => AttributeKind::Double,
            Self::Vector(_) => AttributeKind::Vector,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate or zero-extend to `len`.
    pub fn resize(&mut self, len: usize) {
        match self {
            Self::Int(v) => v.resize(len, 0),
            Self::Double(v) => v.resize(len, 0.0),
            Self::Vector(v) => v.resize(len, DVec3::ZERO),
        }
    }

    /// Scalar view. Int columns widen to doubles.
    pub fn into_doubles(self, name: &str) -> Result<Vec<f64>> {
        match self {
            Self::Double(v) => Ok(v),
            Self::Int(v) => Ok(v.into_iter().map(f64::from).collect()),
            Self::Vector(_) => Err(kind_error(name, AttributeKind::Double, AttributeKind::Vector)),
        }
    }

    /// Vector view.
    pub fn into_vectors(self, name: &str) -> Result<Vec<DVec3>> {
        match self {
            Self::Vector(v) => Ok(v),
            other => Err(kind_error(name, AttributeKind::Vector, other.kind())),
        }
    }
}

fn kind_error(name: &str, expected: AttributeKind, actual: AttributeKind) -> Error {
    Error::AttributeType {
        name: name.to_string(),
        expected: expected.name(),
        actual: actual.name(),
    }
}

/// Declared attribute: name, archive-facing data type and host storage.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub data_type: DataType,
    pub kind: AttributeKind,
}

impl AttributeInfo {
    /// Attribute stored the default way for its data type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            kind: AttributeKind::for_data_type(data_type),
        }
    }

    /// Attribute with explicit storage.
    pub fn with_kind(name: impl Into<String>, data_type: DataType, kind: AttributeKind) -> Self {
        Self { name: name.into(), data_type, kind }
    }
}

/// Live per-element attribute store of one simulated object.
pub trait AttributeStore {
    /// Register a per-element attribute. Declaring an existing attribute
    /// with the same storage kind is a no-op.
    fn declare_attribute(&mut self, name: &str, data_type: DataType) -> Result<()>;

    /// Every declared attribute, in declaration order.
    fn attributes(&self) -> Vec<AttributeInfo>;

    /// Check whether `name` is declared.
    fn has_attribute(&self, name: &str) -> bool {
        self.attributes().iter().any(|a| a.name == name)
    }

    /// Copy of the current column values.
    fn get_attribute(&self, name: &str) -> Result<AttributeArray>;

    /// Replace a column. Length must equal the element count.
    fn set_attribute(&mut self, name: &str, values: AttributeArray) -> Result<()>;

    /// Number of live elements.
    fn element_count(&self) -> usize;

    /// Drop trailing elements (or emit new ones) until `count` remain.
    fn set_element_count(&mut self, count: usize) -> Result<()>;

    /// Append `count` default-constructed elements.
    fn emit_elements(&mut self, count: usize) -> Result<()>;

    /// Accumulated world transform of the object owning the elements.
    fn world_matrix(&self) -> DMat4 {
        DMat4::IDENTITY
    }
}
