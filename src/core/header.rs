//! Property headers.
//!
//! A header carries everything about a named property except its samples:
//! name, shape (scalar or array), primitive kind and extent, metadata.

use crate::util::DataType;
use super::MetaData;

/// Header information for a property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyHeader {
    /// Name of this property, unique within its compound.
    pub name: String,
    /// Property type.
    pub property_type: PropertyType,
    /// Data type (POD + extent). Fixed for the lifetime of the property.
    pub data_type: DataType,
    /// Metadata.
    pub meta_data: MetaData,
}

impl PropertyHeader {
    /// Create a scalar property header.
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Scalar,
            data_type,
            meta_data: MetaData::new(),
        }
    }

    /// Create an array property header.
    pub fn array(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Array,
            data_type,
            meta_data: MetaData::new(),
        }
    }

    /// Set metadata.
    pub fn with_meta_data(mut self, meta_data: MetaData) -> Self {
        self.meta_data = meta_data;
        self
    }

    /// Check if this is a scalar property.
    pub fn is_scalar(&self) -> bool {
        self.property_type == PropertyType::Scalar
    }

    /// Check if this is an array property.
    pub fn is_array(&self) -> bool {
        self.property_type == PropertyType::Array
    }
}

/// Type of property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// Single value per sample.
    Scalar,
    /// Array of values per sample.
    #[default]
    Array,
}
