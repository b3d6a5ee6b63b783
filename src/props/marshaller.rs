//! Typed property marshallers.
//!
//! A marshaller moves one named property between the archive and the host
//! store. It owns a working buffer in host precision (`f64` scalars or
//! `DVec3` vectors) and a validity flag. Archived kind `T` only matters at
//! the archive boundary, where values are widened with [`HostScalar::to_host`]
//! and narrowed with [`HostScalar::from_host`].

use std::fmt;
use std::marker::PhantomData;

use crate::archive::{ArraySample, PointsSink, PointsSource};
use crate::core::{Cardinality, MetaData, PropertyHeader};
use crate::store::{AttributeArray, AttributeKind, AttributeStore};
use crate::util::{DVec3, DataType, Error, HostScalar, Result};

/// Moves one named property between archive and host store.
pub trait PropertyMarshaller: fmt::Debug {
    /// Property name, identical on both sides.
    fn name(&self) -> &str;

    /// Archived element type.
    fn data_type(&self) -> DataType;

    /// False when the last read failed. Invalid buffers write back as zeros.
    fn is_valid(&self) -> bool;

    /// Current buffer in host form.
    fn host_values(&self) -> AttributeArray;

    /// Register the property on the host store. Idempotent.
    fn declare(&self, store: &mut dyn AttributeStore) -> Result<()>;

    /// Load sample `index`, broadcasting size-1 samples to `element_count`.
    ///
    /// On error the marshaller is invalid and the buffer is left untouched.
    fn read_from_archive(
        &mut self,
        source: &dyn PointsSource,
        index: usize,
        element_count: usize,
    ) -> Result<()>;

    /// Load the live per-element values from the store.
    ///
    /// On error the marshaller is invalid and the buffer is left untouched.
    fn read_from_store(&mut self, store: &dyn AttributeStore) -> Result<()>;

    /// Write the buffer to the store, or zeros when invalid.
    fn write_to_store(&self, store: &mut dyn AttributeStore) -> Result<()>;

    /// Append the buffer as a new archived sample. Invalid buffers append
    /// an empty sample so sample indices stay aligned with the schema.
    fn append_to_archive(&self, sink: &mut dyn PointsSink) -> Result<()>;
}

/// Fetch sample `index` of `name` as flat components of `T`.
fn archived_components<T: HostScalar>(
    source: &dyn PointsSource,
    name: &str,
    data_type: DataType,
    index: usize,
    element_count: usize,
) -> Result<(Vec<T>, Cardinality)> {
    let property = source
        .property(name)
        .ok_or_else(|| Error::PropertyNotFound(name.to_string()))?;
    if property.num_samples() == 0 {
        return Err(Error::NoSamples(name.to_string()));
    }
    if property.data_type() != data_type {
        return Err(Error::TypeMismatch {
            name: name.to_string(),
            expected: data_type,
            actual: property.data_type(),
        });
    }

    let sample = property.sample(index)?;
    let cardinality = Cardinality::classify(sample.len(), element_count).ok_or_else(|| {
        Error::ElementCountMismatch {
            name: name.to_string(),
            expected: element_count,
            actual: sample.len(),
        }
    })?;
    let components = sample.decode_components::<T>(data_type.extent as usize)?;
    Ok((components, cardinality))
}

fn append_components<T: HostScalar>(
    sink: &mut dyn PointsSink,
    name: &str,
    data_type: DataType,
    components: &[T],
) -> Result<()> {
    let sample = ArraySample::from_components(components, data_type.extent as usize)
        .ok_or_else(|| Error::invalid(format!("{name}: partial element in buffer")))?;
    let header = PropertyHeader::array(name, data_type)
        .with_meta_data(MetaData::new().with(MetaData::GEO_SCOPE_KEY, "var"));
    sink.property_mut(header)?.push(sample)?;
    Ok(())
}

/// Scalar (extent 1) property, host doubles.
pub struct SingleValue<T> {
    name: String,
    values: Vec<f64>,
    valid: bool,
    _kind: PhantomData<T>,
}

impl<T: HostScalar> SingleValue<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Vec::new(),
            valid: false,
            _kind: PhantomData,
        }
    }
}

impl<T: HostScalar> fmt::Debug for SingleValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleValue")
            .field("name", &self.name)
            .field("data_type", &self.data_type())
            .field("valid", &self.valid)
            .field("len", &self.values.len())
            .finish()
    }
}

impl<T: HostScalar> PropertyMarshaller for SingleValue<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn data_type(&self) -> DataType {
        DataType::scalar(T::POD_TYPE)
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn host_values(&self) -> AttributeArray {
        AttributeArray::Double(self.values.clone())
    }

    fn declare(&self, store: &mut dyn AttributeStore) -> Result<()> {
        store.declare_attribute(&self.name, self.data_type())
    }

    fn read_from_archive(
        &mut self,
        source: &dyn PointsSource,
        index: usize,
        element_count: usize,
    ) -> Result<()> {
        self.valid = false;
        let (values, cardinality) =
            archived_components::<T>(source, &self.name, self.data_type(), index, element_count)?;
        self.values = (0..element_count)
            .map(|i| values[cardinality.index(i)].to_host())
            .collect();
        self.valid = true;
        Ok(())
    }

    fn read_from_store(&mut self, store: &dyn AttributeStore) -> Result<()> {
        self.valid = false;
        self.values = store.get_attribute(&self.name)?.into_doubles(&self.name)?;
        self.valid = true;
        Ok(())
    }

    fn write_to_store(&self, store: &mut dyn AttributeStore) -> Result<()> {
        let values = if self.valid {
            AttributeArray::Double(self.values.clone())
        } else {
            AttributeArray::zeroed(AttributeKind::Double, store.element_count())
        };
        store.set_attribute(&self.name, values)
    }

    fn append_to_archive(&self, sink: &mut dyn PointsSink) -> Result<()> {
        let components: Vec<T> = if self.valid {
            self.values.iter().map(|&v| T::from_host(v)).collect()
        } else {
            Vec::new()
        };
        append_components(sink, &self.name, self.data_type(), &components)
    }
}

/// Vector property with `N` components (2 or 3), host `DVec3`.
///
/// Two-component values keep z at zero on the host side.
pub struct VectorValue<T, const N: usize> {
    name: String,
    values: Vec<DVec3>,
    valid: bool,
    _kind: PhantomData<T>,
}

/// Two-component vector property.
pub type PairValue<T> = VectorValue<T, 2>;

/// Three-component vector property.
pub type TripleValue<T> = VectorValue<T, 3>;

impl<T: HostScalar, const N: usize> VectorValue<T, N> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Vec::new(),
            valid: false,
            _kind: PhantomData,
        }
    }

    fn to_vector(element: &[T]) -> DVec3 {
        let z = if N > 2 { element[2].to_host() } else { 0.0 };
        DVec3::new(element[0].to_host(), element[1].to_host(), z)
    }
}

impl<T: HostScalar, const N: usize> fmt::Debug for VectorValue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorValue")
            .field("name", &self.name)
            .field("data_type", &self.data_type())
            .field("valid", &self.valid)
            .field("len", &self.values.len())
            .finish()
    }
}

impl<T: HostScalar, const N: usize> PropertyMarshaller for VectorValue<T, N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn data_type(&self) -> DataType {
        DataType::new(T::POD_TYPE, N as u8)
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn host_values(&self) -> AttributeArray {
        AttributeArray::Vector(self.values.clone())
    }

    fn declare(&self, store: &mut dyn AttributeStore) -> Result<()> {
        store.declare_attribute(&self.name, self.data_type())
    }

    fn read_from_archive(
        &mut self,
        source: &dyn PointsSource,
        index: usize,
        element_count: usize,
    ) -> Result<()> {
        self.valid = false;
        let (components, cardinality) =
            archived_components::<T>(source, &self.name, self.data_type(), index, element_count)?;
        let elements: Vec<DVec3> = components.chunks_exact(N).map(Self::to_vector).collect();
        self.values = (0..element_count)
            .map(|i| elements[cardinality.index(i)])
            .collect();
        self.valid = true;
        Ok(())
    }

    fn read_from_store(&mut self, store: &dyn AttributeStore) -> Result<()> {
        self.valid = false;
        self.values = store.get_attribute(&self.name)?.into_vectors(&self.name)?;
        self.valid = true;
        Ok(())
    }

    fn write_to_store(&self, store: &mut dyn AttributeStore) -> Result<()> {
        let values = if self.valid {
            AttributeArray::Vector(self.values.clone())
        } else {
            AttributeArray::zeroed(AttributeKind::Vector, store.element_count())
        };
        store.set_attribute(&self.name, values)
    }

    fn append_to_archive(&self, sink: &mut dyn PointsSink) -> Result<()> {
        let mut components = Vec::with_capacity(if self.valid { self.values.len() * N } else { 0 });
        if self.valid {
            for v in &self.values {
                components.extend(v.to_array().into_iter().take(N).map(T::from_host));
            }
        }
        append_components(sink, &self.name, self.data_type(), &components)
    }
}
