//! Array property storage.
//!
//! Each property keeps its samples as raw little-endian POD bytes plus an
//! element count, the same columnar layout an Ogawa array property uses on
//! disk. String properties keep owned strings instead.

use bytemuck::{AnyBitPattern, NoUninit};

use crate::core::PropertyHeader;
use crate::util::{DataType, Error, Result};

/// Sample payload.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    /// Packed POD elements.
    Pod(Vec<u8>),
    /// String elements.
    Strings(Vec<String>),
}

/// One archived array sample.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySample {
    data: SampleData,
    len: usize,
}

impl ArraySample {
    /// Pack typed elements. `T` is a whole element, e.g. `[f32; 2]` for extent 2.
    pub fn from_pod<T: NoUninit>(values: &[T]) -> Self {
        Self {
            data: SampleData::Pod(bytemuck::cast_slice(values).to_vec()),
            len: values.len(),
        }
    }

    /// Pack flat components, `extent` per element.
    ///
    /// Returns None when the component count is not a whole number of elements.
    pub fn from_components<T: NoUninit>(components: &[T], extent: usize) -> Option<Self> {
        if extent == 0 || components.len() % extent != 0 {
            return None;
        }
        Some(Self {
            data: SampleData::Pod(bytemuck::cast_slice(components).to_vec()),
            len: components.len() / extent,
        })
    }

    /// Wrap string elements.
    pub fn from_strings(values: Vec<String>) -> Self {
        let len = values.len();
        Self { data: SampleData::Strings(values), len }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw payload.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Decode into whole elements of type `T`.
    pub fn decode<T: AnyBitPattern + NoUninit>(&self) -> Result<Vec<T>> {
        let SampleData::Pod(bytes) = &self.data else {
            return Err(Error::invalid("string sample decoded as POD"));
        };
        let expected = self.len * std::mem::size_of::<T>();
        if bytes.len() != expected {
            return Err(Error::invalid(format!(
                "{} bytes do not hold {} elements of {} bytes",
                bytes.len(),
                self.len,
                std::mem::size_of::<T>()
            )));
        }
        Ok(bytemuck::allocation::pod_collect_to_vec(bytes))
    }

    /// Decode into flat components, `extent` per element.
    pub fn decode_components<T: AnyBitPattern + NoUninit>(&self, extent: usize) -> Result<Vec<T>> {
        let SampleData::Pod(bytes) = &self.data else {
            return Err(Error::invalid("string sample decoded as POD"));
        };
        let expected = self.len * extent * std::mem::size_of::<T>();
        if bytes.len() != expected {
            return Err(Error::invalid(format!(
                "{} bytes do not hold {} elements of {} components",
                bytes.len(),
                self.len,
                extent
            )));
        }
        Ok(bytemuck::allocation::pod_collect_to_vec(bytes))
    }

    /// String elements, if this is a string sample.
    pub fn strings(&self) -> Option<&[String]> {
        match &self.data {
            SampleData::Strings(values) => Some(values),
            SampleData::Pod(_) => None,
        }
    }

    fn matches(&self, data_type: DataType) -> bool {
        match &self.data {
            SampleData::Pod(bytes) => {
                !data_type.pod.is_string() && bytes.len() == self.len * data_type.num_bytes()
            }
            SampleData::Strings(_) => data_type.pod.is_string(),
        }
    }
}

/// A named, typed, time-sampled array property.
#[derive(Clone, Debug)]
pub struct ArrayProperty {
    header: PropertyHeader,
    samples: Vec<ArraySample>,
}

impl ArrayProperty {
    /// Create an empty property.
    pub fn new(header: PropertyHeader) -> Self {
        Self { header, samples: Vec::new() }
    }

    pub fn header(&self) -> &PropertyHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    /// Get number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Sample at `index`.
    pub fn sample(&self, index: usize) -> Result<&ArraySample> {
        self.samples.get(index).ok_or(Error::SampleOutOfBounds {
            index,
            count: self.samples.len(),
        })
    }

    /// Last recorded sample.
    pub fn last_sample(&self) -> Option<&ArraySample> {
        self.samples.last()
    }

    /// Append a sample. Its element layout must match the header.
    pub fn push(&mut self, sample: ArraySample) -> Result<usize> {
        if !sample.matches(self.header.data_type) {
            return Err(Error::invalid(format!(
                "sample for {} does not match {}",
                self.header.name, self.header.data_type
            )));
        }
        self.samples.push(sample);
        Ok(self.samples.len() - 1)
    }

    /// Pack and append typed elements.
    pub fn push_pod<T: NoUninit>(&mut self, values: &[T]) -> Result<usize> {
        self.push(ArraySample::from_pod(values))
    }
}
