//! Property type dispatch.
//!
//! Maps a property's [`DataType`] (primitive kind plus extent) to the one
//! marshaller shape able to carry it, or to an explicit rejection. The table
//! is total: every `(kind, extent)` pair lands on exactly one of the two.

use half::f16;
use thiserror::Error;

use crate::util::{Bool, DataType, HostScalar, PlainOldDataType};

use super::marshaller::{PairValue, PropertyMarshaller, SingleValue, TripleValue};

/// Why a property has no marshaller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TypeRejection {
    /// String-like or unknown kinds.
    #[error("{0} properties are not supported")]
    UnsupportedKind(PlainOldDataType),
    /// Extent outside 1..=3.
    #[error("extent {0} is not supported")]
    UnsupportedExtent(u8),
    /// Kind that only decodes as a scalar.
    #[error("{pod} has no {extent}-component decoding")]
    NoVectorDecoding { pod: PlainOldDataType, extent: u8 },
}

/// Component layout of one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentShape {
    /// Extent 1, host scalar array.
    Single,
    /// Extent 2, host vector array with z = 0.
    Pair,
    /// Extent 3, host vector array.
    Triple,
}

impl ComponentShape {
    /// Components per element.
    pub const fn extent(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Pair => 2,
            Self::Triple => 3,
        }
    }
}

/// Accepted dispatch result: which shape to build and which kind it decodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarshallerVariant {
    pub shape: ComponentShape,
    pub pod: PlainOldDataType,
}

impl MarshallerVariant {
    /// Archived data type this variant reads and writes.
    pub fn data_type(self) -> DataType {
        DataType::new(self.pod, self.shape.extent() as u8)
    }
}

/// True for kinds that decode as 2 and 3 component vectors.
const fn has_vector_decoding(pod: PlainOldDataType) -> bool {
    matches!(
        pod,
        PlainOldDataType::Int16
            | PlainOldDataType::Int32
            | PlainOldDataType::Float32
            | PlainOldDataType::Float64
    )
}

/// Select the marshaller shape for `data_type`.
pub fn select(data_type: DataType) -> Result<MarshallerVariant, TypeRejection> {
    let pod = data_type.pod;
    if !pod.is_numeric() && pod != PlainOldDataType::Boolean {
        return Err(TypeRejection::UnsupportedKind(pod));
    }

    let shape = match data_type.extent {
        1 => ComponentShape::Single,
        2 => ComponentShape::Pair,
        3 => ComponentShape::Triple,
        extent => return Err(TypeRejection::UnsupportedExtent(extent)),
    };

    if shape != ComponentShape::Single && !has_vector_decoding(pod) {
        return Err(TypeRejection::NoVectorDecoding { pod, extent: data_type.extent });
    }
    Ok(MarshallerVariant { shape, pod })
}

fn build<T: HostScalar>(name: &str, shape: ComponentShape) -> Box<dyn PropertyMarshaller> {
    match shape {
        ComponentShape::Single => Box::new(SingleValue::<T>::new(name)),
        ComponentShape::Pair => Box::new(PairValue::<T>::new(name)),
        ComponentShape::Triple => Box::new(TripleValue::<T>::new(name)),
    }
}

/// Build the marshaller for property `name` of type `data_type`.
pub fn instantiate(
    name: &str,
    data_type: DataType,
) -> Result<Box<dyn PropertyMarshaller>, TypeRejection> {
    let MarshallerVariant { shape, pod } = select(data_type)?;
    let marshaller = match pod {
        PlainOldDataType::Boolean => build::<Bool>(name, shape),
        PlainOldDataType::Uint8 => build::<u8>(name, shape),
        PlainOldDataType::Int8 => build::<i8>(name, shape),
        PlainOldDataType::Uint16 => build::<u16>(name, shape),
        PlainOldDataType::Int16 => build::<i16>(name, shape),
        PlainOldDataType::Uint32 => build::<u32>(name, shape),
        PlainOldDataType::Int32 => build::<i32>(name, shape),
        PlainOldDataType::Uint64 => build::<u64>(name, shape),
        PlainOldDataType::Int64 => build::<i64>(name, shape),
        PlainOldDataType::Float16 => build::<f16>(name, shape),
        PlainOldDataType::Float32 => build::<f32>(name, shape),
        PlainOldDataType::Float64 => build::<f64>(name, shape),
        PlainOldDataType::String | PlainOldDataType::Wstring | PlainOldDataType::Unknown => {
            return Err(TypeRejection::UnsupportedKind(pod));
        }
    };
    Ok(marshaller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlainOldDataType as Pod;

    /// Expected outcome for every kind at extents 0..=4.
    fn expected(pod: Pod, extent: u8) -> Result<ComponentShape, TypeRejection> {
        match pod {
            Pod::String | Pod::Wstring | Pod::Unknown => return Err(TypeRejection::UnsupportedKind(pod)),
            _ => {}
        }
        let vector = matches!(pod, Pod::Int16 | Pod::Int32 | Pod::Float32 | Pod::Float64);
        match extent {
            1 => Ok(ComponentShape::Single),
            2 if vector => Ok(ComponentShape::Pair),
            3 if vector => Ok(ComponentShape::Triple),
            2 | 3 => Err(TypeRejection::NoVectorDecoding { pod, extent }),
            _ => Err(TypeRejection::UnsupportedExtent(extent)),
        }
    }

    #[test]
    fn test_dispatch_table_is_total() {
        let mut accepted = 0;
        for pod in Pod::ALL {
            for extent in 0..=4u8 {
                let data_type = DataType::new(pod, extent);
                let got = select(data_type);
                match expected(pod, extent) {
                    Ok(shape) => {
                        accepted += 1;
                        let variant = got.unwrap();
                        assert_eq!(variant.shape, shape, "{data_type}");
                        assert_eq!(variant.data_type(), data_type);

                        let marshaller = instantiate("p", data_type).unwrap();
                        assert_eq!(marshaller.data_type(), data_type);
                        assert_eq!(marshaller.name(), "p");
                    }
                    Err(rejection) => {
                        assert_eq!(got, Err(rejection), "{data_type}");
                        assert!(instantiate("p", data_type).is_err());
                    }
                }
            }
        }
        // 12 numeric kinds at extent 1, 4 vector kinds at extents 2 and 3.
        assert_eq!(accepted, 12 + 4 * 2);
    }

    #[test]
    fn test_rejection_messages() {
        let err = select(DataType::new(Pod::Uint64, 3)).unwrap_err();
        assert_eq!(err.to_string(), "uint64_t has no 3-component decoding");
        assert_eq!(
            select(DataType::STRING).unwrap_err().to_string(),
            "string properties are not supported"
        );
        assert_eq!(select(DataType::QUATF).unwrap_err(), TypeRejection::UnsupportedExtent(4));
    }

    #[test]
    fn test_extent_checked_before_vector_support() {
        assert_eq!(
            select(DataType::new(Pod::Uint8, 5)),
            Err(TypeRejection::UnsupportedExtent(5))
        );
    }
}
