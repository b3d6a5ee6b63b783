//! Plain Old Data types - the primitive kinds a named property can carry.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

/// Plain Old Data type enum - the primitive kind of an archived property.
///
/// Discriminants match the Alembic on-disk POD codes so kinds read from an
/// existing archive header map one-to-one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Boolean = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// 16-bit floating point (IEEE 754 half precision)
    Float16 = 9,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 10,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 11,
    /// UTF-8 string
    String = 12,
    /// Wide string (stored as UTF-8 in Rust)
    Wstring = 13,
    /// Unknown/invalid type
    #[default]
    Unknown = 127,
}

impl PlainOldDataType {
    /// Every kind, `Unknown` included. Handy for exhaustive tables.
    pub const ALL: [Self; 15] = [
        Self::Boolean,
        Self::Uint8,
        Self::Int8,
        Self::Uint16,
        Self::Int16,
        Self::Uint32,
        Self::Int32,
        Self::Uint64,
        Self::Int64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::String,
        Self::Wstring,
        Self::Unknown,
    ];

    /// Returns the size in bytes of a single element of this type.
    /// Strings have no fixed width and report 0.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Boolean | Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
            Self::String | Self::Wstring | Self::Unknown => 0,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool_t",
            Self::Uint8 => "uint8_t",
            Self::Int8 => "int8_t",
            Self::Uint16 => "uint16_t",
            Self::Int16 => "int16_t",
            Self::Uint32 => "uint32_t",
            Self::Int32 => "int32_t",
            Self::Uint64 => "uint64_t",
            Self::Int64 => "int64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
            Self::Wstring => "wstring",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse POD type from its name string.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|pod| pod.name() == name)
            .unwrap_or(Self::Unknown)
    }

    /// Returns true if this is a numeric type (int or float).
    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Uint8
                | Self::Int8
                | Self::Uint16
                | Self::Int16
                | Self::Uint32
                | Self::Int32
                | Self::Uint64
                | Self::Int64
        )
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Returns true if this is a string type.
    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::Wstring)
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === POD Trait for type-safe conversions ===

/// Trait for types that can be stored as raw archived POD data.
pub trait AlembicPod: Pod + Zeroable + Copy + Default {
    /// The corresponding PlainOldDataType enum value.
    const POD_TYPE: PlainOldDataType;
}

/// Conversion between an archived POD and the host store's double precision.
///
/// The host keeps every numeric per-element channel as `f64` (or a vector of
/// `f64`), so each archived kind must widen to and narrow from a double.
/// Narrowing float-to-int saturates.
pub trait HostScalar: AlembicPod {
    /// Widen to the host representation.
    fn to_host(self) -> f64;
    /// Narrow from the host representation.
    fn from_host(value: f64) -> Self;
}

macro_rules! impl_numeric_pod {
    ($($t:ty => $pod:ident),* $(,)?) => {
        $(
            impl AlembicPod for $t {
                const POD_TYPE: PlainOldDataType = PlainOldDataType::$pod;
            }

            impl HostScalar for $t {
                #[inline]
                fn to_host(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_host(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_numeric_pod! {
    u8 => Uint8,
    i8 => Int8,
    u16 => Uint16,
    i16 => Int16,
    u32 => Uint32,
    i32 => Int32,
    u64 => Uint64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
}

impl AlembicPod for f16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float16;
}

impl HostScalar for f16 {
    #[inline]
    fn to_host(self) -> f64 {
        f16::to_f64(self)
    }

    #[inline]
    fn from_host(value: f64) -> Self {
        f16::from_f64(value)
    }
}

/// Boolean type with guaranteed 1-byte storage (like C++ Alembic bool_t).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl AlembicPod for Bool {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Boolean;
}

impl HostScalar for Bool {
    #[inline]
    fn to_host(self) -> f64 {
        if self.get() { 1.0 } else { 0.0 }
    }

    #[inline]
    fn from_host(value: f64) -> Self {
        Self::new(value != 0.0)
    }
}
