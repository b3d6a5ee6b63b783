//! Generic property synchronization.
//!
//! - [`dispatch`] - pick a marshaller for a property's kind and extent
//! - [`marshaller`] - typed Single / Pair / Triple marshallers
//! - [`PropertySetAdapter`] - the discovered set for one archived object

pub mod dispatch;
pub mod marshaller;
mod adapter;

pub use adapter::PropertySetAdapter;
pub use dispatch::{instantiate, select, ComponentShape, MarshallerVariant, TypeRejection};
pub use marshaller::{PairValue, PropertyMarshaller, SingleValue, TripleValue, VectorValue};
