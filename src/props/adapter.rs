//! The generic property set of one archived object.

use tracing::{debug, warn};

use crate::archive::{channel as archive_channel, PointsSink, PointsSource};
use crate::store::{channel, AttributeStore};
use crate::util::{DataType, Error, Result};

use super::dispatch::instantiate;
use super::marshaller::PropertyMarshaller;

/// Owns one marshaller per discovered generic property.
///
/// Built once per archived object, either from the archive (import) or from
/// the store (export). Every bulk operation keeps going past a failing
/// property and returns the collected warnings.
#[derive(Debug, Default)]
pub struct PropertySetAdapter {
    marshallers: Vec<Box<dyn PropertyMarshaller>>,
    warnings: Vec<String>,
}

impl PropertySetAdapter {
    /// Discover the generic properties of an archived object.
    ///
    /// Reserved side channels are skipped silently; non-array and
    /// unsupported properties are skipped with a warning.
    pub fn from_archive(source: &dyn PointsSource) -> Self {
        let mut adapter = Self::default();
        for header in source.property_headers() {
            if archive_channel::is_reserved(&header.name) {
                continue;
            }
            if !header.is_array() {
                adapter.reject(&header.name, "not an array");
                continue;
            }
            adapter.add(&header.name, header.data_type);
        }
        debug!("{}: {} generic properties", source.name(), adapter.len());
        adapter
    }

    /// Discover the generic attributes of a live store, skipping the fixed
    /// channels.
    pub fn from_store(store: &dyn AttributeStore) -> Self {
        let mut adapter = Self::default();
        for info in store.attributes() {
            if channel::is_fixed(&info.name) {
                continue;
            }
            adapter.add(&info.name, info.data_type);
        }
        adapter
    }

    fn add(&mut self, name: &str, data_type: DataType) {
        match instantiate(name, data_type) {
            Ok(marshaller) => self.marshallers.push(marshaller),
            Err(rejection) => self.reject(name, &rejection.to_string()),
        }
    }

    fn reject(&mut self, name: &str, reason: &str) {
        let message = format!("skipping property {name}: {reason}");
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Warnings collected while discovering properties.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Names of all handled properties.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.marshallers.iter().map(|m| m.name())
    }

    pub fn len(&self) -> usize {
        self.marshallers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marshallers.is_empty()
    }

    /// Marshaller for `name`.
    pub fn get(&self, name: &str) -> Option<&dyn PropertyMarshaller> {
        self.marshallers
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Register every property on the store.
    pub fn declare(&self, store: &mut dyn AttributeStore) -> Vec<String> {
        let mut warnings = Vec::new();
        for m in &self.marshallers {
            if let Err(e) = m.declare(store) {
                warnings.push(report(m.name(), &e));
            }
        }
        warnings
    }

    /// Load sample `index` of every property for `element_count` elements.
    pub fn read_from_archive(
        &mut self,
        source: &dyn PointsSource,
        index: usize,
        element_count: usize,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        for m in &mut self.marshallers {
            if let Err(e) = m.read_from_archive(source, index, element_count) {
                warnings.push(report(m.name(), &e));
            }
        }
        warnings
    }

    /// Load every property from the store.
    pub fn read_from_store(&mut self, store: &dyn AttributeStore) -> Vec<String> {
        let mut warnings = Vec::new();
        for m in &mut self.marshallers {
            if let Err(e) = m.read_from_store(store) {
                warnings.push(report(m.name(), &e));
            }
        }
        warnings
    }

    /// Write every property back to the store.
    pub fn write_to_store(&self, store: &mut dyn AttributeStore) -> Vec<String> {
        let mut warnings = Vec::new();
        for m in &self.marshallers {
            if let Err(e) = m.write_to_store(store) {
                warnings.push(report(m.name(), &e));
            }
        }
        warnings
    }

    /// Append one sample per property. Stops at the first archive failure.
    pub fn append_to_archive(&self, sink: &mut dyn PointsSink) -> Result<()> {
        for marshaller in &self.marshallers {
            marshaller.append_to_archive(sink)?;
        }
        Ok(())
    }
}

fn report(name: &str, error: &Error) -> String {
    let message = format!("{name}: {error}");
    warn!("{message}");
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArraySample, PointsObject};
    use crate::core::PropertyHeader;
    use crate::store::{AttributeArray, ParticleStore};
    use crate::util::{DVec3, PlainOldDataType};

    fn sample_object() -> PointsObject {
        let mut points = PointsObject::new("particles");
        let mut add = |header: PropertyHeader, sample: ArraySample| {
            points.property_mut(header).unwrap().push(sample).unwrap();
        };
        add(PropertyHeader::array(".mass", DataType::FLOAT32), ArraySample::from_pod(&[1.0f32]));
        add(PropertyHeader::array("uv", DataType::VEC2F), ArraySample::from_pod(&[[0.5f32, 0.5]]));
        add(
            PropertyHeader::array("label", DataType::STRING),
            ArraySample::from_strings(vec!["a".into()]),
        );
        add(PropertyHeader::scalar("temperature", DataType::FLOAT64), ArraySample::from_pod(&[2.0f64]));
        add(PropertyHeader::array("charge", DataType::new(PlainOldDataType::Int8, 1)), ArraySample::from_pod(&[-3i8, 4]));
        points
    }

    #[test]
    fn test_discovery_from_archive() {
        let adapter = PropertySetAdapter::from_archive(&sample_object());
        assert_eq!(adapter.names().collect::<Vec<_>>(), vec!["uv", "charge"]);
        assert_eq!(adapter.warnings().len(), 2);
        assert!(adapter.warnings()[0].contains("label"));
        assert!(adapter.warnings()[1].contains("not an array"));
    }

    #[test]
    fn test_failures_stay_per_property() {
        let points = sample_object();
        let mut adapter = PropertySetAdapter::from_archive(&points);
        let mut store = ParticleStore::new();
        store.emit_elements(2).unwrap();

        assert!(adapter.declare(&mut store).is_empty());
        // uv broadcasts, charge matches two elements.
        assert!(adapter.read_from_archive(&points, 0, 2).is_empty());

        // Three elements: uv still broadcasts, charge has the wrong size.
        let warnings = adapter.read_from_archive(&points, 0, 3);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("charge"));
        assert!(adapter.get("uv").unwrap().is_valid());
        assert!(!adapter.get("charge").unwrap().is_valid());

        store.emit_elements(1).unwrap();
        assert!(adapter.write_to_store(&mut store).is_empty());
        assert_eq!(store.get_attribute("charge").unwrap(), AttributeArray::Double(vec![0.0; 3]));
        assert_eq!(
            store.get_attribute("uv").unwrap(),
            AttributeArray::Vector(vec![DVec3::new(0.5, 0.5, 0.0); 3])
        );
    }

    #[test]
    fn test_discovery_from_store() {
        let mut store = ParticleStore::new();
        store.declare_attribute(channel::RGB, DataType::VEC3D).unwrap();
        store.declare_attribute("uv", DataType::VEC2F).unwrap();
        store.declare_attribute("name", DataType::STRING).unwrap();

        let adapter = PropertySetAdapter::from_store(&store);
        assert_eq!(adapter.names().collect::<Vec<_>>(), vec!["uv"]);
        assert_eq!(adapter.warnings().len(), 1);
    }
}
