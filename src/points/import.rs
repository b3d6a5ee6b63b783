//! Import: archived Points samples to the live particle store.

use bytemuck::{AnyBitPattern, NoUninit};
use tracing::{debug, info_span};

use crate::archive::{channel, PointsSource};
use crate::core::{resolve_sample_info, Cardinality, SampleTimeResolver, TimeSampleInfo};
use crate::props::PropertySetAdapter;
use crate::store::{channel as store_channel, AttributeArray, AttributeStore};
use crate::util::{
    apply_angular_velocity, quat_from_wxyz, quat_to_euler_xyz, Chrono, DVec3, DataType, Error,
    Quat, Result,
};

use super::config::{Extrapolation, ImportOptions};
use super::instancing::{InstancingRegistry, Release};
use super::FrameReport;

/// Map `time` onto the samples of an archived object.
pub fn resolve_time(time: Chrono, source: &dyn PointsSource) -> TimeSampleInfo {
    resolve_sample_info(time, source.time_sampling(), source.num_samples())
}

/// Host channels written on every import, with their declared types.
const IMPORTED_CHANNELS: [(&str, DataType); 8] = [
    (store_channel::POSITION, DataType::VEC3D),
    (store_channel::VELOCITY, DataType::VEC3D),
    (store_channel::RGB, DataType::VEC3D),
    (store_channel::OPACITY, DataType::FLOAT64),
    (store_channel::AGE, DataType::FLOAT64),
    (store_channel::MASS, DataType::FLOAT64),
    (store_channel::SHAPE_INSTANCE_ID, DataType::FLOAT64),
    (store_channel::ORIENTATION, DataType::VEC3D),
];

/// Plays an archived Points object back into a live store.
///
/// Remembers the bracketing samples of the previous call: a query time that
/// lands on the same pair returns the previous report without touching the
/// archive or the store. The store then keeps positions and orientations
/// extrapolated with the alpha of the call that loaded the pair; a later time
/// inside the same bracket does not re-extrapolate them.
///
/// A failed import forgets the previous pair, so retrying the same time
/// loads the sample again.
#[derive(Debug)]
pub struct PointsImporter {
    identifier: String,
    options: ImportOptions,
    resolver: SampleTimeResolver,
    properties: Option<PropertySetAdapter>,
    last_report: Option<FrameReport>,
}

impl PointsImporter {
    /// Importer for the archived object named `identifier`.
    pub fn new(identifier: &str, options: ImportOptions) -> Self {
        Self {
            identifier: identifier.to_string(),
            options,
            resolver: SampleTimeResolver::new(),
            properties: None,
            last_report: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Generic properties discovered on the first import.
    pub fn properties(&self) -> Option<&PropertySetAdapter> {
        self.properties.as_ref()
    }

    /// Take part in the post-import instancing pass.
    pub fn register(&self, registry: &mut InstancingRegistry) {
        registry.register(&self.identifier);
    }

    /// Bring `store` to the archived state at `time`.
    pub fn import_frame(
        &mut self,
        time: Chrono,
        source: &dyn PointsSource,
        store: &mut dyn AttributeStore,
    ) -> Result<FrameReport> {
        let _span = info_span!("import_frame", object = source.name(), time).entered();

        let num_samples = source.num_samples();
        if num_samples == 0 {
            return Err(Error::NoSamples(source.name().to_string()));
        }

        let resolved = self.resolver.resolve(time, source.time_sampling(), num_samples);
        if !resolved.changed {
            if let Some(previous) = &self.last_report {
                debug!("samples unchanged, skipping");
                return Ok(FrameReport { cached: true, ..previous.clone() });
            }
        }

        match self.load(resolved.info, source, store) {
            Ok(report) => {
                self.last_report = Some(report.clone());
                Ok(report)
            }
            Err(e) => {
                // The next call must retry this bracket instead of hitting the cache.
                self.resolver.reset();
                self.last_report = None;
                Err(e)
            }
        }
    }

    /// Read sample `info.floor_index` into `store`.
    fn load(
        &mut self,
        info: TimeSampleInfo,
        source: &dyn PointsSource,
        store: &mut dyn AttributeStore,
    ) -> Result<FrameReport> {
        let index = info.floor_index;
        let mut report = FrameReport::default();
        let sample = source.get_sample(index)?;
        let count = sample.element_count();

        let current = store.element_count();
        if count < current {
            store.set_element_count(count)?;
        } else if count > current {
            store.emit_elements(count - current)?;
        }
        for (name, data_type) in IMPORTED_CHANNELS {
            if let Err(e) = store.declare_attribute(name, data_type) {
                report.warn(e.to_string());
            }
        }

        let factor = match self.options.extrapolation {
            Extrapolation::Alpha => info.alpha,
            Extrapolation::TimeOffset => info.time_offset(source.time_sampling()),
        };

        // Velocities live in the schema but broadcast like any side channel.
        let velocities: Vec<DVec3> = match Cardinality::classify(sample.velocities.len(), count) {
            Some(c) => (0..count).map(|i| sample.velocities[c.index(i)].as_dvec3()).collect(),
            None => {
                if !sample.velocities.is_empty() && count > 0 {
                    report.warn(format!(
                        "velocities: {} values for {count} elements",
                        sample.velocities.len()
                    ));
                }
                vec![DVec3::ZERO; count]
            }
        };
        let positions: Vec<DVec3> = sample.positions[..count]
            .iter()
            .zip(&velocities)
            .map(|(p, v)| p.as_dvec3() + *v * factor)
            .collect();

        let (color, age, mass, shape_id, orientation) = {
            let r = &mut report;
            (
                SideChannel::<[f32; 4]>::read(source, channel::COLOR, DataType::COLOR4F, index, count, r),
                SideChannel::<f32>::read(source, channel::AGE, DataType::FLOAT32, index, count, r),
                SideChannel::<f32>::read(source, channel::MASS, DataType::FLOAT32, index, count, r),
                SideChannel::<u16>::read(source, channel::SHAPE_INSTANCE_ID, DataType::UINT16, index, count, r),
                SideChannel::<[f32; 4]>::read(source, channel::ORIENTATION, DataType::QUATF, index, count, r),
            )
        };

        let rgb = (0..count)
            .map(|i| {
                color.get(i).map_or(DVec3::ZERO, |c| {
                    DVec3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2]))
                })
            })
            .collect();
        let opacity = (0..count)
            .map(|i| color.get(i).map_or(1.0, |c| f64::from(c[3])))
            .collect();
        let ages = (0..count).map(|i| age.get(i).map_or(0.0, f64::from)).collect();
        let masses = (0..count)
            .map(|i| match mass.get(i) {
                Some(m) if m > 0.0 => f64::from(m),
                _ => 1.0,
            })
            .collect();
        let shape_ids = (0..count).map(|i| shape_id.get(i).map_or(0.0, f64::from)).collect();

        let orientations = if orientation.is_present() {
            let angular_velocity = if factor != 0.0 {
                SideChannel::<[f32; 4]>::read(
                    source,
                    channel::ANGULAR_VELOCITY,
                    DataType::QUATF,
                    index,
                    count,
                    &mut report,
                )
            } else {
                SideChannel::absent()
            };
            (0..count)
                .map(|i| {
                    let q = orientation.get(i).map_or(Quat::IDENTITY, quat_from_wxyz);
                    let w = angular_velocity.get(i).map_or(Quat::IDENTITY, quat_from_wxyz);
                    quat_to_euler_xyz(apply_angular_velocity(q, w, factor as f32))
                })
                .collect()
        } else {
            vec![DVec3::ZERO; count]
        };

        let columns = [
            (store_channel::POSITION, AttributeArray::Vector(positions)),
            (store_channel::VELOCITY, AttributeArray::Vector(velocities)),
            (store_channel::RGB, AttributeArray::Vector(rgb)),
            (store_channel::OPACITY, AttributeArray::Double(opacity)),
            (store_channel::AGE, AttributeArray::Double(ages)),
            (store_channel::MASS, AttributeArray::Double(masses)),
            (store_channel::SHAPE_INSTANCE_ID, AttributeArray::Double(shape_ids)),
            (store_channel::ORIENTATION, AttributeArray::Vector(orientations)),
        ];
        for (name, values) in columns {
            if let Err(e) = store.set_attribute(name, values) {
                report.warn(e.to_string());
            }
        }

        if self.options.import_generic_properties {
            if self.properties.is_none() {
                let adapter = PropertySetAdapter::from_archive(source);
                report.extend(adapter.warnings().iter().cloned());
                self.properties = Some(adapter);
            }
            if let Some(properties) = self.properties.as_mut() {
                report.extend(properties.declare(store));
                report.extend(properties.read_from_archive(source, index, count));
                report.extend(properties.write_to_store(store));
            }
        }

        report.element_count = count;
        debug!("imported sample {} ({} elements, alpha {})", index, count, info.alpha);
        Ok(report)
    }
}

impl Release for PointsImporter {
    fn on_release(&mut self) {
        self.resolver.reset();
        self.properties = None;
        self.last_report = None;
    }
}

/// One optional side channel of the current sample.
struct SideChannel<T> {
    values: Vec<T>,
    cardinality: Option<Cardinality>,
}

impl<T: AnyBitPattern + NoUninit> SideChannel<T> {
    fn absent() -> Self {
        Self { values: Vec::new(), cardinality: None }
    }

    /// Read `name` at `index`. Missing or empty channels are absent; malformed
    /// ones are absent and reported.
    fn read(
        source: &dyn PointsSource,
        name: &str,
        data_type: DataType,
        index: usize,
        count: usize,
        report: &mut FrameReport,
    ) -> Self {
        let Some(property) = source.property(name) else {
            return Self::absent();
        };
        if property.data_type() != data_type {
            report.warn(format!("{name}: expected {data_type}, found {}", property.data_type()));
            return Self::absent();
        }
        let sample = match property.sample(index) {
            Ok(sample) if sample.is_empty() => return Self::absent(),
            Ok(sample) => sample,
            Err(e) => {
                report.warn(format!("{name}: {e}"));
                return Self::absent();
            }
        };
        let Some(cardinality) = Cardinality::classify(sample.len(), count) else {
            if count > 0 {
                report.warn(format!("{name}: {} values for {count} elements", sample.len()));
            }
            return Self::absent();
        };
        match sample.decode::<T>() {
            Ok(values) => Self { values, cardinality: Some(cardinality) },
            Err(e) => {
                report.warn(format!("{name}: {e}"));
                Self::absent()
            }
        }
    }

    fn is_present(&self) -> bool {
        self.cardinality.is_some()
    }

    /// Value for element `i`, broadcasting constant samples.
    fn get(&self, i: usize) -> Option<T> {
        self.cardinality.map(|c| self.values[c.index(i)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{PointsObject, PointsSample, PointsSink};
    use crate::core::PropertyHeader;
    use crate::store::ParticleStore;
    use crate::util::{quat_to_wxyz, Vec3};

    fn two_frames() -> PointsObject {
        let mut points = PointsObject::new("particles");
        for (t, x) in [(0.0, 0.0f32), (1.0, 1.0)] {
            let sample = PointsSample {
                positions: vec![Vec3::new(x, 0.0, 0.0); 2],
                ids: vec![0, 1],
                velocities: vec![Vec3::X; 2],
                widths: vec![0.1; 2],
                self_bounds: None,
            };
            points.append_sample(t, &sample).unwrap();
        }
        points
    }

    fn positions(store: &ParticleStore) -> Vec<DVec3> {
        store
            .get_attribute(store_channel::POSITION)
            .unwrap()
            .into_vectors("position")
            .unwrap()
    }

    #[test]
    fn test_time_offset_extrapolation() {
        let mut points = PointsObject::with_time_sampling(
            "particles",
            crate::core::TimeSampling::uniform(2.0, 0.0),
        );
        for _ in 0..2 {
            let sample = PointsSample {
                positions: vec![Vec3::ZERO],
                ids: vec![0],
                velocities: vec![Vec3::X],
                widths: vec![1.0],
                self_bounds: None,
            };
            points.append_sample(0.0, &sample).unwrap();
        }
        let options = ImportOptions { extrapolation: Extrapolation::TimeOffset, ..Default::default() };
        let mut importer = PointsImporter::new("particles", options);
        let mut store = ParticleStore::new();
        importer.import_frame(0.5, &points, &mut store).unwrap();
        // alpha 0.25 over a 2s span.
        assert_eq!(positions(&store), vec![DVec3::new(0.5, 0.0, 0.0)]);
    }

    #[test]
    fn test_orientation_with_angular_velocity() {
        let mut points = two_frames();
        let orient = Quat::from_rotation_z(0.4);
        for (name, q) in [(channel::ORIENTATION, orient), (channel::ANGULAR_VELOCITY, Quat::IDENTITY)] {
            let property = points.property_mut(PropertyHeader::array(name, DataType::QUATF)).unwrap();
            property.push_pod(&[quat_to_wxyz(q)]).unwrap();
            property.push_pod(&[quat_to_wxyz(q)]).unwrap();
        }

        let mut store = ParticleStore::new();
        let mut importer = PointsImporter::new("particles", ImportOptions::default());
        importer.import_frame(0.5, &points, &mut store).unwrap();
        let euler = store
            .get_attribute(store_channel::ORIENTATION)
            .unwrap()
            .into_vectors("orientationPP")
            .unwrap();
        assert_eq!(euler.len(), 2);
        assert!((euler[1].z - 0.4).abs() < 1e-5);
        assert!(euler[1].x.abs() < 1e-5);
    }

    #[test]
    fn test_malformed_side_channel_is_reported() {
        let mut points = two_frames();
        let property = points
            .property_mut(PropertyHeader::array(channel::AGE, DataType::FLOAT32))
            .unwrap();
        property.push_pod(&[1.0f32, 2.0, 3.0]).unwrap();

        let mut store = ParticleStore::new();
        let mut importer = PointsImporter::new("particles", ImportOptions::default());
        let report = importer.import_frame(0.0, &points, &mut store).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with(".age"));
        assert_eq!(
            store.get_attribute(store_channel::AGE).unwrap(),
            AttributeArray::Double(vec![0.0; 2])
        );

        // Frame 1 has no .age sample at all.
        let report = importer.import_frame(1.0, &points, &mut store).unwrap();
        assert!(report.warnings[0].contains("out of bounds"));
    }

    #[test]
    fn test_release_forgets_cache() {
        let points = two_frames();
        let mut store = ParticleStore::new();
        let mut registry = InstancingRegistry::new();
        let mut importer = PointsImporter::new("/particles", ImportOptions::default());
        importer.register(&mut registry);
        assert!(registry.contains("/particles"));

        importer.import_frame(0.0, &points, &mut store).unwrap();
        assert!(importer.import_frame(0.0, &points, &mut store).unwrap().cached);

        registry.release("/particles", &mut importer);
        assert!(registry.is_empty());
        assert!(importer.properties().is_none());
        assert!(!importer.import_frame(0.0, &points, &mut store).unwrap().cached);
    }

    #[test]
    fn test_empty_object_is_an_error() {
        let points = PointsObject::new("empty");
        let mut importer = PointsImporter::new("empty", ImportOptions::default());
        let err = importer.import_frame(0.0, &points, &mut ParticleStore::new()).unwrap_err();
        assert!(matches!(err, Error::NoSamples(_)));
        assert_eq!(resolve_time(3.0, &points), TimeSampleInfo::exact(0));
    }

    /// Store whose next `emit_elements` call fails.
    struct FlakyStore {
        inner: ParticleStore,
        fail_emit: bool,
    }

    impl AttributeStore for FlakyStore {
        fn declare_attribute(&mut self, name: &str, data_type: DataType) -> Result<()> {
            self.inner.declare_attribute(name, data_type)
        }

        fn attributes(&self) -> Vec<crate::store::AttributeInfo> {
            self.inner.attributes()
        }

        fn get_attribute(&self, name: &str) -> Result<AttributeArray> {
            self.inner.get_attribute(name)
        }

        fn set_attribute(&mut self, name: &str, values: AttributeArray) -> Result<()> {
            self.inner.set_attribute(name, values)
        }

        fn element_count(&self) -> usize {
            self.inner.element_count()
        }

        fn set_element_count(&mut self, count: usize) -> Result<()> {
            self.inner.set_element_count(count)
        }

        fn emit_elements(&mut self, count: usize) -> Result<()> {
            if std::mem::take(&mut self.fail_emit) {
                return Err(Error::other("emitter is locked"));
            }
            self.inner.emit_elements(count)
        }
    }

    #[test]
    fn test_failed_frame_is_retried() {
        let mut points = PointsObject::new("particles");
        for (t, n) in [(0.0, 1usize), (1.0, 3)] {
            let sample = PointsSample {
                positions: vec![Vec3::ZERO; n],
                ids: (0..n as u64).collect(),
                ..Default::default()
            };
            points.append_sample(t, &sample).unwrap();
        }

        let mut store = FlakyStore { inner: ParticleStore::new(), fail_emit: false };
        let mut importer = PointsImporter::new("particles", ImportOptions::default());
        assert_eq!(importer.import_frame(0.0, &points, &mut store).unwrap().element_count, 1);

        store.fail_emit = true;
        assert!(importer.import_frame(1.0, &points, &mut store).is_err());

        let report = importer.import_frame(1.0, &points, &mut store).unwrap();
        assert!(!report.cached);
        assert_eq!(report.element_count, 3);
        assert_eq!(store.element_count(), 3);
        assert_eq!(positions(&store.inner).len(), 3);
    }
}
