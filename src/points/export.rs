//! Export: live particle store to archived Points samples.

use bytemuck::NoUninit;
use tracing::{debug, info_span};

use crate::archive::{channel, ArraySample, PointsSample, PointsSink};
use crate::core::{MetaData, PropertyHeader};
use crate::props::PropertySetAdapter;
use crate::store::{channel as store_channel, AttributeStore};
use crate::util::{quat_to_wxyz, BBox3d, Chrono, DMat4, DVec3, DataType, Quat, Result, Vec3};

use super::config::ExportOptions;
use super::instancing::{InstanceCorrelationTable, InstancerSource, Release, SHAPE_TYPE_INSTANCE};
use super::FrameReport;

/// Appends one archived sample per exported frame.
///
/// Generic properties are discovered from the store on the first frame and
/// reused afterwards; instance names and scale are also written only once.
#[derive(Debug, Default)]
pub struct PointsExporter {
    options: ExportOptions,
    properties: Option<PropertySetAdapter>,
    num_samples: usize,
}

impl PointsExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options, properties: None, num_samples: 0 }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Frames exported so far.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Generic properties discovered on the first frame.
    pub fn properties(&self) -> Option<&PropertySetAdapter> {
        self.properties.as_ref()
    }

    /// Export the store's current state as the sample at `time`.
    ///
    /// `instancer` enables instancing channels for this frame. Only archive
    /// failures are returned as errors; unreadable store channels are
    /// exported as zeros and reported.
    pub fn export_frame(
        &mut self,
        time: Chrono,
        store: &dyn AttributeStore,
        instancer: Option<&dyn InstancerSource>,
        sink: &mut dyn PointsSink,
    ) -> Result<FrameReport> {
        let _span = info_span!("export_frame", time, sample = self.num_samples).entered();
        let mut report = FrameReport::default();
        let count = store.element_count();
        let first = self.num_samples == 0;

        let world = if self.options.global_space {
            store.world_matrix()
        } else {
            DMat4::IDENTITY
        };

        let mut bounds = BBox3d::EMPTY;
        let positions: Vec<Vec3> = vectors(store, store_channel::POSITION, count, &mut report)
            .into_iter()
            .map(|p| {
                let p = world.transform_point3(p).as_vec3();
                bounds.expand_by_point(p.as_dvec3());
                p
            })
            .collect();
        let velocities: Vec<Vec3> = vectors(store, store_channel::VELOCITY, count, &mut report)
            .into_iter()
            .map(|v| world.transform_vector3(v).as_vec3())
            .collect();
        let widths = floats(store, store_channel::RADIUS, count, &mut report);
        let ids = scalars(store, store_channel::ID, count, &mut report)
            .into_iter()
            .map(|id| id as i64 as u64)
            .collect();

        let sample = if count == 0 && self.options.legacy_empty_sentinel {
            PointsSample::empty_sentinel()
        } else {
            PointsSample {
                positions,
                ids,
                velocities,
                widths,
                self_bounds: Some(bounds),
            }
        };
        let index = sink.append_sample(time, &sample)?;

        let age = floats(store, store_channel::AGE, count, &mut report);
        let mass = floats(store, store_channel::MASS, count, &mut report);
        append(sink, channel::AGE, DataType::FLOAT32, &age)?;
        append(sink, channel::MASS, DataType::FLOAT32, &mass)?;
        append(sink, channel::COLOR, DataType::COLOR4F, &colors(store, count, &mut report))?;

        if let Some(instancer) = instancer {
            let table = match InstanceCorrelationTable::capture(instancer) {
                Ok(table) => table,
                Err(e) => {
                    report.warn(format!("instancer {}: {}", instancer.name(), e));
                    InstanceCorrelationTable::default()
                }
            };
            append_instancing(sink, &table, first)?;
        }

        if self.options.export_generic_properties {
            if self.properties.is_none() {
                let adapter = PropertySetAdapter::from_store(store);
                report.extend(adapter.warnings().iter().cloned());
                self.properties = Some(adapter);
            }
            if let Some(properties) = self.properties.as_mut() {
                report.extend(properties.read_from_store(store));
                properties.append_to_archive(sink)?;
            }
        }

        self.num_samples += 1;
        report.element_count = count;
        debug!("exported {} elements as sample {}", count, index);
        Ok(report)
    }
}

impl Release for PointsExporter {
    fn on_release(&mut self) {
        self.properties = None;
        self.num_samples = 0;
    }
}

fn header(name: &str, data_type: DataType) -> PropertyHeader {
    PropertyHeader::array(name, data_type)
        .with_meta_data(MetaData::new().with(MetaData::GEO_SCOPE_KEY, "var"))
}

fn append<T: NoUninit>(
    sink: &mut dyn PointsSink,
    name: &str,
    data_type: DataType,
    values: &[T],
) -> Result<()> {
    sink.property_mut(header(name, data_type))?.push_pod(values)?;
    Ok(())
}

/// Instancing channels of one frame. An empty table still appends one
/// (empty) sample per channel.
fn append_instancing(
    sink: &mut dyn PointsSink,
    table: &InstanceCorrelationTable,
    first: bool,
) -> Result<()> {
    if first {
        append(sink, channel::SCALE, DataType::VEC3F, &[[1.0f32; 3]])?;
        sink.property_mut(header(channel::INSTANCE_NAMES, DataType::STRING))?
            .push(ArraySample::from_strings(table.names().to_vec()))?;
    }

    // The host does not expose angular velocity.
    let angular_velocity = vec![quat_to_wxyz(Quat::IDENTITY); table.len()];
    append(sink, channel::ANGULAR_VELOCITY, DataType::QUATF, &angular_velocity)?;
    append(sink, channel::ORIENTATION, DataType::QUATF, &table.orientations())?;
    append(sink, channel::SHAPE_INSTANCE_ID, DataType::UINT16, &table.shape_ids())?;
    append(
        sink,
        channel::SHAPE_TYPE,
        DataType::UINT16,
        &vec![SHAPE_TYPE_INSTANCE; table.len()],
    )
}

/// Column as doubles, or zeros with a warning.
fn scalars(store: &dyn AttributeStore, name: &str, count: usize, report: &mut FrameReport) -> Vec<f64> {
    match store.get_attribute(name).and_then(|a| a.into_doubles(name)) {
        Ok(values) if values.len() == count => values,
        Ok(values) => {
            report.warn(format!("{name}: {} values for {count} elements", values.len()));
            vec![0.0; count]
        }
        Err(e) => {
            report.warn(e.to_string());
            vec![0.0; count]
        }
    }
}

fn floats(store: &dyn AttributeStore, name: &str, count: usize, report: &mut FrameReport) -> Vec<f32> {
    scalars(store, name, count, report)
        .into_iter()
        .map(|v| v as f32)
        .collect()
}

/// Column as vectors, or zeros with a warning.
fn vectors(store: &dyn AttributeStore, name: &str, count: usize, report: &mut FrameReport) -> Vec<DVec3> {
    match store.get_attribute(name).and_then(|a| a.into_vectors(name)) {
        Ok(values) if values.len() == count => values,
        Ok(values) => {
            report.warn(format!("{name}: {} values for {count} elements", values.len()));
            vec![DVec3::ZERO; count]
        }
        Err(e) => {
            report.warn(e.to_string());
            vec![DVec3::ZERO; count]
        }
    }
}

/// RGBA per element, or empty when the store has neither rgb nor opacity.
fn colors(store: &dyn AttributeStore, count: usize, report: &mut FrameReport) -> Vec<[f32; 4]> {
    let has_rgb = store.has_attribute(store_channel::RGB);
    let has_opacity = store.has_attribute(store_channel::OPACITY);
    if !has_rgb && !has_opacity {
        return Vec::new();
    }

    let rgb = if has_rgb {
        vectors(store, store_channel::RGB, count, report)
    } else {
        vec![DVec3::ZERO; count]
    };
    let opacity = if has_opacity {
        scalars(store, store_channel::OPACITY, count, report)
    } else {
        vec![1.0; count]
    };
    rgb.iter()
        .zip(&opacity)
        .map(|(c, &a)| [c.x as f32, c.y as f32, c.z as f32, a as f32])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{PointsObject, PointsSource};
    use crate::points::InstancerState;
    use crate::store::{AttributeArray, ParticleStore};
    use crate::util::Error;

    fn store(count: usize) -> ParticleStore {
        let mut store = ParticleStore::new();
        store.emit_elements(count).unwrap();
        let positions = (0..count).map(|i| DVec3::new(i as f64, 0.0, 0.0)).collect();
        store.set_attribute(store_channel::POSITION, AttributeArray::Vector(positions)).unwrap();
        store
            .set_attribute(store_channel::VELOCITY, AttributeArray::Vector(vec![DVec3::Y; count]))
            .unwrap();
        store
    }

    #[test]
    fn test_fixed_channels() {
        let store = store(3);
        let mut points = PointsObject::new("particles");
        let mut exporter = PointsExporter::new(ExportOptions::default());
        let report = exporter.export_frame(1.0, &store, None, &mut points).unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.element_count, 3);

        let sample = points.get_sample(0).unwrap();
        assert_eq!(sample.ids, vec![0, 1, 2]);
        assert_eq!(sample.positions[2], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(sample.self_bounds.unwrap().max, DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(points.property(channel::MASS).unwrap().sample(0).unwrap().len(), 3);
        // No rgb or opacity: color is written empty.
        assert!(points.property(channel::COLOR).unwrap().sample(0).unwrap().is_empty());
        assert!(points.property(channel::SHAPE_TYPE).is_none());
    }

    #[test]
    fn test_global_space() {
        let mut store = store(2);
        store.set_world_matrix(DMat4::from_scale_rotation_translation(
            DVec3::splat(2.0),
            crate::util::DQuat::IDENTITY,
            DVec3::new(0.0, 0.0, 10.0),
        ));
        let mut points = PointsObject::new("particles");
        let options = ExportOptions { global_space: true, ..Default::default() };
        PointsExporter::new(options)
            .export_frame(0.0, &store, None, &mut points)
            .unwrap();

        let sample = points.get_sample(0).unwrap();
        assert_eq!(sample.positions[1], Vec3::new(2.0, 0.0, 10.0));
        // Directions scale but do not translate.
        assert_eq!(sample.velocities[0], Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(sample.self_bounds.unwrap().min, DVec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn test_empty_frame_sentinel() {
        let store = ParticleStore::new();
        let mut points = PointsObject::new("particles");
        let options = ExportOptions { legacy_empty_sentinel: true, ..Default::default() };
        PointsExporter::new(options)
            .export_frame(0.0, &store, None, &mut points)
            .unwrap();
        let sample = points.get_sample(0).unwrap();
        assert!(sample.is_empty_sentinel());
        assert_eq!(sample.element_count(), 0);
    }

    #[test]
    fn test_time_must_increase() {
        let store = store(1);
        let mut points = PointsObject::new("particles");
        let mut exporter = PointsExporter::new(ExportOptions::default());
        exporter.export_frame(1.0, &store, None, &mut points).unwrap();
        assert!(exporter.export_frame(1.0, &store, None, &mut points).is_err());
        assert_eq!(exporter.num_samples(), 1);
        assert_eq!(points.property(channel::AGE).unwrap().num_samples(), 1);
    }

    #[test]
    fn test_opacity_only_color() {
        let mut store = store(2);
        store.declare_attribute(store_channel::OPACITY, DataType::FLOAT64).unwrap();
        store
            .set_attribute(store_channel::OPACITY, AttributeArray::Double(vec![0.5, 0.25]))
            .unwrap();
        let mut points = PointsObject::new("particles");
        PointsExporter::new(ExportOptions::default())
            .export_frame(0.0, &store, None, &mut points)
            .unwrap();
        let color: Vec<[f32; 4]> = points
            .property(channel::COLOR)
            .unwrap()
            .sample(0)
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(color, vec![[0.0, 0.0, 0.0, 0.5], [0.0, 0.0, 0.0, 0.25]]);
    }

    /// Instancer whose second query fails.
    struct FlakyInstancer {
        state: InstancerState,
        calls: std::cell::Cell<usize>,
    }

    impl InstancerSource for FlakyInstancer {
        fn name(&self) -> &str {
            &self.state.name
        }

        fn all_instances(&self) -> Result<InstancerState> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == 1 {
                return Err(Error::other("instancer is being edited"));
            }
            Ok(self.state.clone())
        }
    }

    #[test]
    fn test_failed_instancer_keeps_channels_aligned() {
        let store = store(2);
        let instancer = FlakyInstancer {
            state: InstancerState {
                name: "instancer1".into(),
                paths: vec!["|shapes|cube".into()],
                matrices: vec![DMat4::IDENTITY; 2],
                path_start_indices: vec![0, 1],
                path_indices: vec![0, 0],
            },
            calls: std::cell::Cell::new(0),
        };

        let mut points = PointsObject::new("particles");
        let mut exporter = PointsExporter::new(ExportOptions::default());
        for frame in 0..3 {
            let report = exporter
                .export_frame(frame as f64, &store, Some(&instancer), &mut points)
                .unwrap();
            assert_eq!(report.warnings.len(), usize::from(frame == 1));
        }

        assert_eq!(points.num_samples(), 3);
        for name in [
            channel::ORIENTATION,
            channel::ANGULAR_VELOCITY,
            channel::SHAPE_INSTANCE_ID,
            channel::SHAPE_TYPE,
        ] {
            let property = points.property(name).unwrap();
            assert_eq!(property.num_samples(), 3, "{name}");
            assert!(property.sample(1).unwrap().is_empty(), "{name}");
            assert_eq!(property.sample(2).unwrap().len(), 2, "{name}");
        }
        assert_eq!(points.property(channel::INSTANCE_NAMES).unwrap().num_samples(), 1);
    }
}
